//! Linear and circular curves

use super::coord::{CoordDims, Coordinate};

/// Default maximum angle between two linearized vertices of an arc (1 degree)
pub const DEFAULT_ARC_STEP: f64 = std::f64::consts::PI / 180.0;

/// A polyline. Also used for polygon rings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineString {
    pub coords: Vec<Coordinate>,
    pub dims: CoordDims,
}

impl LineString {
    pub fn new(coords: Vec<Coordinate>, dims: CoordDims) -> Self {
        Self { coords, dims }
    }

    pub fn empty(dims: CoordDims) -> Self {
        Self { coords: Vec::new(), dims }
    }

    /// Build a 2D line from `(x, y)` pairs
    pub fn from_xy(points: &[(f64, f64)]) -> Self {
        Self {
            coords: points.iter().map(|&(x, y)| Coordinate::new(x, y)).collect(),
            dims: CoordDims::XY,
        }
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn start(&self) -> Option<&Coordinate> {
        self.coords.first()
    }

    pub fn end(&self) -> Option<&Coordinate> {
        self.coords.last()
    }

    /// First and last vertex coincide in the plane
    pub fn is_closed(&self) -> bool {
        match (self.coords.first(), self.coords.last()) {
            (Some(a), Some(b)) => self.coords.len() > 1 && a.same_xy(b),
            _ => false,
        }
    }

    /// Planar length
    pub fn length(&self) -> f64 {
        self.coords
            .windows(2)
            .map(|w| w[0].distance_2d(&w[1]))
            .sum()
    }

    pub fn reversed(&self) -> LineString {
        let mut coords = self.coords.clone();
        coords.reverse();
        LineString::new(coords, self.dims)
    }

    /// Append the vertices of `other`, skipping its first vertex when it
    /// repeats our last one.
    pub fn append(&mut self, other: &LineString) {
        let skip = match (self.coords.last(), other.coords.first()) {
            (Some(a), Some(b)) if a.same_xy(b) => 1,
            _ => 0,
        };
        self.coords.extend(other.coords.iter().skip(skip).copied());
    }
}

/// A sequence of circular arcs, each defined by three consecutive vertices
/// (start, point on arc, end) with shared endpoints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CircularString {
    pub coords: Vec<Coordinate>,
    pub dims: CoordDims,
}

impl CircularString {
    pub fn new(coords: Vec<Coordinate>, dims: CoordDims) -> Self {
        Self { coords, dims }
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        match (self.coords.first(), self.coords.last()) {
            (Some(a), Some(b)) => self.coords.len() > 1 && a.same_xy(b),
            _ => false,
        }
    }

    /// Approximate the arcs with straight segments so that no segment spans
    /// more than `max_angle` radians of its arc. Control points are kept.
    pub fn linearize(&self, max_angle: f64) -> LineString {
        let step = if max_angle > 0.0 { max_angle } else { DEFAULT_ARC_STEP };
        let mut out: Vec<Coordinate> = Vec::new();
        let n = self.coords.len();
        if n < 3 {
            return LineString::new(self.coords.clone(), self.dims);
        }

        let mut i = 0;
        while i + 2 < n {
            let arc = segmentize_arc(&self.coords[i], &self.coords[i + 1], &self.coords[i + 2], step);
            let skip = usize::from(!out.is_empty());
            out.extend(arc.into_iter().skip(skip));
            i += 2;
        }
        LineString::new(out, self.dims)
    }
}

fn circle_center(p0: &Coordinate, p1: &Coordinate, p2: &Coordinate) -> Option<(f64, f64, f64)> {
    let ax = p0.x;
    let ay = p0.y;
    let bx = p1.x;
    let by = p1.y;
    let cx = p2.x;
    let cy = p2.y;

    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < 1e-12 {
        return None;
    }

    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
    let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
    let r = (ax - ux).hypot(ay - uy);
    Some((ux, uy, r))
}

fn lerp(a: &Coordinate, b: &Coordinate, t: f64) -> (f64, f64) {
    (a.z + (b.z - a.z) * t, a.m + (b.m - a.m) * t)
}

/// Sweep from `from` to `to` in the direction given by `sign`, normalized into (0, 2π]
fn sweep(from: f64, to: f64, sign: f64) -> f64 {
    let two_pi = std::f64::consts::TAU;
    let mut s = (to - from) * sign;
    while s <= 0.0 {
        s += two_pi;
    }
    while s > two_pi {
        s -= two_pi;
    }
    s
}

fn segmentize_arc(p0: &Coordinate, p1: &Coordinate, p2: &Coordinate, step: f64) -> Vec<Coordinate> {
    // Full circle: p0 == p2 and p1 is the diametrically opposite point
    let full_circle = p0.same_xy(p2) && !p0.same_xy(p1);
    let (cx, cy, r) = if full_circle {
        ((p0.x + p1.x) / 2.0, (p0.y + p1.y) / 2.0, p0.distance_2d(p1) / 2.0)
    } else {
        match circle_center(p0, p1, p2) {
            Some(c) => c,
            None => return vec![*p0, *p1, *p2],
        }
    };

    let a0 = (p0.y - cy).atan2(p0.x - cx);
    let a1 = (p1.y - cy).atan2(p1.x - cx);
    let a2 = (p2.y - cy).atan2(p2.x - cx);

    // Orientation of the three points decides clockwise vs counter-clockwise
    let cross = (p1.x - p0.x) * (p2.y - p0.y) - (p1.y - p0.y) * (p2.x - p0.x);
    let sign = if full_circle || cross > 0.0 { 1.0 } else { -1.0 };

    let total = if full_circle {
        std::f64::consts::TAU
    } else {
        sweep(a0, a2, sign)
    };
    let to_mid = if full_circle { std::f64::consts::PI } else { sweep(a0, a1, sign) };

    let segments = (total / step - 1e-9).ceil().max(1.0) as usize;
    let mut out = Vec::with_capacity(segments + 2);
    out.push(*p0);

    let mut mid_inserted = false;
    for k in 1..segments {
        let t = k as f64 * total / segments as f64;
        if !mid_inserted {
            if (t - to_mid).abs() <= 1e-9 {
                out.push(*p1);
                mid_inserted = true;
                continue;
            }
            if t > to_mid {
                out.push(*p1);
                mid_inserted = true;
            }
        }
        let angle = a0 + sign * t;
        let (z, m) = if t <= to_mid {
            lerp(p0, p1, if to_mid > 0.0 { t / to_mid } else { 0.0 })
        } else {
            lerp(p1, p2, (t - to_mid) / (total - to_mid))
        };
        out.push(Coordinate::xyzm(cx + r * angle.cos(), cy + r * angle.sin(), z, m));
    }
    if !mid_inserted {
        out.push(*p1);
    }
    out.push(*p2);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linestring_closed() {
        let ring = LineString::from_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        assert!(ring.is_closed());
        assert!(!LineString::from_xy(&[(0.0, 0.0), (1.0, 0.0)]).is_closed());
    }

    #[test]
    fn test_linestring_append_skips_joint() {
        let mut a = LineString::from_xy(&[(0.0, 0.0), (1.0, 0.0)]);
        a.append(&LineString::from_xy(&[(1.0, 0.0), (2.0, 0.0)]));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_linearize_half_circle() {
        let arc = CircularString::new(
            vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(10.0, 10.0),
                Coordinate::new(20.0, 0.0),
            ],
            CoordDims::XY,
        );
        let line = arc.linearize(DEFAULT_ARC_STEP);

        // 180 one-degree steps plus the end point
        assert_eq!(line.len(), 181);
        assert_eq!(line.coords[0], Coordinate::new(0.0, 0.0));
        assert_eq!(line.coords[180], Coordinate::new(20.0, 0.0));
        assert!(line.coords.contains(&Coordinate::new(10.0, 10.0)));
        for c in &line.coords {
            assert_relative_eq!((c.x - 10.0).hypot(c.y), 10.0, epsilon = 1e-9);
        }
        assert_relative_eq!(line.length(), std::f64::consts::PI * 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_linearize_collinear_is_straight() {
        let arc = CircularString::new(
            vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(1.0, 1.0),
                Coordinate::new(2.0, 2.0),
            ],
            CoordDims::XY,
        );
        assert_eq!(arc.linearize(DEFAULT_ARC_STEP).len(), 3);
    }
}
