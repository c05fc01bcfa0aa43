//! Rectangle clipping
//!
//! Lines are clipped segment by segment with Cohen-Sutherland and broken
//! wherever they leave the rectangle. Polygons go through the boolean
//! intersection with the rectangle, which keeps holes and concave shells
//! intact.

use geo::{BooleanOps, BoundingRect, Coord, Geometry, LineString, MultiPolygon, Polygon, Rect};
use topotrace_core::geometry::Rectangle;

use super::convert::{collapse, dimension_geo, empty_of_dimension};

/// Cohen-Sutherland region codes
const INSIDE: u8 = 0b0000;
const LEFT: u8 = 0b0001;
const RIGHT: u8 = 0b0010;
const BOTTOM: u8 = 0b0100;
const TOP: u8 = 0b1000;

fn outcode(p: Coord<f64>, rect: &Rectangle) -> u8 {
    let mut code = INSIDE;
    if p.x < rect.xmin { code |= LEFT; }
    if p.x > rect.xmax { code |= RIGHT; }
    if p.y < rect.ymin { code |= BOTTOM; }
    if p.y > rect.ymax { code |= TOP; }
    code
}

fn clip_segment(
    mut p0: Coord<f64>,
    mut p1: Coord<f64>,
    rect: &Rectangle,
) -> Option<(Coord<f64>, Coord<f64>)> {
    let mut code0 = outcode(p0, rect);
    let mut code1 = outcode(p1, rect);

    loop {
        if (code0 | code1) == 0 {
            return Some((p0, p1));
        }
        if (code0 & code1) != 0 {
            return None;
        }

        let code_out = if code0 != 0 { code0 } else { code1 };
        let dx = p1.x - p0.x;
        let dy = p1.y - p0.y;

        let new_point = if code_out & TOP != 0 {
            let t = (rect.ymax - p0.y) / dy;
            Coord { x: p0.x + t * dx, y: rect.ymax }
        } else if code_out & BOTTOM != 0 {
            let t = (rect.ymin - p0.y) / dy;
            Coord { x: p0.x + t * dx, y: rect.ymin }
        } else if code_out & RIGHT != 0 {
            let t = (rect.xmax - p0.x) / dx;
            Coord { x: rect.xmax, y: p0.y + t * dy }
        } else {
            let t = (rect.xmin - p0.x) / dx;
            Coord { x: rect.xmin, y: p0.y + t * dy }
        };

        if code_out == code0 {
            p0 = new_point;
            code0 = outcode(p0, rect);
        } else {
            p1 = new_point;
            code1 = outcode(p1, rect);
        }
    }
}

/// Clip one line; a line that leaves and re-enters comes back in pieces
fn clip_line(line: &LineString<f64>, rect: &Rectangle) -> Vec<LineString<f64>> {
    let mut pieces = Vec::new();
    let mut current: Vec<Coord<f64>> = Vec::new();

    for window in line.0.windows(2) {
        match clip_segment(window[0], window[1], rect) {
            Some((c0, c1)) => {
                if current.last() != Some(&c0) {
                    if current.len() >= 2 {
                        pieces.push(LineString::new(std::mem::take(&mut current)));
                    }
                    current = vec![c0];
                }
                if c1 != c0 {
                    current.push(c1);
                }
            }
            None => {
                if current.len() >= 2 {
                    pieces.push(LineString::new(std::mem::take(&mut current)));
                }
                current.clear();
            }
        }
    }
    if current.len() >= 2 {
        pieces.push(LineString::new(current));
    }
    pieces
}

fn rect_polygon(rect: &Rectangle) -> Polygon<f64> {
    Rect::new(
        Coord { x: rect.xmin, y: rect.ymin },
        Coord { x: rect.xmax, y: rect.ymax },
    )
    .to_polygon()
}

fn clip_polygon(polygon: &Polygon<f64>, rect: &Rectangle) -> Vec<Polygon<f64>> {
    let Some(bounds) = polygon.bounding_rect() else {
        return Vec::new();
    };
    let bounds = Rectangle::new(bounds.min().x, bounds.min().y, bounds.max().x, bounds.max().y);
    if rect.contains(&bounds) {
        return vec![polygon.clone()];
    }
    if !rect.intersects(&bounds) || rect.width() <= 0.0 || rect.height() <= 0.0 {
        return Vec::new();
    }
    let clipped: MultiPolygon<f64> = polygon.intersection(&rect_polygon(rect));
    clipped.0
}

fn clip_parts(geom: &Geometry<f64>, rect: &Rectangle, out: &mut Vec<Geometry<f64>>) {
    match geom {
        Geometry::Point(p) => {
            if rect.contains_point(p.x(), p.y()) {
                out.push(geom.clone());
            }
        }
        Geometry::MultiPoint(mp) => out.extend(
            mp.0.iter()
                .filter(|p| rect.contains_point(p.x(), p.y()))
                .map(|p| Geometry::Point(*p)),
        ),
        Geometry::Line(l) => {
            let ls = LineString::new(vec![l.start, l.end]);
            out.extend(clip_line(&ls, rect).into_iter().map(Geometry::LineString));
        }
        Geometry::LineString(ls) => {
            out.extend(clip_line(ls, rect).into_iter().map(Geometry::LineString))
        }
        Geometry::MultiLineString(mls) => out.extend(
            mls.0
                .iter()
                .flat_map(|ls| clip_line(ls, rect))
                .map(Geometry::LineString),
        ),
        Geometry::Polygon(p) => {
            out.extend(clip_polygon(p, rect).into_iter().map(Geometry::Polygon))
        }
        Geometry::MultiPolygon(mp) => out.extend(
            mp.0.iter()
                .flat_map(|p| clip_polygon(p, rect))
                .map(Geometry::Polygon),
        ),
        Geometry::Rect(r) => {
            out.extend(clip_polygon(&r.to_polygon(), rect).into_iter().map(Geometry::Polygon))
        }
        Geometry::Triangle(t) => {
            out.extend(clip_polygon(&t.to_polygon(), rect).into_iter().map(Geometry::Polygon))
        }
        Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| clip_parts(g, rect, out)),
    }
}

/// Clip a geometry by a rectangle. Parts outside the rectangle vanish; a
/// geometry entirely outside yields an empty geometry of its dimension.
pub fn clip_by_rect(geom: &Geometry<f64>, rect: &Rectangle) -> Geometry<f64> {
    let mut parts = Vec::new();
    if !rect.is_empty() {
        clip_parts(geom, rect, &mut parts);
    }
    if parts.is_empty() {
        return empty_of_dimension(dimension_geo(geom));
    }
    collapse(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::convert::is_empty_geo;
    use geo::{Area, Point};

    fn unit_rect() -> Rectangle {
        Rectangle::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn test_clip_point_inside() {
        let point = Geometry::Point(Point::new(5.0, 5.0));
        assert_eq!(clip_by_rect(&point, &unit_rect()), point);
    }

    #[test]
    fn test_clip_point_outside() {
        let point = Geometry::Point(Point::new(15.0, 5.0));
        assert!(is_empty_geo(&clip_by_rect(&point, &unit_rect())));
    }

    #[test]
    fn test_clip_polygon_partial() {
        let poly = Geometry::Polygon(Polygon::new(
            LineString::from(vec![(-5.0, -5.0), (5.0, -5.0), (5.0, 5.0), (-5.0, 5.0), (-5.0, -5.0)]),
            vec![],
        ));
        let result = clip_by_rect(&poly, &unit_rect());
        assert!((result.unsigned_area() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_polygon_keeps_hole() {
        let poly = Geometry::Polygon(Polygon::new(
            LineString::from(vec![(-5.0, -5.0), (15.0, -5.0), (15.0, 15.0), (-5.0, 15.0), (-5.0, -5.0)]),
            vec![LineString::from(vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)])],
        ));
        let result = clip_by_rect(&poly, &unit_rect());
        assert!((result.unsigned_area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_polygon_fully_outside() {
        let poly = Geometry::Polygon(Polygon::new(
            LineString::from(vec![(20.0, 20.0), (30.0, 20.0), (30.0, 30.0), (20.0, 30.0), (20.0, 20.0)]),
            vec![],
        ));
        let result = clip_by_rect(&poly, &unit_rect());
        assert!(is_empty_geo(&result));
        assert_eq!(dimension_geo(&result), 2);
    }

    #[test]
    fn test_clip_line_partial() {
        let line = Geometry::LineString(LineString::from(vec![(-5.0, 5.0), (15.0, 5.0)]));
        let Geometry::LineString(clipped) = clip_by_rect(&line, &unit_rect()) else {
            panic!("expected LineString");
        };
        assert_eq!(clipped.0.len(), 2);
        assert!((clipped.0[0].x - 0.0).abs() < 1e-10);
        assert!((clipped.0[1].x - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_clip_line_reentering_is_split() {
        let line = Geometry::LineString(LineString::from(vec![
            (2.0, 5.0),
            (2.0, 15.0),
            (8.0, 15.0),
            (8.0, 5.0),
        ]));
        let Geometry::MultiLineString(pieces) = clip_by_rect(&line, &unit_rect()) else {
            panic!("expected MultiLineString");
        };
        assert_eq!(pieces.0.len(), 2);
    }
}
