//! Axis-aligned rectangles

use serde::{Deserialize, Serialize};
use std::fmt;

use super::coord::Coordinate;
use super::curve::LineString;
use super::surface::Polygon;

/// Axis-aligned rectangle. Inverted bounds denote the empty rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Rectangle {
    /// Create a rectangle, swapping bounds given in the wrong order
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            xmin: x1.min(x2),
            ymin: y1.min(y2),
            xmax: x1.max(x2),
            ymax: y1.max(y2),
        }
    }

    pub fn empty() -> Self {
        Self {
            xmin: f64::INFINITY,
            ymin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymax: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.xmax < self.xmin || self.ymax < self.ymin
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() { 0.0 } else { self.xmax - self.xmin }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() { 0.0 } else { self.ymax - self.ymin }
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    pub fn contains(&self, other: &Rectangle) -> bool {
        !other.is_empty()
            && other.xmin >= self.xmin
            && other.xmax <= self.xmax
            && other.ymin >= self.ymin
            && other.ymax <= self.ymax
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.ymin <= other.ymax
            && self.ymax >= other.ymin
    }

    pub fn intersection(&self, other: &Rectangle) -> Rectangle {
        if !self.intersects(other) {
            return Rectangle::empty();
        }
        Rectangle {
            xmin: self.xmin.max(other.xmin),
            ymin: self.ymin.max(other.ymin),
            xmax: self.xmax.min(other.xmax),
            ymax: self.ymax.min(other.ymax),
        }
    }

    /// Grow to include a point
    pub fn include(&mut self, x: f64, y: f64) {
        self.xmin = self.xmin.min(x);
        self.ymin = self.ymin.min(y);
        self.xmax = self.xmax.max(x);
        self.ymax = self.ymax.max(y);
    }

    /// Grow to include another rectangle
    pub fn combine(&mut self, other: &Rectangle) {
        if other.is_empty() {
            return;
        }
        self.include(other.xmin, other.ymin);
        self.include(other.xmax, other.ymax);
    }

    /// Rectangle expanded by `delta` on every side
    pub fn buffered(&self, delta: f64) -> Rectangle {
        Rectangle {
            xmin: self.xmin - delta,
            ymin: self.ymin - delta,
            xmax: self.xmax + delta,
            ymax: self.ymax + delta,
        }
    }

    /// Expand by `delta` on every side in place
    pub fn grow(&mut self, delta: f64) {
        *self = self.buffered(delta);
    }

    /// Counter-clockwise ring polygon covering the rectangle
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(
            LineString::new(
                vec![
                    Coordinate::new(self.xmin, self.ymin),
                    Coordinate::new(self.xmax, self.ymin),
                    Coordinate::new(self.xmax, self.ymax),
                    Coordinate::new(self.xmin, self.ymax),
                    Coordinate::new(self.xmin, self.ymin),
                ],
                Default::default(),
            ),
            Vec::new(),
        )
    }
}

impl Default for Rectangle {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Empty")
        } else {
            write!(f, "{},{} : {},{}", self.xmin, self.ymin, self.xmax, self.ymax)
        }
    }
}
