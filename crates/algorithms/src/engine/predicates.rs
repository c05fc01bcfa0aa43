//! DE-9IM relate and the named spatial predicates derived from it.

use geo::{Geometry as GeoGeometry, Relate};

use super::convert::{dimension_geo, is_empty_geo};
use super::error::{EngineError, Result};

/// A dimensionally extended nine-intersection matrix in row-major order
/// (Interior, Boundary, Exterior of `a` against those of `b`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matrix([u8; 9]);

const CELL_VALUES: [u8; 4] = [b'F', b'0', b'1', b'2'];

impl Matrix {
    /// Compute the matrix of two backend geometries
    pub fn compute(a: &GeoGeometry<f64>, b: &GeoGeometry<f64>) -> Matrix {
        let im = a.relate(b);
        let mut cells = [b'F'; 9];
        for (i, cell) in cells.iter_mut().enumerate() {
            for value in CELL_VALUES {
                let mut spec = [b'*'; 9];
                spec[i] = value;
                // Only ASCII is written, so the conversion cannot fail
                let spec = std::str::from_utf8(&spec).unwrap_or("*********");
                if im.matches(spec).unwrap_or(false) {
                    *cell = value;
                    break;
                }
            }
        }
        Matrix(cells)
    }

    pub fn from_code(code: &str) -> Result<Matrix> {
        let bytes = code.as_bytes();
        if bytes.len() != 9 || !bytes.iter().all(|b| CELL_VALUES.contains(b)) {
            return Err(EngineError::InvalidInput(format!("'{}' is not an intersection matrix", code)));
        }
        let mut cells = [b'F'; 9];
        cells.copy_from_slice(bytes);
        Ok(Matrix(cells))
    }

    pub fn code(&self) -> String {
        self.0.iter().map(|&b| b as char).collect()
    }

    /// Match against a nine-character pattern of `T F * 0 1 2`
    pub fn matches(&self, pattern: &str) -> Result<bool> {
        let pattern = pattern.as_bytes();
        if pattern.len() != 9 {
            return Err(EngineError::InvalidInput(format!(
                "intersection pattern must have 9 characters, got {}",
                pattern.len()
            )));
        }
        for (cell, p) in self.0.iter().zip(pattern) {
            let ok = match p.to_ascii_uppercase() {
                b'*' => true,
                b'T' => *cell != b'F',
                b'F' => *cell == b'F',
                b'0' | b'1' | b'2' => *cell == *p,
                other => {
                    return Err(EngineError::InvalidInput(format!(
                        "invalid pattern character '{}'",
                        other as char
                    )))
                }
            };
            if !ok {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn is(&self, pattern: &str) -> bool {
        self.matches(pattern).unwrap_or(false)
    }

    pub fn is_disjoint(&self) -> bool {
        self.is("FF*FF****")
    }

    pub fn is_intersects(&self) -> bool {
        !self.is_disjoint()
    }

    pub fn is_touches(&self, dim_a: u8, dim_b: u8) -> bool {
        if dim_a == 0 && dim_b == 0 {
            return false;
        }
        self.is("FT*******") || self.is("F**T*****") || self.is("F***T****")
    }

    pub fn is_crosses(&self, dim_a: u8, dim_b: u8) -> bool {
        match (dim_a, dim_b) {
            (0, 1) | (0, 2) | (1, 2) => self.is("T*T******"),
            (1, 0) | (2, 0) | (2, 1) => self.is("T*****T**"),
            (1, 1) => self.is("0********"),
            _ => false,
        }
    }

    pub fn is_within(&self) -> bool {
        self.is("T*F**F***")
    }

    pub fn is_contains(&self) -> bool {
        self.is("T*****FF*")
    }

    pub fn is_overlaps(&self, dim_a: u8, dim_b: u8) -> bool {
        match (dim_a, dim_b) {
            (0, 0) | (2, 2) => self.is("T*T***T**"),
            (1, 1) => self.is("1*T***T**"),
            _ => false,
        }
    }

    pub fn is_equals(&self) -> bool {
        self.is("T*F**FFF*")
    }
}

impl std::fmt::Display for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Named predicate evaluated from a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Intersects,
    Touches,
    Crosses,
    Within,
    Overlaps,
    Contains,
    Disjoint,
    Equals,
}

/// Evaluate a named predicate without any prepared index
pub fn evaluate(a: &GeoGeometry<f64>, b: &GeoGeometry<f64>, predicate: Predicate) -> bool {
    if is_empty_geo(a) || is_empty_geo(b) {
        return predicate == Predicate::Disjoint;
    }
    let m = Matrix::compute(a, b);
    let (da, db) = (dimension_geo(a), dimension_geo(b));
    match predicate {
        Predicate::Intersects => m.is_intersects(),
        Predicate::Touches => m.is_touches(da, db),
        Predicate::Crosses => m.is_crosses(da, db),
        Predicate::Within => m.is_within(),
        Predicate::Overlaps => m.is_overlaps(da, db),
        Predicate::Contains => m.is_contains(),
        Predicate::Disjoint => m.is_disjoint(),
        Predicate::Equals => m.is_equals(),
    }
}
