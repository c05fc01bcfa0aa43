//! Well-Known Text reader and writer

use super::{
    CircularString, CoordDims, Coordinate, Geometry, GeometryCollection, LineString,
    MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(f64),
    Open,
    Close,
    Comma,
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    len: usize,
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push((i, Token::Open));
                i += 1;
            }
            ')' => {
                tokens.push((i, Token::Close));
                i += 1;
            }
            ',' => {
                tokens.push((i, Token::Comma));
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < bytes.len() && (bytes[i] as char).is_ascii_alphabetic() {
                    i += 1;
                }
                tokens.push((start, Token::Word(text[start..i].to_ascii_uppercase())));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let start = i;
                i += 1;
                while i < bytes.len() {
                    let d = bytes[i] as char;
                    let exponent_sign = (d == '-' || d == '+')
                        && matches!(bytes[i - 1] as char, 'e' | 'E');
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let value = text[start..i].parse::<f64>().map_err(|_| Error::InvalidWkt {
                    offset: start,
                    message: format!("invalid number '{}'", &text[start..i]),
                })?;
                tokens.push((start, Token::Number(value)));
            }
            other => {
                return Err(Error::InvalidWkt {
                    offset: i,
                    message: format!("unexpected character '{}'", other),
                })
            }
        }
    }
    Ok(tokens)
}

impl Parser {
    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        let offset = self.tokens.get(self.pos).map_or(self.len, |(o, _)| *o);
        Err(Error::InvalidWkt {
            offset,
            message: message.into(),
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        t
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(t) if t == expected => Ok(()),
            Some(t) => {
                self.pos -= 1;
                self.error(format!("expected {:?}, found {:?}", expected, t))
            }
            None => self.error(format!("expected {:?}, found end of input", expected)),
        }
    }

    fn word(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w),
            _ => {
                self.pos -= 1;
                self.error("expected a geometry keyword")
            }
        }
    }

    /// Optional Z / M / ZM tag after the type keyword
    fn dims_tag(&mut self) -> Option<CoordDims> {
        let dims = match self.peek() {
            Some(Token::Word(w)) if w == "Z" => CoordDims::XYZ,
            Some(Token::Word(w)) if w == "M" => CoordDims::XYM,
            Some(Token::Word(w)) if w == "ZM" => CoordDims::XYZM,
            _ => return None,
        };
        self.pos += 1;
        Some(dims)
    }

    /// Consumes EMPTY if present
    fn empty(&mut self) -> bool {
        if matches!(self.peek(), Some(Token::Word(w)) if w == "EMPTY") {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn coordinate(&mut self, dims: &mut Option<CoordDims>) -> Result<Coordinate> {
        let mut values = Vec::with_capacity(4);
        while let Some(Token::Number(v)) = self.peek() {
            values.push(*v);
            self.pos += 1;
        }
        let d = match *dims {
            Some(d) => d,
            None => {
                let inferred = match values.len() {
                    3 => CoordDims::XYZ,
                    4 => CoordDims::XYZM,
                    _ => CoordDims::XY,
                };
                *dims = Some(inferred);
                inferred
            }
        };
        if values.len() != d.ordinate_count() {
            return self.error(format!(
                "expected {} ordinates, found {}",
                d.ordinate_count(),
                values.len()
            ));
        }
        Ok(match (d.z, d.m) {
            (false, false) => Coordinate::new(values[0], values[1]),
            (true, false) => Coordinate::xyz(values[0], values[1], values[2]),
            (false, true) => Coordinate::xym(values[0], values[1], values[2]),
            (true, true) => Coordinate::xyzm(values[0], values[1], values[2], values[3]),
        })
    }

    fn coordinate_list(&mut self, dims: &mut Option<CoordDims>) -> Result<Vec<Coordinate>> {
        if self.empty() {
            return Ok(Vec::new());
        }
        self.expect(Token::Open)?;
        let mut coords = vec![self.coordinate(dims)?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            coords.push(self.coordinate(dims)?);
        }
        self.expect(Token::Close)?;
        Ok(coords)
    }

    /// Comma separated list of items wrapped in parentheses
    fn list<T>(
        &mut self,
        dims: &mut Option<CoordDims>,
        mut item: impl FnMut(&mut Self, &mut Option<CoordDims>) -> Result<T>,
    ) -> Result<Vec<T>> {
        if self.empty() {
            return Ok(Vec::new());
        }
        self.expect(Token::Open)?;
        let mut items = vec![item(self, dims)?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            items.push(item(self, dims)?);
        }
        self.expect(Token::Close)?;
        Ok(items)
    }

    fn polygon_body(&mut self, dims: &mut Option<CoordDims>) -> Result<Vec<Vec<Coordinate>>> {
        self.list(dims, |p, d| p.coordinate_list(d))
    }

    fn geometry(&mut self) -> Result<Geometry> {
        let keyword = self.word()?;
        let mut dims = self.dims_tag();

        let geometry = match keyword.as_str() {
            "POINT" => {
                if self.empty() {
                    Geometry::Point(Point::empty(dims.unwrap_or_default()))
                } else {
                    self.expect(Token::Open)?;
                    let c = self.coordinate(&mut dims)?;
                    self.expect(Token::Close)?;
                    Geometry::Point(Point::from_coord(c, dims.unwrap_or_default()))
                }
            }
            "LINESTRING" => {
                let coords = self.coordinate_list(&mut dims)?;
                Geometry::LineString(LineString::new(coords, dims.unwrap_or_default()))
            }
            "CIRCULARSTRING" => {
                let coords = self.coordinate_list(&mut dims)?;
                Geometry::CircularString(CircularString::new(coords, dims.unwrap_or_default()))
            }
            "POLYGON" => {
                let rings = self.polygon_body(&mut dims)?;
                Geometry::Polygon(polygon_from_rings(rings, dims.unwrap_or_default()))
            }
            "MULTIPOINT" => {
                let points = self.list(&mut dims, |p, d| {
                    // Both MULTIPOINT ((1 2), (3 4)) and MULTIPOINT (1 2, 3 4)
                    if p.peek() == Some(&Token::Open) {
                        p.pos += 1;
                        let c = p.coordinate(d)?;
                        p.expect(Token::Close)?;
                        Ok(Some(c))
                    } else if p.empty() {
                        Ok(None)
                    } else {
                        p.coordinate(d).map(Some)
                    }
                })?;
                let d = dims.unwrap_or_default();
                Geometry::MultiPoint(MultiPoint::new(
                    points
                        .into_iter()
                        .map(|c| match c {
                            Some(c) => Point::from_coord(c, d),
                            None => Point::empty(d),
                        })
                        .collect(),
                    d,
                ))
            }
            "MULTILINESTRING" => {
                let lines = self.list(&mut dims, |p, d| p.coordinate_list(d))?;
                let d = dims.unwrap_or_default();
                Geometry::MultiLineString(MultiLineString::new(
                    lines.into_iter().map(|c| LineString::new(c, d)).collect(),
                    d,
                ))
            }
            "MULTIPOLYGON" => {
                let polygons = self.list(&mut dims, |p, d| p.polygon_body(d))?;
                let d = dims.unwrap_or_default();
                Geometry::MultiPolygon(MultiPolygon::new(
                    polygons.into_iter().map(|r| polygon_from_rings(r, d)).collect(),
                    d,
                ))
            }
            "GEOMETRYCOLLECTION" => {
                let members = if self.empty() {
                    Vec::new()
                } else {
                    self.expect(Token::Open)?;
                    let mut members = vec![self.geometry()?];
                    while self.peek() == Some(&Token::Comma) {
                        self.pos += 1;
                        members.push(self.geometry()?);
                    }
                    self.expect(Token::Close)?;
                    members
                };
                let d = dims.unwrap_or_else(|| {
                    members.first().map(Geometry::dims).unwrap_or_default()
                });
                Geometry::GeometryCollection(GeometryCollection::new(members, d))
            }
            other => return self.error(format!("unknown geometry type '{}'", other)),
        };
        Ok(geometry)
    }
}

fn polygon_from_rings(rings: Vec<Vec<Coordinate>>, dims: CoordDims) -> Polygon {
    let mut rings = rings.into_iter().map(|c| LineString::new(c, dims));
    match rings.next() {
        Some(exterior) => Polygon {
            exterior,
            interiors: rings.collect(),
            dims,
        },
        None => Polygon::empty(dims),
    }
}

/// Parse a WKT string into a geometry
pub fn parse(text: &str) -> Result<Geometry> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
        len: text.len(),
    };
    let geometry = parser.geometry()?;
    if parser.pos < parser.tokens.len() {
        return parser.error("trailing content after geometry");
    }
    Ok(geometry)
}

fn write_coord(out: &mut String, c: &Coordinate, dims: CoordDims) {
    out.push_str(&format!("{} {}", c.x, c.y));
    if dims.z {
        out.push_str(&format!(" {}", c.z));
    }
    if dims.m {
        out.push_str(&format!(" {}", c.m));
    }
}

fn write_coords(out: &mut String, coords: &[Coordinate], dims: CoordDims) {
    if coords.is_empty() {
        out.push_str("EMPTY");
        return;
    }
    out.push('(');
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_coord(out, c, dims);
    }
    out.push(')');
}

fn write_polygon_body(out: &mut String, p: &Polygon) {
    if p.is_empty() {
        out.push_str("EMPTY");
        return;
    }
    out.push('(');
    for (i, ring) in p.rings().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_coords(out, &ring.coords, p.dims);
    }
    out.push(')');
}

fn write_list<T>(out: &mut String, items: &[T], mut item: impl FnMut(&mut String, &T)) {
    if items.is_empty() {
        out.push_str("EMPTY");
        return;
    }
    out.push('(');
    for (i, it) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item(out, it);
    }
    out.push(')');
}

/// Serialize a geometry as WKT
pub fn write(geometry: &Geometry) -> String {
    let mut out = String::new();
    out.push_str(geometry.geometry_type().wkt_name());
    let dims = geometry.dims();
    if !dims.wkt_tag().is_empty() {
        out.push(' ');
        out.push_str(dims.wkt_tag());
    }
    out.push(' ');

    match geometry {
        Geometry::Point(p) => match &p.coord {
            Some(c) => {
                out.push('(');
                write_coord(&mut out, c, p.dims);
                out.push(')');
            }
            None => out.push_str("EMPTY"),
        },
        Geometry::LineString(l) => write_coords(&mut out, &l.coords, l.dims),
        Geometry::CircularString(c) => write_coords(&mut out, &c.coords, c.dims),
        Geometry::Polygon(p) => write_polygon_body(&mut out, p),
        Geometry::MultiPoint(mp) => write_list(&mut out, &mp.points, |o, p| match &p.coord {
            Some(c) => {
                o.push('(');
                write_coord(o, c, mp.dims);
                o.push(')');
            }
            None => o.push_str("EMPTY"),
        }),
        Geometry::MultiLineString(ml) => {
            write_list(&mut out, &ml.lines, |o, l| write_coords(o, &l.coords, ml.dims))
        }
        Geometry::MultiPolygon(mp) => write_list(&mut out, &mp.polygons, write_polygon_body),
        Geometry::GeometryCollection(gc) => {
            write_list(&mut out, &gc.geometries, |o, g| o.push_str(&write(g)))
        }
    }
    out
}
