//! Physical units and the small amount of plane geometry the engine needs.
//!
//! All layout happens in PostScript points (1/72 inch) with the origin at the
//! bottom-left, the same frame a PDF page uses. Raster output flips the y axis
//! at the very last moment (see [`crate::render::raster`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Points per centimetre.
pub const CM: f32 = 72.0 / 2.54;
/// Points per millimetre.
pub const MM: f32 = CM / 10.0;
/// Points per inch.
pub const INCH: f32 = 72.0;

/// A length in points.
///
/// Deserializes from either a bare number (points) or a string with a unit
/// suffix: `"9.57cm"`, `"10mm"`, `"2pt"`, `"1in"`. Serializes as a bare
/// number of points.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "LengthRepr", into = "LengthRepr")]
pub struct Length(pub f32);

impl Length {
    pub fn cm(value: f32) -> Self {
        Self(value * CM)
    }

    pub fn mm(value: f32) -> Self {
        Self(value * MM)
    }

    pub fn pt(value: f32) -> Self {
        Self(value)
    }

    pub fn points(self) -> f32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid length {0:?}: expected a number with an optional cm, mm, pt or in suffix")]
pub struct LengthParseError(String);

impl FromStr for Length {
    type Err = LengthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (number, scale) = [("cm", CM), ("mm", MM), ("pt", 1.0), ("in", INCH)]
            .iter()
            .find_map(|(suffix, scale)| {
                trimmed
                    .strip_suffix(suffix)
                    .map(|n| (n.trim_end(), *scale))
            })
            .unwrap_or((trimmed, 1.0));
        number
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| Length(v * scale))
            .ok_or_else(|| LengthParseError(s.to_string()))
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}pt", self.0)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LengthRepr {
    Points(f32),
    Text(String),
}

impl TryFrom<LengthRepr> for Length {
    type Error = LengthParseError;

    fn try_from(repr: LengthRepr) -> Result<Self, Self::Error> {
        match repr {
            LengthRepr::Points(v) if v.is_finite() => Ok(Length(v)),
            LengthRepr::Points(v) => Err(LengthParseError(v.to_string())),
            LengthRepr::Text(s) => s.parse(),
        }
    }
}

impl From<Length> for LengthRepr {
    fn from(length: Length) -> Self {
        LengthRepr::Points(length.0)
    }
}

/// A point in the bottom-left-origin layout frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, by: Point) -> Self {
        Self::new(self.x + by.x, self.y + by.y)
    }
}

/// An axis-aligned rectangle anchored at its bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translate(&self, by: Point) -> Self {
        Self::new(self.x + by.x, self.y + by.y, self.width, self.height)
    }

    /// The largest rectangle with the aspect ratio `content_w:content_h` that
    /// fits inside `self`, centred.
    pub fn contain(&self, content_w: u32, content_h: u32) -> Rect {
        if content_w == 0 || content_h == 0 {
            return *self;
        }
        let scale = (self.width / content_w as f32).min(self.height / content_h as f32);
        let w = content_w as f32 * scale;
        let h = content_h as f32 * scale;
        Rect::new(
            self.x + (self.width - w) / 2.0,
            self.y + (self.height - h) / 2.0,
            w,
            h,
        )
    }
}
