//! Drawing model shared by every output.
//!
//! The card renderer never touches an output directly. It produces a
//! [`CardLayout`]: an ordered list of [`DrawOp`]s in card-local points
//! (origin at the card's bottom-left corner, y up). A layout is replayed onto
//! any [`Surface`] at a page position, so the same card appears identically
//! in the document and in its standalone image.

pub mod card;
pub mod pdf;
pub mod raster;

use crate::assets::ImageAsset;
use crate::geometry::{Point, Rect};
use std::sync::Arc;
use thiserror::Error;

pub use card::{CardLayout, CardRenderer, Element, ElementOutcome, ElementStatus, SkipReason};
pub use pdf::PdfDocument;
pub use raster::RasterSurface;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("canvas of {width}×{height} pixels cannot be allocated")]
    Canvas { width: u32, height: u32 },
}

/// How an image is turned before it is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    /// 90° counter-clockwise about the image centre.
    QuarterTurn,
}

/// One drawing step. Coordinates are points, y up.
#[derive(Debug, Clone)]
pub enum DrawOp {
    /// `rect` is the final footprint, after rotation.
    Image {
        asset: Arc<ImageAsset>,
        rect: Rect,
        rotation: Rotation,
    },
    /// `origin` is the left end of the baseline.
    Text {
        text: String,
        size: f32,
        origin: Point,
    },
    RoundRect {
        rect: Rect,
        radius: f32,
        width: f32,
    },
    Line {
        from: Point,
        to: Point,
        width: f32,
    },
}

impl DrawOp {
    /// Draw onto `surface`, shifted by `offset`.
    pub fn apply(&self, surface: &mut dyn Surface, offset: Point) {
        match self {
            DrawOp::Image {
                asset,
                rect,
                rotation,
            } => surface.draw_image(asset, rect.translate(offset), *rotation),
            DrawOp::Text { text, size, origin } => {
                surface.draw_text(text, *size, origin.offset(offset))
            }
            DrawOp::RoundRect {
                rect,
                radius,
                width,
            } => surface.stroke_round_rect(rect.translate(offset), *radius, *width),
            DrawOp::Line { from, to, width } => {
                surface.stroke_line(from.offset(offset), to.offset(offset), *width)
            }
        }
    }
}

/// A drawing target for one page.
///
/// Surfaces share the layout's coordinate system: points with the origin at
/// the page's bottom-left corner. Drawing is infallible; failures surface
/// when the page or file is finished.
pub trait Surface {
    fn draw_image(&mut self, asset: &Arc<ImageAsset>, rect: Rect, rotation: Rotation);
    fn draw_text(&mut self, text: &str, size: f32, origin: Point);
    fn stroke_round_rect(&mut self, rect: Rect, radius: f32, width: f32);
    fn stroke_line(&mut self, from: Point, to: Point, width: f32);
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// Surface that remembers calls, for layout tests.
    #[derive(Debug, Default)]
    pub struct RecordingSurface {
        pub calls: Vec<String>,
    }

    impl Surface for RecordingSurface {
        fn draw_image(&mut self, asset: &Arc<ImageAsset>, rect: Rect, rotation: Rotation) {
            self.calls.push(format!(
                "image {} {:.1},{:.1} {:?}",
                asset.key, rect.x, rect.y, rotation
            ));
        }

        fn draw_text(&mut self, text: &str, size: f32, origin: Point) {
            self.calls
                .push(format!("text {text} {size} {:.1},{:.1}", origin.x, origin.y));
        }

        fn stroke_round_rect(&mut self, rect: Rect, radius: f32, _width: f32) {
            self.calls
                .push(format!("round {:.1},{:.1} r{radius:.1}", rect.x, rect.y));
        }

        fn stroke_line(&mut self, from: Point, to: Point, _width: f32) {
            self.calls.push(format!(
                "line {:.1},{:.1}-{:.1},{:.1}",
                from.x, from.y, to.x, to.y
            ));
        }
    }
}
