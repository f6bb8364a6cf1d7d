//! Raster output for standalone card images.
//!
//! Layout coordinates are points with y up; the canvas is a `tiny_skia`
//! pixmap with y down. The flip happens here and nowhere else: every path
//! and image goes through [`RasterSurface::page_transform`] or a transform
//! built from it.
//!
//! Text is filled from glyph outlines. Advances come from the face that
//! supplies the outlines, and the run is then stretched to the width the
//! layout measured, so a substitute face never drifts out of its slot.

use super::{RenderError, Rotation, Surface};
use crate::assets::ImageAsset;
use crate::geometry::{Point, Rect};
use crate::text::FontFace;
use crate::text::metrics::{self, WidthTable};
use ab_glyph::{Font, FontArc, OutlineCurve};
use image::{DynamicImage, Rgba, RgbaImage};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{
    Color, ColorU8, FillRule, FilterQuality, LineCap, Paint, PathBuilder, Pixmap, PixmapPaint,
    Stroke, Transform,
};

/// Bézier handle length for a quarter circle.
const KAPPA: f32 = 0.552_284_8;

pub struct RasterSurface {
    pixmap: Pixmap,
    /// Pixels per point.
    scale: f32,
    height_pt: f32,
    widths: WidthTable,
    glyphs: Option<FontArc>,
}

impl fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("scale", &self.scale)
            .field("glyphs", &self.glyphs.is_some())
            .finish()
    }
}

impl RasterSurface {
    /// A white canvas of `width × height` points at `dpi`.
    pub fn new(width: f32, height: f32, dpi: u32, font: &FontFace) -> Result<Self, RenderError> {
        let scale = dpi as f32 / 72.0;
        let px_w = (width * scale).round();
        let px_h = (height * scale).round();
        let canvas_error = || RenderError::Canvas {
            width: px_w as u32,
            height: px_h as u32,
        };
        if !(px_w >= 1.0 && px_h >= 1.0) {
            return Err(canvas_error());
        }
        let mut pixmap = Pixmap::new(px_w as u32, px_h as u32).ok_or_else(canvas_error)?;
        pixmap.fill(Color::WHITE);
        Ok(Self {
            pixmap,
            scale,
            height_pt: height,
            widths: *font.widths(),
            glyphs: font.glyphs().cloned(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    /// Whether text can be drawn at all.
    pub fn has_glyphs(&self) -> bool {
        self.glyphs.is_some()
    }

    pub fn into_image(self) -> RgbaImage {
        let (w, h) = self.dimensions();
        let pixels = self.pixmap.pixels();
        RgbaImage::from_fn(w, h, |x, y| {
            let c = pixels[(y * w + x) as usize].demultiply();
            Rgba([c.red(), c.green(), c.blue(), c.alpha()])
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        self.pixmap
            .pixel(x, y)
            .map(|p| {
                let c = p.demultiply();
                Rgba([c.red(), c.green(), c.blue(), c.alpha()])
            })
            .unwrap_or(Rgba([0, 0, 0, 0]))
    }

    /// Save as an opaque PNG.
    pub fn save_png(self, path: &Path) -> Result<(), RenderError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        DynamicImage::ImageRgba8(self.into_image())
            .to_rgb8()
            .save(path)?;
        Ok(())
    }

    /// Points, y up, to pixels, y down.
    fn page_transform(&self) -> Transform {
        Transform::from_row(self.scale, 0.0, 0.0, -self.scale, 0.0, self.height_pt * self.scale)
    }

    fn ink() -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = true;
        paint
    }

    fn stroke(width: f32) -> Stroke {
        Stroke {
            // Stroke width is in points; the page transform scales it.
            width,
            line_cap: LineCap::Butt,
            ..Stroke::default()
        }
    }
}

/// Premultiplied copy of `image` for drawing.
fn to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Append a glyph outline in font units, shifted right by `pen` units.
fn push_outline(path: &mut PathBuilder, curves: &[OutlineCurve], pen: f32) {
    let mut last: Option<ab_glyph::Point> = None;
    let start = |path: &mut PathBuilder, p: ab_glyph::Point, last: Option<ab_glyph::Point>| {
        if last != Some(p) {
            path.close();
            path.move_to(p.x + pen, p.y);
        }
    };
    for curve in curves {
        match *curve {
            OutlineCurve::Line(a, b) => {
                start(path, a, last);
                path.line_to(b.x + pen, b.y);
                last = Some(b);
            }
            OutlineCurve::Quad(a, c, b) => {
                start(path, a, last);
                path.quad_to(c.x + pen, c.y, b.x + pen, b.y);
                last = Some(b);
            }
            OutlineCurve::Cubic(a, c1, c2, b) => {
                start(path, a, last);
                path.cubic_to(c1.x + pen, c1.y, c2.x + pen, c2.y, b.x + pen, b.y);
                last = Some(b);
            }
        }
    }
    path.close();
}

impl Surface for RasterSurface {
    fn draw_image(&mut self, asset: &Arc<ImageAsset>, rect: Rect, rotation: Rotation) {
        let (iw, ih) = (asset.width() as f32, asset.height() as f32);
        if iw == 0.0 || ih == 0.0 || rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let Some(source) = to_pixmap(&asset.pixels) else {
            return;
        };
        let left = rect.x * self.scale;
        let top = (self.height_pt - rect.top()) * self.scale;
        let (fw, fh) = (rect.width * self.scale, rect.height * self.scale);
        let transform = match rotation {
            Rotation::None => Transform::from_row(fw / iw, 0.0, 0.0, fh / ih, left, top),
            // Counter-clockwise: the image's right edge ends up on top.
            Rotation::QuarterTurn => {
                Transform::from_row(0.0, -fh / iw, fw / ih, 0.0, left, top + fh)
            }
        };
        let paint = PixmapPaint {
            quality: FilterQuality::Bicubic,
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    }

    fn draw_text(&mut self, text: &str, size: f32, origin: Point) {
        let Some(font) = self.glyphs.clone() else {
            return;
        };
        let Some(upem) = font.units_per_em().filter(|u| *u > 0.0) else {
            return;
        };
        let encoded = metrics::encode(text);

        let mut path = PathBuilder::new();
        let mut pen = 0.0;
        for &byte in &encoded {
            let Some(c) = metrics::decode_byte(byte) else {
                continue;
            };
            let id = font.glyph_id(c);
            if let Some(outline) = font.outline(id) {
                push_outline(&mut path, &outline.curves, pen);
            }
            pen += font.h_advance_unscaled(id);
        }
        let Some(path) = path.finish() else {
            return;
        };

        let em = size / upem;
        let measured = metrics::measure_encoded(&self.widths, &encoded, size);
        let natural = pen * em;
        let stretch = if natural > 0.0 && measured > 0.0 {
            measured / natural
        } else {
            1.0
        };
        let glyph_space = Transform::from_row(em * stretch, 0.0, 0.0, em, origin.x, origin.y);
        self.pixmap.fill_path(
            &path,
            &Self::ink(),
            FillRule::Winding,
            glyph_space.post_concat(self.page_transform()),
            None,
        );
    }

    fn stroke_round_rect(&mut self, rect: Rect, radius: f32, width: f32) {
        let r = radius.clamp(0.0, rect.width.min(rect.height) / 2.0);
        let k = r * KAPPA;
        let (x0, y0, x1, y1) = (rect.x, rect.y, rect.right(), rect.top());
        let mut pb = PathBuilder::new();
        pb.move_to(x0 + r, y0);
        pb.line_to(x1 - r, y0);
        pb.cubic_to(x1 - r + k, y0, x1, y0 + r - k, x1, y0 + r);
        pb.line_to(x1, y1 - r);
        pb.cubic_to(x1, y1 - r + k, x1 - r + k, y1, x1 - r, y1);
        pb.line_to(x0 + r, y1);
        pb.cubic_to(x0 + r - k, y1, x0, y1 - r + k, x0, y1 - r);
        pb.line_to(x0, y0 + r);
        pb.cubic_to(x0, y0 + r - k, x0 + r - k, y0, x0 + r, y0);
        pb.close();
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Self::stroke(width);
        self.pixmap
            .stroke_path(&path, &Self::ink(), &stroke, self.page_transform(), None);
    }

    fn stroke_line(&mut self, from: Point, to: Point, width: f32) {
        let mut pb = PathBuilder::new();
        pb.move_to(from.x, from.y);
        pb.line_to(to.x, to.y);
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Self::stroke(width);
        self.pixmap
            .stroke_path(&path, &Self::ink(), &stroke, self.page_transform(), None);
    }
}
