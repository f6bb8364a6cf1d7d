//! Rounded photo panels.
//!
//! A panel is the card's photo, resized to the panel's physical size at a
//! supersampled density and given a single rounded corner (top-left) through
//! its alpha channel. The extra pixels keep both the photo and the curved edge
//! clean when the output stage scales the panel back down.

use super::calculations::{apply_mask, corner_mask_value, supersampled_size, to_pixels};
use crate::assets::{AssetError, open_image};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use std::path::Path;

/// Physical description of a panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelParams {
    pub width_pt: f32,
    pub height_pt: f32,
    pub corner_radius_pt: f32,
    /// Pixels per point, e.g. `300 / 72` for a 300 DPI panel.
    pub supersample_factor: f32,
}

impl PanelParams {
    pub fn pixel_size(&self) -> (u32, u32) {
        supersampled_size(self.width_pt, self.height_pt, self.supersample_factor)
    }

    pub fn radius_px(&self) -> u32 {
        if self.corner_radius_pt <= 0.0 {
            return 0;
        }
        to_pixels(self.corner_radius_pt, self.supersample_factor)
    }
}

/// Build the corner mask for a panel of `width × height` pixels.
pub fn corner_mask(width: u32, height: u32, radius: u32) -> GrayImage {
    let mut mask = GrayImage::from_pixel(width, height, Luma([255]));
    let limit_x = radius.min(width);
    let limit_y = radius.min(height);
    for y in 0..limit_y {
        for x in 0..limit_x {
            mask.put_pixel(x, y, Luma([corner_mask_value(x, y, radius)]));
        }
    }
    mask
}

/// Composite an already decoded photo into a panel.
pub fn compose_panel(source: DynamicImage, params: &PanelParams) -> RgbaImage {
    // Palette, grey and 16-bit sources are normalized first; RGB and RGBA
    // pass through so existing alpha survives.
    let normalized = match source.color().channel_count() {
        3 | 4 => source,
        _ => DynamicImage::ImageRgb8(source.to_rgb8()),
    };

    let (width, height) = params.pixel_size();
    let resized = normalized.resize_exact(width, height, FilterType::Lanczos3);
    let had_alpha = resized.color().has_alpha();
    let mut panel = resized.to_rgba8();

    let mask = corner_mask(width, height, params.radius_px());
    for (pixel, mask_value) in panel.pixels_mut().zip(mask.pixels()) {
        pixel.0[3] = if had_alpha {
            apply_mask(pixel.0[3], mask_value.0[0])
        } else {
            mask_value.0[0]
        };
    }
    panel
}

/// Open a photo from disk and composite it into a panel.
pub fn create_panel(path: &Path, params: &PanelParams) -> Result<RgbaImage, AssetError> {
    let source = open_image(path)?;
    Ok(compose_panel(source, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_jpeg;
    use image::{GrayImage, Rgb, RgbImage, Rgba};
    use tempfile::TempDir;

    fn params() -> PanelParams {
        PanelParams {
            width_pt: 60.0,
            height_pt: 40.0,
            corner_radius_pt: 10.0,
            supersample_factor: 2.0,
        }
    }

    fn corner_alphas(panel: &RgbaImage, r: u32) -> [bool; 4] {
        // For each corner, does any pixel in its r×r box have alpha < 255?
        let (w, h) = panel.dimensions();
        let has_clear = |x0: u32, y0: u32| {
            (y0..y0 + r).any(|y| (x0..x0 + r).any(|x| panel.get_pixel(x, y).0[3] < 255))
        };
        [
            has_clear(0, 0),
            has_clear(w - r, 0),
            has_clear(0, h - r),
            has_clear(w - r, h - r),
        ]
    }

    #[test]
    fn panel_has_supersampled_size() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 100, Rgb([10, 20, 30])));
        let panel = compose_panel(source, &params());
        assert_eq!(panel.dimensions(), (120, 80));
    }

    #[test]
    fn only_top_left_corner_is_rounded() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([90, 90, 90])));
        let panel = compose_panel(source, &params());
        let r = params().radius_px();
        assert_eq!(r, 20);
        assert_eq!(panel.get_pixel(0, 0).0[3], 0);
        let (w, h) = panel.dimensions();
        assert_eq!(panel.get_pixel(w - 1, h - 1).0[3], 255);
        assert_eq!(corner_alphas(&panel, r), [true, false, false, false]);
    }

    #[test]
    fn rounding_holds_for_many_radii() {
        for radius_pt in [0.5_f32, 1.0, 3.0, 7.5, 19.0] {
            let rounded = PanelParams {
                corner_radius_pt: radius_pt,
                ..params()
            };
            let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([1, 2, 3])));
            let panel = compose_panel(source, &rounded);
            let r = rounded.radius_px();
            assert_eq!(panel.get_pixel(0, 0).0[3], 0, "radius {radius_pt}");
            let (w, h) = panel.dimensions();
            assert_eq!(panel.get_pixel(w - 1, h - 1).0[3], 255, "radius {radius_pt}");
            assert_eq!(corner_alphas(&panel, r), [true, false, false, false]);
        }
    }

    #[test]
    fn grey_sources_are_normalized_to_colour() {
        let source = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 40, Luma([200])));
        let panel = compose_panel(source, &params());
        let Rgba([r, g, b, a]) = *panel.get_pixel(60, 40);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert!(r.abs_diff(200) <= 1);
        assert_eq!(a, 255);
    }

    #[test]
    fn existing_alpha_is_multiplied_not_replaced() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 100])));
        let panel = compose_panel(source, &params());
        assert_eq!(panel.get_pixel(0, 0).0[3], 0);
        assert!(panel.get_pixel(60, 40).0[3].abs_diff(100) <= 1);
    }

    #[test]
    fn corner_mask_handles_radius_larger_than_image() {
        let mask = corner_mask(5, 5, 50);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.dimensions(), (5, 5));
    }

    #[test]
    fn create_panel_reads_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        write_jpeg(&path, 90, 60);
        let panel = create_panel(&path, &params()).unwrap();
        assert_eq!(panel.dimensions(), (120, 80));
    }

    #[test]
    fn create_panel_missing_source_errors() {
        let err = create_panel(Path::new("/nonexistent/photo.jpg"), &params()).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }
}
