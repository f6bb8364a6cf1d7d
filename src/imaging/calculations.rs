//! Pure calculation functions for panel pixels.
//!
//! All functions here are pure and testable without any I/O or images.

/// Convert a physical length to pixels at `factor` pixels per point.
///
/// Rounds to the nearest pixel and never returns zero, so a degenerate
/// configuration still produces a drawable image.
///
/// ```
/// # use cardpress::imaging::to_pixels;
/// // 8.25cm at 300 DPI
/// assert_eq!(to_pixels(233.858, 300.0 / 72.0), 974);
/// ```
pub fn to_pixels(points: f32, factor: f32) -> u32 {
    ((points * factor).round() as u32).max(1)
}

/// Supersampled pixel size of a panel.
pub fn supersampled_size(width_pt: f32, height_pt: f32, factor: f32) -> (u32, u32) {
    (to_pixels(width_pt, factor), to_pixels(height_pt, factor))
}

/// Corner mask value for pixel `(x, y)` given a corner radius in pixels.
///
/// Pixels inside the `radius × radius` top-left box are transparent unless
/// they fall inside the disc of the same radius centred at `(radius, radius)`;
/// everything else is opaque. A pixel belongs to the disc when its centre lies
/// at least half a pixel inside the circle, so even a one-pixel radius clears
/// the outermost pixel.
pub fn corner_mask_value(x: u32, y: u32, radius: u32) -> u8 {
    if x >= radius || y >= radius {
        return 255;
    }
    let r = radius as f32;
    let dx = x as f32 + 0.5 - r;
    let dy = y as f32 + 0.5 - r;
    let inner = r - 0.5;
    if dx * dx + dy * dy <= inner * inner { 255 } else { 0 }
}

/// Combine an existing alpha value with a mask value.
pub fn apply_mask(alpha: u8, mask: u8) -> u8 {
    ((alpha as u16 * mask as u16 + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_pixels_rounds_to_nearest() {
        assert_eq!(to_pixels(10.0, 1.04), 10);
        assert_eq!(to_pixels(10.0, 1.06), 11);
    }

    #[test]
    fn to_pixels_never_returns_zero() {
        assert_eq!(to_pixels(0.0, 4.0), 1);
    }

    #[test]
    fn reference_panel_supersamples_to_print_resolution() {
        // 8.25cm × 5.5cm at 300 DPI
        let (w, h) = supersampled_size(233.858, 155.906, 300.0 / 72.0);
        assert_eq!((w, h), (974, 650));
    }

    #[test]
    fn mask_clears_the_outer_corner() {
        assert_eq!(corner_mask_value(0, 0, 40), 0);
        assert_eq!(corner_mask_value(3, 1, 40), 0);
    }

    #[test]
    fn mask_keeps_the_disc_inside_the_box() {
        assert_eq!(corner_mask_value(39, 39, 40), 255);
        assert_eq!(corner_mask_value(40, 0, 40), 255);
        assert_eq!(corner_mask_value(0, 40, 40), 255);
    }

    #[test]
    fn mask_leaves_everything_outside_the_box_opaque() {
        assert_eq!(corner_mask_value(41, 0, 40), 255);
        assert_eq!(corner_mask_value(0, 41, 40), 255);
        assert_eq!(corner_mask_value(500, 500, 40), 255);
    }

    #[test]
    fn one_pixel_radius_still_clears_the_corner() {
        assert_eq!(corner_mask_value(0, 0, 1), 0);
        assert_eq!(corner_mask_value(1, 0, 1), 255);
    }

    #[test]
    fn zero_radius_is_fully_opaque() {
        assert_eq!(corner_mask_value(0, 0, 0), 255);
    }

    #[test]
    fn apply_mask_multiplies() {
        assert_eq!(apply_mask(255, 255), 255);
        assert_eq!(apply_mask(255, 0), 0);
        assert_eq!(apply_mask(128, 255), 128);
        assert_eq!(apply_mask(0, 255), 0);
    }
}
