//! Adaptive label sizing.
//!
//! A card's footer shows a flag followed by the city name. The fitter picks
//! a left margin from a two-tier rule (long labels hug the left edge, short
//! ones sit further in) and then shrinks the font one point at a time until
//! flag, gap and label fit the footer, stopping at a floor size.

use super::font::FontFace;
use crate::config::TextConfig;

/// Anything that can report the width of a string at a font size.
pub trait TextMeasure {
    fn measure(&self, text: &str, size: f32) -> f32;
}

impl TextMeasure for FontFace {
    fn measure(&self, text: &str, size: f32) -> f32 {
        FontFace::measure(self, text, size)
    }
}

/// Fitting inputs, all lengths in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParams {
    pub icon_width: f32,
    pub gap: f32,
    pub available_width: f32,
    pub base_size: f32,
    pub min_size: f32,
    /// Fraction of `available_width` above which a label counts as long.
    pub long_threshold: f32,
    pub long_left_margin: f32,
    pub short_left_margin: f32,
    pub right_margin: f32,
}

impl FitParams {
    pub fn from_config(text: &TextConfig, available_width: f32) -> Self {
        Self {
            icon_width: text.flag_size.points(),
            gap: text.gap.points(),
            available_width,
            base_size: text.base_font_size,
            min_size: text.min_font_size,
            long_threshold: text.long_label_threshold,
            long_left_margin: text.long_left_margin.points(),
            short_left_margin: text.short_left_margin.points(),
            right_margin: text.right_margin.points(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextFit {
    pub font_size: f32,
    pub left_margin: f32,
    pub long: bool,
    /// Still wider than the footer at the floor size.
    pub overflow: bool,
}

pub fn fit(measure: &impl TextMeasure, label: &str, params: &FitParams) -> TextFit {
    let span = |size: f32| params.icon_width + params.gap + measure.measure(label, size);

    let long = span(params.base_size) > params.long_threshold * params.available_width;
    let left_margin = if long {
        params.long_left_margin
    } else {
        params.short_left_margin
    };
    let room = params.available_width - left_margin - params.right_margin;

    let mut font_size = params.base_size;
    while span(font_size) > room && font_size > params.min_size {
        font_size = (font_size - 1.0).max(params.min_size);
    }

    TextFit {
        font_size,
        left_margin,
        long,
        overflow: span(font_size) > room,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Length;

    /// Every character is half an em wide.
    struct HalfEm;

    impl TextMeasure for HalfEm {
        fn measure(&self, text: &str, size: f32) -> f32 {
            text.chars().count() as f32 * size * 0.5
        }
    }

    fn cm(value: f32) -> f32 {
        Length::cm(value).points()
    }

    fn params() -> FitParams {
        FitParams::from_config(&TextConfig::default(), cm(8.25))
    }

    #[test]
    fn short_label_keeps_base_size_and_wide_margin() {
        let result = fit(&HalfEm, "Oslo", &params());
        assert_eq!(result.font_size, 16.0);
        assert!((result.left_margin - cm(1.2)).abs() < 1e-4);
        assert!(!result.long);
        assert!(!result.overflow);
    }

    #[test]
    fn threshold_picks_the_margin() {
        let p = params();
        // icon + gap = 1.2cm; the threshold is 0.7 × 8.25cm = 5.775cm.
        let threshold_label_width = 0.7 * cm(8.25) - cm(1.2);
        // At 16pt each character is 8pt wide.
        let at_threshold = (threshold_label_width / 8.0).floor() as usize;
        let just_over = at_threshold + 1;

        let short = fit(&HalfEm, &"a".repeat(at_threshold), &p);
        assert!((short.left_margin - cm(1.2)).abs() < 1e-4);

        let long = fit(&HalfEm, &"a".repeat(just_over), &p);
        assert!(long.long);
        assert!((long.left_margin - cm(0.5)).abs() < 1e-4);
    }

    #[test]
    fn long_label_shrinks_until_it_fits() {
        let p = params();
        let label = "Llanfairpwllgwyngyllgogery";
        let result = fit(&HalfEm, label, &p);
        assert!(result.long);
        assert_eq!(result.font_size, 13.0);
        assert!(!result.overflow);
        let room = p.available_width - result.left_margin - p.right_margin;
        assert!(p.icon_width + p.gap + HalfEm.measure(label, result.font_size) <= room);
    }

    #[test]
    fn very_long_label_stops_at_floor_and_reports_overflow() {
        let result = fit(&HalfEm, &"x".repeat(200), &params());
        assert_eq!(result.font_size, 8.0);
        assert!(result.overflow);
    }

    #[test]
    fn size_is_non_increasing_with_label_length() {
        let face = FontFace::builtin();
        let p = params();
        let mut previous = f32::INFINITY;
        for n in 0..80 {
            let label = "Wm".repeat(n / 2) + if n % 2 == 1 { "a" } else { "" };
            let result = fit(&face, &label, &p);
            assert!(result.font_size <= previous, "length {n}");
            assert!(result.font_size >= p.min_size);
            previous = result.font_size;
        }
    }

    #[test]
    fn identical_inputs_give_identical_fits() {
        let face = FontFace::builtin();
        let p = params();
        assert_eq!(fit(&face, "Valparaíso", &p), fit(&face, "Valparaíso", &p));
    }

    #[test]
    fn fractional_base_size_lands_exactly_on_floor() {
        let p = FitParams {
            base_size: 8.5,
            ..params()
        };
        let result = fit(&HalfEm, &"x".repeat(200), &p);
        assert_eq!(result.font_size, 8.0);
    }
}
