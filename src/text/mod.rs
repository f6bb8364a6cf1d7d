//! Label text: encoding, metrics, font selection and adaptive fitting.

pub mod fit;
pub mod font;
pub mod metrics;

pub use fit::{FitParams, TextFit, TextMeasure, fit};
pub use font::{
    BUNDLED_BOLD_SANS, FontChoice, FontError, FontFace, FontProgram, OutlineKind, VerticalMetrics,
    load_font,
};
