//! Panel imaging, pure Rust on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::open` |
//! | **Resize** | `resize_exact` with Lanczos3 |
//! | **Round corner** | alpha mask from [`corner_mask_value`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for pixel sizes and mask values (unit testable)
//! - **Panel**: [`create_panel`] combining decode, resize and masking

mod calculations;
pub mod panel;

pub use calculations::{apply_mask, corner_mask_value, supersampled_size, to_pixels};
pub use panel::{PanelParams, compose_panel, create_panel};
