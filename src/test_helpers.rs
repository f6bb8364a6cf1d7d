//! Shared test utilities for the cardpress test suite.
//!
//! Writes small synthetic assets so tests never depend on real artwork, and
//! builds records and configs pointing at them.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_asset_tree(&tmp.path().join("input"));
//! let config = test_config(tmp.path());
//! let card = record("kyoto.jpg", "jp.png", "asia", &["bus", "train"], "Kyoto");
//! ```

use crate::config::PressConfig;
use crate::deck::CardRecord;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

// =========================================================================
// Asset files
// =========================================================================

/// Write a solid-colour PNG, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(width, height, Rgba(rgba))
        .save(path)
        .unwrap();
}

/// Write a JPEG with a horizontal gradient, creating parent directories.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_fn(width, height, |x, _| {
        let v = (x * 255 / width.max(1)) as u8;
        Rgb([v, 128, 255 - v])
    })
    .save(path)
    .unwrap();
}

/// Populate an input root with the assets the fixture records refer to:
///
/// ```text
/// landscapes/  kyoto.jpg photo0.jpg photo1.jpg
/// flags/       jp.png
/// continents/  asia_outline.png europe_outline.png
/// transport_icons/  bus.png train.png boat.png
/// ```
pub fn write_asset_tree(root: &Path) {
    for name in ["kyoto.jpg", "photo0.jpg", "photo1.jpg"] {
        write_jpeg(&root.join("landscapes").join(name), 90, 60);
    }
    write_png(&root.join("flags/jp.png"), 30, 20, [255, 255, 255, 255]);
    for continent in ["asia", "europe"] {
        write_png(
            &root.join(format!("continents/{continent}_outline.png")),
            24,
            24,
            [0, 0, 0, 128],
        );
    }
    for icon in ["bus", "train", "boat"] {
        write_png(
            &root.join(format!("transport_icons/{icon}.png")),
            16,
            16,
            [20, 20, 20, 255],
        );
    }
}

// =========================================================================
// Records and config
// =========================================================================

/// A record with the fields cards usually carry. Country and corner fields
/// stay unset.
pub fn record(image: &str, flag: &str, continent: &str, transport: &[&str], city: &str) -> CardRecord {
    CardRecord {
        image: Some(image.to_string()),
        flag: Some(flag.to_string()),
        continent: Some(continent.to_string()),
        transport: transport.iter().map(|s| s.to_string()).collect(),
        city: Some(city.to_string()),
        ..Default::default()
    }
}

/// Stock config reading from `<root>/input` and writing to `<root>/output`,
/// with low densities so rendering stays fast.
pub fn test_config(root: &Path) -> PressConfig {
    let mut config = PressConfig::default();
    config.paths.input = root.join("input");
    config.paths.output = root.join("output");
    config.panel.supersample_dpi = 36;
    config.raster.dpi = 72;
    config
}
