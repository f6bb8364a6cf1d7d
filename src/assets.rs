//! Asset resolution and loading.
//!
//! [`AssetResolver`] maps a logical name to a path under the input root; it is
//! pure and never fails. [`AssetStore`] decodes images on demand and keeps the
//! decoded pixels for the rest of the run, since flags, badges and icons repeat
//! across many cards. The store is shared across rayon workers, so the cache
//! sits behind a `Mutex`.

use crate::deck::Identifier;
use image::RgbaImage;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Asset directories under the input root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetCategory {
    Landscapes,
    Flags,
    Continents,
    TransportIcons,
}

impl AssetCategory {
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetCategory::Landscapes => "landscapes",
            AssetCategory::Flags => "flags",
            AssetCategory::Continents => "continents",
            AssetCategory::TransportIcons => "transport_icons",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Resolves logical asset names against the configured input root.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    root: PathBuf,
}

impl AssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute names pass through unchanged; anything else lands in
    /// `<root>/<category>/<name>`.
    pub fn resolve(&self, name: &str, category: AssetCategory) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        self.root.join(category.dir_name()).join(path)
    }

    /// Badge for a continent: `continents/<continent>_outline.png`.
    pub fn continent_badge(&self, continent: &Identifier) -> PathBuf {
        self.resolve(
            &format!("{continent}_outline.png"),
            AssetCategory::Continents,
        )
    }

    /// Icon for a transport mode: `transport_icons/<icon>.png`.
    pub fn transport_icon(&self, icon: &Identifier) -> PathBuf {
        self.resolve(&format!("{icon}.png"), AssetCategory::TransportIcons)
    }
}

#[derive(Error, Debug, Clone)]
pub enum AssetError {
    #[error("not found: {0}")]
    NotFound(PathBuf),
    #[error("cannot decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
}

/// Decoded pixels plus a stable key.
///
/// The key identifies the pixels for deduplication in the document: every
/// card showing the same flag shares one embedded image.
#[derive(Debug)]
pub struct ImageAsset {
    pub key: String,
    pub pixels: RgbaImage,
}

impl ImageAsset {
    pub fn new(key: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            key: key.into(),
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Loads and caches decoded icon-sized assets.
#[derive(Debug, Default)]
pub struct AssetStore {
    cache: Mutex<HashMap<PathBuf, Arc<ImageAsset>>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `path` to RGBA, or return the cached copy.
    pub fn load(&self, path: &Path) -> Result<Arc<ImageAsset>, AssetError> {
        if let Some(hit) = self.lock().get(path) {
            return Ok(Arc::clone(hit));
        }
        let pixels = open_image(path)?.to_rgba8();
        let asset = Arc::new(ImageAsset::new(path.to_string_lossy(), pixels));
        self.lock()
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::clone(&asset));
        Ok(asset)
    }

    pub fn cached_len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<ImageAsset>>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Decode any supported image without caching it.
pub fn open_image(path: &Path) -> Result<image::DynamicImage, AssetError> {
    if !path.is_file() {
        return Err(AssetError::NotFound(path.to_path_buf()));
    }
    image::open(path).map_err(|e| AssetError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_png;
    use tempfile::TempDir;

    #[test]
    fn relative_names_join_root_and_category() {
        let resolver = AssetResolver::new("/data/input");
        assert_eq!(
            resolver.resolve("kyoto.jpg", AssetCategory::Landscapes),
            PathBuf::from("/data/input/landscapes/kyoto.jpg")
        );
        assert_eq!(
            resolver.resolve("jp.png", AssetCategory::Flags),
            PathBuf::from("/data/input/flags/jp.png")
        );
    }

    #[test]
    fn absolute_names_pass_through() {
        let resolver = AssetResolver::new("/data/input");
        let absolute = std::env::temp_dir().join("elsewhere.jpg");
        assert_eq!(
            resolver.resolve(absolute.to_str().unwrap(), AssetCategory::Landscapes),
            absolute
        );
    }

    #[test]
    fn identifiers_build_conventional_file_names() {
        let resolver = AssetResolver::new("in");
        let asia = Identifier::parse("asia").unwrap();
        let bus = Identifier::parse("bus").unwrap();
        assert_eq!(
            resolver.continent_badge(&asia),
            PathBuf::from("in/continents/asia_outline.png")
        );
        assert_eq!(
            resolver.transport_icon(&bus),
            PathBuf::from("in/transport_icons/bus.png")
        );
    }

    #[test]
    fn store_caches_decoded_assets() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("flag.png");
        write_png(&path, 30, 20, [200, 0, 0, 255]);

        let store = AssetStore::new();
        let first = store.load(&path).unwrap();
        let second = store.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!((first.width(), first.height()), (30, 20));
        assert_eq!(store.cached_len(), 1);
    }

    #[test]
    fn store_reports_missing_files() {
        let store = AssetStore::new();
        let err = store.load(Path::new("/nonexistent/flag.png")).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }

    #[test]
    fn store_reports_undecodable_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = AssetStore::new().load(&path).unwrap_err();
        assert!(matches!(err, AssetError::Decode { .. }));
    }
}
