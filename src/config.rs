//! Press configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! reproduce the reference card: a 9.57 × 6.67 cm card with an 8.25 × 5.5 cm
//! photo panel, tiled 3 × 3 on landscape A4.
//!
//! ## Config File Location
//!
//! ```text
//! project/
//! ├── config.toml        # optional, overrides stock defaults
//! ├── cards.json         # the deck
//! └── input/
//!     ├── landscapes/    # main photos
//!     ├── flags/
//!     ├── continents/    # <continent>_outline.png
//!     └── transport_icons/  # <icon>.png
//! ```
//!
//! ## Lengths
//!
//! Every length accepts a unit suffix (`"9.57cm"`, `"10mm"`, `"2pt"`, `"1in"`)
//! or a bare number in points.
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [page]
//! gap = "2mm"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::geometry::Length;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Press configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PressConfig {
    /// Where assets are read from and artifacts written to.
    pub paths: PathsConfig,
    /// Page size and grid.
    pub page: PageConfig,
    /// Outer card rectangle.
    pub card: CardConfig,
    /// The rounded photo panel.
    pub panel: PanelConfig,
    /// Label fitting and placement.
    pub text: TextConfig,
    /// Continent badge and transport icon column.
    pub icons: IconsConfig,
    /// Standalone card image output.
    pub raster: RasterConfig,
    /// The separate sheet of transport-icon cards.
    pub transport_deck: TransportDeckConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PressConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // NaN slips through every range comparison below.
        let numbers = [
            ("text.base_font_size", self.text.base_font_size),
            ("text.min_font_size", self.text.min_font_size),
            ("text.country_font_size", self.text.country_font_size),
            ("text.long_label_threshold", self.text.long_label_threshold),
            ("text.flag_aspect", self.text.flag_aspect),
            ("transport_deck.icon_scale", self.transport_deck.icon_scale),
        ];
        for (key, value) in numbers {
            if !value.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a finite number"
                )));
            }
        }
        let positive = [
            ("page.width", self.page.width),
            ("page.height", self.page.height),
            ("card.width", self.card.width),
            ("card.height", self.card.height),
            ("panel.width", self.panel.width),
            ("panel.height", self.panel.height),
            ("text.flag_size", self.text.flag_size),
            ("icons.continent_size", self.icons.continent_size),
            ("icons.transport_size", self.icons.transport_size),
        ];
        for (key, value) in positive {
            if value.points() <= 0.0 {
                return Err(ConfigError::Validation(format!("{key} must be positive")));
            }
        }
        if self.page.rows == 0 || self.page.columns == 0 {
            return Err(ConfigError::Validation(
                "page.rows and page.columns must be non-zero".into(),
            ));
        }
        if self.panel.width > self.card.width || self.panel.height > self.card.height {
            return Err(ConfigError::Validation(
                "panel must fit inside the card".into(),
            ));
        }
        let grid_w = self.page.columns as f32 * self.card.width.points()
            + (self.page.columns - 1) as f32 * self.page.gap.points();
        let grid_h = self.page.rows as f32 * self.card.height.points()
            + (self.page.rows - 1) as f32 * self.page.gap.points();
        if grid_w > self.page.width.points() || grid_h > self.page.height.points() {
            return Err(ConfigError::Validation(format!(
                "a {}x{} grid of cards does not fit on the page",
                self.page.columns, self.page.rows
            )));
        }
        if self.text.min_font_size <= 0.0 || self.text.min_font_size > self.text.base_font_size {
            return Err(ConfigError::Validation(
                "text.min_font_size must be positive and at most text.base_font_size".into(),
            ));
        }
        if !(self.text.long_label_threshold > 0.0 && self.text.long_label_threshold <= 1.0) {
            return Err(ConfigError::Validation(
                "text.long_label_threshold must be in (0, 1]".into(),
            ));
        }
        // A label classified as short must always fit at the base size, otherwise
        // a longer label could be handed a larger font than a shorter one.
        let area = self.panel.width.points();
        let short_budget = area - self.text.short_left_margin.points() - self.text.right_margin.points();
        if self.text.long_label_threshold * area > short_budget {
            return Err(ConfigError::Validation(
                "text.long_label_threshold leaves short labels wider than the space the short margin allows"
                    .into(),
            ));
        }
        if self.panel.supersample_dpi == 0 || self.raster.dpi == 0 {
            return Err(ConfigError::Validation(
                "panel.supersample_dpi and raster.dpi must be non-zero".into(),
            ));
        }
        if self.text.country_font_size <= 0.0 || self.text.flag_aspect <= 0.0 {
            return Err(ConfigError::Validation(
                "text.country_font_size and text.flag_aspect must be positive".into(),
            ));
        }
        self.validate_transport_deck()
    }

    fn validate_transport_deck(&self) -> Result<(), ConfigError> {
        let deck = &self.transport_deck;
        if deck.rows == 0 || deck.columns == 0 {
            return Err(ConfigError::Validation(
                "transport_deck.rows and transport_deck.columns must be non-zero".into(),
            ));
        }
        if !(deck.icon_scale > 0.0 && deck.icon_scale <= 1.0) {
            return Err(ConfigError::Validation(
                "transport_deck.icon_scale must be in (0, 1]".into(),
            ));
        }
        if deck.margin.points() < 0.0 || deck.gap.points() < 0.0 {
            return Err(ConfigError::Validation(
                "transport_deck.margin and transport_deck.gap must not be negative".into(),
            ));
        }
        let (card_w, card_h) = deck.card_size(self.page.width.points(), self.page.height.points());
        if card_w <= 0.0 || card_h <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "a {}x{} grid of transport cards leaves no room inside the margin",
                deck.columns, deck.rows
            )));
        }
        if let Some(entry) = deck.icons.iter().find(|e| e.icon.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "transport_deck.icons has an entry without an icon name (count {})",
                entry.count
            )));
        }
        Ok(())
    }

    /// Cards tiled on one page.
    pub fn cards_per_page(&self) -> usize {
        (self.page.rows * self.page.columns) as usize
    }
}

/// Input and output locations, relative to the working directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Root of the asset tree (`landscapes/`, `flags/`, `continents/`, `transport_icons/`).
    pub input: PathBuf,
    /// Directory receiving the document and the card image folder.
    pub output: PathBuf,
    /// Document file name inside `output`.
    pub document: String,
    /// Sub-directory of `output` receiving one PNG per card.
    pub card_images: String,
    /// Optional TrueType/OpenType font. When absent, `Gagalin Regular.ttf` or
    /// `Gagalin-Regular.otf` in the input root are tried before falling back to
    /// the built-in bold sans-serif.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input"),
            output: PathBuf::from("output"),
            document: "cards.pdf".to_string(),
            card_images: "cards".to_string(),
            font: None,
        }
    }
}

/// Page size and card grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
    pub width: Length,
    pub height: Length,
    pub rows: u32,
    pub columns: u32,
    /// Space between neighbouring cards, both directions.
    pub gap: Length,
}

impl Default for PageConfig {
    fn default() -> Self {
        // A4 landscape
        Self {
            width: Length::mm(297.0),
            height: Length::mm(210.0),
            rows: 3,
            columns: 3,
            gap: Length::pt(1.0),
        }
    }
}

/// The outer card rectangle and its outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CardConfig {
    pub width: Length,
    pub height: Length,
    /// Radius of the card outline's corners.
    pub corner_radius: Length,
    /// Stroke width shared by the card outline and the panel border.
    pub border_width: Length,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            width: Length::cm(9.57),
            height: Length::cm(6.67),
            corner_radius: Length::mm(10.0),
            border_width: Length::pt(2.0),
        }
    }
}

/// The photo panel, anchored to the card's top-left corner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PanelConfig {
    pub width: Length,
    pub height: Length,
    /// Radius of the panel's single rounded (top-left) corner.
    pub corner_radius: Length,
    /// Pixel density the panel is composited at before being placed.
    pub supersample_dpi: u32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: Length::cm(8.25),
            height: Length::cm(5.5),
            corner_radius: Length::mm(10.0),
            supersample_dpi: 300,
        }
    }
}

impl PanelConfig {
    /// Pixels per point at the supersampled density.
    pub fn supersample_factor(&self) -> f32 {
        self.supersample_dpi as f32 / 72.0
    }
}

/// Label fitting and footer placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    /// City label size before shrinking.
    pub base_font_size: f32,
    /// Floor for the city label size; labels still too wide overflow.
    pub min_font_size: f32,
    pub country_font_size: f32,
    /// Fraction of the panel width above which a label counts as long.
    pub long_label_threshold: f32,
    pub long_left_margin: Length,
    pub short_left_margin: Length,
    pub right_margin: Length,
    /// Flag box width; its height is `flag_size * flag_aspect`.
    pub flag_size: Length,
    pub flag_aspect: f32,
    /// Space between the flag and the labels.
    pub gap: Length,
    /// Bottom of the flag box above the card's bottom edge.
    pub flag_baseline: Length,
    /// City label baseline above the card's bottom edge.
    pub city_baseline: Length,
    /// Distance from the city baseline down to the country baseline.
    pub country_drop: Length,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            base_font_size: 16.0,
            min_font_size: 8.0,
            country_font_size: 10.0,
            long_label_threshold: 0.7,
            long_left_margin: Length::cm(0.5),
            short_left_margin: Length::cm(1.2),
            right_margin: Length::cm(0.2),
            flag_size: Length::cm(1.0),
            flag_aspect: 0.67,
            gap: Length::cm(0.2),
            flag_baseline: Length::cm(0.25),
            city_baseline: Length::cm(0.55),
            country_drop: Length::cm(0.4),
        }
    }
}

/// Continent badge and transport icon column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IconsConfig {
    pub continent_size: Length,
    /// Badge distance from the card's right edge.
    pub continent_inset_x: Length,
    /// Badge distance from the card's top edge.
    pub continent_inset_y: Length,
    pub transport_size: Length,
    pub transport_spacing: Length,
    /// Downward shift of the centred icon block, clearing the continent badge.
    pub transport_nudge: Length,
}

impl Default for IconsConfig {
    fn default() -> Self {
        Self {
            continent_size: Length::cm(1.3),
            continent_inset_x: Length::cm(0.1),
            continent_inset_y: Length::cm(0.2),
            transport_size: Length::cm(1.0),
            transport_spacing: Length::cm(0.1),
            transport_nudge: Length::cm(0.5),
        }
    }
}

/// Standalone card image output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RasterConfig {
    pub dpi: u32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self { dpi: 300 }
    }
}

/// The transport-icon deck: plain cards showing one icon each, tiled to
/// fill the page inside a margin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportDeckConfig {
    /// Document file name inside `paths.output`.
    pub document: String,
    pub rows: u32,
    pub columns: u32,
    /// Blank border on every side of the page.
    pub margin: Length,
    pub gap: Length,
    pub corner_radius: Length,
    pub border_width: Length,
    /// Share of the card's width and height given to the icon box.
    pub icon_scale: f32,
    /// Cards printed per icon, in print order.
    pub icons: Vec<IconCount>,
}

/// `count` cards showing `transport_icons/<icon>.png`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IconCount {
    pub icon: String,
    pub count: usize,
}

impl IconCount {
    fn new(icon: &str, count: usize) -> Self {
        Self {
            icon: icon.to_string(),
            count,
        }
    }
}

impl Default for TransportDeckConfig {
    fn default() -> Self {
        Self {
            document: "transport_cards.pdf".to_string(),
            rows: 4,
            columns: 5,
            margin: Length::cm(0.5),
            gap: Length::pt(1.0),
            corner_radius: Length::mm(3.0),
            border_width: Length::pt(1.0),
            icon_scale: 0.8,
            icons: vec![
                IconCount::new("bus", 20),
                IconCount::new("train", 15),
                IconCount::new("boat", 13),
                IconCount::new("plane", 12),
            ],
        }
    }
}

impl TransportDeckConfig {
    /// Card size in points on a `page_w × page_h` page.
    pub fn card_size(&self, page_w: f32, page_h: f32) -> (f32, f32) {
        let share = |page: f32, n: u32| {
            (page - 2.0 * self.margin.points() - n.saturating_sub(1) as f32 * self.gap.points())
                / n.max(1) as f32
        };
        (share(page_w, self.columns), share(page_h, self.rows))
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel layout/raster workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PressConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PressConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PressConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file.
///
/// A missing file yields the stock defaults; a present but malformed one is an error.
pub fn load_config(path: &Path) -> Result<PressConfig, ConfigError> {
    if !path.exists() {
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# cardpress configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Lengths take a cm, mm, pt or in
# suffix; bare numbers are points. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Paths
# ---------------------------------------------------------------------------
[paths]
# Asset root: landscapes/, flags/, continents/, transport_icons/
input = "input"
output = "output"
document = "cards.pdf"
# One PNG per card lands in output/<card_images>/<image stem>.png
card_images = "cards"
# TrueType or OpenType font. Without it, "Gagalin Regular.ttf" or
# "Gagalin-Regular.otf" in the input root is tried, then a built-in bold sans.
# font = "input/MyFont.ttf"

# ---------------------------------------------------------------------------
# Page and grid (A4 landscape, 3 x 3)
# ---------------------------------------------------------------------------
[page]
width = "297mm"
height = "210mm"
rows = 3
columns = 3
gap = "1pt"

# ---------------------------------------------------------------------------
# Card
# ---------------------------------------------------------------------------
[card]
width = "9.57cm"
height = "6.67cm"
corner_radius = "10mm"
border_width = "2pt"

# ---------------------------------------------------------------------------
# Photo panel (top-left corner rounded)
# ---------------------------------------------------------------------------
[panel]
width = "8.25cm"
height = "5.5cm"
corner_radius = "10mm"
# Pixel density the panel is composited at before placement.
supersample_dpi = 300

# ---------------------------------------------------------------------------
# Labels
# ---------------------------------------------------------------------------
[text]
base_font_size = 16
# City labels shrink one point at a time down to this size.
min_font_size = 8
country_font_size = 10
# Flag + gap + label wider than this share of the panel width is "long"
# and gets the small left margin; shorter labels sit further right.
long_label_threshold = 0.7
long_left_margin = "0.5cm"
short_left_margin = "1.2cm"
right_margin = "0.2cm"
flag_size = "1cm"
flag_aspect = 0.67
gap = "0.2cm"
flag_baseline = "0.25cm"
city_baseline = "0.55cm"
country_drop = "0.4cm"

# ---------------------------------------------------------------------------
# Icons
# ---------------------------------------------------------------------------
[icons]
continent_size = "1.3cm"
continent_inset_x = "0.1cm"
continent_inset_y = "0.2cm"
transport_size = "1cm"
transport_spacing = "0.1cm"
transport_nudge = "0.5cm"

# ---------------------------------------------------------------------------
# Card images
# ---------------------------------------------------------------------------
[raster]
dpi = 300

# ---------------------------------------------------------------------------
# Transport-icon deck (the transport-cards command)
# ---------------------------------------------------------------------------
[transport_deck]
document = "transport_cards.pdf"
rows = 4
columns = 5
# Cards are sized to fill the page inside this margin.
margin = "0.5cm"
gap = "1pt"
corner_radius = "3mm"
border_width = "1pt"
# Each icon is fitted, aspect kept, in a centred box this share of the card.
icon_scale = 0.8

[[transport_deck.icons]]
icon = "bus"
count = 20

[[transport_deck.icons]]
icon = "train"
count = 15

[[transport_deck.icons]]
icon = "boat"
count = 13

[[transport_deck.icons]]
icon = "plane"
count = 12

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
