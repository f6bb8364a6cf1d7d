//! The deck: an ordered list of card records.
//!
//! Records come from a JSON array (`cards.json`). Every field is optional;
//! missing text fields fall back to fixed placeholders when a card is resolved
//! for rendering, so the renderer never has to think about absence.
//!
//! ```json
//! [
//!   {
//!     "image": "kyoto.jpg",
//!     "flag": "jp.png",
//!     "continent": "asia",
//!     "transport": ["train", "bus"],
//!     "city": "Kyoto",
//!     "country": "Japan",
//!     "corner_number": "7",
//!     "corner_font_size": 18
//!   }
//! ]
//! ```
//!
//! Deck order is render and pagination order. The engine never reorders;
//! [`sort_deck`] exists for the `sort` command, which rewrites the file.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub const DEFAULT_CITY: &str = "City";
pub const DEFAULT_COUNTRY: &str = "Country";
pub const DEFAULT_CORNER_NUMBER: &str = "1";
pub const DEFAULT_CORNER_FONT_SIZE: f32 = 16.0;

/// One card as it appears in the deck file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<String>,
    /// Icon identifiers, top to bottom. `null` and a missing key both mean none.
    #[serde(
        default,
        deserialize_with = "nullable_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub transport: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Accepts `"7"` or `7` in the deck file.
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub corner_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_font_size: Option<f32>,
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Int(i64),
        Float(f64),
    }
    Ok(Option::<Repr>::deserialize(deserializer)?.map(|repr| match repr {
        Repr::Text(s) => s,
        Repr::Int(n) => n.to_string(),
        Repr::Float(f) => f.to_string(),
    }))
}

/// The ordered deck.
pub type Deck = Vec<CardRecord>;

/// Read a deck from a JSON file.
pub fn load_deck(path: &Path) -> Result<Deck, DeckError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a deck back as pretty-printed JSON.
pub fn save_deck(path: &Path, deck: &[CardRecord]) -> Result<(), DeckError> {
    let json = serde_json::to_string_pretty(deck)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Column order of the CSV export.
pub const CSV_COLUMNS: [&str; 8] = [
    "image",
    "flag",
    "continent",
    "transport",
    "city",
    "country",
    "corner_number",
    "corner_font_size",
];

/// A record flattened for spreadsheets: unset fields are empty cells and
/// the transport list is joined with `;`.
#[derive(Serialize)]
struct CsvRow<'a> {
    image: Option<&'a str>,
    flag: Option<&'a str>,
    continent: Option<&'a str>,
    transport: String,
    city: Option<&'a str>,
    country: Option<&'a str>,
    corner_number: Option<&'a str>,
    corner_font_size: Option<f32>,
}

impl<'a> From<&'a CardRecord> for CsvRow<'a> {
    fn from(card: &'a CardRecord) -> Self {
        Self {
            image: card.image.as_deref(),
            flag: card.flag.as_deref(),
            continent: card.continent.as_deref(),
            transport: card.transport.join(";"),
            city: card.city.as_deref(),
            country: card.country.as_deref(),
            corner_number: card.corner_number.as_deref(),
            corner_font_size: card.corner_font_size,
        }
    }
}

/// Export the deck as CSV, one row per card in deck order, with a header
/// row even for an empty deck.
pub fn write_csv(path: &Path, deck: &[CardRecord]) -> Result<(), DeckError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(CSV_COLUMNS)?;
    for card in deck {
        writer.serialize(CsvRow::from(card))?;
    }
    writer.flush()?;
    Ok(())
}

/// An asset identifier used as a file-name fragment (`<continent>_outline.png`,
/// `<icon>.png`).
///
/// Only ASCII letters, digits, `_` and `-` are accepted, so an identifier can
/// never escape its asset directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0:?} is not a valid asset identifier")]
pub struct InvalidIdentifier(pub String);

impl Identifier {
    pub fn parse(raw: &str) -> Result<Self, InvalidIdentifier> {
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidIdentifier(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record with defaults substituted, ready for layout.
///
/// Identifiers are kept raw here; they are validated when their assets are
/// resolved so an invalid one can be reported against the element it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCard {
    pub image: Option<String>,
    pub flag: Option<String>,
    pub continent: Option<String>,
    pub transport: Vec<String>,
    pub city: String,
    pub country: String,
    pub corner_number: String,
    pub corner_font_size: f32,
}

impl CardRecord {
    /// Apply the placeholder defaults once.
    pub fn resolve(&self) -> ResolvedCard {
        ResolvedCard {
            image: self.image.clone(),
            flag: self.flag.clone(),
            continent: self.continent.clone(),
            transport: self.transport.clone(),
            city: self.city.clone().unwrap_or_else(|| DEFAULT_CITY.to_string()),
            country: self
                .country
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            corner_number: self
                .corner_number
                .clone()
                .unwrap_or_else(|| DEFAULT_CORNER_NUMBER.to_string()),
            corner_font_size: self
                .corner_font_size
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(DEFAULT_CORNER_FONT_SIZE),
        }
    }

    /// File stem of the main image, used to name the card's standalone image.
    pub fn image_stem(&self) -> Option<String> {
        let image = self.image.as_deref()?;
        Path::new(image)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Rank given to transport combinations outside the known list, and to cards
/// without transport.
pub const UNRANKED: u32 = 99;

/// Known transport combinations, compared as sorted multisets.
const COMBINATION_ORDER: &[&[&str]] = &[
    &["bus", "bus"],
    &["bus", "train"],
    &["boat", "bus"],
    &["boat", "train"],
    &["boat", "bus", "train"],
];

/// Sorted copy of a transport list, so `[train, bus]` and `[bus, train]` compare equal.
pub fn transport_combination(transport: &[String]) -> Vec<String> {
    let mut combo = transport.to_vec();
    combo.sort();
    combo
}

/// Position of a transport combination in the deck's canonical order.
pub fn transport_rank(transport: &[String]) -> u32 {
    if transport.is_empty() {
        return UNRANKED;
    }
    let combo = transport_combination(transport);
    COMBINATION_ORDER
        .iter()
        .position(|known| known.iter().copied().eq(combo.iter().map(String::as_str)))
        .map(|p| p as u32)
        .unwrap_or(UNRANKED)
}

/// Order a deck by continent, then by transport combination rank. Stable.
pub fn sort_deck(deck: &mut [CardRecord]) {
    deck.sort_by(|a, b| {
        let ka = (a.continent.as_deref().unwrap_or(""), transport_rank(&a.transport));
        let kb = (b.continent.as_deref().unwrap_or(""), transport_rank(&b.transport));
        ka.cmp(&kb)
    });
}

// ============================================================================
// Summaries
// ============================================================================

/// Deck counts by continent and transport combination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeckStats {
    pub total: usize,
    pub by_continent: BTreeMap<String, usize>,
    pub by_combination: BTreeMap<Vec<String>, usize>,
    pub by_continent_combination: BTreeMap<String, BTreeMap<Vec<String>, usize>>,
}

impl DeckStats {
    pub fn collect(deck: &[CardRecord]) -> Self {
        let mut stats = DeckStats {
            total: deck.len(),
            ..Default::default()
        };
        for card in deck {
            let Some(continent) = card.continent.as_deref().filter(|c| !c.is_empty()) else {
                continue;
            };
            *stats.by_continent.entry(continent.to_string()).or_default() += 1;
            if card.transport.is_empty() {
                continue;
            }
            let combo = transport_combination(&card.transport);
            *stats.by_combination.entry(combo.clone()).or_default() += 1;
            *stats
                .by_continent_combination
                .entry(continent.to_string())
                .or_default()
                .entry(combo)
                .or_default() += 1;
        }
        stats
    }
}

/// Entries of a count map ordered by descending count, ties by key.
pub fn most_common<K: Ord + Clone>(counts: &BTreeMap<K, usize>) -> Vec<(K, usize)> {
    let mut entries: Vec<(K, usize)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}
