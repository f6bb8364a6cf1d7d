//! Font selection and loading.
//!
//! A deck may ship its own TrueType/OpenType face. Without one, labels use
//! the PDF base-14 Helvetica-Bold, whose metrics are compiled in. Raster
//! output needs real outlines for that case: a system face sharing
//! Helvetica's widths is preferred, and DejaVu Sans Bold, compiled into the
//! binary, covers hosts that have none.

use super::metrics::{self, WidthTable};
use ab_glyph::{Font, FontArc, FontVec};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Base-14 name of the built-in face.
pub const BUILTIN_FONT_NAME: &str = "Helvetica-Bold";

/// Cap height of Helvetica-Bold in 1/1000 em, from its AFM.
pub const HELVETICA_BOLD_CAP_HEIGHT: f32 = 718.0;

/// DejaVu Sans Bold (Bitstream Vera license, see `assets/fonts`).
pub static BUNDLED_BOLD_SANS: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// System families tried before the bundled face. The first three are
/// metric-compatible with Helvetica.
const SYSTEM_BOLD_SANS: [&str; 5] = [
    "Liberation Sans",
    "Arimo",
    "Nimbus Sans",
    "Helvetica",
    "Arial",
];

/// File names probed in the input root when no font is configured.
pub const CONVENTIONAL_FONT_FILES: [&str; 2] = ["Gagalin Regular.ttf", "Gagalin-Regular.otf"];

#[derive(Error, Debug)]
pub enum FontError {
    #[error("cannot read font {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse font {0}")]
    Invalid(PathBuf),
    #[error("font {0} has no usable metrics")]
    NoMetrics(PathBuf),
}

/// Outline format of an embedded font program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineKind {
    TrueType,
    /// CFF outlines in an OpenType wrapper (`OTTO` signature).
    OpenType,
}

impl OutlineKind {
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(b"OTTO") {
            OutlineKind::OpenType
        } else {
            OutlineKind::TrueType
        }
    }
}

/// Vertical metrics in 1/1000 em, as a PDF font descriptor wants them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub cap_height: f32,
}

/// Font bytes to embed in the document.
#[derive(Debug, Clone)]
pub struct FontProgram {
    pub data: Vec<u8>,
    pub kind: OutlineKind,
    pub metrics: VerticalMetrics,
}

/// The face used for every label on every card.
#[derive(Clone)]
pub struct FontFace {
    name: String,
    widths: WidthTable,
    program: Option<FontProgram>,
    glyphs: Option<FontArc>,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("name", &self.name)
            .field("embedded", &self.program.is_some())
            .field("glyphs", &self.glyphs.is_some())
            .finish()
    }
}

impl FontFace {
    pub fn builtin() -> Self {
        Self {
            name: BUILTIN_FONT_NAME.to_string(),
            widths: metrics::helvetica_bold_widths(),
            program: None,
            glyphs: None,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, FontError> {
        let data = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Embedded".to_string());
        Self::from_data(&name, data).map_err(|e| match e {
            FontError::Invalid(_) => FontError::Invalid(path.to_path_buf()),
            FontError::NoMetrics(_) => FontError::NoMetrics(path.to_path_buf()),
            other => other,
        })
    }

    /// Parse a font program held in memory.
    pub fn from_data(name: &str, data: Vec<u8>) -> Result<Self, FontError> {
        let kind = OutlineKind::detect(&data);
        let font = FontVec::try_from_vec(data.clone())
            .map_err(|_| FontError::Invalid(PathBuf::from(name)))?;
        let upem = font
            .units_per_em()
            .filter(|u| *u > 0.0)
            .ok_or_else(|| FontError::NoMetrics(PathBuf::from(name)))?;
        let per_mille = 1000.0 / upem;

        let widths = metrics::width_table(|c| {
            let id = font.glyph_id(c);
            (id.0 != 0).then(|| font.h_advance_unscaled(id) * per_mille)
        });
        let vertical = VerticalMetrics {
            ascent: font.ascent_unscaled() * per_mille,
            descent: font.descent_unscaled() * per_mille,
            cap_height: cap_height_unscaled(&font) * per_mille,
        };

        Ok(Self {
            name: pdf_font_name(name),
            widths,
            program: Some(FontProgram {
                data,
                kind,
                metrics: vertical,
            }),
            glyphs: Some(FontArc::new(font)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn widths(&self) -> &WidthTable {
        &self.widths
    }

    /// Font bytes to embed, `None` for the built-in face.
    pub fn program(&self) -> Option<&FontProgram> {
        self.program.as_ref()
    }

    pub fn is_builtin(&self) -> bool {
        self.program.is_none()
    }

    /// Vertical metrics for a font descriptor.
    pub fn vertical_metrics(&self) -> VerticalMetrics {
        match &self.program {
            Some(program) => program.metrics,
            None => VerticalMetrics {
                ascent: 718.0,
                descent: -207.0,
                cap_height: HELVETICA_BOLD_CAP_HEIGHT,
            },
        }
    }

    /// Outlines for raster output, if any are available.
    pub fn glyphs(&self) -> Option<&FontArc> {
        self.glyphs.as_ref()
    }

    /// Give the built-in face outlines to draw with: a Helvetica-compatible
    /// system face when one is installed, the bundled face otherwise.
    ///
    /// Faces that already carry outlines are left alone. Returns whether
    /// outlines are now available.
    pub fn attach_fallback_glyphs(&mut self) -> bool {
        if self.glyphs.is_none() {
            self.glyphs = fallback_bold_sans();
        }
        self.glyphs.is_some()
    }

    /// Width of `text` at `size` points.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        metrics::measure_encoded(&self.widths, &metrics::encode(text), size)
    }
}

/// Font names in a PDF may not contain whitespace or delimiters.
fn pdf_font_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "Embedded".to_string()
    } else {
        cleaned
    }
}

/// Height of a flat capital, from the outline of 'H'. Faces without one
/// report their ascent.
fn cap_height_unscaled(font: &impl Font) -> f32 {
    let id = font.glyph_id('H');
    font.outline(id)
        .filter(|_| id.0 != 0)
        // Bounds keep font units but may be stored y-down; the cap is the
        // larger of the two vertical extremes.
        .map(|outline| outline.bounds.min.y.max(outline.bounds.max.y))
        .filter(|h| *h > 0.0)
        .unwrap_or_else(|| font.ascent_unscaled())
}

fn fallback_bold_sans() -> Option<FontArc> {
    let mut db = fontdb::Database::new();
    db.load_font_data(BUNDLED_BOLD_SANS.to_vec());
    // Generic sans-serif resolves to the bundled face.
    let bundled = db
        .faces()
        .next()
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone());
    if let Some(name) = bundled {
        db.set_sans_serif_family(name);
    }
    db.load_system_fonts();

    let mut families: Vec<fontdb::Family> = SYSTEM_BOLD_SANS
        .iter()
        .map(|&name| fontdb::Family::Name(name))
        .collect();
    families.push(fontdb::Family::SansSerif);
    let query = fontdb::Query {
        families: &families,
        weight: fontdb::Weight::BOLD,
        ..Default::default()
    };
    let id = db.query(&query)?;
    db.with_face_data(id, |data, index| {
        FontVec::try_from_vec_and_index(data.to_vec(), index).ok()
    })
    .flatten()
    .map(FontArc::new)
}

/// Path of the font to use: the configured one, else a conventional file in
/// the input root, else `None` for the built-in face.
pub fn discover_font(configured: Option<&Path>, input_root: &Path) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            input_root.join(path)
        });
    }
    CONVENTIONAL_FONT_FILES
        .iter()
        .map(|name| input_root.join(name))
        .find(|candidate| candidate.is_file())
}

/// Outcome of font selection.
#[derive(Debug)]
pub struct FontChoice {
    pub face: FontFace,
    pub source: Option<PathBuf>,
    /// Why a requested font could not be used.
    pub fallback: Option<FontError>,
}

/// Select the deck font. A font that fails to load falls back to the
/// built-in face; the failure is returned for reporting.
pub fn load_font(configured: Option<&Path>, input_root: &Path) -> FontChoice {
    let Some(path) = discover_font(configured, input_root) else {
        return FontChoice {
            face: FontFace::builtin(),
            source: None,
            fallback: None,
        };
    };
    match FontFace::from_file(&path) {
        Ok(face) => FontChoice {
            face,
            source: Some(path),
            fallback: None,
        },
        Err(e) => FontChoice {
            face: FontFace::builtin(),
            source: None,
            fallback: Some(e),
        },
    }
}
