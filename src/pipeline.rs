//! Deck rendering pipeline.
//!
//! Drives the card renderer over a whole deck and produces the two outputs:
//!
//! ```text
//! deck ──► Paginator ──► per page: layout cards in parallel ──► commit in slot order ──► cards.pdf
//!      └─► per card:  layout + rasterize in parallel ─────────────────────────────► cards/<image>.png
//! ```
//!
//! ## Parallelism
//!
//! Laying out a card (decoding and rounding its panel, fitting its text) does
//! not depend on any other card, so it runs on the rayon pool. Drawing into
//! the document is serial: each page's layouts are collected in deck order
//! and replayed one after the other. Only one page of supersampled panels is
//! alive at a time.
//!
//! ## Failures
//!
//! Missing or broken assets never fail a run; they show up as warnings on
//! the card they belong to. Only structural problems (the output cannot be
//! written, a canvas cannot be allocated) return an error.
//!
//! ## Progress
//!
//! Every function accepts an optional `Sender<RenderEvent>`; the CLI prints
//! events from a separate thread while workers keep going. Document events
//! follow deck order; card image events follow completion order.

use crate::assets::{AssetCategory, AssetResolver, AssetStore};
use crate::config::PressConfig;
use crate::deck::{CardRecord, Identifier};
use crate::geometry::Point;
use crate::paginate::{GridLayout, Paginator, Placement};
use crate::render::card::CardGeometry;
use crate::render::{
    CardLayout, CardRenderer, Element, ElementOutcome, PdfDocument, RasterSurface, RenderError,
    SkipReason,
};
use crate::text::{FontFace, load_font};
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Progress reported while rendering.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    FontSelected {
        name: String,
        source: Option<PathBuf>,
    },
    /// A requested font could not be used; the built-in face is used instead.
    FontFallback { reason: String },
    /// Card images will have no text: there are no outlines to draw with.
    RasterTextUnavailable,
    PageStarted { page: usize, card_count: usize },
    CardRendered {
        index: usize,
        title: String,
        warnings: Vec<ElementOutcome>,
        /// Set when the city label is still too wide at the floor size.
        overflow_at: Option<f32>,
    },
    CardImageWritten {
        index: usize,
        title: String,
        path: PathBuf,
    },
    CardImageSkipped {
        index: usize,
        title: String,
        reason: String,
    },
    DocumentWritten { path: PathBuf, pages: usize },
    /// A transport icon is left out of the icon deck.
    IconSkipped { icon: String, reason: String },
}

pub(crate) fn emit(events: Option<&Sender<RenderEvent>>, event: RenderEvent) {
    if let Some(tx) = events {
        // The printer may have gone away; rendering carries on regardless.
        tx.send(event).ok();
    }
}

/// Which artifacts a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outputs {
    pub document: bool,
    pub card_images: bool,
}

impl Outputs {
    pub const ALL: Outputs = Outputs {
        document: true,
        card_images: true,
    };
}

/// Totals for a finished run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub cards: usize,
    pub pages: usize,
    pub card_images: usize,
    pub skipped_images: usize,
    pub warnings: usize,
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cards, {} pages", self.cards, self.pages)?;
        if self.card_images > 0 || self.skipped_images > 0 {
            write!(f, ", {} card images", self.card_images)?;
            if self.skipped_images > 0 {
                write!(f, " ({} skipped)", self.skipped_images)?;
            }
        }
        if self.warnings > 0 {
            write!(f, ", {} warnings", self.warnings)?;
        }
        Ok(())
    }
}

/// Label used for a card in progress output.
pub fn card_title(record: &CardRecord) -> String {
    record.resolve().city
}

/// Everything a render needs that outlives a single card.
pub struct Press<'a> {
    config: &'a PressConfig,
    resolver: AssetResolver,
    store: AssetStore,
    font: FontFace,
}

impl<'a> Press<'a> {
    /// Select the font and set up asset loading for `config`.
    pub fn new(config: &'a PressConfig, events: Option<&Sender<RenderEvent>>) -> Self {
        let choice = load_font(config.paths.font.as_deref(), &config.paths.input);
        if let Some(reason) = &choice.fallback {
            emit(
                events,
                RenderEvent::FontFallback {
                    reason: reason.to_string(),
                },
            );
        }
        emit(
            events,
            RenderEvent::FontSelected {
                name: choice.face.name().to_string(),
                source: choice.source.clone(),
            },
        );
        Self::with_font(config, choice.face)
    }

    pub fn with_font(config: &'a PressConfig, font: FontFace) -> Self {
        Self {
            config,
            resolver: AssetResolver::new(&config.paths.input),
            store: AssetStore::new(),
            font,
        }
    }

    pub fn font(&self) -> &FontFace {
        &self.font
    }

    fn renderer<'r>(&'r self, font: &'r FontFace) -> CardRenderer<'r> {
        CardRenderer::new(self.config, &self.resolver, &self.store, font)
    }

    pub fn document_path(&self) -> PathBuf {
        self.config.paths.output.join(&self.config.paths.document)
    }

    pub fn card_image_dir(&self) -> PathBuf {
        self.config.paths.output.join(&self.config.paths.card_images)
    }

    /// Tile the deck onto pages and write the document to `path`.
    ///
    /// Returns the page count and the number of element warnings.
    pub fn render_document(
        &self,
        deck: &[CardRecord],
        path: &Path,
        events: Option<&Sender<RenderEvent>>,
    ) -> Result<(usize, usize), PipelineError> {
        let grid = GridLayout::from_config(self.config);
        let renderer = self.renderer(&self.font);
        let mut doc = PdfDocument::new(grid.page_w, grid.page_h, &self.font);
        let mut warnings = 0;

        let mut pending: Vec<Placement> = Vec::with_capacity(grid.cards_per_page());
        for placement in Paginator::new(grid, deck.len()) {
            pending.push(placement);
            if !placement.ends_page {
                continue;
            }

            emit(
                events,
                RenderEvent::PageStarted {
                    page: placement.page_index + 1,
                    card_count: pending.len(),
                },
            );
            let layouts: Vec<CardLayout> = pending
                .par_iter()
                .map(|p| renderer.layout(p.card_index, &deck[p.card_index]))
                .collect();

            let mut page = doc.begin_page();
            for (p, layout) in pending.iter().zip(&layouts) {
                layout.replay(&mut page, p.origin);
                warnings += layout.warnings().count();
                emit(events, card_rendered(p.card_index, &deck[p.card_index], layout));
            }
            page.finish();
            pending.clear();
        }

        let pages = doc.page_count();
        doc.save(path)?;
        emit(
            events,
            RenderEvent::DocumentWritten {
                path: path.to_path_buf(),
                pages,
            },
        );
        Ok((pages, warnings))
    }

    /// Write one PNG per card into `dir`, named after the card's main image.
    ///
    /// Cards render in parallel and each reports as soon as its file is
    /// written, so events arrive in completion order. Returns the number of
    /// images written and skipped.
    pub fn render_card_images(
        &self,
        deck: &[CardRecord],
        dir: &Path,
        events: Option<&Sender<RenderEvent>>,
    ) -> Result<(usize, usize), PipelineError> {
        std::fs::create_dir_all(dir)?;

        let mut raster_font = self.font.clone();
        if !raster_font.attach_fallback_glyphs() {
            emit(events, RenderEvent::RasterTextUnavailable);
        }
        let renderer = self.renderer(&raster_font);
        let geometry = CardGeometry::from_config(self.config);
        let dpi = self.config.raster.dpi;

        let render_one = |index: usize, record: &CardRecord| -> Result<RenderEvent, RenderError> {
            let title = card_title(record);
            let Some(stem) = record.image_stem() else {
                return Ok(RenderEvent::CardImageSkipped {
                    index,
                    title,
                    reason: "no image to name it after".into(),
                });
            };
            let layout = renderer.layout(index, record);
            let mut surface =
                RasterSurface::new(geometry.card_w, geometry.card_h, dpi, &raster_font)?;
            layout.replay(&mut surface, Point::default());
            let path = dir.join(format!("{stem}.png"));
            surface.save_png(&path)?;
            Ok(RenderEvent::CardImageWritten { index, title, path })
        };

        let (written, skipped) = deck
            .par_iter()
            .enumerate()
            .map_with(events.cloned(), |tx, (index, record)| {
                let event = render_one(index, record)?;
                let tally = match &event {
                    RenderEvent::CardImageWritten { .. } => (1, 0),
                    _ => (0, 1),
                };
                emit(tx.as_ref(), event);
                Ok::<_, RenderError>(tally)
            })
            .try_reduce(|| (0, 0), |a, b| Ok((a.0 + b.0, a.1 + b.1)))?;
        Ok((written, skipped))
    }
}

fn card_rendered(index: usize, record: &CardRecord, layout: &CardLayout) -> RenderEvent {
    RenderEvent::CardRendered {
        index,
        title: card_title(record),
        warnings: layout.warnings().cloned().collect(),
        overflow_at: layout
            .city_fit
            .overflow
            .then_some(layout.city_fit.font_size),
    }
}

/// Render the requested outputs for `deck`.
pub fn build(
    config: &PressConfig,
    deck: &[CardRecord],
    outputs: Outputs,
    events: Option<Sender<RenderEvent>>,
) -> Result<BuildSummary, PipelineError> {
    let events = events.as_ref();
    let press = Press::new(config, events);
    let mut summary = BuildSummary {
        cards: deck.len(),
        ..Default::default()
    };

    if outputs.document {
        let (pages, warnings) = press.render_document(deck, &press.document_path(), events)?;
        summary.pages = pages;
        summary.warnings = warnings;
    }
    if outputs.card_images {
        let (written, skipped) = press.render_card_images(deck, &press.card_image_dir(), events)?;
        summary.card_images = written;
        summary.skipped_images = skipped;
    }
    Ok(summary)
}

// ============================================================================
// Check
// ============================================================================

/// An asset a card refers to that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetIssue {
    pub index: usize,
    pub title: String,
    pub element: Element,
    pub reason: SkipReason,
}

/// Resolve every asset the deck refers to without decoding anything.
pub fn check_assets(config: &PressConfig, deck: &[CardRecord]) -> Vec<AssetIssue> {
    let resolver = AssetResolver::new(&config.paths.input);
    let mut issues = Vec::new();

    for (index, record) in deck.iter().enumerate() {
        let title = card_title(record);
        let mut report = |element: Element, reason: SkipReason| {
            issues.push(AssetIssue {
                index,
                title: title.clone(),
                element,
                reason,
            });
        };
        let exists = |path: PathBuf| {
            if path.is_file() {
                None
            } else {
                Some(SkipReason::Missing(path))
            }
        };

        if let Some(image) = &record.image {
            if let Some(reason) = exists(resolver.resolve(image, AssetCategory::Landscapes)) {
                report(Element::Panel, reason);
            }
        }
        if let Some(flag) = &record.flag {
            if let Some(reason) = exists(resolver.resolve(flag, AssetCategory::Flags)) {
                report(Element::Flag, reason);
            }
        }
        if let Some(raw) = &record.continent {
            let outcome = match Identifier::parse(raw) {
                Ok(id) => exists(resolver.continent_badge(&id)),
                Err(_) => Some(SkipReason::InvalidIdentifier(raw.clone())),
            };
            if let Some(reason) = outcome {
                report(Element::ContinentBadge, reason);
            }
        }
        for raw in &record.transport {
            let outcome = match Identifier::parse(raw) {
                Ok(id) => exists(resolver.transport_icon(&id)),
                Err(_) => Some(SkipReason::InvalidIdentifier(raw.clone())),
            };
            if let Some(reason) = outcome {
                report(Element::TransportIcon(raw.clone()), reason);
            }
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{record, test_config, write_asset_tree};
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn deck(n: usize) -> Vec<CardRecord> {
        (0..n)
            .map(|i| record(&format!("photo{}.jpg", i % 2), "jp.png", "asia", &["bus"], &format!("City {i}")))
            .collect()
    }

    fn setup() -> (TempDir, PressConfig) {
        let tmp = TempDir::new().unwrap();
        write_asset_tree(&tmp.path().join("input"));
        let config = test_config(tmp.path());
        (tmp, config)
    }

    #[test]
    fn document_has_one_page_per_nine_cards() {
        let (_tmp, config) = setup();
        let press = Press::with_font(&config, FontFace::builtin());
        let path = press.document_path();
        let (pages, warnings) = press.render_document(&deck(10), &path, None).unwrap();
        assert_eq!(pages, 2);
        assert_eq!(warnings, 0);
        assert!(path.is_file());
    }

    #[test]
    fn empty_deck_writes_an_empty_document() {
        let (_tmp, config) = setup();
        let summary = build(&config, &[], Outputs::ALL, None).unwrap();
        assert_eq!(summary.pages, 0);
        assert_eq!(summary.card_images, 0);
        assert!(config.paths.output.join("cards.pdf").is_file());
    }

    #[test]
    fn events_arrive_in_deck_order() {
        let (_tmp, config) = setup();
        let (tx, rx) = mpsc::channel();
        let press = Press::with_font(&config, FontFace::builtin());
        press
            .render_document(&deck(11), &press.document_path(), Some(&tx))
            .unwrap();
        drop(tx);

        let events: Vec<RenderEvent> = rx.into_iter().collect();
        let pages: Vec<(usize, usize)> = events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::PageStarted { page, card_count } => Some((*page, *card_count)),
                _ => None,
            })
            .collect();
        assert_eq!(pages, vec![(1, 9), (2, 2)]);

        let cards: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::CardRendered { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(cards, (0..11).collect::<Vec<_>>());
        assert!(matches!(events.last(), Some(RenderEvent::DocumentWritten { pages: 2, .. })));
    }

    #[test]
    fn missing_assets_become_warnings_not_errors() {
        let (_tmp, config) = setup();
        let cards = vec![record("gone.jpg", "zz.png", "asia", &["bus"], "Nowhere")];
        let (tx, rx) = mpsc::channel();
        let press = Press::with_font(&config, FontFace::builtin());
        let (pages, warnings) = press
            .render_document(&cards, &press.document_path(), Some(&tx))
            .unwrap();
        drop(tx);
        assert_eq!((pages, warnings), (1, 2));
        let reported: Vec<String> = rx
            .into_iter()
            .filter_map(|e| match e {
                RenderEvent::CardRendered { warnings, .. } => Some(warnings),
                _ => None,
            })
            .flatten()
            .map(|o| o.element.to_string())
            .collect();
        assert_eq!(reported, vec!["panel", "flag"]);
    }

    #[test]
    fn card_images_are_named_after_the_photo() {
        let (_tmp, config) = setup();
        let mut cards = deck(2);
        cards.push(record("", "jp.png", "asia", &[], "No photo"));
        cards[2].image = None;
        let press = Press::with_font(&config, FontFace::builtin());
        let dir = press.card_image_dir();
        let (written, skipped) = press.render_card_images(&cards, &dir, None).unwrap();
        assert_eq!((written, skipped), (2, 1));
        assert!(dir.join("photo0.png").is_file());
        assert!(dir.join("photo1.png").is_file());

        let png = image::open(dir.join("photo0.png")).unwrap();
        let expected_w = (config.card.width.points() * config.raster.dpi as f32 / 72.0).round();
        assert_eq!(png.width(), expected_w as u32);
    }

    #[test]
    fn card_images_carry_their_labels() {
        let (_tmp, config) = setup();
        let card = CardRecord {
            image: Some("kyoto.jpg".into()),
            city: Some("Kyoto".into()),
            country: Some("Japan".into()),
            ..Default::default()
        };
        let press = Press::with_font(&config, FontFace::builtin());
        let dir = press.card_image_dir();
        let (tx, rx) = mpsc::channel();
        press.render_card_images(&[card], &dir, Some(&tx)).unwrap();
        drop(tx);
        assert!(!rx.iter().any(|e| matches!(e, RenderEvent::RasterTextUnavailable)));

        // Footer strip left of the sidebar, clear of the card outline, the
        // panel border and the rounded corner. Only the labels draw here.
        let png = image::open(dir.join("kyoto.png")).unwrap().to_rgb8();
        let g = CardGeometry::from_config(&config);
        let (w, h) = png.dimensions();
        assert_eq!(h, g.card_h.round() as u32);
        let footer_top = h - g.footer_h().round() as u32;
        let right = (g.panel_w as u32).min(w) - 4;
        let dark = (footer_top + 4..h - 4)
            .flat_map(|y| (40..right).map(move |x| (x, y)))
            .filter(|&(x, y)| png.get_pixel(x, y).0.iter().all(|c| *c < 100))
            .count();
        assert!(dark > 30, "only {dark} label pixels in the footer");
    }

    #[test]
    fn every_card_image_reports_once() {
        let (_tmp, config) = setup();
        let mut cards = deck(6);
        cards[4].image = None;
        let press = Press::with_font(&config, FontFace::builtin());
        let (tx, rx) = mpsc::channel();
        let (written, skipped) = press
            .render_card_images(&cards, &press.card_image_dir(), Some(&tx))
            .unwrap();
        drop(tx);
        assert_eq!((written, skipped), (5, 1));

        let mut reported: Vec<(usize, bool)> = rx
            .into_iter()
            .filter_map(|e| match e {
                RenderEvent::CardImageWritten { index, .. } => Some((index, true)),
                RenderEvent::CardImageSkipped { index, .. } => Some((index, false)),
                _ => None,
            })
            .collect();
        reported.sort();
        let expected: Vec<(usize, bool)> = (0..6).map(|i| (i, i != 4)).collect();
        assert_eq!(reported, expected);
    }

    #[test]
    fn unwritable_output_is_fatal() {
        let (tmp, config) = setup();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();
        let press = Press::with_font(&config, FontFace::builtin());
        let err = press
            .render_document(&deck(1), &blocker.join("cards.pdf"), None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Render(RenderError::Io(_))));
    }

    #[test]
    fn check_reports_each_unusable_asset() {
        let (_tmp, config) = setup();
        let cards = vec![
            record("photo0.jpg", "jp.png", "asia", &["bus"], "Fine"),
            record("gone.jpg", "jp.png", "mars", &["bus", "../x"], "Broken"),
        ];
        let issues = check_assets(&config, &cards);
        let summary: Vec<(usize, String)> = issues
            .iter()
            .map(|i| (i.index, i.element.to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "panel".to_string()),
                (1, "continent badge".to_string()),
                (1, "transport icon '../x'".to_string()),
            ]
        );
        assert!(matches!(issues[2].reason, SkipReason::InvalidIdentifier(_)));
    }

    #[test]
    fn summary_display() {
        let summary = BuildSummary {
            cards: 10,
            pages: 2,
            card_images: 9,
            skipped_images: 1,
            warnings: 3,
        };
        assert_eq!(
            summary.to_string(),
            "10 cards, 2 pages, 9 card images (1 skipped), 3 warnings"
        );
        assert_eq!(BuildSummary::default().to_string(), "0 cards, 0 pages");
    }
}
