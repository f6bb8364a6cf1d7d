//! The transport-icon deck.
//!
//! A second print job next to the travel cards: plain rounded cards, each
//! showing one transport icon. The config says how many cards each icon
//! gets and in which order; cards are sized to fill the page inside a
//! margin. Each icon is decoded once and shared by all of its cards, so the
//! document embeds it a single time.
//!
//! ```text
//! +-----------+
//! |  +-----+  |   icon fitted, aspect kept, in a centred box
//! |  | bus |  |   `icon_scale` of the card in each direction
//! |  +-----+  |
//! +-----------+
//! ```

use crate::assets::{AssetResolver, AssetStore, ImageAsset};
use crate::config::{PressConfig, TransportDeckConfig};
use crate::deck::Identifier;
use crate::geometry::{Point, Rect};
use crate::paginate::{GridLayout, Paginator, Placement};
use crate::pipeline::{PipelineError, RenderEvent, emit};
use crate::render::{PdfDocument, Rotation, SkipReason, Surface};
use crate::text::FontFace;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;

/// One card of the icon deck.
#[derive(Debug, Clone)]
pub struct IconCard {
    pub icon: String,
    pub asset: Arc<ImageAsset>,
}

/// An icon that gets no cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedIcon {
    pub icon: String,
    pub reason: SkipReason,
}

/// Totals for a finished icon deck.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IconDeckSummary {
    pub path: PathBuf,
    pub cards: usize,
    pub pages: usize,
    pub skipped_icons: usize,
}

impl fmt::Display for IconDeckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} icon cards, {} pages", self.cards, self.pages)?;
        if self.skipped_icons > 0 {
            let noun = if self.skipped_icons == 1 { "icon" } else { "icons" };
            write!(f, ", {} {noun} skipped", self.skipped_icons)?;
        }
        Ok(())
    }
}

/// Expand the configured counts into cards, in print order.
///
/// An icon whose name is invalid or whose file cannot be decoded gets no
/// cards and is reported instead.
pub fn plan_icon_cards(
    config: &PressConfig,
    store: &AssetStore,
) -> (Vec<IconCard>, Vec<SkippedIcon>) {
    let resolver = AssetResolver::new(&config.paths.input);
    let mut cards = Vec::new();
    let mut skipped = Vec::new();

    for entry in &config.transport_deck.icons {
        let loaded = Identifier::parse(&entry.icon)
            .map_err(|_| SkipReason::InvalidIdentifier(entry.icon.clone()))
            .and_then(|id| {
                store
                    .load(&resolver.transport_icon(&id))
                    .map_err(SkipReason::from)
            });
        match loaded {
            Ok(asset) => cards.extend((0..entry.count).map(|_| IconCard {
                icon: entry.icon.clone(),
                asset: Arc::clone(&asset),
            })),
            Err(reason) => skipped.push(SkippedIcon {
                icon: entry.icon.clone(),
                reason,
            }),
        }
    }
    (cards, skipped)
}

/// Where the icon goes on a `card_w × card_h` card, in card-local points.
pub fn icon_rect(card_w: f32, card_h: f32, scale: f32, icon_w: u32, icon_h: u32) -> Rect {
    let (box_w, box_h) = (card_w * scale, card_h * scale);
    Rect::new((card_w - box_w) / 2.0, (card_h - box_h) / 2.0, box_w, box_h)
        .contain(icon_w, icon_h)
}

/// Icon first, then the outline over it.
fn draw_icon_card(
    surface: &mut dyn Surface,
    card: &IconCard,
    placement: &Placement,
    grid: &GridLayout,
    deck: &TransportDeckConfig,
) {
    let origin = placement.origin;
    let rect = icon_rect(
        grid.card_w,
        grid.card_h,
        deck.icon_scale,
        card.asset.width(),
        card.asset.height(),
    );
    surface.draw_image(&card.asset, rect.translate(origin), Rotation::None);
    surface.stroke_round_rect(
        Rect::new(origin.x, origin.y, grid.card_w, grid.card_h),
        deck.corner_radius.points(),
        deck.border_width.points(),
    );
}

/// Lay out the icon deck and write it to `paths.output/<transport_deck.document>`.
pub fn render_transport_deck(
    config: &PressConfig,
    events: Option<Sender<RenderEvent>>,
) -> Result<IconDeckSummary, PipelineError> {
    let events = events.as_ref();
    let deck = &config.transport_deck;
    let store = AssetStore::new();
    let (cards, skipped) = plan_icon_cards(config, &store);
    for icon in &skipped {
        emit(
            events,
            RenderEvent::IconSkipped {
                icon: icon.icon.clone(),
                reason: icon.reason.to_string(),
            },
        );
    }

    let grid = GridLayout::for_transport_deck(config);
    // No text on these cards; the font only fills the resource dictionary.
    let mut doc = PdfDocument::new(grid.page_w, grid.page_h, &FontFace::builtin());
    let mut pending: Vec<Placement> = Vec::with_capacity(grid.cards_per_page());
    for placement in Paginator::new(grid, cards.len()) {
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
        let mut page = doc.begin_page();
        for p in &pending {
            draw_icon_card(&mut page, &cards[p.card_index], p, &grid, deck);
        }
        page.finish();
        pending.clear();
    }

    let pages = doc.page_count();
    let path = config.paths.output.join(&deck.document);
    doc.save(&path)?;
    emit(
        events,
        RenderEvent::DocumentWritten {
            path: path.clone(),
            pages,
        },
    );
    Ok(IconDeckSummary {
        path,
        cards: cards.len(),
        pages,
        skipped_icons: skipped.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IconCount;
    use crate::render::recording::RecordingSurface;
    use crate::test_helpers::{test_config, write_asset_tree, write_png};
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PressConfig) {
        let tmp = TempDir::new().unwrap();
        write_asset_tree(&tmp.path().join("input"));
        let config = test_config(tmp.path());
        (tmp, config)
    }

    #[test]
    fn counts_expand_in_order_and_missing_icons_are_skipped() {
        // The fixture tree has bus, train and boat but no plane.
        let (_tmp, config) = setup();
        let store = AssetStore::new();
        let (cards, skipped) = plan_icon_cards(&config, &store);
        assert_eq!(cards.len(), 20 + 15 + 13);
        assert!(cards[..20].iter().all(|c| c.icon == "bus"));
        assert!(cards[20..35].iter().all(|c| c.icon == "train"));
        assert_eq!(cards[47].icon, "boat");
        assert_eq!(store.cached_len(), 3);

        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].icon, "plane");
        assert!(matches!(&skipped[0].reason, SkipReason::Missing(p) if p.ends_with("transport_icons/plane.png")));
    }

    #[test]
    fn invalid_icon_names_are_skipped() {
        let (_tmp, mut config) = setup();
        config.transport_deck.icons = vec![
            IconCount {
                icon: "../bus".into(),
                count: 2,
            },
            IconCount {
                icon: "train".into(),
                count: 0,
            },
        ];
        let (cards, skipped) = plan_icon_cards(&config, &AssetStore::new());
        assert!(cards.is_empty());
        assert_eq!(skipped.len(), 1);
        assert!(matches!(skipped[0].reason, SkipReason::InvalidIdentifier(_)));
    }

    #[test]
    fn icon_is_centred_and_keeps_its_aspect() {
        let rect = icon_rect(100.0, 50.0, 0.8, 16, 16);
        assert!((rect.width - 40.0).abs() < 1e-4);
        assert!((rect.height - 40.0).abs() < 1e-4);
        assert!((rect.center().x - 50.0).abs() < 1e-4);
        assert!((rect.center().y - 25.0).abs() < 1e-4);

        let wide = icon_rect(100.0, 50.0, 0.8, 80, 10);
        assert!((wide.width - 80.0).abs() < 1e-4);
        assert!((wide.x - 10.0).abs() < 1e-4);
    }

    #[test]
    fn icon_is_drawn_before_the_outline() {
        let (_tmp, config) = setup();
        let (cards, _) = plan_icon_cards(&config, &AssetStore::new());
        let grid = GridLayout::for_transport_deck(&config);
        let placement = Paginator::new(grid, 1).next().unwrap();
        let mut surface = RecordingSurface::default();
        draw_icon_card(&mut surface, &cards[0], &placement, &grid, &config.transport_deck);
        assert_eq!(surface.calls.len(), 2);
        assert!(surface.calls[0].starts_with("image "));
        assert!(surface.calls[0].contains("bus.png"));
        assert!(surface.calls[1].starts_with("round "));
        assert!(surface.calls[1].ends_with("r8.5"));
    }

    #[test]
    fn deck_is_paged_twenty_to_a_sheet() {
        let (tmp, config) = setup();
        write_png(
            &tmp.path().join("input/transport_icons/plane.png"),
            12,
            12,
            [0, 0, 0, 255],
        );
        let (tx, rx) = mpsc::channel();
        let summary = render_transport_deck(&config, Some(tx)).unwrap();
        assert_eq!(summary.cards, 60);
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.skipped_icons, 0);
        assert_eq!(summary.to_string(), "60 icon cards, 3 pages");

        let pdf = std::fs::read(config.paths.output.join("transport_cards.pdf")).unwrap();
        let images = pdf
            .windows(b"/Subtype /Image".len())
            .filter(|w| *w == b"/Subtype /Image")
            .count();
        assert_eq!(images, 4);

        let pages: Vec<usize> = rx
            .into_iter()
            .filter_map(|e| match e {
                RenderEvent::PageStarted { card_count, .. } => Some(card_count),
                _ => None,
            })
            .collect();
        assert_eq!(pages, vec![20, 20, 20]);
    }

    #[test]
    fn missing_icons_are_reported_and_the_rest_printed() {
        let (_tmp, config) = setup();
        let (tx, rx) = mpsc::channel();
        let summary = render_transport_deck(&config, Some(tx)).unwrap();
        assert_eq!((summary.cards, summary.pages, summary.skipped_icons), (48, 3, 1));
        assert_eq!(summary.to_string(), "48 icon cards, 3 pages, 1 icon skipped");
        let events: Vec<RenderEvent> = rx.into_iter().collect();
        assert!(matches!(&events[0], RenderEvent::IconSkipped { icon, .. } if icon == "plane"));
        assert!(matches!(events.last(), Some(RenderEvent::DocumentWritten { pages: 3, .. })));
    }
}
