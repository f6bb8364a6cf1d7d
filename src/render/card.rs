//! Card composition.
//!
//! [`CardRenderer::layout`] turns one [`CardRecord`] into a [`CardLayout`].
//! Layout never fails: every optional element either ends up as draw ops or
//! as a [`SkipReason`] in the card's outcomes, and the rest of the card is
//! drawn regardless.
//!
//! ## Card frame
//!
//! ```text
//!  +------------------------------+-----+
//!  |  (panel, top-left rounded)   | [C] |   C = continent badge
//!  |                              | [>] |   > = transport icons,
//!  |                              | [>] |       turned a quarter
//!  +------------------------------+-----+
//!  | [flag] City                  |  7  |   7 = corner number
//!  |        Country               |     |
//!  +------------------------------+-----+
//! ```
//!
//! Draw order matters: later ops cover earlier ones, and the panel border
//! goes last so it stays visible over the photo.

use crate::assets::{AssetCategory, AssetError, AssetResolver, AssetStore, ImageAsset};
use crate::config::PressConfig;
use crate::deck::{CardRecord, Identifier, ResolvedCard};
use crate::geometry::{Point, Rect};
use crate::imaging::{PanelParams, create_panel};
use crate::text::{FitParams, FontFace, TextFit, fit};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::{DrawOp, Rotation, Surface};

/// Parts of a card that are reported individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Panel,
    Flag,
    ContinentBadge,
    TransportIcon(String),
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Panel => f.write_str("panel"),
            Element::Flag => f.write_str("flag"),
            Element::ContinentBadge => f.write_str("continent badge"),
            Element::TransportIcon(name) => write!(f, "transport icon '{name}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The record leaves the field empty.
    NotSet,
    /// The name is not a valid asset identifier.
    InvalidIdentifier(String),
    Missing(PathBuf),
    Unreadable { path: PathBuf, message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotSet => f.write_str("not set"),
            SkipReason::InvalidIdentifier(raw) => write!(f, "invalid identifier '{raw}'"),
            SkipReason::Missing(path) => write!(f, "missing {}", path.display()),
            SkipReason::Unreadable { path, message } => {
                write!(f, "unreadable {}: {message}", path.display())
            }
        }
    }
}

impl From<AssetError> for SkipReason {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::NotFound(path) => SkipReason::Missing(path),
            AssetError::Decode { path, message } => SkipReason::Unreadable { path, message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementStatus {
    Drawn,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementOutcome {
    pub element: Element,
    pub status: ElementStatus,
}

impl ElementOutcome {
    fn drawn(element: Element) -> Self {
        Self {
            element,
            status: ElementStatus::Drawn,
        }
    }

    fn skipped(element: Element, reason: impl Into<SkipReason>) -> Self {
        Self {
            element,
            status: ElementStatus::Skipped(reason.into()),
        }
    }

    /// Skipped for a reason worth telling the user about.
    pub fn is_warning(&self) -> bool {
        matches!(&self.status, ElementStatus::Skipped(reason) if *reason != SkipReason::NotSet)
    }
}

/// A card, ready to be drawn anywhere.
#[derive(Debug, Clone)]
pub struct CardLayout {
    pub width: f32,
    pub height: f32,
    pub ops: Vec<DrawOp>,
    pub outcomes: Vec<ElementOutcome>,
    /// How the city label was fitted.
    pub city_fit: TextFit,
}

impl CardLayout {
    /// Draw the card with its bottom-left corner at `origin`.
    pub fn replay(&self, surface: &mut dyn Surface, origin: Point) {
        for op in &self.ops {
            op.apply(surface, origin);
        }
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ElementOutcome> {
        self.outcomes.iter().filter(|o| o.is_warning())
    }
}

/// Fixed card geometry in points, computed once from the config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardGeometry {
    pub card_w: f32,
    pub card_h: f32,
    pub panel_w: f32,
    pub panel_h: f32,
}

impl CardGeometry {
    pub fn from_config(config: &PressConfig) -> Self {
        Self {
            card_w: config.card.width.points(),
            card_h: config.card.height.points(),
            panel_w: config.panel.width.points(),
            panel_h: config.panel.height.points(),
        }
    }

    /// Width of the strip right of the panel.
    pub fn sidebar_w(&self) -> f32 {
        self.card_w - self.panel_w
    }

    /// Height of the strip below the panel.
    pub fn footer_h(&self) -> f32 {
        self.card_h - self.panel_h
    }

    pub fn panel_rect(&self) -> Rect {
        Rect::new(0.0, self.footer_h(), self.panel_w, self.panel_h)
    }
}

/// Lays out cards. Shared by all workers; holds no per-card state.
pub struct CardRenderer<'a> {
    config: &'a PressConfig,
    geometry: CardGeometry,
    resolver: &'a AssetResolver,
    store: &'a AssetStore,
    font: &'a FontFace,
}

impl<'a> CardRenderer<'a> {
    pub fn new(
        config: &'a PressConfig,
        resolver: &'a AssetResolver,
        store: &'a AssetStore,
        font: &'a FontFace,
    ) -> Self {
        Self {
            config,
            geometry: CardGeometry::from_config(config),
            resolver,
            store,
            font,
        }
    }

    pub fn geometry(&self) -> CardGeometry {
        self.geometry
    }

    /// Lay out the card at deck position `index`.
    pub fn layout(&self, index: usize, record: &CardRecord) -> CardLayout {
        let card = record.resolve();
        let g = self.geometry;
        let mut ops = Vec::new();
        let mut outcomes = Vec::new();

        // 1. Panel
        outcomes.push(self.panel(index, &card, &mut ops));

        // 2-3. Flag and labels
        let text = &self.config.text;
        let city_fit = fit(
            self.font,
            &card.city,
            &FitParams::from_config(text, g.panel_w),
        );
        let flag_w = text.flag_size.points();
        let flag_box = Rect::new(
            city_fit.left_margin,
            text.flag_baseline.points(),
            flag_w,
            flag_w * text.flag_aspect,
        );
        outcomes.push(match &card.flag {
            None => ElementOutcome::skipped(Element::Flag, SkipReason::NotSet),
            Some(name) => {
                let path = self.resolver.resolve(name, AssetCategory::Flags);
                self.place(Element::Flag, &path, flag_box, Rotation::None, &mut ops)
            }
        });

        let label_x = city_fit.left_margin + flag_w + text.gap.points();
        let city_y = text.city_baseline.points();
        ops.push(DrawOp::Text {
            text: card.city.clone(),
            size: city_fit.font_size,
            origin: Point::new(label_x, city_y),
        });
        ops.push(DrawOp::Text {
            text: card.country.clone(),
            size: text.country_font_size,
            origin: Point::new(label_x, city_y - text.country_drop.points()),
        });

        // 4. Continent badge
        outcomes.push(self.continent_badge(&card, &mut ops));

        // 5. Transport column
        outcomes.extend(self.transport_column(&card, &mut ops));

        // 6. Corner number
        let corner_size = card.corner_font_size;
        let corner_w = self.font.measure(&card.corner_number, corner_size);
        ops.push(DrawOp::Text {
            text: card.corner_number.clone(),
            size: corner_size,
            origin: Point::new(
                g.panel_w + g.sidebar_w() / 2.0 - corner_w / 2.0,
                g.footer_h() / 2.0 - corner_size / 4.0,
            ),
        });

        // 7. Card border
        let border = self.config.card.border_width.points();
        ops.push(DrawOp::RoundRect {
            rect: Rect::new(0.0, 0.0, g.card_w, g.card_h),
            radius: self.config.card.corner_radius.points(),
            width: border,
        });

        // 8. Panel border, last
        ops.push(DrawOp::Line {
            from: Point::new(g.panel_w, 0.0),
            to: Point::new(g.panel_w, g.card_h),
            width: border,
        });
        ops.push(DrawOp::Line {
            from: Point::new(0.0, g.footer_h()),
            to: Point::new(g.card_w, g.footer_h()),
            width: border,
        });

        CardLayout {
            width: g.card_w,
            height: g.card_h,
            ops,
            outcomes,
            city_fit,
        }
    }

    fn panel(&self, index: usize, card: &ResolvedCard, ops: &mut Vec<DrawOp>) -> ElementOutcome {
        let Some(name) = &card.image else {
            return ElementOutcome::skipped(Element::Panel, SkipReason::NotSet);
        };
        let path = self.resolver.resolve(name, AssetCategory::Landscapes);
        let panel = &self.config.panel;
        let params = PanelParams {
            width_pt: self.geometry.panel_w,
            height_pt: self.geometry.panel_h,
            corner_radius_pt: panel.corner_radius.points(),
            supersample_factor: panel.supersample_factor(),
        };
        match create_panel(&path, &params) {
            Ok(pixels) => {
                let key = format!("panel:{index}:{}", path.display());
                ops.push(DrawOp::Image {
                    asset: Arc::new(ImageAsset::new(key, pixels)),
                    rect: self.geometry.panel_rect(),
                    rotation: Rotation::None,
                });
                ElementOutcome::drawn(Element::Panel)
            }
            Err(e) => ElementOutcome::skipped(Element::Panel, e),
        }
    }

    fn continent_badge(&self, card: &ResolvedCard, ops: &mut Vec<DrawOp>) -> ElementOutcome {
        let element = Element::ContinentBadge;
        let Some(raw) = &card.continent else {
            return ElementOutcome::skipped(element, SkipReason::NotSet);
        };
        let continent = match Identifier::parse(raw) {
            Ok(id) => id,
            Err(_) => {
                return ElementOutcome::skipped(element, SkipReason::InvalidIdentifier(raw.clone()));
            }
        };
        let icons = &self.config.icons;
        let size = icons.continent_size.points();
        let g = self.geometry;
        let area = Rect::new(
            g.card_w - size - icons.continent_inset_x.points(),
            g.card_h - size - icons.continent_inset_y.points(),
            size,
            size,
        );
        let path = self.resolver.continent_badge(&continent);
        self.place(element, &path, area, Rotation::None, ops)
    }

    /// Icons stacked top to bottom in the sidebar, centred as a block in the
    /// panel's height span and nudged down, each turned a quarter.
    fn transport_column(&self, card: &ResolvedCard, ops: &mut Vec<DrawOp>) -> Vec<ElementOutcome> {
        let count = card.transport.len();
        if count == 0 {
            return Vec::new();
        }
        let icons = &self.config.icons;
        let g = self.geometry;
        let size = icons.transport_size.points();
        let spacing = icons.transport_spacing.points();
        let total = count as f32 * size + (count - 1) as f32 * spacing;
        let x = g.panel_w + (g.sidebar_w() - size) / 2.0;
        let top_y =
            g.footer_h() + (g.panel_h - total) / 2.0 + total - size - icons.transport_nudge.points();

        card.transport
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let element = Element::TransportIcon(raw.clone());
                let Ok(icon) = Identifier::parse(raw) else {
                    return ElementOutcome::skipped(
                        element,
                        SkipReason::InvalidIdentifier(raw.clone()),
                    );
                };
                let area = Rect::new(x, top_y - i as f32 * (size + spacing), size, size);
                let path = self.resolver.transport_icon(&icon);
                self.place(element, &path, area, Rotation::QuarterTurn, ops)
            })
            .collect()
    }

    /// Load an icon-sized asset and fit it into `area`.
    fn place(
        &self,
        element: Element,
        path: &std::path::Path,
        area: Rect,
        rotation: Rotation,
        ops: &mut Vec<DrawOp>,
    ) -> ElementOutcome {
        let asset = match self.store.load(path) {
            Ok(asset) => asset,
            Err(e) => return ElementOutcome::skipped(element, e),
        };
        let rect = match rotation {
            Rotation::None => area.contain(asset.width(), asset.height()),
            Rotation::QuarterTurn => area.contain(asset.height(), asset.width()),
        };
        ops.push(DrawOp::Image {
            asset,
            rect,
            rotation,
        });
        ElementOutcome::drawn(element)
    }
}
