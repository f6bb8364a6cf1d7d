//! Grid pagination.
//!
//! Cards fill pages row by row, top row first, left to right. A page is
//! closed after every `rows × columns` cards and when the deck runs out, so
//! the last page may be partial and an exact multiple never leaves a blank
//! trailing page.
//!
//! [`Paginator`] is an iterator of [`Placement`]s driven by a two-state
//! machine; [`GridLayout::slot_origin`] maps a slot to page coordinates from
//! the slot index alone.

use crate::config::{PressConfig, TransportDeckConfig};
use crate::geometry::Point;

/// Geometry of the card grid on a page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub page_w: f32,
    pub page_h: f32,
    pub card_w: f32,
    pub card_h: f32,
    pub gap: f32,
    pub rows: u32,
    pub columns: u32,
}

impl GridLayout {
    pub fn from_config(config: &PressConfig) -> Self {
        Self {
            page_w: config.page.width.points(),
            page_h: config.page.height.points(),
            card_w: config.card.width.points(),
            card_h: config.card.height.points(),
            gap: config.page.gap.points(),
            rows: config.page.rows,
            columns: config.page.columns,
        }
    }

    /// Grid for the transport-icon deck: cards grow to fill the page inside
    /// the deck's margin.
    pub fn for_transport_deck(config: &PressConfig) -> Self {
        let deck: &TransportDeckConfig = &config.transport_deck;
        let page_w = config.page.width.points();
        let page_h = config.page.height.points();
        let (card_w, card_h) = deck.card_size(page_w, page_h);
        Self {
            page_w,
            page_h,
            card_w,
            card_h,
            gap: deck.gap.points(),
            rows: deck.rows,
            columns: deck.columns,
        }
    }

    pub fn cards_per_page(&self) -> usize {
        (self.rows * self.columns) as usize
    }

    /// Margins that centre the whole grid on the page.
    pub fn margins(&self) -> (f32, f32) {
        let centre = |page: f32, n: u32, card: f32| {
            (page - (n as f32 * card + n.saturating_sub(1) as f32 * self.gap)) / 2.0
        };
        (
            centre(self.page_w, self.columns, self.card_w),
            centre(self.page_h, self.rows, self.card_h),
        )
    }

    /// Bottom-left corner of the card in `slot`.
    ///
    /// `slot` must be below [`cards_per_page`](Self::cards_per_page); release
    /// builds clamp a larger one to the bottom row.
    pub fn slot_origin(&self, slot: usize) -> Point {
        debug_assert!(
            slot < self.cards_per_page(),
            "slot {slot} is outside a {}x{} grid",
            self.columns,
            self.rows
        );
        let (margin_x, margin_y) = self.margins();
        let columns = self.columns as usize;
        let row = (slot / columns) as u32;
        let col = (slot % columns) as u32;
        let rows_below = self.rows.saturating_sub(1).saturating_sub(row);
        Point::new(
            margin_x + col as f32 * (self.card_w + self.gap),
            margin_y + rows_below as f32 * (self.card_h + self.gap),
        )
    }

    /// Pages needed for `cards` cards.
    pub fn page_count(&self, cards: usize) -> usize {
        cards.div_ceil(self.cards_per_page())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// A page is open and has free slots.
    AccumulatingPage,
    /// The open page just received its last slot; the next card opens a new one.
    PageFull,
}

/// Where one card goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub card_index: usize,
    pub page_index: usize,
    pub slot: usize,
    pub origin: Point,
    /// First card on its page.
    pub starts_page: bool,
    /// Last card on its page: the page is flushed after this one.
    pub ends_page: bool,
}

/// Assigns `total` cards to pages and slots.
#[derive(Debug, Clone)]
pub struct Paginator {
    grid: GridLayout,
    total: usize,
    next: usize,
    page: usize,
    slot: usize,
    state: PageState,
}

impl Paginator {
    pub fn new(grid: GridLayout, total: usize) -> Self {
        Self {
            grid,
            total,
            next: 0,
            page: 0,
            slot: 0,
            state: PageState::AccumulatingPage,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }
}

impl Iterator for Paginator {
    type Item = Placement;

    fn next(&mut self) -> Option<Placement> {
        if self.next >= self.total {
            return None;
        }
        if self.state == PageState::PageFull {
            self.page += 1;
            self.slot = 0;
            self.state = PageState::AccumulatingPage;
        }

        let card_index = self.next;
        let slot = self.slot;
        self.next += 1;
        self.slot += 1;

        let page_filled = self.slot == self.grid.cards_per_page();
        let deck_done = self.next == self.total;
        if page_filled {
            self.state = PageState::PageFull;
        }

        Some(Placement {
            card_index,
            page_index: self.page,
            slot,
            origin: self.grid.slot_origin(slot),
            starts_page: slot == 0,
            ends_page: page_filled || deck_done,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Paginator {}
