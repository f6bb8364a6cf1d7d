//! # Cardpress
//!
//! Lays out a deck of travel trading cards onto print pages and renders each
//! card as a standalone image. A deck is a JSON list of records; every card
//! combines a photo panel with one rounded corner, a flag and city label
//! sized to fit, a continent badge, a column of transport icons and a corner
//! number.
//!
//! # Architecture: Layout Once, Draw Anywhere
//!
//! ```text
//! cards.json ─► deck ─► CardRenderer ─► CardLayout (draw ops in card points)
//!                                           │
//!                         ┌─────────────────┴─────────────────┐
//!                  Paginator + PdfDocument              RasterSurface
//!                  output/cards.pdf                     output/cards/<image>.png
//! ```
//!
//! Cards are laid out into a list of draw operations in card-local points
//! (origin bottom-left, y up). The same layout is replayed into the page of
//! a PDF at its grid slot, or onto a card-sized canvas for the card's own
//! PNG, so both outputs always agree.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`deck`] | Card records, defaults, identifiers, deck statistics and sorting |
//! | [`config`] | `config.toml` loading, validation and merging over stock defaults |
//! | [`geometry`] | Lengths with units, points and rectangles |
//! | [`assets`] | Asset name → path resolution and a shared decode cache |
//! | [`imaging`] | Supersampled photo panels with a rounded top-left corner |
//! | [`text`] | WinAnsi metrics, font selection and the adaptive label fitter |
//! | [`render`] | Card composition, the draw-op model and the PDF and raster surfaces |
//! | [`paginate`] | Grid slot coordinates and the page-filling state machine |
//! | [`pipeline`] | Whole-deck rendering with rayon, progress events, asset checks |
//! | [`transport_deck`] | The separate sheet of transport-icon cards |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Missing Assets Are Warnings
//!
//! A deck is assembled by hand and assets go missing. A card whose flag is
//! absent still prints with its photo, text and icons; the missing flag is
//! reported against that card. Only an output that cannot be written stops
//! a run.
//!
//! ## One Width Metric
//!
//! Label fitting and PDF text measure with the same advance-width table.
//! Raster text is stretched to that width, so a label that fits in the
//! document fits in the card image too, whatever face draws it.
//!
//! ## Pure-Rust Output
//!
//! PDFs are written with `pdf-writer`, card images drawn with `tiny-skia`
//! and encoded with the `image` crate, and glyph outlines read with
//! `ab_glyph`. No system tools are needed. The built-in face is drawn into
//! PNGs with a Helvetica-compatible system font when one is installed and a
//! bundled DejaVu Sans Bold otherwise.

pub mod assets;
pub mod config;
pub mod deck;
pub mod geometry;
pub mod imaging;
pub mod output;
pub mod paginate;
pub mod pipeline;
pub mod render;
pub mod text;
pub mod transport_deck;

#[cfg(test)]
pub(crate) mod test_helpers;
