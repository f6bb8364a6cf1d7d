//! CLI output formatting.
//!
//! # Card-First Display
//!
//! Every card is identified by its 1-based deck position and its city, the
//! way a person flipping through the printed deck would find it. File paths
//! and problems are secondary context on indented lines under the card.
//!
//! # Output Format
//!
//! ## Render
//!
//! ```text
//! Font: Helvetica-Bold (built-in)
//! Page 1 (9 cards)
//!     001 Kyoto
//!     002 Lisbon
//!         flag: missing input/flags/pt.png
//!     003 Thiruvananthapuram
//!         city label overflows at 8pt
//! Wrote output/cards.pdf (2 pages)
//! Card images
//!     001 Kyoto → output/cards/kyoto.png
//!     004 City
//!         skipped: no image to name it after
//! ```
//!
//! ## Check
//!
//! ```text
//! 002 Lisbon
//!     flag: missing input/flags/pt.png
//! 1 of 12 cards have asset problems
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::deck::{DeckStats, most_common};
use crate::pipeline::{AssetIssue, RenderEvent};
use crate::render::ElementStatus;

/// Format a 0-based deck index as a 3-digit, 1-based position.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

/// 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn card_header(depth: usize, index: usize, title: &str) -> String {
    format!("{}{} {}", indent(depth), format_index(index), title)
}

fn combination_label(combo: &[String]) -> String {
    if combo.is_empty() {
        "(none)".to_string()
    } else {
        combo.join(" + ")
    }
}

// ============================================================================
// Render
// ============================================================================

/// Format a single render progress event as display lines.
pub fn format_render_event(event: &RenderEvent) -> Vec<String> {
    match event {
        RenderEvent::FontSelected { name, source } => match source {
            Some(path) => vec![format!("Font: {} ({})", name, path.display())],
            None => vec![format!("Font: {} (built-in)", name)],
        },
        RenderEvent::FontFallback { reason } => {
            vec![format!("Warning: {reason}; using the built-in font")]
        }
        RenderEvent::RasterTextUnavailable => vec![
            "Warning: no outline font could be loaded; card images will have no text".to_string(),
        ],
        RenderEvent::PageStarted { page, card_count } => {
            let noun = if *card_count == 1 { "card" } else { "cards" };
            vec![format!("Page {page} ({card_count} {noun})")]
        }
        RenderEvent::CardRendered {
            index,
            title,
            warnings,
            overflow_at,
        } => {
            let mut lines = vec![card_header(1, *index, title)];
            for outcome in warnings {
                if let ElementStatus::Skipped(reason) = &outcome.status {
                    lines.push(format!("{}{}: {}", indent(2), outcome.element, reason));
                }
            }
            if let Some(size) = overflow_at {
                lines.push(format!("{}city label overflows at {size}pt", indent(2)));
            }
            lines
        }
        RenderEvent::CardImageWritten { index, title, path } => {
            vec![format!(
                "{} \u{2192} {}",
                card_header(1, *index, title),
                path.display()
            )]
        }
        RenderEvent::CardImageSkipped {
            index,
            title,
            reason,
        } => vec![
            card_header(1, *index, title),
            format!("{}skipped: {reason}", indent(2)),
        ],
        RenderEvent::DocumentWritten { path, pages } => {
            let noun = if *pages == 1 { "page" } else { "pages" };
            vec![format!("Wrote {} ({pages} {noun})", path.display())]
        }
        RenderEvent::IconSkipped { icon, reason } => {
            vec![format!("Warning: no '{icon}' cards: {reason}")]
        }
    }
}

// ============================================================================
// Check
// ============================================================================

/// Group asset problems under their cards.
pub fn format_check(issues: &[AssetIssue], deck_len: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cards_with_issues = 0;
    let mut current = None;
    for issue in issues {
        if current != Some(issue.index) {
            current = Some(issue.index);
            cards_with_issues += 1;
            lines.push(card_header(0, issue.index, &issue.title));
        }
        lines.push(format!("{}{}: {}", indent(1), issue.element, issue.reason));
    }
    if cards_with_issues == 0 {
        lines.push(format!("All assets found for {deck_len} cards"));
    } else {
        lines.push(format!(
            "{cards_with_issues} of {deck_len} cards have asset problems"
        ));
    }
    lines
}

pub fn print_check(issues: &[AssetIssue], deck_len: usize) {
    for line in format_check(issues, deck_len) {
        println!("{}", line);
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Deck summary, most common first.
pub fn format_stats(stats: &DeckStats) -> Vec<String> {
    let mut lines = vec![format!("Deck: {} cards", stats.total)];

    lines.push("By continent".to_string());
    for (continent, count) in most_common(&stats.by_continent) {
        lines.push(format!("{}{continent}: {count}", indent(1)));
    }

    lines.push("By transport".to_string());
    for (combo, count) in most_common(&stats.by_combination) {
        lines.push(format!("{}{}: {count}", indent(1), combination_label(&combo)));
    }

    lines.push("By continent and transport".to_string());
    for (continent, combos) in &stats.by_continent_combination {
        lines.push(format!("{}{continent}", indent(1)));
        for (combo, count) in most_common(combos) {
            lines.push(format!("{}{}: {count}", indent(2), combination_label(&combo)));
        }
    }
    lines
}

pub fn print_stats(stats: &DeckStats) {
    for line in format_stats(stats) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::CardRecord;
    use crate::render::{Element, ElementOutcome, SkipReason};
    use std::path::PathBuf;

    #[test]
    fn index_is_one_based_and_padded() {
        assert_eq!(format_index(0), "001");
        assert_eq!(format_index(41), "042");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn format_font_events() {
        let builtin = RenderEvent::FontSelected {
            name: "Helvetica-Bold".into(),
            source: None,
        };
        assert_eq!(
            format_render_event(&builtin),
            vec!["Font: Helvetica-Bold (built-in)"]
        );
        let custom = RenderEvent::FontSelected {
            name: "GagalinRegular".into(),
            source: Some(PathBuf::from("input/Gagalin Regular.ttf")),
        };
        assert_eq!(
            format_render_event(&custom),
            vec!["Font: GagalinRegular (input/Gagalin Regular.ttf)"]
        );
    }

    #[test]
    fn format_page_started() {
        let lines = format_render_event(&RenderEvent::PageStarted {
            page: 2,
            card_count: 1,
        });
        assert_eq!(lines, vec!["Page 2 (1 card)"]);
    }

    #[test]
    fn format_card_with_warnings() {
        let event = RenderEvent::CardRendered {
            index: 1,
            title: "Lisbon".into(),
            warnings: vec![ElementOutcome {
                element: Element::Flag,
                status: ElementStatus::Skipped(SkipReason::Missing(PathBuf::from(
                    "input/flags/pt.png",
                ))),
            }],
            overflow_at: Some(8.0),
        };
        assert_eq!(
            format_render_event(&event),
            vec![
                "    002 Lisbon",
                "        flag: missing input/flags/pt.png",
                "        city label overflows at 8pt",
            ]
        );
    }

    #[test]
    fn format_card_images() {
        let written = RenderEvent::CardImageWritten {
            index: 0,
            title: "Kyoto".into(),
            path: PathBuf::from("output/cards/kyoto.png"),
        };
        assert_eq!(
            format_render_event(&written),
            vec!["    001 Kyoto \u{2192} output/cards/kyoto.png"]
        );
        let skipped = RenderEvent::CardImageSkipped {
            index: 3,
            title: "City".into(),
            reason: "no image to name it after".into(),
        };
        assert_eq!(
            format_render_event(&skipped),
            vec!["    004 City", "        skipped: no image to name it after"]
        );
    }

    #[test]
    fn format_document_written() {
        let lines = format_render_event(&RenderEvent::DocumentWritten {
            path: PathBuf::from("output/cards.pdf"),
            pages: 2,
        });
        assert_eq!(lines, vec!["Wrote output/cards.pdf (2 pages)"]);
    }

    #[test]
    fn format_icon_skipped() {
        let lines = format_render_event(&RenderEvent::IconSkipped {
            icon: "plane".into(),
            reason: "missing input/transport_icons/plane.png".into(),
        });
        assert_eq!(
            lines,
            vec!["Warning: no 'plane' cards: missing input/transport_icons/plane.png"]
        );
    }

    #[test]
    fn check_groups_issues_by_card() {
        let issues = vec![
            AssetIssue {
                index: 1,
                title: "Lisbon".into(),
                element: Element::Flag,
                reason: SkipReason::Missing(PathBuf::from("input/flags/pt.png")),
            },
            AssetIssue {
                index: 1,
                title: "Lisbon".into(),
                element: Element::TransportIcon("ferry".into()),
                reason: SkipReason::Missing(PathBuf::from("input/transport_icons/ferry.png")),
            },
        ];
        assert_eq!(
            format_check(&issues, 12),
            vec![
                "002 Lisbon",
                "    flag: missing input/flags/pt.png",
                "    transport icon 'ferry': missing input/transport_icons/ferry.png",
                "1 of 12 cards have asset problems",
            ]
        );
    }

    #[test]
    fn check_without_issues() {
        assert_eq!(format_check(&[], 3), vec!["All assets found for 3 cards"]);
    }

    #[test]
    fn stats_list_most_common_first() {
        let card = |continent: &str, transport: &[&str]| CardRecord {
            continent: Some(continent.into()),
            transport: transport.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let deck = vec![
            card("asia", &["train", "bus"]),
            card("asia", &["bus", "train"]),
            card("europe", &["boat"]),
        ];
        let lines = format_stats(&DeckStats::collect(&deck));
        assert_eq!(
            lines,
            vec![
                "Deck: 3 cards",
                "By continent",
                "    asia: 2",
                "    europe: 1",
                "By transport",
                "    bus + train: 2",
                "    boat: 1",
                "By continent and transport",
                "    asia",
                "        bus + train: 2",
                "    europe",
                "        boat: 1",
            ]
        );
    }
}
