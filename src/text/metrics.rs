//! Character encoding and advance widths.
//!
//! Both output backends address glyphs through the PDF WinAnsi code page, so
//! layout, document and raster output agree on which characters a label
//! contains. Characters outside the code page become `?`.

/// First encodable byte (space).
pub const FIRST_CHAR: u8 = 32;
/// Last encodable byte.
pub const LAST_CHAR: u8 = 255;

const WIDTH_COUNT: usize = (LAST_CHAR - FIRST_CHAR) as usize + 1;

/// Advance widths in 1/1000 em for bytes `FIRST_CHAR..=LAST_CHAR`.
pub type WidthTable = [f32; WIDTH_COUNT];

/// Helvetica-Bold (AFM) widths under WinAnsiEncoding.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; WIDTH_COUNT] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, 0,
    556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

/// WinAnsi bytes 128..=159 and the characters they stand for.
const WIN_ANSI_SPECIALS: [(u8, char); 27] = [
    (128, '\u{20AC}'),
    (130, '\u{201A}'),
    (131, '\u{0192}'),
    (132, '\u{201E}'),
    (133, '\u{2026}'),
    (134, '\u{2020}'),
    (135, '\u{2021}'),
    (136, '\u{02C6}'),
    (137, '\u{2030}'),
    (138, '\u{0160}'),
    (139, '\u{2039}'),
    (140, '\u{0152}'),
    (142, '\u{017D}'),
    (145, '\u{2018}'),
    (146, '\u{2019}'),
    (147, '\u{201C}'),
    (148, '\u{201D}'),
    (149, '\u{2022}'),
    (150, '\u{2013}'),
    (151, '\u{2014}'),
    (152, '\u{02DC}'),
    (153, '\u{2122}'),
    (154, '\u{0161}'),
    (155, '\u{203A}'),
    (156, '\u{0153}'),
    (158, '\u{017E}'),
    (159, '\u{0178}'),
];

/// Encode one character, or `None` if WinAnsi has no slot for it.
pub fn encode_char(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(c as u32 as u8),
        _ => WIN_ANSI_SPECIALS
            .iter()
            .find(|(_, special)| *special == c)
            .map(|(byte, _)| *byte),
    }
}

/// Encode a label, replacing unencodable characters with `?`.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| encode_char(c).unwrap_or(b'?'))
        .collect()
}

/// Character a WinAnsi byte stands for.
pub fn decode_byte(byte: u8) -> Option<char> {
    match byte {
        0x20..=0x7E | 0xA0..=0xFF => Some(byte as char),
        _ => WIN_ANSI_SPECIALS
            .iter()
            .find(|(b, _)| *b == byte)
            .map(|(_, c)| *c),
    }
}

pub fn helvetica_bold_widths() -> WidthTable {
    HELVETICA_BOLD.map(f32::from)
}

/// Build a width table from a per-character advance lookup.
///
/// `advance` returns the advance in 1/1000 em, or `None` for characters the
/// font has no glyph for (they get width 0).
pub fn width_table(advance: impl Fn(char) -> Option<f32>) -> WidthTable {
    let mut table = [0.0; WIDTH_COUNT];
    for (slot, byte) in table.iter_mut().zip(FIRST_CHAR..=LAST_CHAR) {
        *slot = decode_byte(byte).and_then(&advance).unwrap_or(0.0);
    }
    table
}

/// Width of encoded text at `size` points.
pub fn measure_encoded(widths: &WidthTable, bytes: &[u8], size: f32) -> f32 {
    let units: f32 = bytes
        .iter()
        .filter(|b| **b >= FIRST_CHAR)
        .map(|b| widths[(b - FIRST_CHAR) as usize])
        .sum();
    units * size / 1000.0
}
