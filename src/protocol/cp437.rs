//! # Code Page 437 Encoding
//!
//! Converts Unicode strings to the CP437 single-byte encoding the printer's
//! character ROM expects. ASCII (U+0000-U+007F) passes through unchanged;
//! the 128 upper-half code points map to their CP437 byte; anything else is
//! dropped rather than substituted, so a message full of emoji degrades to
//! its plain-text remainder instead of a row of replacement marks.

use log::debug;

/// CP437 upper half: the Unicode code point for each byte 0x80-0xFF.
///
/// Index `b - 0x80` gives the character that byte renders as.
/// Reference: IBM Code Page 437 character set.
const HIGH_HALF: [char; 128] = [
    // 0x80-0x8F
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    // 0x90-0x9F
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    // 0xA0-0xAF
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    // 0xB0-0xBF
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    // 0xC0-0xCF
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    // 0xD0-0xDF
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    // 0xE0-0xEF
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    // 0xF0-0xFF
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■',
    '\u{00A0}',
];

/// Encode a Unicode string as CP437 bytes.
///
/// - ASCII (U+0000-U+007F): passed through as-is
/// - CP437 upper half: single byte 0x80-0xFF
/// - Unmapped characters: dropped (logged at debug level)
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut dropped = 0usize;
    for ch in s.chars() {
        if (ch as u32) < 0x80 {
            out.push(ch as u8);
        } else if let Some(byte) = to_byte(ch) {
            out.push(byte);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        debug!("cp437: dropped {} unmappable character(s)", dropped);
    }
    out
}

/// Map a non-ASCII character to its CP437 byte, if it has one.
fn to_byte(ch: char) -> Option<u8> {
    HIGH_HALF
        .iter()
        .position(|&c| c == ch)
        .map(|i| (i + 0x80) as u8)
}
