//! # ESC/POS Control Commands
//!
//! Builders for the ESC/POS command subset buzon uses: initialization, text
//! styling, paper feed, and cutting.
//!
//! ## Escape Sequence Structure
//!
//! Commands follow these patterns:
//! - Single byte: `LF`
//! - Two bytes: `ESC @`
//! - Multi-byte with parameters: `ESC E n`, `GS V m n`
//!
//! ## Reference
//!
//! Based on the Epson "ESC/POS Application Programming Guide"; the command
//! subset here is implemented identically by the generic 58mm printers buzon
//! targets.

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print the line buffer and advance one line
pub const LF: u8 = 0x0A;

/// Text alignment for `align()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Resets the printer to its power-on default state. Sent at the start of
/// every job so leftover styling from an aborted job cannot leak in.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

// ============================================================================
// TEXT STYLE
// ============================================================================

/// # Bold / Emphasis (ESC E n)
///
/// Turns emphasized printing on (`n = 1`) or off (`n = 0`).
#[inline]
pub fn bold(on: bool) -> Vec<u8> {
    vec![ESC, b'E', on as u8]
}

/// # Justification (ESC a n)
///
/// Sets line alignment: 0 = left, 1 = center, 2 = right. Applies to text and
/// raster lines that follow.
#[inline]
pub fn align(a: Alignment) -> Vec<u8> {
    let n = match a {
        Alignment::Left => 0,
        Alignment::Center => 1,
        Alignment::Right => 2,
    };
    vec![ESC, b'a', n]
}

/// # Character Size (GS ! n)
///
/// Width and height multipliers 1-8. The multiplier is stored as
/// `(w-1) << 4 | (h-1)`; values outside 1-8 are clamped.
///
/// ```
/// use buzon::protocol::commands::char_size;
///
/// // Double width, double height
/// assert_eq!(char_size(2, 2), vec![0x1D, 0x21, 0x11]);
/// // Normal size
/// assert_eq!(char_size(1, 1), vec![0x1D, 0x21, 0x00]);
/// ```
#[inline]
pub fn char_size(width: u8, height: u8) -> Vec<u8> {
    let w = width.clamp(1, 8) - 1;
    let h = height.clamp(1, 8) - 1;
    vec![GS, b'!', (w << 4) | h]
}

// ============================================================================
// PAPER FEED AND CUT
// ============================================================================

/// # Line Feed (LF)
///
/// Prints the line buffer and advances one line.
#[inline]
pub fn line_feed() -> Vec<u8> {
    vec![LF]
}

/// # Feed n Lines (ESC d n)
///
/// Prints the line buffer and feeds `n` lines.
#[inline]
pub fn feed_lines(n: u8) -> Vec<u8> {
    vec![ESC, b'd', n]
}

/// # Feed and Partial Cut (GS V 66 n)
///
/// Feeds the paper `n` vertical motion units past the last printed line (so
/// the content clears the cutter) and performs a partial cut. The standard
/// end-of-job command: it physically separates consecutive receipts.
///
/// | Format  | Bytes      |
/// |---------|------------|
/// | ASCII   | GS V B n   |
/// | Hex     | 1D 56 42 n |
#[inline]
pub fn cut_feed(n: u8) -> Vec<u8> {
    vec![GS, b'V', 66, n]
}

// ============================================================================
// HELPERS
// ============================================================================

/// Encode a u16 value as little-endian bytes [low, high].
///
/// ESC/POS uses little-endian encoding for all multi-byte integers.
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

// ============================================================================
// TESTS
// ============================================================================
