//! # ESC/POS Raster Graphics (GS v 0)
//!
//! Frames a packed 1-bit image for the "print raster bit image" command.
//!
//! ## Bit Packing
//!
//! Graphics data is row-major, one bit per dot:
//! - Bit 7 (MSB) = leftmost dot
//! - Bit 0 (LSB) = rightmost dot
//! - 1 = black (print), 0 = white (no print)
//! - Each row is padded on the right to a byte boundary
//!
//! ```text
//! Byte value 0xF0 = 11110000 = ████░░░░
//! Byte value 0xAA = 10101010 = █░█░█░█░
//! ```

use super::commands::{u16_le, GS};

/// Maximum raster height per command. Taller images are emitted as multiple
/// consecutive commands by [`raster`]; the printer renders them seamlessly.
const MAX_SLICE_ROWS: usize = 1024;

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH d1...dk)
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS v 0 m xL xH yL yH d1...dk |
/// | Hex     | 1D 76 30 m xL xH yL yH d1...dk |
///
/// ## Parameters
///
/// - `m`: 0 (normal mode, 1:1 dot scaling)
/// - `xL xH`: row width in **bytes**, little-endian
/// - `yL yH`: height in dots, little-endian
/// - `d1...dk`: image data, k = row_bytes × height
///
/// ## Inputs
///
/// - `width_px`: image width in dots; the row stride is `ceil(width_px / 8)`
/// - `data`: packed rows, exactly `stride * height` bytes
///
/// Images taller than the per-command limit are split into stacked slices.
///
/// ## Example
///
/// ```
/// use buzon::protocol::raster;
///
/// // 16x2 all-black image: 2 bytes per row
/// let cmd = raster::raster(16, 2, &[0xFF, 0xFF, 0xFF, 0xFF]);
/// assert_eq!(&cmd[0..8], &[0x1D, 0x76, 0x30, 0x00, 0x02, 0x00, 0x02, 0x00]);
/// assert_eq!(cmd.len(), 8 + 4);
/// ```
pub fn raster(width_px: u16, height: u16, data: &[u8]) -> Vec<u8> {
    let stride = (width_px as usize).div_ceil(8);
    debug_assert!(
        data.len() == stride * height as usize,
        "Raster data must be exactly stride * height bytes. Expected {}, got {}",
        stride * height as usize,
        data.len()
    );

    let mut cmd = Vec::with_capacity(data.len() + 8 * (height as usize / MAX_SLICE_ROWS + 1));
    let mut row = 0usize;
    while row < height as usize {
        let rows = (height as usize - row).min(MAX_SLICE_ROWS);
        cmd.push(GS);
        cmd.push(b'v');
        cmd.push(b'0');
        cmd.push(0); // m = normal scaling
        cmd.extend_from_slice(&u16_le(stride as u16));
        cmd.extend_from_slice(&u16_le(rows as u16));
        cmd.extend_from_slice(&data[row * stride..(row + rows) * stride]);
        row += rows;
    }
    cmd
}

// ============================================================================
// TESTS
// ============================================================================
