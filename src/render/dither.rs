//! # Floyd-Steinberg Error Diffusion
//!
//! Converts a grayscale intensity buffer into binary (black/white) output
//! suitable for a thermal print head.
//!
//! ## Why Error Diffusion?
//!
//! A thermal head prints only black dots. Simple midpoint thresholding turns
//! smooth gradients into visibly banded regions; error diffusion instead
//! carries each pixel's quantization error into its unprocessed neighbors so
//! that dot density tracks local tone.
//!
//! ## The Classic Weights
//!
//! Pixels are scanned in row-major order. After thresholding a pixel at the
//! midpoint, the residual error is distributed:
//!
//! ```text
//!             ┌───────┬───────┐
//!             │   *   │  7/16 │
//!     ┌───────┼───────┼───────┤
//!     │  3/16 │  5/16 │  1/16 │
//!     └───────┴───────┴───────┘
//! ```
//!
//! Weights are simply skipped at image edges (clamping); the slight error
//! loss at borders is invisible at receipt sizes.
//!
//! ## Conventions
//!
//! Intensity is `0.0` = white (no dot) to `1.0` = black (print dot), matching
//! the printer's view of the world rather than the image crate's.

/// Diffuse a grayscale intensity buffer to a binary dot matrix.
///
/// `intensity` is a row-major `width * height` buffer with values in
/// `[0.0, 1.0]` where 1.0 means black. The buffer is consumed because the
/// algorithm mutates it in place while propagating error.
///
/// Returns a row-major `Vec<bool>` of the same dimensions, `true` = print.
pub fn diffuse(mut intensity: Vec<f32>, width: usize, height: usize) -> Vec<bool> {
    assert_eq!(intensity.len(), width * height, "buffer/dimension mismatch");

    let mut dots = vec![false; width * height];
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let old = intensity[idx];
            let dot = old >= 0.5;
            dots[idx] = dot;

            let err = old - if dot { 1.0 } else { 0.0 };

            // Right neighbor: 7/16
            if x + 1 < width {
                intensity[idx + 1] += err * (7.0 / 16.0);
            }
            if y + 1 < height {
                let below = idx + width;
                // Below-left: 3/16
                if x > 0 {
                    intensity[below - 1] += err * (3.0 / 16.0);
                }
                // Below: 5/16
                intensity[below] += err * (5.0 / 16.0);
                // Below-right: 1/16
                if x + 1 < width {
                    intensity[below + 1] += err * (1.0 / 16.0);
                }
            }
        }
    }
    dots
}

/// Pack a row of dot values into bytes.
///
/// - Bit 7 (MSB) = leftmost dot
/// - 1 = black (print), 0 = white
/// - Rows not a multiple of 8 dots are zero-padded on the right
///
/// ```
/// use buzon::render::dither::pack_row;
///
/// let row = vec![true, true, true, true, false, false, false, false];
/// assert_eq!(pack_row(&row), vec![0xF0]);
/// ```
pub fn pack_row(dots: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; dots.len().div_ceil(8)];
    for (i, &dot) in dots.iter().enumerate() {
        if dot {
            bytes[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    bytes
}

/// Diffuse and pack in one pass: intensity buffer in, packed raster out.
///
/// Output length is `ceil(width/8) * height` bytes.
pub fn diffuse_packed(intensity: Vec<f32>, width: usize, height: usize) -> Vec<u8> {
    let dots = diffuse(intensity, width, height);
    let stride = width.div_ceil(8);
    let mut data = Vec::with_capacity(stride * height);
    for row in dots.chunks(width) {
        data.extend(pack_row(row));
    }
    data
}

// ============================================================================
// TESTS
// ============================================================================
