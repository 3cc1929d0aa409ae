//! # ESC/POS Protocol
//!
//! Command builders for ESC/POS thermal receipt printers (the protocol spoken
//! by most inexpensive 58mm/80mm POS printers).
//!
//! Every builder returns a `Vec<u8>` ready to be concatenated into a print
//! job. Multi-byte integers are little-endian.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`commands`] | Init, text style, feed, and cut commands |
//! | [`raster`] | Monochrome raster image framing (GS v 0) |
//! | [`cp437`] | Unicode to Code Page 437 text encoding |

pub mod commands;
pub mod cp437;
pub mod raster;
