//! # Raster Rendering
//!
//! Converts continuous-tone photos into the 1-bit packed rasters a thermal
//! head can print.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`dither`] | Floyd-Steinberg error diffusion and bit packing |
//! | [`photo`] | Decode / resize / dither pipeline for message photos |

pub mod dither;
pub mod photo;

pub use photo::RasterBlock;
