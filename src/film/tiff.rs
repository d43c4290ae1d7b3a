//! TIFF writing module
//!
//! This module encodes developed film contents as float32 TIFF files with
//! various compression options.

mod writer;
mod standard_tiff_writer;
pub mod types;


pub use writer::{BitmapWriter, StripLayout, TiffSink};
pub use standard_tiff_writer::StandardTiffWriter;
pub use types::TiffCompression;
