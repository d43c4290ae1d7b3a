use std::io::{Seek, Write};

use crate::film::bitmap::Bitmap;
use crate::film::common::error::Result;
use crate::film::tiff::types::TiffCompression;

/// Shape of an image produced strip by strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLayout {
    pub width: usize,
    pub height: usize,
    pub channel_count: usize,
    pub rows_per_strip: usize,
}

/// Seekable byte sink the TIFF encoder writes into, such as a `File`.
pub trait TiffSink: Write + Seek {}

impl<T: Write + Seek> TiffSink for T {}

pub trait BitmapWriter: Send + Sync {
    fn write_bitmap(
        &self,
        bitmap: &Bitmap,
        output: &mut dyn TiffSink,
        compression: TiffCompression,
    ) -> Result<()>;

    /// Encodes an image whose rows are produced on demand. `fill` receives the
    /// first row of the strip and a buffer sized for the strip's rows; each
    /// strip is written to `output` before the next one is requested.
    fn write_strips(
        &self,
        layout: StripLayout,
        fill: &mut dyn FnMut(usize, &mut [f32]),
        output: &mut dyn TiffSink,
        compression: TiffCompression,
    ) -> Result<()>;
}
