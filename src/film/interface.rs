use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::IVec2;

use crate::film::base::{ChannelLayout, FilmBase};
use crate::film::bitmap::Bitmap;
use crate::film::block::ImageBlock;
use crate::film::common::error::Result;
use crate::film::config::{FilmConfig, FilmKind};
use crate::film::filter::ReconstructionFilter;
use crate::film::hdr_film::HdrFilm;
use crate::film::streaming_film::StreamingFilm;

/// Stores the samples produced by rendering threads.
///
/// To avoid lock contention when rendering with many cores, threads first
/// accumulate into a private [`ImageBlock`] and then commit it with
/// [`Film::put`]. Normalization happens only when the film is developed.
///
/// `prepare` must be called exactly once before any other accumulation or
/// develop method; violating that, or putting a block whose channel count
/// differs from the prepared layout, panics.
///
/// `Display` gives a one-line summary of the film's configuration.
pub trait Film: fmt::Display + Send + Sync {
    /// Shared configuration state.
    fn base(&self) -> &FilmBase;

    /// Fixes the channel layout. The last channel must be the weight `W`.
    fn prepare(&self, channels: &[&str]);

    /// Merges a finished block into the film. Safe to call from any number
    /// of threads at once, with overlapping blocks.
    fn put(&self, block: &ImageBlock);

    /// Multiplies the accumulated weight of every pixel by `weight`.
    fn reweight(&self, weight: f32);

    /// Develops the crop window and writes it to the destination file.
    fn develop(&self) -> Result<()>;

    /// Develops the crop-relative region `offset..offset + size` into
    /// `target` at `target_offset`.
    ///
    /// Returns `Ok(false)` without touching `target` when this film has no
    /// random-access representation; callers then fall back to
    /// [`Film::bitmap`] or [`Film::develop`].
    fn develop_region(
        &self,
        offset: IVec2,
        size: IVec2,
        target_offset: IVec2,
        target: &mut Bitmap,
    ) -> Result<bool>;

    /// Normalized snapshot of the crop window. With `raw` every value channel
    /// is returned as accumulated; otherwise channels are selected into the
    /// configured output pixel format.
    fn bitmap(&self, raw: bool) -> Bitmap;

    fn set_destination_file(&self, filename: &Path) -> Result<()> {
        self.base().set_destination_file(filename)
    }

    fn destination_exists(&self, basename: &Path) -> bool {
        self.base().destination_exists(basename)
    }

    fn destination(&self) -> Option<PathBuf> {
        self.base().destination()
    }

    /// Whether regions slightly outside the sensor are accumulated so edge
    /// pixels get their full filter support.
    fn has_high_quality_edges(&self) -> bool {
        self.base().has_high_quality_edges()
    }

    /// Sensor resolution, ignoring the crop window.
    fn size(&self) -> IVec2 {
        self.base().size()
    }

    fn crop_size(&self) -> IVec2 {
        self.base().crop_size()
    }

    fn crop_offset(&self) -> IVec2 {
        self.base().crop_offset()
    }

    fn set_crop_window(&self, offset: IVec2, size: IVec2) -> Result<()> {
        self.base().set_crop_window(offset, size)
    }

    fn reconstruction_filter(&self) -> &dyn ReconstructionFilter {
        self.base().reconstruction_filter().as_ref()
    }

    fn channels(&self) -> Option<&ChannelLayout> {
        self.base().channels()
    }

    /// Empty block for the tile at `offset`, laid out for this film.
    fn create_block(&self, offset: IVec2, size: IVec2) -> ImageBlock {
        self.base().create_block(offset, size)
    }
}

pub fn create_film(config: &FilmConfig) -> Result<Arc<dyn Film>> {
    let film: Arc<dyn Film> = match config.kind {
        FilmKind::Hdr => Arc::new(HdrFilm::new(config)?),
        FilmKind::Streaming => Arc::new(StreamingFilm::new(config)?),
    };
    Ok(film)
}
