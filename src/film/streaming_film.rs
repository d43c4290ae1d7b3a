use std::fmt;
use std::sync::OnceLock;

use glam::IVec2;
use tracing::{debug, info, instrument, trace};

use crate::film::base::FilmBase;
use crate::film::bitmap::Bitmap;
use crate::film::block::ImageBlock;
use crate::film::common::error::Result;
use crate::film::common::geometry::Bounds2i;
use crate::film::config::FilmConfig;
use crate::film::develop::OutputMapping;
use crate::film::interface::Film;
use crate::film::tiff::{BitmapWriter, StandardTiffWriter, StripLayout};
use crate::film::tiled_storage::{TileSnapshot, TiledStorage};

/// Film backed by sparse tiles that are encoded strip by strip.
///
/// Memory grows only with the area blocks have touched. `develop` copies the
/// touched tiles of the crop window and hands the encoder one strip at a
/// time, which goes straight to the destination file; no dense raster of the
/// crop window is ever built. The flip side is that it cannot fill arbitrary
/// regions of a caller's bitmap: `develop_region` always reports `false`.
pub struct StreamingFilm {
    base: FilmBase,
    tile_size: usize,
    storage: OnceLock<TiledStorage>,
    writer: Box<dyn BitmapWriter>,
}

impl StreamingFilm {
    pub fn new(config: &FilmConfig) -> Result<Self> {
        Self::with_writer(config, Box::new(StandardTiffWriter))
    }

    pub fn with_writer(config: &FilmConfig, writer: Box<dyn BitmapWriter>) -> Result<Self> {
        let base = FilmBase::new(config)?;
        info!(
            size = %base.size(),
            crop_offset = %base.crop_offset(),
            crop_size = %base.crop_size(),
            filter = base.reconstruction_filter().name(),
            high_quality_edges = base.has_high_quality_edges(),
            tile_size = config.tile_size,
            "Created streaming film"
        );
        Ok(Self {
            base,
            tile_size: config.tile_size,
            storage: OnceLock::new(),
            writer,
        })
    }

    fn storage(&self) -> &TiledStorage {
        match self.storage.get() {
            Some(storage) => storage,
            None => panic!("film used before prepare()"),
        }
    }

    /// Number of tiles that have received at least one block.
    pub fn allocated_tiles(&self) -> usize {
        self.storage().allocated_tiles()
    }

    fn develop_rows(
        snapshot: &TileSnapshot,
        mapping: &OutputMapping,
        crop: &Bounds2i,
        first_row: usize,
        out: &mut [f32],
        scratch: &mut Vec<f32>,
        src_channels: usize,
    ) {
        let width = crop.width();
        scratch.resize(width * src_channels, 0.0);
        for (i, dst) in out.chunks_exact_mut(width * mapping.channel_count()).enumerate() {
            let y = crop.min.y + (first_row + i) as i32;
            snapshot.copy_row(y, crop.min.x, crop.max.x, scratch);
            mapping.develop_row(scratch, dst);
        }
    }
}

impl fmt::Display for StreamingFilm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamingFilm[{}, tile_size = {}]", self.base, self.tile_size)
    }
}

impl Film for StreamingFilm {
    fn base(&self) -> &FilmBase {
        &self.base
    }

    fn prepare(&self, channels: &[&str]) {
        let layout = self.base.prepare(channels);
        let storage = TiledStorage::new(self.base.storage_bounds(), layout.len(), self.tile_size);
        debug!(tiles = storage.tile_count(), "Allocated tiled film storage");
        if self.storage.set(storage).is_err() {
            panic!("film prepare() called more than once");
        }
    }

    fn put(&self, block: &ImageBlock) {
        self.base.check_block(block);
        let merged = self.storage().accumulate(block);
        trace!(offset = %block.offset(), size = %block.size(), merged, "Merged image block");
    }

    fn reweight(&self, weight: f32) {
        let layout = self.base.prepared_channels();
        self.storage().scale_channel(layout.weight_index(), weight);
        debug!(weight, "Reweighted film");
    }

    #[instrument(skip(self))]
    fn develop(&self) -> Result<()> {
        let layout = self.base.prepared_channels();
        let mapping = OutputMapping::for_format(layout, self.base.pixel_format());
        let crop = self.base.crop_bounds();
        let snapshot = self.storage().snapshot(&crop);
        let strip_layout = StripLayout {
            width: crop.width(),
            height: crop.height(),
            channel_count: mapping.channel_count(),
            rows_per_strip: self.tile_size,
        };
        let path = self.base.write_destination(|file| {
            let mut scratch = Vec::new();
            let mut fill = |first_row: usize, strip: &mut [f32]| {
                Self::develop_rows(&snapshot, &mapping, &crop, first_row, strip, &mut scratch, layout.len());
            };
            self.writer
                .write_strips(strip_layout, &mut fill, file, self.base.compression())
        })?;

        info!(
            destination = %path.display(),
            width = crop.width(),
            height = crop.height(),
            tiles = snapshot.allocated_tiles(),
            "Film developed"
        );
        Ok(())
    }

    fn develop_region(
        &self,
        offset: IVec2,
        size: IVec2,
        _target_offset: IVec2,
        _target: &mut Bitmap,
    ) -> Result<bool> {
        self.base.prepared_channels();
        debug!(%offset, %size, "Streaming film cannot develop sub-regions");
        Ok(false)
    }

    fn bitmap(&self, raw: bool) -> Bitmap {
        let layout = self.base.prepared_channels();
        let mapping = if raw {
            OutputMapping::raw(layout)
        } else {
            OutputMapping::for_format(layout, self.base.pixel_format())
        };
        let crop = self.base.crop_bounds();
        let snapshot = self.storage().snapshot(&crop);

        let mut bitmap = Bitmap::with_channels(mapping.channel_names(), crop.width(), crop.height());
        let mut scratch = Vec::new();
        Self::develop_rows(&snapshot, &mapping, &crop, 0, bitmap.data_mut(), &mut scratch, layout.len());
        bitmap
    }
}
