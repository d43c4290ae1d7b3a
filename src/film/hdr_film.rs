use std::fmt;
use std::sync::OnceLock;

use glam::IVec2;
use tracing::{debug, info, instrument, trace};

use crate::film::banded_storage::BandedStorage;
use crate::film::base::FilmBase;
use crate::film::bitmap::Bitmap;
use crate::film::block::ImageBlock;
use crate::film::common::error::{FilmError, Result};
use crate::film::common::geometry::Bounds2i;
use crate::film::config::FilmConfig;
use crate::film::develop::OutputMapping;
use crate::film::interface::Film;
use crate::film::tiff::{BitmapWriter, StandardTiffWriter};

/// Film backed by a dense full-resolution buffer split into row bands.
///
/// Any region of the crop window can be developed at any time.
pub struct HdrFilm {
    base: FilmBase,
    band_height: usize,
    storage: OnceLock<BandedStorage>,
    writer: Box<dyn BitmapWriter>,
}

impl HdrFilm {
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
            band_height = config.band_height,
            "Created HDR film"
        );
        Ok(Self {
            base,
            band_height: config.band_height,
            storage: OnceLock::new(),
            writer,
        })
    }

    fn storage(&self) -> &BandedStorage {
        match self.storage.get() {
            Some(storage) => storage,
            None => panic!("film used before prepare()"),
        }
    }

    fn develop_bounds(&self, region: &Bounds2i, mapping: &OutputMapping) -> Bitmap {
        let accumulated = self.storage().snapshot(region);
        let mut bitmap = Bitmap::with_channels(mapping.channel_names(), region.width(), region.height());
        mapping.develop_rows(&accumulated, bitmap.data_mut(), region.width());
        bitmap
    }
}

impl fmt::Display for HdrFilm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HdrFilm[{}, band_height = {}]", self.base, self.band_height)
    }
}

impl Film for HdrFilm {
    fn base(&self) -> &FilmBase {
        &self.base
    }

    fn prepare(&self, channels: &[&str]) {
        let layout = self.base.prepare(channels);
        let storage = BandedStorage::new(self.base.storage_bounds(), layout.len(), self.band_height);
        debug!(
            bounds = ?storage.bounds(),
            bands = storage.band_count(),
            "Allocated banded film storage"
        );
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
        let bitmap = self.bitmap(false);
        let path = self.base.write_destination(|file| {
            self.writer
                .write_bitmap(&bitmap, file, self.base.compression())
        })?;
        info!(
            destination = %path.display(),
            width = bitmap.width(),
            height = bitmap.height(),
            "Film developed"
        );
        Ok(())
    }

    fn develop_region(
        &self,
        offset: IVec2,
        size: IVec2,
        target_offset: IVec2,
        target: &mut Bitmap,
    ) -> Result<bool> {
        let layout = self.base.prepared_channels();
        let crop = self.base.crop_bounds();

        let source = Bounds2i::from_offset_size(offset, size);
        let crop_local = Bounds2i::from_offset_size(IVec2::ZERO, crop.size());
        if source.is_empty() || !crop_local.contains_bounds(&source) {
            return Err(FilmError::InvalidRegion(format!(
                "source offset={offset}, size={size} outside crop window of size {}",
                crop.size()
            )));
        }
        let destination = Bounds2i::from_offset_size(target_offset, size);
        let target_bounds = Bounds2i::from_offset_size(IVec2::ZERO, target.size());
        if !target_bounds.contains_bounds(&destination) {
            return Err(FilmError::InvalidRegion(format!(
                "target offset={target_offset}, size={size} outside target of size {}",
                target.size()
            )));
        }
        let Some(mapping) = OutputMapping::for_target(layout, target.channel_names()) else {
            return Err(FilmError::InvalidRegion(format!(
                "target channels {:?} do not match film channels {:?}",
                target.channel_names(),
                layout.names()
            )));
        };

        let region = Bounds2i::from_offset_size(crop.min + offset, size);
        let accumulated = self.storage().snapshot(&region);
        let width = region.width();
        let src_row = width * layout.len();
        for (row, src) in accumulated.chunks_exact(src_row).enumerate() {
            let dst = target.row_mut(
                target_offset.x as usize,
                target_offset.y as usize + row,
                width,
            );
            mapping.develop_row(src, dst);
        }
        debug!(%offset, %size, %target_offset, "Developed film region");
        Ok(true)
    }

    fn bitmap(&self, raw: bool) -> Bitmap {
        let layout = self.base.prepared_channels();
        let mapping = if raw {
            OutputMapping::raw(layout)
        } else {
            OutputMapping::for_format(layout, self.base.pixel_format())
        };
        self.develop_bounds(&self.base.crop_bounds(), &mapping)
    }
}
