use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use glam::IVec2;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::film::bitmap::PixelFormat;
use crate::film::block::ImageBlock;
use crate::film::common::error::{FilmError, Result};
use crate::film::common::geometry::Bounds2i;
use crate::film::config::{FilmConfig, validate_crop_window};
use crate::film::filter::ReconstructionFilter;
use crate::film::tiff::TiffCompression;

/// Name of the accumulated filter weight channel. It is always last.
pub const WEIGHT_CHANNEL: &str = "W";

/// Ordered channel names fixed by `Film::prepare`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    names: Vec<String>,
}

impl ChannelLayout {
    /// Panics unless the names are unique, non-empty and end with the weight
    /// channel preceded by at least one value channel.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        assert!(
            names.len() >= 2,
            "channel layout needs at least one value channel and the weight channel, got {names:?}"
        );
        assert!(
            names.last().map(String::as_str) == Some(WEIGHT_CHANNEL),
            "last channel must be the weight channel \"{WEIGHT_CHANNEL}\", got {names:?}"
        );
        for (i, name) in names.iter().enumerate() {
            assert!(!name.is_empty(), "channel names must not be empty");
            assert!(
                !names[..i].contains(name),
                "duplicate channel name \"{name}\" in {names:?}"
            );
        }
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Channel count including the weight.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn value_names(&self) -> &[String] {
        &self.names[..self.names.len() - 1]
    }

    pub fn value_count(&self) -> usize {
        self.names.len() - 1
    }

    pub fn weight_index(&self) -> usize {
        self.names.len() - 1
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.value_names().iter().position(|n| n == name)
    }
}

#[derive(Debug, Clone, Copy)]
struct CropWindow {
    offset: IVec2,
    size: IVec2,
}

/// State shared by every film representation: sensor geometry, crop window,
/// filter, channel layout and output destination.
#[derive(Debug)]
pub struct FilmBase {
    size: IVec2,
    crop: RwLock<CropWindow>,
    high_quality_edges: bool,
    filter: Arc<dyn ReconstructionFilter>,
    channels: OnceLock<ChannelLayout>,
    destination: RwLock<Option<PathBuf>>,
    pixel_format: PixelFormat,
    compression: TiffCompression,
}

impl FilmBase {
    pub fn new(config: &FilmConfig) -> Result<Self> {
        config.validate()?;

        let size = config.size();
        let crop = match &config.crop {
            Some(crop) => CropWindow {
                offset: crop.offset(),
                size: crop.size(),
            },
            None => CropWindow {
                offset: IVec2::ZERO,
                size,
            },
        };

        let base = Self {
            size,
            crop: RwLock::new(crop),
            high_quality_edges: config.high_quality_edges,
            filter: config.filter.build()?,
            channels: OnceLock::new(),
            destination: RwLock::new(None),
            pixel_format: config.pixel_format,
            compression: config.compression,
        };
        if let Some(destination) = &config.destination {
            base.set_destination_file(destination)?;
        }
        Ok(base)
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    pub fn crop_offset(&self) -> IVec2 {
        self.crop.read().offset
    }

    pub fn crop_size(&self) -> IVec2 {
        self.crop.read().size
    }

    /// Crop window as pixel bounds, read under a single lock.
    pub fn crop_bounds(&self) -> Bounds2i {
        let crop = *self.crop.read();
        Bounds2i::from_offset_size(crop.offset, crop.size)
    }

    pub fn set_crop_window(&self, offset: IVec2, size: IVec2) -> Result<()> {
        if let Err(e) = validate_crop_window(offset, size, self.size) {
            warn!(%offset, %size, film_size = %self.size, "Rejected crop window");
            return Err(e);
        }
        *self.crop.write() = CropWindow { offset, size };
        info!(%offset, %size, "Crop window updated");
        Ok(())
    }

    pub fn has_high_quality_edges(&self) -> bool {
        self.high_quality_edges
    }

    pub fn reconstruction_filter(&self) -> &Arc<dyn ReconstructionFilter> {
        &self.filter
    }

    /// Pixels accumulated past each sensor edge.
    pub fn border_size(&self) -> i32 {
        if self.high_quality_edges {
            self.filter.border_size()
        } else {
            0
        }
    }

    /// Range of film pixels the shared buffer can hold.
    pub fn storage_bounds(&self) -> Bounds2i {
        Bounds2i::from_offset_size(IVec2::ZERO, self.size).expand(self.border_size())
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn compression(&self) -> TiffCompression {
        self.compression
    }

    pub fn channels(&self) -> Option<&ChannelLayout> {
        self.channels.get()
    }

    /// Channel layout of a prepared film. Using a film before `prepare` is a
    /// programming error.
    pub fn prepared_channels(&self) -> &ChannelLayout {
        match self.channels.get() {
            Some(layout) => layout,
            None => panic!("film used before prepare()"),
        }
    }

    pub fn prepare(&self, channels: &[&str]) -> &ChannelLayout {
        let layout = ChannelLayout::new(channels);
        if self.channels.set(layout).is_err() {
            panic!("film prepare() called more than once");
        }
        let layout = self.prepared_channels();
        info!(channels = ?layout.names(), "Film prepared");
        layout
    }

    /// Panics when `block` does not match the prepared layout.
    pub fn check_block(&self, block: &ImageBlock) {
        let layout = self.prepared_channels();
        assert_eq!(
            block.channel_count(),
            layout.len(),
            "image block has {} channels but the film was prepared with {:?}",
            block.channel_count(),
            layout.names()
        );
    }

    /// Block for the tile at `offset`, with a filter border when edge
    /// handling is active.
    pub fn create_block(&self, offset: IVec2, size: IVec2) -> ImageBlock {
        ImageBlock::with_border(
            offset,
            size,
            self.prepared_channels().len(),
            Some(self.filter.clone()),
            self.border_size(),
        )
    }

    pub fn destination(&self) -> Option<PathBuf> {
        self.destination.read().clone()
    }

    pub fn set_destination_file(&self, filename: &Path) -> Result<()> {
        let path = with_tiff_extension(filename);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(FilmError::OutputWriteError(format!(
                    "{}: parent directory does not exist",
                    path.display()
                )));
            }
        }
        info!(destination = %path.display(), "Destination file set");
        *self.destination.write() = Some(path);
        Ok(())
    }

    pub fn destination_exists(&self, basename: &Path) -> bool {
        with_tiff_extension(basename).exists()
    }

    /// Runs `write` against a staging file in the destination's directory
    /// and renames it over the destination once `write` succeeds. On any
    /// failure the staging file is removed and an existing destination keeps
    /// its previous contents.
    pub(crate) fn write_destination(
        &self,
        write: impl FnOnce(&mut File) -> Result<()>,
    ) -> Result<PathBuf> {
        let path = self.destination().ok_or(FilmError::DestinationUnset)?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let mut staged = tempfile::Builder::new()
            .prefix(".hdrfilm-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|e| FilmError::OutputWriteError(format!("{}: {}", path.display(), e)))?;
        write(staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        staged
            .persist(&path)
            .map_err(|e| FilmError::OutputWriteError(format!("{}: {}", path.display(), e.error)))?;
        Ok(path)
    }
}

impl fmt::Display for FilmBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let crop = *self.crop.read();
        write!(
            f,
            "size = {}, crop_offset = {}, crop_size = {}, filter = {}(radius = {}), high_quality_edges = {}",
            self.size,
            crop.offset,
            crop.size,
            self.filter.name(),
            self.filter.radius(),
            self.high_quality_edges
        )?;
        if let Some(destination) = self.destination() {
            write!(f, ", destination = {}", destination.display())?;
        }
        Ok(())
    }
}

fn with_tiff_extension(path: &Path) -> PathBuf {
    let is_tiff = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"));
    if is_tiff {
        path.to_path_buf()
    } else {
        path.with_extension("tiff")
    }
}
