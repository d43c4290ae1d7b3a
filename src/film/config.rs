//! Film configuration types

use std::path::{Path, PathBuf};

use glam::IVec2;
use serde::Deserialize;

use crate::film::bitmap::PixelFormat;
use crate::film::common::error::{FilmError, Result};
use crate::film::filter::FilterConfig;
use crate::film::tiff::TiffCompression;

/// Largest accepted film width or height, and largest filter border when
/// high-quality edges are enabled. Keeps every storage bound inside `i32`.
pub const MAX_RESOLUTION: i32 = 1 << 16;

/// Concrete film representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilmKind {
    /// Dense in-memory buffer, supports sub-region develop
    #[default]
    Hdr,
    /// Sparse tiles encoded strip by strip, no sub-region develop
    Streaming,
}

/// Crop window in sensor pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CropConfig {
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: i32,
    pub height: i32,
}

impl CropConfig {
    pub fn offset(&self) -> IVec2 {
        IVec2::new(self.offset_x, self.offset_y)
    }

    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width, self.height)
    }
}

/// Configuration for constructing a film
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilmConfig {
    pub kind: FilmKind,
    pub width: i32,
    pub height: i32,
    /// Crop window; the full sensor when absent
    pub crop: Option<CropConfig>,
    pub filter: FilterConfig,
    /// Accumulate a filter-sized border outside the sensor so edge pixels
    /// receive their full filter support
    pub high_quality_edges: bool,
    pub destination: Option<PathBuf>,
    /// Channel selection applied by non-raw develops
    pub pixel_format: PixelFormat,
    pub compression: TiffCompression,
    /// Rows guarded by one lock in the in-memory film
    pub band_height: usize,
    /// Tile edge length of the streaming film
    pub tile_size: usize,
}

impl Default for FilmConfig {
    fn default() -> Self {
        Self {
            kind: FilmKind::Hdr,
            width: 768,
            height: 576,
            crop: None,
            filter: FilterConfig::default(),
            high_quality_edges: false,
            destination: None,
            pixel_format: PixelFormat::Rgba,
            compression: TiffCompression::None,
            band_height: 16,
            tile_size: 64,
        }
    }
}

impl FilmConfig {
    pub fn builder() -> FilmConfigBuilder {
        FilmConfigBuilder::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FilmConfig =
            serde_json::from_str(json).map_err(|e| FilmError::ConfigParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            FilmError::ConfigParseError(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width, self.height)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(FilmError::ConfigurationError(format!(
                "film resolution must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_RESOLUTION || self.height > MAX_RESOLUTION {
            return Err(FilmError::ConfigurationError(format!(
                "film resolution {}x{} exceeds {MAX_RESOLUTION} pixels per side",
                self.width, self.height
            )));
        }
        if self.band_height == 0 {
            return Err(FilmError::ConfigurationError(
                "band_height must be at least 1".to_string(),
            ));
        }
        if self.tile_size == 0 {
            return Err(FilmError::ConfigurationError(
                "tile_size must be at least 1".to_string(),
            ));
        }
        // TIFF output carries 1, 3 or 4 float channels.
        if matches!(self.pixel_format, PixelFormat::YA | PixelFormat::MultiChannel) {
            return Err(FilmError::ConfigurationError(format!(
                "output pixel format must be y, rgb or rgba, got {:?}",
                self.pixel_format
            )));
        }
        if let Some(crop) = &self.crop {
            validate_crop_window(crop.offset(), crop.size(), self.size())?;
        }
        // Surface bad filter parameters before the film is built.
        let filter = self.filter.build()?;
        if self.high_quality_edges && filter.border_size() > MAX_RESOLUTION {
            return Err(FilmError::ConfigurationError(format!(
                "filter radius {} is too large for high-quality edges",
                filter.radius()
            )));
        }
        Ok(())
    }
}

/// Checks `0 <= offset`, `size > 0` and `offset + size <= film_size`.
pub(crate) fn validate_crop_window(offset: IVec2, size: IVec2, film_size: IVec2) -> Result<()> {
    let valid = offset.cmpge(IVec2::ZERO).all()
        && offset.cmplt(film_size).all()
        && size.cmpgt(IVec2::ZERO).all()
        && size.cmple(film_size - offset).all();
    if valid {
        Ok(())
    } else {
        Err(FilmError::InvalidCropWindow {
            offset,
            size,
            film_size,
        })
    }
}

/// Builder for FilmConfig
#[derive(Default)]
pub struct FilmConfigBuilder {
    kind: Option<FilmKind>,
    size: Option<(i32, i32)>,
    crop: Option<Option<CropConfig>>,
    filter: Option<FilterConfig>,
    high_quality_edges: Option<bool>,
    destination: Option<Option<PathBuf>>,
    pixel_format: Option<PixelFormat>,
    compression: Option<TiffCompression>,
    band_height: Option<usize>,
    tile_size: Option<usize>,
}

impl FilmConfigBuilder {
    pub fn kind(mut self, kind: FilmKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn size(mut self, width: i32, height: i32) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn crop(mut self, offset: IVec2, size: IVec2) -> Self {
        self.crop = Some(Some(CropConfig {
            offset_x: offset.x,
            offset_y: offset.y,
            width: size.x,
            height: size.y,
        }));
        self
    }

    pub fn filter(mut self, filter: FilterConfig) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn high_quality_edges(mut self, enable: bool) -> Self {
        self.high_quality_edges = Some(enable);
        self
    }

    pub fn destination<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.destination = Some(Some(path.into()));
        self
    }

    pub fn pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = Some(format);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn band_height(mut self, rows: usize) -> Self {
        self.band_height = Some(rows);
        self
    }

    pub fn tile_size(mut self, size: usize) -> Self {
        self.tile_size = Some(size);
        self
    }

    pub fn build(self) -> FilmConfig {
        let default = FilmConfig::default();
        let (width, height) = self.size.unwrap_or((default.width, default.height));
        FilmConfig {
            kind: self.kind.unwrap_or(default.kind),
            width,
            height,
            crop: self.crop.unwrap_or(default.crop),
            filter: self.filter.unwrap_or(default.filter),
            high_quality_edges: self.high_quality_edges.unwrap_or(default.high_quality_edges),
            destination: self.destination.unwrap_or(default.destination),
            pixel_format: self.pixel_format.unwrap_or(default.pixel_format),
            compression: self.compression.unwrap_or(default.compression),
            band_height: self.band_height.unwrap_or(default.band_height),
            tile_size: self.tile_size.unwrap_or(default.tile_size),
        }
    }
}
