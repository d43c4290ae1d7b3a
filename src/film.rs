//! Film module
//!
//! This module accumulates per-thread image blocks into a shared buffer and
//! develops the result into a normalized raster, with separate modules for
//! reconstruction filters, image blocks, bitmaps, TIFF output and the film
//! representations themselves.

pub mod common;
pub mod filter;
pub mod block;
pub mod bitmap;
pub mod tiff;
pub mod config;
mod base;
mod develop;
mod interface;
mod banded_storage;
mod tiled_storage;
mod hdr_film;
mod streaming_film;


pub use common::{
    Bounds2i,
    FilmError,
    Result,
};

pub use filter::{
    BoxFilter,
    FilterConfig,
    FilterKind,
    GaussianFilter,
    ReconstructionFilter,
    TentFilter,
};

pub use block::ImageBlock;

pub use bitmap::{Bitmap, PixelFormat};

pub use self::tiff::{
    BitmapWriter,
    StripLayout,
    TiffSink,
    StandardTiffWriter,
    TiffCompression,
};

pub use config::{
    CropConfig,
    FilmConfig,
    FilmConfigBuilder,
    FilmKind,
    MAX_RESOLUTION,
};

pub use base::{ChannelLayout, FilmBase, WEIGHT_CHANNEL};
pub use interface::{Film, create_film};
pub use hdr_film::HdrFilm;
pub use streaming_film::StreamingFilm;
