use glam::IVec2;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilmError {
    #[error("Invalid crop window: offset={offset}, size={size} for film of size {film_size}")]
    InvalidCropWindow {
        offset: IVec2,
        size: IVec2,
        film_size: IVec2,
    },

    #[error("Invalid film configuration: {0}")]
    ConfigurationError(String),

    #[error("Unknown reconstruction filter: {0}")]
    UnknownFilter(String),

    #[error("Failed to parse film configuration: {0}")]
    ConfigParseError(String),

    #[error("Invalid develop region: {0}")]
    InvalidRegion(String),

    #[error("No destination file has been set")]
    DestinationUnset,

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FilmError>;
