//! Common utilities module
//!
//! This module contains the error type and the integer rectangle shared across
//! the film implementation.

pub mod error;
pub mod geometry;

pub use error::{FilmError, Result};
pub use geometry::Bounds2i;
