//! Image block module
//!
//! Thread-private accumulation buffers that workers fill before handing
//! them to a film's `put`.

mod image_block;

#[cfg(test)]
mod tests;

pub use image_block::ImageBlock;
