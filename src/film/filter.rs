//! Reconstruction filter module
//!
//! Filters decide how much each sample contributes to the pixels around it.
//! The film itself only needs the support radius, to size block borders.

mod reconstruction;
mod kernels;
pub mod types;

pub use reconstruction::ReconstructionFilter;
pub use kernels::{BoxFilter, GaussianFilter, TentFilter};
pub use types::{FilterConfig, FilterKind};
