//! Reconstruction filter configuration types

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::film::common::error::{FilmError, Result};
use crate::film::filter::kernels::{BoxFilter, GaussianFilter, TentFilter};
use crate::film::filter::reconstruction::ReconstructionFilter;

/// Available reconstruction kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Box filter (sharp, aliased edges)
    Box,
    /// Tent filter (linear falloff)
    Tent,
    /// Truncated gaussian (default)
    Gaussian,
}

impl FromStr for FilterKind {
    type Err = FilmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "box" => Ok(Self::Box),
            "tent" => Ok(Self::Tent),
            "gaussian" => Ok(Self::Gaussian),
            other => Err(FilmError::UnknownFilter(other.to_string())),
        }
    }
}

/// Filter name plus parameters, as found in a film configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    #[serde(rename = "type")]
    pub kind: FilterKind,
    /// Support radius in pixels; each kernel picks its own default when absent
    pub radius: Option<f32>,
    /// Standard deviation, gaussian only
    pub stddev: Option<f32>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::Gaussian,
            radius: None,
            stddev: None,
        }
    }
}

impl FilterConfig {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn build(&self) -> Result<Arc<dyn ReconstructionFilter>> {
        if let Some(radius) = self.radius {
            if !(radius > 0.0 && radius.is_finite()) {
                return Err(FilmError::ConfigurationError(format!(
                    "filter radius must be positive, got {radius}"
                )));
            }
        }

        let filter: Arc<dyn ReconstructionFilter> = match self.kind {
            FilterKind::Box => Arc::new(BoxFilter::new(self.radius.unwrap_or(0.5))),
            FilterKind::Tent => Arc::new(TentFilter::new(self.radius.unwrap_or(1.0))),
            FilterKind::Gaussian => {
                let stddev = self.stddev.unwrap_or(0.5);
                if !(stddev > 0.0 && stddev.is_finite()) {
                    return Err(FilmError::ConfigurationError(format!(
                        "gaussian stddev must be positive, got {stddev}"
                    )));
                }
                Arc::new(GaussianFilter::new(stddev, self.radius.unwrap_or(4.0 * stddev)))
            }
        };
        Ok(filter)
    }
}
