use crate::film::filter::reconstruction::ReconstructionFilter;

/// Constant weight over a square footprint.
#[derive(Debug, Clone, Copy)]
pub struct BoxFilter {
    radius: f32,
}

impl BoxFilter {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }
}

impl Default for BoxFilter {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl ReconstructionFilter for BoxFilter {
    fn name(&self) -> &'static str {
        "box"
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn eval(&self, x: f32) -> f32 {
        if x.abs() <= self.radius { 1.0 } else { 0.0 }
    }
}

/// Linear falloff from the center to the radius.
#[derive(Debug, Clone, Copy)]
pub struct TentFilter {
    radius: f32,
    inv_radius: f32,
}

impl TentFilter {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            inv_radius: 1.0 / radius,
        }
    }
}

impl Default for TentFilter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ReconstructionFilter for TentFilter {
    fn name(&self) -> &'static str {
        "tent"
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn eval(&self, x: f32) -> f32 {
        (1.0 - x.abs() * self.inv_radius).max(0.0)
    }
}

/// Gaussian truncated at `radius` and shifted so it reaches zero there.
#[derive(Debug, Clone, Copy)]
pub struct GaussianFilter {
    radius: f32,
    alpha: f32,
    bias: f32,
}

impl GaussianFilter {
    pub fn new(stddev: f32, radius: f32) -> Self {
        let alpha = -1.0 / (2.0 * stddev * stddev);
        Self {
            radius,
            alpha,
            bias: (alpha * radius * radius).exp(),
        }
    }
}

impl Default for GaussianFilter {
    fn default() -> Self {
        Self::new(0.5, 2.0)
    }
}

impl ReconstructionFilter for GaussianFilter {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn eval(&self, x: f32) -> f32 {
        ((self.alpha * x * x).exp() - self.bias).max(0.0)
    }
}
