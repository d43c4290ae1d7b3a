use std::fmt::Debug;

/// Separable reconstruction kernel with finite support.
///
/// Implementations are immutable and shared between the film and every
/// worker's image blocks.
pub trait ReconstructionFilter: Debug + Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Support radius in pixels. `eval` is zero for `|x| > radius()`.
    fn radius(&self) -> f32;

    /// Evaluates the 1D kernel at offset `x` from the sample position.
    fn eval(&self, x: f32) -> f32;

    /// Number of pixels a block must extend past its tile on each side
    /// when samples near the tile edge are splatted into neighbours.
    fn border_size(&self) -> i32 {
        self.radius().ceil() as i32
    }
}
