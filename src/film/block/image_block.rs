use std::sync::Arc;

use glam::{IVec2, Vec2};
use tracing::trace;

use crate::film::common::geometry::Bounds2i;
use crate::film::filter::ReconstructionFilter;

/// Un-normalized accumulation buffer for one render tile plus its border.
///
/// Every pixel stores `channel_count` floats; the last one is the filter
/// weight. Pixel coordinates are film coordinates, so a block can be merged
/// into a film without any translation by the caller.
#[derive(Debug, Clone)]
pub struct ImageBlock {
    offset: IVec2,
    size: IVec2,
    border: i32,
    channel_count: usize,
    filter: Option<Arc<dyn ReconstructionFilter>>,
    data: Vec<f32>,
}

impl ImageBlock {
    /// Creates a block whose border matches the filter's support.
    pub fn new(
        offset: IVec2,
        size: IVec2,
        channel_count: usize,
        filter: Option<Arc<dyn ReconstructionFilter>>,
    ) -> Self {
        let border = filter.as_ref().map_or(0, |f| f.border_size());
        Self::with_border(offset, size, channel_count, filter, border)
    }

    pub fn with_border(
        offset: IVec2,
        size: IVec2,
        channel_count: usize,
        filter: Option<Arc<dyn ReconstructionFilter>>,
        border: i32,
    ) -> Self {
        assert!(size.x >= 0 && size.y >= 0, "image block size must be non-negative");
        assert!(border >= 0, "image block border must be non-negative");
        assert!(channel_count >= 1, "image block needs at least the weight channel");

        let extent = size + IVec2::splat(2 * border);
        let len = (extent.x as usize) * (extent.y as usize) * channel_count;
        Self {
            offset,
            size,
            border,
            channel_count,
            filter,
            data: vec![0.0; len],
        }
    }

    pub fn offset(&self) -> IVec2 {
        self.offset
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    pub fn border(&self) -> i32 {
        self.border
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Pixels this block can hold: the tile grown by the border on each side.
    pub fn footprint(&self) -> Bounds2i {
        Bounds2i::from_offset_size(self.offset, self.size).expand(self.border)
    }

    /// Moves the block to a new tile. Contents are kept; call `clear` first
    /// when recycling.
    pub fn set_offset(&mut self, offset: IVec2) {
        self.offset = offset;
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Raw storage, row-major over the footprint.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Row of the footprint at film row `y`, restricted to columns
    /// `[x0, x1)`.
    pub(crate) fn row_span(&self, y: i32, x0: i32, x1: i32) -> &[f32] {
        let fp = self.footprint();
        let width = fp.width();
        let start = ((y - fp.min.y) as usize * width + (x0 - fp.min.x) as usize) * self.channel_count;
        let end = start + (x1 - x0) as usize * self.channel_count;
        &self.data[start..end]
    }

    fn index(&self, p: IVec2) -> usize {
        let fp = self.footprint();
        ((p.y - fp.min.y) as usize * fp.width() + (p.x - fp.min.x) as usize) * self.channel_count
    }

    pub fn pixel(&self, p: IVec2) -> Option<&[f32]> {
        if !self.footprint().contains(p) {
            return None;
        }
        let i = self.index(p);
        Some(&self.data[i..i + self.channel_count])
    }

    /// Adds an already weighted contribution to a single pixel.
    pub fn add_pixel(&mut self, p: IVec2, values: &[f32]) {
        assert_eq!(values.len(), self.channel_count, "channel count mismatch");
        assert!(
            self.footprint().contains(p),
            "pixel {p} outside block footprint {:?}",
            self.footprint()
        );
        let i = self.index(p);
        for (dst, v) in self.data[i..i + self.channel_count].iter_mut().zip(values) {
            *dst += v;
        }
    }

    /// Splats a sample at continuous film position `pos`.
    ///
    /// Every channel, the trailing weight included, is scaled by the filter
    /// weight of each pixel inside the filter support. Without a filter the
    /// sample lands in the pixel containing `pos`. Returns `false` and leaves
    /// the block untouched when the sample holds a NaN or infinite value.
    pub fn put_sample(&mut self, pos: Vec2, values: &[f32]) -> bool {
        assert_eq!(values.len(), self.channel_count, "channel count mismatch");

        if values.iter().any(|v| !v.is_finite()) {
            trace!(x = pos.x, y = pos.y, "Discarding non-finite sample");
            return false;
        }

        let fp = self.footprint();
        let Some(filter) = self.filter.clone() else {
            let p = pos.floor().as_ivec2();
            if fp.contains(p) {
                self.add_pixel(p, values);
            }
            return true;
        };

        // Pixel centers sit at half-integer coordinates.
        let center = pos - Vec2::splat(0.5);
        let radius = filter.radius();
        let lo = (center - Vec2::splat(radius)).ceil().as_ivec2().max(fp.min);
        let hi = ((center + Vec2::splat(radius)).floor().as_ivec2() + IVec2::ONE).min(fp.max);

        let weights_x: Vec<f32> = (lo.x..hi.x)
            .map(|x| filter.eval(x as f32 - center.x))
            .collect();

        let mut scratch = vec![0.0f32; self.channel_count];
        for y in lo.y..hi.y {
            let wy = filter.eval(y as f32 - center.y);
            if wy == 0.0 {
                continue;
            }
            for (x, wx) in (lo.x..hi.x).zip(&weights_x) {
                let w = wx * wy;
                if w == 0.0 {
                    continue;
                }
                for (s, v) in scratch.iter_mut().zip(values) {
                    *s = v * w;
                }
                self.add_pixel(IVec2::new(x, y), &scratch);
            }
        }
        true
    }
}
