//! Dense accumulation buffer split into independently locked row bands

use std::ops::Range;

use parking_lot::RwLock;

use crate::film::block::ImageBlock;
use crate::film::common::geometry::Bounds2i;

/// Row-major `f32` accumulation buffer over `bounds`.
///
/// Rows are grouped into bands of `band_height` rows, each behind its own
/// lock. Writers and readers always acquire the bands they need in ascending
/// order and hold them for the whole operation, so every merge is observed
/// entirely or not at all and lock acquisition cannot deadlock.
#[derive(Debug)]
pub(crate) struct BandedStorage {
    bounds: Bounds2i,
    channel_count: usize,
    band_height: usize,
    bands: Vec<RwLock<Vec<f32>>>,
}

impl BandedStorage {
    pub fn new(bounds: Bounds2i, channel_count: usize, band_height: usize) -> Self {
        let band_height = band_height.max(1);
        let row_len = bounds.width() * channel_count;
        let height = bounds.height();
        let bands = (0..height.div_ceil(band_height))
            .map(|b| {
                let rows = band_height.min(height - b * band_height);
                RwLock::new(vec![0.0; rows * row_len])
            })
            .collect();
        Self {
            bounds,
            channel_count,
            band_height,
            bands,
        }
    }

    pub fn bounds(&self) -> Bounds2i {
        self.bounds
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn band_range(&self, region: &Bounds2i) -> Range<usize> {
        let first = (region.min.y - self.bounds.min.y) as usize / self.band_height;
        let last = (region.max.y - 1 - self.bounds.min.y) as usize / self.band_height;
        first..last + 1
    }

    /// Position of film pixel `(x, y)` inside its band.
    fn locate(&self, x: i32, y: i32) -> (usize, usize) {
        let row = (y - self.bounds.min.y) as usize;
        let col = (x - self.bounds.min.x) as usize;
        let band = row / self.band_height;
        let local = (row % self.band_height) * self.bounds.width() + col;
        (band, local * self.channel_count)
    }

    /// Adds the block's footprint, clipped to the buffer, into the buffer.
    /// Returns the number of pixels merged.
    pub fn accumulate(&self, block: &ImageBlock) -> usize {
        let region = block.footprint().intersect(&self.bounds);
        if region.is_empty() {
            return 0;
        }

        let bands = self.band_range(&region);
        let first = bands.start;
        let mut guards: Vec<_> = bands.map(|b| self.bands[b].write()).collect();

        let span = region.width() * self.channel_count;
        for y in region.min.y..region.max.y {
            let (band, start) = self.locate(region.min.x, y);
            let dst = &mut guards[band - first][start..start + span];
            let src = block.row_span(y, region.min.x, region.max.x);
            for (d, s) in dst.iter_mut().zip(src) {
                *d += s;
            }
        }
        region.area()
    }

    /// Multiplies one channel of every pixel by `factor`.
    pub fn scale_channel(&self, channel: usize, factor: f32) {
        let mut guards: Vec<_> = self.bands.iter().map(|b| b.write()).collect();
        for band in guards.iter_mut() {
            for px in band.chunks_exact_mut(self.channel_count) {
                px[channel] *= factor;
            }
        }
    }

    /// Dense copy of `region`, which must lie inside the buffer.
    pub fn snapshot(&self, region: &Bounds2i) -> Vec<f32> {
        assert!(
            self.bounds.contains_bounds(region),
            "snapshot region {region:?} outside storage {:?}",
            self.bounds
        );
        let span = region.width() * self.channel_count;
        let mut out = Vec::with_capacity(region.height() * span);
        if region.is_empty() {
            return out;
        }

        let bands = self.band_range(region);
        let first = bands.start;
        let guards: Vec<_> = bands.map(|b| self.bands[b].read()).collect();
        for y in region.min.y..region.max.y {
            let (band, start) = self.locate(region.min.x, y);
            out.extend_from_slice(&guards[band - first][start..start + span]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;

    fn uniform_block(offset: IVec2, size: IVec2, value: f32) -> ImageBlock {
        let mut block = ImageBlock::new(offset, size, 2, None);
        for y in offset.y..offset.y + size.y {
            for x in offset.x..offset.x + size.x {
                block.add_pixel(IVec2::new(x, y), &[value, 1.0]);
            }
        }
        block
    }

    #[test]
    fn test_bands_cover_all_rows() {
        let storage = BandedStorage::new(
            Bounds2i::from_offset_size(IVec2::new(-2, -2), IVec2::new(20, 21)),
            3,
            4,
        );
        assert_eq!(storage.band_count(), 6);
        let all = storage.snapshot(&storage.bounds());
        assert_eq!(all.len(), 20 * 21 * 3);
    }

    #[test]
    fn test_accumulate_across_band_boundary() {
        let storage = BandedStorage::new(
            Bounds2i::from_offset_size(IVec2::ZERO, IVec2::new(8, 8)),
            2,
            3,
        );
        let merged = storage.accumulate(&uniform_block(IVec2::new(1, 2), IVec2::new(3, 4), 2.0));
        assert_eq!(merged, 12);

        let region = Bounds2i::from_offset_size(IVec2::new(1, 2), IVec2::new(3, 4));
        let snap = storage.snapshot(&region);
        assert!(snap.chunks_exact(2).all(|px| px == [2.0, 1.0]));

        let outside = storage.snapshot(&Bounds2i::from_offset_size(IVec2::ZERO, IVec2::new(8, 2)));
        assert!(outside.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_accumulate_clips_to_bounds() {
        let storage = BandedStorage::new(
            Bounds2i::from_offset_size(IVec2::ZERO, IVec2::new(4, 4)),
            2,
            2,
        );
        let merged = storage.accumulate(&uniform_block(IVec2::new(2, 2), IVec2::new(4, 4), 1.0));
        assert_eq!(merged, 4);
        assert_eq!(storage.accumulate(&uniform_block(IVec2::new(10, 10), IVec2::ONE, 1.0)), 0);
    }

    #[test]
    fn test_scale_channel_only_touches_that_channel() {
        let storage = BandedStorage::new(
            Bounds2i::from_offset_size(IVec2::ZERO, IVec2::new(2, 2)),
            2,
            1,
        );
        storage.accumulate(&uniform_block(IVec2::ZERO, IVec2::new(2, 2), 10.0));
        storage.scale_channel(1, 0.5);
        let snap = storage.snapshot(&storage.bounds());
        assert!(snap.chunks_exact(2).all(|px| px == [10.0, 0.5]));
    }
}
