//! Sparse accumulation buffer made of lazily allocated square tiles

use parking_lot::{Mutex, MutexGuard};

use crate::film::block::ImageBlock;
use crate::film::common::geometry::Bounds2i;

type Tile = Option<Box<[f32]>>;

/// Accumulation buffer over `bounds` whose tiles are allocated on first
/// touch, each behind its own mutex.
///
/// Tiles are always locked in ascending row-major index order and held for
/// the whole merge or copy.
#[derive(Debug)]
pub(crate) struct TiledStorage {
    bounds: Bounds2i,
    channel_count: usize,
    tile_size: usize,
    tiles_x: usize,
    tiles_y: usize,
    tiles: Vec<Mutex<Tile>>,
}

/// Tiles covering a region, copied out of a [`TiledStorage`].
#[derive(Debug)]
pub(crate) struct TileSnapshot {
    bounds: Bounds2i,
    channel_count: usize,
    tile_size: usize,
    tx0: usize,
    ty0: usize,
    tx_count: usize,
    tiles: Vec<Tile>,
}

impl TiledStorage {
    pub fn new(bounds: Bounds2i, channel_count: usize, tile_size: usize) -> Self {
        let tile_size = tile_size.max(1);
        let tiles_x = bounds.width().div_ceil(tile_size);
        let tiles_y = bounds.height().div_ceil(tile_size);
        Self {
            bounds,
            channel_count,
            tile_size,
            tiles_x,
            tiles_y,
            tiles: (0..tiles_x * tiles_y).map(|_| Mutex::new(None)).collect(),
        }
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_x * self.tiles_y
    }

    pub fn allocated_tiles(&self) -> usize {
        self.tiles.iter().filter(|t| t.lock().is_some()).count()
    }

    fn tile_len(&self) -> usize {
        self.tile_size * self.tile_size * self.channel_count
    }

    /// Inclusive-exclusive tile index ranges covering `region`.
    fn tile_span(&self, region: &Bounds2i) -> (usize, usize, usize, usize) {
        let ts = self.tile_size;
        let x0 = (region.min.x - self.bounds.min.x) as usize / ts;
        let x1 = (region.max.x - 1 - self.bounds.min.x) as usize / ts + 1;
        let y0 = (region.min.y - self.bounds.min.y) as usize / ts;
        let y1 = (region.max.y - 1 - self.bounds.min.y) as usize / ts + 1;
        (x0, x1, y0, y1)
    }

    fn lock_span(&self, x0: usize, x1: usize, y0: usize, y1: usize) -> Vec<MutexGuard<'_, Tile>> {
        let mut guards = Vec::with_capacity((x1 - x0) * (y1 - y0));
        for ty in y0..y1 {
            for tx in x0..x1 {
                guards.push(self.tiles[ty * self.tiles_x + tx].lock());
            }
        }
        guards
    }

    /// Adds the block's footprint, clipped to the buffer, into the tiles it
    /// touches. Returns the number of pixels merged.
    pub fn accumulate(&self, block: &ImageBlock) -> usize {
        let region = block.footprint().intersect(&self.bounds);
        if region.is_empty() {
            return 0;
        }

        let (x0, x1, y0, y1) = self.tile_span(&region);
        let mut guards = self.lock_span(x0, x1, y0, y1);
        let tile_len = self.tile_len();
        let ts = self.tile_size as i32;
        let cc = self.channel_count;

        for y in region.min.y..region.max.y {
            let row = y - self.bounds.min.y;
            let ty = row as usize / self.tile_size;
            let local_y = (row % ts) as usize;
            for tx in x0..x1 {
                let tile_min_x = self.bounds.min.x + tx as i32 * ts;
                let sx0 = region.min.x.max(tile_min_x);
                let sx1 = region.max.x.min(tile_min_x + ts);
                if sx0 >= sx1 {
                    continue;
                }
                let guard = &mut guards[(ty - y0) * (x1 - x0) + (tx - x0)];
                let tile = guard.get_or_insert_with(|| vec![0.0; tile_len].into_boxed_slice());
                let start = (local_y * self.tile_size + (sx0 - tile_min_x) as usize) * cc;
                let dst = &mut tile[start..start + (sx1 - sx0) as usize * cc];
                for (d, s) in dst.iter_mut().zip(block.row_span(y, sx0, sx1)) {
                    *d += s;
                }
            }
        }
        region.area()
    }

    /// Multiplies one channel of every allocated pixel by `factor`.
    pub fn scale_channel(&self, channel: usize, factor: f32) {
        let mut guards = self.lock_span(0, self.tiles_x, 0, self.tiles_y);
        for tile in guards.iter_mut().filter_map(|g| g.as_mut()) {
            for px in tile.chunks_exact_mut(self.channel_count) {
                px[channel] *= factor;
            }
        }
    }

    /// Copies the allocated tiles overlapping `region`.
    pub fn snapshot(&self, region: &Bounds2i) -> TileSnapshot {
        assert!(
            self.bounds.contains_bounds(region),
            "snapshot region {region:?} outside storage {:?}",
            self.bounds
        );
        let (x0, x1, y0, y1) = if region.is_empty() {
            (0, 0, 0, 0)
        } else {
            self.tile_span(region)
        };
        let tiles = self
            .lock_span(x0, x1, y0, y1)
            .iter()
            .map(|g| (**g).clone())
            .collect();
        TileSnapshot {
            bounds: self.bounds,
            channel_count: self.channel_count,
            tile_size: self.tile_size,
            tx0: x0,
            ty0: y0,
            tx_count: x1 - x0,
            tiles,
        }
    }
}

impl TileSnapshot {
    /// Writes film row `y`, columns `[x0, x1)`, into `out`. Unallocated
    /// tiles read as zero.
    pub fn copy_row(&self, y: i32, x0: i32, x1: i32, out: &mut [f32]) {
        let cc = self.channel_count;
        let ts = self.tile_size as i32;
        let row = y - self.bounds.min.y;
        let ty = row as usize / self.tile_size;
        let local_y = (row % ts) as usize;

        let mut x = x0;
        while x < x1 {
            let col = x - self.bounds.min.x;
            let tx = col as usize / self.tile_size;
            let tile_min_x = self.bounds.min.x + tx as i32 * ts;
            let end = x1.min(tile_min_x + ts);
            let n = (end - x) as usize * cc;
            let dst = &mut out[(x - x0) as usize * cc..][..n];

            let tile = &self.tiles[(ty - self.ty0) * self.tx_count + (tx - self.tx0)];
            match tile {
                Some(data) => {
                    let start = (local_y * self.tile_size + (x - tile_min_x) as usize) * cc;
                    dst.copy_from_slice(&data[start..start + n]);
                }
                None => dst.fill(0.0),
            }
            x = end;
        }
    }

    pub fn allocated_tiles(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_some()).count()
    }
}
