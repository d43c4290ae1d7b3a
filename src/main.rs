use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, bail};
use clap::Parser;
use glam::{IVec2, Vec2, Vec3};
use rayon::prelude::*;
use tracing::{info, warn};

use hdrfilm_rs::film::{Film, FilmConfig, FilterConfig, FilterKind, create_film};
use hdrfilm_rs::logger;

const CHANNELS: [&str; 5] = ["R", "G", "B", "A", "W"];

/// Renders a procedural test scene through the film and writes it as a
/// 32-bit float TIFF.
#[derive(Parser, Debug)]
#[command(name = "hdrfilm", version)]
struct Cli {
    /// Film configuration JSON. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output path; `.tiff` is appended when missing.
    #[arg(long)]
    out: PathBuf,

    /// Override the film width.
    #[arg(long)]
    width: Option<i32>,

    /// Override the film height.
    #[arg(long)]
    height: Option<i32>,

    /// Override the reconstruction filter (box, tent or gaussian) with its
    /// default parameters.
    #[arg(long)]
    filter: Option<FilterKind>,

    /// Edge length of the blocks handed to worker threads.
    #[arg(long, default_value_t = 32)]
    tile: i32,

    /// Samples per pixel, rounded down to a square stratum count.
    #[arg(long, default_value_t = 16)]
    spp: u32,

    /// Overwrite the output if it already exists.
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Log mean luminance from an in-memory preview halfway through.
    #[arg(long, default_value_t = false)]
    preview: bool,
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FilmConfig::from_path(path)
            .with_context(|| format!("load film config '{}'", path.display()))?,
        None => FilmConfig::default(),
    };
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if let Some(kind) = cli.filter {
        config.filter = FilterConfig::new(kind);
    }
    if cli.tile <= 0 {
        bail!("--tile must be positive, got {}", cli.tile);
    }

    let film = create_film(&config).context("create film")?;
    info!(%film, "Created film");
    if film.destination_exists(&cli.out) && !cli.overwrite {
        bail!(
            "'{}' already exists (pass --overwrite to replace it)",
            cli.out.display()
        );
    }
    film.set_destination_file(&cli.out)
        .with_context(|| format!("set destination '{}'", cli.out.display()))?;
    film.prepare(&CHANNELS);

    let started = Instant::now();
    let tiles = tile_offsets(film.crop_offset(), film.crop_size(), cli.tile);
    let strata = (cli.spp as f32).sqrt().floor().max(1.0) as u32;
    info!(tiles = tiles.len(), spp = strata * strata, "Rendering");

    // With --preview, half of the tiles are merged before an in-memory
    // develop while the film is still accumulating.
    let (first, rest) = if cli.preview {
        tiles.split_at(tiles.len() / 2)
    } else {
        tiles.split_at(tiles.len())
    };
    let mut rejected = render_tiles(&film, first, strata);
    if cli.preview {
        log_preview(film.as_ref());
    }
    rejected += render_tiles(&film, rest, strata);
    if rejected > 0 {
        warn!(rejected, "Discarded non-finite samples");
    }
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Rendered all tiles");

    film.develop().context("develop film")?;
    if let Some(path) = film.destination() {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn render_tiles(film: &Arc<dyn Film>, tiles: &[(IVec2, IVec2)], strata: u32) -> usize {
    tiles
        .par_iter()
        .map(|&(offset, size)| render_tile(film, offset, size, strata))
        .sum()
}

fn log_preview(film: &dyn Film) {
    let preview = film.bitmap(false);
    let pixels = (preview.width() * preview.height()).max(1) as f32;
    let mean: f32 = preview
        .data()
        .chunks_exact(preview.channel_count())
        .map(|px| match px {
            [r, g, b, ..] => 0.2126 * r + 0.7152 * g + 0.0722 * b,
            [y, ..] => *y,
            [] => 0.0,
        })
        .sum::<f32>()
        / pixels;
    info!(mean_luminance = mean, "Preview");
}

/// Splits the crop window into blocks of at most `tile` pixels per side.
fn tile_offsets(origin: IVec2, size: IVec2, tile: i32) -> Vec<(IVec2, IVec2)> {
    let mut tiles = Vec::new();
    for y in (0..size.y).step_by(tile as usize) {
        for x in (0..size.x).step_by(tile as usize) {
            let offset = IVec2::new(x, y);
            let extent = (size - offset).min(IVec2::splat(tile));
            tiles.push((origin + offset, extent));
        }
    }
    tiles
}

/// Stratified samples over the block footprint, merged with a single put.
/// Returns the number of samples the block rejected.
fn render_tile(film: &Arc<dyn Film>, offset: IVec2, size: IVec2, strata: u32) -> usize {
    let mut block = film.create_block(offset, size);
    let footprint = block.footprint();
    let resolution = film.size().as_vec2();
    let step = 1.0 / strata as f32;
    let mut rejected = 0;

    for y in footprint.min.y..footprint.max.y {
        for x in footprint.min.x..footprint.max.x {
            for sy in 0..strata {
                for sx in 0..strata {
                    let jitter = Vec2::new(
                        (sx as f32 + 0.5) * step,
                        (sy as f32 + 0.5) * step,
                    );
                    let pos = IVec2::new(x, y).as_vec2() + jitter;
                    let (rgb, alpha) = scene(pos / resolution);
                    if !block.put_sample(pos, &[rgb.x, rgb.y, rgb.z, alpha, 1.0]) {
                        rejected += 1;
                    }
                }
            }
        }
    }

    film.put(&block);
    rejected
}

/// Sky gradient behind a bright disc, in normalized film coordinates.
fn scene(uv: Vec2) -> (Vec3, f32) {
    let sky = Vec3::new(0.2, 0.35, 0.8).lerp(Vec3::new(0.9, 0.6, 0.4), uv.y.clamp(0.0, 1.0));
    let d = uv.distance(Vec2::new(0.5, 0.55));
    if d < 0.25 {
        // HDR highlight in the disc center.
        let glow = 1.0 + 8.0 * (1.0 - d / 0.25).powi(4);
        (Vec3::new(1.0, 0.9, 0.7) * glow, 1.0)
    } else if uv.y > 0.85 {
        (Vec3::splat(0.05), 0.0)
    } else {
        (sky, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiles_cover_crop_window() {
        let tiles = tile_offsets(IVec2::new(3, 5), IVec2::new(70, 33), 32);
        assert_eq!(tiles.len(), 3 * 2);
        let area: i32 = tiles.iter().map(|(_, s)| s.x * s.y).sum();
        assert_eq!(area, 70 * 33);
        assert_eq!(tiles[0], (IVec2::new(3, 5), IVec2::new(32, 32)));
        assert_eq!(tiles[5], (IVec2::new(67, 37), IVec2::new(6, 1)));
    }

    #[test]
    fn test_filter_flag_is_parsed() {
        let cli = Cli::try_parse_from(["hdrfilm", "--out", "render", "--filter", "Tent"]).unwrap();
        assert_eq!(cli.filter, Some(FilterKind::Tent));

        let cli = Cli::try_parse_from(["hdrfilm", "--out", "render"]).unwrap();
        assert_eq!(cli.filter, None);

        assert!(Cli::try_parse_from(["hdrfilm", "--out", "render", "--filter", "lanczos"]).is_err());
    }

    #[test]
    fn test_scene_is_finite() {
        for y in 0..=10 {
            for x in 0..=10 {
                let (rgb, alpha) = scene(Vec2::new(x as f32, y as f32) / 10.0);
                assert!(rgb.is_finite() && alpha.is_finite());
            }
        }
    }
}
