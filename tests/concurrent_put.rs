use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use glam::IVec2;
use hdrfilm_rs::film::{Film, FilmConfig, FilmKind, FilterConfig, FilterKind, ImageBlock, create_film};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

const CHANNELS: [&str; 3] = ["R", "G", "W"];

fn film(kind: FilmKind, high_quality_edges: bool) -> Arc<dyn Film> {
    let config = FilmConfig::builder()
        .kind(kind)
        .size(61, 47)
        .filter(FilterConfig::new(FilterKind::Tent))
        .high_quality_edges(high_quality_edges)
        .band_height(5)
        .tile_size(8)
        .build();
    let film = create_film(&config).unwrap();
    film.prepare(&CHANNELS);
    film
}

/// Random blocks with small integer values so that float accumulation is
/// exact regardless of merge order. Blocks may hang over the sensor edge.
fn random_blocks(film: &dyn Film, count: usize, seed: u64) -> Vec<ImageBlock> {
    let mut rng = StdRng::seed_from_u64(seed);
    let size = film.size();
    (0..count)
        .map(|_| {
            let offset = IVec2::new(rng.gen_range(-6..size.x), rng.gen_range(-6..size.y));
            let extent = IVec2::new(rng.gen_range(1..16), rng.gen_range(1..16));
            let mut block = film.create_block(offset, extent);
            let footprint = block.footprint();
            for y in footprint.min.y..footprint.max.y {
                for x in footprint.min.x..footprint.max.x {
                    let r = rng.gen_range(0..8) as f32;
                    let g = rng.gen_range(0..8) as f32;
                    let w = rng.gen_range(1..4) as f32;
                    block.add_pixel(IVec2::new(x, y), &[r, g, w]);
                }
            }
            block
        })
        .collect()
}

#[test]
fn test_concurrent_puts_match_sequential_merge() {
    for kind in [FilmKind::Hdr, FilmKind::Streaming] {
        for high_quality_edges in [false, true] {
            let reference = film(kind, high_quality_edges);
            let shared = film(kind, high_quality_edges);
            let blocks = random_blocks(reference.as_ref(), 400, 0x5eed);

            for block in &blocks {
                reference.put(block);
            }
            blocks.par_iter().for_each(|block| shared.put(block));

            assert_eq!(
                reference.bitmap(true),
                shared.bitmap(true),
                "{kind:?}, high_quality_edges={high_quality_edges}"
            );
        }
    }
}

#[test]
fn test_concurrent_puts_from_scoped_threads() {
    let reference = film(FilmKind::Hdr, false);
    let shared = film(FilmKind::Hdr, false);
    let blocks = random_blocks(reference.as_ref(), 256, 42);
    for block in &blocks {
        reference.put(block);
    }

    thread::scope(|s| {
        for chunk in blocks.chunks(32) {
            let shared = &shared;
            s.spawn(move || {
                for block in chunk {
                    shared.put(block);
                }
            });
        }
    });

    assert_eq!(reference.bitmap(true), shared.bitmap(true));
}

/// Every block covers the whole sensor, contributing either `R = 0` or
/// `R = 1` with unit weight. After any whole number of puts the normalized
/// value is identical at every pixel, so a snapshot that observed half of a
/// put would show two different values.
#[test]
fn test_snapshots_never_observe_partial_puts() {
    for kind in [FilmKind::Hdr, FilmKind::Streaming] {
        let film = film(kind, false);
        let size = film.size();
        let make = |value: f32| {
            let mut block = ImageBlock::new(IVec2::ZERO, size, CHANNELS.len(), None);
            for y in 0..size.y {
                for x in 0..size.x {
                    block.add_pixel(IVec2::new(x, y), &[value, 0.0, 1.0]);
                }
            }
            block
        };
        let zero = make(0.0);
        let one = make(1.0);
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            let reader = s.spawn(|| {
                let mut snapshots = 0;
                while !done.load(Ordering::Acquire) || snapshots == 0 {
                    let bitmap = film.bitmap(true);
                    let first = bitmap.pixel(0, 0)[0];
                    assert!(
                        bitmap.data().chunks_exact(2).all(|px| px[0] == first),
                        "{kind:?} snapshot mixed two film states"
                    );
                    snapshots += 1;
                }
                snapshots
            });

            let workers: Vec<_> = (0..4)
                .map(|worker| {
                    let (film, zero, one) = (&film, &zero, &one);
                    s.spawn(move || {
                        for i in 0..50 {
                            film.put(if (i + worker) % 3 == 0 { one } else { zero });
                        }
                    })
                })
                .collect();
            for worker in workers {
                worker.join().unwrap();
            }
            done.store(true, Ordering::Release);
            assert!(reader.join().unwrap() > 0);
        });

        let bitmap = film.bitmap(true);
        let expected = bitmap.pixel(0, 0)[0];
        assert!(expected > 0.0 && expected < 1.0);
    }
}
