use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{IVec2, Vec2};
use hdrfilm_rs::film::{
    Bitmap, BitmapWriter, Film, FilmConfig, FilmKind, ImageBlock, PixelFormat, StandardTiffWriter,
    TiffCompression, create_film,
};
use rayon::prelude::*;
use std::io::Cursor;
use std::sync::Arc;

const CHANNELS: [&str; 5] = ["R", "G", "B", "A", "W"];

fn prepared_film(kind: FilmKind, size: i32) -> Arc<dyn Film> {
    let config = FilmConfig::builder().kind(kind).size(size, size).build();
    let film = create_film(&config).unwrap();
    film.prepare(&CHANNELS);
    film
}

fn splatted_block(film: &dyn Film, offset: IVec2, size: IVec2) -> ImageBlock {
    let mut block = film.create_block(offset, size);
    for y in 0..size.y {
        for x in 0..size.x {
            let pos = (offset + IVec2::new(x, y)).as_vec2() + Vec2::splat(0.37);
            block.put_sample(pos, &[0.5, 0.25, 0.125, 1.0, 1.0]);
        }
    }
    block
}

fn benchmark_put_by_block_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_by_block_size");

    for kind in [FilmKind::Hdr, FilmKind::Streaming] {
        for block_size in [16, 32, 64] {
            let film = prepared_film(kind, 512);
            let block = splatted_block(film.as_ref(), IVec2::splat(100), IVec2::splat(block_size));

            group.bench_with_input(
                BenchmarkId::new(format!("{kind:?}"), block_size),
                &block,
                |b, block| b.iter(|| film.put(black_box(block))),
            );
        }
    }

    group.finish();
}

fn benchmark_parallel_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_put");
    group.sample_size(20);

    for kind in [FilmKind::Hdr, FilmKind::Streaming] {
        let film = prepared_film(kind, 512);
        let blocks: Vec<ImageBlock> = (0..16)
            .flat_map(|ty| (0..16).map(move |tx| IVec2::new(tx, ty) * 32))
            .map(|offset| splatted_block(film.as_ref(), offset, IVec2::splat(32)))
            .collect();

        group.bench_function(format!("{kind:?}"), |b| {
            b.iter(|| blocks.par_iter().for_each(|block| film.put(black_box(block))))
        });
    }

    group.finish();
}

fn benchmark_develop(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitmap");
    group.sample_size(20);

    for kind in [FilmKind::Hdr, FilmKind::Streaming] {
        let film = prepared_film(kind, 512);
        film.put(&splatted_block(film.as_ref(), IVec2::ZERO, IVec2::splat(512)));

        group.bench_function(format!("{kind:?}"), |b| b.iter(|| black_box(film.bitmap(false))));
    }

    group.finish();
}

fn benchmark_compression_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_methods");
    let mut bitmap = Bitmap::new(PixelFormat::Rgba, 512, 512);
    for (i, v) in bitmap.data_mut().iter_mut().enumerate() {
        *v = (i % 97) as f32 / 97.0;
    }

    let compressions = vec![
        (TiffCompression::None, "none"),
        (TiffCompression::Lzw, "lzw"),
        (TiffCompression::DeflateFast, "deflate_fast"),
        (TiffCompression::DeflateBest, "deflate_best"),
    ];

    for (compression, label) in compressions {
        group.bench_with_input(BenchmarkId::from_parameter(label), &compression, |b, &compression| {
            let writer = StandardTiffWriter;
            b.iter(|| {
                let mut output = Cursor::new(Vec::new());
                writer
                    .write_bitmap(black_box(&bitmap), &mut output, compression)
                    .unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_put_by_block_size,
    benchmark_parallel_put,
    benchmark_develop,
    benchmark_compression_methods
);
criterion_main!(benches);
