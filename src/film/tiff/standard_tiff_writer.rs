use std::io::{Seek, Write};

use tiff::encoder::colortype::{ColorType, Gray32Float, RGB32Float, RGBA32Float};
use tiff::encoder::TiffEncoder;
use tracing::debug;

use crate::film::bitmap::Bitmap;
use crate::film::common::error::{FilmError, Result};
use crate::film::tiff::types::TiffCompression;
use crate::film::tiff::writer::{BitmapWriter, StripLayout, TiffSink};

pub struct StandardTiffWriter;

fn encode_err(e: tiff::TiffError) -> FilmError {
    FilmError::EncodeError(e.to_string())
}

fn unsupported(channel_count: usize) -> FilmError {
    FilmError::UnsupportedFormat(format!(
        "{channel_count} channels (TIFF output supports 1, 3 or 4)"
    ))
}

fn encode_strips<C, W>(
    encoder: &mut TiffEncoder<W>,
    layout: StripLayout,
    fill: &mut dyn FnMut(usize, &mut [f32]),
) -> Result<()>
where
    C: ColorType<Inner = f32>,
    W: Write + Seek,
{
    let mut image = encoder
        .new_image::<C>(layout.width as u32, layout.height as u32)
        .map_err(encode_err)?;
    image
        .rows_per_strip(layout.rows_per_strip.max(1) as u32)
        .map_err(encode_err)?;

    let row_len = layout.width * layout.channel_count;
    let mut strip = Vec::new();
    let mut y = 0;
    loop {
        let samples = image.next_strip_sample_count() as usize;
        if samples == 0 {
            break;
        }
        strip.clear();
        strip.resize(samples, 0.0f32);
        fill(y, &mut strip);
        image.write_strip(&strip).map_err(encode_err)?;
        y += samples / row_len.max(1);
    }
    image.finish().map_err(encode_err)
}

impl BitmapWriter for StandardTiffWriter {
    fn write_bitmap(
        &self,
        bitmap: &Bitmap,
        output: &mut dyn TiffSink,
        compression: TiffCompression,
    ) -> Result<()> {
        debug!("Encoding TIFF image: {}x{}", bitmap.width(), bitmap.height());

        let channel_count = bitmap.channel_count();
        let row_len = bitmap.width() * channel_count;
        let layout = StripLayout {
            width: bitmap.width(),
            height: bitmap.height(),
            channel_count,
            rows_per_strip: bitmap.height().max(1),
        };
        let data = bitmap.data();
        let mut fill = |y: usize, strip: &mut [f32]| {
            let start = y * row_len;
            strip.copy_from_slice(&data[start..start + strip.len()]);
        };
        self.write_strips(layout, &mut fill, output, compression)
    }

    fn write_strips(
        &self,
        layout: StripLayout,
        fill: &mut dyn FnMut(usize, &mut [f32]),
        output: &mut dyn TiffSink,
        compression: TiffCompression,
    ) -> Result<()> {
        debug!(
            width = layout.width,
            height = layout.height,
            channels = layout.channel_count,
            rows_per_strip = layout.rows_per_strip,
            "Encoding TIFF strips"
        );

        // The encoder writes its header immediately, so reject unencodable
        // layouts before touching the sink.
        if !matches!(layout.channel_count, 1 | 3 | 4) {
            return Err(unsupported(layout.channel_count));
        }

        let mut encoder = TiffEncoder::new(output)
            .map_err(encode_err)?
            .with_compression(compression.to_encoder());

        match layout.channel_count {
            1 => encode_strips::<Gray32Float, _>(&mut encoder, layout, fill)?,
            3 => encode_strips::<RGB32Float, _>(&mut encoder, layout, fill)?,
            4 => encode_strips::<RGBA32Float, _>(&mut encoder, layout, fill)?,
            n => return Err(unsupported(n)),
        }

        debug!("TIFF encoding complete");
        Ok(())
    }
}
