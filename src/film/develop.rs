//! Normalization of accumulated pixels and output channel selection

use rayon::prelude::*;

use crate::film::base::ChannelLayout;
use crate::film::bitmap::PixelFormat;

/// Rec. 709 luminance weights.
const LUMINANCE: [f32; 3] = [0.212_671, 0.715_160, 0.072_169];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Source {
    Channel(usize),
    Luminance([usize; 3]),
    One,
    Zero,
}

/// Maps a normalized accumulated pixel onto output channels.
#[derive(Debug, Clone)]
pub(crate) struct OutputMapping {
    names: Vec<String>,
    sources: Vec<Source>,
    value_count: usize,
}

impl OutputMapping {
    /// Every value channel, in `prepare` order.
    pub fn raw(layout: &ChannelLayout) -> Self {
        Self {
            names: layout.value_names().to_vec(),
            sources: (0..layout.value_count()).map(Source::Channel).collect(),
            value_count: layout.value_count(),
        }
    }

    /// Channels of `format`, looked up by name. Missing alpha develops to 1,
    /// missing luminance is derived from RGB, anything else missing is 0.
    pub fn for_format(layout: &ChannelLayout, format: PixelFormat) -> Self {
        let rgb = match (layout.index_of("R"), layout.index_of("G"), layout.index_of("B")) {
            (Some(r), Some(g), Some(b)) => Some([r, g, b]),
            _ => None,
        };
        let luminance = layout.index_of("Y");

        let sources = format
            .channel_names()
            .iter()
            .map(|&name| match (name, layout.index_of(name)) {
                (_, Some(i)) => Source::Channel(i),
                ("Y", None) => rgb.map_or(Source::Zero, Source::Luminance),
                ("A", None) => Source::One,
                ("R" | "G" | "B", None) => luminance.map_or(Source::Zero, Source::Channel),
                _ => Source::Zero,
            })
            .collect();

        Self {
            names: format.channel_names().iter().map(|n| n.to_string()).collect(),
            sources,
            value_count: layout.value_count(),
        }
    }

    /// Mapping that fills a bitmap with the given channel names, if the
    /// names are either the raw value channels or a fixed pixel format.
    pub fn for_target(layout: &ChannelLayout, names: &[String]) -> Option<Self> {
        if names == layout.value_names() {
            return Some(Self::raw(layout));
        }
        match PixelFormat::from_channel_names(names) {
            PixelFormat::MultiChannel => None,
            format => Some(Self::for_format(layout, format)),
        }
    }

    pub fn channel_names(&self) -> &[String] {
        &self.names
    }

    pub fn channel_count(&self) -> usize {
        self.sources.len()
    }

    fn develop_pixel(&self, src: &[f32], normalized: &mut [f32], dst: &mut [f32]) {
        let weight = src[self.value_count];
        for (n, s) in normalized.iter_mut().zip(&src[..self.value_count]) {
            let v = if weight != 0.0 { s / weight } else { 0.0 };
            *n = if v.is_finite() { v } else { 0.0 };
        }
        for (d, source) in dst.iter_mut().zip(&self.sources) {
            *d = match *source {
                Source::Channel(i) => normalized[i],
                Source::Luminance([r, g, b]) => {
                    LUMINANCE[0] * normalized[r] + LUMINANCE[1] * normalized[g] + LUMINANCE[2] * normalized[b]
                }
                Source::One => 1.0,
                Source::Zero => 0.0,
            };
        }
    }

    /// Develops one row of accumulated pixels (`value_count + 1` floats each)
    /// into `dst`.
    pub fn develop_row(&self, src: &[f32], dst: &mut [f32]) {
        let mut normalized = vec![0.0f32; self.value_count];
        for (s, d) in src
            .chunks_exact(self.value_count + 1)
            .zip(dst.chunks_exact_mut(self.channel_count()))
        {
            self.develop_pixel(s, &mut normalized, d);
        }
    }

    /// Row-parallel `develop_row` over a dense `width`-pixel wide region.
    pub fn develop_rows(&self, src: &[f32], dst: &mut [f32], width: usize) {
        if width == 0 {
            return;
        }
        let src_row = width * (self.value_count + 1);
        let dst_row = width * self.channel_count();
        dst.par_chunks_mut(dst_row)
            .zip(src.par_chunks(src_row))
            .for_each(|(d, s)| self.develop_row(s, d));
    }
}
