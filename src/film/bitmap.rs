//! Float32 raster used as develop target and snapshot result

use glam::IVec2;
use serde::Deserialize;

/// Channel layout of a [`Bitmap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Single luminance channel
    Y,
    /// Luminance and alpha
    #[serde(rename = "ya")]
    YA,
    /// Red, green, blue
    Rgb,
    /// Red, green, blue, alpha
    Rgba,
    /// Arbitrary named channels, e.g. extra render outputs
    #[serde(skip_deserializing)]
    MultiChannel,
}

impl PixelFormat {
    /// Channel names for the fixed formats; empty for `MultiChannel`.
    pub fn channel_names(&self) -> &'static [&'static str] {
        match self {
            PixelFormat::Y => &["Y"],
            PixelFormat::YA => &["Y", "A"],
            PixelFormat::Rgb => &["R", "G", "B"],
            PixelFormat::Rgba => &["R", "G", "B", "A"],
            PixelFormat::MultiChannel => &[],
        }
    }

    /// Picks the fixed format matching `names` exactly, if any.
    pub fn from_channel_names<S: AsRef<str>>(names: &[S]) -> PixelFormat {
        [PixelFormat::Y, PixelFormat::YA, PixelFormat::Rgb, PixelFormat::Rgba]
            .into_iter()
            .find(|format| {
                let expected = format.channel_names();
                expected.len() == names.len()
                    && expected.iter().zip(names).all(|(e, n)| *e == n.as_ref())
            })
            .unwrap_or(PixelFormat::MultiChannel)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    pixel_format: PixelFormat,
    channel_names: Vec<String>,
    data: Vec<f32>,
}

impl Bitmap {
    /// Zero-filled bitmap in one of the fixed formats.
    pub fn new(pixel_format: PixelFormat, width: usize, height: usize) -> Self {
        assert!(
            pixel_format != PixelFormat::MultiChannel,
            "multi-channel bitmaps need explicit channel names"
        );
        Self::with_channels(pixel_format.channel_names(), width, height)
    }

    /// Zero-filled bitmap with the given channel names.
    pub fn with_channels<S: AsRef<str>>(channel_names: &[S], width: usize, height: usize) -> Self {
        assert!(!channel_names.is_empty(), "bitmap needs at least one channel");
        Self {
            width,
            height,
            pixel_format: PixelFormat::from_channel_names(channel_names),
            channel_names: channel_names.iter().map(|n| n.as_ref().to_string()).collect(),
            data: vec![0.0; width * height * channel_names.len()],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width as i32, self.height as i32)
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn channel_count(&self) -> usize {
        self.channel_names.len()
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> &[f32] {
        let c = self.channel_count();
        let i = (y * self.width + x) * c;
        &self.data[i..i + c]
    }

    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [f32] {
        let c = self.channel_count();
        let i = (y * self.width + x) * c;
        &mut self.data[i..i + c]
    }

    /// Mutable slice covering `width` pixels of row `y` starting at column `x`.
    pub fn row_mut(&mut self, x: usize, y: usize, width: usize) -> &mut [f32] {
        let c = self.channel_count();
        let i = (y * self.width + x) * c;
        &mut self.data[i..i + width * c]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_from_names() {
        assert_eq!(PixelFormat::from_channel_names(&["R", "G", "B"]), PixelFormat::Rgb);
        assert_eq!(PixelFormat::from_channel_names(&["R", "G", "B", "A"]), PixelFormat::Rgba);
        assert_eq!(PixelFormat::from_channel_names(&["Y"]), PixelFormat::Y);
        assert_eq!(
            PixelFormat::from_channel_names(&["R", "G", "B", "depth"]),
            PixelFormat::MultiChannel
        );
    }

    #[test]
    fn test_pixel_access() {
        let mut bitmap = Bitmap::new(PixelFormat::Rgb, 3, 2);
        bitmap.pixel_mut(2, 1).copy_from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(bitmap.pixel(2, 1), &[1.0, 2.0, 3.0]);
        assert_eq!(bitmap.data()[15..18], [1.0, 2.0, 3.0]);
        assert_eq!(bitmap.size(), IVec2::new(3, 2));
    }
}
