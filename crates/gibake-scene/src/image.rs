//! CPU-side images used for material textures and baked lightmaps.

use gibake_core::{Error, Result};
use glam::{UVec2, Vec2, Vec4};
use half::f16;
use serde::{Deserialize, Serialize};

/// Pixel storage layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    R8,
    Rgb8,
    Srgb8,
    Rgba8,
    Srgb8Alpha8,
    R16F,
    Rgb16F,
    Rgba16F,
    R32F,
    Rgb32F,
    Rgba32F,
}

impl PixelFormat {
    /// Number of color channels.
    pub const fn channels(self) -> usize {
        match self {
            Self::R8 | Self::R16F | Self::R32F => 1,
            Self::Rgb8 | Self::Srgb8 | Self::Rgb16F | Self::Rgb32F => 3,
            Self::Rgba8 | Self::Srgb8Alpha8 | Self::Rgba16F | Self::Rgba32F => 4,
        }
    }

    /// Bytes per channel.
    pub const fn channel_size(self) -> usize {
        match self {
            Self::R8 | Self::Rgb8 | Self::Srgb8 | Self::Rgba8 | Self::Srgb8Alpha8 => 1,
            Self::R16F | Self::Rgb16F | Self::Rgba16F => 2,
            Self::R32F | Self::Rgb32F | Self::Rgba32F => 4,
        }
    }

    /// Bytes per pixel.
    pub const fn pixel_size(self) -> usize {
        self.channels() * self.channel_size()
    }

    /// Whether channels hold floating point values rather than normalized bytes.
    pub const fn is_float(self) -> bool {
        self.channel_size() > 1
    }
}

/// Texture coordinate wrapping along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
}

impl WrapMode {
    #[inline]
    fn apply(self, t: f32) -> f32 {
        match self {
            Self::Repeat => t - t.floor(),
            Self::ClampToEdge => t.clamp(0.0, 1.0),
        }
    }
}

/// A 2D pixel buffer with an explicit pixel format.
///
/// Pixels are stored row-major. [`texel`](Self::texel) addresses rows as
/// stored, while [`sample`](Self::sample) treats `v = 0` as the bottom row.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
    wrap_s: WrapMode,
    wrap_t: WrapMode,
}

impl Image {
    /// Create a zero-filled image.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.pixel_size();
        Self {
            width,
            height,
            format,
            data: vec![0; len],
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
        }
    }

    /// Wrap existing pixel bytes, checking the length against the format.
    pub fn from_raw(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * format.pixel_size();
        if data.len() != expected {
            return Err(Error::InvalidData(format!(
                "{width}x{height} {format:?} image needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
        })
    }

    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub const fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    #[inline]
    pub const fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[must_use]
    pub fn with_wrap_mode(mut self, wrap_s: WrapMode, wrap_t: WrapMode) -> Self {
        self.wrap_s = wrap_s;
        self.wrap_t = wrap_t;
        self
    }

    pub fn set_wrap_mode(&mut self, wrap_s: WrapMode, wrap_t: WrapMode) {
        self.wrap_s = wrap_s;
        self.wrap_t = wrap_t;
    }

    pub const fn wrap_mode(&self) -> (WrapMode, WrapMode) {
        (self.wrap_s, self.wrap_t)
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (x as usize + y as usize * self.width as usize) * self.format.pixel_size()
    }

    /// Read a stored pixel. Missing color channels read as 0, missing alpha as 1.
    ///
    /// Byte formats are normalized to `[0, 1]` without any color space decoding.
    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        let mut out = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let base = self.offset(x, y);
        let size = self.format.channel_size();
        for c in 0..self.format.channels() {
            let at = base + c * size;
            out[c] = match size {
                1 => f32::from(self.data[at]) / 255.0,
                2 => f16::from_le_bytes([self.data[at], self.data[at + 1]]).to_f32(),
                _ => f32::from_le_bytes([
                    self.data[at],
                    self.data[at + 1],
                    self.data[at + 2],
                    self.data[at + 3],
                ]),
            };
        }
        out
    }

    /// Write a stored pixel, dropping channels the format does not have.
    pub fn set_texel(&mut self, x: u32, y: u32, value: Vec4) {
        let base = self.offset(x, y);
        let size = self.format.channel_size();
        for c in 0..self.format.channels() {
            let at = base + c * size;
            match size {
                1 => self.data[at] = (value[c].clamp(0.0, 1.0) * 255.0).round() as u8,
                2 => self.data[at..at + 2].copy_from_slice(&f16::from_f32(value[c]).to_le_bytes()),
                _ => self.data[at..at + 4].copy_from_slice(&value[c].to_le_bytes()),
            }
        }
    }

    /// Bilinear sample with per-axis wrapping. `uv = (0, 0)` is the bottom-left corner.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        if self.width == 0 || self.height == 0 {
            return Vec4::ZERO;
        }
        let u = self.wrap_s.apply(uv.x) * self.width as f32;
        let v = self.wrap_t.apply(uv.y) * self.height as f32;

        let x0 = (u.floor() as u32).min(self.width - 1);
        let y0 = (v.floor() as u32).min(self.height - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let flip = |y: u32| self.height - y - 1;
        let c00 = self.texel(x0, flip(y0));
        let c10 = self.texel(x1, flip(y0));
        let c01 = self.texel(x0, flip(y1));
        let c11 = self.texel(x1, flip(y1));

        let dx = (u - x0 as f32).clamp(0.0, 1.0);
        let dy = (v - y0 as f32).clamp(0.0, 1.0);
        c00.lerp(c10, dx).lerp(c01.lerp(c11, dx), dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn format_sizes() {
        assert_eq!(PixelFormat::Rgb16F.pixel_size(), 6);
        assert_eq!(PixelFormat::R16F.pixel_size(), 2);
        assert_eq!(PixelFormat::Srgb8Alpha8.pixel_size(), 4);
        assert_eq!(PixelFormat::Rgba32F.pixel_size(), 16);
    }

    #[test]
    fn half_texels_store_little_endian() {
        let mut image = Image::new(2, 1, PixelFormat::Rgb16F);
        image.set_texel(1, 0, Vec4::new(1.0, 0.5, 2.0, 0.0));
        let bytes = &image.as_bytes()[6..12];
        assert_eq!(bytes[0..2], f16::from_f32(1.0).to_le_bytes());
        assert_eq!(bytes[4..6], f16::from_f32(2.0).to_le_bytes());
        assert_eq!(image.texel(1, 0), Vec4::new(1.0, 0.5, 2.0, 1.0));
        assert_eq!(image.texel(0, 0), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn byte_texels_are_normalized() {
        let image = Image::from_raw(1, 1, PixelFormat::Rgba8, vec![255, 0, 51, 255]).unwrap();
        let t = image.texel(0, 0);
        assert_relative_eq!(t.x, 1.0);
        assert_relative_eq!(t.z, 0.2);
    }

    #[test]
    fn sample_origin_is_bottom_left() {
        // Stored top row first: top = white, bottom = black
        let image = Image::from_raw(1, 2, PixelFormat::R8, vec![255, 0])
            .unwrap()
            .with_wrap_mode(WrapMode::ClampToEdge, WrapMode::ClampToEdge);
        assert_relative_eq!(image.sample(Vec2::new(0.5, 0.0)).x, 0.0);
        assert_relative_eq!(image.sample(Vec2::new(0.5, 0.99)).x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn bilinear_interpolates_between_texels() {
        let mut image = Image::new(2, 1, PixelFormat::R32F);
        image.set_texel(0, 0, Vec4::splat(0.0));
        image.set_texel(1, 0, Vec4::splat(1.0));
        assert_relative_eq!(image.sample(Vec2::new(0.25, 0.0)).x, 0.5);
        // Repeat wrapping maps 1.25 back onto 0.25
        assert_relative_eq!(image.sample(Vec2::new(1.25, 0.0)).x, 0.5);
    }

    #[test]
    fn from_raw_rejects_short_buffers() {
        assert!(Image::from_raw(2, 2, PixelFormat::Rgb8, vec![0; 11]).is_err());
    }
}
