//! Lightmap files: irradiance and ambient occlusion images per primitive.
//!
//! ```text
//! [b"GILM" u32 version]                  (version 1 only)
//! u32 irradiance_count
//! u32 ao_count
//! irradiance_count x { u32 width, u32 height, width*height x 3 x f16 }
//! ao_count         x { u32 width, u32 height, width*height x f16 }
//! ```

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use gibake_core::{Error, Result};
use gibake_scene::{Image, PixelFormat};
use tracing::info;

use super::{read_bytes, read_header, read_u32, write_header, write_u32, FormatVersion};

pub const MAGIC: &[u8; 4] = b"GILM";

/// Baked lightmaps, each list aligned with the scene's primitives.
#[derive(Clone, Debug, Default)]
pub struct Lightmaps {
    pub irradiance: Vec<Image>,
    pub ambient_occlusion: Vec<Image>,
}

impl Lightmaps {
    pub fn save(&self, path: impl AsRef<Path>, version: FormatVersion) -> Result<()> {
        let path = path.as_ref();
        let mut buf = Vec::new();
        write_lightmaps(&mut buf, self, version)?;
        std::fs::write(path, buf)?;
        info!(
            "Saved {} irradiance and {} ambient occlusion maps to {}",
            self.irradiance.len(),
            self.ambient_occlusion.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        read_lightmaps(&mut r)
    }
}

pub fn write_lightmaps<W: Write>(
    w: &mut W,
    lightmaps: &Lightmaps,
    version: FormatVersion,
) -> Result<()> {
    check_format(&lightmaps.irradiance, PixelFormat::Rgb16F)?;
    check_format(&lightmaps.ambient_occlusion, PixelFormat::R16F)?;

    write_header(w, MAGIC, version)?;
    write_u32(w, count(&lightmaps.irradiance)?)?;
    write_u32(w, count(&lightmaps.ambient_occlusion)?)?;
    for image in lightmaps.irradiance.iter().chain(&lightmaps.ambient_occlusion) {
        write_u32(w, image.width())?;
        write_u32(w, image.height())?;
        w.write_all(image.as_bytes())?;
    }
    Ok(())
}

pub fn read_lightmaps<R: Read>(r: &mut R) -> Result<Lightmaps> {
    let irradiance_count = match read_header(r, MAGIC)? {
        (_, Some(first)) => first,
        (_, None) => read_u32(r)?,
    };
    let ao_count = read_u32(r)?;

    let irradiance = (0..irradiance_count)
        .map(|_| read_image(r, PixelFormat::Rgb16F))
        .collect::<Result<Vec<_>>>()?;
    let ambient_occlusion = (0..ao_count)
        .map(|_| read_image(r, PixelFormat::R16F))
        .collect::<Result<Vec<_>>>()?;
    Ok(Lightmaps {
        irradiance,
        ambient_occlusion,
    })
}

fn read_image<R: Read>(r: &mut R, format: PixelFormat) -> Result<Image> {
    let width = read_u32(r)?;
    let height = read_u32(r)?;
    let len = u64::from(width) * u64::from(height) * format.pixel_size() as u64;
    let data = read_bytes(r, len)?;
    Image::from_raw(width, height, format, data)
}

fn check_format(images: &[Image], expected: PixelFormat) -> Result<()> {
    match images.iter().find(|image| image.format() != expected) {
        Some(image) => Err(Error::UnsupportedFormat(format!(
            "lightmap stored as {:?}, expected {expected:?}",
            image.format()
        ))),
        None => Ok(()),
    }
}

fn count(images: &[Image]) -> Result<u32> {
    u32::try_from(images.len())
        .map_err(|_| Error::InvalidData(format!("{} lightmaps do not fit the file", images.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;
    use std::io::Cursor;

    fn gradient(width: u32, height: u32, format: PixelFormat) -> Image {
        let mut image = Image::new(width, height, format);
        for y in 0..height {
            for x in 0..width {
                let v = (x + y * width) as f32 * 0.125;
                image.set_texel(x, y, Vec4::new(v, v + 0.5, v * 2.0, 1.0));
            }
        }
        image
    }

    fn round_trip(lightmaps: &Lightmaps, version: FormatVersion) -> Lightmaps {
        let mut buf = Vec::new();
        write_lightmaps(&mut buf, lightmaps, version).unwrap();
        read_lightmaps(&mut Cursor::new(buf)).unwrap()
    }

    fn assert_same(a: &[Image], b: &[Image]) {
        assert_eq!(a.len(), b.len());
        for (a, b) in a.iter().zip(b) {
            assert_eq!(a.size(), b.size());
            assert_eq!(a.format(), b.format());
            assert_eq!(a.as_bytes(), b.as_bytes());
        }
    }

    #[test]
    fn empty_file() {
        for version in [FormatVersion::V0, FormatVersion::V1] {
            let read = round_trip(&Lightmaps::default(), version);
            assert!(read.irradiance.is_empty());
            assert!(read.ambient_occlusion.is_empty());
        }
    }

    #[test]
    fn maps_survive_both_versions() {
        let lightmaps = Lightmaps {
            irradiance: vec![
                gradient(4, 3, PixelFormat::Rgb16F),
                gradient(1, 1, PixelFormat::Rgb16F),
            ],
            ambient_occlusion: vec![gradient(2, 5, PixelFormat::R16F)],
        };
        for version in [FormatVersion::V0, FormatVersion::V1] {
            let read = round_trip(&lightmaps, version);
            assert_same(&read.irradiance, &lightmaps.irradiance);
            assert_same(&read.ambient_occlusion, &lightmaps.ambient_occlusion);
        }
    }

    #[test]
    fn v0_layout() {
        let lightmaps = Lightmaps {
            irradiance: vec![],
            ambient_occlusion: vec![gradient(1, 2, PixelFormat::R16F)],
        };
        let mut buf = Vec::new();
        write_lightmaps(&mut buf, &lightmaps, FormatVersion::V0).unwrap();
        assert_eq!(&buf[..16], &[0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(buf.len(), 16 + 2 * 2);

        let mut v1 = Vec::new();
        write_lightmaps(&mut v1, &lightmaps, FormatVersion::V1).unwrap();
        assert_eq!(&v1[..4], MAGIC);
        assert_eq!(&v1[8..], &buf[..]);
    }

    #[test]
    fn wrong_pixel_format_is_rejected() {
        let lightmaps = Lightmaps {
            irradiance: vec![gradient(2, 2, PixelFormat::Rgba32F)],
            ambient_occlusion: vec![],
        };
        let mut buf = Vec::new();
        assert!(matches!(
            write_lightmaps(&mut buf, &lightmaps, FormatVersion::V1),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn truncated_file_is_an_error() {
        let lightmaps = Lightmaps {
            irradiance: vec![gradient(4, 4, PixelFormat::Rgb16F)],
            ambient_occlusion: vec![],
        };
        let mut buf = Vec::new();
        write_lightmaps(&mut buf, &lightmaps, FormatVersion::V1).unwrap();
        buf.truncate(buf.len() - 3);
        assert!(read_lightmaps(&mut Cursor::new(buf)).is_err());
    }
}
