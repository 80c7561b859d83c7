//! Binary files for baked lighting.
//!
//! Both files are little-endian records. The unversioned layouts read by
//! older viewers are format version 0; version 1 prefixes the same body with
//! a four byte magic and a `u32` version. Readers accept either.

pub mod lightmap;
pub mod probe_data;

use std::io::{Read, Write};

use gibake_core::{Error, Result};
use glam::{IVec3, Vec3};

pub use lightmap::{read_lightmaps, write_lightmaps, Lightmaps};
pub use probe_data::{read_probe_data, write_probe_data};

/// Layout version of a baked file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatVersion {
    /// Bare body, no header
    V0,
    /// Magic and version header followed by the V0 body
    #[default]
    V1,
}

impl FormatVersion {
    const fn number(self) -> u32 {
        match self {
            Self::V0 => 0,
            Self::V1 => 1,
        }
    }
}

/// Write the header for `version`; V0 has none.
pub(crate) fn write_header<W: Write>(
    w: &mut W,
    magic: &[u8; 4],
    version: FormatVersion,
) -> Result<()> {
    if version != FormatVersion::V0 {
        w.write_all(magic)?;
        write_u32(w, version.number())?;
    }
    Ok(())
}

/// Read an optional header. Returns the version and, for a headerless file,
/// the first body word that was consumed while probing for the magic.
pub(crate) fn read_header<R: Read>(
    r: &mut R,
    magic: &[u8; 4],
) -> Result<(FormatVersion, Option<u32>)> {
    let mut word = [0u8; 4];
    r.read_exact(&mut word)?;
    if &word != magic {
        return Ok((FormatVersion::V0, Some(u32::from_le_bytes(word))));
    }
    match read_u32(r)? {
        1 => Ok((FormatVersion::V1, None)),
        other => Err(Error::UnsupportedFormat(format!(
            "{} file version {other}",
            String::from_utf8_lossy(magic)
        ))),
    }
}

pub(crate) fn write_u32<W: Write>(w: &mut W, value: u32) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_i32<W: Write>(w: &mut W, value: i32) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_vec3<W: Write>(w: &mut W, value: Vec3) -> Result<()> {
    for c in value.to_array() {
        w.write_all(&c.to_le_bytes())?;
    }
    Ok(())
}

pub(crate) fn write_ivec3<W: Write>(w: &mut W, value: IVec3) -> Result<()> {
    for c in value.to_array() {
        write_i32(w, c)?;
    }
    Ok(())
}

pub(crate) fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_i32<R: Read>(r: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub(crate) fn read_f32<R: Read>(r: &mut R) -> Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

pub(crate) fn read_vec3<R: Read>(r: &mut R) -> Result<Vec3> {
    Ok(Vec3::new(read_f32(r)?, read_f32(r)?, read_f32(r)?))
}

/// Read exactly `len` bytes without trusting `len` for the allocation.
pub(crate) fn read_bytes<R: Read>(r: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    r.take(len).read_to_end(&mut data)?;
    if data.len() as u64 != len {
        return Err(Error::InvalidData(format!(
            "expected {len} bytes, file ends after {}",
            data.len()
        )));
    }
    Ok(data)
}

pub(crate) fn read_ivec3<R: Read>(r: &mut R) -> Result<IVec3> {
    Ok(IVec3::new(read_i32(r)?, read_i32(r)?, read_i32(r)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_detection() {
        let mut buf = Vec::new();
        write_header(&mut buf, b"TEST", FormatVersion::V1).unwrap();
        write_u32(&mut buf, 7).unwrap();
        let mut r = Cursor::new(buf);
        assert_eq!(read_header(&mut r, b"TEST").unwrap(), (FormatVersion::V1, None));
        assert_eq!(read_u32(&mut r).unwrap(), 7);

        let mut r = Cursor::new(7u32.to_le_bytes().to_vec());
        assert_eq!(read_header(&mut r, b"TEST").unwrap(), (FormatVersion::V0, Some(7)));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut buf = b"TEST".to_vec();
        buf.extend(9u32.to_le_bytes());
        assert!(matches!(
            read_header(&mut Cursor::new(buf), b"TEST"),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
