//! Header validators for each decoder variant.
//!
//! Validators inspect at most the first 64 bytes of an entry, so a prefix
//! peeked during scanning classifies the same way as the full payload.

use super::Fourcc;
use crate::encoding::{u16_at, u32_at};

/// Pack file signature.
pub const PF_SIGNATURE: &[u8; 2] = b"PF";

/// Header size recorded in every well-formed pack file.
pub const PF_HEADER_SIZE: u16 = 12;

/// ANet texture container fourccs.
pub const ANET_TEXTURES: [&[u8; 4]; 6] = [b"ATEX", b"ATTX", b"ATEC", b"ATEP", b"ATEU", b"ATET"];

/// Pixel formats an ANet texture may declare.
const ANET_PIXEL_FORMATS: [&[u8; 4]; 8] = [
    b"DXT1", b"DXT2", b"DXT3", b"DXT4", b"DXT5", b"DXTA", b"DXTL", b"DXTN",
];

/// Pixel format fourcc used by two-channel normal maps.
const ANET_PIXEL_FORMAT_3DCX: &[u8; 4] = b"3DCX";

/// Size field of a DDS header.
const DDS_HEADER_SIZE: u32 = 124;

/// PNG file signature.
pub const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// JPEG start-of-image marker.
pub const JPEG_SOI: &[u8; 3] = &[0xFF, 0xD8, 0xFF];

/// Validated header of an ANet texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Container fourcc (`ATEX`, `ATTX`, ...).
    pub container: Fourcc,
    /// Pixel format fourcc (`DXT1`, `DXT5`, ...).
    pub format: Fourcc,
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
}

/// Parses an ANet texture header.
///
/// Layout: container fourcc, pixel format fourcc, `u16` width, `u16` height.
pub fn anet_image_header(data: &[u8]) -> Option<ImageHeader> {
    let container = Fourcc::at(data, 0)?;
    if !ANET_TEXTURES.contains(&container.as_bytes()) {
        return None;
    }
    let format = Fourcc::at(data, 4)?;
    let known_format = ANET_PIXEL_FORMATS.contains(&format.as_bytes())
        || format.as_bytes() == ANET_PIXEL_FORMAT_3DCX;
    if !known_format {
        return None;
    }
    let width = u16_at(data, 8)?;
    let height = u16_at(data, 10)?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(ImageHeader {
        container,
        format,
        width,
        height,
    })
}

/// Returns the chunk type of a well-formed pack file header.
///
/// Layout: `"PF"`, `u16` flags, `u16` reserved, `u16` header size (12),
/// chunk type fourcc.
pub fn pack_file_type(data: &[u8]) -> Option<Fourcc> {
    if !data.starts_with(PF_SIGNATURE) || u16_at(data, 6)? != PF_HEADER_SIZE {
        return None;
    }
    Fourcc::at(data, 8)
}

/// Accepts any supported image encoding.
pub fn is_image(data: &[u8]) -> bool {
    anet_image_header(data).is_some()
        || (data.starts_with(b"DDS ") && u32_at(data, 4) == Some(DDS_HEADER_SIZE))
        || data.starts_with(JPEG_SOI)
        || (data.starts_with(b"RIFF") && data.get(8..12) == Some(&b"WEBP"[..]))
        || data.starts_with(PNG_SIGNATURE)
}

/// Accepts a string table: `strs` followed by a `u32` entry count.
pub fn is_string_table(data: &[u8]) -> bool {
    data.starts_with(b"strs") && u32_at(data, 4).is_some()
}

/// Accepts a pack file holding a model.
pub fn is_model(data: &[u8]) -> bool {
    pack_file_type(data) == Some(Fourcc(*b"MODL"))
}

/// Accepts a pack file wrapping an audio stream.
pub fn is_packed_audio(data: &[u8]) -> bool {
    pack_file_type(data) == Some(Fourcc(*b"ASND"))
}

/// Accepts the proprietary `asnd` container with a non-empty payload.
pub fn is_proprietary_audio(data: &[u8]) -> bool {
    data.starts_with(b"asnd") && u32_at(data, 4).is_some_and(|len| len > 0)
}

/// Accepts a pack file holding a sound bank.
pub fn is_sound_bank(data: &[u8]) -> bool {
    pack_file_type(data) == Some(Fourcc(*b"ABNK"))
}
