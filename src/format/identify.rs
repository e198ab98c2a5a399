//! Declared file type identification from leading bytes.
//!
//! This is the coarse first pass: it looks only at magic numbers and the
//! chunk type of pack files. The result may be wrong for damaged or unusual
//! entries; [`resolve`](super::resolve) re-validates it before any decoder
//! is chosen.

use super::validate::{ANET_TEXTURES, JPEG_SOI, PF_SIGNATURE, PNG_SIGNATURE};
use super::{FileType, Fourcc};

/// Number of leading bytes identification may inspect.
pub const IDENTIFY_LEN: usize = 64;

/// Fixed signatures at offset 0, checked in order.
const SIGNATURES: &[(&[u8], FileType)] = &[
    (b"DDS ", FileType::Dds),
    (JPEG_SOI, FileType::Jpeg),
    (PNG_SIGNATURE, FileType::Png),
    (b"strs", FileType::StringFile),
    (b"asnd", FileType::AsndMp3),
    (b"OggS", FileType::Ogg),
    (b"ID3", FileType::Mp3),
    (b"KB2", FileType::Bink2Video),
    (b"MZ", FileType::Executable),
];

/// Identifies the declared type of an entry from its leading bytes.
///
/// # Example
///
/// ```rust
/// use datscope::format::{identify_file_type, FileType};
///
/// assert_eq!(identify_file_type(b"ATEXDXT5\x00\x01\x00\x01"), FileType::Atex);
/// assert_eq!(identify_file_type(b"OggS\x00\x02"), FileType::Ogg);
/// assert_eq!(identify_file_type(b"hello"), FileType::Unknown);
/// ```
pub fn identify_file_type(data: &[u8]) -> FileType {
    let data = &data[..data.len().min(IDENTIFY_LEN)];

    if let Some(texture) = anet_texture_type(data) {
        return texture;
    }

    if data.starts_with(b"RIFF") && data.get(8..12) == Some(&b"WEBP"[..]) {
        return FileType::Webp;
    }

    if data.starts_with(PF_SIGNATURE) {
        return pack_file_type(data);
    }

    for (signature, file_type) in SIGNATURES {
        if data.starts_with(signature) {
            return *file_type;
        }
    }

    // MPEG audio frame sync: 11 set bits
    if data.len() >= 2 && data[0] == 0xFF && data[1] & 0xE0 == 0xE0 {
        return FileType::Mp3;
    }

    FileType::Unknown
}

fn anet_texture_type(data: &[u8]) -> Option<FileType> {
    let fourcc = Fourcc::at(data, 0)?;
    let index = ANET_TEXTURES
        .iter()
        .position(|t| *t == fourcc.as_bytes())?;
    Some(
        [
            FileType::Atex,
            FileType::Attx,
            FileType::Atec,
            FileType::Atep,
            FileType::Ateu,
            FileType::Atet,
        ][index],
    )
}

/// Chunk type at offset 8 decides what a pack file holds.
fn pack_file_type(data: &[u8]) -> FileType {
    let Some(chunk) = Fourcc::at(data, 8) else {
        return FileType::Unknown;
    };
    match chunk.as_bytes() {
        b"MODL" => FileType::Model,
        b"ABNK" => FileType::Bank,
        b"ASND" => {
            let has_ogg = data[12..].windows(4).any(|w| w == b"OggS");
            if has_ogg {
                FileType::PackedOgg
            } else {
                FileType::PackedMp3
            }
        }
        _ => FileType::PackFile(chunk),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pf(chunk: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut data = b"PF\x01\x00\x00\x00\x0c\x00".to_vec();
        data.extend_from_slice(chunk);
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn test_identify_textures() {
        assert_eq!(identify_file_type(b"ATEX"), FileType::Atex);
        assert_eq!(identify_file_type(b"ATTXDXT1"), FileType::Attx);
        assert_eq!(identify_file_type(b"ATET...."), FileType::Atet);
        assert_eq!(
            identify_file_type(b"DDS \x7c\x00\x00\x00"),
            FileType::Dds
        );
        assert_eq!(identify_file_type(&[0xFF, 0xD8, 0xFF, 0xE1]), FileType::Jpeg);
        assert_eq!(
            identify_file_type(b"RIFF\x10\x00\x00\x00WEBPVP8L"),
            FileType::Webp
        );
        assert_eq!(identify_file_type(b"\x89PNG\r\n\x1a\n"), FileType::Png);
    }

    #[test]
    fn test_identify_pack_files() {
        assert_eq!(identify_file_type(&pf(b"MODL", b"")), FileType::Model);
        assert_eq!(identify_file_type(&pf(b"ABNK", b"")), FileType::Bank);
        assert_eq!(
            identify_file_type(&pf(b"ASND", b"\x00\x00ID3")),
            FileType::PackedMp3
        );
        assert_eq!(
            identify_file_type(&pf(b"ASND", b"\x00\x00\x00\x00OggS")),
            FileType::PackedOgg
        );
        assert_eq!(
            identify_file_type(&pf(b"cntc", b"")),
            FileType::PackFile(Fourcc(*b"cntc"))
        );
        // Too short to carry a chunk type
        assert_eq!(identify_file_type(b"PF\x01\x00"), FileType::Unknown);
    }

    #[test]
    fn test_identify_audio_and_misc() {
        assert_eq!(identify_file_type(b"asnd\x10\x00"), FileType::AsndMp3);
        assert_eq!(identify_file_type(b"ID3\x03"), FileType::Mp3);
        assert_eq!(identify_file_type(&[0xFF, 0xFB, 0x90, 0x00]), FileType::Mp3);
        assert_eq!(identify_file_type(b"OggS"), FileType::Ogg);
        assert_eq!(identify_file_type(b"strs\x00\x00\x00\x00"), FileType::StringFile);
        assert_eq!(identify_file_type(b"MZ\x90\x00"), FileType::Executable);
        assert_eq!(identify_file_type(b"KB2j"), FileType::Bink2Video);
    }

    #[test]
    fn test_identify_unknown() {
        assert_eq!(identify_file_type(b""), FileType::Unknown);
        assert_eq!(identify_file_type(b"A"), FileType::Unknown);
        assert_eq!(identify_file_type(b"hello world"), FileType::Unknown);
        assert_eq!(identify_file_type(&[0xFF]), FileType::Unknown);
    }

    #[test]
    fn test_identify_ignores_bytes_past_window() {
        let mut data = pf(b"ASND", &[0u8; IDENTIFY_LEN]);
        data.extend_from_slice(b"OggS");
        assert_eq!(identify_file_type(&data), FileType::PackedMp3);
    }
}
