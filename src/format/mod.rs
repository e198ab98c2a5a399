//! Entry content classification.
//!
//! Classification happens in two stages:
//!
//! 1. [`identify`] derives a declared [`FileType`] from an entry's leading
//!    bytes. The result is recorded in the index and used as a pre-filter.
//! 2. [`registry`] validates the bytes against the candidates for that
//!    declared type and resolves the most specific [`DecoderKind`], falling
//!    back to [`DecoderKind::GenericRaw`].
//!
//! Both stages are pure functions of their input.

pub mod identify;
pub mod registry;
pub mod validate;

pub use identify::identify_file_type;
pub use registry::{DecoderKind, FileReader, resolve};
pub use validate::ImageHeader;

/// A four-character code as found in entry headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fourcc(pub [u8; 4]);

impl Fourcc {
    /// Reads a fourcc at `offset`, if the slice is long enough.
    pub fn at(data: &[u8], offset: usize) -> Option<Self> {
        let bytes = data.get(offset..offset.checked_add(4)?)?;
        Some(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::fmt::Display for Fourcc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

/// Declared content type of an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FileType {
    /// No known signature.
    Unknown,
    /// ANet texture, `ATEX`.
    Atex,
    /// ANet texture, `ATTX`.
    Attx,
    /// ANet texture, `ATEC`.
    Atec,
    /// ANet texture, `ATEP`.
    Atep,
    /// ANet texture, `ATEU`.
    Ateu,
    /// ANet texture, `ATET`.
    Atet,
    /// DirectDraw surface.
    Dds,
    /// JPEG image.
    Jpeg,
    /// WebP image.
    Webp,
    /// PNG image.
    Png,
    /// Pack file holding a 3D model.
    Model,
    /// Localized string table.
    StringFile,
    /// Pack file wrapping MP3 audio.
    PackedMp3,
    /// Pack file wrapping Ogg audio.
    PackedOgg,
    /// Proprietary `asnd` audio container.
    AsndMp3,
    /// Pack file holding a sound bank.
    Bank,
    /// Bare MP3 stream.
    Mp3,
    /// Bare Ogg stream.
    Ogg,
    /// Windows executable or library.
    Executable,
    /// Bink 2 video.
    Bink2Video,
    /// Pack file with a chunk type not otherwise recognized.
    PackFile(Fourcc),
}

impl FileType {
    /// Returns `true` for any image type.
    pub fn is_texture(&self) -> bool {
        matches!(
            self,
            FileType::Atex
                | FileType::Attx
                | FileType::Atec
                | FileType::Atep
                | FileType::Ateu
                | FileType::Atet
                | FileType::Dds
                | FileType::Jpeg
                | FileType::Webp
                | FileType::Png
        )
    }

    /// Returns `true` for any audio type.
    pub fn is_sound(&self) -> bool {
        matches!(
            self,
            FileType::PackedMp3
                | FileType::PackedOgg
                | FileType::AsndMp3
                | FileType::Mp3
                | FileType::Ogg
        )
    }

    /// Returns a short human-readable name.
    pub fn name(&self) -> String {
        let name = match self {
            FileType::Unknown => "unknown",
            FileType::Atex => "ATEX",
            FileType::Attx => "ATTX",
            FileType::Atec => "ATEC",
            FileType::Atep => "ATEP",
            FileType::Ateu => "ATEU",
            FileType::Atet => "ATET",
            FileType::Dds => "DDS",
            FileType::Jpeg => "JPEG",
            FileType::Webp => "WebP",
            FileType::Png => "PNG",
            FileType::Model => "model",
            FileType::StringFile => "strings",
            FileType::PackedMp3 => "packed MP3",
            FileType::PackedOgg => "packed Ogg",
            FileType::AsndMp3 => "asnd MP3",
            FileType::Bank => "sound bank",
            FileType::Mp3 => "MP3",
            FileType::Ogg => "Ogg",
            FileType::Executable => "executable",
            FileType::Bink2Video => "Bink 2",
            FileType::PackFile(fourcc) => return format!("PF {}", fourcc),
        };
        name.to_string()
    }

    /// Stable one-byte tag used by the index cache.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            FileType::Unknown => 0,
            FileType::Atex => 1,
            FileType::Attx => 2,
            FileType::Atec => 3,
            FileType::Atep => 4,
            FileType::Ateu => 5,
            FileType::Atet => 6,
            FileType::Dds => 7,
            FileType::Jpeg => 8,
            FileType::Webp => 9,
            FileType::Png => 10,
            FileType::Model => 11,
            FileType::StringFile => 12,
            FileType::PackedMp3 => 13,
            FileType::PackedOgg => 14,
            FileType::AsndMp3 => 15,
            FileType::Bank => 16,
            FileType::Mp3 => 17,
            FileType::Ogg => 18,
            FileType::Executable => 19,
            FileType::Bink2Video => 20,
            FileType::PackFile(_) => 21,
        }
    }

    /// Inverse of [`tag`](Self::tag) for types without payload.
    ///
    /// Returns `None` for unknown tags and for the pack file tag, whose
    /// fourcc the caller reads separately.
    pub(crate) fn from_simple_tag(tag: u8) -> Option<Self> {
        let file_type = match tag {
            0 => FileType::Unknown,
            1 => FileType::Atex,
            2 => FileType::Attx,
            3 => FileType::Atec,
            4 => FileType::Atep,
            5 => FileType::Ateu,
            6 => FileType::Atet,
            7 => FileType::Dds,
            8 => FileType::Jpeg,
            9 => FileType::Webp,
            10 => FileType::Png,
            11 => FileType::Model,
            12 => FileType::StringFile,
            13 => FileType::PackedMp3,
            14 => FileType::PackedOgg,
            15 => FileType::AsndMp3,
            16 => FileType::Bank,
            17 => FileType::Mp3,
            18 => FileType::Ogg,
            19 => FileType::Executable,
            20 => FileType::Bink2Video,
            _ => return None,
        };
        Some(file_type)
    }

    /// Tag of [`FileType::PackFile`].
    pub(crate) const PACK_FILE_TAG: u8 = 21;
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}
