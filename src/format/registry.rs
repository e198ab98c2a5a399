//! Decoder dispatch by header sniffing.
//!
//! The declared [`FileType`] narrows the candidate decoders; each candidate's
//! validator then checks the actual bytes. The first candidate to accept wins,
//! and [`DecoderKind::GenericRaw`] accepts anything.

use super::validate::{self, ImageHeader};
use super::FileType;

/// Decoder variant an entry resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderKind {
    /// Raw bytes with no structural guarantees.
    GenericRaw,
    /// Image in any supported encoding.
    Image,
    /// Pack file holding a model.
    Model,
    /// Localized string table.
    StringTable,
    /// Pack file wrapping a compressed audio stream.
    PackedCompressedAudio,
    /// Proprietary `asnd` audio container.
    ProprietaryCompressedAudio,
    /// Pack file holding a sound bank.
    SoundBank,
}

impl DecoderKind {
    /// Returns a short human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            DecoderKind::GenericRaw => "raw",
            DecoderKind::Image => "image",
            DecoderKind::Model => "model",
            DecoderKind::StringTable => "string table",
            DecoderKind::PackedCompressedAudio => "packed audio",
            DecoderKind::ProprietaryCompressedAudio => "proprietary audio",
            DecoderKind::SoundBank => "sound bank",
        }
    }

    /// Stable one-byte tag used by the index cache.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            DecoderKind::GenericRaw => 0,
            DecoderKind::Image => 1,
            DecoderKind::Model => 2,
            DecoderKind::StringTable => 3,
            DecoderKind::PackedCompressedAudio => 4,
            DecoderKind::ProprietaryCompressedAudio => 5,
            DecoderKind::SoundBank => 6,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        let kind = match tag {
            0 => DecoderKind::GenericRaw,
            1 => DecoderKind::Image,
            2 => DecoderKind::Model,
            3 => DecoderKind::StringTable,
            4 => DecoderKind::PackedCompressedAudio,
            5 => DecoderKind::ProprietaryCompressedAudio,
            6 => DecoderKind::SoundBank,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns `true` if `data` passes this variant's header validation.
    pub fn accepts(&self, data: &[u8]) -> bool {
        match self {
            DecoderKind::GenericRaw => true,
            DecoderKind::Image => validate::is_image(data),
            DecoderKind::Model => validate::is_model(data),
            DecoderKind::StringTable => validate::is_string_table(data),
            DecoderKind::PackedCompressedAudio => validate::is_packed_audio(data),
            DecoderKind::ProprietaryCompressedAudio => validate::is_proprietary_audio(data),
            DecoderKind::SoundBank => validate::is_sound_bank(data),
        }
    }
}

impl std::fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the specific decoders to try for a declared type, most specific first.
pub fn candidates(hint: FileType) -> &'static [DecoderKind] {
    use DecoderKind::*;

    match hint {
        h if h.is_texture() => &[Image],
        FileType::Model => &[Model],
        FileType::StringFile => &[StringTable],
        FileType::PackedMp3 | FileType::PackedOgg => {
            &[PackedCompressedAudio, ProprietaryCompressedAudio]
        }
        FileType::AsndMp3 => &[ProprietaryCompressedAudio, PackedCompressedAudio],
        FileType::Bank => &[SoundBank, PackedCompressedAudio],
        _ => &[],
    }
}

/// Resolves the decoder for an entry.
///
/// Pure: the same `(hint, data)` always yields the same variant. Bytes that
/// fail every candidate's validation resolve to [`DecoderKind::GenericRaw`].
///
/// # Example
///
/// ```rust
/// use datscope::format::{resolve, DecoderKind, FileType};
///
/// assert_eq!(resolve(FileType::StringFile, b"strs\x01\x00\x00\x00"), DecoderKind::StringTable);
/// // A stale hint never produces a wrongly typed decoder
/// assert_eq!(resolve(FileType::StringFile, b"OggS"), DecoderKind::GenericRaw);
/// ```
pub fn resolve(hint: FileType, data: &[u8]) -> DecoderKind {
    let kind = candidates(hint)
        .iter()
        .copied()
        .find(|kind| kind.accepts(data))
        .unwrap_or(DecoderKind::GenericRaw);
    log::debug!("resolved declared type {} to {} decoder", hint, kind);
    kind
}

/// An entry's raw bytes paired with their resolved decoder.
///
/// The decoder variant has passed header validation for these bytes; nothing
/// beyond the header is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReader {
    kind: DecoderKind,
    file_type: FileType,
    data: Vec<u8>,
}

impl FileReader {
    /// Classifies `data` declared as `hint`.
    pub fn for_data(data: Vec<u8>, hint: FileType) -> Self {
        let kind = resolve(hint, &data);
        Self {
            kind,
            file_type: hint,
            data,
        }
    }

    /// Returns the resolved decoder variant.
    pub fn kind(&self) -> DecoderKind {
        self.kind
    }

    /// Returns the declared type the entry was resolved from.
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Returns the raw entry bytes.
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the reader and returns the raw entry bytes.
    pub fn into_raw_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the texture header for ANet images.
    pub fn image_header(&self) -> Option<ImageHeader> {
        if self.kind != DecoderKind::Image {
            return None;
        }
        validate::anet_image_header(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Fourcc, identify_file_type};

    fn pf(chunk: &[u8; 4]) -> Vec<u8> {
        let mut data = b"PF\x01\x00\x00\x00\x0c\x00".to_vec();
        data.extend_from_slice(chunk);
        data.extend_from_slice(&[0u8; 16]);
        data
    }

    #[test]
    fn test_resolve_matching_hint() {
        assert_eq!(resolve(FileType::Model, &pf(b"MODL")), DecoderKind::Model);
        assert_eq!(resolve(FileType::Bank, &pf(b"ABNK")), DecoderKind::SoundBank);
        assert_eq!(
            resolve(FileType::PackedMp3, &pf(b"ASND")),
            DecoderKind::PackedCompressedAudio
        );
        assert_eq!(
            resolve(FileType::AsndMp3, b"asnd\x20\x00\x00\x00"),
            DecoderKind::ProprietaryCompressedAudio
        );
        assert_eq!(
            resolve(FileType::Atex, b"ATEXDXT1\x40\x00\x40\x00"),
            DecoderKind::Image
        );
    }

    #[test]
    fn test_resolve_falls_through_chain() {
        // Declared as packed audio but actually the proprietary container
        assert_eq!(
            resolve(FileType::PackedOgg, b"asnd\x20\x00\x00\x00"),
            DecoderKind::ProprietaryCompressedAudio
        );
        // Declared as a bank but holding a packed stream
        assert_eq!(
            resolve(FileType::Bank, &pf(b"ASND")),
            DecoderKind::PackedCompressedAudio
        );
    }

    #[test]
    fn test_resolve_rejects_to_generic() {
        // Pack file with a malformed header size
        let mut model = pf(b"MODL");
        model[6] = 0x10;
        assert_eq!(resolve(FileType::Model, &model), DecoderKind::GenericRaw);
        // Texture with an unknown pixel format
        assert_eq!(
            resolve(FileType::Atex, b"ATEXRGBA\x40\x00\x40\x00"),
            DecoderKind::GenericRaw
        );
        // Valid bytes never upgrade an unrelated hint
        assert_eq!(resolve(FileType::Mp3, &pf(b"MODL")), DecoderKind::GenericRaw);
        assert_eq!(
            resolve(FileType::PackFile(Fourcc(*b"cntc")), &pf(b"MODL")),
            DecoderKind::GenericRaw
        );
        assert_eq!(resolve(FileType::Unknown, b""), DecoderKind::GenericRaw);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let data = pf(b"ABNK");
        let hint = identify_file_type(&data);
        let first = resolve(hint, &data);
        for _ in 0..10 {
            assert_eq!(resolve(hint, &data), first);
        }
    }

    #[test]
    fn test_every_candidate_accepts_what_it_resolves() {
        let samples: Vec<Vec<u8>> = vec![
            pf(b"MODL"),
            pf(b"ABNK"),
            pf(b"ASND"),
            b"asnd\x01\x00\x00\x00".to_vec(),
            b"strs\x00\x00\x00\x00".to_vec(),
            b"ATTXDXT5\x10\x00\x10\x00".to_vec(),
            b"junk".to_vec(),
        ];
        for data in &samples {
            let kind = resolve(identify_file_type(data), data);
            assert!(kind.accepts(data), "{} does not accept its own input", kind);
        }
    }

    #[test]
    fn test_file_reader() {
        let reader = FileReader::for_data(b"ATEXDXT5\x00\x02\x00\x01rest".to_vec(), FileType::Atex);
        assert_eq!(reader.kind(), DecoderKind::Image);
        assert_eq!(reader.file_type(), FileType::Atex);
        let header = reader.image_header().unwrap();
        assert_eq!((header.width, header.height), (512, 256));
        assert_eq!(reader.raw_data().len(), 16);

        let raw = FileReader::for_data(b"PNG?".to_vec(), FileType::Atex);
        assert_eq!(raw.kind(), DecoderKind::GenericRaw);
        assert!(raw.image_header().is_none());
        assert_eq!(raw.into_raw_data(), b"PNG?");
    }
}
