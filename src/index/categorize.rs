//! Category path heuristic for scanned entries.

use crate::format::validate::anet_image_header;
use crate::format::FileType;

/// Width of the id buckets unknown entries are grouped into.
pub const UNKNOWN_BUCKET_SIZE: u32 = 1000;

/// Derives the category path of an entry from its declared type, its leading
/// bytes and its position in the archive.
///
/// # Example
///
/// ```rust
/// use datscope::format::FileType;
/// use datscope::index::categorize;
///
/// assert_eq!(categorize(42, FileType::Model, b""), vec!["Models"]);
/// assert_eq!(categorize(1234, FileType::Unknown, b""), vec!["Unknown", "1000-1999"]);
/// ```
pub fn categorize(entry_id: u32, file_type: FileType, data: &[u8]) -> Vec<String> {
    let mut path = Vec::with_capacity(3);
    match file_type {
        t if t.is_texture() => {
            path.push("Textures".to_string());
            match anet_image_header(data) {
                Some(header) => {
                    path.push(header.container.to_string());
                    path.push(format!("{}x{}", header.width, header.height));
                }
                None => path.push(t.name()),
            }
        }
        t if t.is_sound() => {
            path.push("Sounds".to_string());
            path.push(t.name());
        }
        FileType::Model => path.push("Models".to_string()),
        FileType::StringFile => path.push("Strings".to_string()),
        FileType::Bank => path.push("Sound banks".to_string()),
        FileType::Executable => path.push("Binaries".to_string()),
        FileType::Bink2Video => path.push("Videos".to_string()),
        FileType::PackFile(fourcc) => {
            path.push("Pack files".to_string());
            path.push(fourcc.to_string());
        }
        _ => {
            let start = entry_id - entry_id % UNKNOWN_BUCKET_SIZE;
            let end = start.saturating_add(UNKNOWN_BUCKET_SIZE - 1);
            path.push("Unknown".to_string());
            path.push(format!("{}-{}", start, end));
        }
    }
    path
}

/// Display name of an entry.
pub fn display_name(entry_id: u32) -> String {
    entry_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Fourcc;

    #[test]
    fn test_textures() {
        assert_eq!(
            categorize(0, FileType::Atex, b"ATEXDXT1\x00\x01\x80\x00"),
            vec!["Textures", "ATEX", "256x128"]
        );
        // Unparseable header keeps the declared type
        assert_eq!(
            categorize(0, FileType::Attx, b"ATTX"),
            vec!["Textures", "ATTX"]
        );
        assert_eq!(categorize(0, FileType::Png, b""), vec!["Textures", "PNG"]);
    }

    #[test]
    fn test_sounds_and_fixed_groups() {
        assert_eq!(categorize(1, FileType::Ogg, b""), vec!["Sounds", "Ogg"]);
        assert_eq!(
            categorize(1, FileType::PackedMp3, b""),
            vec!["Sounds", "packed MP3"]
        );
        assert_eq!(categorize(1, FileType::StringFile, b""), vec!["Strings"]);
        assert_eq!(categorize(1, FileType::Bank, b""), vec!["Sound banks"]);
        assert_eq!(categorize(1, FileType::Executable, b""), vec!["Binaries"]);
        assert_eq!(categorize(1, FileType::Bink2Video, b""), vec!["Videos"]);
        assert_eq!(
            categorize(1, FileType::PackFile(Fourcc(*b"cntc")), b""),
            vec!["Pack files", "cntc"]
        );
    }

    #[test]
    fn test_unknown_buckets() {
        assert_eq!(categorize(0, FileType::Unknown, b""), vec!["Unknown", "0-999"]);
        assert_eq!(categorize(999, FileType::Unknown, b""), vec!["Unknown", "0-999"]);
        assert_eq!(
            categorize(1000, FileType::Unknown, b""),
            vec!["Unknown", "1000-1999"]
        );
        assert_eq!(
            categorize(u32::MAX, FileType::Unknown, b"")[1],
            "4294967000-4294967295"
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(15), "15");
    }
}
