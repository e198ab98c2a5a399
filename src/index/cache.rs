//! Persistent index cache.
//!
//! A cache file holds one serialized [`IndexStore`]. Its name is a checksum
//! of the archive's absolute path, so every archive gets its own slot in the
//! cache directory.
//!
//! # Layout
//!
//! ```text
//! magic "DSIX" | version u16 | source_timestamp u64 | highest_seen varint
//! category_count varint | (parent varint, name string) * category_count
//! entry_count varint    | (entry_id varint, type tag u8 [fourcc], decoder tag u8,
//!                          category varint, name string) * entry_count
//! crc32 u32 of everything above
//! ```
//!
//! Categories are listed in creation order without the root, so a parent
//! always precedes its children and index 0 denotes the root.

use std::fs::{self, File};
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use super::{CategoryId, IndexStore};
use crate::checksum::{Checksum, Crc32, Crc32Writer, Crc64};
use crate::config::CacheKey;
use crate::encoding::{read_string, read_u8, read_u16_le, read_u64_le, read_variable_u64};
use crate::encoding::{write_string, write_variable_u64};
use crate::format::{DecoderKind, FileType, Fourcc};
use crate::{Error, Result};

/// Cache file signature.
pub const CACHE_MAGIC: &[u8; 4] = b"DSIX";

/// Current cache format version.
pub const CACHE_VERSION: u16 = 1;

/// Cache file extension.
pub const CACHE_EXTENSION: &str = "idx";

/// Smallest well-formed cache: fixed header, two empty counts and trailer.
const MIN_CACHE_LEN: usize = 4 + 2 + 8 + 1 + 1 + 1 + 4;

/// Derives the cache file name for an archive path.
///
/// The path is made absolute (without touching the file system) and its
/// encoded bytes are checksummed with a zero seed.
pub fn cache_file_name(archive_path: &Path, key: CacheKey) -> Result<String> {
    let absolute = std::path::absolute(archive_path)?;
    let bytes = absolute.as_os_str().as_encoded_bytes();
    let name = match key {
        CacheKey::Crc32 => {
            let mut crc = Crc32::with_initial(0);
            crc.update(bytes);
            format!("{:08x}.{}", crc.finalize(), CACHE_EXTENSION)
        }
        CacheKey::Crc64 => format!("{:016x}.{}", Crc64::compute(bytes), CACHE_EXTENSION),
    };
    log::debug!("cache file for '{}' is {}", absolute.display(), name);
    Ok(name)
}

/// Serializes `store` into `w`.
pub fn write_index<W: Write>(w: W, store: &IndexStore) -> io::Result<()> {
    let mut w = Crc32Writer::new(w);
    w.write_all(CACHE_MAGIC)?;
    w.write_all(&CACHE_VERSION.to_le_bytes())?;
    w.write_all(&store.source_timestamp().to_le_bytes())?;
    write_variable_u64(&mut w, store.highest_seen() as u64)?;

    write_variable_u64(&mut w, (store.category_count() - 1) as u64)?;
    for category in store.categories_after_root() {
        write_variable_u64(&mut w, category.parent().unwrap_or_default() as u64)?;
        write_string(&mut w, category.name())?;
    }

    write_variable_u64(&mut w, store.len() as u64)?;
    for entry in store.entries() {
        write_variable_u64(&mut w, entry.entry_id as u64)?;
        w.write_all(&[entry.file_type.tag()])?;
        if let FileType::PackFile(fourcc) = entry.file_type {
            w.write_all(fourcc.as_bytes())?;
        }
        w.write_all(&[entry.kind.tag()])?;
        write_variable_u64(&mut w, entry.category as u64)?;
        write_string(&mut w, &entry.name)?;
    }

    let crc = w.crc();
    let mut inner = w.into_inner();
    inner.write_all(&crc.to_le_bytes())?;
    inner.flush()
}

/// Deserializes a store from `r`.
///
/// The whole cache is read into memory first; its size is bounded by the
/// index, not by the archive.
///
/// # Errors
///
/// Any structural problem is reported as [`Error::CorruptCache`]; only
/// failures of the reader itself are [`Error::Io`].
pub fn read_index<R: Read>(mut r: R) -> Result<IndexStore> {
    let mut bytes = Vec::new();
    r.read_to_end(&mut bytes)?;
    if bytes.len() < MIN_CACHE_LEN {
        return Err(Error::corrupt_cache(format!(
            "file too short ({} bytes)",
            bytes.len()
        )));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - 4);
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = Crc32::compute(body);
    if stored != actual {
        return Err(Error::corrupt_cache(format!(
            "checksum mismatch (stored {:08x}, computed {:08x})",
            stored, actual
        )));
    }

    let mut cursor = Cursor::new(body);
    let store = parse_body(&mut cursor).map_err(|e| match e {
        Error::Io(io) => Error::corrupt_cache(format!("truncated: {}", io)),
        other => other,
    })?;
    if cursor.position() != body.len() as u64 {
        return Err(Error::corrupt_cache(format!(
            "{} trailing bytes",
            body.len() as u64 - cursor.position()
        )));
    }
    Ok(store)
}

fn parse_body(r: &mut Cursor<&[u8]>) -> Result<IndexStore> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != CACHE_MAGIC {
        return Err(Error::corrupt_cache("bad magic"));
    }
    let version = read_u16_le(r)?;
    if version != CACHE_VERSION {
        return Err(Error::corrupt_cache(format!(
            "unsupported version {}",
            version
        )));
    }
    let source_timestamp = read_u64_le(r)?;
    let highest_seen = read_count(r, "highest seen id", u32::MAX as u64)? as u32;

    let mut store = IndexStore::new();
    let limit = remaining(r);
    let category_count = read_count(r, "category count", limit)?;
    for _ in 0..category_count {
        let parent = read_count(r, "category parent", usize::MAX as u64)? as CategoryId;
        let name = read_string(r)?;
        store.push_category(parent, name).map_err(Error::corrupt_cache)?;
    }

    let limit = remaining(r);
    let entry_count = read_count(r, "entry count", limit)?;
    for _ in 0..entry_count {
        let entry_id = read_count(r, "entry id", u32::MAX as u64)? as u32;
        let file_type = read_file_type(r)?;
        let kind_tag = read_u8(r)?;
        let kind = DecoderKind::from_tag(kind_tag)
            .ok_or_else(|| Error::corrupt_cache(format!("unknown decoder tag {}", kind_tag)))?;
        let category = read_count(r, "entry category", usize::MAX as u64)? as CategoryId;
        let name = read_string(r)?;
        if category >= store.category_count() {
            return Err(Error::corrupt_cache(format!(
                "entry {} refers to missing category {}",
                entry_id, category
            )));
        }
        if !store.insert(entry_id, file_type, kind, category, name) {
            return Err(Error::corrupt_cache(format!("duplicate entry id {}", entry_id)));
        }
    }

    store.restore_state(source_timestamp, highest_seen);
    store.mark_clean();
    Ok(store)
}

fn remaining(r: &Cursor<&[u8]>) -> u64 {
    (r.get_ref().len() as u64).saturating_sub(r.position())
}

/// Reads a varint and rejects values above `max`.
fn read_count(r: &mut Cursor<&[u8]>, what: &str, max: u64) -> Result<u64> {
    let value = read_variable_u64(r)?;
    if value > max {
        return Err(Error::corrupt_cache(format!(
            "{} {} out of range",
            what, value
        )));
    }
    Ok(value)
}

fn read_file_type(r: &mut Cursor<&[u8]>) -> Result<FileType> {
    let tag = read_u8(r)?;
    if tag == FileType::PACK_FILE_TAG {
        let mut fourcc = [0u8; 4];
        r.read_exact(&mut fourcc)?;
        return Ok(FileType::PackFile(Fourcc(fourcc)));
    }
    FileType::from_simple_tag(tag)
        .ok_or_else(|| Error::corrupt_cache(format!("unknown file type tag {}", tag)))
}

/// Writes `store` to `path`, replacing any previous cache.
///
/// The data goes to a temporary sibling first and is renamed over the
/// target, so readers never observe a half-written cache. Missing parent
/// directories are created.
///
/// # Errors
///
/// Returns [`Error::WriteFailure`] naming `path`.
pub fn save(path: &Path, store: &IndexStore) -> Result<()> {
    let failure = |source: io::Error| Error::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(failure)?;
    }
    let tmp = temp_path(path);
    let result = File::create(&tmp)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write_index(&mut writer, store)?;
            writer.into_inner().map_err(|e| e.into_error())?.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(failure(e));
    }
    log::info!(
        "wrote index cache '{}' ({} entries)",
        path.display(),
        store.len()
    );
    Ok(())
}

/// Reads the cache at `path`.
///
/// # Errors
///
/// Returns [`Error::CacheMiss`] if the file does not exist and
/// [`Error::CorruptCache`] if it cannot be parsed.
pub fn load(path: &Path) -> Result<IndexStore> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::CacheMiss {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    read_index(io::BufReader::new(file))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ROOT, categorize};

    fn sample() -> IndexStore {
        let mut store = IndexStore::new();
        let entries: [(u32, FileType, DecoderKind, &[u8]); 4] = [
            (0, FileType::Atex, DecoderKind::Image, b"ATEXDXT1\x20\x00\x20\x00"),
            (1, FileType::Model, DecoderKind::Model, b""),
            (3, FileType::PackFile(Fourcc(*b"cntc")), DecoderKind::GenericRaw, b""),
            (1500, FileType::Unknown, DecoderKind::GenericRaw, b""),
        ];
        for (id, file_type, kind, data) in entries {
            let path = categorize(id, file_type, data);
            let category = store.add_category_path(&path[..]);
            store.insert(id, file_type, kind, category, id.to_string());
        }
        store.set_source_timestamp(1_700_000_000);
        store.advance_highest_seen(1501);
        store
    }

    fn serialize(store: &IndexStore) -> Vec<u8> {
        let mut out = Vec::new();
        write_index(&mut out, store).unwrap();
        out
    }

    #[test]
    fn test_round_trip() {
        let store = sample();
        let restored = read_index(serialize(&store).as_slice()).unwrap();
        assert!(restored.same_contents(&store));
        assert!(!restored.is_dirty());
        assert_eq!(
            restored.find_category(&["Pack files", "cntc"]),
            store.find_category(&["Pack files", "cntc"])
        );
    }

    #[test]
    fn test_round_trip_empty() {
        let store = IndexStore::new();
        let bytes = serialize(&store);
        assert_eq!(bytes.len(), MIN_CACHE_LEN);
        let restored = read_index(bytes.as_slice()).unwrap();
        assert!(restored.same_contents(&store));
        assert_eq!(restored.category(ROOT).unwrap().children().len(), 0);
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let mut bytes = serialize(&sample());
        bytes[10] ^= 0x01;
        let err = read_index(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, Error::CorruptCache { .. }));
    }

    /// Re-seals a modified body with a fresh checksum.
    fn reseal(mut body: Vec<u8>) -> Vec<u8> {
        let crc = Crc32::compute(&body);
        body.extend_from_slice(&crc.to_le_bytes());
        body
    }

    #[test]
    fn test_rejects_structural_errors() {
        let bytes = serialize(&sample());
        let body = bytes[..bytes.len() - 4].to_vec();

        let mut bad_magic = body.clone();
        bad_magic[0] = b'X';
        let mut bad_version = body.clone();
        bad_version[4] = 9;
        let mut trailing = body.clone();
        trailing.push(0);
        let truncated = body[..body.len() - 3].to_vec();

        for candidate in [bad_magic, bad_version, trailing, truncated] {
            let err = read_index(reseal(candidate).as_slice()).unwrap_err();
            assert!(err.is_cache_error(), "unexpected error: {}", err);
        }
        assert!(read_index(&b"DSIX"[..]).unwrap_err().is_cache_error());
    }

    #[test]
    fn test_rejects_duplicate_entries() {
        let mut body = Vec::new();
        body.extend_from_slice(CACHE_MAGIC);
        body.extend_from_slice(&CACHE_VERSION.to_le_bytes());
        body.extend_from_slice(&1u64.to_le_bytes());
        body.push(2); // highest seen
        body.push(0); // categories
        body.push(2); // entries
        for _ in 0..2 {
            body.extend_from_slice(&[5, 0, 0, 0, 1, b'5']);
        }
        let err = read_index(reseal(body).as_slice()).unwrap_err();
        assert!(err.to_string().contains("duplicate entry id 5"));
    }

    #[test]
    fn test_rejects_dangling_category() {
        let mut body = Vec::new();
        body.extend_from_slice(CACHE_MAGIC);
        body.extend_from_slice(&CACHE_VERSION.to_le_bytes());
        body.extend_from_slice(&1u64.to_le_bytes());
        body.push(0);
        body.push(1);
        body.extend_from_slice(&[3, 1, b'A']); // parent 3 does not exist
        body.push(0);
        let err = read_index(reseal(body).as_slice()).unwrap_err();
        assert!(matches!(err, Error::CorruptCache { .. }));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("0badf00d.idx");
        let store = sample();

        save(&path, &store).unwrap();
        assert!(!temp_path(&path).exists());
        let loaded = load(&path).unwrap();
        assert!(loaded.same_contents(&store));
    }

    #[test]
    fn test_load_missing_is_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("missing.idx")).unwrap_err();
        assert!(matches!(err, Error::CacheMiss { .. }));
    }

    #[test]
    fn test_save_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let err = save(&blocker.join("cache.idx"), &sample()).unwrap_err();
        assert!(matches!(err, Error::WriteFailure { .. }));
    }

    #[test]
    fn test_cache_file_name() {
        let a = cache_file_name(Path::new("/games/Gw2.dat"), CacheKey::Crc32).unwrap();
        let b = cache_file_name(Path::new("/games/Gw2.dat"), CacheKey::Crc32).unwrap();
        let c = cache_file_name(Path::new("/games/Gw2-old.dat"), CacheKey::Crc32).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 12);
        assert!(a.chars().take(8).all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
    }

    #[test]
    fn test_cache_file_name_relative_matches_absolute() {
        let relative = Path::new("Gw2.dat");
        let absolute = std::env::current_dir().unwrap().join(relative);
        assert_eq!(
            cache_file_name(relative, CacheKey::Crc64).unwrap(),
            cache_file_name(&absolute, CacheKey::Crc64).unwrap()
        );
    }
}
