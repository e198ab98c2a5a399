//! Random-access reading of packed game archives.
//!
//! An archive is a single file holding tens of thousands of entries addressed
//! by a dense integer id. The [`EntrySource`] trait is the accessor boundary
//! consumed by the scanner and the host; [`DatArchive`] implements it for the
//! on-disk format and [`MemoryArchive`] for in-memory entry lists.
//!
//! # Example
//!
//! ```rust,no_run
//! use datscope::dat::{DatArchive, EntrySource};
//!
//! let mut archive = DatArchive::open_path("Gw2.dat")?;
//! println!("{} entries", archive.entry_count());
//! let first = archive.peek_entry(0, 64)?;
//! # Ok::<(), datscope::Error>(())
//! ```

pub mod header;

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use filetime::FileTime;

pub use header::{DatHeader, MftEntry};

use crate::{Error, Result};

/// Read access to the entries of an archive.
///
/// Entry ids are dense, starting at 0. The entry count of a given source never
/// shrinks while it is open.
pub trait EntrySource {
    /// Returns the number of entries in the archive.
    fn entry_count(&self) -> u32;

    /// Reads the complete stored bytes of an entry.
    fn read_entry(&mut self, entry_id: u32) -> Result<Vec<u8>>;

    /// Reads at most `max_len` leading bytes of an entry.
    ///
    /// Used for classification, which never needs the full payload.
    fn peek_entry(&mut self, entry_id: u32, max_len: usize) -> Result<Vec<u8>> {
        let mut data = self.read_entry(entry_id)?;
        data.truncate(max_len);
        Ok(data)
    }
}

/// Returns the modification time of a file in seconds since the Unix epoch.
///
/// Used as the archive revision stamp recorded in the index cache.
pub fn modification_time(path: impl AsRef<Path>) -> Result<u64> {
    let metadata = std::fs::metadata(path.as_ref())?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    Ok(mtime.unix_seconds().max(0) as u64)
}

/// An archive opened from a seekable reader.
pub struct DatArchive<R> {
    reader: R,
    header: DatHeader,
    entries: Vec<MftEntry>,
    path: Option<PathBuf>,
}

impl<R> std::fmt::Debug for DatArchive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatArchive")
            .field("header", &self.header)
            .field("entries", &self.entries.len())
            .field("path", &self.path)
            .finish()
    }
}

impl DatArchive<BufReader<File>> {
    /// Opens an archive file.
    ///
    /// # Errors
    ///
    /// Returns an open failure ([`Error::Io`], [`Error::InvalidArchive`] or
    /// [`Error::CorruptHeader`]) if the file is missing or malformed.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut archive = Self::open(BufReader::new(file))?;
        archive.path = Some(path.to_path_buf());
        log::info!(
            "opened archive '{}' with {} entries",
            path.display(),
            archive.entries.len()
        );
        Ok(archive)
    }
}

impl<R: Read + Seek> DatArchive<R> {
    /// Opens an archive from a reader positioned anywhere.
    pub fn open(mut reader: R) -> Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        if file_len < header::HEADER_SIZE as u64 {
            return Err(Error::InvalidArchive(format!(
                "file too small for an archive header ({} bytes)",
                file_len
            )));
        }

        let header = header::read_header(&mut reader)?;
        let entries = header::read_mft(&mut reader, &header, file_len)?;

        Ok(Self {
            reader,
            header,
            entries,
            path: None,
        })
    }

    /// Returns the archive header.
    pub fn header(&self) -> &DatHeader {
        &self.header
    }

    /// Returns the file table record of an entry.
    pub fn entry(&self, entry_id: u32) -> Option<&MftEntry> {
        self.entries.get(entry_id as usize)
    }

    /// Returns the path the archive was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read_range(&mut self, entry_id: u32, max_len: usize) -> Result<Vec<u8>> {
        let entry = *self.entry(entry_id).ok_or(Error::EntryOutOfRange {
            entry_id,
            entry_count: self.entries.len() as u32,
        })?;
        if entry.is_compressed() {
            log::trace!("entry {} is compressed; returning stored bytes", entry_id);
        }

        let len = (entry.size as usize).min(max_len);
        let mut data = vec![0u8; len];
        self.reader.seek(SeekFrom::Start(entry.offset))?;
        self.reader.read_exact(&mut data)?;
        Ok(data)
    }
}

impl<R: Read + Seek> EntrySource for DatArchive<R> {
    fn entry_count(&self) -> u32 {
        self.entries.len() as u32
    }

    fn read_entry(&mut self, entry_id: u32) -> Result<Vec<u8>> {
        self.read_range(entry_id, usize::MAX)
    }

    fn peek_entry(&mut self, entry_id: u32, max_len: usize) -> Result<Vec<u8>> {
        self.read_range(entry_id, max_len)
    }
}

/// An in-memory entry list.
///
/// Entries can be appended to model an archive that grows between sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    entries: Vec<Vec<u8>>,
}

impl MemoryArchive {
    /// Creates an archive from entry payloads; entry ids follow vector order.
    pub fn new(entries: Vec<Vec<u8>>) -> Self {
        Self { entries }
    }

    /// Appends an entry and returns its id.
    pub fn push(&mut self, data: impl Into<Vec<u8>>) -> u32 {
        self.entries.push(data.into());
        (self.entries.len() - 1) as u32
    }
}

impl EntrySource for MemoryArchive {
    fn entry_count(&self) -> u32 {
        self.entries.len() as u32
    }

    fn read_entry(&mut self, entry_id: u32) -> Result<Vec<u8>> {
        self.entries
            .get(entry_id as usize)
            .cloned()
            .ok_or(Error::EntryOutOfRange {
                entry_id,
                entry_count: self.entries.len() as u32,
            })
    }

    fn peek_entry(&mut self, entry_id: u32, max_len: usize) -> Result<Vec<u8>> {
        self.entries
            .get(entry_id as usize)
            .map(|data| data[..data.len().min(max_len)].to_vec())
            .ok_or(Error::EntryOutOfRange {
                entry_id,
                entry_count: self.entries.len() as u32,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Lays out header, entry data, then the file table.
    fn build_dat(entries: &[&[u8]]) -> Vec<u8> {
        let mut data = vec![0u8; header::HEADER_SIZE as usize];
        let mut records = Vec::new();
        for (i, payload) in entries.iter().enumerate() {
            records.push((data.len() as u64, payload.len() as u32, i as u16 % 2));
            data.extend_from_slice(payload);
        }

        let mft_offset = data.len() as u64;
        let mft_size =
            (header::MFT_HEADER_SIZE + header::MFT_ENTRY_SIZE * entries.len() as u64) as u32;
        data.extend_from_slice(header::MFT_SIGNATURE);
        data.extend_from_slice(&0u64.to_le_bytes());
        data.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        for (offset, size, compression) in records {
            data.extend_from_slice(&offset.to_le_bytes());
            data.extend_from_slice(&size.to_le_bytes());
            data.extend_from_slice(&compression.to_le_bytes());
            data.extend_from_slice(&0u16.to_le_bytes());
            data.extend_from_slice(&1u32.to_le_bytes());
            data.extend_from_slice(&0u32.to_le_bytes());
        }

        data[0] = 0x97;
        data[1..4].copy_from_slice(header::SIGNATURE);
        data[4..8].copy_from_slice(&header::HEADER_SIZE.to_le_bytes());
        data[24..32].copy_from_slice(&mft_offset.to_le_bytes());
        data[32..36].copy_from_slice(&mft_size.to_le_bytes());
        data
    }

    #[test]
    fn test_open_and_read() {
        let bytes = build_dat(&[b"ATEX0001", b"", b"strs\x02\x00\x00\x00"]);
        let mut archive = DatArchive::open(Cursor::new(bytes)).unwrap();

        assert_eq!(archive.entry_count(), 3);
        assert_eq!(archive.read_entry(0).unwrap(), b"ATEX0001");
        assert!(archive.read_entry(1).unwrap().is_empty());
        assert_eq!(archive.peek_entry(2, 4).unwrap(), b"strs");
        assert!(archive.entry(1).unwrap().is_compressed());
        assert!(!archive.entry(2).unwrap().is_compressed());
    }

    #[test]
    fn test_read_out_of_range() {
        let bytes = build_dat(&[b"abc"]);
        let mut archive = DatArchive::open(Cursor::new(bytes)).unwrap();
        let err = archive.read_entry(1).unwrap_err();
        assert!(matches!(
            err,
            Error::EntryOutOfRange {
                entry_id: 1,
                entry_count: 1
            }
        ));
    }

    #[test]
    fn test_open_empty_archive() {
        let bytes = build_dat(&[]);
        let archive = DatArchive::open(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.entry_count(), 0);
    }

    #[test]
    fn test_open_rejects_small_file() {
        let err = DatArchive::open(Cursor::new(vec![0u8; 10])).unwrap_err();
        assert!(err.is_open_failure());
    }

    #[test]
    fn test_open_rejects_table_overflow() {
        let mut bytes = build_dat(&[b"abc"]);
        // Claim more entries than the table can hold
        let mft_offset = u64::from_le_bytes(bytes[24..32].try_into().unwrap()) as usize;
        bytes[mft_offset + 12..mft_offset + 16].copy_from_slice(&5u32.to_le_bytes());
        let err = DatArchive::open(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { .. }));
    }

    #[test]
    fn test_memory_archive() {
        let mut archive = MemoryArchive::new(vec![b"one".to_vec()]);
        assert_eq!(archive.push(b"two".to_vec()), 1);
        assert_eq!(archive.entry_count(), 2);
        assert_eq!(archive.peek_entry(1, 2).unwrap(), b"tw");
        assert!(archive.read_entry(2).is_err());
    }

    #[test]
    fn test_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.dat");
        std::fs::write(&path, b"x").unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(1_500_000_000, 0)).unwrap();
        assert_eq!(modification_time(&path).unwrap(), 1_500_000_000);
        assert!(modification_time(dir.path().join("missing.dat")).is_err());
    }
}
