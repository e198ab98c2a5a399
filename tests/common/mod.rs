//! Shared test utilities for integration tests.
//!
//! Builds synthetic archives in the on-disk layout `DatArchive` reads, plus
//! entry payloads for each content type the classifier knows.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use datscope::IndexerConfig;
use filetime::FileTime;

/// Serializes entry payloads into an archive image.
///
/// Layout: 40-byte header, the payloads back to back, then the file table.
pub fn build_archive(entries: &[Vec<u8>]) -> Vec<u8> {
    let data_len: usize = entries.iter().map(Vec::len).sum();
    let mft_offset = 40 + data_len as u64;
    let mft_size = 24 + 24 * entries.len() as u32;

    let mut out = vec![0x97];
    out.extend_from_slice(b"AN\x1A");
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0x200u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&mft_offset.to_le_bytes());
    out.extend_from_slice(&mft_size.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    assert_eq!(out.len(), 40);

    let mut offsets = Vec::with_capacity(entries.len());
    for entry in entries {
        offsets.push(out.len() as u64);
        out.extend_from_slice(entry);
    }

    out.extend_from_slice(b"Mft\x1A");
    out.extend_from_slice(&0u64.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes());
    for (entry, offset) in entries.iter().zip(offsets) {
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&(entry.len() as u32).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
    }
    out
}

/// Writes an archive file and sets its modification time.
pub fn write_archive(path: &Path, entries: &[Vec<u8>], mtime: i64) {
    std::fs::write(path, build_archive(entries)).expect("Failed to write archive");
    set_mtime(path, mtime);
}

/// Sets a file's modification time in Unix seconds.
pub fn set_mtime(path: &Path, mtime: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(mtime, 0))
        .expect("Failed to set modification time");
}

/// A temp dir holding an archive and a cache directory.
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub archive: PathBuf,
    pub cache_dir: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let archive = dir.path().join("Gw2.dat");
        let cache_dir = dir.path().join("cache");
        Self {
            dir,
            archive,
            cache_dir,
        }
    }

    pub fn config(&self) -> IndexerConfig {
        IndexerConfig::new().cache_dir(&self.cache_dir)
    }
}

/// A pack file header with the given chunk type.
pub fn pack_file(chunk: &[u8; 4]) -> Vec<u8> {
    let mut data = b"PF\x01\x00\x00\x00\x0c\x00".to_vec();
    data.extend_from_slice(chunk);
    data.extend_from_slice(&[0u8; 8]);
    data
}

/// An ANet texture header.
pub fn texture(container: &[u8; 4], format: &[u8; 4], width: u16, height: u16) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(container);
    data.extend_from_slice(format);
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(&[0u8; 16]);
    data
}

/// A string table with `count` entries.
pub fn string_table(count: u32) -> Vec<u8> {
    let mut data = b"strs".to_vec();
    data.extend_from_slice(&count.to_le_bytes());
    data
}

/// A proprietary audio container.
pub fn asnd(payload_len: u32) -> Vec<u8> {
    let mut data = b"asnd".to_vec();
    data.extend_from_slice(&payload_len.to_le_bytes());
    data.extend_from_slice(&[0u8; 8]);
    data
}

/// A mix of every content type, `n` entries long.
pub fn mixed_entries(n: usize) -> Vec<Vec<u8>> {
    (0..n)
        .map(|i| match i % 6 {
            0 => pack_file(b"MODL"),
            1 => texture(b"ATEX", b"DXT5", 256, 256),
            2 => string_table(i as u32),
            3 => asnd(64),
            4 => pack_file(b"ABNK"),
            _ => format!("opaque entry {}", i).into_bytes(),
        })
        .collect()
}
