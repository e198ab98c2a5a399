//! Archive header and master file table parsing.

use std::io::{Read, Seek, SeekFrom};

use crate::encoding::{read_u8, read_u16_le, read_u32_le, read_u64_le};
use crate::{Error, Result};

/// Archive signature following the version byte.
pub const SIGNATURE: &[u8; 3] = b"AN\x1A";

/// Master file table signature.
pub const MFT_SIGNATURE: &[u8; 4] = b"Mft\x1A";

/// Size of the fixed archive header in bytes.
pub const HEADER_SIZE: u32 = 40;

/// Size of the master file table header in bytes.
pub const MFT_HEADER_SIZE: u64 = 24;

/// Size of one master file table record in bytes.
pub const MFT_ENTRY_SIZE: u64 = 24;

/// The fixed header at the start of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatHeader {
    /// Format version byte.
    pub version: u8,
    /// Declared header size (at least [`HEADER_SIZE`]).
    pub header_size: u32,
    /// Allocation chunk size used by the writer.
    pub chunk_size: u32,
    /// Header checksum as stored; not verified.
    pub crc: u32,
    /// Absolute offset of the master file table.
    pub mft_offset: u64,
    /// Size of the master file table in bytes.
    pub mft_size: u32,
    /// Archive flags.
    pub flags: u32,
}

/// One record of the master file table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MftEntry {
    /// Absolute offset of the entry data.
    pub offset: u64,
    /// Stored size of the entry data in bytes.
    pub size: u32,
    /// Non-zero when the stored bytes are compressed.
    pub compression: u16,
    /// Entry flags.
    pub flags: u16,
    /// Revision counter.
    pub counter: u32,
    /// Checksum of the stored bytes as recorded by the writer.
    pub crc: u32,
}

impl MftEntry {
    /// Returns `true` if the stored bytes are compressed.
    pub fn is_compressed(&self) -> bool {
        self.compression != 0
    }
}

/// Reads and validates the archive header.
pub fn read_header<R: Read>(r: &mut R) -> Result<DatHeader> {
    let version = read_u8(r)?;
    let mut magic = [0u8; 3];
    r.read_exact(&mut magic)?;
    if &magic != SIGNATURE {
        return Err(Error::InvalidArchive(format!(
            "missing archive signature (found {:02x?})",
            magic
        )));
    }

    let header_size = read_u32_le(r)?;
    let _unknown = read_u32_le(r)?;
    let chunk_size = read_u32_le(r)?;
    let crc = read_u32_le(r)?;
    let _unknown = read_u32_le(r)?;
    let mft_offset = read_u64_le(r)?;
    let mft_size = read_u32_le(r)?;
    let flags = read_u32_le(r)?;

    if header_size < HEADER_SIZE {
        return Err(Error::corrupt_header(
            4,
            format!("header size {} smaller than {}", header_size, HEADER_SIZE),
        ));
    }

    Ok(DatHeader {
        version,
        header_size,
        chunk_size,
        crc,
        mft_offset,
        mft_size,
        flags,
    })
}

/// Reads the master file table described by `header`.
///
/// Every record must describe a byte range inside a file of `file_len` bytes.
pub fn read_mft<R: Read + Seek>(
    r: &mut R,
    header: &DatHeader,
    file_len: u64,
) -> Result<Vec<MftEntry>> {
    let mft_end = header
        .mft_offset
        .checked_add(header.mft_size as u64)
        .filter(|&end| end <= file_len)
        .ok_or_else(|| {
            Error::corrupt_header(
                header.mft_offset,
                format!(
                    "file table ({} bytes) extends past end of file ({} bytes)",
                    header.mft_size, file_len
                ),
            )
        })?;
    if (header.mft_size as u64) < MFT_HEADER_SIZE {
        return Err(Error::corrupt_header(
            header.mft_offset,
            "file table too small for its header",
        ));
    }

    r.seek(SeekFrom::Start(header.mft_offset))?;
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MFT_SIGNATURE {
        return Err(Error::corrupt_header(
            header.mft_offset,
            "missing file table signature",
        ));
    }
    let _unknown = read_u64_le(r)?;
    let entry_count = read_u32_le(r)?;
    let _unknown = read_u64_le(r)?;

    let needed = MFT_HEADER_SIZE + MFT_ENTRY_SIZE * entry_count as u64;
    if needed > header.mft_size as u64 {
        return Err(Error::corrupt_header(
            header.mft_offset + 12,
            format!(
                "{} entries do not fit in a {} byte file table",
                entry_count, header.mft_size
            ),
        ));
    }

    let mut entries = Vec::with_capacity(entry_count as usize);
    for index in 0..entry_count as u64 {
        let record_offset = header.mft_offset + MFT_HEADER_SIZE + index * MFT_ENTRY_SIZE;
        let entry = MftEntry {
            offset: read_u64_le(r)?,
            size: read_u32_le(r)?,
            compression: read_u16_le(r)?,
            flags: read_u16_le(r)?,
            counter: read_u32_le(r)?,
            crc: read_u32_le(r)?,
        };
        let in_bounds = entry
            .offset
            .checked_add(entry.size as u64)
            .is_some_and(|end| end <= file_len);
        if !in_bounds {
            return Err(Error::corrupt_header(
                record_offset,
                format!(
                    "entry {} data ({} bytes at {:#x}) extends past end of file",
                    index, entry.size, entry.offset
                ),
            ));
        }
        entries.push(entry);
    }

    log::debug!(
        "read file table at {:#x}..{:#x} with {} entries",
        header.mft_offset,
        mft_end,
        entries.len()
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_bytes(mft_offset: u64, mft_size: u32) -> Vec<u8> {
        let mut out = vec![0x97];
        out.extend_from_slice(SIGNATURE);
        out.extend_from_slice(&HEADER_SIZE.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0x200u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&mft_offset.to_le_bytes());
        out.extend_from_slice(&mft_size.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out
    }

    #[test]
    fn test_read_header() {
        let bytes = header_bytes(0x100, 48);
        let header = read_header(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(header.version, 0x97);
        assert_eq!(header.chunk_size, 0x200);
        assert_eq!(header.mft_offset, 0x100);
        assert_eq!(header.mft_size, 48);
    }

    #[test]
    fn test_read_header_bad_signature() {
        let mut bytes = header_bytes(0x100, 48);
        bytes[1] = b'7';
        let err = read_header(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, Error::InvalidArchive(_)));
    }

    #[test]
    fn test_read_header_truncated() {
        let bytes = header_bytes(0x100, 48);
        let err = read_header(&mut Cursor::new(&bytes[..20])).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_read_mft_past_end_of_file() {
        let bytes = header_bytes(0x100, 48);
        let header = read_header(&mut Cursor::new(&bytes)).unwrap();
        let err = read_mft(&mut Cursor::new(&bytes), &header, bytes.len() as u64).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { offset: 0x100, .. }));
    }

    #[test]
    fn test_read_mft_entry_out_of_bounds() {
        let mut bytes = header_bytes(40, 48);
        bytes.extend_from_slice(MFT_SIGNATURE);
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        // One record pointing far past the end of the file
        bytes.extend_from_slice(&0x1000u64.to_le_bytes());
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 12]);

        let header = read_header(&mut Cursor::new(&bytes)).unwrap();
        let err = read_mft(&mut Cursor::new(&bytes), &header, bytes.len() as u64).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { offset: 64, .. }));
    }
}
