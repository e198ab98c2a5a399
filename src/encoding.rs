//! Low-level binary encoding helpers for archive headers and the index cache.
//!
//! Fixed-width integers are little-endian. Counts and ids in the cache file
//! use a variable-length prefix encoding where the high bits of the first
//! byte announce how many extra bytes follow:
//!
//! - `0xxxxxxx` (1 byte): value 0-127
//! - `10xxxxxx` + 1 byte: value 0-16383
//! - `110xxxxx` + 2 bytes: value 0-2097151
//! - And so on...
//! - `11111111` + 8 bytes: full u64

use std::io::{self, Read, Write};

/// Longest string the cache format accepts (category and entry names).
pub(crate) const MAX_STRING_LEN: u64 = 64 * 1024;

/// Reads a variable-length encoded u64.
pub fn read_variable_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let first = read_u8(r)? as u64;

    let mut mask = 0x80u64;
    let mut value = 0u64;

    for i in 0..8 {
        if (first & mask) == 0 {
            return Ok(value | ((first & (mask - 1)) << (8 * i)));
        }
        let byte = read_u8(r)?;
        value |= (byte as u64) << (8 * i);
        mask >>= 1;
    }

    Ok(value)
}

/// Writes a variable-length encoded u64.
///
/// This is the inverse of [`read_variable_u64`] and always picks the
/// shortest encoding.
pub fn write_variable_u64<W: Write>(w: &mut W, value: u64) -> io::Result<()> {
    // Number of extra bytes needed after the prefix byte.
    let mut extra = 0usize;
    while extra < 8 {
        let payload_bits = 8 * extra + (7 - extra);
        if payload_bits >= 64 || value < (1u64 << payload_bits) {
            break;
        }
        extra += 1;
    }

    let mut out = [0u8; 9];
    if extra == 8 {
        out[0] = 0xFF;
    } else {
        let prefix = !(0xFFu8 >> extra);
        let high = (value >> (8 * extra)) as u8;
        out[0] = prefix | high;
    }
    for (i, byte) in out[1..=extra].iter_mut().enumerate() {
        *byte = (value >> (8 * i)) as u8;
    }
    w.write_all(&out[..=extra])
}

/// Reads a single byte.
pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads an unsigned 16-bit little-endian integer.
pub fn read_u16_le<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Reads an unsigned 32-bit little-endian integer.
pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Reads an unsigned 64-bit little-endian integer.
pub fn read_u64_le<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Reads a length-prefixed UTF-8 string.
pub fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = read_variable_u64(r)?;
    if len > MAX_STRING_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("string length {} exceeds limit", len),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Writes a length-prefixed UTF-8 string.
pub fn write_string<W: Write>(w: &mut W, value: &str) -> io::Result<()> {
    write_variable_u64(w, value.len() as u64)?;
    w.write_all(value.as_bytes())
}

/// Reads a little-endian u16 from a slice at `offset`, if in bounds.
pub(crate) fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

/// Reads a little-endian u32 from a slice at `offset`, if in bounds.
pub(crate) fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}
