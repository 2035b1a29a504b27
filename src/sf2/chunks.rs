//! Low-level RIFF chunk reading helpers.
//!
//! SF2 is a chunked RIFF binary: four-byte big-endian ASCII tags, 32-bit
//! little-endian sizes, little-endian payloads. These helpers read tags
//! and sizes off any `Read + Seek` source and turn a missing or
//! out-of-order required tag into a `SynthError::Format`.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Result, SynthError};

/// Reads a raw four-byte tag.
pub fn read_tag<R: Read>(reader: &mut R) -> Result<[u8; 4]> {
    let mut tag = [0u8; 4];
    reader.read_exact(&mut tag)?;
    Ok(tag)
}

/// Reads a tag and asserts it matches `expected`, else a fatal
/// `SynthError::Format`.
pub fn expect_tag<R: Read>(reader: &mut R, expected: &str) -> Result<()> {
    let tag = read_tag(reader)?;
    if &tag != expected.as_bytes() {
        return Err(SynthError::Format(format!(
            "expected chunk tag '{expected}', found '{}'",
            String::from_utf8_lossy(&tag)
        )));
    }
    Ok(())
}

/// Reads a 32-bit little-endian chunk size.
pub fn read_size<R: Read>(reader: &mut R) -> Result<u32> {
    Ok(reader.read_u32::<LittleEndian>()?)
}

/// Reads a `LIST <size> <list_type>` header, returning the byte offset of
/// the first byte past the list type tag (the start of its contents) and
/// the declared size (which includes the 4-byte list type tag).
pub fn read_list_header<R: Read + Seek>(reader: &mut R, expected_type: &str) -> Result<(u64, u32)> {
    expect_tag(reader, "LIST")?;
    let size = read_size(reader)?;
    let start = reader.stream_position()?;
    expect_tag(reader, expected_type)?;
    Ok((start, size))
}

/// Seeks to `list_start + list_size`, i.e. past any sub-chunks this parser
/// doesn't care about (INFO's optional sub-chunks, sdta's optional `sm24`).
pub fn skip_to_list_end<R: Seek>(reader: &mut R, list_start: u64, list_size: u32) -> Result<()> {
    reader.seek(SeekFrom::Start(list_start + list_size as u64))?;
    Ok(())
}

/// Reads and discards `len` bytes by seeking forward.
pub fn skip<R: Seek>(reader: &mut R, len: u32) -> Result<()> {
    reader.seek(SeekFrom::Current(len as i64))?;
    Ok(())
}

/// Reads a fixed-size ASCII field, trimming trailing NUL padding.
pub fn read_fixed_ascii<R: Read>(reader: &mut R, len: usize) -> Result<String> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}
