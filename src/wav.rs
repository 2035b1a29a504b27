//! Recording container.
//!
//! A minimal canonical RIFF `WAVE` file: 44-byte header, interleaved
//! signed 16-bit stereo frames. The two size fields are written as zero
//! on open and patched in place when the recording stops. The `fmt `
//! chunk uses the canonical field order (`audio_format`, `channels`,
//! `sample_rate`, `byte_rate`, `block_align`, `bits_per_sample`).

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::diagnostics;
use crate::error::Result;

/// Soft cap on recording size; once reached, further writes are
/// suppressed and a warning is logged once.
pub const DEFAULT_CAP_BYTES: u64 = 4 * 1024 * 1024 * 1024;

pub struct Recording {
    file: File,
    path: PathBuf,
    sample_rate: u32,
    frames_written: u64,
    cap_bytes: u64,
    cap_warned: bool,
}

impl Recording {
    pub fn create(path: impl Into<PathBuf>, sample_rate: u32) -> Result<Recording> {
        Self::create_with_cap(path, sample_rate, DEFAULT_CAP_BYTES)
    }

    pub fn create_with_cap(path: impl Into<PathBuf>, sample_rate: u32, cap_bytes: u64) -> Result<Recording> {
        let path = path.into();
        let mut file = File::create(&path)?;
        write_header(&mut file, sample_rate)?;
        Ok(Recording {
            file,
            path,
            sample_rate,
            frames_written: 0,
            cap_bytes,
            cap_warned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Appends interleaved `[L, R, L, R, ...]` 16-bit stereo frames.
    /// Bytes written always equal `frames * 4` since only whole stereo
    /// frames are accepted.
    pub fn write_frames(&mut self, interleaved: &[i16]) {
        debug_assert_eq!(interleaved.len() % 2, 0, "interleaved stereo data must come in pairs");
        let frame_count = (interleaved.len() / 2) as u64;
        let bytes = frame_count * 4;

        if self.bytes_written().saturating_add(bytes) >= self.cap_bytes {
            if !self.cap_warned {
                diagnostics::warn(
                    "recording has reached the 4 GiB size cap; further audio will not be written",
                );
                self.cap_warned = true;
            }
            return;
        }

        for sample in interleaved {
            // A write error here can't propagate without breaking the
            // real-time render loop's API; best effort, matches the
            // reference implementation's unchecked `fwrite`.
            let _ = self.file.write_i16::<LittleEndian>(*sample);
        }
        self.frames_written += frame_count;
    }

    fn bytes_written(&self) -> u64 {
        self.frames_written * 4
    }

    /// Patches the RIFF and `data` chunk sizes and closes the file.
    pub fn close(mut self) -> Result<()> {
        let data_bytes = self.bytes_written() as u32;
        let riff_size = data_bytes + 36;

        self.file.seek(SeekFrom::Start(4))?;
        self.file.write_u32::<LittleEndian>(riff_size)?;
        self.file.seek(SeekFrom::Start(40))?;
        self.file.write_u32::<LittleEndian>(data_bytes)?;
        self.file.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Recording {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recording")
            .field("path", &self.path)
            .field("sample_rate", &self.sample_rate)
            .field("frames_written", &self.frames_written)
            .finish()
    }
}

fn write_header(file: &mut File, sample_rate: u32) -> Result<()> {
    file.write_all(b"RIFF")?;
    file.write_u32::<LittleEndian>(0)?; // patched at close
    file.write_all(b"WAVE")?;

    file.write_all(b"fmt ")?;
    file.write_u32::<LittleEndian>(16)?; // fmt chunk size
    file.write_u16::<LittleEndian>(1)?; // audio_format = PCM
    file.write_u16::<LittleEndian>(2)?; // channels
    file.write_u32::<LittleEndian>(sample_rate)?;
    file.write_u32::<LittleEndian>(sample_rate * 4)?; // byte_rate
    file.write_u16::<LittleEndian>(4)?; // block_align
    file.write_u16::<LittleEndian>(16)?; // bits_per_sample

    file.write_all(b"data")?;
    file.write_u32::<LittleEndian>(0)?; // patched at close

    debug_assert_eq!(file.stream_position()?, 44);
    Ok(())
}

/// Picks the lowest-numbered unused `out-NN.wav` filename in `dir`.
pub fn next_recording_path(dir: &Path) -> PathBuf {
    for i in 1u32.. {
        let candidate = dir.join(format!("out-{i:02}.wav"));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!("u32 space exhausted")
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ReadBytesExt;
    use std::io::Read;

    #[test]
    fn s4_header_and_trailer_sizes_match_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out-01.wav");

        let mut rec = Recording::create(&path, 44100).unwrap();
        let frames = vec![1000i16; 44100 * 2 * 2]; // 2 seconds of stereo frames
        rec.write_frames(&frames);
        let written = rec.frames_written();
        rec.close().unwrap();

        assert_eq!(written, 44100 * 2);

        let mut file = File::open(&path).unwrap();
        let filesize = file.metadata().unwrap().len();

        let mut tag = [0u8; 4];
        file.read_exact(&mut tag).unwrap();
        assert_eq!(&tag, b"RIFF");
        let riff_size = file.read_u32::<LittleEndian>().unwrap();
        assert_eq!(riff_size as u64, filesize - 8);

        file.seek(SeekFrom::Start(36)).unwrap();
        file.read_exact(&mut tag).unwrap();
        assert_eq!(&tag, b"data");
        let data_size = file.read_u32::<LittleEndian>().unwrap();
        assert_eq!(data_size as u64, filesize - 44);
        assert_eq!(data_size, written as u32 * 4);
    }

    #[test]
    fn fmt_chunk_uses_canonical_field_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out-01.wav");
        Recording::create(&path, 48000).unwrap().close().unwrap();

        let mut file = File::open(&path).unwrap();
        file.seek(SeekFrom::Start(20)).unwrap();
        let audio_format = file.read_u16::<LittleEndian>().unwrap();
        let channels = file.read_u16::<LittleEndian>().unwrap();
        let sample_rate = file.read_u32::<LittleEndian>().unwrap();
        let byte_rate = file.read_u32::<LittleEndian>().unwrap();
        let block_align = file.read_u16::<LittleEndian>().unwrap();
        let bits_per_sample = file.read_u16::<LittleEndian>().unwrap();

        assert_eq!(audio_format, 1);
        assert_eq!(channels, 2);
        assert_eq!(sample_rate, 48000);
        assert_eq!(byte_rate, 48000 * 4);
        assert_eq!(block_align, 4);
        assert_eq!(bits_per_sample, 16);
    }

    #[test]
    fn cap_suppresses_further_writes_once_reached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out-01.wav");
        let mut rec = Recording::create_with_cap(&path, 44100, 100).unwrap();

        rec.write_frames(&[1, 1, 2, 2]); // 16 bytes, under cap
        let written_before = rec.frames_written();
        rec.write_frames(&[3, 3, 4, 4, 5, 5]); // would push past 100 bytes
        assert_eq!(rec.frames_written(), written_before);
    }

    #[test]
    fn next_recording_path_finds_lowest_free_name() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("out-01.wav")).unwrap();
        let path = next_recording_path(dir.path());
        assert_eq!(path.file_name().unwrap(), "out-02.wav");
    }
}
