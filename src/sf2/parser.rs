//! SF2 RIFF parser.
//!
//! Reads the chunk structure in the exact order the SoundFont 2 format
//! lays it out (INFO, sdta, pdta and its nine sub-chunks), validates the
//! fixed-size chunks, and returns sentinel-terminated tables of sample
//! headers, instruments, instrument bags, and instrument generators. PCM
//! bytes are never read here — only `sdta_offset` and the frame count
//! are recorded.

use std::io::{Read, Seek};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, trace};

use crate::diagnostics;
use crate::error::{Result, SynthError};

use super::chunks::{expect_tag, read_fixed_ascii, read_list_header, read_size, skip, skip_to_list_end};
use super::generator::{GenAmount, Generator, GeneratorType};
use super::types::{Bag, RawInstrument, SampleHdr, SoundFont};

pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<SoundFont> {
    expect_tag(reader, "RIFF")?;
    let _riff_size = read_size(reader)?;
    expect_tag(reader, "sfbk")?;

    parse_info(reader)?;
    let (sdta_offset, sample_frame_count) = parse_sdta(reader)?;
    let (instruments, instrument_bags, instrument_generators, sample_headers) =
        parse_pdta(reader, sample_frame_count)?;

    Ok(SoundFont {
        sample_headers,
        instruments,
        instrument_bags,
        instrument_generators,
        sdta_offset,
        sample_frame_count,
    })
}

fn parse_info<R: Read + Seek>(reader: &mut R) -> Result<()> {
    let (info_start, info_size) = read_list_header(reader, "INFO")?;

    expect_tag(reader, "ifil")?;
    let ifil_size = read_size(reader)?;
    if ifil_size != 4 {
        return Err(SynthError::Format(format!(
            "ifil chunk has size {ifil_size}, expected 4"
        )));
    }
    let major = reader.read_u16::<LittleEndian>()?;
    let minor = reader.read_u16::<LittleEndian>()?;
    debug!("SoundFont version {major}.{minor}");
    if major != 2 {
        diagnostics::warn(format!("SoundFont is not version 2, but version {major}"));
    }

    expect_tag(reader, "isng")?;
    let isng_size = read_size(reader)?;
    let engine = read_fixed_ascii(reader, isng_size as usize)?;
    debug!("optimized for engine '{engine}'");

    expect_tag(reader, "INAM")?;
    let inam_size = read_size(reader)?;
    let name = read_fixed_ascii(reader, inam_size as usize)?;
    debug!("sound bank name '{name}'");

    // Any other optional INFO sub-chunks (ICRD, ICMT, IENG, ...) are
    // skipped wholesale by jumping to the end of the LIST.
    skip_to_list_end(reader, info_start, info_size)?;
    Ok(())
}

fn parse_sdta<R: Read + Seek>(reader: &mut R) -> Result<(u64, u32)> {
    let (sdta_start, sdta_size) = read_list_header(reader, "sdta")?;

    expect_tag(reader, "smpl")?;
    let smpl_size = read_size(reader)?;
    let sdta_offset = reader.stream_position()?;
    let sample_frame_count = smpl_size / 2;
    debug!("sdta: {sample_frame_count} 16-bit frames at offset {sdta_offset}");

    // Don't read the PCM; skip past smpl (and any optional sm24 24-bit
    // extension chunk) to the end of the sdta LIST.
    skip_to_list_end(reader, sdta_start, sdta_size)?;
    Ok((sdta_offset, sample_frame_count))
}

type Pdta = (Vec<RawInstrument>, Vec<Bag>, Vec<Generator>, Vec<SampleHdr>);

fn parse_pdta<R: Read + Seek>(reader: &mut R, sample_frame_count: u32) -> Result<Pdta> {
    read_list_header(reader, "pdta")?;

    // phdr/pbag/pmod/pgen: preset-level metadata, entirely out of scope
    // for this engine, but still chunk-validated since a malformed
    // header here means a malformed file.
    expect_tag(reader, "phdr")?;
    let phdr_size = read_size(reader)?;
    if phdr_size % 38 != 0 {
        return Err(SynthError::Format(format!(
            "phdr size {phdr_size} is not a multiple of 38"
        )));
    }
    skip(reader, phdr_size)?;

    expect_tag(reader, "pbag")?;
    let pbag_size = read_size(reader)?;
    skip(reader, pbag_size)?;

    expect_tag(reader, "pmod")?;
    let pmod_size = read_size(reader)?;
    skip(reader, pmod_size)?;

    expect_tag(reader, "pgen")?;
    let pgen_size = read_size(reader)?;
    skip(reader, pgen_size)?;

    // inst
    expect_tag(reader, "inst")?;
    let inst_size = read_size(reader)?;
    if inst_size % 22 != 0 {
        return Err(SynthError::Format(format!(
            "inst size {inst_size} is not a multiple of 22"
        )));
    }
    let n_inst = inst_size / 22;
    let mut instruments = Vec::with_capacity(n_inst as usize);
    for _ in 0..n_inst {
        let name = read_fixed_ascii(reader, 20)?;
        let bag_index = reader.read_u16::<LittleEndian>()?;
        instruments.push(RawInstrument { name, bag_index });
    }

    // ibag
    expect_tag(reader, "ibag")?;
    let ibag_size = read_size(reader)?;
    if ibag_size % 4 != 0 {
        return Err(SynthError::Format(format!(
            "ibag size {ibag_size} is not a multiple of 4"
        )));
    }
    let n_ibag = ibag_size / 4;
    let mut instrument_bags = Vec::with_capacity(n_ibag as usize);
    for _ in 0..n_ibag {
        let gen_index = reader.read_u16::<LittleEndian>()?;
        let mod_index = reader.read_u16::<LittleEndian>()?;
        instrument_bags.push(Bag { gen_index, mod_index });
    }

    // imod
    expect_tag(reader, "imod")?;
    let imod_size = read_size(reader)?;
    skip(reader, imod_size)?;

    // igen
    expect_tag(reader, "igen")?;
    let igen_size = read_size(reader)?;
    if igen_size % 4 != 0 {
        return Err(SynthError::Format(format!(
            "igen size {igen_size} is not a multiple of 4"
        )));
    }
    let n_igen = igen_size / 4;
    let mut instrument_generators = Vec::with_capacity(n_igen as usize);
    for _ in 0..n_igen {
        let oper = reader.read_u16::<LittleEndian>()?;
        let mut amount = [0u8; 2];
        reader.read_exact(&mut amount)?;
        let generator = Generator { oper, amount: GenAmount(amount) };
        trace!(
            "generator {}: {:?}",
            GeneratorType::from_oper(oper).name(),
            generator.amount.0
        );
        instrument_generators.push(generator);
    }

    // shdr
    expect_tag(reader, "shdr")?;
    let shdr_size = read_size(reader)?;
    if shdr_size % 46 != 0 {
        return Err(SynthError::Format(format!(
            "shdr size {shdr_size} is not a multiple of 46"
        )));
    }
    let n_shdr = shdr_size / 46;
    let mut sample_headers = Vec::with_capacity(n_shdr as usize);
    for i in 0..n_shdr {
        let name = read_fixed_ascii(reader, 20)?;
        let start = reader.read_u32::<LittleEndian>()?;
        let end = reader.read_u32::<LittleEndian>()?;
        let start_loop = reader.read_u32::<LittleEndian>()?;
        let end_loop = reader.read_u32::<LittleEndian>()?;
        let sample_rate = reader.read_u32::<LittleEndian>()?;
        // The raw MIDI root-key byte here is not used: root pitch comes
        // from the instrument zone's overridingRootKey generator (or the
        // key range midpoint), not from the sample header.
        let _original_pitch = reader.read_u8()?;
        let pitch_correction = reader.read_i8()?;
        let _sample_link = reader.read_u16::<LittleEndian>()?;
        let _sample_type = reader.read_u16::<LittleEndian>()?;

        let is_sentinel = i == n_shdr - 1;
        if !is_sentinel {
            if end >= sample_frame_count || start >= end {
                return Err(SynthError::SampleRange {
                    name,
                    start,
                    end,
                    total: sample_frame_count,
                });
            }
            if pitch_correction != 0 {
                diagnostics::warn(format!(
                    "sample '{name}' has pitch correction {pitch_correction}, ignoring"
                ));
            }
        }

        sample_headers.push(SampleHdr {
            name,
            start,
            count: end.saturating_sub(start),
            start_loop,
            end_loop,
            sample_rate,
        });
    }

    Ok((instruments, instrument_bags, instrument_generators, sample_headers))
}


#[cfg(test)]
mod tests {
    use super::fixtures::{build_sf2, SampleSpec};
    use super::*;
    use std::io::Cursor;

    fn simple_font() -> Vec<u8> {
        let samples = vec![
            SampleSpec { name: "Low", frames: vec![100; 1000], root_key: 40, sample_rate: 44100 },
            SampleSpec { name: "High", frames: vec![200; 1000], root_key: 80, sample_rate: 44100 },
        ];
        let zones = vec![(0u8, 63u8, 0i16, 0u16, None), (64u8, 127u8, 0i16, 1u16, None)];
        build_sf2(&samples, &zones)
    }

    #[test]
    fn parses_minimal_valid_font() {
        let bytes = simple_font();
        let mut cursor = Cursor::new(bytes);
        let font = parse(&mut cursor).expect("should parse");

        assert_eq!(font.instrument_count(), 1);
        assert_eq!(font.sample_headers.len(), 3); // 2 real + sentinel
        assert_eq!(font.sample_frame_count, 2000);
    }

    #[test]
    fn reparsing_is_deterministic() {
        let bytes = simple_font();
        let mut c1 = Cursor::new(bytes.clone());
        let mut c2 = Cursor::new(bytes);
        let f1 = parse(&mut c1).unwrap();
        let f2 = parse(&mut c2).unwrap();

        assert_eq!(f1.instrument_count(), f2.instrument_count());
        assert_eq!(f1.instrument_bags.len(), f2.instrument_bags.len());
        assert_eq!(f1.instrument_generators.len(), f2.instrument_generators.len());
        assert_eq!(
            f1.sample_headers.iter().map(|s| s.start).collect::<Vec<_>>(),
            f2.sample_headers.iter().map(|s| s.start).collect::<Vec<_>>()
        );
    }

    #[test]
    fn rejects_bad_ifil_size() {
        let mut bytes = simple_font();
        // ifil size field lives right after "RIFF<size>sfbkLISTxxxxINFOifil"
        let pos = bytes.windows(4).position(|w| w == b"ifil").unwrap() + 4;
        bytes[pos..pos + 4].copy_from_slice(&3u32.to_le_bytes());
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(parse(&mut cursor), Err(SynthError::Format(_))));
    }

    #[test]
    fn rejects_sample_end_past_total_frames() {
        let samples = vec![SampleSpec {
            name: "Bad",
            frames: vec![1; 10],
            root_key: 60,
            sample_rate: 44100,
        }];
        let zones = vec![(0u8, 127u8, 0i16, 0u16, None)];
        let mut bytes = build_sf2(&samples, &zones);
        // Corrupt the sample header's "end" field to exceed the pool size.
        let shdr_pos = bytes.windows(4).rposition(|w| w == b"shdr").unwrap() + 8;
        let bad_end = 9000u32;
        bytes[shdr_pos + 24..shdr_pos + 28].copy_from_slice(&bad_end.to_le_bytes());
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(parse(&mut cursor), Err(SynthError::SampleRange { .. })));
    }
}
