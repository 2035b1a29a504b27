//! Instrument loading.
//!
//! Walks one instrument's generator zones, resolves each to a sample
//! region, reads its PCM on demand, and assembles the 256-slot
//! pitch × channel lookup table (`2k` = left channel for MIDI note `k`,
//! `2k+1` = right) that the audio render loop indexes directly.

use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;

use crate::diagnostics;
use crate::error::{Result, SynthError};
use crate::sf2::generator::GeneratorType;
use crate::sf2::types::SoundFont;

/// One resolved PCM region, shared (via `Arc`) by every note slot and
/// channel that maps to it.
#[derive(Debug)]
pub struct Samples {
    pub original_sample_rate: u32,
    pub original_midi_pitch: u8,
    pub frame_count: u32,
    pub pcm: Vec<i16>,
}

/// A loaded instrument: name plus a populated 256-entry sample table.
pub struct LoadedInstrument {
    pub name: String,
    samples: Vec<Arc<Samples>>, // len 256, invariant: every entry populated once `loaded`
    pub loaded: bool,
}

impl LoadedInstrument {
    /// The left/right sample pair for MIDI note `note` (0..128).
    pub fn channels(&self, note: u8) -> (&Arc<Samples>, &Arc<Samples>) {
        let n = note as usize;
        (&self.samples[2 * n], &self.samples[2 * n + 1])
    }
}

struct Zone {
    key_lo: u8,
    key_hi: u8,
    pan: i16,
    sample_id: u16,
    root_key: u8,
}

fn resolve_zone(font: &SoundFont, gen_lo: usize, gen_hi: usize, inst_name: &str) -> Option<Zone> {
    let mut key_lo: u8 = 1;
    let mut key_hi: u8 = 0;
    let mut pan: i16 = 0;
    let mut sample_id: u16 = 0;
    let mut root_key: Option<u8> = None;

    for gen in &font.instrument_generators[gen_lo..gen_hi] {
        match GeneratorType::from_oper(gen.oper) {
            GeneratorType::KeyRange => {
                let (lo, hi) = gen.amount.range();
                key_lo = lo;
                key_hi = hi;
            }
            GeneratorType::Pan => pan = gen.amount.as_i16(),
            GeneratorType::SampleId => sample_id = gen.amount.as_u16(),
            GeneratorType::OverridingRootKey => root_key = Some(gen.amount.as_u16() as u8),
            _ => {}
        }
    }

    // An empty key range means this zone contributes nothing; skip it.
    if key_lo > key_hi {
        return None;
    }

    let root_key = root_key.unwrap_or_else(|| {
        diagnostics::warn(format!(
            "root key not specified for instrument '{inst_name}', guessing from key range"
        ));
        (key_lo + key_hi) / 2
    });

    Some(Zone { key_lo, key_hi, pan, sample_id, root_key })
}

pub fn load_instrument<R: Read + Seek>(
    reader: &mut R,
    font: &SoundFont,
    instrument_index: usize,
) -> Result<LoadedInstrument> {
    let count = font.instrument_count();
    if count == 0 {
        return Err(SynthError::NoInstruments);
    }
    if instrument_index >= count {
        return Err(SynthError::InstrumentIndex { index: instrument_index, count });
    }

    let name = font.instruments[instrument_index].name.clone();
    let (bag_lo, bag_hi) = font.instrument_bag_range(instrument_index);

    let mut samples: Vec<Option<Arc<Samples>>> = vec![None; 256];

    for bag in bag_lo..bag_hi {
        let (gen_lo, gen_hi) = font.bag_generator_range(bag);
        let Some(zone) = resolve_zone(font, gen_lo, gen_hi, &name) else {
            continue;
        };

        let hdr = font.sample_headers.get(zone.sample_id as usize).ok_or_else(|| {
            SynthError::Format(format!(
                "zone references sample id {} but SoundFont only has {} samples",
                zone.sample_id,
                font.sample_headers.len()
            ))
        })?;

        let loaded = read_samples(reader, font, hdr, zone.root_key)?;
        let loaded = Arc::new(loaded);

        for k in zone.key_lo..=zone.key_hi {
            let idx = k as usize;
            if zone.pan <= 0 {
                samples[2 * idx] = Some(Arc::clone(&loaded));
            }
            if zone.pan >= 0 {
                samples[2 * idx + 1] = Some(Arc::clone(&loaded));
            }
        }
    }

    fill_gaps(&mut samples, &name)?;
    fix_channel_rate_mismatch(&mut samples);

    let samples: Vec<Arc<Samples>> = samples.into_iter().map(|s| s.expect("gap fill guarantees Some")).collect();

    debug!("loaded instrument '{name}' ({} bags)", bag_hi - bag_lo);

    Ok(LoadedInstrument { name, samples, loaded: true })
}

fn read_samples<R: Read + Seek>(
    reader: &mut R,
    font: &SoundFont,
    hdr: &crate::sf2::types::SampleHdr,
    root_key: u8,
) -> Result<Samples> {
    let byte_offset = font.sdta_offset + (hdr.start as u64) * 2;
    reader.seek(SeekFrom::Start(byte_offset))?;

    let mut pcm = vec![0i16; hdr.count as usize];
    reader.read_i16_into::<LittleEndian>(&mut pcm)?;

    Ok(Samples {
        original_sample_rate: hdr.sample_rate,
        original_midi_pitch: root_key,
        frame_count: hdr.count,
        pcm,
    })
}

/// Two-pass gap fill: mirror across channels first, then forward-fill.
fn fill_gaps(samples: &mut [Option<Arc<Samples>>], inst_name: &str) -> Result<()> {
    // Pass 1: mirror a lone populated channel onto its sibling.
    for k in 0..128 {
        let l = 2 * k;
        let r = 2 * k + 1;
        match (samples[l].is_some(), samples[r].is_some()) {
            (true, false) => {
                diagnostics::warn(format!("missing right channel for note {k}, using left"));
                samples[r] = samples[l].clone();
            }
            (false, true) => {
                diagnostics::warn(format!("missing left channel for note {k}, using right"));
                samples[l] = samples[r].clone();
            }
            _ => {}
        }
    }

    // Pass 2: forward-fill from the most recently populated pair.
    let mut carrier: Option<(Arc<Samples>, Arc<Samples>)> = None;
    for k in 0..128 {
        let l = 2 * k;
        let r = 2 * k + 1;
        match (&samples[l], &samples[r]) {
            (Some(sl), Some(sr)) => carrier = Some((Arc::clone(sl), Arc::clone(sr))),
            _ => {
                if let Some((cl, cr)) = &carrier {
                    samples[l] = Some(Arc::clone(cl));
                    samples[r] = Some(Arc::clone(cr));
                }
            }
        }
    }

    if carrier.is_none() {
        return Err(SynthError::InstrumentEmpty(inst_name.to_string()));
    }
    Ok(())
}

fn fix_channel_rate_mismatch(samples: &mut [Option<Arc<Samples>>]) {
    for k in 0..128 {
        let l = 2 * k;
        let r = 2 * k + 1;
        if let (Some(sl), Some(sr)) = (&samples[l], &samples[r]) {
            if sl.original_sample_rate != sr.original_sample_rate {
                diagnostics::warn(
                    "sample rate mismatch between left and right channels, using left",
                );
                samples[r] = Some(Arc::clone(sl));
            }
        }
    }
}
