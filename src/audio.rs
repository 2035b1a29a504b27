//! Per-block resampling, mixing, and device submission.
//!
//! `render_block` is the pure, allocation-free half of the render loop:
//! given the voice table and the loaded instrument, it fills two stereo
//! accumulator slices with the current block's mix. `run` wraps it in a
//! `cpal` output stream, which owns the blocking wait on the sound card —
//! the idiomatic stand-in for a hand-rolled audio thread.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use log::{debug, trace};

use crate::diagnostics;
use crate::error::{Result, SynthError};
use crate::instrument::LoadedInstrument;
use crate::voice::{Note, VoiceTable};

/// Exponential dampening decays to 5% of its starting value over one
/// second; see `render_block`'s per-block update.
const DAMPENING_TIME_CONSTANT: f32 = 0.05;

/// Mixes one block's worth of active voices into `acc_l`/`acc_r`
/// (length `NF`, both pre-zeroed by the caller) at output rate `sr_out`.
/// Runs with the voice table lock held; no allocation.
pub fn render_block(notes: &mut [Note; 128], instrument: &LoadedInstrument, sr_out: u32, acc_l: &mut [f32], acc_r: &mut [f32]) {
    let nf = acc_l.len();
    debug_assert_eq!(acc_l.len(), acc_r.len());

    for (n, note) in notes.iter_mut().enumerate() {
        if !note.exists {
            continue;
        }

        let (s_l, s_r) = instrument.channels(n as u8);
        let time_multiplier = (s_l.original_sample_rate as f32 / sr_out as f32)
            * 2f32.powf((n as f32 - s_l.original_midi_pitch as f32) / 12.0);

        if note.pos >= s_l.frame_count {
            note.exists = false;
            continue;
        }

        if note.dampened {
            note.dampening *= DAMPENING_TIME_CONSTANT.powf(nf as f32 / sr_out as f32);
        }

        let volume = (note.vel as f32 / 128.0) * note.dampening * (1.0 / 32767.0);

        let mut in_idx = note.pos as f32;
        for t in 0..nf {
            let ii = in_idx.floor() as u32;
            if ii >= s_l.frame_count {
                break;
            }
            acc_l[t] += s_l.pcm[ii as usize] as f32 * volume;
            acc_r[t] += s_r.pcm[ii as usize] as f32 * volume;
            in_idx += time_multiplier;
        }

        note.pos = in_idx.floor() as u32;
        if note.pos as f32 + time_multiplier.ceil() >= s_l.frame_count as f32 {
            note.exists = false;
        }
    }
}

/// Per-block peak normalization: scale each channel by `32767 / peak`,
/// floored at `peak = 1.0` so quiet blocks are never amplified, and
/// quantize to signed 16-bit.
pub fn normalize_and_quantize(acc: &[f32], out: &mut [i16]) {
    let peak = acc.iter().fold(1.0f32, |m, &s| m.max(s.abs()));
    let scale = 32767.0 / peak;
    for (dst, src) in out.iter_mut().zip(acc.iter()) {
        *dst = (src * scale).round().clamp(-32768.0, 32767.0) as i16;
    }
}

/// Interleaves two quantized planar channels into `[L, R, L, R, ...]`
/// for the WAV writer, which stores interleaved frames.
pub fn interleave(l: &[i16], r: &[i16], out: &mut Vec<i16>) {
    out.clear();
    for (&ls, &rs) in l.iter().zip(r.iter()) {
        out.push(ls);
        out.push(rs);
    }
}

pub struct AudioConfig {
    pub block_frames: usize,
    pub sample_rate: u32,
}

/// Builds and starts the output stream. The returned `Stream` must be
/// kept alive for the duration of playback — dropping it stops audio.
pub fn run(voices: std::sync::Arc<VoiceTable>, instrument: std::sync::Arc<LoadedInstrument>, config: AudioConfig) -> Result<Stream> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(SynthError::NoAudioDevice)?;
    debug!("output device: {}", device.name().unwrap_or_else(|_| "<unknown>".into()));

    let stream_config = StreamConfig {
        channels: 2,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(config.block_frames as u32),
    };

    let nf = config.block_frames;
    let sr_out = config.sample_rate;

    let mut acc_l = vec![0.0f32; nf];
    let mut acc_r = vec![0.0f32; nf];
    let mut quant_l = vec![0i16; nf];
    let mut quant_r = vec![0i16; nf];
    let mut interleaved: Vec<i16> = Vec::with_capacity(nf * 2);

    let err_fn = |err| diagnostics::error(format!("audio stream error: {err}"));

    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [i16], _info: &cpal::OutputCallbackInfo| {
            acc_l.iter_mut().for_each(|x| *x = 0.0);
            acc_r.iter_mut().for_each(|x| *x = 0.0);

            voices.with_voices(|notes| {
                render_block(notes, &instrument, sr_out, &mut acc_l, &mut acc_r);
            });

            normalize_and_quantize(&acc_l, &mut quant_l);
            normalize_and_quantize(&acc_r, &mut quant_r);

            if voices.is_recording() {
                interleave(&quant_l, &quant_r, &mut interleaved);
                voices.write_recording(&interleaved);
            }

            // Host buffer is interleaved stereo; write planar output
            // into it frame by frame rather than requiring the caller's
            // own planar layout.
            let frames = data.len() / 2;
            for t in 0..frames.min(nf) {
                data[2 * t] = quant_l[t];
                data[2 * t + 1] = quant_r[t];
            }
            trace!("rendered block of {nf} frames");
        },
        err_fn,
        None,
    ).map_err(|e| SynthError::AudioDevice(e.to_string()))?;

    stream.play().map_err(|e| SynthError::AudioDevice(e.to_string()))?;
    Ok(stream)
}

/// Whether the default output device advertises native i16 support;
/// informational only, logged at startup.
pub fn supports_i16_natively() -> bool {
    let host = cpal::default_host();
    host.default_output_device()
        .and_then(|d| d.default_output_config().ok())
        .map(|c| c.sample_format() == SampleFormat::I16)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::load_instrument;
    use crate::sf2::parser::fixtures::{build_sf2, SampleSpec};
    use std::io::Cursor;

    fn loaded_piano() -> LoadedInstrument {
        let samples = vec![SampleSpec {
            name: "Tone",
            frames: (0..1000).map(|i| ((i % 200) as i16) * 100).collect(),
            root_key: 60,
            sample_rate: 44100,
        }];
        let zones = vec![(0u8, 127u8, 0i16, 0u16, None)];
        let bytes = build_sf2(&samples, &zones);
        let mut cursor = Cursor::new(bytes);
        let font = crate::sf2::parse(&mut cursor).unwrap();
        load_instrument(&mut cursor, &font, 0).unwrap()
    }

    #[test]
    fn s5_silent_block_stays_silent_after_normalization() {
        let nf = 441;
        let acc = vec![0.0f32; nf];
        let mut out = vec![1i16; nf];
        normalize_and_quantize(&acc, &mut out);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn render_block_advances_position_and_retires_finished_voices() {
        let instrument = loaded_piano();
        let mut notes = [Note::default(); 128];
        notes[60].note_on(100);

        let nf = 64;
        let mut acc_l = vec![0.0f32; nf];
        let mut acc_r = vec![0.0f32; nf];

        render_block(&mut notes, &instrument, 44100, &mut acc_l, &mut acc_r);
        assert!(notes[60].pos > 0);
        assert!(acc_l.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn note_past_end_of_sample_is_retired() {
        let instrument = loaded_piano();
        let mut notes = [Note::default(); 128];
        notes[60].note_on(100);
        notes[60].pos = 999_999;

        let nf = 64;
        let mut acc_l = vec![0.0f32; nf];
        let mut acc_r = vec![0.0f32; nf];
        render_block(&mut notes, &instrument, 44100, &mut acc_l, &mut acc_r);
        assert!(!notes[60].exists);
    }

    #[test]
    fn dampened_voice_decays_toward_silence_over_blocks() {
        let instrument = loaded_piano();
        let mut notes = [Note::default(); 128];
        notes[60].note_on(100);
        notes[60].dampened = true;

        let nf = 4410; // one tenth of a second at 44100 Hz
        let mut acc_l = vec![0.0f32; nf];
        let mut acc_r = vec![0.0f32; nf];

        let before = notes[60].dampening;
        render_block(&mut notes, &instrument, 44100, &mut acc_l, &mut acc_r);
        assert!(notes[60].dampening < before);
    }

    #[test]
    fn interleave_produces_lr_pairs() {
        let l = [1i16, 2, 3];
        let r = [10i16, 20, 30];
        let mut out = Vec::new();
        interleave(&l, &r, &mut out);
        assert_eq!(out, vec![1, 10, 2, 20, 3, 30]);
    }
}
