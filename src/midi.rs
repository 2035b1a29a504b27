//! Raw MIDI byte decoding and the `midir` input connection.
//!
//! Only three status classes carry meaning: note off (`0x8n`), note on
//! (`0x9n`), and controller change (`0xBn`). Running status is not
//! supported — every message must carry its own status byte — and no
//! other status class is decoded beyond being read and discarded, which
//! matches a hardware controller that only ever emits these three.

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn as log_warn};
use midir::{MidiInput, MidiInputConnection, MidiInputPort};

use crate::diagnostics;
use crate::error::{Result, SynthError};
use crate::voice::VoiceTable;
use crate::wav::{next_recording_path, Recording};

const CONTROLLER_SUSTAIN: u8 = 64;
const CONTROLLER_RECORD: u8 = 48;

/// A decoded event; everything not in this set is discarded by
/// `decode_first_message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    NoteOff { key: u8, vel: u8 },
    NoteOn { key: u8, vel: u8 },
    Controller { controller: u8, value: u8 },
}

/// Decodes the first complete message at the front of `bytes`, per the
/// status classes above. Returns `None` if the leading status byte isn't
/// one of the three recognized classes, or if the message is
/// incomplete — running status is not supported, so a raw data byte
/// with no preceding status in this slice decodes to nothing.
pub fn decode_first_message(bytes: &[u8]) -> Option<Event> {
    let status = *bytes.first()?;
    if status & 0x80 == 0 {
        return None;
    }
    let class = status & 0xF0;
    let data1 = *bytes.get(1)?;
    let data2 = *bytes.get(2)?;

    match class {
        0x80 => Some(Event::NoteOff { key: data1, vel: data2 }),
        0x90 => Some(Event::NoteOn { key: data1, vel: data2 }),
        0xB0 => Some(Event::Controller { controller: data1, value: data2 }),
        _ => None,
    }
}

/// Applies one decoded event to the shared voice table, including the
/// sustain pedal and record-toggle controllers. `recordings_dir` is
/// where `out-NN.wav` files are created on controller 48.
pub fn apply_event(event: Event, voices: &VoiceTable, recordings_dir: &std::path::Path, sample_rate: u32) {
    match event {
        Event::NoteOff { key, .. } => voices.note_off(key),
        // A note-on with velocity 0 is still a note-on here; aliasing it
        // to note-off is a MIDI convention this decoder does not apply.
        Event::NoteOn { key, vel } => voices.note_on(key, vel),
        Event::Controller { controller: CONTROLLER_SUSTAIN, value: 0 } => voices.sustain_down(),
        Event::Controller { controller: CONTROLLER_SUSTAIN, value: 127 } => voices.sustain_up(),
        Event::Controller { controller: CONTROLLER_SUSTAIN, .. } => {}
        Event::Controller { controller: CONTROLLER_RECORD, value: 127 } => {
            if voices.is_recording() {
                return;
            }
            let path = next_recording_path(recordings_dir);
            match Recording::create(&path, sample_rate) {
                Ok(rec) => {
                    info!("recording started: {}", path.display());
                    voices.start_recording(rec);
                }
                Err(e) => diagnostics::error(format!("couldn't start recording: {e}")),
            }
        }
        Event::Controller { controller: CONTROLLER_RECORD, value: 0 } => {
            if let Some(rec) = voices.stop_recording() {
                let path = rec.path().to_path_buf();
                if let Err(e) = rec.close() {
                    diagnostics::error(format!("couldn't finalize recording: {e}"));
                } else {
                    info!("recording saved: {}", path.display());
                }
            }
        }
        Event::Controller { .. } => {}
    }
}

pub fn list_ports() -> Result<Vec<String>> {
    let input = MidiInput::new("sf2synth").map_err(|e| SynthError::MidiConnect(e.to_string()))?;
    let ports = input.ports();
    ports
        .iter()
        .map(|p| input.port_name(p).map_err(|e| SynthError::MidiConnect(e.to_string())))
        .collect()
}

/// Connects to MIDI input port `port_index`, decoding and applying every
/// incoming message to `voices` from the `midir` callback thread.
/// Returns a connection handle that must be kept alive for the duration
/// of the session.
pub fn connect(
    port_index: usize,
    voices: Arc<VoiceTable>,
    recordings_dir: PathBuf,
    sample_rate: u32,
) -> Result<MidiInputConnection<()>> {
    let input = MidiInput::new("sf2synth").map_err(|e| SynthError::MidiConnect(e.to_string()))?;
    let ports = input.ports();
    if ports.is_empty() {
        return Err(SynthError::NoMidiPorts);
    }
    let port: &MidiInputPort = ports.get(port_index).ok_or(SynthError::MidiPortIndex {
        index: port_index,
        count: ports.len(),
    })?;

    let port_name = input.port_name(port).unwrap_or_else(|_| "<unknown>".into());

    input
        .connect(
            port,
            "sf2synth-input",
            move |_timestamp_us, message, ()| {
                if let Some(event) = decode_first_message(message) {
                    apply_event(event, &voices, &recordings_dir, sample_rate);
                } else {
                    log_warn!("discarded unrecognized or incomplete MIDI message: {message:?}");
                }
            },
            (),
        )
        .map_err(|e| SynthError::MidiConnect(format!("connecting to '{port_name}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn decodes_note_on_note_off_and_controller() {
        assert_eq!(decode_first_message(&[0x90, 60, 100]), Some(Event::NoteOn { key: 60, vel: 100 }));
        assert_eq!(decode_first_message(&[0x80, 60, 0]), Some(Event::NoteOff { key: 60, vel: 0 }));
        assert_eq!(
            decode_first_message(&[0xB0, 64, 127]),
            Some(Event::Controller { controller: 64, value: 127 })
        );
    }

    #[test]
    fn unrecognized_status_class_decodes_to_none() {
        assert_eq!(decode_first_message(&[0xC0, 5]), None); // program change
        assert_eq!(decode_first_message(&[0xE0, 0, 64]), None); // pitch bend
    }

    #[test]
    fn leading_data_byte_with_no_status_decodes_to_none() {
        assert_eq!(decode_first_message(&[60, 100]), None);
    }

    #[test]
    fn s6_record_toggle_creates_and_closes_a_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let voices = VoiceTable::new();

        apply_event(Event::Controller { controller: 48, value: 127 }, &voices, dir.path(), 44100);
        assert!(voices.is_recording());

        apply_event(Event::Controller { controller: 48, value: 0 }, &voices, dir.path(), 44100);
        assert!(!voices.is_recording());

        assert!(Path::new(&dir.path().join("out-01.wav")).exists());
    }

    #[test]
    fn sustain_controller_updates_pedal_state() {
        let voices = VoiceTable::new();
        apply_event(Event::Controller { controller: 64, value: 0 }, &voices, Path::new("."), 44100);
        assert!(voices.is_sustain_down());
        apply_event(Event::Controller { controller: 64, value: 127 }, &voices, Path::new("."), 44100);
        assert!(!voices.is_sustain_down());
    }
}
