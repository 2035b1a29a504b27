//! Shared voice table.
//!
//! A fixed 128-entry array of per-pitch voice state guarded by one mutex,
//! plus the sustain pedal flag and recording state that the MIDI thread
//! and audio thread both touch. This is the sole interface between the
//! two threads: a single coarse mutex over a bounded, fixed-size table
//! is trivially real-time-safe at block granularity, since the producer
//! rate (key presses) is orders of magnitude below the consumer (render
//! block) rate.

use std::sync::Mutex;

use crate::wav::Recording;

/// Per-pitch live voice state.
#[derive(Debug, Clone, Copy)]
pub struct Note {
    pub exists: bool,
    pub vel: u8,
    pub down: bool,
    pub dampened: bool,
    pub dampening: f32,
    pub pos: u32,
}

impl Default for Note {
    fn default() -> Self {
        Note {
            exists: false,
            vel: 0,
            down: false,
            dampened: false,
            dampening: 1.0,
            pos: 0,
        }
    }
}

impl Note {
    /// Note-on: restarts the voice unconditionally (one slot per pitch,
    /// so a note-on on an already-sounding pitch just retriggers it).
    pub fn note_on(&mut self, vel: u8) {
        self.exists = true;
        self.vel = vel;
        self.pos = 0;
        self.dampening = 1.0;
        self.dampened = false;
        self.down = true;
    }

    /// Note-off. Whether this also starts the dampening decay depends on
    /// the sustain pedal, so the caller (the MIDI event loop) passes that
    /// in rather than this type reaching for shared state itself.
    pub fn note_off(&mut self, sustain_down: bool) {
        if !self.exists {
            return;
        }
        self.down = false;
        if !sustain_down {
            self.dampened = true;
            self.dampening = 1.0;
        }
    }
}

struct Shared {
    notes: [Note; 128],
    /// Pedal polarity is inverted from the MIDI standard: value 0 from
    /// the physical pedal means "down" on the reference keyboard.
    /// Preserved as-is rather than corrected.
    sustain_down: bool,
    recording: Option<Recording>,
}

/// The single mutex-guarded interface between the MIDI thread and the
/// audio thread.
pub struct VoiceTable {
    shared: Mutex<Shared>,
}

impl VoiceTable {
    pub fn new() -> Self {
        VoiceTable {
            shared: Mutex::new(Shared {
                notes: [Note::default(); 128],
                sustain_down: false,
                recording: None,
            }),
        }
    }

    // ---- MIDI-thread side -------------------------------------------

    pub fn note_on(&self, key: u8, vel: u8) {
        let mut guard = self.shared.lock().unwrap();
        guard.notes[key as usize].note_on(vel);
    }

    pub fn note_off(&self, key: u8) {
        let mut guard = self.shared.lock().unwrap();
        let sustain_down = guard.sustain_down;
        guard.notes[key as usize].note_off(sustain_down);
    }

    /// Controller 64, value 0: pedal down. Clears `dampened` on every
    /// voice.
    pub fn sustain_down(&self) {
        let mut guard = self.shared.lock().unwrap();
        guard.sustain_down = true;
        for note in guard.notes.iter_mut() {
            note.dampened = false;
        }
    }

    /// Controller 64, value 127: pedal up. Dampens every voice whose key
    /// is not currently physically held.
    pub fn sustain_up(&self) {
        let mut guard = self.shared.lock().unwrap();
        guard.sustain_down = false;
        for note in guard.notes.iter_mut() {
            if !note.down {
                note.dampened = true;
            }
        }
    }

    pub fn is_sustain_down(&self) -> bool {
        self.shared.lock().unwrap().sustain_down
    }

    pub fn start_recording(&self, recording: Recording) {
        let mut guard = self.shared.lock().unwrap();
        guard.recording = Some(recording);
    }

    /// Stops recording and returns the finished `Recording` so the caller
    /// can patch its header and close it outside the lock.
    pub fn stop_recording(&self) -> Option<Recording> {
        let mut guard = self.shared.lock().unwrap();
        guard.recording.take()
    }

    pub fn is_recording(&self) -> bool {
        self.shared.lock().unwrap().recording.is_some()
    }

    // ---- Audio-thread side --------------------------------------------

    /// Runs `f` over every voice slot while holding the lock — the
    /// resample-and-mix pass. The lock is released before normalization,
    /// quantization, or device submission.
    pub fn with_voices<T>(&self, f: impl FnOnce(&mut [Note; 128]) -> T) -> T {
        let mut guard = self.shared.lock().unwrap();
        f(&mut guard.notes)
    }

    /// Appends `frames` interleaved i16 stereo samples to the active
    /// recording, if any. Held only long enough to write — never across
    /// device submission.
    pub fn write_recording(&self, frames: &[i16]) {
        let mut guard = self.shared.lock().unwrap();
        if let Some(rec) = guard.recording.as_mut() {
            rec.write_frames(frames);
        }
    }
}

impl Default for VoiceTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_resets_state_even_if_already_sounding() {
        let table = VoiceTable::new();
        table.note_on(60, 100);
        table.with_voices(|notes| notes[60].pos = 500);
        table.note_on(60, 90);
        table.with_voices(|notes| {
            assert!(notes[60].exists);
            assert_eq!(notes[60].pos, 0);
            assert_eq!(notes[60].vel, 90);
            assert_eq!(notes[60].dampening, 1.0);
            assert!(!notes[60].dampened);
        });
    }

    #[test]
    fn s2_note_off_with_pedal_up_dampens_immediately() {
        let table = VoiceTable::new();
        table.note_on(60, 100);
        table.note_off(60);
        table.with_voices(|notes| {
            assert!(!notes[60].down);
            assert!(notes[60].dampened);
        });
    }

    #[test]
    fn s3_note_off_with_pedal_down_does_not_dampen_until_pedal_releases() {
        let table = VoiceTable::new();
        table.sustain_down();
        table.note_on(62, 100);
        table.note_off(62);
        table.with_voices(|notes| {
            assert!(!notes[62].down);
            assert!(!notes[62].dampened);
        });

        table.sustain_up();
        table.with_voices(|notes| {
            assert!(notes[62].dampened);
        });
    }

    #[test]
    fn sustain_down_clears_dampened_on_all_voices() {
        let table = VoiceTable::new();
        table.note_on(10, 100);
        table.note_off(10);
        table.with_voices(|notes| assert!(notes[10].dampened));

        table.sustain_down();
        table.with_voices(|notes| assert!(!notes[10].dampened));
    }
}
