//! Error taxonomy for the synth engine.
//!
//! Fatal kinds terminate the process (printed in red); recoverable
//! conditions are not part of this enum — they go through
//! [`crate::diagnostics::warn`] and execution continues, so they never
//! need to unwind as errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("couldn't open {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed SoundFont: {0}")]
    Format(String),

    #[error("sample '{name}' references frames outside the sample pool ({start}..{end}, pool has {total})")]
    SampleRange {
        name: String,
        start: u32,
        end: u32,
        total: u32,
    },

    #[error("instrument '{0}' has no populated sample slots")]
    InstrumentEmpty(String),

    #[error("no instruments in SoundFont; the file is likely corrupt")]
    NoInstruments,

    #[error("instrument index {index} out of range (SoundFont has {count} instruments)")]
    InstrumentIndex { index: usize, count: usize },

    #[error("no MIDI input ports available")]
    NoMidiPorts,

    #[error("MIDI port index {index} out of range ({count} ports available)")]
    MidiPortIndex { index: usize, count: usize },

    #[error("MIDI connection failed: {0}")]
    MidiConnect(String),

    #[error("no output audio device available")]
    NoAudioDevice,

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SynthError>;
