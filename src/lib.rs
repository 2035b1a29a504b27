pub mod audio;
pub mod cli;
pub mod diagnostics;
pub mod error;
pub mod instrument;
pub mod midi;
pub mod sf2;
pub mod voice;
pub mod wav;

pub use error::{Result, SynthError};
