//! SF2 (SoundFont 2) parsing.
//!
//! `parser::parse` reads the RIFF-chunked binary and produces the raw,
//! sentinel-terminated tables in [`types::SoundFont`]. Nothing here loads
//! PCM; that's [`crate::instrument::load_instrument`]'s job.

pub mod chunks;
pub mod generator;
pub mod parser;
pub mod types;

pub use parser::parse;
pub use types::SoundFont;
