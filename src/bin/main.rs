use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::info;

use sf2synth::cli::{self, Cli};
use sf2synth::error::{Result, SynthError};
use sf2synth::voice::VoiceTable;
use sf2synth::{audio, diagnostics, instrument, midi, sf2};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if cli.list_midi_ports {
        return match midi::list_ports() {
            Ok(ports) => {
                for (i, name) in ports.iter().enumerate() {
                    println!("{i}: {name}");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                diagnostics::error(e);
                ExitCode::FAILURE
            }
        };
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics::error(e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let file = File::open(&cli.soundfont).map_err(|source| SynthError::FileOpen {
        path: cli.soundfont.clone(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let font = sf2::parse(&mut reader)?;
    info!(
        "parsed SoundFont: {} samples, {} instruments",
        font.sample_headers.len().saturating_sub(1),
        font.instrument_count()
    );

    let instrument_index = cli::resolve_instrument_index(&cli, &font);
    let loaded = instrument::load_instrument(&mut reader, &font, instrument_index)?;
    cli::log_loaded_instrument(&loaded);

    let voices = Arc::new(VoiceTable::new());
    let loaded = Arc::new(loaded);

    let recordings_dir = cli
        .soundfont
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    let audio_config = audio::AudioConfig {
        block_frames: cli.block_size,
        sample_rate: cli.sample_rate,
    };
    let _stream = audio::run(Arc::clone(&voices), Arc::clone(&loaded), audio_config)?;

    let midi_port = cli.midi_port.unwrap_or(0);
    let _connection = midi::connect(midi_port, Arc::clone(&voices), recordings_dir, cli.sample_rate)?;

    info!("sf2synth running; press Ctrl+C to exit");
    loop {
        std::thread::park();
    }
}
