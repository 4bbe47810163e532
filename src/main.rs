// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ultramidi::audio::cpal::{list_devices, OutputStream};
use ultramidi::config::Config;
use ultramidi::midi::{MidiFile, TimeMap};
use ultramidi::notation::{extract_lyrics, ImportOptions, SongImporter, TrackAndChannel};
use ultramidi::synth::{
    BankResource, BundledResource, FileSystemResource, SampleSynthesizer, SynthState,
    CHUNK_SIZE,
};

/// Lowest sample rate accepted for offline rendering.
const MIN_SAMPLE_RATE: i64 = 1000;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "MIDI import and playback for karaoke songs."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the tracks, tempo changes and duration of a MIDI file.
    Info {
        /// The MIDI file.
        path: PathBuf,
    },
    /// Prints the lyrics of a MIDI file with their times.
    Lyrics {
        /// The MIDI file.
        path: PathBuf,
    },
    /// Converts a MIDI file to beat-quantized notes with lyrics.
    Import {
        /// The MIDI file.
        path: PathBuf,
        /// Use this track instead of matching against the lyrics. Requires --channel.
        #[arg(short, long, requires = "channel")]
        track: Option<usize>,
        /// Use this channel instead of matching against the lyrics. Requires --track.
        #[arg(short, long, requires = "track")]
        channel: Option<u8>,
        /// The song BPM. Defaults to the file's initial tempo.
        #[arg(short, long)]
        bpm: Option<f64>,
        /// The song gap in milliseconds.
        #[arg(short, long)]
        gap: Option<f64>,
        /// The path to the config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Renders a MIDI file to a 32-bit float WAV file.
    Render {
        /// The MIDI file.
        path: PathBuf,
        /// The patch bank directory.
        bank: PathBuf,
        /// The WAV file to write.
        output: PathBuf,
        /// The output sample rate.
        #[arg(
            short,
            long,
            default_value_t = 44100,
            value_parser = clap::value_parser!(u32).range(MIN_SAMPLE_RATE..)
        )]
        sample_rate: u32,
        /// The bank manifest within the bank directory.
        #[arg(short, long, default_value = "bank.yaml")]
        manifest: String,
    },
    /// Plays a MIDI file through the audio device.
    Play {
        /// The MIDI file.
        path: PathBuf,
        /// The path to the config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Lists the available audio output devices.
    Devices {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { path } => info_command(&path)?,
        Commands::Lyrics { path } => lyrics_command(&path)?,
        Commands::Import {
            path,
            track,
            channel,
            bpm,
            gap,
            config,
        } => {
            let config = Config::load(config.as_deref())?;
            let source = match (track, channel) {
                (Some(track), Some(channel)) => Some(TrackAndChannel::new(track, channel)),
                _ => None,
            };
            let options = ImportOptions {
                source,
                beats_per_minute: bpm.or(config.import().bpm()),
                gap_ms: gap.or(config.import().gap_ms()),
            };
            import_command(&path, options)?
        }
        Commands::Render {
            path,
            bank,
            output,
            sample_rate,
            manifest,
        } => render_command(&path, &bank, &manifest, &output, sample_rate)?,
        Commands::Play { path, config } => {
            play_command(&path, &Config::load(config.as_deref())?)?
        }
        Commands::Devices {} => {
            let devices = list_devices()?;
            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
    }

    Ok(())
}

fn info_command(path: &Path) -> Result<(), Box<dyn Error>> {
    let file = MidiFile::open(path)?;
    let time_map = TimeMap::build(&file);

    println!("{}", path.display());
    println!("  Format: {:?}", file.format);
    println!("  Division: {} ticks per quarter", file.division);
    println!("  Duration: {:.0} ms", time_map.duration_ms());
    println!("  Tempo changes:");
    for change in time_map.tempo_changes() {
        println!(
            "  - {:.0} ms: {:.2} BPM (tick {})",
            change.absolute_ms, change.bpm, change.absolute_ticks
        );
    }
    println!("  Tracks:");
    for (index, track) in file.tracks.iter().enumerate() {
        println!(
            "  - {}: {} ({} events, channels {:?})",
            index,
            track.name().unwrap_or_default(),
            track.events.len(),
            track.note_channels()
        );
    }
    Ok(())
}

fn lyrics_command(path: &Path) -> Result<(), Box<dyn Error>> {
    let file = MidiFile::open(path)?;
    let time_map = TimeMap::build(&file);

    match extract_lyrics(&file, &time_map) {
        Some(lyrics) => {
            println!("Lyrics from track {} ({:?}):", lyrics.track, lyrics.kind);
            for event in lyrics.events {
                println!("{:>10.0} {}", event.absolute_ms, event.text.escape_debug());
            }
        }
        None => println!("No lyrics found in {}.", path.display()),
    }
    Ok(())
}

fn import_command(path: &Path, options: ImportOptions) -> Result<(), Box<dyn Error>> {
    let file = MidiFile::open(path)?;
    let notation = SongImporter::new(options).import(&file)?;

    println!("#BPM:{}", notation.beat_grid.beats_per_minute);
    println!("#GAP:{}", notation.beat_grid.gap_ms);
    println!("# Notes from {}", notation.source);
    for note in notation.notes.iter() {
        if note.line_break {
            println!("- {}", note.start_beat);
        }
        println!(
            ": {} {} {} {}",
            note.start_beat,
            note.length(),
            note.pitch,
            note.lyric
        );
    }
    println!("E");
    Ok(())
}

fn render_command(
    path: &Path,
    bank: &Path,
    manifest: &str,
    output: &Path,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let file = MidiFile::open(path)?;
    let mut synth = SampleSynthesizer::new(sample_rate, Config::default().synth());
    synth
        .controller()
        .load_bank_from(&FileSystemResource::new(bank), manifest)?;
    synth.controller().load_midi(&file)?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(output, spec)?;

    // Keep rendering until the sequence ends, plus a short tail for releases.
    let mut block = vec![0.0f32; (sample_rate as usize / 10).max(CHUNK_SIZE)];
    let mut tail_blocks = 5;
    loop {
        synth.renderer_mut().fill_output_buffer(&mut block, 1);
        for sample in block.iter() {
            writer.write_sample(*sample)?;
        }
        if !synth.renderer_mut().is_playing() {
            if tail_blocks == 0 {
                break;
            }
            tail_blocks -= 1;
        }
    }
    writer.finalize()?;

    info!(output = %output.display(), "Rendered MIDI file");
    Ok(())
}

fn play_command(path: &Path, config: &Config) -> Result<(), Box<dyn Error>> {
    let file = MidiFile::open(path)?;
    let (controller, renderer) =
        SampleSynthesizer::new(config.audio().sample_rate(), config.synth()).split();

    let resource: Box<dyn BankResource> = match config.bank().path() {
        Some(path) => Box::new(FileSystemResource::new(path)),
        None => Box::new(BundledResource::new()?),
    };
    controller.load_bank_from(resource.as_ref(), config.bank().manifest())?;
    controller.load_midi(&file)?;

    let stream = OutputStream::open(config.audio(), renderer)?;
    info!(
        device = stream.device_name(),
        sample_rate = stream.sample_rate(),
        channels = stream.channels(),
        song = %path.display(),
        "Playing"
    );

    let mut stdout = io::stdout();
    while controller.state() == SynthState::Playing {
        thread::sleep(Duration::from_millis(100));
        controller.collect_garbage();
        write!(stdout, ".")?;
        stdout.flush()?;
    }
    writeln!(stdout)?;

    // Let the last releases ring out.
    thread::sleep(Duration::from_millis(500));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_sample_rate() {
        let cli = Cli::try_parse_from(["ultramidi", "render", "song.mid", "bank", "out.wav"]).unwrap();
        match cli.command {
            Commands::Render { sample_rate, .. } => assert_eq!(sample_rate, 44100),
            _ => panic!("expected render"),
        }

        let result = Cli::try_parse_from([
            "ultramidi",
            "render",
            "song.mid",
            "bank",
            "out.wav",
            "--sample-rate",
            "5",
        ]);
        assert!(result.is_err());
    }
}
