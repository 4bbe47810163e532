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
use std::fs;
use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use tracing::{debug, info};

use super::error::MidiError;
use super::tempo::micros_per_quarter_to_bpm;

/// Tempo assumed until the first tempo meta-event.
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;

/// The header chunk tag every Standard MIDI File starts with.
const HEADER_CHUNK: &[u8; 4] = b"MThd";

/// The arrangement of tracks declared in the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiFormat {
    SingleTrack,
    Parallel,
    Sequential,
}

impl From<midly::Format> for MidiFormat {
    fn from(format: midly::Format) -> Self {
        match format {
            midly::Format::SingleTrack => MidiFormat::SingleTrack,
            midly::Format::Parallel => MidiFormat::Parallel,
            midly::Format::Sequential => MidiFormat::Sequential,
        }
    }
}

/// The text meta-event categories the importer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    Lyric,
    Text,
    Marker,
    TrackName,
    InstrumentName,
}

/// The decoded payload of a single event.
#[derive(Debug, Clone, PartialEq)]
pub enum MidiEventKind {
    NoteOn { key: u8, velocity: u8 },
    /// Also produced for a NoteOn with velocity 0.
    NoteOff { key: u8, velocity: u8 },
    Controller { controller: u8, value: u8 },
    ProgramChange { program: u8 },
    PitchBend { bend: i16 },
    Text { kind: TextKind, data: Vec<u8> },
    Tempo { micros_per_quarter: u32 },
    EndOfTrack,
    Other,
}

/// A single event as it appears in its track.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiEvent {
    /// Ticks since the previous event in the same track.
    pub delta_ticks: u32,
    /// Ticks since the start of the track.
    pub absolute_ticks: u64,
    /// The channel (0-15) for channel messages, `None` for track-level events.
    pub channel: Option<u8>,
    pub kind: MidiEventKind,
}

impl MidiEvent {
    /// Returns the text kind and decoded text for text meta-events.
    pub fn text(&self) -> Option<(TextKind, String)> {
        match &self.kind {
            MidiEventKind::Text { kind, data } => Some((*kind, decode_text(data))),
            _ => None,
        }
    }

    /// Returns true if this is a tempo meta-event.
    pub fn is_tempo(&self) -> bool {
        matches!(self.kind, MidiEventKind::Tempo { .. })
    }
}

/// Identifies an event by its track and its position within that track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    pub track: usize,
    pub index: usize,
}

/// An ordered sequence of events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MidiTrack {
    pub events: Vec<MidiEvent>,
    /// Program numbers used in this track, in order of first use.
    pub instruments: Vec<u8>,
    /// The absolute tick of the last event.
    pub end_ticks: u64,
}

impl MidiTrack {
    fn from_events(events: &[TrackEvent]) -> MidiTrack {
        let mut absolute_ticks = 0u64;
        let mut converted = Vec::with_capacity(events.len());
        let mut instruments = Vec::new();

        for event in events {
            let delta_ticks = event.delta.as_int();
            absolute_ticks += u64::from(delta_ticks);

            let (channel, kind) = match &event.kind {
                TrackEventKind::Midi { channel, message } => {
                    (Some(channel.as_int()), convert_message(message))
                }
                TrackEventKind::Meta(meta) => (None, convert_meta(meta)),
                TrackEventKind::SysEx(_) | TrackEventKind::Escape(_) => (None, MidiEventKind::Other),
            };

            if let MidiEventKind::ProgramChange { program } = kind {
                if !instruments.contains(&program) {
                    instruments.push(program);
                }
            }

            converted.push(MidiEvent {
                delta_ticks,
                absolute_ticks,
                channel,
                kind,
            });
        }

        MidiTrack {
            events: converted,
            instruments,
            end_ticks: absolute_ticks,
        }
    }

    /// Returns the channels that carry at least one NoteOn.
    pub fn note_channels(&self) -> Vec<u8> {
        let mut channels: Vec<u8> = self
            .events
            .iter()
            .filter(|event| matches!(event.kind, MidiEventKind::NoteOn { .. }))
            .filter_map(|event| event.channel)
            .collect();
        channels.sort_unstable();
        channels.dedup();
        channels
    }

    /// Returns the first track name meta-event, if any.
    pub fn name(&self) -> Option<String> {
        self.events.iter().find_map(|event| match event.text() {
            Some((TextKind::TrackName, text)) => Some(text),
            _ => None,
        })
    }
}

/// A parsed Standard MIDI File. Read-only once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiFile {
    pub format: MidiFormat,
    /// Ticks per quarter note.
    pub division: u16,
    pub tracks: Vec<MidiTrack>,
}

impl MidiFile {
    /// Reads and parses the MIDI file at the given path.
    pub fn open(path: &Path) -> Result<MidiFile, MidiError> {
        let bytes = fs::read(path)?;
        let file = MidiFile::parse(&bytes)?;
        info!(
            path = ?path,
            tracks = file.tracks.len(),
            division = file.division,
            "Loaded MIDI file"
        );
        Ok(file)
    }

    /// Parses a Standard MIDI File from memory.
    pub fn parse(bytes: &[u8]) -> Result<MidiFile, MidiError> {
        if !bytes.starts_with(HEADER_CHUNK) {
            return Err(MidiError::MissingHeader);
        }

        let smf = Smf::parse(bytes)?;
        let division = match smf.header.timing {
            Timing::Metrical(ticks) => ticks.as_int(),
            Timing::Timecode(fps, subframes) => {
                return Err(MidiError::UnsupportedTiming {
                    fps: fps.as_int(),
                    subframes,
                })
            }
        };
        if division == 0 {
            return Err(MidiError::ZeroDivision);
        }

        let tracks: Vec<MidiTrack> = smf
            .tracks
            .iter()
            .map(|track| MidiTrack::from_events(track))
            .collect();

        debug!(
            format = ?smf.header.format,
            tracks = tracks.len(),
            events = tracks.iter().map(|t| t.events.len()).sum::<usize>(),
            "Parsed MIDI file"
        );

        Ok(MidiFile {
            format: smf.header.format.into(),
            division,
            tracks,
        })
    }

    /// Looks up an event by id.
    pub fn event(&self, id: EventId) -> Option<&MidiEvent> {
        self.tracks
            .get(id.track)
            .and_then(|track| track.events.get(id.index))
    }

    /// Iterates over every event in track order together with its id.
    pub fn events(&self) -> impl Iterator<Item = (EventId, &MidiEvent)> {
        self.tracks.iter().enumerate().flat_map(|(track, t)| {
            t.events
                .iter()
                .enumerate()
                .map(move |(index, event)| (EventId { track, index }, event))
        })
    }

    /// The tempo in effect at tick zero.
    pub fn initial_tempo_bpm(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|track| track.events.iter())
            .filter(|event| event.absolute_ticks == 0)
            .find_map(|event| match event.kind {
                MidiEventKind::Tempo { micros_per_quarter } => {
                    Some(micros_per_quarter_to_bpm(micros_per_quarter))
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_TEMPO_BPM)
    }

    /// The largest end tick over all tracks.
    pub fn end_ticks(&self) -> u64 {
        self.tracks.iter().map(|t| t.end_ticks).max().unwrap_or(0)
    }
}

fn convert_message(message: &MidiMessage) -> MidiEventKind {
    match message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => MidiEventKind::NoteOff {
            key: key.as_int(),
            velocity: 0,
        },
        MidiMessage::NoteOn { key, vel } => MidiEventKind::NoteOn {
            key: key.as_int(),
            velocity: vel.as_int(),
        },
        MidiMessage::NoteOff { key, vel } => MidiEventKind::NoteOff {
            key: key.as_int(),
            velocity: vel.as_int(),
        },
        MidiMessage::Controller { controller, value } => MidiEventKind::Controller {
            controller: controller.as_int(),
            value: value.as_int(),
        },
        MidiMessage::ProgramChange { program } => MidiEventKind::ProgramChange {
            program: program.as_int(),
        },
        MidiMessage::PitchBend { bend } => MidiEventKind::PitchBend {
            bend: bend.as_int(),
        },
        _ => MidiEventKind::Other,
    }
}

fn convert_meta(meta: &MetaMessage) -> MidiEventKind {
    match meta {
        MetaMessage::Lyric(data) => text_event(TextKind::Lyric, data),
        MetaMessage::Text(data) => text_event(TextKind::Text, data),
        MetaMessage::Marker(data) => text_event(TextKind::Marker, data),
        MetaMessage::TrackName(data) => text_event(TextKind::TrackName, data),
        MetaMessage::InstrumentName(data) => text_event(TextKind::InstrumentName, data),
        MetaMessage::Tempo(tempo) => MidiEventKind::Tempo {
            micros_per_quarter: tempo.as_int(),
        },
        MetaMessage::EndOfTrack => MidiEventKind::EndOfTrack,
        _ => MidiEventKind::Other,
    }
}

fn text_event(kind: TextKind, data: &[u8]) -> MidiEventKind {
    MidiEventKind::Text {
        kind,
        data: data.to_vec(),
    }
}

/// Decodes meta-event text. Karaoke files are frequently Latin-1, so anything
/// that is not valid UTF-8 is read byte-per-char.
pub(crate) fn decode_text(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => data.iter().map(|&b| b as char).collect(),
    }
}
