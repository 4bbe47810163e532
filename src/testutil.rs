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
//! Fixture builders shared by the unit tests.

use std::error::Error;
use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

/// Builds Standard MIDI File bytes track by track.
pub struct SmfBuilder {
    division: u16,
    tracks: Vec<Vec<TrackEvent<'static>>>,
}

impl SmfBuilder {
    pub fn new(division: u16) -> SmfBuilder {
        SmfBuilder {
            division,
            tracks: Vec::new(),
        }
    }

    /// Adds a track. An end of track event is appended automatically.
    pub fn track(mut self, mut events: Vec<TrackEvent<'static>>) -> SmfBuilder {
        events.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        self.tracks.push(events);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let format = if self.tracks.len() == 1 {
            Format::SingleTrack
        } else {
            Format::Parallel
        };
        let mut smf = Smf::new(Header::new(
            format,
            Timing::Metrical(u15::new(self.division)),
        ));
        smf.tracks = self.tracks;

        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).expect("writing to a Vec cannot fail");
        bytes
    }
}

/// Shorthand for a file with the given tracks.
pub fn midi_bytes(division: u16, tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
    tracks
        .into_iter()
        .fold(SmfBuilder::new(division), |builder, track| builder.track(track))
        .build()
}

fn channel_event(delta: u32, channel: u8, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(channel),
            message,
        },
    }
}

pub fn note_on(delta: u32, channel: u8, key: u8, velocity: u8) -> TrackEvent<'static> {
    channel_event(
        delta,
        channel,
        MidiMessage::NoteOn {
            key: u7::new(key),
            vel: u7::new(velocity),
        },
    )
}

pub fn note_off(delta: u32, channel: u8, key: u8) -> TrackEvent<'static> {
    channel_event(
        delta,
        channel,
        MidiMessage::NoteOff {
            key: u7::new(key),
            vel: u7::new(64),
        },
    )
}

pub fn program(delta: u32, channel: u8, program: u8) -> TrackEvent<'static> {
    channel_event(
        delta,
        channel,
        MidiMessage::ProgramChange {
            program: u7::new(program),
        },
    )
}

pub fn tempo(delta: u32, micros_per_quarter: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros_per_quarter))),
    }
}

pub fn text(delta: u32, meta: MetaMessage<'static>) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(meta),
    }
}

pub fn lyric(delta: u32, lyric: &'static str) -> TrackEvent<'static> {
    text(delta, MetaMessage::Lyric(lyric.as_bytes()))
}

pub fn marker(delta: u32, marker: &'static str) -> TrackEvent<'static> {
    text(delta, MetaMessage::Marker(marker.as_bytes()))
}

/// Encodes interleaved float samples as a 32-bit float WAV file in memory.
pub fn wav_bytes(
    samples: &[f32],
    channels: u16,
    sample_rate: u32,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(
            &mut cursor,
            WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
        )?;
        for sample in samples {
            writer.write_sample(*sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
