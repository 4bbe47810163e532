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
//! Sample-accurate playback of a MIDI file through the engine.

use std::sync::Arc;

use tracing::info;

use super::engine::SynthEngine;
use crate::midi::{MidiEventKind, MidiFile, TimeMap};

/// A channel message the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMessage {
    NoteOn { key: u8, velocity: u8 },
    NoteOff { key: u8 },
    ProgramChange { program: u8 },
    Controller { controller: u8, value: u8 },
}

/// A message scheduled at an output sample position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencedEvent {
    pub sample: u64,
    pub channel: u8,
    pub message: SequenceMessage,
}

/// A MIDI file flattened into playback order and converted to sample
/// positions at a fixed output rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    events: Vec<SequencedEvent>,
    length_samples: u64,
    sample_rate: u32,
}

impl Sequence {
    pub fn build(file: &MidiFile, time_map: &TimeMap, sample_rate: u32) -> Self {
        let to_samples = |ms: f64| (ms.max(0.0) * f64::from(sample_rate) / 1000.0).round() as u64;

        let events: Vec<SequencedEvent> = time_map
            .playback_order()
            .filter_map(|(id, time)| {
                let event = file.event(id)?;
                let channel = event.channel?;
                let message = match event.kind {
                    MidiEventKind::NoteOn { key, velocity } => {
                        SequenceMessage::NoteOn { key, velocity }
                    }
                    MidiEventKind::NoteOff { key, .. } => SequenceMessage::NoteOff { key },
                    MidiEventKind::ProgramChange { program } => {
                        SequenceMessage::ProgramChange { program }
                    }
                    MidiEventKind::Controller { controller, value } => {
                        SequenceMessage::Controller { controller, value }
                    }
                    _ => return None,
                };
                Some(SequencedEvent {
                    sample: to_samples(time.absolute_ms),
                    channel,
                    message,
                })
            })
            .collect();

        let length_samples = to_samples(time_map.duration_ms())
            .max(events.last().map(|event| event.sample).unwrap_or(0));

        info!(
            events = events.len(),
            duration_ms = time_map.duration_ms(),
            sample_rate,
            "Built playback sequence"
        );

        Self {
            events,
            length_samples,
            sample_rate,
        }
    }

    pub fn events(&self) -> &[SequencedEvent] {
        &self.events
    }

    pub fn length_samples(&self) -> u64 {
        self.length_samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Plays a loaded sequence into the engine.
#[derive(Debug, Default)]
pub struct Sequencer {
    sequence: Option<Arc<Sequence>>,
    next_event: usize,
    position: u64,
    playing: bool,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a sequence and starts it from the beginning. Returns the
    /// previous sequence.
    pub fn load(&mut self, sequence: Arc<Sequence>) -> Option<Arc<Sequence>> {
        let previous = self.sequence.replace(sequence);
        self.rewind();
        self.playing = true;
        previous
    }

    pub fn unload(&mut self) -> Option<Arc<Sequence>> {
        self.playing = false;
        self.rewind();
        self.sequence.take()
    }

    /// Restarts the loaded sequence. Returns false if nothing is loaded.
    pub fn play(&mut self) -> bool {
        if self.sequence.is_none() {
            return false;
        }
        self.rewind();
        self.playing = true;
        true
    }

    /// Stops playback and rewinds to the start.
    pub fn stop(&mut self) {
        self.playing = false;
        self.rewind();
    }

    pub fn is_loaded(&self) -> bool {
        self.sequence.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Output samples since the sequence started.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn rewind(&mut self) {
        self.next_event = 0;
        self.position = 0;
    }

    /// Renders into `output`, dispatching every event on the exact sample it
    /// is scheduled for. Playback stops once the sequence has run out.
    pub fn render(&mut self, engine: &mut SynthEngine, output: &mut [f32]) {
        let sequence = match self.sequence.as_ref() {
            Some(sequence) if self.playing => sequence,
            _ => {
                engine.render(output);
                return;
            }
        };
        let events = sequence.events();

        let mut written = 0;
        while written < output.len() {
            while let Some(event) = events.get(self.next_event) {
                if event.sample > self.position {
                    break;
                }
                dispatch(engine, event);
                self.next_event += 1;
            }

            let remaining = output.len() - written;
            let frames = match events.get(self.next_event) {
                Some(event) => remaining.min((event.sample - self.position) as usize),
                None => remaining,
            };
            engine.render(&mut output[written..written + frames]);
            written += frames;
            self.position += frames as u64;
        }

        if self.next_event >= events.len() && self.position >= sequence.length_samples() {
            self.playing = false;
        }
    }
}

fn dispatch(engine: &mut SynthEngine, event: &SequencedEvent) {
    match event.message {
        SequenceMessage::NoteOn { key, velocity } => engine.note_on(event.channel, key, velocity),
        SequenceMessage::NoteOff { key } => engine.note_off(event.channel, key),
        SequenceMessage::ProgramChange { program } => engine.program_change(event.channel, program),
        SequenceMessage::Controller { controller, value } => {
            engine.control_change(event.channel, controller, value)
        }
    }
}
