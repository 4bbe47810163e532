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
use std::collections::HashMap;

use tracing::{debug, warn};

use super::beats::BeatGrid;
use super::TrackAndChannel;
use crate::midi::{EventId, MidiEventKind, MidiFile, TimeMap};

/// A beat-quantized note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub start_beat: i32,
    /// Always greater than `start_beat`.
    pub end_beat: i32,
    /// MIDI note number.
    pub pitch: u8,
    pub lyric: String,
    /// A new lyric line starts at this note.
    pub line_break: bool,
}

impl Note {
    pub fn length(&self) -> i32 {
        self.end_beat - self.start_beat
    }
}

/// A NoteOn waiting for its NoteOff.
struct PendingNote {
    start_beat: i32,
    absolute_ms: f64,
}

/// Pairs the NoteOn/NoteOff events of one track and channel into notes.
///
/// A second NoteOn for a pitch that is still sounding replaces the first one,
/// which is dropped. Notes that would not span at least one beat are dropped,
/// as are NoteOns that never receive a NoteOff.
pub fn extract_notes(
    file: &MidiFile,
    source: TrackAndChannel,
    time_map: &TimeMap,
    beat_grid: &BeatGrid,
) -> Vec<Note> {
    let Some(track) = file.tracks.get(source.track) else {
        warn!(%source, "Track does not exist");
        return Vec::new();
    };

    let mut pending: HashMap<u8, PendingNote> = HashMap::new();
    let mut notes = Vec::new();

    for (index, event) in track.events.iter().enumerate() {
        if event.channel != Some(source.channel) {
            continue;
        }
        let id = EventId {
            track: source.track,
            index,
        };

        match event.kind {
            MidiEventKind::NoteOn { key, .. } => {
                let Some(absolute_ms) = time_map.absolute_ms(id) else {
                    continue;
                };
                let start_beat = beat_grid.millis_to_beat(absolute_ms);
                if let Some(previous) = pending.insert(
                    key,
                    PendingNote {
                        start_beat,
                        absolute_ms,
                    },
                ) {
                    warn!(
                        %source,
                        pitch = key,
                        dropped_ms = previous.absolute_ms,
                        "NoteOn while the same pitch is still sounding, dropping the earlier note"
                    );
                }
            }
            MidiEventKind::NoteOff { key, .. } => {
                let Some(absolute_ms) = time_map.absolute_ms(id) else {
                    continue;
                };
                let Some(started) = pending.remove(&key) else {
                    warn!(%source, pitch = key, ms = absolute_ms, "NoteOff without NoteOn, ignoring");
                    continue;
                };
                let end_beat = beat_grid.millis_to_beat(absolute_ms);
                if end_beat <= started.start_beat {
                    warn!(
                        %source,
                        pitch = key,
                        start_beat = started.start_beat,
                        end_beat,
                        "Note shorter than one beat, dropping"
                    );
                    continue;
                }
                notes.push(Note {
                    start_beat: started.start_beat,
                    end_beat,
                    pitch: key,
                    lyric: String::new(),
                    line_break: false,
                });
            }
            _ => {}
        }
    }

    for (pitch, note) in pending {
        warn!(
            %source,
            pitch,
            start_ms = note.absolute_ms,
            "NoteOn without NoteOff before end of track, dropping"
        );
    }

    notes.sort_by_key(|note| (note.start_beat, note.pitch));
    debug!(%source, count = notes.len(), "Extracted notes");
    notes
}
