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
//! Tick to millisecond conversion across tempo changes.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::file::{EventId, MidiEventKind, MidiFile, DEFAULT_TEMPO_BPM};

/// Converts a tempo meta-event value into beats per minute, rounded to two decimals.
pub fn micros_per_quarter_to_bpm(micros_per_quarter: u32) -> f64 {
    let bpm = 60_000_000.0 / f64::from(micros_per_quarter);
    (bpm * 100.0).round() / 100.0
}

fn ms_per_tick(bpm: f64, division: u16) -> f64 {
    60_000.0 / (bpm * f64::from(division))
}

/// The timing of a single event in playback order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventTime {
    /// Milliseconds since the previous event in playback order.
    pub delta_ms: f64,
    /// Milliseconds since the start of the file.
    pub absolute_ms: f64,
}

/// A tempo change and the position at which it takes effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoChange {
    pub absolute_ticks: u64,
    pub absolute_ms: f64,
    pub bpm: f64,
}

/// Maps every event of a file to its delta and absolute time in milliseconds.
#[derive(Debug, Clone, Default)]
pub struct TimeMap {
    times: HashMap<EventId, EventTime>,
    /// Event ids in playback order.
    order: Vec<EventId>,
    tempo_changes: Vec<TempoChange>,
    division: u16,
    duration_ms: f64,
}

impl TimeMap {
    /// Walks all events in playback order, applying tempo changes as they occur.
    ///
    /// Multi-track files (and single tracks that report no length) are merged
    /// by absolute tick. Events on the same tick keep track order, and events
    /// of the same track keep their file order.
    pub fn build(file: &MidiFile) -> TimeMap {
        let merge = file.tracks.len() > 1 || file.tracks.first().is_some_and(|t| t.end_ticks == 0);
        let order = if merge {
            merged_order(file)
        } else {
            file.events().map(|(id, _)| id).collect()
        };

        let mut times = HashMap::with_capacity(order.len());
        let mut playback_order = Vec::with_capacity(order.len());
        let mut tempo_changes = Vec::new();

        let mut bpm = DEFAULT_TEMPO_BPM;
        // Start of the current constant-tempo segment.
        let mut segment_ticks = 0u64;
        let mut segment_ms = 0.0f64;
        let mut previous_ms = 0.0f64;

        for id in order {
            let Some(event) = file.event(id) else {
                warn!(track = id.track, index = id.index, "Event missing from file, skipping");
                continue;
            };

            let elapsed_ticks = event.absolute_ticks.saturating_sub(segment_ticks);
            let absolute_ms = segment_ms + elapsed_ticks as f64 * ms_per_tick(bpm, file.division);
            times.insert(
                id,
                EventTime {
                    delta_ms: absolute_ms - previous_ms,
                    absolute_ms,
                },
            );
            playback_order.push(id);
            previous_ms = absolute_ms;

            if let MidiEventKind::Tempo { micros_per_quarter } = event.kind {
                if micros_per_quarter == 0 {
                    warn!(track = id.track, index = id.index, "Ignoring zero tempo event");
                    continue;
                }
                bpm = micros_per_quarter_to_bpm(micros_per_quarter);
                segment_ticks = event.absolute_ticks;
                segment_ms = absolute_ms;
                tempo_changes.push(TempoChange {
                    absolute_ticks: event.absolute_ticks,
                    absolute_ms,
                    bpm,
                });
                debug!(ticks = event.absolute_ticks, ms = absolute_ms, bpm, "Tempo change");
            }
        }

        TimeMap {
            times,
            order: playback_order,
            tempo_changes,
            division: file.division,
            duration_ms: previous_ms,
        }
    }

    /// Returns the timing of the given event, if it was mapped.
    pub fn get(&self, id: EventId) -> Option<EventTime> {
        self.times.get(&id).copied()
    }

    /// Returns the absolute time of the given event, logging a warning if the
    /// event has no mapping.
    pub fn absolute_ms(&self, id: EventId) -> Option<f64> {
        let time = self.get(id);
        if time.is_none() {
            warn!(
                track = id.track,
                index = id.index,
                "Event has no time mapping, skipping"
            );
        }
        time.map(|t| t.absolute_ms)
    }

    /// Iterates over all mapped events in playback order.
    pub fn playback_order(&self) -> impl Iterator<Item = (EventId, EventTime)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.times.get(id).map(|time| (*id, *time)))
    }

    /// The tempo changes in playback order.
    pub fn tempo_changes(&self) -> &[TempoChange] {
        &self.tempo_changes
    }

    /// The absolute time of the last event.
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Converts an absolute tick position to milliseconds using the tempo changes.
    pub fn ticks_to_ms(&self, ticks: u64) -> f64 {
        let (segment_ticks, segment_ms, bpm) = self
            .tempo_changes
            .iter()
            .take_while(|change| change.absolute_ticks <= ticks)
            .last()
            .map(|change| (change.absolute_ticks, change.absolute_ms, change.bpm))
            .unwrap_or((0, 0.0, DEFAULT_TEMPO_BPM));
        segment_ms + (ticks - segment_ticks) as f64 * ms_per_tick(bpm, self.division)
    }

    /// The number of mapped events.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no events were mapped.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn merged_order(file: &MidiFile) -> Vec<EventId> {
    let mut positioned: Vec<(u64, EventId)> = file
        .events()
        .map(|(id, event)| (event.absolute_ticks, id))
        .collect();
    // Stable sort keeps per-track order for events on the same tick.
    positioned.sort_by_key(|(ticks, id)| (*ticks, id.track));
    positioned.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{midi_bytes, note_off, note_on, tempo};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_bpm_rounding() {
        assert_eq!(micros_per_quarter_to_bpm(500_000), 120.0);
        assert_eq!(micros_per_quarter_to_bpm(666_667), 90.0);
        assert_eq!(micros_per_quarter_to_bpm(461_538), 130.0);
        assert_eq!(micros_per_quarter_to_bpm(700_000), 85.71);
    }

    #[test]
    fn test_constant_tempo() {
        let bytes = midi_bytes(
            480,
            vec![vec![
                note_on(0, 0, 60, 100),
                note_off(480, 0, 60),
                note_on(240, 0, 62, 100),
                note_off(1000, 0, 62),
            ]],
        );
        let file = MidiFile::parse(&bytes).unwrap();
        let map = TimeMap::build(&file);

        for (id, event) in file.events() {
            let time = map.get(id).unwrap();
            let expected = event.absolute_ticks as f64 * 60_000.0 / (120.0 * 480.0);
            assert_close(time.absolute_ms, expected);
        }

        let off = map.get(EventId { track: 0, index: 1 }).unwrap();
        assert_close(off.absolute_ms, 500.0);
        assert_close(off.delta_ms, 500.0);
        let next = map.get(EventId { track: 0, index: 2 }).unwrap();
        assert_close(next.delta_ms, 250.0);
    }

    #[test]
    fn test_tempo_track_applies_to_other_tracks() {
        // 120 -> 90 BPM at tick 0 on the conductor track.
        let bytes = midi_bytes(
            480,
            vec![
                vec![tempo(0, 666_667)],
                vec![note_on(480, 0, 60, 100), note_off(480, 0, 60)],
            ],
        );
        let file = MidiFile::parse(&bytes).unwrap();
        let map = TimeMap::build(&file);

        let note_on_time = map.get(EventId { track: 1, index: 0 }).unwrap();
        let note_off_time = map.get(EventId { track: 1, index: 1 }).unwrap();
        let ms_per_quarter_at_90 = 60_000.0 / 90.0;
        assert_close(note_on_time.absolute_ms, ms_per_quarter_at_90);
        assert_close(note_off_time.absolute_ms, 2.0 * ms_per_quarter_at_90);
        assert_eq!(map.tempo_changes().len(), 1);
        assert_eq!(map.tempo_changes()[0].bpm, 90.0);
    }

    #[test]
    fn test_tempo_change_only_affects_later_events() {
        let bytes = midi_bytes(
            480,
            vec![
                vec![tempo(960, 1_000_000)],
                vec![
                    note_on(480, 0, 60, 100),
                    note_off(480, 0, 60),
                    note_on(480, 0, 62, 100),
                ],
            ],
        );
        let file = MidiFile::parse(&bytes).unwrap();
        let map = TimeMap::build(&file);

        // Before and at the change: 120 BPM.
        assert_close(map.get(EventId { track: 1, index: 0 }).unwrap().absolute_ms, 500.0);
        assert_close(map.get(EventId { track: 1, index: 1 }).unwrap().absolute_ms, 1000.0);
        // One quarter after the change at 60 BPM.
        assert_close(map.get(EventId { track: 1, index: 2 }).unwrap().absolute_ms, 2000.0);

        let mut previous = 0.0;
        for (_, time) in map.playback_order() {
            assert!(time.absolute_ms >= previous);
            previous = time.absolute_ms;
        }
        assert_close(map.ticks_to_ms(1440), 2000.0);
        assert_close(map.ticks_to_ms(480), 500.0);
    }

    #[test]
    fn test_merge_tie_order() {
        let bytes = midi_bytes(
            96,
            vec![
                vec![note_on(10, 0, 60, 100)],
                vec![note_on(10, 1, 61, 100), note_on(0, 1, 62, 100)],
            ],
        );
        let file = MidiFile::parse(&bytes).unwrap();
        let map = TimeMap::build(&file);
        let order: Vec<EventId> = map.playback_order().map(|(id, _)| id).collect();

        let position = |id: EventId| order.iter().position(|o| *o == id).unwrap();
        assert!(position(EventId { track: 0, index: 0 }) < position(EventId { track: 1, index: 0 }));
        assert!(position(EventId { track: 1, index: 0 }) < position(EventId { track: 1, index: 1 }));
        assert_eq!(map.len(), file.events().count());
    }

    #[test]
    fn test_missing_event() {
        let map = TimeMap::default();
        assert!(map.get(EventId { track: 3, index: 1 }).is_none());
        assert!(map.absolute_ms(EventId { track: 3, index: 1 }).is_none());
        assert!(map.is_empty());
    }
}
