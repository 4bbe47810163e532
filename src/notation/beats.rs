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
/// The song's beat grid, used to quantize milliseconds into beats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatGrid {
    pub beats_per_minute: f64,
    /// Milliseconds before beat zero.
    pub gap_ms: f64,
}

impl BeatGrid {
    pub fn new(beats_per_minute: f64, gap_ms: f64) -> Self {
        Self {
            beats_per_minute,
            gap_ms,
        }
    }

    pub fn millis_to_beats(&self, millis: f64) -> f64 {
        (millis - self.gap_ms) * self.beats_per_minute / 60_000.0
    }

    pub fn beats_to_millis(&self, beats: f64) -> f64 {
        self.gap_ms + beats * 60_000.0 / self.beats_per_minute
    }

    /// Rounds to the nearest whole beat.
    pub fn millis_to_beat(&self, millis: f64) -> i32 {
        self.millis_to_beats(millis).round() as i32
    }
}
