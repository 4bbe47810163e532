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
use serde::Deserialize;

/// Defaults for importing MIDI files as song notation.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Import {
    /// Song BPM. The MIDI file's initial tempo when unset.
    bpm: Option<f64>,

    /// Song gap in milliseconds.
    gap_ms: Option<f64>,
}

impl Import {
    pub fn bpm(&self) -> Option<f64> {
        self.bpm
    }

    pub fn gap_ms(&self) -> Option<f64> {
        self.gap_ms
    }
}
