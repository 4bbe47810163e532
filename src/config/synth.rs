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

/// Default maximum number of concurrent voices.
pub const DEFAULT_MAX_VOICES: usize = 32;

/// Default capacity of the controller to renderer command queue.
pub const DEFAULT_COMMAND_QUEUE_SIZE: usize = 1024;

const DEFAULT_RELEASE_MS: f64 = 50.0;
const DEFAULT_GAIN: f32 = 0.8;

/// A YAML representation of the synthesizer configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Synth {
    /// Maximum concurrent voices. The oldest voice is stolen past this.
    max_voices: Option<usize>,

    /// Commands that may be queued for the audio thread.
    command_queue_size: Option<usize>,

    /// Length of the note-off release in milliseconds.
    release_ms: Option<f64>,

    /// Master gain applied to the mix.
    gain: Option<f32>,
}

impl Synth {
    pub fn new(max_voices: usize, release_ms: f64, gain: f32) -> Synth {
        Synth {
            max_voices: Some(max_voices),
            command_queue_size: None,
            release_ms: Some(release_ms),
            gain: Some(gain),
        }
    }

    pub fn with_command_queue_size(mut self, command_queue_size: usize) -> Synth {
        self.command_queue_size = Some(command_queue_size);
        self
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES).max(1)
    }

    pub fn command_queue_size(&self) -> usize {
        self.command_queue_size
            .unwrap_or(DEFAULT_COMMAND_QUEUE_SIZE)
            .max(1)
    }

    pub fn release_ms(&self) -> f64 {
        self.release_ms.unwrap_or(DEFAULT_RELEASE_MS).max(0.0)
    }

    pub fn gain(&self) -> f32 {
        self.gain.unwrap_or(DEFAULT_GAIN).max(0.0)
    }
}
