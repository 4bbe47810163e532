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
//! Voice management for polyphonic sample playback.
//!
//! Handles voice allocation, stealing, and note-off behavior.

use tracing::warn;

use super::bank::Patch;

/// Represents an active voice playing a patch.
#[derive(Debug, Clone)]
pub struct Voice {
    /// The MIDI channel that triggered this voice.
    channel: u8,
    /// The MIDI note that triggered this voice.
    key: u8,
    /// The program the patch was resolved from, so it can be looked up again.
    program: PatchSlot,
    /// Engine sample position when the voice started.
    started_at: u64,
    /// Read position in the patch data.
    position: f64,
    /// Patch samples advanced per output sample.
    step: f64,
    /// Velocity and patch gain.
    gain: f32,
    /// Output samples left in the release, if the note has been let go.
    release_left: Option<u32>,
    finished: bool,
}

/// Where a voice's patch lives in the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchSlot {
    Program(u8),
    Drums,
}

impl Voice {
    /// Creates a voice for `key` on `patch`, rendering at `output_rate`.
    pub fn new(
        channel: u8,
        key: u8,
        velocity: u8,
        program: PatchSlot,
        patch: &Patch,
        output_rate: u32,
        started_at: u64,
    ) -> Self {
        let semitones = f64::from(key) - f64::from(patch.root_key);
        let step = 2f64.powf(semitones / 12.0) * f64::from(patch.sample_rate)
            / f64::from(output_rate.max(1));

        Self {
            channel,
            key,
            program,
            started_at,
            position: 0.0,
            step,
            gain: patch.gain * f32::from(velocity.min(127)) / 127.0,
            release_left: None,
            finished: patch.data.is_empty(),
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn program(&self) -> PatchSlot {
        self.program
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn is_releasing(&self) -> bool {
        self.release_left.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Checks if this voice matches a Note Off event.
    pub fn matches_note_off(&self, key: u8, channel: u8) -> bool {
        self.key == key && self.channel == channel && !self.is_releasing()
    }

    /// Starts the release. A zero length release cuts the voice.
    pub fn release(&mut self, release_samples: u32) {
        if self.release_left.is_some() {
            return;
        }
        if release_samples == 0 {
            self.finished = true;
        } else {
            self.release_left = Some(release_samples);
        }
    }

    /// Mixes this voice into `output`, scaled by `volume`.
    pub fn render(&mut self, patch: &Patch, release_samples: u32, volume: f32, output: &mut [f32]) {
        let data = &patch.data;
        let last = data.len().saturating_sub(1);

        for out in output.iter_mut() {
            if self.finished {
                return;
            }

            if let Some((loop_start, loop_end)) = patch.loop_region {
                if self.release_left.is_none() && self.position >= loop_end as f64 {
                    self.position -= (loop_end - loop_start) as f64;
                }
            }
            if self.position >= last as f64 {
                self.finished = true;
                return;
            }

            let index = self.position as usize;
            let frac = (self.position - index as f64) as f32;
            let s0 = data[index];
            let s1 = data[index + 1];
            let mut sample = (s0 + (s1 - s0) * frac) * self.gain * volume;

            if let Some(left) = self.release_left.as_mut() {
                sample *= *left as f32 / release_samples.max(1) as f32;
                *left -= 1;
                if *left == 0 {
                    self.finished = true;
                }
            }

            *out += sample;
            self.position += self.step;
        }
    }
}

/// Manages active voices for sample playback.
#[derive(Debug)]
pub struct VoiceManager {
    /// Active voices. Capacity is reserved up front and never exceeded.
    voices: Vec<Voice>,
    /// Global maximum voices limit.
    max_voices: usize,
}

impl VoiceManager {
    /// Creates a new voice manager.
    pub fn new(max_voices: usize) -> Self {
        let max_voices = max_voices.max(1);
        Self {
            voices: Vec::with_capacity(max_voices),
            max_voices,
        }
    }

    /// Adds a new voice, stealing the oldest voice if the limit is reached.
    /// Returns true if a voice was stolen.
    pub fn add_voice(&mut self, voice: Voice) -> bool {
        let mut stolen = false;
        if self.voices.len() >= self.max_voices {
            if let Some(oldest) = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.started_at)
                .map(|(index, _)| index)
            {
                self.voices.swap_remove(oldest);
                stolen = true;
                warn!(
                    max_voices = self.max_voices,
                    "Global voice limit reached, stealing oldest"
                );
            }
        }

        self.voices.push(voice);
        stolen
    }

    /// Releases every held voice for the note and channel.
    pub fn handle_note_off(&mut self, key: u8, channel: u8, release_samples: u32) {
        for voice in self
            .voices
            .iter_mut()
            .filter(|v| v.matches_note_off(key, channel))
        {
            voice.release(release_samples);
        }
    }

    /// Releases every voice.
    pub fn release_all(&mut self, release_samples: u32) {
        for voice in self.voices.iter_mut() {
            voice.release(release_samples);
        }
    }

    /// Drops every voice immediately.
    pub fn clear(&mut self) {
        self.voices.clear();
    }

    /// Releases every voice on one channel.
    pub fn release_channel(&mut self, channel: u8, release_samples: u32) {
        for voice in self.voices.iter_mut().filter(|v| v.channel() == channel) {
            voice.release(release_samples);
        }
    }

    /// Cuts every voice on one channel.
    pub fn clear_channel(&mut self, channel: u8) {
        self.voices.retain(|voice| voice.channel() != channel);
    }

    /// Removes voices that have finished playing.
    pub fn remove_finished(&mut self) {
        self.voices.retain(|v| !v.is_finished());
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    /// Returns the number of active voices.
    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }
}
