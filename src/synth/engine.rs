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
//! Polyphonic sample engine.
//!
//! Turns channel messages into voices and mixes the voices into mono output.
//! Nothing here allocates after construction, so the engine can run inside
//! the audio callback.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::bank::{Patch, PatchBank, PERCUSSION_CHANNEL};
use super::voice::{PatchSlot, Voice, VoiceManager};
use crate::config;

const CHANNEL_COUNT: usize = 16;
const DEFAULT_VOLUME: u8 = 100;

const CC_VOLUME: u8 = 7;
const CC_ALL_SOUND_OFF: u8 = 120;
const CC_RESET_ALL_CONTROLLERS: u8 = 121;
const CC_ALL_NOTES_OFF: u8 = 123;

/// Mixes patch voices for all 16 MIDI channels.
pub struct SynthEngine {
    sample_rate: u32,
    bank: Option<Arc<PatchBank>>,
    voices: VoiceManager,
    programs: [u8; CHANNEL_COUNT],
    volumes: [f32; CHANNEL_COUNT],
    release_samples: u32,
    gain: f32,
    /// Samples rendered so far. Orders voices for stealing.
    position: u64,
}

impl fmt::Debug for SynthEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthEngine")
            .field("sample_rate", &self.sample_rate)
            .field("bank", &self.bank.as_ref().map(|bank| bank.name().to_string()))
            .field("active_voices", &self.voices.active_count())
            .field("position", &self.position)
            .finish()
    }
}

impl SynthEngine {
    pub fn new(sample_rate: u32, config: &config::Synth) -> Self {
        let release_samples = (config.release_ms() * f64::from(sample_rate) / 1000.0).round() as u32;
        Self {
            sample_rate,
            bank: None,
            voices: VoiceManager::new(config.max_voices()),
            programs: [0; CHANNEL_COUNT],
            volumes: [volume(DEFAULT_VOLUME); CHANNEL_COUNT],
            release_samples,
            gain: config.gain(),
            position: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Swaps the bank, silencing every voice. Returns the previous bank.
    pub fn set_bank(&mut self, bank: Option<Arc<PatchBank>>) -> Option<Arc<PatchBank>> {
        self.voices.clear();
        std::mem::replace(&mut self.bank, bank)
    }

    /// Starts a note. A velocity of zero is a note off.
    pub fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        if velocity == 0 {
            self.note_off(channel, key);
            return;
        }
        let channel = channel & 0x0f;
        let key = key.min(127);

        let Some((slot, patch)) = self.resolve_patch(channel) else {
            debug!(channel, key, "No patch for channel, dropping note");
            return;
        };
        let voice = Voice::new(
            channel,
            key,
            velocity,
            slot,
            patch,
            self.sample_rate,
            self.position,
        );

        // Retriggering a held note releases the previous voice.
        self.voices
            .handle_note_off(key, channel, self.release_samples);
        self.voices.add_voice(voice);
    }

    /// Releases a note.
    pub fn note_off(&mut self, channel: u8, key: u8) {
        self.voices
            .handle_note_off(key, channel & 0x0f, self.release_samples);
    }

    /// Releases every note, or cuts them if `immediate` is set.
    pub fn note_off_all(&mut self, immediate: bool) {
        if immediate {
            self.voices.clear();
        } else {
            self.voices.release_all(self.release_samples);
        }
    }

    pub fn program_change(&mut self, channel: u8, program: u8) {
        self.programs[usize::from(channel & 0x0f)] = program.min(127);
    }

    /// Channel mode messages only affect the channel they are sent on.
    pub fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        let channel = channel & 0x0f;
        let index = usize::from(channel);
        match controller {
            CC_VOLUME => self.volumes[index] = volume(value),
            CC_RESET_ALL_CONTROLLERS => self.volumes[index] = volume(DEFAULT_VOLUME),
            CC_ALL_SOUND_OFF => self.voices.clear_channel(channel),
            CC_ALL_NOTES_OFF => self.voices.release_channel(channel, self.release_samples),
            _ => {}
        }
    }

    /// Restores programs and controllers to their defaults and cuts every voice.
    pub fn reset(&mut self) {
        self.voices.clear();
        self.programs = [0; CHANNEL_COUNT];
        self.volumes = [volume(DEFAULT_VOLUME); CHANNEL_COUNT];
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.active_count()
    }

    /// Renders the next `output.len()` mono samples.
    pub fn render(&mut self, output: &mut [f32]) {
        output.fill(0.0);

        if let Some(bank) = self.bank.as_deref() {
            for voice in self.voices.voices_mut() {
                let patch = match voice.program() {
                    PatchSlot::Program(program) => bank.program(program),
                    PatchSlot::Drums => bank.drums(),
                };
                if let Some(patch) = patch {
                    let volume = self.volumes[usize::from(voice.channel())] * self.gain;
                    voice.render(patch, self.release_samples, volume, output);
                }
            }
            self.voices.remove_finished();
        }

        for sample in output.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
        self.position += output.len() as u64;
    }

    /// Picks the patch a note on `channel` plays: the drum patch on the
    /// percussion channel, else the channel's program, else the bank default.
    fn resolve_patch(&self, channel: u8) -> Option<(PatchSlot, &Patch)> {
        let bank = self.bank.as_deref()?;
        if channel == PERCUSSION_CHANNEL {
            if let Some(drums) = bank.drums() {
                return Some((PatchSlot::Drums, drums));
            }
        }

        let program = self.programs[usize::from(channel)];
        if let Some(patch) = bank.program(program) {
            return Some((PatchSlot::Program(program), patch));
        }
        let fallback = bank.default_program()?;
        bank.program(fallback)
            .map(|patch| (PatchSlot::Program(fallback), patch))
    }
}

fn volume(value: u8) -> f32 {
    f32::from(value.min(127)) / 127.0
}
