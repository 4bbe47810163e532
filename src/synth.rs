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
//! Sample-based General MIDI synthesizer.
//!
//! This module provides:
//! - Patch banks loaded from read-only resources
//! - A polyphonic engine with voice stealing
//! - Sample-accurate sequencing of MIDI files
//! - A controller/renderer split so the audio callback never locks or allocates

mod bank;
mod engine;
mod error;
mod resource;
mod ring;
mod sequencer;
mod synthesizer;
mod voice;

pub use bank::{decode_wav, Patch, PatchBank, PERCUSSION_CHANNEL};
pub use engine::SynthEngine;
pub use error::SynthError;
pub use resource::{
    BankResource, BundledResource, FileSystemResource, MemoryResource, ResourceError, ASSETS_ENV,
};
pub use sequencer::{Sequence, SequenceMessage, SequencedEvent, Sequencer};
pub use synthesizer::{SampleSynthesizer, SynthController, SynthRenderer, SynthState, CHUNK_SIZE};
