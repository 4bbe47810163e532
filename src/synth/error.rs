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
use super::resource::ResourceError;
use crate::midi::MidiError;

#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Invalid bank manifest: {0}")]
    Manifest(#[from] serde_yml::Error),

    #[error("Bank manifest is not UTF-8: {0}")]
    ManifestEncoding(#[from] std::string::FromUtf8Error),

    #[error("MIDI error: {0}")]
    Midi(#[from] MidiError),

    #[error("Program {0} is out of range or has no patch")]
    InvalidProgram(u8),

    #[error("Patch {0} has fewer than two samples")]
    EmptySample(String),

    #[error("Patch {patch} has invalid loop {start}..{end} for {len} samples")]
    InvalidLoop {
        patch: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Synthesizer command queue is full")]
    CommandQueueFull,

    #[error("Synthesizer renderer has been dropped")]
    RendererDisconnected,
}
