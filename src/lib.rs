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
//! MIDI import and playback for karaoke songs.
//!
//! Reads Standard MIDI Files, converts them to beat-quantized notes with
//! lyrics, and plays them through a sample-based synthesizer.

pub mod audio;
pub mod config;
pub mod midi;
pub mod notation;
pub mod synth;

#[cfg(test)]
mod testutil;
