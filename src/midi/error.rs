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
/// Errors raised while loading a Standard MIDI File.
#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("Not a MIDI file: missing MThd header chunk")]
    MissingHeader,

    #[error("Malformed MIDI file: {0}")]
    Malformed(#[from] midly::Error),

    #[error("Unsupported MIDI timing: SMPTE timecode division ({fps} fps, {subframes} subframes)")]
    UnsupportedTiming { fps: u8, subframes: u8 },

    #[error("Malformed MIDI file: division must be non-zero")]
    ZeroDivision,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
