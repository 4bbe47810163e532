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
use super::TrackAndChannel;

/// Failures surfaced to the user while importing a MIDI file as notes.
#[derive(Debug, thiserror::Error)]
pub enum NotationError {
    #[error("No channel in the MIDI file contains notes")]
    NoNoteChannels,

    #[error("No notes found in {0}")]
    NoNotesInChannel(TrackAndChannel),

    #[error("{0} does not exist in the MIDI file")]
    UnknownTrack(TrackAndChannel),

    #[error("Invalid beats per minute: {0}")]
    InvalidBpm(f64),
}
