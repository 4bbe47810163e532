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
//! Conversion of karaoke MIDI files into beat-quantized notes with lyrics.
//!
//! The pipeline is:
//! - extract the lyric events of the track with the most text events
//! - pick the (track, channel) whose note-on timing best matches the lyrics
//! - pair note-on/note-off events of that channel into notes
//! - assign lyric syllables to the notes

mod beats;
mod error;
mod importer;
mod lyrics;
mod matcher;
mod notes;

pub use beats::BeatGrid;
pub use error::NotationError;
pub use importer::{ImportOptions, SongImporter, SongNotation, HELD_SYLLABLE};
pub use lyrics::{extract_lyrics, normalize_lyric, ExtractedLyrics, LyricEvent};
pub use matcher::{match_distance, note_channels, select_channel, ChannelNotes};
pub use notes::{extract_notes, Note};

/// Identifies a source of notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackAndChannel {
    pub track: usize,
    pub channel: u8,
}

impl TrackAndChannel {
    pub fn new(track: usize, channel: u8) -> Self {
        Self { track, channel }
    }
}

impl std::fmt::Display for TrackAndChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track {} channel {}", self.track, self.channel)
    }
}
