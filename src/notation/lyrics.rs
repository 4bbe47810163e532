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
use tracing::{debug, warn};

use crate::midi::{EventId, MidiFile, TextKind, TimeMap};

/// Text categories that can carry lyrics, in order of preference.
const LYRIC_KINDS: [TextKind; 3] = [TextKind::Lyric, TextKind::Text, TextKind::Marker];

/// A lyric fragment and the time at which it is sung.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricEvent {
    pub absolute_ms: f64,
    pub text: String,
}

/// The lyric fragments of a file and where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedLyrics {
    pub track: usize,
    pub kind: TextKind,
    pub events: Vec<LyricEvent>,
}

/// Treats carriage returns and slashes as line/syllable delimiters.
pub fn normalize_lyric(text: &str) -> String {
    text.replace("\r\n", "\n").replace(['\r', '/', '\\'], "\n")
}

/// Extracts lyric events from the track with the most text meta-events.
///
/// Lyric events are preferred; text events are only used if there are no
/// lyric events, and marker events only if there are neither. The categories
/// are never merged. Returns `None` if the file has no such events.
pub fn extract_lyrics(file: &MidiFile, time_map: &TimeMap) -> Option<ExtractedLyrics> {
    let track = file
        .tracks
        .iter()
        .enumerate()
        .map(|(index, track)| {
            let count = track
                .events
                .iter()
                .filter(|event| {
                    event
                        .text()
                        .is_some_and(|(kind, _)| LYRIC_KINDS.contains(&kind))
                })
                .count();
            (index, count)
        })
        .filter(|(_, count)| *count > 0)
        // Prefer the lowest index among equal counts.
        .max_by(|(a_index, a_count), (b_index, b_count)| {
            a_count.cmp(b_count).then(b_index.cmp(a_index))
        })
        .map(|(index, _)| index)?;

    let events = &file.tracks[track].events;
    let kind = LYRIC_KINDS.into_iter().find(|kind| {
        events
            .iter()
            .any(|event| event.text().is_some_and(|(k, _)| k == *kind))
    })?;

    let lyrics: Vec<LyricEvent> = events
        .iter()
        .enumerate()
        .filter_map(|(index, event)| match event.text() {
            Some((k, text)) if k == kind => Some((EventId { track, index }, text)),
            _ => None,
        })
        .filter_map(|(id, text)| {
            let absolute_ms = time_map.absolute_ms(id)?;
            Some(LyricEvent {
                absolute_ms,
                text: normalize_lyric(&text),
            })
        })
        .collect();

    if lyrics.is_empty() {
        warn!(track, "Lyric track has no mapped lyric events");
    }
    debug!(track, kind = ?kind, count = lyrics.len(), "Extracted lyrics");

    Some(ExtractedLyrics {
        track,
        kind,
        events: lyrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{lyric, marker, midi_bytes, note_on, text};

    fn extract(tracks: Vec<Vec<midly::TrackEvent<'static>>>) -> Option<ExtractedLyrics> {
        let file = MidiFile::parse(&midi_bytes(480, tracks)).unwrap();
        let time_map = TimeMap::build(&file);
        extract_lyrics(&file, &time_map)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_lyric("Hel"), "Hel");
        assert_eq!(normalize_lyric("/lo"), "\nlo");
        assert_eq!(normalize_lyric("\\world"), "\nworld");
        assert_eq!(normalize_lyric("end\r\n"), "end\n");
        assert_eq!(normalize_lyric("a\rb"), "a\nb");
    }

    #[test]
    fn test_lyrics_preferred_over_markers() {
        let lyrics = extract(vec![vec![
            marker(0, "Verse"),
            lyric(0, "Hel"),
            lyric(480, "lo "),
            lyric(480, "/world"),
        ]])
        .unwrap();

        assert_eq!(lyrics.kind, TextKind::Lyric);
        assert_eq!(lyrics.events.len(), 3);
        assert_eq!(lyrics.events[0].text, "Hel");
        assert_eq!(lyrics.events[2].text, "\nworld");
        assert!((lyrics.events[1].absolute_ms - 500.0).abs() < 1e-9);
        assert!((lyrics.events[2].absolute_ms - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_fallback() {
        let lyrics = extract(vec![vec![
            text(0, midly::MetaMessage::Text(b"la")),
            text(480, midly::MetaMessage::Text(b"la")),
            marker(0, "Chorus"),
        ]])
        .unwrap();
        assert_eq!(lyrics.kind, TextKind::Text);
        assert_eq!(lyrics.events.len(), 2);
    }

    #[test]
    fn test_picks_track_with_most_text_events() {
        let lyrics = extract(vec![
            vec![marker(0, "Intro")],
            vec![note_on(0, 0, 60, 100)],
            vec![lyric(0, "one"), lyric(10, "two")],
        ])
        .unwrap();
        assert_eq!(lyrics.track, 2);
        assert_eq!(lyrics.kind, TextKind::Lyric);
    }

    #[test]
    fn test_no_lyrics() {
        assert!(extract(vec![vec![note_on(0, 0, 60, 100)]]).is_none());
    }
}
