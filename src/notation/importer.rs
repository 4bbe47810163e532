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
use tracing::{info, warn};

use super::beats::BeatGrid;
use super::error::NotationError;
use super::lyrics::{extract_lyrics, LyricEvent};
use super::matcher::{note_channels, select_channel};
use super::notes::{extract_notes, Note};
use super::TrackAndChannel;
use crate::midi::{MidiFile, TimeMap};

/// Lyric given to notes that no lyric event was matched to.
pub const HELD_SYLLABLE: &str = "~";

/// Overrides for the import.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Use this track and channel instead of matching against the lyrics.
    pub source: Option<TrackAndChannel>,
    /// Song BPM. Defaults to the MIDI file's initial tempo.
    pub beats_per_minute: Option<f64>,
    /// Song gap in milliseconds. Defaults to zero.
    pub gap_ms: Option<f64>,
}

/// The result of importing a MIDI file.
#[derive(Debug, Clone, PartialEq)]
pub struct SongNotation {
    pub beat_grid: BeatGrid,
    /// Where the notes came from.
    pub source: TrackAndChannel,
    /// The track the lyrics came from, if the file has lyrics.
    pub lyrics_track: Option<usize>,
    pub notes: Vec<Note>,
    /// Lyric events that could not be placed on a note.
    pub unmatched_lyrics: usize,
}

/// Imports a MIDI file as beat-quantized notes with lyrics.
#[derive(Debug, Clone, Default)]
pub struct SongImporter {
    options: ImportOptions,
}

impl SongImporter {
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    pub fn import(&self, file: &MidiFile) -> Result<SongNotation, NotationError> {
        let time_map = TimeMap::build(file);

        let lyrics = extract_lyrics(file, &time_map);
        if lyrics.is_none() {
            warn!("MIDI file has no lyric events");
        }
        let lyric_events: &[LyricEvent] = lyrics
            .as_ref()
            .map(|l| l.events.as_slice())
            .unwrap_or(&[]);

        let source = match self.options.source {
            Some(source) => {
                if source.track >= file.tracks.len() {
                    return Err(NotationError::UnknownTrack(source));
                }
                source
            }
            None => select_channel(&note_channels(file, &time_map), lyric_events)?,
        };

        let beats_per_minute = self
            .options
            .beats_per_minute
            .unwrap_or_else(|| file.initial_tempo_bpm());
        if !beats_per_minute.is_finite() || beats_per_minute <= 0.0 {
            return Err(NotationError::InvalidBpm(beats_per_minute));
        }
        let beat_grid = BeatGrid::new(beats_per_minute, self.options.gap_ms.unwrap_or(0.0));

        let mut notes = extract_notes(file, source, &time_map, &beat_grid);
        if notes.is_empty() {
            return Err(NotationError::NoNotesInChannel(source));
        }

        let unmatched_lyrics = assign_lyrics(&mut notes, lyric_events, &beat_grid);

        info!(
            %source,
            notes = notes.len(),
            lyrics = lyric_events.len(),
            unmatched_lyrics,
            bpm = beats_per_minute,
            "Imported MIDI notes"
        );

        Ok(SongNotation {
            beat_grid,
            source,
            lyrics_track: lyrics.map(|l| l.track),
            notes,
            unmatched_lyrics,
        })
    }
}

/// Places each lyric on the note whose start is nearest, consuming notes in
/// order. Returns the number of lyrics that found no note.
///
/// Line delimiters are stripped from the syllables and recorded as a line
/// break on the note that starts the new line. A lyric that is only a
/// delimiter does not take a note.
fn assign_lyrics(notes: &mut [Note], lyrics: &[LyricEvent], beat_grid: &BeatGrid) -> usize {
    let mut cursor = 0;
    let mut unmatched = 0;
    let mut pending_break = false;

    for lyric in lyrics {
        let syllable = lyric.text.trim_matches('\n');
        if syllable.is_empty() {
            pending_break |= lyric.text.contains('\n');
            continue;
        }
        let starts_line = pending_break || lyric.text.starts_with('\n');
        pending_break = lyric.text.ends_with('\n');

        let lyric_beat = beat_grid.millis_to_beats(lyric.absolute_ms);
        let nearest = notes[cursor..]
            .iter()
            .enumerate()
            .map(|(offset, note)| (offset, (f64::from(note.start_beat) - lyric_beat).abs()))
            .fold(None, |best: Option<(usize, f64)>, candidate| match best {
                Some((_, best_distance)) if best_distance <= candidate.1 => best,
                _ => Some(candidate),
            });

        match nearest {
            Some((offset, _)) => {
                let note = &mut notes[cursor + offset];
                note.lyric = syllable.replace('\n', " ");
                note.line_break = starts_line && cursor + offset > 0;
                cursor += offset + 1;
            }
            None => {
                warn!(
                    ms = lyric.absolute_ms,
                    text = %lyric.text,
                    "No note left for lyric"
                );
                unmatched += 1;
            }
        }
    }

    for note in notes.iter_mut().filter(|note| note.lyric.is_empty()) {
        note.lyric = HELD_SYLLABLE.to_string();
    }

    unmatched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{lyric, midi_bytes, note_off, note_on, tempo};

    /// Conductor track at 90 BPM, a vocal track with lyrics on channel 0 and an
    /// accompaniment on channel 1 that is off the lyric timing.
    fn karaoke_file() -> MidiFile {
        let bytes = midi_bytes(
            480,
            vec![
                vec![tempo(0, 666_667)],
                vec![
                    lyric(0, "Hel"),
                    note_on(0, 0, 60, 100),
                    note_off(480, 0, 60),
                    lyric(0, "lo"),
                    note_on(0, 0, 62, 100),
                    note_off(480, 0, 62),
                    lyric(0, "world"),
                    note_on(0, 0, 64, 100),
                    note_off(960, 0, 64),
                ],
                vec![
                    note_on(240, 1, 40, 100),
                    note_off(720, 1, 40),
                    note_on(0, 1, 43, 100),
                    note_off(960, 1, 43),
                ],
            ],
        );
        MidiFile::parse(&bytes).unwrap()
    }

    #[test]
    fn test_import() {
        let notation = SongImporter::default().import(&karaoke_file()).unwrap();

        assert_eq!(notation.source, TrackAndChannel::new(1, 0));
        assert_eq!(notation.lyrics_track, Some(1));
        assert_eq!(notation.beat_grid.beats_per_minute, 90.0);
        assert_eq!(notation.unmatched_lyrics, 0);

        let summary: Vec<(i32, i32, u8, &str)> = notation
            .notes
            .iter()
            .map(|n| (n.start_beat, n.end_beat, n.pitch, n.lyric.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![(0, 1, 60, "Hel"), (1, 2, 62, "lo"), (2, 4, 64, "world")]
        );
    }

    #[test]
    fn test_import_line_breaks() {
        let bytes = midi_bytes(
            480,
            vec![vec![
                lyric(0, "Hel"),
                note_on(0, 0, 60, 100),
                note_off(480, 0, 60),
                lyric(0, "/lo"),
                note_on(0, 0, 62, 100),
                note_off(480, 0, 62),
                lyric(0, "world\r\n"),
                note_on(0, 0, 64, 100),
                note_off(480, 0, 64),
                lyric(0, "/"),
                lyric(0, "again"),
                note_on(0, 0, 65, 100),
                note_off(480, 0, 65),
            ]],
        );
        let file = MidiFile::parse(&bytes).unwrap();
        let notation = SongImporter::default().import(&file).unwrap();

        let summary: Vec<(i32, &str, bool)> = notation
            .notes
            .iter()
            .map(|n| (n.start_beat, n.lyric.as_str(), n.line_break))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, "Hel", false),
                (1, "lo", true),
                (2, "world", false),
                (3, "again", true),
            ]
        );
        assert!(notation.notes.iter().all(|n| !n.lyric.contains('\n')));
        assert_eq!(notation.unmatched_lyrics, 0);
    }

    #[test]
    fn test_forced_source() {
        let options = ImportOptions {
            source: Some(TrackAndChannel::new(2, 1)),
            beats_per_minute: Some(180.0),
            gap_ms: None,
        };
        let notation = SongImporter::new(options).import(&karaoke_file()).unwrap();
        assert_eq!(notation.source, TrackAndChannel::new(2, 1));
        // 240 ticks at 90 BPM is 333ms, one beat at 180 BPM.
        assert_eq!(notation.notes[0].start_beat, 1);
    }

    #[test]
    fn test_errors() {
        let file = karaoke_file();

        let options = ImportOptions {
            source: Some(TrackAndChannel::new(0, 0)),
            ..Default::default()
        };
        assert!(matches!(
            SongImporter::new(options).import(&file),
            Err(NotationError::NoNotesInChannel(_))
        ));

        let options = ImportOptions {
            source: Some(TrackAndChannel::new(7, 0)),
            ..Default::default()
        };
        assert!(matches!(
            SongImporter::new(options).import(&file),
            Err(NotationError::UnknownTrack(_))
        ));

        let options = ImportOptions {
            beats_per_minute: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            SongImporter::new(options).import(&file),
            Err(NotationError::InvalidBpm(_))
        ));

        let empty = MidiFile::parse(&midi_bytes(480, vec![vec![tempo(0, 500_000)]])).unwrap();
        assert!(matches!(
            SongImporter::default().import(&empty),
            Err(NotationError::NoNoteChannels)
        ));
    }

    #[test]
    fn test_assign_lyrics_unmatched() {
        let grid = BeatGrid::new(120.0, 0.0);
        let mut notes = vec![Note {
            start_beat: 0,
            end_beat: 1,
            pitch: 60,
            lyric: String::new(),
            line_break: false,
        }];
        let lyrics = vec![
            LyricEvent {
                absolute_ms: 0.0,
                text: "a".to_string(),
            },
            LyricEvent {
                absolute_ms: 500.0,
                text: "b".to_string(),
            },
        ];
        assert_eq!(assign_lyrics(&mut notes, &lyrics, &grid), 1);
        assert_eq!(notes[0].lyric, "a");
    }

    #[test]
    fn test_assign_lyrics_held_notes() {
        let grid = BeatGrid::new(120.0, 0.0);
        let mut notes: Vec<Note> = (0..3)
            .map(|beat| Note {
                start_beat: beat * 2,
                end_beat: beat * 2 + 1,
                pitch: 60,
                lyric: String::new(),
                line_break: false,
            })
            .collect();
        let lyrics = vec![LyricEvent {
            absolute_ms: 1000.0,
            text: "mid".to_string(),
        }];
        assert_eq!(assign_lyrics(&mut notes, &lyrics, &grid), 0);
        let texts: Vec<&str> = notes.iter().map(|n| n.lyric.as_str()).collect();
        assert_eq!(texts, vec![HELD_SYLLABLE, "mid", HELD_SYLLABLE]);
    }
}
