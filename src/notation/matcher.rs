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
use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};

use super::error::NotationError;
use super::lyrics::LyricEvent;
use super::TrackAndChannel;
use crate::midi::{EventId, MidiEventKind, MidiFile, TimeMap};

/// The NoteOn times of a single track and channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelNotes {
    pub source: TrackAndChannel,
    /// Absolute NoteOn times in playback order.
    pub note_on_ms: Vec<f64>,
}

/// Lists every track and channel that has at least one NoteOn.
pub fn note_channels(file: &MidiFile, time_map: &TimeMap) -> Vec<ChannelNotes> {
    let mut channels: BTreeMap<TrackAndChannel, Vec<f64>> = BTreeMap::new();

    for (track_index, track) in file.tracks.iter().enumerate() {
        for (index, event) in track.events.iter().enumerate() {
            let (MidiEventKind::NoteOn { .. }, Some(channel)) = (&event.kind, event.channel) else {
                continue;
            };
            let id = EventId {
                track: track_index,
                index,
            };
            if let Some(absolute_ms) = time_map.absolute_ms(id) {
                channels
                    .entry(TrackAndChannel::new(track_index, channel))
                    .or_default()
                    .push(absolute_ms);
            }
        }
    }

    channels
        .into_iter()
        .map(|(source, note_on_ms)| ChannelNotes { source, note_on_ms })
        .collect()
}

/// Total time distance of greedily matching each lyric to the nearest
/// remaining note.
///
/// Matching is monotonic: once a note is matched, it and every earlier note
/// are consumed. Lyrics left without a note add their own absolute time, and
/// so do notes left over after the last match.
pub fn match_distance(note_on_ms: &[f64], lyrics: &[LyricEvent]) -> f64 {
    let mut total = 0.0;
    let mut cursor = 0;

    for lyric in lyrics {
        let nearest = note_on_ms[cursor..]
            .iter()
            .enumerate()
            .map(|(offset, ms)| (offset, (ms - lyric.absolute_ms).abs()))
            .fold(None, |best: Option<(usize, f64)>, candidate| match best {
                Some((_, best_distance)) if best_distance <= candidate.1 => best,
                _ => Some(candidate),
            });

        match nearest {
            Some((offset, distance)) => {
                total += distance;
                cursor += offset + 1;
            }
            None => total += lyric.absolute_ms,
        }
    }

    total + note_on_ms[cursor..].iter().sum::<f64>()
}

/// Picks the track and channel whose notes best line up with the lyrics.
pub fn select_channel(
    candidates: &[ChannelNotes],
    lyrics: &[LyricEvent],
) -> Result<TrackAndChannel, NotationError> {
    match candidates {
        [] => Err(NotationError::NoNoteChannels),
        [only] => {
            debug!(source = %only.source, "Only one channel with notes");
            Ok(only.source)
        }
        _ => {
            let distances: Vec<f64> = candidates
                .par_iter()
                .map(|candidate| match_distance(&candidate.note_on_ms, lyrics))
                .collect();

            for (candidate, distance) in candidates.iter().zip(distances.iter()) {
                debug!(source = %candidate.source, distance, "Channel match distance");
            }

            // Ties keep the earliest candidate.
            let (best, distance) = distances
                .iter()
                .enumerate()
                .fold((0, distances[0]), |(best, best_distance), (index, distance)| {
                    if *distance < best_distance {
                        (index, *distance)
                    } else {
                        (best, best_distance)
                    }
                });

            info!(
                source = %candidates[best].source,
                distance,
                "Selected channel for lyrics"
            );
            Ok(candidates[best].source)
        }
    }
}
