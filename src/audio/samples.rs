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
//! Utilities for working with in-memory sample buffers.

use std::borrow::Cow;

/// Averages interleaved multi-channel samples into mono.
pub fn to_mono_audio_samples(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Copies the frames between `start_ms` and `start_ms + length_ms`, clamped to
/// the buffer. Multi-channel data is averaged to mono if requested.
pub fn get_audio_samples(
    interleaved: &[f32],
    channels: u16,
    sample_rate: u32,
    start_ms: f64,
    length_ms: f64,
    to_mono: bool,
) -> Vec<f32> {
    let channels_usize = channels.max(1) as usize;
    let total_frames = interleaved.len() / channels_usize;
    let ms_to_frames = |ms: f64| (ms.max(0.0) * f64::from(sample_rate) / 1000.0) as usize;

    let start_frame = ms_to_frames(start_ms).min(total_frames);
    let end_frame = start_frame
        .saturating_add(ms_to_frames(length_ms))
        .min(total_frames);
    let range = &interleaved[start_frame * channels_usize..end_frame * channels_usize];

    if to_mono {
        to_mono_audio_samples(range, channels)
    } else {
        range.to_vec()
    }
}

/// Resamples mono data with linear interpolation.
///
/// Returns the input unchanged (borrowed) when the rates are equal. The first
/// and last output samples are copied from the first and last input samples.
pub fn resample(samples: &[f32], old_rate: u32, new_rate: u32) -> Cow<'_, [f32]> {
    if old_rate == new_rate || samples.is_empty() || old_rate == 0 {
        return Cow::Borrowed(samples);
    }

    let new_len = (samples.len() as u64 * u64::from(new_rate) / u64::from(old_rate)) as usize;
    let last = samples.len() - 1;
    match new_len {
        0 => return Cow::Owned(Vec::new()),
        1 => return Cow::Owned(vec![samples[0]]),
        _ => {}
    }

    let step = last as f64 / (new_len - 1) as f64;
    let mut output = Vec::with_capacity(new_len);
    output.push(samples[0]);
    for i in 1..new_len - 1 {
        let position = i as f64 * step;
        let index = position.floor() as usize;
        let frac = (position - index as f64) as f32;

        let s0 = samples[index];
        let s1 = samples.get(index + 1).copied().unwrap_or(s0);
        output.push(s0 + (s1 - s0) * frac);
    }
    output.push(samples[last]);

    Cow::Owned(output)
}

/// Splits the samples into `buckets` ranges and returns the (min, max) of each,
/// for drawing a waveform.
pub fn waveform_peaks(samples: &[f32], buckets: usize) -> Vec<(f32, f32)> {
    if samples.is_empty() || buckets == 0 {
        return Vec::new();
    }
    let bucket_size = samples.len().div_ceil(buckets);
    samples
        .chunks(bucket_size)
        .map(|chunk| {
            chunk
                .iter()
                .fold((f32::MAX, f32::MIN), |(min, max), &s| (min.min(s), max.max(s)))
        })
        .collect()
}

/// Calculate RMS (Root Mean Square) of a signal
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_mono() {
        assert_eq!(
            to_mono_audio_samples(&[1.0, -1.0, 0.5, 0.5], 2),
            vec![0.0, 0.5]
        );
        assert_eq!(to_mono_audio_samples(&[0.25, 0.5], 1), vec![0.25, 0.5]);
    }

    #[test]
    fn test_resample_same_rate_borrows() {
        let samples = vec![0.1, 0.2, 0.3];
        let result = resample(&samples, 44100, 44100);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert!(std::ptr::eq(result.as_ptr(), samples.as_ptr()));
    }

    #[test]
    fn test_resample_halves_length() {
        let samples: Vec<f32> = (0..1001).map(|i| (i as f32 * 0.01).sin()).collect();
        let result = resample(&samples, 44100, 22050);
        let expected = samples.len() / 2;
        assert!(result.len().abs_diff(expected) <= 1);
        assert_eq!(result[0], samples[0]);
        assert_eq!(result[result.len() - 1], samples[samples.len() - 1]);
    }

    #[test]
    fn test_resample_interpolates() {
        let samples = vec![0.0, 1.0, 2.0, 3.0];
        let result = resample(&samples, 4, 7);
        assert_eq!(result.len(), 7);
        assert_eq!(result[0], 0.0);
        assert_eq!(result[6], 3.0);
        for (i, value) in result.iter().enumerate() {
            assert!((value - i as f32 * 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_get_audio_samples() {
        // 1000 Hz stereo, left = frame index, right = negative frame index
        let interleaved: Vec<f32> = (0..100)
            .flat_map(|frame| [frame as f32, -(frame as f32)])
            .collect();

        let stereo = get_audio_samples(&interleaved, 2, 1000, 10.0, 5.0, false);
        assert_eq!(stereo, vec![10.0, -10.0, 11.0, -11.0, 12.0, -12.0, 13.0, -13.0, 14.0, -14.0]);

        let mono = get_audio_samples(&interleaved, 2, 1000, 10.0, 5.0, true);
        assert_eq!(mono, vec![0.0; 5]);

        // Clamped at the end.
        let tail = get_audio_samples(&interleaved, 2, 1000, 98.0, 50.0, false);
        assert_eq!(tail.len(), 4);
        assert!(get_audio_samples(&interleaved, 2, 1000, 500.0, 50.0, true).is_empty());
    }

    #[test]
    fn test_waveform_peaks() {
        let peaks = waveform_peaks(&[0.1, -0.5, 0.9, 0.2, -0.3], 2);
        assert_eq!(peaks, vec![(-0.5, 0.9), (-0.3, 0.2)]);
        assert!(waveform_peaks(&[], 4).is_empty());
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[1.0, -1.0, 1.0, -1.0]) - 1.0).abs() < 1e-6);
    }
}
