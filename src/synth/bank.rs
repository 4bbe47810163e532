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
//! Patch banks: mono sample data per General MIDI program.
//!
//! A bank is described by a YAML manifest naming a WAV file per program:
//!
//! ```yaml
//! default_program: 0
//! programs:
//!   0: { file: piano.wav, root_key: 60 }
//!   33: { file: bass.wav, root_key: 36, gain: 0.8, loop: [1200, 4800] }
//! drums: { file: kit.wav, root_key: 36 }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use super::error::SynthError;
use super::resource::BankResource;
use crate::audio::samples::to_mono_audio_samples;

/// The MIDI channel reserved for percussion.
pub const PERCUSSION_CHANNEL: u8 = 9;

const PROGRAM_COUNT: usize = 128;
const DEFAULT_ROOT_KEY: u8 = 60;

/// A single playable sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub name: String,
    /// Mono sample data.
    pub data: Vec<f32>,
    pub sample_rate: u32,
    /// The key the sample plays back unshifted at.
    pub root_key: u8,
    pub gain: f32,
    /// Sustain loop as (start, end) sample indices.
    pub loop_region: Option<(usize, usize)>,
}

#[derive(Debug, Deserialize)]
struct BankManifest {
    default_program: Option<u8>,
    #[serde(default)]
    programs: BTreeMap<u8, PatchDefinition>,
    drums: Option<PatchDefinition>,
}

#[derive(Debug, Deserialize)]
struct PatchDefinition {
    file: String,
    root_key: Option<u8>,
    gain: Option<f32>,
    #[serde(rename = "loop")]
    loop_region: Option<(usize, usize)>,
}

/// A set of patches indexed by program number, plus an optional drum patch.
#[derive(Debug, Clone)]
pub struct PatchBank {
    name: String,
    programs: Vec<Option<Patch>>,
    drums: Option<Patch>,
    default_program: Option<u8>,
}

impl PatchBank {
    /// Creates an empty bank.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            programs: vec![None; PROGRAM_COUNT],
            drums: None,
            default_program: None,
        }
    }

    /// Loads the bank described by the manifest `manifest_name` in `resource`.
    pub fn load(resource: &dyn BankResource, manifest_name: &str) -> Result<Self, SynthError> {
        let manifest = String::from_utf8(resource.read(manifest_name)?)?;
        let manifest: BankManifest = serde_yml::from_str(&manifest)?;

        let mut bank = PatchBank::new(manifest_name);
        bank.default_program = manifest.default_program;

        // The same file may back several programs.
        let mut cache: HashMap<String, Arc<(Vec<f32>, u32)>> = HashMap::new();
        let mut load_patch = |definition: &PatchDefinition| -> Result<Patch, SynthError> {
            let decoded = match cache.get(&definition.file) {
                Some(decoded) => decoded.clone(),
                None => {
                    let decoded = Arc::new(decode_wav(&resource.read(&definition.file)?)?);
                    cache.insert(definition.file.clone(), decoded.clone());
                    decoded
                }
            };
            let (data, sample_rate) = decoded.as_ref();
            let patch = Patch {
                name: definition.file.clone(),
                data: data.clone(),
                sample_rate: *sample_rate,
                root_key: definition.root_key.unwrap_or(DEFAULT_ROOT_KEY).min(127),
                gain: definition.gain.unwrap_or(1.0),
                loop_region: definition.loop_region,
            };
            validate_patch(&patch)?;
            Ok(patch)
        };

        for (program, definition) in manifest.programs.iter() {
            if usize::from(*program) >= PROGRAM_COUNT {
                return Err(SynthError::InvalidProgram(*program));
            }
            let patch = load_patch(definition)?;
            debug!(program, patch = %patch.name, "Loaded patch");
            bank.programs[usize::from(*program)] = Some(patch);
        }
        if let Some(definition) = manifest.drums.as_ref() {
            bank.drums = Some(load_patch(definition)?);
        }

        if let Some(default_program) = bank.default_program {
            if bank.program(default_program).is_none() {
                return Err(SynthError::InvalidProgram(default_program));
            }
        }

        info!(
            bank = manifest_name,
            programs = bank.programs.iter().flatten().count(),
            drums = bank.drums.is_some(),
            "Loaded patch bank"
        );
        Ok(bank)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the patch for a program.
    pub fn insert(&mut self, program: u8, patch: Patch) -> Result<(), SynthError> {
        validate_patch(&patch)?;
        match self.programs.get_mut(usize::from(program)) {
            Some(slot) => {
                *slot = Some(patch);
                Ok(())
            }
            None => Err(SynthError::InvalidProgram(program)),
        }
    }

    pub fn set_drums(&mut self, patch: Patch) -> Result<(), SynthError> {
        validate_patch(&patch)?;
        self.drums = Some(patch);
        Ok(())
    }

    pub fn set_default_program(&mut self, program: Option<u8>) {
        self.default_program = program;
    }

    pub fn program(&self, program: u8) -> Option<&Patch> {
        self.programs.get(usize::from(program))?.as_ref()
    }

    pub fn drums(&self) -> Option<&Patch> {
        self.drums.as_ref()
    }

    /// The program used when a channel's program has no patch.
    pub fn default_program(&self) -> Option<u8> {
        self.default_program
    }
}

fn validate_patch(patch: &Patch) -> Result<(), SynthError> {
    if patch.data.len() < 2 {
        return Err(SynthError::EmptySample(patch.name.clone()));
    }
    if let Some((start, end)) = patch.loop_region {
        if start >= end || end >= patch.data.len() {
            return Err(SynthError::InvalidLoop {
                patch: patch.name.clone(),
                start,
                end,
                len: patch.data.len(),
            });
        }
    }
    Ok(())
}

/// Decodes a WAV file into mono f32 samples and its sample rate.
pub fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32), SynthError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok((
        to_mono_audio_samples(&interleaved, spec.channels),
        spec.sample_rate,
    ))
}
