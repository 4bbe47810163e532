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
//! YAML configuration with `ULTRAMIDI_*` environment overrides.
//!
//! Every section and field is optional:
//!
//! ```yaml
//! audio:
//!   device: default
//!   sample_rate: 48000
//!   channels: 2
//! synth:
//!   max_voices: 64
//!   release_ms: 30
//! bank:
//!   path: /usr/share/ultramidi/bank
//!   manifest: bank.yaml
//! import:
//!   bpm: 120
//! ```
//!
//! Nested fields are overridden from the environment with a double underscore,
//! e.g. `ULTRAMIDI_SYNTH__MAX_VOICES=16`.

use std::path::Path;

use config::{Environment, File};
use serde::Deserialize;

mod audio;
mod bank;
mod error;
mod import;
mod synth;

pub use self::audio::Audio;
pub use self::bank::Bank;
pub use self::error::ConfigError;
pub use self::import::Import;
pub use self::synth::Synth;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ULTRAMIDI";

/// The full configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    audio: Audio,
    #[serde(default)]
    synth: Synth,
    #[serde(default)]
    bank: Bank,
    #[serde(default)]
    import: Import,
}

impl Config {
    /// Loads the configuration file, if given, and applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Config, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        Ok(builder
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Config>()?)
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn synth(&self) -> &Synth {
        &self.synth
    }

    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    pub fn import(&self) -> &Import {
        &self.import
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use config::FileFormat;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.audio().device(), None);
        assert_eq!(config.audio().sample_rate(), 44100);
        assert_eq!(config.audio().channels(), 2);
        assert_eq!(config.synth().max_voices(), 32);
        assert_eq!(config.synth().command_queue_size(), 1024);
        assert_eq!(config.synth().release_ms(), 50.0);
        assert_eq!(config.bank().path(), None);
        assert_eq!(config.bank().manifest(), "bank.yaml");
        assert_eq!(config.import().bpm(), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let yaml = r#"
            audio:
              device: "USB Audio"
              sample_rate: 48000
            synth:
              max_voices: 8
            import:
              gap_ms: 1500
        "#;
        let config: Config = config::Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.audio().device(), Some("USB Audio"));
        assert_eq!(config.audio().sample_rate(), 48000);
        assert_eq!(config.audio().channels(), 2);
        assert_eq!(config.synth().max_voices(), 8);
        assert_eq!(config.synth().release_ms(), 50.0);
        assert_eq!(config.import().gap_ms(), Some(1500.0));
    }

    #[test]
    fn test_load_file_and_environment() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ultramidi.yaml");
        fs::write(
            &path,
            "synth:\n  max_voices: 12\n  release_ms: 10\nbank:\n  manifest: gm.yaml\n",
        )?;

        std::env::set_var("ULTRAMIDITEST_SYNTH__MAX_VOICES", "4");
        let config = Config::load_with_prefix(Some(&path), "ULTRAMIDITEST");
        std::env::remove_var("ULTRAMIDITEST_SYNTH__MAX_VOICES");
        let config = config?;

        assert_eq!(config.synth().max_voices(), 4);
        assert_eq!(config.synth().release_ms(), 10.0);
        assert_eq!(config.bank().manifest(), "gm.yaml");
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/ultramidi.yaml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
