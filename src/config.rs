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
use std::path::Path;

use config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::info;

pub mod audio;
pub mod error;
pub mod midi;
pub mod samples;

pub use self::audio::Audio;
pub use self::midi::Midi;
pub use self::samples::Samples;

use self::error::ConfigError;

/// A YAML representation of the sampler settings. Every section is optional.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Sampler {
    #[serde(default)]
    audio: Audio,

    #[serde(default)]
    midi: Midi,

    #[serde(default)]
    samples: Samples,
}

impl Sampler {
    /// Returns the audio configuration.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// Returns the mutable audio configuration.
    pub fn audio_mut(&mut self) -> &mut Audio {
        &mut self.audio
    }

    /// Returns the MIDI configuration.
    pub fn midi(&self) -> &Midi {
        &self.midi
    }

    /// Returns the mutable MIDI configuration.
    pub fn midi_mut(&mut self) -> &mut Midi {
        &mut self.midi
    }

    /// Returns the sample directory configuration.
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Checks the values that can only be validated after parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.audio.ramp()?;
        self.midi.channel()?;
        Ok(())
    }
}

/// Loads the sampler settings from the given YAML file. Without a file, all defaults apply.
pub fn load(path: Option<&Path>) -> Result<Sampler, ConfigError> {
    let path = match path {
        Some(path) => path,
        None => return Ok(Sampler::default()),
    };

    info!(path = ?path, "Loading sampler configuration");
    let sampler: Sampler = Config::builder()
        .add_source(File::from(path).format(FileFormat::Yaml))
        .build()?
        .try_deserialize()?;
    sampler.validate()?;

    Ok(sampler)
}

/// Parses sampler settings from a YAML string.
#[cfg(test)]
pub fn parse(yaml: &str) -> Result<Sampler, ConfigError> {
    let sampler: Sampler = Config::builder()
        .add_source(File::from_str(yaml, FileFormat::Yaml))
        .build()?
        .try_deserialize()?;
    sampler.validate()?;

    Ok(sampler)
}
