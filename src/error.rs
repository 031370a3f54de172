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
use std::path::PathBuf;

use crate::audio::sample_source::error::SampleSourceError;
use crate::config::error::ConfigError;

/// Errors that end a sampler run. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("no sample directory was given")]
    MissingArgument,

    #[error("{} is not a directory", .0.display())]
    InvalidPath(PathBuf),

    #[error("unable to initialize audio backend: {0}")]
    AudioBackendInit(String),

    #[error("unable to initialize MIDI input: {0}")]
    MidiBackendInit(String),

    #[error("failed to load sample {}: {source}", path.display())]
    SampleLoad {
        path: PathBuf,
        #[source]
        source: SampleSourceError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SamplerError {
    /// Returns true if the user should be shown usage along with the error.
    pub fn wants_usage(&self) -> bool {
        matches!(
            self,
            SamplerError::MissingArgument | SamplerError::InvalidPath(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors() {
        assert!(SamplerError::MissingArgument.wants_usage());
        assert!(SamplerError::InvalidPath(PathBuf::from("/nope")).wants_usage());
        assert!(!SamplerError::AudioBackendInit("no device".to_string()).wants_usage());
    }

    #[test]
    fn test_invalid_path_message() {
        let err = SamplerError::InvalidPath(PathBuf::from("/nope"));
        assert_eq!(err.to_string(), "/nope is not a directory");
    }
}
