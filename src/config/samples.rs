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
use serde::Deserialize;

/// There are only 128 MIDI notes, so there is never a reason to bind more samples.
pub const MAX_SAMPLES: usize = 128;

/// Audio file extensions recognized by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["wav", "aif", "aiff", "flac", "mp3", "ogg"];

/// A YAML representation of the sample directory settings.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Samples {
    /// The allowed audio file extensions (case-insensitive, no leading dot).
    extensions: Option<Vec<String>>,

    /// The maximum number of samples to bind. Never more than 128.
    max_samples: Option<usize>,
}

impl Samples {
    /// New will create a new samples configuration.
    #[cfg(test)]
    pub fn new(extensions: Option<Vec<String>>, max_samples: Option<usize>) -> Samples {
        Samples {
            extensions,
            max_samples,
        }
    }

    /// Returns the lowercased extension allow-list.
    pub fn extensions(&self) -> Vec<String> {
        match &self.extensions {
            Some(extensions) => extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            None => DEFAULT_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    /// Returns the maximum number of samples, clamped to 128.
    pub fn max_samples(&self) -> usize {
        self.max_samples.unwrap_or(MAX_SAMPLES).min(MAX_SAMPLES)
    }
}
