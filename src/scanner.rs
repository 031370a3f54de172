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

//! Finds the audio files in a sample directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config;
use crate::error::SamplerError;
use crate::util::filename_display;

/// Returns the audio files in `dir`, sorted by file name and truncated to the
/// configured maximum. Sub-directories are not searched.
pub fn scan(dir: &Path, settings: &config::Samples) -> Result<Vec<PathBuf>, SamplerError> {
    if !dir.is_dir() {
        return Err(SamplerError::InvalidPath(dir.to_path_buf()));
    }

    let extensions = settings.extensions();
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        if has_allowed_extension(&path, &extensions) {
            files.push(path);
        } else {
            debug!(file = filename_display(&path), "Skipping non-audio file");
        }
    }

    // Sort on the file name alone so the order doesn't depend on how the directory was given.
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let max_samples = settings.max_samples();
    if files.len() > max_samples {
        warn!(
            found = files.len(),
            max_samples,
            "More audio files than MIDI notes, ignoring the rest"
        );
        files.truncate(max_samples);
    }

    if files.is_empty() {
        warn!(dir = ?dir, "No audio files found, nothing will play");
    } else {
        info!(dir = ?dir, files = files.len(), "Scanned sample directory");
    }
    Ok(files)
}

/// Checks the extension case-insensitively against a lowercased allow-list.
fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return false,
    };
    extensions.iter().any(|allowed| *allowed == ext)
}
