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

//! Decides which MIDI note each sample file answers to.
//!
//! If every file name is a MIDI note number (`36.wav`, `60.aif`) the names are used
//! as-is. A single file that isn't turns the whole batch over to sequential
//! numbering in sorted order.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::util::filename_display;

/// The highest MIDI note number.
pub const MAX_MIDI_NOTE: u8 = 127;

/// How file names were turned into MIDI notes. Chosen once per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MappingMode {
    /// Every file name is its own MIDI note number.
    FilenameEncoded,
    /// The Nth file in sorted order plays on note N.
    SequentialIndex,
}

impl fmt::Display for MappingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingMode::FilenameEncoded => write!(f, "filename"),
            MappingMode::SequentialIndex => write!(f, "sequential"),
        }
    }
}

/// A sample file and the MIDI note that plays it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleEntry {
    file_path: PathBuf,
    midi_note: u8,
}

impl SampleEntry {
    /// Creates a new sample entry.
    pub fn new(file_path: PathBuf, midi_note: u8) -> SampleEntry {
        SampleEntry {
            file_path,
            midi_note,
        }
    }

    /// Returns the sample's file path.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Returns the MIDI note that plays this sample.
    pub fn midi_note(&self) -> u8 {
        self.midi_note
    }
}

impl fmt::Display for SampleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} -> {}",
            self.midi_note,
            filename_display(&self.file_path)
        )
    }
}

/// The outcome of mapping a batch of files.
#[derive(Clone, Debug)]
pub struct Mapping {
    mode: MappingMode,
    entries: Vec<SampleEntry>,
}

impl Mapping {
    /// Returns the mode the batch resolved to.
    #[cfg(test)]
    pub fn mode(&self) -> MappingMode {
        self.mode
    }

    /// Returns the entries in the same order as the input files.
    #[cfg(test)]
    pub fn entries(&self) -> &[SampleEntry] {
        &self.entries
    }

    /// Consumes the mapping, returning its entries.
    pub fn into_entries(self) -> Vec<SampleEntry> {
        self.entries
    }
}

/// Parses a file stem as a MIDI note number. Returns None for anything outside 0-127.
pub fn note_from_filename(path: &Path) -> Option<u8> {
    let stem = path.file_stem()?.to_str()?;
    let value: i64 = stem.trim().parse().ok()?;
    if (0..=i64::from(MAX_MIDI_NOTE)).contains(&value) {
        u8::try_from(value).ok()
    } else {
        None
    }
}

/// Maps the sorted files onto MIDI notes. The files are expected to be at most 128
/// long (see [`crate::scanner::scan`]); anything past note 127 is ignored under
/// sequential mapping.
pub fn resolve(files: &[PathBuf]) -> Mapping {
    let encoded: Option<Vec<u8>> = files.iter().map(|f| note_from_filename(f)).collect();

    let mapping = match encoded {
        Some(notes) if !files.is_empty() => Mapping {
            mode: MappingMode::FilenameEncoded,
            entries: files
                .iter()
                .zip(notes)
                .map(|(file, note)| SampleEntry::new(file.clone(), note))
                .collect(),
        },
        _ => {
            if let Some(file) = files.iter().find(|f| note_from_filename(f).is_none()) {
                info!(
                    file = filename_display(file),
                    "File name is not a MIDI note, using sequential mapping"
                );
            }
            Mapping {
                mode: MappingMode::SequentialIndex,
                entries: files
                    .iter()
                    .zip(0..=MAX_MIDI_NOTE)
                    .map(|(file, note)| SampleEntry::new(file.clone(), note))
                    .collect(),
            }
        }
    };

    warn_duplicates(&mapping.entries);

    info!(
        mode = %mapping.mode,
        samples = mapping.entries.len(),
        "Resolved MIDI mapping"
    );

    mapping
}

/// Duplicate notes are left in place; the later binding answers the note. They're
/// reported so the user can rename the files.
fn warn_duplicates(entries: &[SampleEntry]) {
    let mut seen: HashMap<u8, &Path> = HashMap::new();
    for entry in entries {
        if let Some(previous) = seen.insert(entry.midi_note, entry.file_path()) {
            warn!(
                note = entry.midi_note,
                first = filename_display(previous),
                second = filename_display(entry.file_path()),
                "Two samples share a MIDI note"
            );
        }
    }
}
