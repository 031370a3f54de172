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

//! MIDI-triggered sample playback.
//!
//! This module provides:
//! - Sample loading, resampled to the output rate and held in memory
//! - Binding each sample to the note that plays it
//! - MIDI note-on matching
//! - Per-note voice bookkeeping

mod binder;
mod engine;
mod loader;
mod voice;

pub use binder::{bind_all, NoteListener, PlaybackBinding};
pub use engine::SampleEngine;
pub use loader::{LoadedSample, SampleLoader};
