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

//! Voice bookkeeping on the trigger side.
//!
//! The audio thread owns the voices themselves; this only keeps their handles so a
//! retrigger can cut the note's previous voice and shutdown can silence everything.

use std::time::Instant;

use tracing::debug;

use crate::audio::VoiceHandle;

/// A voice the trigger side knows about.
struct ActiveVoice {
    /// The MIDI note that triggered this voice.
    note: u8,
    /// When this voice was triggered.
    start_time: Instant,
    /// Stop/finished state shared with the audio thread.
    handle: VoiceHandle,
}

/// Tracks triggered voices and enforces per-note polyphony.
#[derive(Default)]
pub struct VoiceManager {
    voices: Vec<ActiveVoice>,
}

impl VoiceManager {
    /// Creates a new voice manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new voice for the note. If the note already has `polyphony` voices
    /// playing, the oldest are removed and returned so the caller can stop them.
    pub fn add_voice(
        &mut self,
        note: u8,
        handle: VoiceHandle,
        polyphony: usize,
    ) -> Vec<VoiceHandle> {
        self.voices.retain(|v| !v.handle.is_finished());

        let mut to_stop = Vec::new();
        let polyphony = polyphony.max(1);
        loop {
            let playing = self.voices.iter().filter(|v| v.note == note).count();
            if playing < polyphony {
                break;
            }

            let oldest = self
                .voices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.note == note)
                .min_by_key(|(_, v)| v.start_time)
                .map(|(index, _)| index);
            match oldest {
                Some(index) => {
                    let stolen = self.voices.remove(index);
                    debug!(note, voice = stolen.handle.id(), "Cutting previous voice");
                    to_stop.push(stolen.handle);
                }
                None => break,
            }
        }

        self.voices.push(ActiveVoice {
            note,
            start_time: Instant::now(),
            handle,
        });
        to_stop
    }

    /// Returns the number of voices that haven't finished.
    pub fn active_count(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| !v.handle.is_finished())
            .count()
    }

    /// Clears all voices.
    /// Returns the handles of the voices that were still playing.
    pub fn clear(&mut self) -> Vec<VoiceHandle> {
        self.voices
            .drain(..)
            .filter(|v| !v.handle.is_finished())
            .map(|v| v.handle)
            .collect()
    }
}

impl std::fmt::Debug for VoiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceManager")
            .field("active_voices", &self.active_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::{Envelope, Voice};

    fn make_voice(note: u8) -> (Voice, VoiceHandle) {
        Voice::new(note, Arc::new(vec![vec![1.0; 16]]), Envelope::new(16, 1, 1.0))
    }

    #[test]
    fn test_retrigger_cuts_previous() {
        let mut manager = VoiceManager::new();

        let (_voice1, handle1) = make_voice(36);
        assert!(manager.add_voice(36, handle1.clone(), 1).is_empty());
        assert_eq!(manager.active_count(), 1);

        let (_voice2, handle2) = make_voice(36);
        let stopped = manager.add_voice(36, handle2, 1);
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].id(), handle1.id());
        assert_eq!(manager.active_count(), 1);
    }

    #[test]
    fn test_other_notes_unaffected() {
        let mut manager = VoiceManager::new();

        let (_kick, kick) = make_voice(36);
        let (_snare, snare) = make_voice(38);
        manager.add_voice(36, kick, 1);
        assert!(manager.add_voice(38, snare, 1).is_empty());
        assert_eq!(manager.active_count(), 2);
    }

    #[test]
    fn test_polyphony_steals_oldest() {
        let mut manager = VoiceManager::new();

        let handles: Vec<VoiceHandle> = (0..4).map(|_| make_voice(38).1).collect();
        for handle in &handles {
            assert!(manager.add_voice(38, handle.clone(), 4).is_empty());
        }

        let (_voice, fifth) = make_voice(38);
        let stopped = manager.add_voice(38, fifth, 4);
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].id(), handles[0].id());
        assert_eq!(manager.active_count(), 4);
    }

    #[test]
    fn test_finished_voices_pruned() {
        let mut manager = VoiceManager::new();

        let (mut voice, handle) = make_voice(60);
        manager.add_voice(60, handle, 1);

        // Render past the end so the voice marks itself finished.
        let mut output = vec![0.0f32; 64];
        voice.render_into(&mut output, 2);
        assert_eq!(manager.active_count(), 0);

        // Nothing left to cut.
        let (_voice, next) = make_voice(60);
        assert!(manager.add_voice(60, next, 1).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut manager = VoiceManager::new();
        let (_a, a) = make_voice(1);
        let (_b, b) = make_voice(2);
        manager.add_voice(1, a, 1);
        manager.add_voice(2, b, 1);

        let stopped = manager.clear();
        assert_eq!(stopped.len(), 2);
        assert_eq!(manager.active_count(), 0);
    }
}
