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

//! Matches incoming MIDI against the bindings and starts voices.

use parking_lot::Mutex;

use midly::live::LiveEvent;
use midly::MidiMessage;
use tracing::{debug, error, info};

use super::binder::PlaybackBinding;
use super::voice::VoiceManager;
use crate::audio::VoiceSender;
use crate::mapping::MAX_MIDI_NOTE;

/// The sample engine turns note-on events into voices.
pub struct SampleEngine {
    /// Immutable bindings, in mapping order.
    bindings: Vec<PlaybackBinding>,
    /// Index into `bindings` for each MIDI note. A later binding for the same note
    /// replaces an earlier one.
    by_note: [Option<usize>; MAX_MIDI_NOTE as usize + 1],
    /// Voice manager for polyphony.
    voice_manager: Mutex<VoiceManager>,
    /// Channel to the audio thread.
    voice_tx: VoiceSender,
}

impl SampleEngine {
    /// Creates a new sample engine.
    pub fn new(bindings: Vec<PlaybackBinding>, voice_tx: VoiceSender) -> Self {
        let mut by_note = [None; MAX_MIDI_NOTE as usize + 1];
        for (index, binding) in bindings.iter().enumerate() {
            let listener = binding.listener();
            for note in listener.first()..=listener.last() {
                by_note[usize::from(note)] = Some(index);
            }
        }

        Self {
            bindings,
            by_note,
            voice_manager: Mutex::new(VoiceManager::new()),
            voice_tx,
        }
    }

    /// Processes an incoming MIDI event. Returns true if it started a voice.
    /// Note-off, and note-on with velocity 0, are ignored: samples play to completion.
    pub fn process_midi_event(&self, raw_event: &[u8]) -> bool {
        let event = match LiveEvent::parse(raw_event) {
            Ok(e) => e,
            Err(e) => {
                debug!(error = ?e, "Failed to parse MIDI event");
                return false;
            }
        };

        match event {
            LiveEvent::Midi {
                channel,
                message: MidiMessage::NoteOn { key, vel },
            } if u8::from(vel) > 0 => {
                self.trigger(u8::from(channel), u8::from(key), u8::from(vel))
            }
            _ => false,
        }
    }

    /// Starts the bound sample for a note-on, cutting the note's previous voice
    /// once it is over the binding's polyphony.
    fn trigger(&self, channel: u8, note: u8, velocity: u8) -> bool {
        let binding = match self.by_note[usize::from(note)].map(|i| &self.bindings[i]) {
            Some(binding) if binding.listener().matches(channel, note) => binding,
            _ => return false,
        };

        let (voice, handle) = binding.trigger(note, velocity);

        // Hold the lock until the voice is sent so two triggers for the same note
        // can't interleave their cut and add.
        let mut vm = self.voice_manager.lock();
        for previous in vm.add_voice(note, handle, binding.listener().polyphony()) {
            previous.stop();
        }

        if let Err(e) = self.voice_tx.send(voice) {
            error!(error = %e, "Failed to send voice to mixer");
            return false;
        }
        drop(vm);

        debug!(
            note,
            channel,
            velocity,
            sample = %binding.entry(),
            "Sample triggered"
        );
        true
    }

    /// Stops all sample playback.
    pub fn stop_all(&self) {
        let to_stop = self.voice_manager.lock().clear();

        let stopped_count = to_stop.len();
        for handle in to_stop {
            handle.stop();
        }

        if stopped_count > 0 {
            info!(stopped = stopped_count, "All samples stopped");
        }
    }

    /// Returns the number of active voices.
    pub fn active_voice_count(&self) -> usize {
        self.voice_manager.lock().active_count()
    }

    /// Returns the number of bindings.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

impl std::fmt::Debug for SampleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleEngine")
            .field("bindings", &self.bindings.len())
            .field("active_voices", &self.active_voice_count())
            .finish()
    }
}
