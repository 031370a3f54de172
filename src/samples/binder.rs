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

//! Binds each mapped sample to the MIDI note that plays it.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, span, Level};

use super::loader::{LoadedSample, SampleLoader};
use crate::audio::{Voice, VoiceHandle};
use crate::error::SamplerError;
use crate::mapping::SampleEntry;
use crate::runtime::Runtime;
use crate::util::duration_to_frames;

/// Listens for note-on events in a note range on one MIDI channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteListener {
    /// Lowest note, inclusive.
    first: u8,
    /// Highest note, inclusive.
    last: u8,
    /// Wire channel, 0-15.
    channel: u8,
    /// Voices allowed per note.
    polyphony: usize,
}

impl NoteListener {
    /// A listener for exactly one note with a single voice.
    pub fn for_note(note: u8, channel: u8) -> NoteListener {
        NoteListener {
            first: note,
            last: note,
            channel,
            polyphony: 1,
        }
    }

    /// Returns true if a note-on with this channel and note should trigger.
    pub fn matches(&self, channel: u8, note: u8) -> bool {
        channel == self.channel && (self.first..=self.last).contains(&note)
    }

    pub fn first(&self) -> u8 {
        self.first
    }

    pub fn last(&self) -> u8 {
        self.last
    }

    #[cfg(test)]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn polyphony(&self) -> usize {
        self.polyphony
    }
}

/// A loaded sample and the listener that plays it.
pub struct PlaybackBinding {
    entry: SampleEntry,
    listener: NoteListener,
    sample: LoadedSample,
    /// Envelope ramp length in output frames.
    ramp_frames: usize,
}

impl PlaybackBinding {
    /// Creates a new binding.
    pub fn new(
        entry: SampleEntry,
        listener: NoteListener,
        sample: LoadedSample,
        ramp_frames: usize,
    ) -> PlaybackBinding {
        PlaybackBinding {
            entry,
            listener,
            sample,
            ramp_frames,
        }
    }

    /// Creates a voice that plays the whole sample once at the given velocity.
    pub fn trigger(&self, note: u8, velocity: u8) -> (Voice, VoiceHandle) {
        self.sample.create_voice(note, velocity, self.ramp_frames)
    }

    pub fn entry(&self) -> &SampleEntry {
        &self.entry
    }

    pub fn listener(&self) -> &NoteListener {
        &self.listener
    }

    #[cfg(test)]
    pub fn sample(&self) -> &LoadedSample {
        &self.sample
    }

    #[cfg(test)]
    pub fn ramp_frames(&self) -> usize {
        self.ramp_frames
    }
}

impl fmt::Debug for PlaybackBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackBinding")
            .field("entry", &self.entry)
            .field("listener", &self.listener)
            .field("sample", &self.sample)
            .field("ramp_frames", &self.ramp_frames)
            .finish()
    }
}

/// Loads every mapped sample at the runtime's output rate and binds it to its note
/// on the given channel. Any file that can't be decoded fails the whole batch.
pub fn bind_all(
    runtime: &Runtime,
    entries: Vec<SampleEntry>,
    ramp: Duration,
    channel: u8,
) -> Result<Vec<PlaybackBinding>, SamplerError> {
    let span = span!(Level::INFO, "bind samples");
    let _enter = span.enter();

    let sample_rate = runtime.sample_rate();
    let ramp_frames = duration_to_frames(ramp, sample_rate).max(1);

    let mut loader = SampleLoader::new(sample_rate);
    let paths: Vec<&Path> = entries.iter().map(|e| e.file_path()).collect();
    let samples = loader.load_all(&paths)?;

    let bindings: Vec<PlaybackBinding> = entries
        .into_iter()
        .zip(samples)
        .map(|(entry, sample)| {
            let listener = NoteListener::for_note(entry.midi_note(), channel);
            debug!(binding = %entry, channel, "Bound sample");
            PlaybackBinding::new(entry, listener, sample, ramp_frames)
        })
        .collect();

    info!(
        bindings = bindings.len(),
        sample_rate,
        ramp_frames,
        memory_kb = loader.total_memory_usage() / 1024,
        "Samples bound"
    );

    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::audio::mock;
    use crate::config;
    use crate::mapping;
    use crate::testutil::write_wav;

    #[test]
    fn test_note_listener() {
        let listener = NoteListener::for_note(60, 0);
        assert_eq!(listener.first(), 60);
        assert_eq!(listener.last(), 60);
        assert_eq!(listener.channel(), 0);
        assert_eq!(listener.polyphony(), 1);

        assert!(listener.matches(0, 60));
        assert!(!listener.matches(0, 61));
        assert!(!listener.matches(0, 59));
        assert!(!listener.matches(1, 60));
        assert!(!listener.matches(9, 60));
    }

    #[test]
    fn test_bind_all() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = ["36.wav", "38.wav"]
            .iter()
            .map(|n| dir.path().join(n))
            .collect();
        write_wav(&files[0], vec![vec![0.5f32; 4800]], 48000).unwrap();
        let stereo = vec![vec![0.25f32; 960], vec![-0.25f32; 960]];
        write_wav(&files[1], stereo, 48000).unwrap();

        let audio = Arc::new(mock::Device::get("mock-binder"));
        let runtime = Runtime::new(audio.clone(), None).unwrap();
        let mapping = mapping::resolve(&files);

        let bindings = bind_all(
            &runtime,
            mapping.into_entries(),
            Duration::from_millis(1),
            0,
        )
        .unwrap();

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].listener().first(), 36);
        assert_eq!(bindings[1].listener().first(), 38);
        assert_eq!(bindings[0].ramp_frames(), 48);
        assert_eq!(bindings[0].sample().frames(), 4800);
        assert_eq!(bindings[1].sample().channel_count(), 2);
        assert_eq!(bindings[1].entry().file_path(), files[1].as_path());
    }

    #[test]
    fn test_bind_all_fails_on_bad_sample() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("0.wav");
        let bad = dir.path().join("1.wav");
        write_wav(&good, vec![vec![0.5f32; 100]], 48000).unwrap();
        std::fs::write(&bad, b"garbage").unwrap();

        let audio = Arc::new(mock::Device::get("mock-binder"));
        let runtime = Runtime::new(audio, None).unwrap();
        let entries = vec![SampleEntry::new(good, 0), SampleEntry::new(bad.clone(), 1)];

        match bind_all(&runtime, entries, Duration::from_millis(1), 0) {
            Err(SamplerError::SampleLoad { path, .. }) => assert_eq!(path, bad),
            other => panic!("expected sample load error, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_all_uses_configured_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("36.wav");
        write_wav(&path, vec![vec![0.5f32; 100]], 48000).unwrap();

        let audio = Arc::new(mock::Device::get("mock-binder"));
        let runtime = Runtime::new(audio, None).unwrap();
        let default_midi = config::Midi::default();
        let entries = vec![SampleEntry::new(path.clone(), 36)];
        let bindings = bind_all(
            &runtime,
            entries,
            Duration::from_millis(1),
            default_midi.channel().unwrap(),
        )
        .unwrap();
        assert_eq!(bindings[0].listener().channel(), 0);
        assert!(bindings[0].listener().matches(0, 36));

        let drums = config::Midi::new(None, Some(9));
        let entries = vec![SampleEntry::new(path, 36)];
        let bindings = bind_all(
            &runtime,
            entries,
            Duration::from_millis(1),
            drums.channel().unwrap(),
        )
        .unwrap();
        assert_eq!(bindings[0].listener().channel(), 9);
        assert!(bindings[0].listener().matches(9, 36));
        assert!(!bindings[0].listener().matches(0, 36));
    }

    #[test]
    fn test_trigger_plays_whole_sample_with_velocity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("60.wav");
        write_wav(&path, vec![vec![1.0f32; 480]], 48000).unwrap();

        let audio = Arc::new(mock::Device::get("mock-binder"));
        let runtime = Runtime::new(audio.clone(), None).unwrap();
        let bindings = bind_all(
            &runtime,
            vec![SampleEntry::new(path, 60)],
            Duration::from_millis(1),
            0,
        )
        .unwrap();

        let (mut voice, handle) = bindings[0].trigger(60, 127);
        let mut output = vec![0.0f32; 480 * 2];
        assert!(!voice.render_into(&mut output, 2));
        assert!(handle.is_finished());

        // Ramps at both ends, full level in the middle, same on both outputs.
        assert_eq!(output[0], 0.0);
        assert!((output[240 * 2] - 1.0).abs() < 1e-6);
        assert_eq!(output[240 * 2], output[240 * 2 + 1]);
        assert_eq!(output[479 * 2], 0.0);

        let (mut quiet, _) = bindings[0].trigger(60, 64);
        let mut output = vec![0.0f32; 480 * 2];
        quiet.render_into(&mut output, 2);
        assert!((output[240 * 2] - 64.0 / 127.0).abs() < 1e-6);
    }
}
