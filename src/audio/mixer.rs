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
// Core audio mixing logic shared by the CPAL and mock devices.
use super::voice::Voice;
use super::VoiceReceiver;

/// Sums active voices into interleaved output blocks. Owned by the audio thread:
/// new voices arrive over a channel so the callback never takes a lock.
pub struct AudioMixer {
    /// Voices currently playing.
    voices: Vec<Voice>,
    /// Incoming voices from the trigger thread.
    voice_rx: VoiceReceiver,
    /// Number of output channels.
    num_channels: u16,
}

impl AudioMixer {
    /// Creates a new audio mixer.
    pub fn new(num_channels: u16, voice_rx: VoiceReceiver) -> AudioMixer {
        AudioMixer {
            voices: Vec::with_capacity(32),
            voice_rx,
            num_channels,
        }
    }

    /// Adds a voice directly, bypassing the channel.
    #[cfg(test)]
    pub fn add_voice(&mut self, voice: Voice) {
        self.voices.push(voice);
    }

    /// Picks up any voices sent since the last block.
    fn receive_voices(&mut self) {
        while let Ok(voice) = self.voice_rx.try_recv() {
            self.voices.push(voice);
        }
    }

    /// Fills an interleaved buffer with the next block of audio. The buffer is cleared
    /// first, and voices that finish during the block are dropped.
    pub fn process_into_output(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        self.receive_voices();

        let num_channels = usize::from(self.num_channels);
        self.voices
            .retain_mut(|voice| voice.render_into(output, num_channels));
    }

    /// Returns the number of voices still playing.
    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    /// Gets the number of output channels.
    #[cfg(test)]
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::envelope::Envelope;

    fn voice(value: f32, frames: usize) -> Voice {
        let data = Arc::new(vec![vec![value; frames]]);
        Voice::new(60, data, Envelope::new(frames, 1, 1.0)).0
    }

    #[test]
    fn test_basic_mixing() {
        let (_tx, rx) = crossbeam_channel::unbounded();
        let mut mixer = AudioMixer::new(2, rx);
        mixer.add_voice(voice(0.5, 10));

        let mut output = vec![1.0f32; 8];
        mixer.process_into_output(&mut output);

        // Cleared, then the ramp starts from zero.
        assert_eq!(&output[0..2], &[0.0, 0.0]);
        assert_eq!(&output[2..4], &[0.5, 0.5]);
        assert_eq!(mixer.active_count(), 1);
    }

    #[test]
    fn test_multiple_voice_mixing() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut mixer = AudioMixer::new(2, rx);
        tx.send(voice(0.5, 10)).unwrap();
        tx.send(voice(0.2, 10)).unwrap();

        let mut output = vec![0.0f32; 8];
        mixer.process_into_output(&mut output);

        assert_eq!(mixer.active_count(), 2);
        assert!((output[2] - 0.7).abs() < 1e-6);
        assert!((output[3] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_finished_voices_dropped() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut mixer = AudioMixer::new(2, rx);
        tx.send(voice(0.5, 3)).unwrap();
        tx.send(voice(0.5, 100)).unwrap();

        let mut output = vec![0.0f32; 16];
        mixer.process_into_output(&mut output);
        assert_eq!(mixer.active_count(), 1);

        // Past the end of the short voice, only the long one contributes.
        assert!((output[8] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_silence_without_voices() {
        let (_tx, rx) = crossbeam_channel::unbounded();
        let mut mixer = AudioMixer::new(32, rx);

        let mut output = vec![0.3f32; 64];
        mixer.process_into_output(&mut output);
        assert!(output.iter().all(|s| *s == 0.0));
        assert_eq!(mixer.num_channels(), 32);
    }
}
