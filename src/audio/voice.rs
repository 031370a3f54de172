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
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use super::envelope::Envelope;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// Control side of a voice. Lets the trigger thread stop a voice and see when it
/// has finished without touching the audio thread's state.
#[derive(Clone, Debug)]
pub struct VoiceHandle {
    id: u64,
    stopped: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl VoiceHandle {
    fn new(id: u64) -> VoiceHandle {
        VoiceHandle {
            id,
            stopped: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the voice ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Asks the audio thread to drop the voice on its next block.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    /// Returns true if the voice has been asked to stop.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Returns true once the audio thread is done with the voice.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }
}

/// A single playing instance of a sample. Owned by the audio thread once sent.
pub struct Voice {
    /// The MIDI note that triggered this voice.
    note: u8,
    /// Planar sample data shared with the loaded sample.
    data: Arc<Vec<Vec<f32>>>,
    /// Current frame position.
    position: usize,
    /// Amplitude envelope, as long as the sample.
    envelope: Envelope,
    /// Shared stop/finished state.
    handle: VoiceHandle,
}

impl Voice {
    /// Creates a new voice over the given planar data. The envelope length should match
    /// the number of frames in the data.
    pub fn new(note: u8, data: Arc<Vec<Vec<f32>>>, envelope: Envelope) -> (Voice, VoiceHandle) {
        let handle = VoiceHandle::new(NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed));
        (
            Voice {
                note,
                data,
                position: 0,
                envelope,
                handle: handle.clone(),
            },
            handle,
        )
    }

    /// Returns the MIDI note that triggered this voice.
    #[cfg(test)]
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Mixes the voice into an interleaved output block. The first source channel goes
    /// to output 0 and the second to output 1; mono sources feed both. Returns false
    /// once the voice has finished.
    pub fn render_into(&mut self, output: &mut [f32], num_channels: usize) -> bool {
        if num_channels == 0 {
            return self.finish();
        }

        let left = match self.data.first() {
            Some(left) => left,
            None => return self.finish(),
        };
        let right = self.data.get(1).unwrap_or(left);
        let length = self.envelope.length().min(left.len()).min(right.len());

        for frame in output.chunks_exact_mut(num_channels) {
            if self.handle.is_stopped() || self.position >= length {
                return self.finish();
            }

            let gain = self.envelope.gain_at(self.position);
            let l = left[self.position] * gain;
            let r = right[self.position] * gain;
            if num_channels > 1 {
                frame[0] += l;
                frame[1] += r;
            } else {
                frame[0] += (l + r) * 0.5;
            }
            self.position += 1;
        }

        if self.position >= length {
            return self.finish();
        }
        true
    }

    fn finish(&mut self) -> bool {
        self.handle.mark_finished();
        false
    }
}

impl std::fmt::Debug for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voice")
            .field("id", &self.handle.id())
            .field("note", &self.note)
            .field("position", &self.position)
            .field("length", &self.envelope.length())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(channels: usize, frames: usize, value: f32) -> Arc<Vec<Vec<f32>>> {
        Arc::new(vec![vec![value; frames]; channels])
    }

    #[test]
    fn test_mono_feeds_both_outputs() {
        let (mut voice, handle) = Voice::new(60, flat(1, 8, 0.5), Envelope::new(8, 1, 1.0));
        let mut output = vec![0.0f32; 8];

        assert!(voice.render_into(&mut output, 2));
        // Frame 0 is silent because of the attack ramp.
        assert_eq!(&output[0..2], &[0.0, 0.0]);
        assert_eq!(&output[2..4], &[0.5, 0.5]);
        assert_eq!(output[4], output[5]);
        assert!(!handle.is_finished());
    }

    #[test]
    fn test_stereo_routing() {
        let data = Arc::new(vec![vec![0.25; 4], vec![-0.25; 4]]);
        let (mut voice, _) = Voice::new(1, data, Envelope::new(4, 1, 1.0));
        let mut output = vec![0.0f32; 4];

        voice.render_into(&mut output, 2);
        assert_eq!(&output[2..4], &[0.25, -0.25]);
    }

    #[test]
    fn test_extra_channels_ignored() {
        let data = Arc::new(vec![vec![0.1; 4], vec![0.2; 4], vec![0.9; 4]]);
        let (mut voice, _) = Voice::new(1, data, Envelope::new(4, 1, 1.0));
        let mut output = vec![0.0f32; 12];

        voice.render_into(&mut output, 3);
        assert!((output[3] - 0.1).abs() < 1e-6);
        assert!((output[4] - 0.2).abs() < 1e-6);
        assert_eq!(output[5], 0.0);
    }

    #[test]
    fn test_plays_to_completion() {
        let (mut voice, handle) = Voice::new(60, flat(1, 6, 1.0), Envelope::new(6, 1, 1.0));
        let mut output = vec![0.0f32; 8];

        assert!(voice.render_into(&mut output, 2));
        assert!(!voice.render_into(&mut output, 2));
        assert!(handle.is_finished());
    }

    #[test]
    fn test_stop() {
        let (mut voice, handle) = Voice::new(60, flat(1, 100, 1.0), Envelope::new(100, 1, 1.0));
        let mut output = vec![0.0f32; 8];

        handle.stop();
        assert!(!voice.render_into(&mut output, 2));
        assert!(handle.is_finished());
        assert!(output.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_mono_output() {
        let data = Arc::new(vec![vec![0.2; 4], vec![0.4; 4]]);
        let (mut voice, _) = Voice::new(1, data, Envelope::new(4, 1, 1.0));
        let mut output = vec![0.0f32; 4];

        voice.render_into(&mut output, 1);
        assert!((output[1] - 0.3).abs() < 1e-6);
    }
}
