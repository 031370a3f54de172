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
use std::{error::Error, fmt};

use parking_lot::Mutex;
use tracing::info;

use super::mixer::AudioMixer;
use super::VoiceSender;

const MOCK_SAMPLE_RATE: u32 = 48000;
const MOCK_CHANNELS: u16 = 2;

/// A mock device. Doesn't actually play anything; the mixer only runs when a test
/// asks it to render.
pub struct Device {
    name: String,
    /// Present while the device is started.
    mixer: Mutex<Option<AudioMixer>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            mixer: Mutex::new(None),
        }
    }

    /// Returns true if the device has been started and not stopped.
    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.mixer.lock().is_some()
    }

    /// Renders the given number of frames the way the audio callback would. Returns an
    /// empty buffer if the device isn't running.
    #[cfg(test)]
    pub fn render(&self, frames: usize) -> Vec<f32> {
        match self.mixer.lock().as_mut() {
            Some(mixer) => {
                let mut output = vec![0.0f32; frames * usize::from(mixer.num_channels())];
                mixer.process_into_output(&mut output);
                output
            }
            None => Vec::new(),
        }
    }

    /// Returns the number of voices the mixer is playing.
    #[cfg(test)]
    pub fn active_voices(&self) -> usize {
        self.mixer.lock().as_ref().map_or(0, |m| m.active_count())
    }
}

impl super::Device for Device {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> u32 {
        MOCK_SAMPLE_RATE
    }

    fn num_channels(&self) -> u16 {
        MOCK_CHANNELS
    }

    fn start(&self) -> Result<VoiceSender, Box<dyn Error>> {
        let mut mixer = self.mixer.lock();
        if mixer.is_some() {
            return Err(format!("{} is already started", self.name).into());
        }

        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        *mixer = Some(AudioMixer::new(MOCK_CHANNELS, voice_rx));
        info!(device = self.name, "Started mock output");
        Ok(voice_tx)
    }

    fn stop(&self) {
        if self.mixer.lock().take().is_some() {
            info!(device = self.name, "Stopped mock output");
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
