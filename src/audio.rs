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
use std::any::Any;
use std::{error::Error, fmt, sync::Arc};

pub mod cpal;
pub mod envelope;
pub mod mixer;
pub mod mock;
pub mod sample_source;
pub mod voice;

pub use envelope::Envelope;
pub use voice::{Voice, VoiceHandle};

/// Sends new voices to a running output stream.
pub type VoiceSender = crossbeam_channel::Sender<Voice>;

/// Receives new voices on the audio thread.
pub type VoiceReceiver = crossbeam_channel::Receiver<Voice>;

pub trait Device: Any + fmt::Display + std::marker::Send + std::marker::Sync {
    /// The name of the device.
    fn name(&self) -> &str;

    /// The sample rate the output stream runs at. Samples are resampled to this rate.
    fn sample_rate(&self) -> u32;

    /// The number of output channels.
    fn num_channels(&self) -> u16;

    /// Opens the output stream and starts mixing. Voices sent on the returned sender
    /// start playing on the next audio block.
    fn start(&self) -> Result<VoiceSender, Box<dyn Error>>;

    /// Closes the output stream. Voices still playing are cut. Stopping a device that
    /// isn't running does nothing.
    fn stop(&self);
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets a device with the given name, or the host's default output if no name is given.
pub fn get_device(name: Option<&str>) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    if let Some(name) = name {
        if name.starts_with("mock") {
            return Ok(Arc::new(mock::Device::get(name)));
        }
    }

    Ok(Arc::new(cpal::Device::get(name)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_mock_device() {
        let device = get_device(Some("mock-output")).unwrap();
        assert_eq!(device.name(), "mock-output");
        assert_eq!(device.num_channels(), 2);
        assert_eq!(device.to_string(), "mock-output (Mock)");
    }
}
