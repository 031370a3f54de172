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
use serde::Deserialize;

use super::error::ConfigError;

/// The MIDI channel note listeners are scoped to (0-indexed, as on the wire).
pub const DEFAULT_MIDI_CHANNEL: u8 = 0;

/// A YAML representation of the MIDI configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Midi {
    /// The MIDI input device. The first available input is used when unset.
    device: Option<String>,

    /// The MIDI channel to listen on, 0-15.
    channel: Option<u8>,
}

impl Midi {
    /// New will create a new MIDI configuration.
    #[cfg(test)]
    pub fn new(device: Option<String>, channel: Option<u8>) -> Midi {
        Midi { device, channel }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Overrides the configured device.
    pub fn set_device(&mut self, device: String) {
        self.device = Some(device);
    }

    /// Returns the MIDI channel to listen on.
    pub fn channel(&self) -> Result<u8, ConfigError> {
        match self.channel {
            Some(channel) if channel > 15 => Err(ConfigError::Invalid {
                key: "midi.channel",
                reason: format!("{} is outside 0-15", channel),
            }),
            Some(channel) => Ok(channel),
            None => Ok(DEFAULT_MIDI_CHANNEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel() {
        assert_eq!(Midi::new(None, None).channel().unwrap(), 0);
        assert_eq!(Midi::new(None, Some(9)).channel().unwrap(), 9);
        assert!(Midi::new(None, Some(16)).channel().is_err());
    }
}
