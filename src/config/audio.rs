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
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;

/// Ramp applied at the start and end of every triggered sample.
const DEFAULT_RAMP: Duration = Duration::from_millis(1);

/// Longest ramp we accept. Anything longer stops being click suppression.
const MAX_RAMP: Duration = Duration::from_millis(100);

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Audio {
    /// The audio output device. Uses the host default device when unset.
    device: Option<String>,

    /// The envelope ramp, e.g. "1ms".
    ramp: Option<String>,
}

impl Audio {
    /// New will create a new Audio configuration.
    #[cfg(test)]
    pub fn new(device: Option<String>) -> Audio {
        Audio { device, ramp: None }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Overrides the configured device.
    pub fn set_device(&mut self, device: String) {
        self.device = Some(device);
    }

    /// Returns the envelope ramp from the configuration.
    pub fn ramp(&self) -> Result<Duration, ConfigError> {
        let ramp: Duration = match &self.ramp {
            Some(ramp) => DurationString::from_string(ramp.clone())
                .map_err(|e| ConfigError::Invalid {
                    key: "audio.ramp",
                    reason: e.to_string(),
                })?
                .into(),
            None => DEFAULT_RAMP,
        };

        if ramp > MAX_RAMP {
            return Err(ConfigError::Invalid {
                key: "audio.ramp",
                reason: format!("{:?} is longer than {:?}", ramp, MAX_RAMP),
            });
        }

        Ok(ramp)
    }
}

#[cfg(test)]
mod tests {
    use config::{Config, File, FileFormat};

    use super::*;

    #[test]
    fn test_ramp_default() {
        let audio = Audio::new(None);
        assert_eq!(audio.ramp().unwrap(), Duration::from_millis(1));
        assert!(audio.device().is_none());
    }

    #[test]
    fn test_ramp_parse() {
        let audio: Audio = Config::builder()
            .add_source(File::from_str(
                "device: mock-device\nramp: 5ms",
                FileFormat::Yaml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(audio.device(), Some("mock-device"));
        assert_eq!(audio.ramp().unwrap(), Duration::from_millis(5));
    }

    #[test]
    fn test_ramp_invalid() {
        let audio = Audio {
            device: None,
            ramp: Some("soon".to_string()),
        };
        assert!(audio.ramp().is_err());

        let audio = Audio {
            device: None,
            ramp: Some("2s".to_string()),
        };
        assert!(audio.ramp().is_err());
    }
}
