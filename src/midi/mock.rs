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
use tokio::sync::mpsc::Sender;
use tracing::{info, span, Level};

/// A mock input device. Events are injected by tests.
pub struct Device {
    name: String,
    sender: Mutex<Option<Sender<Vec<u8>>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            sender: Mutex::new(None),
        }
    }

    /// Sends the mock event through to the watcher. Returns false if nothing is
    /// watching or the watcher's queue is full.
    #[cfg(test)]
    pub fn mock_event(&self, event: &[u8]) -> bool {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.try_send(event.to_vec()).is_ok(),
            None => false,
        }
    }

    /// Returns true if events are being watched.
    #[cfg(test)]
    pub fn is_watching(&self) -> bool {
        self.sender.lock().is_some()
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "wait for event (mock)");
        let _enter = span.enter();

        let mut current = self.sender.lock();
        if current.is_some() {
            return Err("Already watching events.".into());
        }

        info!(device = self.name, "Watching MIDI events.");
        *current = Some(sender);
        Ok(())
    }

    fn stop_watch_events(&self) {
        self.sender.lock().take();
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::super::Device as _;
    use super::*;

    #[tokio::test]
    async fn test_watch_events() {
        let device = Device::get("mock-midi");
        assert!(!device.mock_event(&[0x90, 60, 100]));

        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        device.watch_events(tx).unwrap();
        assert!(device.is_watching());

        let (second, _rx) = tokio::sync::mpsc::channel(4);
        assert!(device.watch_events(second).is_err());

        assert!(device.mock_event(&[0x90, 60, 100]));
        assert_eq!(rx.recv().await, Some(vec![0x90, 60, 100]));

        device.stop_watch_events();
        assert!(!device.is_watching());
        assert_eq!(rx.recv().await, None);
    }
}
