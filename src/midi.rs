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
use std::{error::Error, fmt, sync::Arc};

use tokio::sync::mpsc::Sender;
use tracing::warn;

mod midir;
pub mod mock;

/// A MIDI input device that forwards raw events.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Watches MIDI input for events and sends them to the given sender.
    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), Box<dyn Error>>;

    /// Stops watching events. Dropping the connection drops the sender, which
    /// ends the receiving side.
    fn stop_watch_events(&self);
}

/// Lists devices known to midir.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    midir::list()
}

/// Gets an input device. A name starting with "mock" gives a mock device, any other
/// name must match exactly one input port. Without a name the first input port is
/// used, and if there are none, no device is returned.
pub fn get_device(name: Option<&str>) -> Result<Option<Arc<dyn Device>>, Box<dyn Error>> {
    match name {
        Some(name) if name.starts_with("mock") => Ok(Some(Arc::new(mock::Device::get(name)))),
        Some(name) => Ok(Some(Arc::new(midir::get(name)?))),
        None => match midir::first()? {
            Some(device) => Ok(Some(Arc::new(device))),
            None => {
                warn!("No MIDI input ports found, samples can't be triggered.");
                Ok(None)
            }
        },
    }
}
