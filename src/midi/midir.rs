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
use std::{error::Error, fmt, mem};

use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use midly::live::LiveEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, info, span, Level};

/// A MIDI input port.
pub struct Device {
    name: String,
    input_port: MidiInputPort,
    event_connection: Mutex<Option<MidiInputConnection<()>>>,
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "wait for event (midir)");
        let _enter = span.enter();

        let mut event_connection = self.event_connection.lock();
        if event_connection.is_some() {
            return Err("Already watching events.".into());
        }

        info!(device = self.name, "Watching MIDI events.");

        let input = MidiInput::new("sampler input")?;
        *event_connection = Some(input.connect(
            &self.input_port,
            "sampler input watcher",
            move |_, raw_event, _| {
                if let Ok(event) = LiveEvent::parse(raw_event) {
                    debug!(event = format!("{:?}", event), "Received MIDI event.");
                }
                if let Err(e) = sender.blocking_send(Vec::from(raw_event)) {
                    error!(
                        err = format!("{:?}", e),
                        "Error sending MIDI event to receiver."
                    );
                }
            },
            (),
        )?);

        Ok(())
    }

    fn stop_watch_events(&self) {
        // Dropping the connection closes the port and drops the sender with it.
        let event_connection = self.event_connection.lock().take();
        mem::drop(event_connection);
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Input)", self.name)
    }
}

/// Lists midir input devices and produces the Device trait.
pub fn list() -> Result<Vec<Box<dyn super::Device>>, Box<dyn Error>> {
    Ok(list_midir_devices()?
        .into_iter()
        .map(|device| {
            let device: Box<dyn super::Device> = Box::new(device);
            device
        })
        .collect())
}

/// Lists midir input devices, sorted by name.
fn list_midir_devices() -> Result<Vec<Device>, Box<dyn Error>> {
    let input = MidiInput::new("sampler input listing")?;

    let mut devices = Vec::new();
    for port in input.ports() {
        let name = input.port_name(&port)?;
        devices.push(Device {
            name,
            input_port: port,
            event_connection: Mutex::new(None),
        });
    }

    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

/// Gets the first input device, if there is one.
pub fn first() -> Result<Option<Device>, Box<dyn Error>> {
    let input = MidiInput::new("sampler input listing")?;
    let port = match input.ports().into_iter().next() {
        Some(port) => port,
        None => return Ok(None),
    };

    Ok(Some(Device {
        name: input.port_name(&port)?,
        input_port: port,
        event_connection: Mutex::new(None),
    }))
}

/// Gets the input device whose name contains the given name.
pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
    let mut matches = list_midir_devices()?
        .into_iter()
        .filter(|device| device.name.contains(name))
        .collect::<Vec<Device>>();

    if matches.is_empty() {
        return Err(format!("no device found with name {}", name).into());
    }
    if matches.len() > 1 {
        return Err(format!(
            "found too many devices that match ({}), use a less ambiguous device name",
            matches
                .iter()
                .map(|device| device.name.clone())
                .collect::<Vec<String>>()
                .join(", ")
        )
        .into());
    }

    // There's exactly one match.
    Ok(matches.swap_remove(0))
}
