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
use std::{error::Error, fmt, thread};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{error, info, span, Level};

use crate::audio::mixer::AudioMixer;
use crate::audio::{Device as AudioDevice, VoiceSender};

/// A small wrapper around a cpal::Device. Used for storing some extra
/// data that makes playing samples more convenient.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The stream configuration to open. Only populated by get().
    config: Option<cpal::SupportedStreamConfig>,
    /// The running output stream, if started.
    output: Mutex<Option<OutputStream>>,
}

/// Owns the thread that keeps the cpal stream alive. The stream is created and
/// dropped on that thread.
struct OutputStream {
    /// Dropping this wakes the output thread so it can close the stream.
    shutdown_tx: Option<crossbeam_channel::Sender<()>>,
    /// Handle to the output thread.
    output_thread: Option<thread::JoinHandle<()>>,
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        drop(self.shutdown_tx.take());
        if let Some(thread) = self.output_thread.take() {
            if thread.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// Builds a stream for the device's native sample format. Mixing is always done in
/// f32 and converted at the edge.
fn build_stream(
    device: &cpal::Device,
    supported: &cpal::SupportedStreamConfig,
    mixer: AudioMixer,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    let config = supported.config();
    match supported.sample_format() {
        cpal::SampleFormat::F32 => build_typed_stream::<f32>(device, &config, mixer),
        cpal::SampleFormat::I16 => build_typed_stream::<i16>(device, &config, mixer),
        cpal::SampleFormat::I32 => build_typed_stream::<i32>(device, &config, mixer),
        cpal::SampleFormat::U16 => build_typed_stream::<u16>(device, &config, mixer),
        other => {
            error!(format = ?other, "Unsupported output sample format");
            Err(cpal::BuildStreamError::StreamConfigNotSupported)
        }
    }
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: AudioMixer,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    // Grown on the first callback, then reused.
    let mut scratch: Vec<f32> = Vec::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if scratch.len() < data.len() {
                scratch.resize(data.len(), 0.0);
            }
            let block = &mut scratch[..data.len()];
            mixer.process_into_output(block);

            for (dst, &src) in data.iter_mut().zip(block.iter()) {
                *dst = T::from_sample(src);
            }
        },
        |err| error!(err = err.to_string(), "CPAL output stream error"),
        None,
    )
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let output_configs = match device.supported_output_configs() {
                    Ok(output_configs) => output_configs,
                    Err(_) => continue,
                };
                let max_channels = output_configs.map(|c| c.channels()).max().unwrap_or(0);

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        max_channels,
                        host_id,
                        device,
                        config: None,
                        output: Mutex::new(None),
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the default output device of the default host.
    fn default_device() -> Result<Device, Box<dyn Error>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("no default audio output device")?;
        let max_channels = device
            .supported_output_configs()?
            .map(|c| c.channels())
            .max()
            .unwrap_or(0);

        Ok(Device {
            name: device.name()?,
            max_channels,
            host_id: host.id(),
            device,
            config: None,
            output: Mutex::new(None),
        })
    }

    /// Gets the given cpal device, or the host default if no name is given.
    pub fn get(name: Option<&str>) -> Result<Device, Box<dyn Error>> {
        let mut device = match name {
            None | Some("default") => Device::default_device()?,
            Some(name) => Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
                .ok_or_else(|| format!("no device found with name {}", name))?,
        };

        let config = device.device.default_output_config()?;
        if config.channels() < 2 {
            info!(
                device = device.name,
                channels = config.channels(),
                "Output has fewer than two channels, samples will be mixed down"
            );
        }
        device.config = Some(config);
        Ok(device)
    }

    fn stream_config(&self) -> Result<&cpal::SupportedStreamConfig, Box<dyn Error>> {
        self.config
            .as_ref()
            .ok_or_else(|| format!("{} was not opened for output", self.name).into())
    }
}

impl AudioDevice for Device {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> u32 {
        self.config.as_ref().map_or(0, |c| c.sample_rate())
    }

    fn num_channels(&self) -> u16 {
        self.config.as_ref().map_or(0, |c| c.channels())
    }

    fn start(&self) -> Result<VoiceSender, Box<dyn Error>> {
        let span = span!(Level::INFO, "start output (cpal)");
        let _enter = span.enter();

        let mut output = self.output.lock();
        if output.is_some() {
            return Err(format!("{} is already started", self.name).into());
        }

        let supported = self.stream_config()?.clone();
        let device = self.device.clone();
        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        // The stream lives and dies on its own thread.
        let output_thread = thread::spawn(move || {
            let mixer = AudioMixer::new(supported.channels(), voice_rx);
            let stream = match build_stream(&device, &supported, mixer) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(format!("failed to create stream: {}", e)));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(format!("failed to start stream: {}", e)));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            // Returns once the sender is dropped.
            let _ = shutdown_rx.recv();
            drop(stream);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = output_thread.join();
                return Err(e.into());
            }
            Err(_) => {
                let _ = output_thread.join();
                return Err("audio output thread exited before starting".into());
            }
        }

        info!(
            device = self.name,
            sample_rate = self.sample_rate(),
            channels = self.num_channels(),
            "CPAL output stream started"
        );

        *output = Some(OutputStream {
            shutdown_tx: Some(shutdown_tx),
            output_thread: Some(output_thread),
        });
        Ok(voice_tx)
    }

    fn stop(&self) {
        if let Some(output) = self.output.lock().take() {
            drop(output);
            info!(device = self.name, "CPAL output stream stopped");
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.output.get_mut().take();
    }
}
