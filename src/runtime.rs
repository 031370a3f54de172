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

//! Owns the output stream and MIDI input for one sampler run.

use std::{future::Future, sync::Arc};

use tokio::sync::mpsc;
use tracing::{error, info, span, Level};

use crate::audio::{self, VoiceSender};
use crate::error::SamplerError;
use crate::midi;
use crate::samples::{PlaybackBinding, SampleEngine};

/// Raw MIDI events buffered between the input callback and the dispatcher.
const MIDI_EVENT_BUFFER: usize = 64;

/// A started audio output plus the MIDI input that will drive it.
pub struct Runtime {
    audio: Arc<dyn audio::Device>,
    midi: Option<Arc<dyn midi::Device>>,
    voice_tx: VoiceSender,
}

impl Runtime {
    /// Starts the audio output. MIDI isn't watched until `run`.
    pub fn new(
        audio: Arc<dyn audio::Device>,
        midi: Option<Arc<dyn midi::Device>>,
    ) -> Result<Runtime, SamplerError> {
        let voice_tx = audio
            .start()
            .map_err(|e| SamplerError::AudioBackendInit(e.to_string()))?;

        info!(
            device = audio.name(),
            sample_rate = audio.sample_rate(),
            channels = audio.num_channels(),
            "Audio output started"
        );

        Ok(Runtime {
            audio,
            midi,
            voice_tx,
        })
    }

    /// The output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate()
    }

    /// Plays the bindings from MIDI input until `shutdown` resolves, then stops
    /// watching MIDI, silences every voice and closes the output.
    pub async fn run<F>(
        self,
        bindings: Vec<PlaybackBinding>,
        shutdown: F,
    ) -> Result<(), SamplerError>
    where
        F: Future<Output = ()>,
    {
        let engine = Arc::new(SampleEngine::new(bindings, self.voice_tx.clone()));

        let dispatcher = match &self.midi {
            Some(midi) => {
                let (midi_events_tx, mut midi_events_rx) =
                    mpsc::channel::<Vec<u8>>(MIDI_EVENT_BUFFER);
                midi.watch_events(midi_events_tx)
                    .map_err(|e| SamplerError::MidiBackendInit(e.to_string()))?;

                let engine = engine.clone();
                Some(tokio::task::spawn_blocking(move || {
                    let span = span!(Level::INFO, "MIDI dispatch");
                    let _enter = span.enter();

                    while let Some(raw_event) = midi_events_rx.blocking_recv() {
                        engine.process_midi_event(&raw_event);
                    }
                    info!("MIDI watcher closed.");
                }))
            }
            None => None,
        };

        info!(
            bindings = engine.binding_count(),
            midi = ?self.midi.as_ref().map(|m| m.name()),
            "Sampler running, press Ctrl-C to stop"
        );

        shutdown.await;
        info!("Shutting down");

        if let Some(midi) = &self.midi {
            midi.stop_watch_events();
        }
        if let Some(dispatcher) = dispatcher {
            if let Err(e) = dispatcher.await {
                error!(err = %e, "MIDI dispatcher failed");
            }
        }

        engine.stop_all();
        self.audio.stop();
        Ok(())
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.audio.stop();
    }
}

/// Resolves on Ctrl-C. A failure to listen is logged and treated as a shutdown request.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(err = %e, "Unable to listen for Ctrl-C");
    }
}
