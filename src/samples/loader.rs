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

//! Sample loading and caching.
//!
//! Samples are loaded entirely into memory at startup for zero-latency playback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::audio::sample_source::{create_sample_source_from_file, SampleSourceError};
use crate::audio::{Envelope, Voice, VoiceHandle};
use crate::error::SamplerError;
use crate::util::filename_display;

/// Frames read from the decoder per chunk.
const DEFAULT_BUFFER_SIZE: usize = 4096;

/// A loaded sample that can be played back.
/// The sample data is stored in an Arc for efficient sharing between voices.
#[derive(Clone)]
pub struct LoadedSample {
    /// Planar sample data, one Vec per channel, all the same length.
    data: Arc<Vec<Vec<f32>>>,
    /// Number of channels in the sample.
    channel_count: u16,
    /// Sample rate of the audio data.
    sample_rate: u32,
}

impl LoadedSample {
    /// Creates a new voice that plays this sample once with the given envelope ramp
    /// and MIDI velocity.
    pub fn create_voice(
        &self,
        note: u8,
        velocity: u8,
        ramp_frames: usize,
    ) -> (Voice, VoiceHandle) {
        let envelope = Envelope::from_velocity(self.frames(), ramp_frames, velocity);
        Voice::new(note, self.data.clone(), envelope)
    }

    /// Returns the number of channels.
    #[cfg(test)]
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Returns the sample rate.
    #[cfg(test)]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of frames.
    pub fn frames(&self) -> usize {
        self.data.first().map_or(0, |c| c.len())
    }

    /// Returns the playback duration.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.iter().map(|c| c.len()).sum::<usize>() * std::mem::size_of::<f32>()
    }
}

impl std::fmt::Debug for LoadedSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedSample")
            .field("channels", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .finish()
    }
}

/// Manages loading and caching of sample data.
pub struct SampleLoader {
    /// Cache of loaded samples by file path.
    cache: HashMap<PathBuf, LoadedSample>,
    /// Target sample rate for transcoding (matches audio output).
    target_sample_rate: u32,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(target_sample_rate: u32) -> Self {
        Self {
            cache: HashMap::new(),
            target_sample_rate,
        }
    }

    /// Loads a sample from a file into memory.
    /// Returns a cached version if already loaded.
    pub fn load(&mut self, path: &Path) -> Result<LoadedSample, SamplerError> {
        if let Some(sample) = self.cache.get(path) {
            debug!(path = ?path, "Using cached sample");
            return Ok(sample.clone());
        }

        let loaded = decode(path, self.target_sample_rate)?;
        self.cache.insert(path.to_path_buf(), loaded.clone());
        Ok(loaded)
    }

    /// Loads all of the given files, decoding the ones not yet cached in parallel.
    /// The result is in the same order as `paths`. The first failure aborts the load.
    pub fn load_all(&mut self, paths: &[&Path]) -> Result<Vec<LoadedSample>, SamplerError> {
        let target_sample_rate = self.target_sample_rate;
        let mut missing: Vec<&Path> = paths
            .iter()
            .copied()
            .filter(|path| !self.cache.contains_key(*path))
            .collect();
        missing.sort();
        missing.dedup();

        let decoded: Vec<(PathBuf, LoadedSample)> = missing
            .par_iter()
            .map(|path| Ok((path.to_path_buf(), decode(path, target_sample_rate)?)))
            .collect::<Result<_, SamplerError>>()?;
        self.cache.extend(decoded);

        info!(
            samples = paths.len(),
            memory_kb = self.total_memory_usage() / 1024,
            "Samples loaded"
        );

        paths.iter().map(|path| self.load(path)).collect()
    }

    /// Returns the total memory used by cached samples.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.values().map(|s| s.memory_size()).sum()
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("cached_samples", &self.cache.len())
            .field("target_sample_rate", &self.target_sample_rate)
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Decodes a whole file and converts it to the target sample rate.
fn decode(path: &Path, target_sample_rate: u32) -> Result<LoadedSample, SamplerError> {
    let to_error = |source: SampleSourceError| SamplerError::SampleLoad {
        path: path.to_path_buf(),
        source,
    };

    debug!(path = ?path, "Loading sample into memory");
    let mut source = create_sample_source_from_file(path).map_err(to_error)?;
    let source_sample_rate = source.sample_rate();
    let channel_count = source.channel_count();
    let channels = usize::from(channel_count);

    let mut data: Vec<Vec<f32>> = vec![Vec::new(); channels];
    let mut chunk: Vec<Vec<f32>> = vec![Vec::with_capacity(DEFAULT_BUFFER_SIZE); channels];
    loop {
        let frames = source
            .next_chunk(&mut chunk, DEFAULT_BUFFER_SIZE)
            .map_err(to_error)?;
        if frames == 0 {
            break;
        }
        for (channel, samples) in data.iter_mut().zip(chunk.iter()) {
            channel.extend_from_slice(samples);
        }
    }

    if data.first().map_or(true, |c| c.is_empty()) {
        return Err(to_error(SampleSourceError::Empty));
    }

    let data = if source_sample_rate != target_sample_rate {
        debug!(
            source_rate = source_sample_rate,
            target_rate = target_sample_rate,
            "Transcoding sample"
        );
        transcode_samples(&data, source_sample_rate, target_sample_rate)
    } else {
        data
    };

    let loaded = LoadedSample {
        data: Arc::new(data),
        channel_count,
        sample_rate: target_sample_rate,
    };

    info!(
        file = filename_display(path),
        channels = channel_count,
        sample_rate = source_sample_rate,
        duration_ms = loaded.duration().as_millis(),
        memory_kb = loaded.memory_size() / 1024,
        "Sample loaded"
    );

    Ok(loaded)
}

/// Transcodes planar samples from one sample rate to another using linear interpolation.
/// Good enough for one-shots; the rate only changes when the file and the output disagree.
fn transcode_samples(
    channels: &[Vec<f32>],
    source_rate: u32,
    target_rate: u32,
) -> Vec<Vec<f32>> {
    let ratio = f64::from(target_rate) / f64::from(source_rate);

    channels
        .iter()
        .map(|samples| {
            let target_frames = (samples.len() as f64 * ratio).ceil() as usize;
            (0..target_frames)
                .map(|target_frame| {
                    let source_pos = target_frame as f64 / ratio;
                    let source_frame = source_pos.floor() as usize;
                    let frac = source_pos.fract() as f32;

                    let s0 = samples.get(source_frame).copied().unwrap_or(0.0);
                    let s1 = samples.get(source_frame + 1).copied().unwrap_or(s0);
                    s0 + (s1 - s0) * frac
                })
                .collect()
        })
        .collect()
}
