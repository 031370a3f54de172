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
use super::error::SampleSourceError;

/// A source of audio samples that produces chunks in planar format.
/// Planar format stores all samples for channel 0, then all samples for channel 1, etc.
pub trait SampleSource: Send {
    /// Get the next chunk of samples from the source in planar format.
    /// Returns the number of frames (samples per channel) written (0 = EOF).
    ///
    /// The output slice must have exactly channel_count() elements.
    /// Each channel Vec will be cleared and filled with up to max_frames samples.
    fn next_chunk(
        &mut self,
        output: &mut [Vec<f32>],
        max_frames: usize,
    ) -> Result<usize, SampleSourceError>;

    /// Get the number of channels in this source
    fn channel_count(&self) -> u16;

    /// Get the sample rate of this source
    fn sample_rate(&self) -> u32;

    /// Get the duration of this source (if known)
    fn duration(&self) -> Option<std::time::Duration>;
}

impl SampleSource for Box<dyn SampleSource> {
    fn next_chunk(
        &mut self,
        output: &mut [Vec<f32>],
        max_frames: usize,
    ) -> Result<usize, SampleSourceError> {
        (**self).next_chunk(output, max_frames)
    }

    fn channel_count(&self) -> u16 {
        (**self).channel_count()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn duration(&self) -> Option<std::time::Duration> {
        (**self).duration()
    }
}
