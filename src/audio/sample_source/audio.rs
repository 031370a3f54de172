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
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::error::SampleSourceError;
use super::traits::SampleSource;

/// A sample source that decodes audio files (WAV, AIFF, MP3, FLAC, Ogg) with symphonia.
/// Output is planar f32 scaled to -1.0..1.0.
pub struct AudioSampleSource {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    is_finished: bool,
    /// Decoded frames not yet handed out, one Vec per channel.
    leftover: Vec<Vec<f32>>,
    leftover_position: usize,
    channels: u16,
    sample_rate: u32,
    duration: Option<Duration>,
}

impl SampleSource for AudioSampleSource {
    fn next_chunk(
        &mut self,
        output: &mut [Vec<f32>],
        max_frames: usize,
    ) -> Result<usize, SampleSourceError> {
        for channel in output.iter_mut() {
            channel.clear();
        }
        if self.is_finished || max_frames == 0 {
            return Ok(0);
        }

        if self.leftover_frames() == 0 {
            match Self::read_and_decode_next_packet_for_track(
                self.format_reader.as_mut(),
                self.decoder.as_mut(),
                self.track_id,
            )? {
                Some(planes) => {
                    self.leftover = planes;
                    self.leftover_position = 0;
                }
                None => {
                    self.is_finished = true;
                    return Ok(0);
                }
            }
        }

        let start = self.leftover_position;
        let frames = self.leftover_frames().min(max_frames);
        for (index, channel) in output.iter_mut().enumerate() {
            match self.leftover.get(index) {
                Some(plane) => channel.extend_from_slice(&plane[start..start + frames]),
                // The decoder produced fewer channels than the container declared.
                None => channel.resize(frames, 0.0),
            }
        }
        self.leftover_position += frames;

        Ok(frames)
    }

    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

impl AudioSampleSource {
    /// Creates a new audio sample source from a file path.
    pub fn from_file(path: &Path) -> Result<Self, SampleSourceError> {
        // Include the path so the user sees which file failed.
        let file = File::open(path).map_err(|e| {
            SampleSourceError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();
        let detected = get_probe()
            .format(&hint, mss, &fmt_opts, &meta_opts)
            .map_err(|e| SampleSourceError::Unsupported(e.to_string()))?;

        let mut format_reader = detected.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SampleSourceError::Unsupported("no audio track found".to_string()))?;

        let track_id = track.id;
        let params = &track.codec_params;

        let sample_rate = params.sample_rate.ok_or_else(|| {
            SampleSourceError::Unsupported("sample rate not specified".to_string())
        })?;
        let duration = params
            .n_frames
            .map(|n_frames| Duration::from_secs_f64(n_frames as f64 / f64::from(sample_rate)));

        let decoder_opts: DecoderOptions = Default::default();
        let mut decoder = get_codecs()
            .make(params, &decoder_opts)
            .map_err(|e| SampleSourceError::Unsupported(e.to_string()))?;

        // Some containers don't declare a channel layout. In that case decode the first
        // packet to find out, and keep its frames.
        let declared = params.channels.map(|c| c.count() as u16).unwrap_or(0);
        let (channels, leftover) = if declared > 0 {
            (declared, Vec::new())
        } else {
            match Self::read_and_decode_next_packet_for_track(
                format_reader.as_mut(),
                decoder.as_mut(),
                track_id,
            )? {
                Some(planes) => (planes.len() as u16, planes),
                None => return Err(SampleSourceError::Empty),
            }
        };

        Ok(AudioSampleSource {
            format_reader,
            decoder,
            track_id,
            is_finished: false,
            leftover,
            leftover_position: 0,
            channels,
            sample_rate,
            duration,
        })
    }

    fn leftover_frames(&self) -> usize {
        self.leftover
            .first()
            .map_or(0, |plane| plane.len() - self.leftover_position)
    }

    /// Reads the next packet. `Ok(None)` means end of stream. ResetRequired is
    /// passed up so the caller can reset the decoder.
    fn read_next_packet(
        format_reader: &mut dyn FormatReader,
    ) -> Result<Option<Packet>, SampleSourceError> {
        match format_reader.next_packet() {
            Ok(packet) => Ok(Some(packet)),
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Ok(None)
            }
            // Some readers report a decode error at the end of the stream.
            Err(SymphoniaError::DecodeError(_)) => Ok(None),
            Err(e) => Err(SampleSourceError::AudioError(e)),
        }
    }

    /// Reads and decodes packets until one for the given track yields frames. Header
    /// packets that decode to nothing are skipped.
    fn read_and_decode_next_packet_for_track(
        format_reader: &mut dyn FormatReader,
        decoder: &mut dyn Decoder,
        track_id: u32,
    ) -> Result<Option<Vec<Vec<f32>>>, SampleSourceError> {
        loop {
            let packet = match Self::read_next_packet(format_reader) {
                Ok(Some(packet)) => packet,
                Ok(None) => return Ok(None),
                Err(SampleSourceError::AudioError(SymphoniaError::ResetRequired)) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => return Err(e),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    decoder.decode(&packet)?
                }
                Err(e) => return Err(SampleSourceError::AudioError(e)),
            };

            let planes = Self::decode_buffer_to_planar(decoded);
            if planes.first().is_some_and(|plane| !plane.is_empty()) {
                return Ok(Some(planes));
            }
        }
    }

    /// Converts a decoded buffer to planar f32.
    fn decode_buffer_to_planar(decoded: AudioBufferRef) -> Vec<Vec<f32>> {
        match decoded {
            AudioBufferRef::F32(buf) => Self::planar_samples(&buf, |sample| sample),
            AudioBufferRef::F64(buf) => Self::planar_samples(&buf, |sample| sample as f32),
            AudioBufferRef::S8(buf) => Self::planar_samples(&buf, Self::scale_s8),
            AudioBufferRef::S16(buf) => Self::planar_samples(&buf, Self::scale_s16),
            AudioBufferRef::S24(buf) => {
                Self::planar_samples(&buf, |sample| Self::scale_s24(sample.inner()))
            }
            AudioBufferRef::S32(buf) => Self::planar_samples(&buf, Self::scale_s32),
            AudioBufferRef::U8(buf) => Self::planar_samples(&buf, Self::scale_u8),
            AudioBufferRef::U16(buf) => Self::planar_samples(&buf, Self::scale_u16),
            AudioBufferRef::U24(buf) => {
                Self::planar_samples(&buf, |sample| Self::scale_u24(sample.inner()))
            }
            AudioBufferRef::U32(buf) => Self::planar_samples(&buf, Self::scale_u32),
        }
    }

    fn planar_samples<T, F>(buf: &AudioBuffer<T>, convert: F) -> Vec<Vec<f32>>
    where
        T: symphonia::core::sample::Sample,
        F: Fn(T) -> f32,
    {
        (0..buf.spec().channels.count())
            .map(|channel| buf.chan(channel).iter().map(|s| convert(*s)).collect())
            .collect()
    }

    #[inline]
    pub(crate) fn scale_s8(sample: i8) -> f32 {
        sample as f32 / (1i64 << 7) as f32
    }

    #[inline]
    pub(crate) fn scale_s16(sample: i16) -> f32 {
        sample as f32 / (1i64 << 15) as f32
    }

    #[inline]
    pub(crate) fn scale_s24(sample: i32) -> f32 {
        sample as f32 / (1i64 << 23) as f32
    }

    #[inline]
    pub(crate) fn scale_s32(sample: i32) -> f32 {
        sample as f32 / (1i64 << 31) as f32
    }

    #[inline]
    pub(crate) fn scale_u8(sample: u8) -> f32 {
        (sample as f32 / u8::MAX as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u16(sample: u16) -> f32 {
        (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u24(sample: u32) -> f32 {
        let max = (1u32 << 24) - 1;
        (sample as f32 / max as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u32(sample: u32) -> f32 {
        (sample as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}
