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

/// Amplitude envelope for a one-shot sample: a linear ramp up to the velocity
/// level, a flat sustain, and a linear ramp back down that reaches zero on the
/// last frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    /// Total length in frames. Equal to the sample length.
    length: usize,
    /// Length of each ramp in frames. Always at least 1.
    ramp: usize,
    /// Sustain level, 0.0 to 1.0.
    level: f32,
}

impl Envelope {
    /// Creates a new envelope.
    pub fn new(length: usize, ramp: usize, level: f32) -> Envelope {
        Envelope {
            length,
            ramp: ramp.max(1),
            level: level.clamp(0.0, 1.0),
        }
    }

    /// Creates an envelope whose level is the MIDI velocity scaled to 0.0-1.0.
    pub fn from_velocity(length: usize, ramp: usize, velocity: u8) -> Envelope {
        Envelope::new(length, ramp, f32::from(velocity.min(127)) / 127.0)
    }

    /// Returns the gain at the given frame. Zero at and past the end.
    #[inline]
    pub fn gain_at(&self, frame: usize) -> f32 {
        if frame >= self.length {
            return 0.0;
        }

        let ramp = self.ramp as f32;
        let attack = frame as f32 / ramp;
        let release = (self.length - 1 - frame) as f32 / ramp;
        self.level * attack.min(release).min(1.0)
    }

    /// Returns the length of the envelope in frames.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Returns the sustain level.
    #[cfg(test)]
    pub fn level(&self) -> f32 {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let envelope = Envelope::new(1000, 10, 1.0);

        assert_eq!(envelope.gain_at(0), 0.0);
        assert!((envelope.gain_at(5) - 0.5).abs() < 1e-6);
        assert_eq!(envelope.gain_at(10), 1.0);
        assert_eq!(envelope.gain_at(500), 1.0);
        assert!((envelope.gain_at(994) - 0.5).abs() < 1e-6);
        assert_eq!(envelope.gain_at(999), 0.0);
        assert_eq!(envelope.gain_at(1000), 0.0);
        assert_eq!(envelope.gain_at(5000), 0.0);
    }

    #[test]
    fn test_envelope_velocity() {
        let envelope = Envelope::from_velocity(100, 4, 64);
        assert!((envelope.level() - 64.0 / 127.0).abs() < 1e-6);
        assert!((envelope.gain_at(50) - 64.0 / 127.0).abs() < 1e-6);

        let full = Envelope::from_velocity(100, 4, 127);
        assert_eq!(full.gain_at(50), 1.0);
    }

    #[test]
    fn test_envelope_shorter_than_ramps() {
        // Ramps overlap, so the peak never reaches the full level.
        let envelope = Envelope::new(5, 10, 1.0);
        assert_eq!(envelope.gain_at(0), 0.0);
        assert!(envelope.gain_at(2) < 1.0);
        assert!(envelope.gain_at(2) > 0.0);
        assert_eq!(envelope.gain_at(4), 0.0);
    }

    #[test]
    fn test_envelope_zero_ramp() {
        let envelope = Envelope::new(10, 0, 0.5);
        assert_eq!(envelope.gain_at(0), 0.0);
        assert_eq!(envelope.gain_at(1), 0.5);
        assert_eq!(envelope.gain_at(9), 0.0);
    }
}
