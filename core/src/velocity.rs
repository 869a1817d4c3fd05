// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::types::KeyStatus;
use serde::{Deserialize, Serialize};

/// Maps an amplitude in the 0..=127 domain onto MIDI velocity, removing the
/// key's DC baseline first:
///
/// `velocity = clamp((amplitude - baseline) / (127 - baseline) * 127, 0, 127)`
///
/// A baseline of 127 or more leaves no headroom to scale into, so every
/// amplitude scales to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VelocityScaler {
    baseline: u8,
}
impl VelocityScaler {
    /// The top of the MIDI velocity range.
    pub const MAX_VELOCITY: u8 = 127;

    #[allow(missing_docs)]
    pub const fn new_with(baseline: u8) -> Self {
        Self { baseline }
    }

    #[allow(missing_docs)]
    pub const fn baseline(&self) -> u8 {
        self.baseline
    }

    #[allow(missing_docs)]
    pub fn set_baseline(&mut self, baseline: u8) {
        self.baseline = baseline;
    }

    /// Scales `amplitude` against this scaler's baseline.
    pub fn scale(&self, amplitude: u8) -> u8 {
        scale_velocity(amplitude, self.baseline)
    }

    /// Like [VelocityScaler::scale()], but a key reporting note-off always
    /// has zero velocity.
    pub fn scale_for_status(&self, amplitude: u8, status: KeyStatus) -> u8 {
        match status {
            KeyStatus::NoteOn => self.scale(amplitude),
            KeyStatus::NoteOff => 0,
        }
    }
}

/// Free-function form of [VelocityScaler::scale()].
pub fn scale_velocity(amplitude: u8, baseline: u8) -> u8 {
    let max = VelocityScaler::MAX_VELOCITY as i32;
    let baseline = baseline as i32;
    if baseline >= max {
        return 0;
    }
    let change = amplitude.min(VelocityScaler::MAX_VELOCITY) as i32 - baseline;
    if change <= 0 {
        return 0;
    }
    (change * max / (max - baseline)).clamp(0, max) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_baseline_is_identity() {
        let scaler = VelocityScaler::default();
        for amplitude in 0..=127 {
            assert_eq!(scaler.scale(amplitude), amplitude);
        }
    }

    #[test]
    fn baseline_is_removed_and_range_restretched() {
        let scaler = VelocityScaler::new_with(57);
        assert_eq!(scaler.scale(0), 0, "below baseline clamps to zero");
        assert_eq!(scaler.scale(57), 0);
        assert_eq!(scaler.scale(127), 127);
        // (92 - 57) * 127 / 70 = 63.5
        assert_eq!(scaler.scale(92), 63);
    }

    #[test]
    fn saturated_baseline_scales_to_zero() {
        assert_eq!(scale_velocity(127, 127), 0);
        assert_eq!(scale_velocity(127, 200), 0);
        assert_eq!(scale_velocity(0, 127), 0);
    }

    #[test]
    fn note_off_has_no_velocity() {
        let scaler = VelocityScaler::new_with(10);
        assert_eq!(scaler.scale_for_status(127, KeyStatus::NoteOff), 0);
        assert_eq!(scaler.scale_for_status(127, KeyStatus::NoteOn), 127);
    }

    #[test]
    fn amplitudes_above_range_clamp() {
        assert_eq!(scale_velocity(255, 0), 127);
    }
}
