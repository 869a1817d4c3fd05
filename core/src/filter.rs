// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! An exponential moving average (EMA) is a one-pole low-pass filter:
//!
//! `y' = α·x + (1 - α)·y`
//!
//! where `x` is the new sample, `y` is the running output, and `α` is the
//! smoothing factor. Lower values of `α` smooth more heavily and lag more.
//! The recurrence is deterministic, so a given `α`, starting value, and input
//! sequence always produce the same outputs.

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};

/// Exponential-moving-average low-pass filter over a sample stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Ema {
    smoothing_factor: f64,

    #[serde(skip)]
    value: f64,
}
impl Ema {
    /// The factor that key sensors have settled on.
    pub const DEFAULT_KEY_SMOOTHING_FACTOR: f64 = 0.4;
    /// Wheels are sampled more slowly and tolerate more lag.
    pub const DEFAULT_WHEEL_SMOOTHING_FACTOR: f64 = 0.1;

    /// Creates a filter whose accumulator starts at zero.
    pub fn new_with(smoothing_factor: f64) -> Result<Self, SettingsError> {
        Self::new_seeded(smoothing_factor, 0.0)
    }

    /// Creates a filter whose accumulator starts at `initial`. Seeding with a
    /// known rest value avoids the start-up ramp from zero.
    pub fn new_seeded(smoothing_factor: f64, initial: f64) -> Result<Self, SettingsError> {
        Self::check_smoothing_factor(smoothing_factor)?;
        Ok(Self {
            smoothing_factor,
            value: initial,
        })
    }

    /// Feeds one sample and returns the new smoothed value.
    pub fn update(&mut self, sample: f64) -> f64 {
        self.value =
            self.smoothing_factor * sample + (1.0 - self.smoothing_factor) * self.value;
        self.value
    }

    /// Feeds one raw ADC sample and returns the smoothed value truncated back
    /// into the ADC's integer domain.
    pub fn update_adc(&mut self, raw: u16) -> u16 {
        self.update(raw as f64).clamp(0.0, u16::MAX as f64) as u16
    }

    /// The most recent output.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Overwrites the accumulator.
    pub fn reset(&mut self, value: f64) {
        self.value = value;
    }

    #[allow(missing_docs)]
    pub fn smoothing_factor(&self) -> f64 {
        self.smoothing_factor
    }

    #[allow(missing_docs)]
    pub fn set_smoothing_factor(&mut self, smoothing_factor: f64) -> Result<(), SettingsError> {
        Self::check_smoothing_factor(smoothing_factor)?;
        self.smoothing_factor = smoothing_factor;
        Ok(())
    }

    fn check_smoothing_factor(smoothing_factor: f64) -> Result<(), SettingsError> {
        if smoothing_factor > 0.0 && smoothing_factor <= 1.0 {
            Ok(())
        } else {
            Err(SettingsError::SmoothingFactor(smoothing_factor))
        }
    }
}
