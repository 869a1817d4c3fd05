// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Pitch-bend and modulation wheels.
//!
//! A wheel is an analog sensor with a spring-loaded rest position. After
//! smoothing, its reading goes through a three-segment map: samples below
//! the dead zone map onto `range_min..=0`, samples above it onto
//! `0..=range_max`, and samples inside it read as exactly 0.

use crate::{
    calibration::average_samples,
    error::SettingsError,
    filter::Ema,
    traits::ReadsAnalog,
    types::Pin,
    util::map_range,
};
use derivative::Derivative;
use derive_builder::Builder;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// The constants that describe a [Wheel].
#[derive(Builder, Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[builder(default)]
#[serde(rename_all = "kebab-case")]
pub struct WheelParams {
    #[allow(missing_docs)]
    pub pin: Pin,

    /// The ceiling of the sample domain, `2^resolution - 1`.
    #[derivative(Default(value = "4095"))]
    pub max_analog_value: u16,

    /// The reading at the bottom of the wheel's travel.
    #[derivative(Default(value = "-8192"))]
    pub range_min: i32,

    /// The reading at the top of the wheel's travel.
    #[derivative(Default(value = "8191"))]
    pub range_max: i32,

    #[allow(missing_docs)]
    #[derivative(Default(value = "Ema::DEFAULT_WHEEL_SMOOTHING_FACTOR"))]
    pub smoothing_factor: f64,

    /// Half the width of the dead zone, in raw sample units.
    #[derivative(Default(value = "100"))]
    pub hysteresis: u16,

    /// How many samples calibration averages.
    #[derivative(Default(value = "100"))]
    pub sample_count: usize,
}
impl WheelParams {
    /// A modulation wheel, which has no negative travel.
    pub fn new_modulation(pin: Pin) -> Self {
        Self {
            pin,
            range_min: 0,
            range_max: 127,
            ..Default::default()
        }
    }

    /// A pitch-bend wheel.
    pub fn new_pitch_bend(pin: Pin) -> Self {
        Self {
            pin,
            ..Default::default()
        }
    }

    #[allow(missing_docs)]
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.range_min > self.range_max {
            return Err(SettingsError::EmptyRange {
                min: self.range_min,
                max: self.range_max,
            });
        }
        if self.max_analog_value == 0 {
            return Err(SettingsError::AdcResolution(0));
        }
        if self.sample_count == 0 {
            return Err(SettingsError::NoSamples);
        }
        Ok(())
    }
}

/// A continuous controller with a calibrated dead zone around its rest
/// position.
#[derive(Clone, Debug)]
pub struct Wheel {
    params: WheelParams,
    filter: Ema,
    deadzone_min: i32,
    deadzone_max: i32,
    reading: i32,
    previous_reading: i32,
    is_changed: bool,
}
impl Wheel {
    /// Builds a wheel and calibrates it by sampling `source` while the wheel
    /// rests.
    pub fn new_calibrated<A: ReadsAnalog + ?Sized>(
        params: WheelParams,
        source: &mut A,
    ) -> Result<Self, SettingsError> {
        let mut r = Self::new_with_deadzone(params, 0, 0)?;
        r.calibrate(source)?;
        Ok(r)
    }

    /// Builds a wheel with a known dead zone. The filter starts at the
    /// middle of the dead zone.
    pub fn new_with_deadzone(
        params: WheelParams,
        deadzone_min: i32,
        deadzone_max: i32,
    ) -> Result<Self, SettingsError> {
        params.validate()?;
        if deadzone_min > deadzone_max {
            return Err(SettingsError::EmptyRange {
                min: deadzone_min,
                max: deadzone_max,
            });
        }
        let center = (deadzone_min + deadzone_max) / 2;
        Ok(Self {
            filter: Ema::new_seeded(params.smoothing_factor, center as f64)?,
            params,
            deadzone_min,
            deadzone_max,
            reading: 0,
            previous_reading: 0,
            is_changed: false,
        })
    }

    /// Averages [WheelParams::sample_count] samples and centers the dead zone
    /// on the result.
    pub fn calibrate<A: ReadsAnalog + ?Sized>(
        &mut self,
        source: &mut A,
    ) -> Result<(), SettingsError> {
        let average = average_samples(source, self.params.pin, self.params.sample_count)? as i32;
        let hysteresis = self.params.hysteresis as i32;
        self.deadzone_min = average - hysteresis;
        self.deadzone_max = average + hysteresis;
        self.filter.reset(average as f64);
        info!(
            "wheel on {}: dead zone {}..={}",
            self.params.pin, self.deadzone_min, self.deadzone_max
        );
        Ok(())
    }

    /// Samples `source` and calls [Wheel::update_raw()].
    pub fn update<A: ReadsAnalog + ?Sized>(&mut self, source: &mut A) -> bool {
        let raw = source.read_analog(self.params.pin);
        self.update_raw(raw)
    }

    /// Smooths and maps one raw sample. Returns whether the reading changed.
    pub fn update_raw(&mut self, raw: u16) -> bool {
        let value = self.filter.update_adc(raw) as i32;
        self.reading = self.map(value);
        self.is_changed = self.reading != self.previous_reading;
        if self.is_changed {
            debug!("wheel on {} reads {}", self.params.pin, self.reading);
            self.previous_reading = self.reading;
        }
        self.is_changed
    }

    fn map(&self, value: i32) -> i32 {
        let mapped = if value < self.deadzone_min {
            map_range(value, 0, self.deadzone_min, self.params.range_min, 0)
        } else if value > self.deadzone_max {
            map_range(
                value,
                self.deadzone_max,
                self.params.max_analog_value as i32,
                0,
                self.params.range_max,
            )
        } else {
            0
        };
        mapped.clamp(self.params.range_min, self.params.range_max)
    }

    /// The current scaled reading, 0 at rest.
    pub fn reading(&self) -> i32 {
        self.reading
    }

    /// True if the last update changed the reading.
    pub fn is_changed(&self) -> bool {
        self.is_changed
    }

    #[allow(missing_docs)]
    pub fn deadzone(&self) -> (i32, i32) {
        (self.deadzone_min, self.deadzone_max)
    }

    #[allow(missing_docs)]
    pub fn params(&self) -> &WheelParams {
        &self.params
    }
}
