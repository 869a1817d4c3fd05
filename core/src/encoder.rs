// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Rotary encoders with a push switch, such as the transpose knob.

use crate::{
    traits::ReadsDigital,
    types::{Millis, Pin},
};
use derivative::Derivative;
use derive_builder::Builder;
use log::debug;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// Which way the encoder last turned.
#[derive(
    Clone, Copy, Debug, Default, Display, EnumIter, Eq, IntoStaticStr, PartialEq, Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[allow(missing_docs)]
    #[default]
    Clockwise,
    #[allow(missing_docs)]
    CounterClockwise,
}

/// The constants that describe a [RotaryEncoder].
#[derive(Builder, Clone, Debug, Derivative, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Default)]
#[builder(default)]
#[serde(rename_all = "kebab-case")]
pub struct EncoderParams {
    #[allow(missing_docs)]
    pub clock_pin: Pin,
    #[allow(missing_docs)]
    pub data_pin: Pin,
    /// The push switch, which is active-low.
    pub switch_pin: Pin,

    #[allow(missing_docs)]
    pub min: i32,
    #[allow(missing_docs)]
    pub max: i32,

    /// Clock edges closer together than this are ignored.
    #[derivative(Default(value = "Millis(1)"))]
    pub rotation_debounce: Millis,

    /// Switch presses closer together than this are ignored.
    #[derivative(Default(value = "Millis(1)"))]
    pub switch_debounce: Millis,
}

/// One poll of an encoder's three digital lines. `true` is HIGH.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncoderSample {
    #[allow(missing_docs)]
    pub clock: bool,
    #[allow(missing_docs)]
    pub data: bool,
    #[allow(missing_docs)]
    pub switch: bool,
    #[allow(missing_docs)]
    pub now: Millis,
}

/// Called with the counter when the switch is pressed.
pub type SwitchFn = dyn FnMut(&mut i32) + Send;

/// A clamped counter driven by a quadrature encoder.
///
/// Each debounced rising edge of the clock line moves the counter one step.
/// If the data line differs from the clock line at that edge, the knob
/// turned clockwise.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct RotaryEncoder {
    params: EncoderParams,
    counter: i32,
    direction: Direction,

    previous_clock: bool,
    previous_switch: bool,
    rotation_timestamp: Millis,
    switch_timestamp: Millis,

    #[derivative(Debug = "ignore")]
    on_switch: Option<Box<SwitchFn>>,
}
/// The transpose knob is an ordinary encoder with a ±2 octave range.
pub type TransposeKnob = RotaryEncoder;

impl RotaryEncoder {
    /// The transpose knob's range, in semitones.
    pub const TRANSPOSE_RANGE: i32 = 24;

    /// Creates an encoder at rest, with both lines assumed HIGH.
    pub fn new_with(params: EncoderParams) -> Self {
        Self::new_with_levels(params, true, true)
    }

    /// Creates an encoder whose clock and switch lines currently read the
    /// given levels.
    pub fn new_with_levels(params: EncoderParams, clock: bool, switch: bool) -> Self {
        Self {
            params,
            counter: 0,
            direction: Default::default(),
            previous_clock: clock,
            previous_switch: switch,
            rotation_timestamp: Millis::ZERO,
            switch_timestamp: Millis::ZERO,
            on_switch: None,
        }
    }

    /// A transpose knob on the given pins, limited to ±24 semitones.
    pub fn new_transpose(clock_pin: Pin, data_pin: Pin, switch_pin: Pin) -> TransposeKnob {
        Self::new_with(EncoderParams {
            clock_pin,
            data_pin,
            switch_pin,
            min: -Self::TRANSPOSE_RANGE,
            max: Self::TRANSPOSE_RANGE,
            ..Default::default()
        })
    }

    /// Replaces the default switch action, which resets the counter to zero.
    pub fn set_on_switch(&mut self, on_switch: Box<SwitchFn>) {
        self.on_switch = Some(on_switch);
    }

    /// Reads the encoder's lines from `board` and calls
    /// [RotaryEncoder::update()].
    pub fn update_from<B: ReadsDigital + ?Sized>(
        &mut self,
        board: &mut B,
        now: Millis,
    ) -> Option<Direction> {
        let sample = EncoderSample {
            clock: board.read_digital(self.params.clock_pin),
            data: board.read_digital(self.params.data_pin),
            switch: board.read_digital(self.params.switch_pin),
            now,
        };
        self.update(sample)
    }

    /// Processes one poll. Returns the direction if the counter was stepped.
    pub fn update(&mut self, sample: EncoderSample) -> Option<Direction> {
        let mut turned = None;
        let is_rising = sample.clock && !self.previous_clock;
        if is_rising
            && sample.now.elapsed_since(self.rotation_timestamp) > self.params.rotation_debounce
        {
            let direction = if sample.data != sample.clock {
                Direction::Clockwise
            } else {
                Direction::CounterClockwise
            };
            let step = match direction {
                Direction::Clockwise => 1,
                Direction::CounterClockwise => -1,
            };
            self.counter = (self.counter + step).clamp(self.params.min, self.params.max);
            self.direction = direction;
            self.rotation_timestamp = sample.now;
            debug!("encoder turned {direction}, counter {}", self.counter);
            turned = Some(direction);
        }
        self.previous_clock = sample.clock;

        let is_pressed = self.previous_switch && !sample.switch;
        self.previous_switch = sample.switch;
        if is_pressed && sample.now.elapsed_since(self.switch_timestamp) > self.params.switch_debounce
        {
            self.handle_switch();
            self.switch_timestamp = sample.now;
        }
        turned
    }

    fn handle_switch(&mut self) {
        match self.on_switch.as_mut() {
            Some(on_switch) => on_switch(&mut self.counter),
            None => self.reset_counter(),
        }
        self.counter = self.counter.clamp(self.params.min, self.params.max);
        debug!("encoder switch pressed, counter {}", self.counter);
    }

    #[allow(missing_docs)]
    pub fn reset_counter(&mut self) {
        self.counter = 0;
    }

    #[allow(missing_docs)]
    pub fn counter(&self) -> i32 {
        self.counter
    }

    /// The direction of the most recent step.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[allow(missing_docs)]
    pub fn params(&self) -> &EncoderParams {
        &self.params
    }
}
