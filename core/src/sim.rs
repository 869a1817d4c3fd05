// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{
    traits::{Clock, ReadsAnalog, ReadsDigital},
    types::{Millis, Pin},
};
use std::collections::HashMap;

/// An in-memory board. Tests and the replay tool set pin levels directly and
/// advance the clock by hand.
///
/// Unset analog pins read 0. Unset digital pins read HIGH, which is what an
/// input with a pull-up reads when nothing drives it.
#[derive(Clone, Debug, Default)]
pub struct SimulatedBoard {
    analog: HashMap<Pin, u16>,
    digital: HashMap<Pin, bool>,
    now: Millis,
}
impl SimulatedBoard {
    #[allow(missing_docs)]
    pub fn set_analog(&mut self, pin: Pin, value: u16) {
        self.analog.insert(pin, value);
    }

    #[allow(missing_docs)]
    pub fn set_digital(&mut self, pin: Pin, is_high: bool) {
        self.digital.insert(pin, is_high);
    }

    #[allow(missing_docs)]
    pub fn set_now(&mut self, now: Millis) {
        self.now = now;
    }

    /// Moves the clock forward, wrapping like a hardware counter.
    pub fn advance(&mut self, ms: u32) {
        self.now = self.now.wrapping_add_ms(ms);
    }
}
impl ReadsAnalog for SimulatedBoard {
    fn read_analog(&mut self, pin: Pin) -> u16 {
        self.analog.get(&pin).copied().unwrap_or_default()
    }
}
impl ReadsDigital for SimulatedBoard {
    fn read_digital(&mut self, pin: Pin) -> bool {
        self.digital.get(&pin).copied().unwrap_or(true)
    }
}
impl Clock for SimulatedBoard {
    fn now(&self) -> Millis {
        self.now
    }
}
