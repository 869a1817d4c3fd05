// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Contains the traits that describe the hardware boundary. Everything on the
//! far side of these traits (ADC and GPIO sampling, timers, bus framing) is
//! board-specific; everything on the near side is plain, testable state.

use crate::{
    midi::{MidiChannel, MidiMessage},
    types::{Millis, Pin},
};

/// Quick import of all important traits.
pub mod prelude {
    pub use super::{Clock, MidiMessagesFn, ReadsAnalog, ReadsDigital, Transport};
}

/// Something that can sample an analog input. Reads always succeed; a
/// disconnected sensor just looks like noise.
pub trait ReadsAnalog {
    /// Returns the latest raw sample on `pin`, in `0..=2^resolution - 1`.
    fn read_analog(&mut self, pin: Pin) -> u16;
}

/// Something that can sample a digital input.
pub trait ReadsDigital {
    /// Returns true if `pin` is HIGH.
    fn read_digital(&mut self, pin: Pin) -> bool;
}

/// A free-running millisecond counter.
pub trait Clock {
    #[allow(missing_docs)]
    fn now(&self) -> Millis;
}

/// A full-duplex, fixed-size exchange with a peer, like one SPI transaction.
/// Each side shifts out its `outgoing` bytes and fills `incoming` with
/// whatever the peer had queued.
pub trait Transport {
    /// Performs one exchange. `incoming` is zero-filled when the peer had
    /// nothing to send.
    fn exchange(&mut self, outgoing: &[u8], incoming: &mut [u8]) -> anyhow::Result<()>;
}

/// The callback signature for emitted MIDI.
pub type MidiMessagesFn<'a> = dyn FnMut(MidiChannel, MidiMessage) + 'a;
