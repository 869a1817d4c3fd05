// Copyright (c) 2023 Mike Tsao. All rights reserved.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumIter, FromRepr, IntoStaticStr};

/// A reading from a free-running millisecond counter. The counter is allowed
/// to wrap; compare readings with [Millis::elapsed_since()] rather than with
/// ordinary subtraction.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
    Deserialize,
)]
#[display(fmt = "{}ms", _0)]
#[serde(transparent)]
pub struct Millis(pub u32);
impl Millis {
    /// The counter's value at power-on.
    pub const ZERO: Millis = Millis(0);

    /// Time that has passed since `earlier`, tolerating one wrap of the
    /// counter between the two readings.
    pub const fn elapsed_since(&self, earlier: Millis) -> Millis {
        Millis(self.0.wrapping_sub(earlier.0))
    }

    /// Returns this reading advanced by `ms`, wrapping like the hardware
    /// counter does.
    pub const fn wrapping_add_ms(&self, ms: u32) -> Millis {
        Millis(self.0.wrapping_add(ms))
    }
}

/// Identifies an analog or digital input on a board.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
    Deserialize,
)]
#[display(fmt = "pin {}", _0)]
#[serde(transparent)]
pub struct Pin(pub u8);

/// Whether a key last reported a note-on or a note-off. The discriminants are
/// the MIDI status nybbles that travel on the wire.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    EnumIter,
    Eq,
    FromRepr,
    Hash,
    IntoStaticStr,
    PartialEq,
    Serialize,
    Deserialize,
    StrumDisplay,
)]
#[repr(u8)]
pub enum KeyStatus {
    #[allow(missing_docs)]
    NoteOn = 0x90,
    #[allow(missing_docs)]
    #[default]
    NoteOff = 0x80,
}
impl KeyStatus {
    /// Decodes a status byte the way the receiving side always has: anything
    /// other than [KeyStatus::NoteOn] is a note-off.
    pub fn from_status_byte(byte: u8) -> Self {
        match Self::from_repr(byte) {
            Some(status) => status,
            None => Self::NoteOff,
        }
    }
}
impl From<KeyStatus> for u8 {
    fn from(value: KeyStatus) -> Self {
        value as u8
    }
}
