// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::error::SettingsError;
use derive_more::Display as DeriveDisplay;
use serde::{Deserialize, Serialize};

pub use midly::{
    num::{u14, u4, u7},
    MidiMessage, PitchBend,
};

/// Recommended imports for easy onboarding.
pub mod prelude {
    pub use crate::midi::{
        new_controller, new_note_off, new_note_on, new_pitch_bend, u4, u7, MidiChannel,
        MidiMessage,
    };
}

/// The controller number of the modulation wheel.
pub const MODULATION_CC: u8 = 1;

/// Newtype for MIDI channel. The inner value is the 0..=15 wire encoding;
/// people usually number channels 1..=16, which is what
/// [MidiChannel::from_user_channel()] accepts.
#[derive(
    Clone, Copy, Debug, Default, DeriveDisplay, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub struct MidiChannel(pub u8);
impl MidiChannel {
    /// Converts a 1-based channel number into its wire encoding.
    pub fn from_user_channel(channel: u8) -> Result<Self, SettingsError> {
        if (1..=16).contains(&channel) {
            Ok(Self(channel - 1))
        } else {
            Err(SettingsError::MidiChannel(channel))
        }
    }

    /// The 1-based channel number.
    pub const fn user_channel(&self) -> u8 {
        self.0 + 1
    }
}

fn to_u7(value: u8) -> u7 {
    u7::from(value.min(127))
}

/// Convenience function to make a note-on [MidiMessage].
pub fn new_note_on(note: u8, vel: u8) -> MidiMessage {
    MidiMessage::NoteOn {
        key: to_u7(note),
        vel: to_u7(vel),
    }
}

/// Convenience function to make a note-off [MidiMessage].
pub fn new_note_off(note: u8, vel: u8) -> MidiMessage {
    MidiMessage::NoteOff {
        key: to_u7(note),
        vel: to_u7(vel),
    }
}

/// Makes a pitch-bend [MidiMessage] from a signed bend, where 0 is the
/// wheel's rest position. Values are clamped to -8192..=8191.
pub fn new_pitch_bend(bend: i16) -> MidiMessage {
    let centered = (bend.clamp(-0x2000, 0x1FFF) as i32 + 0x2000) as u16;
    MidiMessage::PitchBend {
        bend: PitchBend(u14::from(centered)),
    }
}

/// Makes a control-change [MidiMessage]. Values are clamped to 0..=127.
pub fn new_controller(controller: u8, value: i32) -> MidiMessage {
    MidiMessage::Controller {
        controller: to_u7(controller),
        value: to_u7(value.clamp(0, 127) as u8),
    }
}

/// Returns a name like "C4" or "F#-1" for a MIDI note number, using the
/// C4 = 60 convention.
pub fn note_name(note: u8) -> String {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let octave = (note / 12) as i8 - 1;
    format!("{}{}", NAMES[(note % 12) as usize], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_channels() {
        assert_eq!(MidiChannel::from_user_channel(1), Ok(MidiChannel(0)));
        assert_eq!(MidiChannel::from_user_channel(16), Ok(MidiChannel(15)));
        assert_eq!(
            MidiChannel::from_user_channel(0),
            Err(SettingsError::MidiChannel(0))
        );
        assert!(MidiChannel::from_user_channel(17).is_err());
        assert_eq!(MidiChannel(9).user_channel(), 10);
    }

    #[test]
    fn note_messages() {
        assert_eq!(
            new_note_on(60, 70),
            MidiMessage::NoteOn {
                key: u7::from(60),
                vel: u7::from(70)
            }
        );
        assert_eq!(
            new_note_off(61, 0),
            MidiMessage::NoteOff {
                key: u7::from(61),
                vel: u7::from(0)
            }
        );
    }

    #[test]
    fn pitch_bend_is_centered() {
        assert_eq!(
            new_pitch_bend(0),
            MidiMessage::PitchBend {
                bend: PitchBend(u14::from(0x2000))
            }
        );
        assert_eq!(
            new_pitch_bend(-8192),
            MidiMessage::PitchBend {
                bend: PitchBend(u14::from(0))
            }
        );
        assert_eq!(
            new_pitch_bend(i16::MAX),
            MidiMessage::PitchBend {
                bend: PitchBend(u14::from(0x3FFF))
            }
        );
    }

    #[test]
    fn controller_values_clamp() {
        assert_eq!(
            new_controller(MODULATION_CC, 300),
            MidiMessage::Controller {
                controller: u7::from(1),
                value: u7::from(127)
            }
        );
        assert_eq!(
            new_controller(MODULATION_CC, -4),
            MidiMessage::Controller {
                controller: u7::from(1),
                value: u7::from(0)
            }
        );
    }

    #[test]
    fn names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(127), "G9");
    }
}
