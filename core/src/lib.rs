// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Keybed core turns noisy, continuously sampled analog key sensors into
//! correctly paired MIDI note events.

/// Startup averaging of raw samples.
pub mod calibration;
/// Rotary encoders such as the transpose knob.
pub mod encoder;
/// A fixed collection of keys scanned together.
pub mod ensemble;
/// Error types.
pub mod error;
/// Exponential-moving-average signal conditioning.
pub mod filter;
/// The per-key note-detection state machine.
pub mod key;
/// MIDI-related functionality.
pub mod midi;
/// The fixed-layout buffer that carries one ensemble scan across a bus.
pub mod record;
/// Serializable configuration.
pub mod settings;
/// A software stand-in for board I/O.
pub mod sim;
/// Describes the hardware boundary.
pub mod traits;
/// Common structures used across the library.
pub mod types;
/// Helper functions.
pub mod util;
/// Mapping calibrated amplitudes onto MIDI velocity.
pub mod velocity;
/// Pitch-bend and modulation wheels.
pub mod wheel;

/// Recommended imports for easy onboarding.
pub mod prelude {
    pub use super::{
        calibration::average_samples,
        encoder::{
            Direction, EncoderParams, EncoderParamsBuilder, EncoderSample, RotaryEncoder,
            TransposeKnob,
        },
        ensemble::KeyEnsemble,
        error::{RecordError, SettingsError},
        filter::Ema,
        key::{DamperContact, Key, KeyInput, KeyParams, KeyParamsBuilder, KeySample, KeyState},
        midi::{new_note_off, new_note_on, u4, u7, MidiChannel, MidiMessage},
        record::{KeyReport, TransferRecord},
        settings::{
            EncoderSettings, EnsembleSettings, KeySettings, KeyboardSettings, MasterSettings,
            SlaveSettings, WheelSettings,
        },
        sim::SimulatedBoard,
        traits::{Clock, MidiMessagesFn, ReadsAnalog, ReadsDigital, Transport},
        types::{KeyStatus, Millis, Pin},
        util::{map_range, max_adc_value},
        velocity::VelocityScaler,
        wheel::{Wheel, WheelParams, WheelParamsBuilder},
    };
}
