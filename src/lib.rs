// Copyright (c) 2023 Mike Tsao. All rights reserved.

#![warn(missing_docs)]

//! The `keybed` crate turns noisy analog key sensors into correctly paired
//! MIDI note events, and carries those events from the boards that scan the
//! keys to the board that talks to the host.

pub mod conditioning {
    //! Signal conditioning: the filtering and scaling that happen to every
    //! raw sample before the note-detection state machine sees it.
    //!
    //! Raw ADC samples pass through an [Ema] low-pass filter, get mapped into
    //! the 0..=127 MIDI domain with [map_range], and then have the key's
    //! resting baseline removed by a [VelocityScaler].

    pub use keybed_core::{
        calibration::average_samples,
        filter::Ema,
        util::{adc_to_midi, map_range, max_adc_value},
        velocity::{scale_velocity, VelocityScaler},
    };

    /// The most commonly used imports.
    pub mod prelude {
        pub use super::{map_range, Ema, VelocityScaler};
    }
}

pub mod keys {
    //! Keys, the note-detection state machine, and the ensemble that scans a
    //! board's keys together.

    pub use keybed_core::{
        ensemble::KeyEnsemble,
        key::{DamperContact, Key, KeyInput, KeyParams, KeyParamsBuilder, KeySample, KeyState},
        record::{KeyReport, TransferRecord},
        types::KeyStatus,
    };

    /// The most commonly used imports.
    pub mod prelude {
        pub use super::{Key, KeyEnsemble, KeyParamsBuilder, KeyStatus, TransferRecord};
    }
}

pub mod controllers {
    //! Continuous controllers: the pitch-bend and modulation wheels and the
    //! transpose knob.

    pub use keybed_core::{
        encoder::{
            Direction, EncoderParams, EncoderParamsBuilder, EncoderSample, RotaryEncoder,
            SwitchFn, TransposeKnob,
        },
        wheel::{Wheel, WheelParams, WheelParamsBuilder},
    };

    /// The most commonly used imports.
    pub mod prelude {
        pub use super::{RotaryEncoder, TransposeKnob, Wheel};
    }
}

pub mod midi {
    //! MIDI types and helpers.

    pub use keybed_core::midi::{
        new_controller, new_note_off, new_note_on, new_pitch_bend, note_name, u14, u4, u7,
        MidiChannel, MidiMessage, PitchBend, MODULATION_CC,
    };

    /// The most commonly used imports.
    pub mod prelude {
        pub use keybed_core::midi::prelude::*;
    }
}

pub mod transport {
    //! The hardware boundary and the two ends of a board pair.

    pub use keybed_core::{
        sim::SimulatedBoard,
        traits::{Clock, MidiMessagesFn, ReadsAnalog, ReadsDigital, Transport},
    };
    pub use keybed_services::{
        loopback_pair, KeyController, LoopbackTransport, Master, MidiBridge, SlaveLink,
    };

    /// The most commonly used imports.
    pub mod prelude {
        pub use keybed_core::traits::prelude::*;
        pub use keybed_services::prelude::*;
    }
}

pub mod settings {
    //! Serializable configuration.

    pub use keybed_core::settings::{
        EncoderSettings, EnsembleSettings, KeySettings, KeyboardSettings, MasterSettings,
        SlaveSettings, WheelSettings,
    };
}

pub mod types {
    //! Common structures and errors used across the library.

    pub use keybed_core::{
        error::{RecordError, SettingsError},
        types::{KeyStatus, Millis, Pin},
    };
}

pub mod replay;

/// A collection of imports that are useful to users of this crate. `use
/// keybed::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        conditioning::prelude::*,
        controllers::prelude::*,
        keys::prelude::*,
        midi::prelude::*,
        replay::{run_scenario, ReplayEvent, Scenario},
        settings::KeyboardSettings,
        transport::prelude::*,
        types::{Millis, Pin},
    };
}
