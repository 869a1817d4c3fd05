// Copyright (c) 2023 Mike Tsao. All rights reserved.

use thiserror::Error;

/// Calibration or configuration that can't produce a working keybed. These
/// are caught when things are built, so the per-tick path never has to fail.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[allow(missing_docs)]
    #[error("threshold-off ({off}) must not exceed threshold-on ({on})")]
    ThresholdOrder { on: u8, off: u8 },

    #[allow(missing_docs)]
    #[error("threshold {0} is outside the MIDI velocity range 0..=127")]
    ThresholdRange(u8),

    #[allow(missing_docs)]
    #[error("baseline {0} is outside the MIDI velocity range 0..=127")]
    BaselineRange(u8),

    #[allow(missing_docs)]
    #[error("smoothing factor {0} must be greater than 0 and at most 1")]
    SmoothingFactor(f64),

    #[allow(missing_docs)]
    #[error("ADC resolution of {0} bits is unsupported (1..=16)")]
    AdcResolution(u8),

    #[allow(missing_docs)]
    #[error("a key ensemble needs at least one key")]
    EmptyEnsemble,

    #[allow(missing_docs)]
    #[error("note {0} is outside the MIDI note range 0..=127")]
    Note(u16),

    #[allow(missing_docs)]
    #[error("{dampers} damper pins were given for {keys} keys")]
    DamperCount { keys: usize, dampers: usize },

    #[allow(missing_docs)]
    #[error("a slave has {slave} keys but the master expects {master}")]
    KeyCount { slave: usize, master: usize },

    #[allow(missing_docs)]
    #[error("{slaves} slaves are configured but the master expects {master}")]
    SlaveCount { slaves: usize, master: usize },

    #[allow(missing_docs)]
    #[error("a slave starts at note {slave} but the master expects {master}")]
    StartNote { slave: u8, master: u8 },

    #[allow(missing_docs)]
    #[error("MIDI channel {0} is outside 1..=16")]
    MidiChannel(u8),

    #[allow(missing_docs)]
    #[error("range {min}..={max} is empty")]
    EmptyRange { min: i32, max: i32 },

    #[allow(missing_docs)]
    #[error("calibration needs at least one sample")]
    NoSamples,
}

/// Problems with the bytes of a [TransferRecord](crate::record::TransferRecord).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[allow(missing_docs)]
    #[error("expected {expected} bytes for {key_count} keys but got {actual}")]
    Length {
        key_count: usize,
        expected: usize,
        actual: usize,
    },

    #[allow(missing_docs)]
    #[error("a buffer of {actual} bytes can't hold a {expected}-byte record")]
    BufferTooSmall { expected: usize, actual: usize },

    #[allow(missing_docs)]
    #[error("a record must describe at least one key")]
    NoKeys,

    #[allow(missing_docs)]
    #[error("a scan of {key_count} keys was given {actual} inputs")]
    InputCount { key_count: usize, actual: usize },
}
