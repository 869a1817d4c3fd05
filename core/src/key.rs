// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! The per-key note-detection state machine.
//!
//! Each poll, a [Key] turns one raw sensor sample into at most one MIDI
//! status change. Two thresholds give hysteresis: a note starts when the
//! velocity rises above `threshold_on` and ends when it falls below
//! `threshold_off`. If the sensor never reports a clean release, an optional
//! debounce time forces the note off so that every note-on gets its
//! note-off.
//!
//! Keys on boards with a damper contact also track re-strikes. Playing a key
//! again before its damper returns releases the sounding note on one poll
//! and starts the new one on the next.

use crate::{
    error::SettingsError,
    filter::Ema,
    midi::{new_note_off, new_note_on, MidiMessage},
    traits::{ReadsAnalog, ReadsDigital},
    types::{KeyStatus, Millis, Pin},
    util::adc_to_midi,
    velocity::VelocityScaler,
};
use derivative::Derivative;
use derive_builder::Builder;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// The states of a [Key].
#[derive(
    Clone, Copy, Debug, Default, Display, EnumIter, Eq, Hash, IntoStaticStr, PartialEq,
)]
pub enum KeyState {
    /// Silent, waiting for a press.
    #[default]
    Idle,
    /// Sounding.
    NoteOn,
    /// A re-strike released the sounding note last poll. The new note-on
    /// goes out on this one.
    PartialPressNoteOn,
    /// Released last poll. Passes straight through to [KeyState::Idle].
    NoteOff,
}

/// What a key's damper contact reports.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DamperContact {
    /// The key has no damper contact.
    #[default]
    Absent,
    /// The damper is off the string.
    Lifted,
    /// The damper is resting on the string.
    Down,
}
impl DamperContact {
    /// Decodes an active-low contact: LOW means the damper is down.
    pub const fn from_level(is_high: bool) -> Self {
        if is_high {
            Self::Lifted
        } else {
            Self::Down
        }
    }

    #[allow(missing_docs)]
    pub const fn is_down(&self) -> bool {
        matches!(self, Self::Down)
    }

    #[allow(missing_docs)]
    pub const fn is_lifted(&self) -> bool {
        matches!(self, Self::Lifted)
    }
}

/// One raw poll of a key's sensors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeySample {
    /// The ADC reading of the key's velocity sensor.
    pub raw: u16,
    #[allow(missing_docs)]
    pub damper: DamperContact,
    #[allow(missing_docs)]
    pub now: Millis,
}

/// The inputs to one step of the state machine, after conditioning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyInput {
    /// Baseline-corrected velocity in 0..=127.
    pub velocity: u8,
    #[allow(missing_docs)]
    pub damper: DamperContact,
    #[allow(missing_docs)]
    pub now: Millis,
}

/// The calibration constants of a [Key]. These are fixed for the life of the
/// key.
#[derive(Builder, Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[builder(default)]
#[serde(rename_all = "kebab-case")]
pub struct KeyParams {
    /// The analog input carrying this key's velocity sensor.
    pub pin: Pin,

    /// The digital input carrying this key's damper contact, if it has one.
    pub damper_pin: Option<Pin>,

    #[allow(missing_docs)]
    #[derivative(Default(value = "60"))]
    pub note: u8,

    /// The ceiling of the sample domain, `2^resolution - 1`.
    #[derivative(Default(value = "4095"))]
    pub max_adc_value: u16,

    /// The key's rest-state level in the 0..=127 domain.
    pub baseline: u8,

    #[allow(missing_docs)]
    #[derivative(Default(value = "65"))]
    pub threshold_on: u8,

    #[allow(missing_docs)]
    #[derivative(Default(value = "55"))]
    pub threshold_off: u8,

    /// How long a note must sound before a fresh peak may force it off.
    /// `None` disables forced release.
    #[derivative(Default(value = "Some(Millis(1000))"))]
    pub debounce: Option<Millis>,

    /// EMA smoothing for the raw samples. `None` uses them unfiltered.
    #[derivative(Default(value = "Some(Ema::DEFAULT_KEY_SMOOTHING_FACTOR)"))]
    pub smoothing_factor: Option<f64>,
}
impl KeyParams {
    /// Checks that these constants describe a usable key.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for threshold in [self.threshold_on, self.threshold_off] {
            if threshold > VelocityScaler::MAX_VELOCITY {
                return Err(SettingsError::ThresholdRange(threshold));
            }
        }
        if self.threshold_off > self.threshold_on {
            return Err(SettingsError::ThresholdOrder {
                on: self.threshold_on,
                off: self.threshold_off,
            });
        }
        if self.baseline > VelocityScaler::MAX_VELOCITY {
            return Err(SettingsError::BaselineRange(self.baseline));
        }
        if self.note > 127 {
            return Err(SettingsError::Note(self.note as u16));
        }
        if self.max_adc_value == 0 {
            return Err(SettingsError::AdcResolution(0));
        }
        Ok(())
    }
}

/// One physical key.
#[derive(Clone, Debug)]
pub struct Key {
    params: KeyParams,
    filter: Option<Ema>,
    scaler: VelocityScaler,

    state: KeyState,
    velocity: u8,
    status: KeyStatus,
    note_is_on: bool,
    is_ready_for_midi: bool,
    note_on_timestamp: Millis,

    // Set once the velocity has fallen back to threshold_off while sounding,
    // so a re-strike needs a real second press.
    is_rearmed: bool,
    pending_velocity: u8,
}
impl Key {
    #[allow(missing_docs)]
    pub fn new_with(params: KeyParams) -> Result<Self, SettingsError> {
        params.validate()?;
        let filter = match params.smoothing_factor {
            Some(factor) => Some(Ema::new_with(factor)?),
            None => None,
        };
        Ok(Self {
            scaler: VelocityScaler::new_with(params.baseline),
            filter,
            params,
            state: Default::default(),
            velocity: 0,
            status: Default::default(),
            note_is_on: false,
            is_ready_for_midi: false,
            note_on_timestamp: Millis::ZERO,
            is_rearmed: false,
            pending_velocity: 0,
        })
    }

    /// Conditions one raw sample and advances the state machine by one step.
    /// Returns whether this poll produced a new status.
    pub fn update(&mut self, sample: KeySample) -> bool {
        let input = self.condition(sample);
        self.step(input)
    }

    /// Reads this key's sensors from `board` and calls [Key::update()].
    pub fn poll<B: ReadsAnalog + ReadsDigital>(&mut self, board: &mut B, now: Millis) -> bool {
        let sample = self.sample(board, now);
        self.update(sample)
    }

    /// Reads this key's sensors without touching any state.
    pub fn sample<B: ReadsAnalog + ReadsDigital>(&self, board: &mut B, now: Millis) -> KeySample {
        KeySample {
            raw: board.read_analog(self.params.pin),
            damper: match self.params.damper_pin {
                Some(pin) => DamperContact::from_level(board.read_digital(pin)),
                None => DamperContact::Absent,
            },
            now,
        }
    }

    /// Runs the raw-sample half of the pipeline: smoothing, mapping into the
    /// MIDI domain, and baseline removal.
    pub fn condition(&mut self, sample: KeySample) -> KeyInput {
        let raw = match self.filter.as_mut() {
            Some(filter) => filter.update_adc(sample.raw),
            None => sample.raw,
        };
        let amplitude = adc_to_midi(raw, self.params.max_adc_value);
        KeyInput {
            velocity: self.scaler.scale(amplitude),
            damper: if self.params.damper_pin.is_some() {
                sample.damper
            } else {
                DamperContact::Absent
            },
            now: sample.now,
        }
    }

    /// Advances the state machine by one step on an already-conditioned
    /// input. Returns whether this step produced a new status.
    pub fn step(&mut self, input: KeyInput) -> bool {
        let KeyInput {
            velocity,
            damper,
            now,
        } = input;
        let on = self.params.threshold_on;
        let off = self.params.threshold_off;

        match self.state {
            KeyState::Idle => {
                if !self.note_is_on && velocity > on && !damper.is_down() {
                    self.emit_note_on(velocity, now);
                    self.state = KeyState::NoteOn;
                } else {
                    self.is_ready_for_midi = false;
                }
            }
            KeyState::NoteOn => {
                if velocity <= off {
                    self.is_rearmed = true;
                }
                if self.note_is_on && velocity < off && !damper.is_lifted() {
                    self.emit_note_off();
                    self.state = KeyState::NoteOff;
                } else if self.note_is_on && self.is_rearmed && velocity > on && damper.is_lifted() {
                    self.pending_velocity = velocity;
                    self.emit_note_off();
                    self.state = KeyState::PartialPressNoteOn;
                } else if self.note_is_on && velocity > on && self.debounce_has_elapsed(now) {
                    debug!(
                        "note {} forced off after {}",
                        self.params.note,
                        now.elapsed_since(self.note_on_timestamp)
                    );
                    self.emit_note_off();
                    self.state = KeyState::NoteOff;
                } else {
                    self.is_ready_for_midi = false;
                }
            }
            KeyState::PartialPressNoteOn => {
                self.emit_note_on(self.pending_velocity, now);
                self.state = KeyState::NoteOn;
            }
            KeyState::NoteOff => {
                self.is_ready_for_midi = false;
                self.state = KeyState::Idle;
            }
        }
        trace!(
            "note {} v={} damper={} -> {} ready={}",
            self.params.note,
            velocity,
            damper,
            self.state,
            self.is_ready_for_midi
        );
        self.is_ready_for_midi
    }

    fn debounce_has_elapsed(&self, now: Millis) -> bool {
        match self.params.debounce {
            Some(debounce) => now.elapsed_since(self.note_on_timestamp) >= debounce,
            None => false,
        }
    }

    fn emit_note_on(&mut self, velocity: u8, now: Millis) {
        self.velocity = velocity;
        self.status = KeyStatus::NoteOn;
        self.note_is_on = true;
        self.is_ready_for_midi = true;
        self.note_on_timestamp = now;
        self.is_rearmed = false;
        debug!("note {} on, velocity {}", self.params.note, velocity);
    }

    fn emit_note_off(&mut self) {
        self.velocity = 0;
        self.status = KeyStatus::NoteOff;
        self.note_is_on = false;
        self.is_ready_for_midi = true;
        debug!("note {} off", self.params.note);
    }

    /// The MIDI message for this key's current status.
    pub fn midi_message(&self) -> MidiMessage {
        match self.status {
            KeyStatus::NoteOn => new_note_on(self.params.note, self.velocity),
            KeyStatus::NoteOff => new_note_off(self.params.note, 0),
        }
    }

    #[allow(missing_docs)]
    pub fn params(&self) -> &KeyParams {
        &self.params
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> KeyState {
        self.state
    }

    /// The velocity of the most recent status. Zero while off.
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    #[allow(missing_docs)]
    pub fn status(&self) -> KeyStatus {
        self.status
    }

    #[allow(missing_docs)]
    pub fn note(&self) -> u8 {
        self.params.note
    }

    #[allow(missing_docs)]
    pub fn note_is_on(&self) -> bool {
        self.note_is_on
    }

    /// True for exactly the poll on which a new status was produced.
    pub fn is_ready_for_midi(&self) -> bool {
        self.is_ready_for_midi
    }

    #[allow(missing_docs)]
    pub fn baseline(&self) -> u8 {
        self.scaler.baseline()
    }

    /// Replaces the baseline, for example after calibrating at rest.
    pub fn set_baseline(&mut self, baseline: u8) -> Result<(), SettingsError> {
        if baseline > VelocityScaler::MAX_VELOCITY {
            return Err(SettingsError::BaselineRange(baseline));
        }
        self.params.baseline = baseline;
        self.scaler.set_baseline(baseline);
        Ok(())
    }
}
