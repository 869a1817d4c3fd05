// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Structs that hold the configuration of a keyboard. Intended to be
//! serialized. Every field has a default, so a settings file only needs to
//! mention what differs from the stock firmware.

use crate::{
    encoder::EncoderParams,
    error::SettingsError,
    filter::Ema,
    key::KeyParams,
    midi::MidiChannel,
    types::{Millis, Pin},
    util::max_adc_value,
    wheel::WheelParams,
};
use anyhow::anyhow;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Calibration shared by every key of an ensemble.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct KeySettings {
    #[allow(missing_docs)]
    #[derivative(Default(value = "65"))]
    pub threshold_on: u8,

    #[allow(missing_docs)]
    #[derivative(Default(value = "55"))]
    pub threshold_off: u8,

    #[allow(missing_docs)]
    pub baseline: u8,

    /// Forced-release time in milliseconds. `None` disables it.
    #[derivative(Default(value = "Some(1000)"))]
    pub debounce_ms: Option<u32>,

    /// `None` disables smoothing.
    #[derivative(Default(value = "Some(Ema::DEFAULT_KEY_SMOOTHING_FACTOR)"))]
    pub smoothing_factor: Option<f64>,
}

/// One slave board's keys.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct EnsembleSettings {
    /// The analog input of each key, in key order.
    #[derivative(Default(value = "vec![1, 2]"))]
    pub pins: Vec<u8>,

    /// The damper contact of each key. Either empty or one per key.
    pub damper_pins: Vec<u8>,

    /// The note of the first key. The others follow chromatically.
    #[derivative(Default(value = "60"))]
    pub start_note: u8,

    #[allow(missing_docs)]
    #[derivative(Default(value = "12"))]
    pub adc_resolution: u8,

    #[allow(missing_docs)]
    pub key: KeySettings,
}
impl EnsembleSettings {
    /// The parameters of each key, validated.
    pub fn key_params(&self) -> Result<Vec<KeyParams>, SettingsError> {
        if self.pins.is_empty() {
            return Err(SettingsError::EmptyEnsemble);
        }
        if !self.damper_pins.is_empty() && self.damper_pins.len() != self.pins.len() {
            return Err(SettingsError::DamperCount {
                keys: self.pins.len(),
                dampers: self.damper_pins.len(),
            });
        }
        let last_note = self.start_note as usize + self.pins.len() - 1;
        if last_note > 127 {
            return Err(SettingsError::Note(last_note.min(u16::MAX as usize) as u16));
        }
        let max_adc_value = max_adc_value(self.adc_resolution)?;

        self.pins
            .iter()
            .enumerate()
            .map(|(i, pin)| {
                let params = KeyParams {
                    pin: Pin(*pin),
                    damper_pin: self.damper_pins.get(i).map(|p| Pin(*p)),
                    note: self.start_note + i as u8,
                    max_adc_value,
                    baseline: self.key.baseline,
                    threshold_on: self.key.threshold_on,
                    threshold_off: self.key.threshold_off,
                    debounce: self.key.debounce_ms.map(Millis),
                    smoothing_factor: self.key.smoothing_factor,
                };
                params.validate()?;
                Ok(params)
            })
            .collect()
    }

    /// What the master needs to know about this board.
    pub fn slave_settings(&self) -> SlaveSettings {
        SlaveSettings {
            key_count: self.pins.len(),
            start_note: self.start_note,
        }
    }
}

/// A pitch-bend or modulation wheel.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct WheelSettings {
    #[allow(missing_docs)]
    pub pin: u8,

    #[allow(missing_docs)]
    #[derivative(Default(value = "12"))]
    pub adc_resolution: u8,

    #[allow(missing_docs)]
    #[derivative(Default(value = "-8192"))]
    pub range_min: i32,

    #[allow(missing_docs)]
    #[derivative(Default(value = "8191"))]
    pub range_max: i32,

    #[allow(missing_docs)]
    #[derivative(Default(value = "Ema::DEFAULT_WHEEL_SMOOTHING_FACTOR"))]
    pub smoothing_factor: f64,

    /// Half the width of the calibrated dead zone, in raw sample units.
    #[derivative(Default(value = "100"))]
    pub hysteresis: u16,

    /// Samples averaged by calibration.
    #[derivative(Default(value = "100"))]
    pub sample_count: usize,
}
impl WheelSettings {
    /// A pitch-bend wheel on `pin`.
    pub fn new_pitch_bend(pin: u8) -> Self {
        Self {
            pin,
            ..Default::default()
        }
    }

    /// A modulation wheel on `pin`.
    pub fn new_modulation(pin: u8) -> Self {
        Self {
            pin,
            range_min: 0,
            range_max: 127,
            ..Default::default()
        }
    }

    #[allow(missing_docs)]
    pub fn to_params(&self) -> Result<WheelParams, SettingsError> {
        let params = WheelParams {
            pin: Pin(self.pin),
            max_analog_value: max_adc_value(self.adc_resolution)?,
            range_min: self.range_min,
            range_max: self.range_max,
            smoothing_factor: self.smoothing_factor,
            hysteresis: self.hysteresis,
            sample_count: self.sample_count,
        };
        params.validate()?;
        Ok(params)
    }
}

/// A rotary encoder, by default the transpose knob.
#[derive(Clone, Debug, Derivative, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct EncoderSettings {
    #[allow(missing_docs)]
    #[derivative(Default(value = "6"))]
    pub clock_pin: u8,
    #[allow(missing_docs)]
    #[derivative(Default(value = "7"))]
    pub data_pin: u8,
    #[allow(missing_docs)]
    #[derivative(Default(value = "8"))]
    pub switch_pin: u8,

    #[allow(missing_docs)]
    #[derivative(Default(value = "-24"))]
    pub min: i32,
    #[allow(missing_docs)]
    #[derivative(Default(value = "24"))]
    pub max: i32,

    #[allow(missing_docs)]
    #[derivative(Default(value = "1"))]
    pub rotation_debounce_ms: u32,
    #[allow(missing_docs)]
    #[derivative(Default(value = "1"))]
    pub switch_debounce_ms: u32,
}
impl EncoderSettings {
    #[allow(missing_docs)]
    pub fn to_params(&self) -> Result<EncoderParams, SettingsError> {
        if self.min > self.max {
            return Err(SettingsError::EmptyRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(EncoderParams {
            clock_pin: Pin(self.clock_pin),
            data_pin: Pin(self.data_pin),
            switch_pin: Pin(self.switch_pin),
            min: self.min,
            max: self.max,
            rotation_debounce: Millis(self.rotation_debounce_ms),
            switch_debounce: Millis(self.switch_debounce_ms),
        })
    }
}

/// The master's view of one slave board.
#[derive(Clone, Debug, Derivative, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct SlaveSettings {
    #[allow(missing_docs)]
    #[derivative(Default(value = "2"))]
    pub key_count: usize,

    #[allow(missing_docs)]
    #[derivative(Default(value = "60"))]
    pub start_note: u8,
}
impl SlaveSettings {
    /// The note of each of this slave's keys.
    pub fn notes(&self) -> Result<Vec<u8>, SettingsError> {
        if self.key_count == 0 {
            return Err(SettingsError::EmptyEnsemble);
        }
        let last_note = self.start_note as usize + self.key_count - 1;
        if last_note > 127 {
            return Err(SettingsError::Note(last_note.min(u16::MAX as usize) as u16));
        }
        Ok((0..self.key_count)
            .map(|i| self.start_note + i as u8)
            .collect())
    }
}

/// The master board.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct MasterSettings {
    /// Numbered 1..=16, the way people count them.
    #[derivative(Default(value = "1"))]
    pub midi_channel: u8,

    #[allow(missing_docs)]
    #[derivative(Default(value = "Some(WheelSettings::new_pitch_bend(3))"))]
    pub pitch_wheel: Option<WheelSettings>,

    #[allow(missing_docs)]
    #[derivative(Default(value = "Some(WheelSettings::new_modulation(4))"))]
    pub modulation_wheel: Option<WheelSettings>,

    #[allow(missing_docs)]
    #[derivative(Default(value = "Some(EncoderSettings::default())"))]
    pub transpose: Option<EncoderSettings>,

    /// Queried in this order every tick.
    #[derivative(Default(value = "vec![SlaveSettings::default()]"))]
    pub slaves: Vec<SlaveSettings>,
}
impl MasterSettings {
    #[allow(missing_docs)]
    pub fn channel(&self) -> Result<MidiChannel, SettingsError> {
        MidiChannel::from_user_channel(self.midi_channel)
    }

    #[allow(missing_docs)]
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.channel()?;
        for wheel in self.pitch_wheel.iter().chain(self.modulation_wheel.iter()) {
            wheel.to_params()?;
        }
        if let Some(transpose) = self.transpose.as_ref() {
            transpose.to_params()?;
        }
        for slave in self.slaves.iter() {
            slave.notes()?;
        }
        Ok(())
    }
}

/// Everything about one keyboard: its slave boards and its master.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct KeyboardSettings {
    #[allow(missing_docs)]
    #[derivative(Default(value = "vec![EnsembleSettings::default()]"))]
    pub slaves: Vec<EnsembleSettings>,

    #[allow(missing_docs)]
    pub master: MasterSettings,
}
impl KeyboardSettings {
    /// Reads and validates settings from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Couldn't read {path:?}: {e}"))?;
        Self::from_json_str(&json).map_err(|e| anyhow!("Couldn't load {path:?}: {e}"))
    }

    /// Parses and validates settings from a JSON string.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let settings = serde_json::from_str::<Self>(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks every part, and that the master expects exactly these slaves,
    /// each with the same key count and start note it was built with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for slave in self.slaves.iter() {
            slave.key_params()?;
        }
        self.master.validate()?;
        if self.slaves.len() != self.master.slaves.len() {
            return Err(SettingsError::SlaveCount {
                slaves: self.slaves.len(),
                master: self.master.slaves.len(),
            });
        }
        for (slave, seen_by_master) in self.slaves.iter().zip(self.master.slaves.iter()) {
            if slave.pins.len() != seen_by_master.key_count {
                return Err(SettingsError::KeyCount {
                    slave: slave.pins.len(),
                    master: seen_by_master.key_count,
                });
            }
            if slave.start_note != seen_by_master.start_note {
                return Err(SettingsError::StartNote {
                    slave: slave.start_note,
                    master: seen_by_master.start_note,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_firmware() {
        let settings = KeyboardSettings::default();
        assert!(settings.validate().is_ok());

        let key = &settings.slaves[0].key;
        assert_eq!(key.threshold_on, 65);
        assert_eq!(key.threshold_off, 55);
        assert_eq!(key.debounce_ms, Some(1000));
        assert_eq!(key.smoothing_factor, Some(0.4));
        assert_eq!(settings.slaves[0].adc_resolution, 12);

        let master = &settings.master;
        assert_eq!(master.channel(), Ok(MidiChannel(0)));
        let transpose = master.transpose.as_ref().unwrap();
        assert_eq!((transpose.min, transpose.max), (-24, 24));
        let modulation = master.modulation_wheel.as_ref().unwrap();
        assert_eq!((modulation.range_min, modulation.range_max), (0, 127));
        assert_eq!(modulation.smoothing_factor, 0.1);
    }

    #[test]
    fn key_params_are_laid_out_chromatically() {
        let settings = EnsembleSettings {
            pins: vec![10, 11, 12],
            damper_pins: vec![20, 21, 22],
            start_note: 48,
            adc_resolution: 10,
            ..Default::default()
        };
        let params = settings.key_params().unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[2].pin, Pin(12));
        assert_eq!(params[2].damper_pin, Some(Pin(22)));
        assert_eq!(params[2].note, 50);
        assert_eq!(params[0].max_adc_value, 1023);
        assert_eq!(
            settings.slave_settings(),
            SlaveSettings {
                key_count: 3,
                start_note: 48
            }
        );
    }

    #[test]
    fn bad_layouts_are_rejected() {
        let settings = EnsembleSettings {
            pins: vec![1, 2],
            damper_pins: vec![3],
            ..Default::default()
        };
        assert_eq!(
            settings.key_params(),
            Err(SettingsError::DamperCount {
                keys: 2,
                dampers: 1
            })
        );

        let settings = EnsembleSettings {
            pins: vec![1, 2],
            start_note: 127,
            ..Default::default()
        };
        assert_eq!(settings.key_params(), Err(SettingsError::Note(128)));

        let settings = EnsembleSettings {
            pins: Vec::default(),
            ..Default::default()
        };
        assert_eq!(settings.key_params(), Err(SettingsError::EmptyEnsemble));

        let mut settings = EnsembleSettings::default();
        settings.key.threshold_off = 70;
        assert!(settings.key_params().is_err());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings = KeyboardSettings::from_json_str(
            r#"{
                "slaves": [{ "pins": [1, 2, 3, 4], "start-note": 36, "key": { "threshold-on": 70 } }],
                "master": { "midi-channel": 10, "slaves": [{ "key-count": 4, "start-note": 36 }] }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.slaves[0].key.threshold_on, 70);
        assert_eq!(settings.slaves[0].key.threshold_off, 55);
        assert_eq!(settings.master.channel(), Ok(MidiChannel(9)));
        assert_eq!(settings.master.slaves[0].notes(), Ok(vec![36, 37, 38, 39]));
    }

    #[test]
    fn inconsistent_json_is_rejected() {
        assert!(KeyboardSettings::from_json_str(r#"{ "master": { "midi-channel": 0 } }"#).is_err());
        assert!(KeyboardSettings::from_json_str(
            r#"{ "master": { "slaves": [{ "key-count": 5 }] } }"#
        )
        .is_err());
        assert!(KeyboardSettings::from_json_str("not json").is_err());
    }

    #[test]
    fn master_must_agree_with_slave_layouts() {
        let one_slave = |start_note: u8| EnsembleSettings {
            start_note,
            ..Default::default()
        };
        let seen_by_master = |start_note: u8| SlaveSettings {
            key_count: 2,
            start_note,
        };
        let mut settings = KeyboardSettings {
            slaves: vec![one_slave(60)],
            master: MasterSettings {
                slaves: vec![seen_by_master(72)],
                ..Default::default()
            },
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::StartNote {
                slave: 60,
                master: 72
            })
        );

        settings.master.slaves = vec![seen_by_master(60)];
        assert!(settings.validate().is_ok());

        settings.slaves.push(one_slave(62));
        assert_eq!(
            settings.validate(),
            Err(SettingsError::SlaveCount {
                slaves: 2,
                master: 1
            })
        );

        settings.master.slaves.push(seen_by_master(62));
        assert!(settings.validate().is_ok());
        settings.master.slaves.push(seen_by_master(64));
        assert!(settings.validate().is_err());

        assert!(KeyboardSettings::from_json_str(
            r#"{
                "slaves": [{ "start-note": 60 }],
                "master": { "slaves": [{ "key-count": 2, "start-note": 72 }] }
            }"#
        )
        .is_err());
    }

    #[test]
    fn encoder_and_wheel_conversions() {
        let params = EncoderSettings::default().to_params().unwrap();
        assert_eq!(params.switch_pin, Pin(8));
        assert_eq!(params.rotation_debounce, Millis(1));

        let bad = EncoderSettings {
            min: 1,
            max: -1,
            ..Default::default()
        };
        assert!(bad.to_params().is_err());

        let wheel = WheelSettings::new_pitch_bend(3).to_params().unwrap();
        assert_eq!(wheel.max_analog_value, 4095);
        assert_eq!(wheel.range_min, -8192);
    }
}
