// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{
    calibration::average_samples,
    error::{RecordError, SettingsError},
    key::{Key, KeyInput, KeySample},
    record::{KeyReport, TransferRecord},
    settings::EnsembleSettings,
    traits::{ReadsAnalog, ReadsDigital},
    types::Millis,
    util::adc_to_midi,
};
use log::{debug, info};

/// A fixed set of keys scanned together. The ensemble owns its keys and the
/// record that each scan fills in; neither ever changes size.
///
/// Keys are independent. A scan updates them in index order and copies each
/// one's result into the record at the same index.
#[derive(Clone, Debug)]
pub struct KeyEnsemble {
    keys: Box<[Key]>,
    record: TransferRecord,
}
impl KeyEnsemble {
    /// Builds the keys that `settings` describes, assigning consecutive notes
    /// starting at the configured start note.
    pub fn new_with(settings: &EnsembleSettings) -> Result<Self, SettingsError> {
        let keys = settings
            .key_params()?
            .into_iter()
            .map(Key::new_with)
            .collect::<Result<Vec<_>, _>>()?;
        let r = Self::from_keys(keys)?;
        info!(
            "ensemble of {} keys, notes {}..={}",
            r.len(),
            settings.start_note,
            settings.start_note as usize + r.len() - 1
        );
        Ok(r)
    }

    /// Takes ownership of already-built keys.
    pub fn from_keys(keys: Vec<Key>) -> Result<Self, SettingsError> {
        if keys.is_empty() {
            return Err(SettingsError::EmptyEnsemble);
        }
        let record = TransferRecord::new_with(keys.len())
            .map_err(|_| SettingsError::EmptyEnsemble)?;
        Ok(Self {
            keys: keys.into_boxed_slice(),
            record,
        })
    }

    /// Runs one scan, reading every key's sensors from `board`.
    pub fn poll_all<B: ReadsAnalog + ReadsDigital>(
        &mut self,
        board: &mut B,
        now: Millis,
    ) -> &TransferRecord {
        self.poll_with(|_, key| key.sample(&mut *board, now))
    }

    /// Runs one scan, asking `sample_fn` for each key's raw sample in index
    /// order.
    pub fn poll_with<F>(&mut self, mut sample_fn: F) -> &TransferRecord
    where
        F: FnMut(usize, &Key) -> KeySample,
    {
        for (i, key) in self.keys.iter_mut().enumerate() {
            let sample = sample_fn(i, key);
            key.update(sample);
            Self::store(&mut self.record, i, key);
        }
        &self.record
    }

    /// Runs one scan on already-conditioned inputs, bypassing the keys'
    /// filters. `inputs` must have exactly one entry per key; otherwise
    /// nothing is stepped and the record is left alone.
    pub fn step_all(&mut self, inputs: &[KeyInput]) -> Result<&TransferRecord, RecordError> {
        if inputs.len() != self.keys.len() {
            return Err(RecordError::InputCount {
                key_count: self.keys.len(),
                actual: inputs.len(),
            });
        }
        for (i, (key, input)) in self.keys.iter_mut().zip(inputs).enumerate() {
            key.step(*input);
            Self::store(&mut self.record, i, key);
        }
        Ok(&self.record)
    }

    fn store(record: &mut TransferRecord, index: usize, key: &Key) {
        if key.is_ready_for_midi() {
            debug!(
                "key {index} (note {}) ready: {} velocity {}",
                key.note(),
                key.status(),
                key.velocity()
            );
        }
        record.set(
            index,
            KeyReport {
                is_ready: key.is_ready_for_midi(),
                velocity: key.velocity(),
                status: key.status(),
            },
        );
    }

    /// Samples each key at rest and sets its baseline to the resting level.
    pub fn calibrate_baselines<A: ReadsAnalog + ?Sized>(
        &mut self,
        source: &mut A,
        sample_count: usize,
    ) -> Result<(), SettingsError> {
        for key in self.keys.iter_mut() {
            let average = average_samples(source, key.params().pin, sample_count)?;
            let baseline = adc_to_midi(average, key.params().max_adc_value);
            key.set_baseline(baseline)?;
            info!("note {} baseline {}", key.note(), baseline);
        }
        Ok(())
    }

    /// The record from the most recent scan.
    pub fn record(&self) -> &TransferRecord {
        &self.record
    }

    #[allow(missing_docs)]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[allow(missing_docs)]
    pub fn key(&self, index: usize) -> Option<&Key> {
        self.keys.get(index)
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The note of each key, in index order.
    pub fn notes(&self) -> Vec<u8> {
        self.keys.iter().map(|k| k.note()).collect()
    }
}
