// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! The fixed-layout buffer that carries one ensemble scan across a bus.
//!
//! ```text
//! [0, n)       readiness, 0x00 or 0x01 per key
//! [n, 2n)      velocity, 0..=127 per key
//! [2n, 3n)     status, 0x90 (note-on) or 0x80 (note-off) per key
//! ```
//!
//! There's no header or checksum. Both ends must agree on `n`.

use crate::{error::RecordError, types::KeyStatus};
use log::warn;

/// What one key reported in one scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyReport {
    /// True if this key produced a new status in this scan.
    pub is_ready: bool,
    #[allow(missing_docs)]
    pub velocity: u8,
    #[allow(missing_docs)]
    pub status: KeyStatus,
}

/// One scan of a [KeyEnsemble](crate::ensemble::KeyEnsemble), laid out for
/// the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRecord {
    key_count: usize,
    bytes: Vec<u8>,
}
impl TransferRecord {
    const READY: u8 = 0x01;
    const NOT_READY: u8 = 0x00;

    /// The number of bytes a record for `key_count` keys occupies.
    pub const fn wire_len(key_count: usize) -> usize {
        key_count * 3
    }

    /// Rounds [TransferRecord::wire_len()] up to the next multiple of four,
    /// which is how bus buffers are sized.
    pub const fn padded_len(key_count: usize) -> usize {
        (Self::wire_len(key_count) + 3) & !3
    }

    /// An all-idle record: nothing ready, zero velocity, note-off.
    pub fn new_with(key_count: usize) -> Result<Self, RecordError> {
        if key_count == 0 {
            return Err(RecordError::NoKeys);
        }
        let mut bytes = vec![0; Self::wire_len(key_count)];
        bytes[key_count * 2..].fill(KeyStatus::NoteOff.into());
        Ok(Self { key_count, bytes })
    }

    /// Wraps received bytes, which must be exactly one record long.
    pub fn from_bytes(key_count: usize, bytes: &[u8]) -> Result<Self, RecordError> {
        if key_count == 0 {
            return Err(RecordError::NoKeys);
        }
        let expected = Self::wire_len(key_count);
        if bytes.len() != expected {
            return Err(RecordError::Length {
                key_count,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            key_count,
            bytes: bytes.to_vec(),
        })
    }

    /// Like [TransferRecord::from_bytes()], but ignores any bytes past the
    /// record, as in a padded receive buffer.
    pub fn from_padded(key_count: usize, buffer: &[u8]) -> Result<Self, RecordError> {
        let expected = Self::wire_len(key_count);
        if buffer.len() < expected {
            return Err(RecordError::Length {
                key_count,
                expected,
                actual: buffer.len(),
            });
        }
        Self::from_bytes(key_count, &buffer[..expected])
    }

    /// Writes this record to the front of `buffer` and zero-fills the rest.
    pub fn write_padded(&self, buffer: &mut [u8]) -> Result<(), RecordError> {
        if buffer.len() < self.bytes.len() {
            return Err(RecordError::BufferTooSmall {
                expected: self.bytes.len(),
                actual: buffer.len(),
            });
        }
        let (record, tail) = buffer.split_at_mut(self.bytes.len());
        record.copy_from_slice(&self.bytes);
        tail.fill(0);
        Ok(())
    }

    /// Stores one key's report at `index`.
    ///
    /// Panics if `index` is out of range; callers index by ensemble
    /// position, which always fits.
    pub fn set(&mut self, index: usize, report: KeyReport) {
        let n = self.key_count;
        self.bytes[index] = if report.is_ready {
            Self::READY
        } else {
            Self::NOT_READY
        };
        self.bytes[n + index] = report.velocity;
        self.bytes[n * 2 + index] = report.status.into();
    }

    /// Decodes the report at `index`, or `None` if it's out of range.
    pub fn report(&self, index: usize) -> Option<KeyReport> {
        if index >= self.key_count {
            return None;
        }
        let n = self.key_count;
        let is_ready = match self.bytes[index] {
            Self::READY => true,
            Self::NOT_READY => false,
            other => {
                warn!("key {index} has readiness byte {other:#04x}; treating it as not ready");
                false
            }
        };
        Some(KeyReport {
            is_ready,
            velocity: self.bytes[n + index],
            status: KeyStatus::from_status_byte(self.bytes[n * 2 + index]),
        })
    }

    /// All reports, in key order.
    pub fn reports(&self) -> impl Iterator<Item = KeyReport> + '_ {
        (0..self.key_count).filter_map(|i| self.report(i))
    }

    /// The index and report of every key that's ready this scan.
    pub fn ready_reports(&self) -> impl Iterator<Item = (usize, KeyReport)> + '_ {
        self.reports()
            .enumerate()
            .filter(|(_, report)| report.is_ready)
    }

    #[allow(missing_docs)]
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// The raw wire bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
