// Copyright (c) 2023 Mike Tsao. All rights reserved.

use keybed_core::{
    ensemble::KeyEnsemble,
    error::SettingsError,
    record::TransferRecord,
    settings::EnsembleSettings,
    traits::{Clock, ReadsAnalog, ReadsDigital, Transport},
    types::Millis,
};
use log::trace;

/// The slave end of a board pair. Each tick it scans its keys and shifts the
/// resulting record out to the master.
#[derive(Debug)]
pub struct KeyController<T: Transport> {
    ensemble: KeyEnsemble,
    transport: T,
    buffer: Vec<u8>,
}
impl<T: Transport> KeyController<T> {
    #[allow(missing_docs)]
    pub fn new_with(settings: &EnsembleSettings, transport: T) -> Result<Self, SettingsError> {
        Ok(Self::from_ensemble(KeyEnsemble::new_with(settings)?, transport))
    }

    #[allow(missing_docs)]
    pub fn from_ensemble(ensemble: KeyEnsemble, transport: T) -> Self {
        Self {
            buffer: vec![0; TransferRecord::padded_len(ensemble.len())],
            ensemble,
            transport,
        }
    }

    /// Scans every key once and sends the record.
    pub fn run_once<B: ReadsAnalog + ReadsDigital>(
        &mut self,
        board: &mut B,
        now: Millis,
    ) -> anyhow::Result<()> {
        let record = self.ensemble.poll_all(board, now);
        record.write_padded(&mut self.buffer)?;
        trace!("sending {:02x?}", self.buffer);
        self.transport.exchange(&self.buffer, &mut [])
    }

    /// Like [KeyController::run_once()], taking the time from the board's
    /// own counter.
    pub fn run_on_clock<B: ReadsAnalog + ReadsDigital + Clock>(
        &mut self,
        board: &mut B,
    ) -> anyhow::Result<()> {
        let now = board.now();
        self.run_once(board, now)
    }

    #[allow(missing_docs)]
    pub fn ensemble(&self) -> &KeyEnsemble {
        &self.ensemble
    }

    #[allow(missing_docs)]
    pub fn ensemble_mut(&mut self) -> &mut KeyEnsemble {
        &mut self.ensemble
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::loopback_pair;
    use keybed_core::{settings::KeySettings, sim::SimulatedBoard, types::Pin};

    #[test]
    fn each_tick_sends_one_padded_record() {
        let (slave_end, mut master_end) = loopback_pair();
        let mut controller = KeyController::new_with(
            &EnsembleSettings {
                pins: vec![1, 2],
                key: KeySettings {
                    smoothing_factor: None,
                    ..Default::default()
                },
                ..Default::default()
            },
            slave_end,
        )
        .unwrap();
        let mut board = SimulatedBoard::default();
        board.set_analog(Pin(2), 4095);

        controller.run_once(&mut board, Millis(0)).unwrap();
        controller.run_once(&mut board, Millis(1)).unwrap();

        let mut buffer = [0; 8];
        master_end.exchange(&[], &mut buffer).unwrap();
        assert_eq!(buffer, [0, 1, 0, 127, 0x80, 0x90, 0, 0]);
        master_end.exchange(&[], &mut buffer).unwrap();
        assert_eq!(buffer, [0, 0, 0, 127, 0x80, 0x90, 0, 0]);
        master_end.exchange(&[], &mut buffer).unwrap();
        assert_eq!(buffer, [0; 8], "nothing left queued");
    }

    #[test]
    fn board_clock_drives_forced_release() {
        let (slave_end, mut master_end) = loopback_pair();
        let mut controller = KeyController::new_with(
            &EnsembleSettings {
                pins: vec![1],
                key: KeySettings {
                    smoothing_factor: None,
                    debounce_ms: Some(50),
                    ..Default::default()
                },
                ..Default::default()
            },
            slave_end,
        )
        .unwrap();
        let mut board = SimulatedBoard::default();
        board.set_analog(Pin(1), 4095);
        board.set_now(Millis(u32::MAX - 10));

        let mut buffer = [0; 4];
        controller.run_on_clock(&mut board).unwrap();
        master_end.exchange(&[], &mut buffer).unwrap();
        assert_eq!(buffer, [1, 127, 0x90, 0]);

        board.advance(49);
        controller.run_on_clock(&mut board).unwrap();
        master_end.exchange(&[], &mut buffer).unwrap();
        assert_eq!(buffer[0], 0, "still held before the deadline");

        board.advance(1);
        controller.run_on_clock(&mut board).unwrap();
        master_end.exchange(&[], &mut buffer).unwrap();
        assert_eq!(buffer, [1, 0, 0x80, 0]);
    }
}
