// Copyright (c) 2023 Mike Tsao. All rights reserved.

use keybed_core::{
    error::SettingsError, record::TransferRecord, settings::SlaveSettings, traits::Transport,
};
use log::trace;

/// The master's handle on one slave board: its layout, its bus, and the
/// buffer that the bus fills.
#[derive(Debug)]
pub struct SlaveLink<T: Transport> {
    id: usize,
    notes: Vec<u8>,
    transport: T,
    buffer: Vec<u8>,
}
impl<T: Transport> SlaveLink<T> {
    #[allow(missing_docs)]
    pub fn new_with(id: usize, settings: &SlaveSettings, transport: T) -> Result<Self, SettingsError> {
        let notes = settings.notes()?;
        Ok(Self {
            id,
            buffer: vec![0; TransferRecord::padded_len(notes.len())],
            notes,
            transport,
        })
    }

    /// Performs one exchange and decodes what the slave sent. A slave with
    /// nothing queued yields an all-idle record.
    pub fn query(&mut self) -> anyhow::Result<TransferRecord> {
        self.transport.exchange(&[], &mut self.buffer)?;
        trace!("slave {} sent {:02x?}", self.id, self.buffer);
        Ok(TransferRecord::from_padded(self.notes.len(), &self.buffer)?)
    }

    #[allow(missing_docs)]
    pub fn id(&self) -> usize {
        self.id
    }

    /// The untransposed note of each of the slave's keys.
    pub fn notes(&self) -> &[u8] {
        &self.notes
    }

    #[allow(missing_docs)]
    pub fn key_count(&self) -> usize {
        self.notes.len()
    }
}
