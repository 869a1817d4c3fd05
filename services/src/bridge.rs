// Copyright (c) 2023 Mike Tsao. All rights reserved.

use keybed_core::{
    midi::{new_controller, new_note_off, new_note_on, new_pitch_bend, MidiChannel, MODULATION_CC},
    record::TransferRecord,
    traits::MidiMessagesFn,
    types::KeyStatus,
    wheel::Wheel,
};
use log::{debug, warn};
use std::collections::HashMap;

/// Turns slave records and wheel edges into MIDI messages on one channel.
///
/// The bridge remembers which note each sounding key started, so a key
/// released after the transpose knob moved still turns off the note it
/// turned on.
#[derive(Debug, Default)]
pub struct MidiBridge {
    channel: MidiChannel,
    sounding: HashMap<(usize, usize), u8>,
}
impl MidiBridge {
    #[allow(missing_docs)]
    pub fn new_with(channel: MidiChannel) -> Self {
        Self {
            channel,
            sounding: Default::default(),
        }
    }

    /// Shifts `note` by `transpose` semitones, or returns `None` if that
    /// leaves the MIDI note range.
    pub fn transposed_note(note: u8, transpose: i32) -> Option<u8> {
        let transposed = note as i32 + transpose;
        if (0..=127).contains(&transposed) {
            Some(transposed as u8)
        } else {
            None
        }
    }

    /// Emits one note message for each ready key in `record`. `notes` holds
    /// the untransposed note of each key. A note-on for a key that is still
    /// sounding first turns off the note it started. Returns how many
    /// messages went out.
    pub fn emit_record(
        &mut self,
        slave_id: usize,
        record: &TransferRecord,
        notes: &[u8],
        transpose: i32,
        midi_messages_fn: &mut MidiMessagesFn,
    ) -> usize {
        let mut count = 0;
        for (index, report) in record.ready_reports() {
            let Some(base_note) = notes.get(index).copied() else {
                warn!("slave {slave_id} reported key {index}, which it doesn't have");
                continue;
            };
            let message = match report.status {
                KeyStatus::NoteOn => {
                    let Some(note) = Self::transposed_note(base_note, transpose) else {
                        debug!("dropping note {base_note} transposed by {transpose}");
                        continue;
                    };
                    if let Some(previous) = self.sounding.insert((slave_id, index), note) {
                        debug!("slave {slave_id} key {index} restarted while note {previous} sounded");
                        midi_messages_fn(self.channel, new_note_off(previous, 0));
                        count += 1;
                    }
                    new_note_on(note, report.velocity)
                }
                KeyStatus::NoteOff => {
                    let Some(note) = self.sounding.remove(&(slave_id, index)) else {
                        debug!("slave {slave_id} key {index} released with nothing sounding");
                        continue;
                    };
                    new_note_off(note, report.velocity)
                }
            };
            midi_messages_fn(self.channel, message);
            count += 1;
        }
        count
    }

    /// Emits pitch bend if the wheel's reading just changed.
    pub fn emit_pitch_bend(&self, wheel: &Wheel, midi_messages_fn: &mut MidiMessagesFn) -> bool {
        if wheel.is_changed() {
            let bend = wheel.reading().clamp(i16::MIN as i32, i16::MAX as i32) as i16;
            midi_messages_fn(self.channel, new_pitch_bend(bend));
        }
        wheel.is_changed()
    }

    /// Emits a modulation controller change if the wheel's reading just
    /// changed.
    pub fn emit_modulation(&self, wheel: &Wheel, midi_messages_fn: &mut MidiMessagesFn) -> bool {
        if wheel.is_changed() {
            midi_messages_fn(
                self.channel,
                new_controller(MODULATION_CC, wheel.reading()),
            );
        }
        wheel.is_changed()
    }

    #[allow(missing_docs)]
    pub fn channel(&self) -> MidiChannel {
        self.channel
    }

    /// How many notes are currently sounding.
    pub fn sounding_count(&self) -> usize {
        self.sounding.len()
    }
}
