// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{bridge::MidiBridge, link::SlaveLink};
use anyhow::anyhow;
use keybed_core::{
    encoder::{RotaryEncoder, TransposeKnob},
    settings::MasterSettings,
    traits::{Clock, MidiMessagesFn, ReadsAnalog, ReadsDigital, Transport},
    types::Millis,
    wheel::Wheel,
};
use log::info;

/// The master board. It owns the continuous controllers and one link per
/// slave, and once per tick turns all of them into MIDI.
#[derive(Debug)]
pub struct Master<T: Transport> {
    links: Vec<SlaveLink<T>>,
    pitch_wheel: Option<Wheel>,
    modulation_wheel: Option<Wheel>,
    transpose_knob: Option<TransposeKnob>,
    bridge: MidiBridge,
}
impl<T: Transport> Master<T> {
    /// Builds the master, calibrating its wheels against `board` while they
    /// rest. `transports` must hold one bus per configured slave, in order.
    pub fn new_with<A: ReadsAnalog + ?Sized>(
        settings: &MasterSettings,
        transports: Vec<T>,
        board: &mut A,
    ) -> anyhow::Result<Self> {
        settings.validate()?;
        if transports.len() != settings.slaves.len() {
            return Err(anyhow!(
                "{} slaves are configured but {} transports were given",
                settings.slaves.len(),
                transports.len()
            ));
        }
        let links = settings
            .slaves
            .iter()
            .zip(transports)
            .enumerate()
            .map(|(i, (slave, transport))| SlaveLink::new_with(i + 1, slave, transport))
            .collect::<Result<Vec<_>, _>>()?;

        let pitch_wheel = match settings.pitch_wheel.as_ref() {
            Some(wheel) => Some(Wheel::new_calibrated(wheel.to_params()?, board)?),
            None => None,
        };
        let modulation_wheel = match settings.modulation_wheel.as_ref() {
            Some(wheel) => Some(Wheel::new_calibrated(wheel.to_params()?, board)?),
            None => None,
        };
        let transpose_knob = match settings.transpose.as_ref() {
            Some(encoder) => Some(RotaryEncoder::new_with(encoder.to_params()?)),
            None => None,
        };
        let channel = settings.channel()?;
        info!(
            "master on channel {} with {} slaves",
            channel.user_channel(),
            links.len()
        );
        Ok(Self {
            links,
            pitch_wheel,
            modulation_wheel,
            transpose_knob,
            bridge: MidiBridge::new_with(channel),
        })
    }

    /// Runs one tick: updates the controllers, queries every slave in
    /// order, and emits the resulting MIDI.
    pub fn tick<B: ReadsAnalog + ReadsDigital>(
        &mut self,
        board: &mut B,
        now: Millis,
        midi_messages_fn: &mut MidiMessagesFn,
    ) -> anyhow::Result<()> {
        if let Some(wheel) = self.pitch_wheel.as_mut() {
            wheel.update(board);
        }
        if let Some(wheel) = self.modulation_wheel.as_mut() {
            wheel.update(board);
        }
        if let Some(knob) = self.transpose_knob.as_mut() {
            knob.update_from(board, now);
        }

        if let Some(wheel) = self.pitch_wheel.as_ref() {
            self.bridge.emit_pitch_bend(wheel, midi_messages_fn);
        }
        if let Some(wheel) = self.modulation_wheel.as_ref() {
            self.bridge.emit_modulation(wheel, midi_messages_fn);
        }

        let transpose = self.transpose();
        for link in self.links.iter_mut() {
            let record = link.query()?;
            self.bridge
                .emit_record(link.id(), &record, link.notes(), transpose, midi_messages_fn);
        }
        Ok(())
    }

    /// Like [Master::tick()], taking the time from the board's own counter.
    pub fn tick_on_clock<B: ReadsAnalog + ReadsDigital + Clock>(
        &mut self,
        board: &mut B,
        midi_messages_fn: &mut MidiMessagesFn,
    ) -> anyhow::Result<()> {
        let now = board.now();
        self.tick(board, now, midi_messages_fn)
    }

    /// The current transpose, in semitones.
    pub fn transpose(&self) -> i32 {
        self.transpose_knob
            .as_ref()
            .map_or(0, |knob| knob.counter())
    }

    #[allow(missing_docs)]
    pub fn transpose_knob_mut(&mut self) -> Option<&mut TransposeKnob> {
        self.transpose_knob.as_mut()
    }

    #[allow(missing_docs)]
    pub fn links(&self) -> &[SlaveLink<T>] {
        &self.links
    }

    #[allow(missing_docs)]
    pub fn pitch_wheel(&self) -> Option<&Wheel> {
        self.pitch_wheel.as_ref()
    }

    #[allow(missing_docs)]
    pub fn modulation_wheel(&self) -> Option<&Wheel> {
        self.modulation_wheel.as_ref()
    }

    #[allow(missing_docs)]
    pub fn bridge(&self) -> &MidiBridge {
        &self.bridge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{loopback_pair, LoopbackTransport};
    use keybed_core::{
        midi::{new_note_off, new_note_on, MidiChannel, MidiMessage},
        settings::{EncoderSettings, SlaveSettings, WheelSettings},
        sim::SimulatedBoard,
        types::Pin,
    };

    fn settings() -> MasterSettings {
        MasterSettings {
            midi_channel: 2,
            pitch_wheel: Some(WheelSettings {
                smoothing_factor: 1.0,
                ..WheelSettings::new_pitch_bend(3)
            }),
            modulation_wheel: None,
            transpose: Some(EncoderSettings::default()),
            slaves: vec![SlaveSettings {
                key_count: 2,
                start_note: 60,
            }],
        }
    }

    fn run_tick(
        master: &mut Master<LoopbackTransport>,
        board: &mut SimulatedBoard,
        now: u32,
    ) -> Vec<(MidiChannel, MidiMessage)> {
        let mut messages = Vec::default();
        master
            .tick(board, Millis(now), &mut |c, m| messages.push((c, m)))
            .unwrap();
        messages
    }

    #[test]
    fn slave_records_become_transposed_notes() {
        let (mut slave_end, master_end) = loopback_pair();
        let mut board = SimulatedBoard::default();
        board.set_analog(Pin(3), 2000);
        let mut master = Master::new_with(&settings(), vec![master_end], &mut board).unwrap();
        assert_eq!(master.pitch_wheel().unwrap().deadzone(), (1900, 2100));

        // Turn the knob one detent clockwise.
        board.set_digital(Pin(6), false);
        run_tick(&mut master, &mut board, 10);
        board.set_digital(Pin(6), true);
        board.set_digital(Pin(7), false);
        run_tick(&mut master, &mut board, 20);
        assert_eq!(master.transpose(), 1);

        slave_end
            .exchange(&[0, 1, 0, 70, 0x80, 0x90, 0, 0], &mut [])
            .unwrap();
        let messages = run_tick(&mut master, &mut board, 30);
        assert_eq!(messages, vec![(MidiChannel(1), new_note_on(62, 70))]);

        slave_end
            .exchange(&[0, 1, 0, 0, 0x80, 0x80, 0, 0], &mut [])
            .unwrap();
        let messages = run_tick(&mut master, &mut board, 40);
        assert_eq!(messages, vec![(MidiChannel(1), new_note_off(62, 0))]);
    }

    #[test]
    fn wheel_moves_come_before_notes() {
        let (mut slave_end, master_end) = loopback_pair();
        let mut board = SimulatedBoard::default();
        board.set_analog(Pin(3), 2000);
        let mut master = Master::new_with(&settings(), vec![master_end], &mut board).unwrap();
        assert!(run_tick(&mut master, &mut board, 1).is_empty());

        board.set_analog(Pin(3), 4095);
        slave_end
            .exchange(&[1, 0, 90, 0, 0x90, 0x80, 0, 0], &mut [])
            .unwrap();
        let messages = run_tick(&mut master, &mut board, 2);
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0].1, MidiMessage::PitchBend { .. }));
        assert_eq!(messages[1].1, new_note_on(60, 90));
    }

    #[test]
    fn transports_must_match_slaves() {
        let mut board = SimulatedBoard::default();
        let result: anyhow::Result<Master<LoopbackTransport>> =
            Master::new_with(&settings(), Vec::default(), &mut board);
        assert!(result.is_err());
    }
}
