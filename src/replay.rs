// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Plays recorded sensor traces through the whole pipeline off-target: each
//! slave board scans its keys and sends its record over a loopback bus, and
//! the master turns the records into MIDI.

use crate::{
    midi::{note_name, MidiChannel, MidiMessage},
    settings::KeyboardSettings,
    transport::{loopback_pair, KeyController, LoopbackTransport, Master, SimulatedBoard},
    types::{Millis, Pin},
};
use anyhow::anyhow;
use derivative::Derivative;
use log::info;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, path::Path};

/// A performance: keyboard settings plus one raw-sample trace per sensor.
/// Traces may differ in length; a trace that runs out holds its last value.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct Scenario {
    #[allow(missing_docs)]
    pub settings: KeyboardSettings,

    /// Milliseconds between ticks.
    #[derivative(Default(value = "1"))]
    pub tick_ms: u32,

    /// Raw ADC samples, indexed by slave, then key, then tick.
    pub key_traces: Vec<Vec<Vec<u16>>>,

    /// Damper contact levels (true is HIGH), indexed like `key_traces`. Only
    /// used for slaves that configure damper pins.
    pub damper_traces: Vec<Vec<Vec<bool>>>,

    /// Raw samples of the pitch-bend wheel.
    pub pitch_wheel_trace: Vec<u16>,

    /// Raw samples of the modulation wheel.
    pub modulation_wheel_trace: Vec<u16>,

    /// Where the wheels rest while the master calibrates.
    #[derivative(Default(value = "2048"))]
    pub wheel_rest: u16,
}
impl Scenario {
    /// Reads a scenario from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Couldn't read {path:?}: {e}"))?;
        let scenario = serde_json::from_str::<Self>(&json)
            .map_err(|e| anyhow!("Couldn't parse {path:?}: {e}"))?;
        scenario.settings.validate()?;
        Ok(scenario)
    }

    /// The number of ticks needed to play every trace to its end.
    pub fn tick_count(&self) -> usize {
        let keys = self.key_traces.iter().flatten().map(|t| t.len());
        let dampers = self.damper_traces.iter().flatten().map(|t| t.len());
        keys.chain(dampers)
            .chain([
                self.pitch_wheel_trace.len(),
                self.modulation_wheel_trace.len(),
            ])
            .max()
            .unwrap_or_default()
    }
}

fn sample_at<T: Copy>(trace: &[T], tick: usize, rest: T) -> T {
    match trace.get(tick) {
        Some(value) => *value,
        None => trace.last().copied().unwrap_or(rest),
    }
}

/// One MIDI message the master emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayEvent {
    #[allow(missing_docs)]
    pub tick: usize,
    #[allow(missing_docs)]
    pub now: Millis,
    #[allow(missing_docs)]
    pub channel: MidiChannel,
    #[allow(missing_docs)]
    pub message: MidiMessage,
}
impl Display for ReplayEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:>6} {:>8} ch {:>2}  ",
            self.tick,
            self.now.to_string(),
            self.channel.user_channel()
        )?;
        match self.message {
            MidiMessage::NoteOn { key, vel } => write!(
                f,
                "note-on  {:<4} velocity {}",
                note_name(key.as_int()),
                vel.as_int()
            ),
            MidiMessage::NoteOff { key, vel } => write!(
                f,
                "note-off {:<4} velocity {}",
                note_name(key.as_int()),
                vel.as_int()
            ),
            MidiMessage::PitchBend { bend } => write!(f, "pitch-bend {}", bend.as_int()),
            MidiMessage::Controller { controller, value } => {
                write!(f, "cc {} = {}", controller.as_int(), value.as_int())
            }
            other => write!(f, "{other:?}"),
        }
    }
}

struct SlaveRig {
    controller: KeyController<LoopbackTransport>,
    board: SimulatedBoard,
    pins: Vec<Pin>,
    damper_pins: Vec<Pin>,
}

/// Runs `scenario` tick by tick and returns every MIDI message the master
/// emitted, in order.
pub fn run_scenario(scenario: &Scenario) -> anyhow::Result<Vec<ReplayEvent>> {
    let settings = &scenario.settings;
    settings.validate()?;
    if scenario.tick_ms == 0 {
        return Err(anyhow!("tick-ms must be at least 1"));
    }

    let mut rigs = Vec::with_capacity(settings.slaves.len());
    let mut master_ends = Vec::with_capacity(settings.slaves.len());
    for slave in settings.slaves.iter() {
        let (slave_end, master_end) = loopback_pair();
        rigs.push(SlaveRig {
            controller: KeyController::new_with(slave, slave_end)?,
            board: SimulatedBoard::default(),
            pins: slave.pins.iter().map(|p| Pin(*p)).collect(),
            damper_pins: slave.damper_pins.iter().map(|p| Pin(*p)).collect(),
        });
        master_ends.push(master_end);
    }

    let pitch_pin = settings.master.pitch_wheel.as_ref().map(|w| Pin(w.pin));
    let modulation_pin = settings.master.modulation_wheel.as_ref().map(|w| Pin(w.pin));
    let mut master_board = SimulatedBoard::default();
    for pin in pitch_pin.iter().chain(modulation_pin.iter()) {
        master_board.set_analog(*pin, scenario.wheel_rest);
    }
    let mut master = Master::new_with(&settings.master, master_ends, &mut master_board)?;

    let tick_count = scenario.tick_count();
    info!("replaying {tick_count} ticks of {}ms", scenario.tick_ms);
    let mut events = Vec::default();
    for tick in 0..tick_count {
        let now = Millis(scenario.tick_ms.wrapping_mul(tick as u32));

        for (slave_index, rig) in rigs.iter_mut().enumerate() {
            let key_traces = scenario.key_traces.get(slave_index);
            for (key_index, pin) in rig.pins.iter().enumerate() {
                let trace = key_traces
                    .and_then(|t| t.get(key_index))
                    .map_or(&[][..], |t| t.as_slice());
                rig.board.set_analog(*pin, sample_at(trace, tick, 0));
            }
            let damper_traces = scenario.damper_traces.get(slave_index);
            for (key_index, pin) in rig.damper_pins.iter().enumerate() {
                let trace = damper_traces
                    .and_then(|t| t.get(key_index))
                    .map_or(&[][..], |t| t.as_slice());
                rig.board.set_digital(*pin, sample_at(trace, tick, true));
            }
            rig.board.set_now(now);
            rig.controller.run_on_clock(&mut rig.board)?;
        }

        if let Some(pin) = pitch_pin {
            let sample = sample_at(&scenario.pitch_wheel_trace, tick, scenario.wheel_rest);
            master_board.set_analog(pin, sample);
        }
        if let Some(pin) = modulation_pin {
            let sample = sample_at(&scenario.modulation_wheel_trace, tick, scenario.wheel_rest);
            master_board.set_analog(pin, sample);
        }
        master_board.set_now(now);
        master.tick_on_clock(&mut master_board, &mut |channel, message| {
            events.push(ReplayEvent {
                tick,
                now,
                channel,
                message,
            })
        })?;
    }
    Ok(events)
}
