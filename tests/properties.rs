// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Randomized traces through the note-detection state machine. Each test
//! runs many seeded traces, so a failure names the seed that reproduces it.

use keybed::{
    conditioning::Ema,
    keys::{DamperContact, Key, KeyInput, KeyParamsBuilder, KeyState, KeyStatus},
    types::{Millis, Pin},
};
use more_asserts::{assert_ge, assert_lt};
use oorandom::Rand32;

const SEEDS: u64 = 200;
const TICKS: usize = 2000;

fn random_key(rng: &mut Rand32, has_damper: bool) -> Key {
    let threshold_off = rng.rand_range(1..100) as u8;
    let threshold_on = threshold_off + rng.rand_range(0..20) as u8;
    let debounce = match rng.rand_range(0..3) {
        0 => None,
        _ => Some(Millis(rng.rand_range(1..500))),
    };
    Key::new_with(
        KeyParamsBuilder::default()
            .threshold_on(threshold_on)
            .threshold_off(threshold_off)
            .debounce(debounce)
            .damper_pin(has_damper.then_some(Pin(1)))
            .smoothing_factor(None)
            .build()
            .unwrap(),
    )
    .unwrap()
}

fn random_damper(rng: &mut Rand32, has_damper: bool) -> DamperContact {
    if !has_damper {
        DamperContact::Absent
    } else if rng.rand_range(0..2) == 0 {
        DamperContact::Lifted
    } else {
        DamperContact::Down
    }
}

#[test]
fn statuses_alternate_starting_with_note_on() {
    for seed in 0..SEEDS {
        let mut rng = Rand32::new(seed);
        let has_damper = seed % 2 == 1;
        let mut key = random_key(&mut rng, has_damper);
        let mut expected = KeyStatus::NoteOn;
        let mut now = Millis::ZERO;
        for _ in 0..TICKS {
            now = now.wrapping_add_ms(rng.rand_range(0..20));
            let input = KeyInput {
                velocity: rng.rand_range(0..128) as u8,
                damper: random_damper(&mut rng, has_damper),
                now,
            };
            if key.step(input) {
                assert_eq!(key.status(), expected, "seed {seed}");
                expected = match expected {
                    KeyStatus::NoteOn => KeyStatus::NoteOff,
                    KeyStatus::NoteOff => KeyStatus::NoteOn,
                };
            }
        }
    }
}

#[test]
fn steady_states_are_never_ready() {
    for seed in 0..SEEDS {
        let mut rng = Rand32::new(seed);
        let has_damper = seed % 2 == 0;
        let mut key = random_key(&mut rng, has_damper);
        let mut previous_ready = false;
        for tick in 0..TICKS {
            let before = key.state();
            let input = KeyInput {
                velocity: rng.rand_range(0..128) as u8,
                damper: random_damper(&mut rng, has_damper),
                now: Millis(tick as u32),
            };
            let is_ready = key.step(input);
            let after = key.state();
            match (before, after) {
                (KeyState::Idle, KeyState::Idle) | (KeyState::NoteOn, KeyState::NoteOn) => {
                    assert!(!is_ready, "seed {seed} tick {tick}")
                }
                (KeyState::NoteOff, KeyState::Idle) => assert!(!is_ready),
                _ => assert!(is_ready, "seed {seed} tick {tick}: {before} -> {after}"),
            }
            // A note-on right behind another event is always the second
            // half of a re-strike.
            if previous_ready && is_ready && key.status() == KeyStatus::NoteOn {
                assert_eq!(before, KeyState::PartialPressNoteOn, "seed {seed}");
            }
            previous_ready = is_ready;
        }
    }
}

#[test]
fn hysteresis_band_never_releases() {
    for seed in 0..SEEDS {
        let mut rng = Rand32::new(seed);
        let mut key = random_key(&mut rng, false);
        let on = key.params().threshold_on;
        let off = key.params().threshold_off;
        if on == 127 {
            continue;
        }
        assert!(key.step(KeyInput {
            velocity: on + 1,
            ..Default::default()
        }));
        for tick in 1..TICKS as u32 {
            let velocity = rng.rand_range(off as u32..on as u32 + 1) as u8;
            assert!(
                !key.step(KeyInput {
                    velocity,
                    damper: DamperContact::Absent,
                    now: Millis(tick * 7),
                }),
                "seed {seed}: velocity {velocity} in {off}..={on}"
            );
        }
        assert!(key.note_is_on());
    }
}

#[test]
fn held_peak_is_released_by_debounce_deadline() {
    for seed in 0..SEEDS {
        let mut rng = Rand32::new(seed);
        let debounce = rng.rand_range(1..2000);
        let start = rng.rand_u32();
        let mut key = Key::new_with(
            KeyParamsBuilder::default()
                .debounce(Some(Millis(debounce)))
                .smoothing_factor(None)
                .build()
                .unwrap(),
        )
        .unwrap();
        let on = key.params().threshold_on as u32;
        let mut peak = || KeyInput {
            velocity: rng.rand_range(on + 1..128) as u8,
            damper: DamperContact::Absent,
            now: Millis::ZERO,
        };

        assert!(key.step(KeyInput {
            now: Millis(start),
            ..peak()
        }));
        let released_after = (1..=debounce)
            .find(|elapsed| {
                key.step(KeyInput {
                    now: Millis(start).wrapping_add_ms(*elapsed),
                    ..peak()
                })
            })
            .expect("note was never released");
        assert_ge!(released_after, debounce, "seed {seed}");
        assert_eq!(key.status(), KeyStatus::NoteOff);
    }
}

#[test]
fn ema_is_deterministic_and_bounded() {
    for seed in 0..SEEDS {
        let mut rng = Rand32::new(seed);
        let alpha = (rng.rand_range(1..1001) as f64) / 1000.0;
        let input: Vec<u16> = (0..256).map(|_| rng.rand_range(0..4096) as u16).collect();
        let run = || {
            let mut ema = Ema::new_with(alpha).unwrap();
            input.iter().map(|x| ema.update_adc(*x)).collect::<Vec<_>>()
        };
        let a = run();
        assert_eq!(a, run(), "seed {seed}");
        for y in a {
            assert_lt!(y, 4096);
        }
    }
}
