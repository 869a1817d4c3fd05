// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::error::SettingsError;

/// Re-maps `value` from one range to another with integer math, truncating
/// toward zero the way Arduino's `map()` does. The input isn't clamped, so
/// values outside `in_min..=in_max` land outside the output range too.
///
/// A degenerate input range maps everything to `out_min`.
pub fn map_range(value: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    let in_span = in_max as i64 - in_min as i64;
    if in_span == 0 {
        return out_min;
    }
    let out_span = out_max as i64 - out_min as i64;
    let mapped = (value as i64 - in_min as i64) * out_span / in_span + out_min as i64;
    mapped.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// The largest sample an ADC of the given bit width produces, `2^bits - 1`.
pub fn max_adc_value(resolution_bits: u8) -> Result<u16, SettingsError> {
    if !(1..=16).contains(&resolution_bits) {
        return Err(SettingsError::AdcResolution(resolution_bits));
    }
    Ok(((1u32 << resolution_bits) - 1) as u16)
}

/// Maps a raw ADC sample onto the 0..=127 MIDI domain.
pub fn adc_to_midi(raw: u16, max_adc_value: u16) -> u8 {
    map_range(raw as i32, 0, max_adc_value as i32, 0, 127).clamp(0, 127) as u8
}
