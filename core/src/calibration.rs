// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{error::SettingsError, traits::ReadsAnalog, types::Pin};
use log::{debug, info};

/// Reads `pin` `count` times and returns the integer mean of the samples.
/// Meant to run once at start-up while the sensor is at rest.
pub fn average_samples<A: ReadsAnalog + ?Sized>(
    source: &mut A,
    pin: Pin,
    count: usize,
) -> Result<u16, SettingsError> {
    if count == 0 {
        return Err(SettingsError::NoSamples);
    }
    let mut total: u64 = 0;
    for _ in 0..count {
        let sample = source.read_analog(pin);
        debug!("{pin}: {sample}");
        total += sample as u64;
    }
    let average = (total / count as u64) as u16;
    info!("calibrated {pin} from {count} samples: average {average}");
    Ok(average)
}
