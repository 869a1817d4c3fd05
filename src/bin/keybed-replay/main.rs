// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Replays sensor traces through slave scanning, the loopback bus, and the
//! master bridge, and prints the MIDI that would reach the host.

use clap::Parser;
use keybed::prelude::*;
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[clap(author, about, long_about = None)]
struct Args {
    /// Scenario files to replay, in JSON format.
    input: Vec<PathBuf>,

    /// Print the default keyboard settings as JSON and exit
    #[clap(short = 's', long, value_parser)]
    print_settings: bool,

    /// Enable debug mode
    #[clap(short = 'd', long, value_parser)]
    debug: bool,

    /// Print version and exit
    #[clap(short = 'v', long, value_parser)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if args.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if args.print_settings {
        println!(
            "{}",
            serde_json::to_string_pretty(&KeyboardSettings::default())?
        );
        return Ok(());
    }

    let mut failures = 0;
    for path in args.input.iter() {
        let events = match Scenario::load(path).and_then(|scenario| run_scenario(&scenario)) {
            Ok(events) => events,
            Err(e) => {
                error!("error while replaying {path:?}: {e:?}");
                failures += 1;
                continue;
            }
        };
        info!("{} events from {path:?}", events.len());
        println!("# {}", path.display());
        for event in events.iter() {
            println!("{event}");
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} scenario(s) failed");
    }
    Ok(())
}
