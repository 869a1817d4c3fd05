// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! The two ends of a split keybed. A slave board runs a [KeyController]; the
//! master runs a [Master], which holds one [SlaveLink] per slave and turns
//! what they send into MIDI through a [MidiBridge].

pub use bridge::MidiBridge;
pub use controller::KeyController;
pub use link::SlaveLink;
pub use master::Master;
pub use transport::{loopback_pair, LoopbackTransport};

mod bridge;
mod controller;
mod link;
mod master;
mod transport;

pub mod prelude {
    pub use super::{loopback_pair, KeyController, LoopbackTransport, Master, MidiBridge, SlaveLink};
}
