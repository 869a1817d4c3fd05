// Copyright (c) 2023 Mike Tsao. All rights reserved.

use anyhow::anyhow;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use keybed_core::traits::Transport;

/// One end of an in-memory bus. Whatever one end sends, the other end
/// receives on its next exchange, oldest first.
#[derive(Debug)]
pub struct LoopbackTransport {
    sender: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
}
impl Transport for LoopbackTransport {
    fn exchange(&mut self, outgoing: &[u8], incoming: &mut [u8]) -> anyhow::Result<()> {
        if !outgoing.is_empty() {
            self.sender
                .send(outgoing.to_vec())
                .map_err(|_| anyhow!("loopback peer hung up"))?;
        }
        if incoming.is_empty() {
            return Ok(());
        }
        match self.receiver.try_recv() {
            Ok(bytes) => {
                let len = bytes.len().min(incoming.len());
                incoming[..len].copy_from_slice(&bytes[..len]);
                incoming[len..].fill(0);
                Ok(())
            }
            Err(TryRecvError::Empty) => {
                incoming.fill(0);
                Ok(())
            }
            Err(TryRecvError::Disconnected) => Err(anyhow!("loopback peer hung up")),
        }
    }
}

/// Returns two connected ends of a loopback bus.
pub fn loopback_pair() -> (LoopbackTransport, LoopbackTransport) {
    let (a_sender, b_receiver) = crossbeam_channel::unbounded();
    let (b_sender, a_receiver) = crossbeam_channel::unbounded();
    (
        LoopbackTransport {
            sender: a_sender,
            receiver: a_receiver,
        },
        LoopbackTransport {
            sender: b_sender,
            receiver: b_receiver,
        },
    )
}
