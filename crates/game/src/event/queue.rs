use std::collections::VecDeque;

use crate::entity::ConnectionId;
use crate::net::ServerMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    All,
    Client(ConnectionId),
}

#[derive(Debug, Clone)]
pub struct Outgoing {
    pub sequence: u32,
    pub recipient: Recipient,
    pub message: ServerMessage,
}

/// Server messages produced during a tick, flushed to the transport in the
/// order they were queued.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: VecDeque<Outgoing>,
    next_sequence: u32,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcast(&mut self, message: ServerMessage) -> u32 {
        self.push(Recipient::All, message)
    }

    pub fn send_to(&mut self, client: ConnectionId, message: ServerMessage) -> u32 {
        self.push(Recipient::Client(client), message)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Outgoing> {
        self.pending.iter()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Outgoing> + '_ {
        self.pending.drain(..)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn push(&mut self, recipient: Recipient, message: ServerMessage) -> u32 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.pending.push_back(Outgoing {
            sequence,
            recipient,
            message,
        });
        sequence
    }
}
