use std::collections::{HashMap, VecDeque};

use crate::entity::ConnectionId;

use super::protocol::{ClientMessage, ClientPacket, ServerMessage, ServerPacket, WireError};

/// Outbound half of the session layer: delivers encoded server packets to
/// one connection. Reliability and ordering are the implementor's concern.
pub trait Transport {
    fn send(&mut self, client: ConnectionId, payload: Vec<u8>) -> Result<(), WireError>;
}

#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// In-process, reliable and ordered transport. Used by the headless server
/// and by tests in place of a real session layer.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    to_clients: HashMap<ConnectionId, VecDeque<Vec<u8>>>,
    to_server: VecDeque<(ConnectionId, Vec<u8>)>,
    client_sequences: HashMap<ConnectionId, u32>,
    stats: NetworkStats,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, client: ConnectionId) {
        self.to_clients.entry(client).or_default();
        self.client_sequences.entry(client).or_insert(0);
    }

    pub fn close(&mut self, client: ConnectionId) {
        self.to_clients.remove(&client);
        self.client_sequences.remove(&client);
        self.to_server.retain(|(from, _)| *from != client);
    }

    pub fn is_open(&self, client: ConnectionId) -> bool {
        self.to_clients.contains_key(&client)
    }

    /// Encodes and queues a message from `client` to the server.
    pub fn send_to_server(
        &mut self,
        client: ConnectionId,
        message: ClientMessage,
    ) -> Result<(), WireError> {
        let sequence = self
            .client_sequences
            .get_mut(&client)
            .ok_or(WireError::UnknownClient(client))?;
        let packet = ClientPacket::new(*sequence, message);
        *sequence = sequence.wrapping_add(1);

        let bytes = packet.serialize()?;
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += bytes.len() as u64;
        self.to_server.push_back((client, bytes));
        Ok(())
    }

    pub fn poll_server(&mut self) -> Vec<(ConnectionId, Vec<u8>)> {
        self.to_server.drain(..).collect()
    }

    pub fn receive(&mut self, client: ConnectionId) -> Result<Vec<ServerMessage>, WireError> {
        let Some(queue) = self.to_clients.get_mut(&client) else {
            return Ok(Vec::new());
        };

        let mut messages = Vec::with_capacity(queue.len());
        for bytes in queue.drain(..) {
            self.stats.packets_received += 1;
            self.stats.bytes_received += bytes.len() as u64;
            messages.push(ServerPacket::deserialize(&bytes)?.message);
        }
        Ok(messages)
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, client: ConnectionId, payload: Vec<u8>) -> Result<(), WireError> {
        let queue = self
            .to_clients
            .get_mut(&client)
            .ok_or(WireError::UnknownClient(client))?;
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += payload.len() as u64;
        queue.push_back(payload);
        Ok(())
    }
}
