use std::collections::BTreeMap;

use crate::entity::{ConnectionId, EntityId};
use crate::error::LifecycleError;

use super::protocol::sequence_greater_than;

#[derive(Debug)]
pub struct ClientConnection {
    pub client_id: ConnectionId,
    pub entity_id: Option<EntityId>,
    pub send_sequence: u32,
    pub last_receive_sequence: Option<u32>,
    pub connected_tick: u32,
}

impl ClientConnection {
    pub fn new(client_id: ConnectionId, connected_tick: u32) -> Self {
        Self {
            client_id,
            entity_id: None,
            send_sequence: 0,
            last_receive_sequence: None,
            connected_tick,
        }
    }

    /// Records `sequence` as received. Returns `false` for duplicates and
    /// packets older than the newest one already accepted.
    pub fn accept_sequence(&mut self, sequence: u32) -> bool {
        if let Some(last) = self.last_receive_sequence {
            if !sequence_greater_than(sequence, last) {
                return false;
            }
        }
        self.last_receive_sequence = Some(sequence);
        true
    }

    pub fn next_send_sequence(&mut self) -> u32 {
        let sequence = self.send_sequence;
        self.send_sequence = self.send_sequence.wrapping_add(1);
        sequence
    }
}

/// Connection identity as handed over by the session layer. Ids are chosen
/// by the transport, never by the match.
#[derive(Debug)]
pub struct ConnectionManager {
    clients: BTreeMap<ConnectionId, ClientConnection>,
    max_clients: usize,
}

impl ConnectionManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: BTreeMap::new(),
            max_clients,
        }
    }

    pub fn connect(
        &mut self,
        client_id: ConnectionId,
        tick: u32,
    ) -> Result<&mut ClientConnection, LifecycleError> {
        if !self.clients.contains_key(&client_id) && self.clients.len() >= self.max_clients {
            return Err(LifecycleError::CapacityExceeded {
                what: "client connections",
                limit: self.max_clients,
            });
        }

        Ok(self
            .clients
            .entry(client_id)
            .or_insert_with(|| ClientConnection::new(client_id, tick)))
    }

    pub fn get(&self, client_id: ConnectionId) -> Option<&ClientConnection> {
        self.clients.get(&client_id)
    }

    pub fn get_mut(&mut self, client_id: ConnectionId) -> Option<&mut ClientConnection> {
        self.clients.get_mut(&client_id)
    }

    pub fn remove(&mut self, client_id: ConnectionId) -> Option<ClientConnection> {
        self.clients.remove(&client_id)
    }

    pub fn is_connected(&self, client_id: ConnectionId) -> bool {
        self.clients.contains_key(&client_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientConnection> {
        self.clients.values()
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        self.clients.keys().copied().collect()
    }

    pub fn connected_count(&self) -> usize {
        self.clients.len()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_is_idempotent() {
        let mut connections = ConnectionManager::new(4);

        connections.connect(1, 0).unwrap().entity_id = Some(EntityId(5));
        let again = connections.connect(1, 10).unwrap();

        assert_eq!(again.entity_id, Some(EntityId(5)));
        assert_eq!(again.connected_tick, 0);
        assert_eq!(connections.connected_count(), 1);
    }

    #[test]
    fn test_server_full() {
        let mut connections = ConnectionManager::new(1);

        connections.connect(1, 0).unwrap();
        let denied = connections.connect(2, 0);

        assert!(matches!(
            denied,
            Err(LifecycleError::CapacityExceeded { limit: 1, .. })
        ));
    }

    #[test]
    fn test_send_sequence_advances() {
        let mut connections = ConnectionManager::new(1);
        let client = connections.connect(9, 0).unwrap();

        assert_eq!(client.next_send_sequence(), 0);
        assert_eq!(client.next_send_sequence(), 1);
    }

    #[test]
    fn test_removed_clients_are_not_counted() {
        let mut connections = ConnectionManager::new(4);
        connections.connect(1, 0).unwrap();
        connections.connect(2, 0).unwrap();
        connections.remove(2);

        assert_eq!(connections.connected_count(), 1);
        assert_eq!(connections.ids(), vec![1]);
        assert!(!connections.is_connected(2));
    }

    #[test]
    fn test_replayed_sequences_are_rejected() {
        let mut connections = ConnectionManager::new(1);
        let client = connections.connect(3, 0).unwrap();

        assert!(client.accept_sequence(0));
        assert!(client.accept_sequence(2));
        assert!(!client.accept_sequence(2));
        assert!(!client.accept_sequence(1));
        assert!(client.accept_sequence(3));
    }
}
