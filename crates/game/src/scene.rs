use std::collections::BTreeMap;

use crate::entity::ConnectionId;
use crate::spawn::SpawnRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProgress {
    Waiting { loaded: usize, expected: usize },
    StartMatch { clients: Vec<ConnectionId> },
    LateJoin(ConnectionId),
    Duplicate,
    UnknownClient,
}

/// Spawn requests issued when every connected client finished loading: one
/// per client, then bots up to the capacity target.
pub fn match_start_requests(clients: &[ConnectionId], capacity_target: usize) -> Vec<SpawnRequest> {
    let bots = capacity_target.saturating_sub(clients.len());
    clients
        .iter()
        .map(|&client| SpawnRequest::player(client))
        .chain(std::iter::repeat_n(SpawnRequest::bot(), bots))
        .collect()
}

/// Gates match start on a load acknowledgement from every connected client.
#[derive(Debug, Default)]
pub struct SceneTransitionCoordinator {
    loaded: BTreeMap<ConnectionId, bool>,
    loaded_count: usize,
    started: bool,
}

impl SceneTransitionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_connected(&mut self, client: ConnectionId) {
        self.loaded.entry(client).or_insert(false);
    }

    /// Forgets `client`. A departing straggler may be the last thing the
    /// others were waiting for, so readiness is re-checked.
    pub fn client_disconnected(&mut self, client: ConnectionId) -> LoadProgress {
        if self.loaded.remove(&client) == Some(true) {
            self.loaded_count -= 1;
        }
        self.check_ready()
    }

    pub fn notify_loaded(&mut self, client: ConnectionId) -> LoadProgress {
        match self.loaded.get_mut(&client) {
            None => LoadProgress::UnknownClient,
            Some(true) => LoadProgress::Duplicate,
            Some(flag) => {
                *flag = true;
                self.loaded_count += 1;
                if self.started {
                    LoadProgress::LateJoin(client)
                } else {
                    self.check_ready()
                }
            }
        }
    }

    pub fn is_loaded(&self, client: ConnectionId) -> bool {
        self.loaded.get(&client).copied().unwrap_or(false)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded_count
    }

    pub fn expected_count(&self) -> usize {
        self.loaded.len()
    }

    fn check_ready(&mut self) -> LoadProgress {
        let expected = self.loaded.len();
        if !self.started && expected > 0 && self.loaded_count == expected {
            self.started = true;
            return LoadProgress::StartMatch {
                clients: self.loaded.keys().copied().collect(),
            };
        }
        LoadProgress::Waiting {
            loaded: self.loaded_count,
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_waits_for_every_client() {
        let mut scene = SceneTransitionCoordinator::new();
        scene.client_connected(1);
        scene.client_connected(2);

        assert_eq!(
            scene.notify_loaded(1),
            LoadProgress::Waiting {
                loaded: 1,
                expected: 2
            }
        );
        assert_eq!(
            scene.notify_loaded(2),
            LoadProgress::StartMatch {
                clients: vec![1, 2]
            }
        );
        assert!(scene.is_started());
    }

    #[test]
    fn duplicate_acks_do_not_double_count() {
        let mut scene = SceneTransitionCoordinator::new();
        scene.client_connected(1);
        scene.client_connected(2);

        scene.notify_loaded(1);
        assert_eq!(scene.notify_loaded(1), LoadProgress::Duplicate);
        assert_eq!(scene.loaded_count(), 1);
        assert!(!scene.is_started());
    }

    #[test]
    fn start_happens_once() {
        let mut scene = SceneTransitionCoordinator::new();
        scene.client_connected(1);

        assert!(matches!(scene.notify_loaded(1), LoadProgress::StartMatch { .. }));
        scene.client_connected(2);
        assert_eq!(scene.notify_loaded(2), LoadProgress::LateJoin(2));
        assert_eq!(scene.notify_loaded(2), LoadProgress::Duplicate);
    }

    #[test]
    fn unknown_client_is_ignored() {
        let mut scene = SceneTransitionCoordinator::new();
        assert_eq!(scene.notify_loaded(5), LoadProgress::UnknownClient);
        assert_eq!(scene.loaded_count(), 0);
    }

    #[test]
    fn straggler_disconnect_unblocks_start() {
        let mut scene = SceneTransitionCoordinator::new();
        scene.client_connected(1);
        scene.client_connected(2);
        scene.notify_loaded(1);

        assert_eq!(
            scene.client_disconnected(2),
            LoadProgress::StartMatch { clients: vec![1] }
        );
    }

    #[test]
    fn loaded_client_disconnect_lowers_count() {
        let mut scene = SceneTransitionCoordinator::new();
        scene.client_connected(1);
        scene.client_connected(2);
        scene.client_connected(3);
        scene.notify_loaded(1);

        scene.client_disconnected(1);

        assert_eq!(scene.loaded_count(), 0);
        assert_eq!(scene.expected_count(), 2);
    }

    #[test]
    fn two_clients_fill_twenty_slots_with_eighteen_bots() {
        let requests = match_start_requests(&[1, 2], 20);

        assert_eq!(requests.iter().filter(|r| r.is_bot).count(), 18);
        assert_eq!(requests[0], SpawnRequest::player(1));
        assert_eq!(requests[1], SpawnRequest::player(2));
    }

    #[test]
    fn more_clients_than_capacity_spawns_no_bots() {
        let requests = match_start_requests(&[1, 2, 3], 2);
        assert!(requests.iter().all(|r| !r.is_bot));
        assert_eq!(requests.len(), 3);
    }
}
