use crate::entity::{ConnectionId, EntityId, EntityKind};
use crate::team::Team;

/// Operator-facing record of what the authoritative match did. These never
/// cross the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    ClientConnected {
        client: ConnectionId,
    },
    ClientDisconnected {
        client: ConnectionId,
        reaped: usize,
    },
    SceneLoaded {
        client: ConnectionId,
        loaded: usize,
        expected: usize,
    },
    MatchStarted {
        players: usize,
        bots: usize,
    },
    EntitySpawned {
        entity: EntityId,
        kind: EntityKind,
        owner: Option<ConnectionId>,
    },
    EntityInitialized {
        entity: EntityId,
        team: Team,
    },
    EntityDied {
        entity: EntityId,
        killer: Option<EntityId>,
    },
    EntityRespawned {
        entity: EntityId,
        position: [f32; 3],
    },
    EntityDespawned {
        entity: EntityId,
    },
    ScoreChanged {
        red: u32,
        blue: u32,
    },
    RequestDropped {
        client: ConnectionId,
        reason: String,
    },
    GameOver {
        winner: Option<Team>,
    },
}

impl MatchEvent {
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::RequestDropped { .. })
    }
}
