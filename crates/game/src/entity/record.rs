use std::fmt;

use glam::{Quat, Vec3};

use crate::team::Team;

pub type ConnectionId = u32;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default)]
#[repr(u8)]
pub enum EntityKind {
    #[default]
    Player = 0,
    Bot = 1,
}

impl From<u8> for EntityKind {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Bot,
            _ => Self::Player,
        }
    }
}

impl From<bool> for EntityKind {
    fn from(is_bot: bool) -> Self {
        if is_bot { Self::Bot } else { Self::Player }
    }
}

/// Who drives the entity between ticks. Steering itself lives outside the
/// match core; this only records which side is responsible for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Controller {
    Remote(ConnectionId),
    Autopilot { callsign: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub owner: Option<ConnectionId>,
    pub name: String,
    pub team: Team,
    pub controller: Option<Controller>,
    pub transform: Option<Transform>,
    pub health_enabled: bool,
    pub pickups_enabled: bool,
    pub acknowledged: bool,
    pub initialized: bool,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            kind,
            owner: None,
            name: String::new(),
            team: Team::Undefined,
            controller: None,
            transform: Some(Transform::default()),
            health_enabled: false,
            pickups_enabled: false,
            acknowledged: false,
            initialized: false,
        }
    }

    pub fn player(id: EntityId, owner: ConnectionId) -> Self {
        Self {
            owner: Some(owner),
            name: format!("player-{}", owner),
            controller: Some(Controller::Remote(owner)),
            ..Self::new(id, EntityKind::Player)
        }
    }

    pub fn bot(id: EntityId, callsign: String) -> Self {
        Self {
            name: callsign.clone(),
            controller: Some(Controller::Autopilot { callsign }),
            ..Self::new(id, EntityKind::Bot)
        }
    }

    pub fn is_bot(&self) -> bool {
        self.kind == EntityKind::Bot
    }

    pub fn is_owned_by(&self, connection: ConnectionId) -> bool {
        self.owner == Some(connection)
    }

    pub fn position(&self) -> Option<Vec3> {
        self.transform.map(|t| t.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_is_owned_by_its_connection() {
        let entity = Entity::player(EntityId(3), 7);

        assert_eq!(entity.kind, EntityKind::Player);
        assert!(entity.is_owned_by(7));
        assert!(!entity.is_owned_by(8));
        assert_eq!(entity.controller, Some(Controller::Remote(7)));
    }

    #[test]
    fn bot_has_no_owner() {
        let entity = Entity::bot(EntityId(4), "Maverick".to_string());

        assert!(entity.is_bot());
        assert_eq!(entity.owner, None);
        assert_eq!(entity.name, "Maverick");
        assert_eq!(entity.team, Team::Undefined);
    }

    #[test]
    fn kind_from_wire_value() {
        assert_eq!(EntityKind::from(1u8), EntityKind::Bot);
        assert_eq!(EntityKind::from(0u8), EntityKind::Player);
        assert_eq!(EntityKind::from(9u8), EntityKind::Player);
        assert_eq!(EntityKind::from(true), EntityKind::Bot);
    }
}
