use std::collections::BTreeMap;

use crate::entity::{ConnectionId, EntityId};
use crate::health::{HealthReplica, ReplicaNotification};
use crate::net::{ClientMessage, ServerMessage};
use crate::team::Team;

#[derive(Debug, Clone)]
pub struct ReplicatedEntity {
    pub id: EntityId,
    pub name: String,
    pub is_bot: bool,
    pub owner: Option<ConnectionId>,
    pub team: Team,
    pub position: Option<[f32; 3]>,
    pub health: HealthReplica,
}

impl ReplicatedEntity {
    fn placeholder(id: EntityId) -> Self {
        Self {
            id,
            name: String::new(),
            is_bot: false,
            owner: None,
            team: Team::Undefined,
            position: None,
            health: HealthReplica::new(id),
        }
    }
}

/// What one connected client knows about the match. Built only from server
/// messages; replies are returned for the caller to send.
#[derive(Debug)]
pub struct ReplicaWorld {
    client: ConnectionId,
    entities: BTreeMap<EntityId, ReplicatedEntity>,
    own_entity: Option<EntityId>,
    scores: [u32; 2],
    game_over: bool,
    notifications: Vec<ReplicaNotification>,
}

impl ReplicaWorld {
    pub fn new(client: ConnectionId) -> Self {
        Self {
            client,
            entities: BTreeMap::new(),
            own_entity: None,
            scores: [0; 2],
            game_over: false,
            notifications: Vec::new(),
        }
    }

    pub fn client(&self) -> ConnectionId {
        self.client
    }

    pub fn scene_loaded_message(&self) -> ClientMessage {
        ClientMessage::NotifySceneLoaded {
            client: self.client,
        }
    }

    pub fn apply(&mut self, message: &ServerMessage) -> Vec<ClientMessage> {
        let mut replies = Vec::new();

        match message {
            ServerMessage::SpawnedEntity {
                entity,
                is_bot,
                owner,
                name,
            } => {
                let record = self
                    .entities
                    .entry(*entity)
                    .or_insert_with(|| ReplicatedEntity::placeholder(*entity));
                record.name = name.clone();
                record.is_bot = *is_bot;
                record.owner = *owner;

                if !is_bot && *owner == Some(self.client) && self.own_entity != Some(*entity) {
                    self.own_entity = Some(*entity);
                    replies.push(ClientMessage::AckEntity { entity: *entity });
                }
            }
            ServerMessage::TeamAssigned { entity, team } => {
                if let Some(record) = self.entities.get_mut(entity) {
                    record.team = *team;
                }
            }
            ServerMessage::UpdateHealth {
                entity,
                hp,
                max_hp,
                sequence,
            } => {
                let record = self.known_or_requested(*entity, &mut replies);
                let notifications = record.health.handle_health_update(*hp, *max_hp, *sequence);
                self.notifications.extend(notifications);
            }
            ServerMessage::Respawned { entity, position } => {
                let record = self.known_or_requested(*entity, &mut replies);
                record.position = Some(*position);
                record.health.revive();
            }
            ServerMessage::Despawned { entity } => {
                self.entities.remove(entity);
                if self.own_entity == Some(*entity) {
                    self.own_entity = None;
                }
            }
            ServerMessage::ScoreUpdate { red, blue } => {
                self.scores = [*red, *blue];
            }
            ServerMessage::GameOver => {
                self.game_over = true;
            }
        }

        replies
    }

    /// Entities first seen through a state update are unknown to this
    /// client, so their team is asked for once.
    fn known_or_requested(
        &mut self,
        entity: EntityId,
        replies: &mut Vec<ClientMessage>,
    ) -> &mut ReplicatedEntity {
        self.entities.entry(entity).or_insert_with(|| {
            replies.push(ClientMessage::RequestTeamAssignment { entity });
            ReplicatedEntity::placeholder(entity)
        })
    }

    pub fn own_entity(&self) -> Option<&ReplicatedEntity> {
        self.own_entity.and_then(|id| self.entities.get(&id))
    }

    pub fn get(&self, entity: EntityId) -> Option<&ReplicatedEntity> {
        self.entities.get(&entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = &ReplicatedEntity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn drain_notifications(&mut self) -> impl Iterator<Item = ReplicaNotification> + '_ {
        self.notifications.drain(..)
    }
}
