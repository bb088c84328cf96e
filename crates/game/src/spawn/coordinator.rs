use std::collections::HashMap;

use glam::Vec3;
use rand::rngs::StdRng;

use crate::entity::{ConnectionId, Entity, EntityId, Spawnable};
use crate::error::{LifecycleError, NetMode};
use crate::event::Outbox;
use crate::health::HealthReplicationService;
use crate::net::ServerMessage;
use crate::team::Team;

use super::area::SpawnAreas;
use super::names::BotNamePool;

/// Consumed-once request for a new entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRequest {
    pub requester: Option<ConnectionId>,
    pub is_bot: bool,
}

impl SpawnRequest {
    pub fn player(requester: ConnectionId) -> Self {
        Self {
            requester: Some(requester),
            is_bot: false,
        }
    }

    pub fn bot() -> Self {
        Self {
            requester: None,
            is_bot: true,
        }
    }
}

/// Owns the active-entity registry and every entity record in it.
#[derive(Debug)]
pub struct SpawnCoordinator {
    mode: NetMode,
    capacity_target: usize,
    connected_clients: usize,
    entities: HashMap<EntityId, Entity>,
    order: Vec<EntityId>,
    next_entity_id: u32,
    names: BotNamePool,
    areas: SpawnAreas,
    rng: StdRng,
}

impl SpawnCoordinator {
    pub fn new(
        mode: NetMode,
        capacity_target: usize,
        areas: SpawnAreas,
        names: BotNamePool,
        rng: StdRng,
    ) -> Result<Self, LifecycleError> {
        areas.validate()?;
        names.validate()?;
        Ok(Self {
            mode,
            capacity_target,
            connected_clients: 0,
            entities: HashMap::new(),
            order: Vec::new(),
            next_entity_id: 1,
            names,
            areas,
            rng,
        })
    }

    pub fn capacity_target(&self) -> usize {
        self.capacity_target
    }

    pub fn set_connected_clients(&mut self, connected: usize) {
        self.connected_clients = connected;
    }

    /// Live bots allowed next to the connected clients.
    pub fn bot_limit(&self) -> usize {
        self.capacity_target.saturating_sub(self.connected_clients)
    }

    pub fn live_bot_count(&self) -> usize {
        self.entities.values().filter(|e| e.is_bot()).count()
    }

    pub fn bot_deficit(&self) -> usize {
        self.bot_limit().saturating_sub(self.live_bot_count())
    }

    /// Newest bots beyond the current limit, newest first.
    pub fn excess_bots(&self) -> Vec<EntityId> {
        let excess = self.live_bot_count().saturating_sub(self.bot_limit());
        self.order
            .iter()
            .rev()
            .filter(|id| self.entities.get(*id).is_some_and(Entity::is_bot))
            .take(excess)
            .copied()
            .collect()
    }

    pub fn request_spawn(
        &mut self,
        request: SpawnRequest,
        outbox: &mut Outbox,
    ) -> Result<EntityId, LifecycleError> {
        self.mode.require_authority("spawn request")?;

        let entity = if request.is_bot {
            let limit = self.bot_limit();
            if self.live_bot_count() >= limit {
                return Err(LifecycleError::CapacityExceeded {
                    what: "bot slots",
                    limit,
                });
            }
            let callsign = self.names.allocate()?;
            Entity::bot(self.allocate_id(), callsign)
        } else {
            let requester = request
                .requester
                .ok_or(LifecycleError::ProtocolViolation("player spawn without a requester"))?;
            if let Some(existing) = self.player_of(requester) {
                return Ok(existing);
            }
            Entity::player(self.allocate_id(), requester)
        };

        let id = entity.id;
        outbox.broadcast(ServerMessage::SpawnedEntity {
            entity: id,
            is_bot: entity.is_bot(),
            owner: entity.owner,
            name: entity.name.clone(),
        });
        log::info!(
            "spawned {:?} {} '{}' (owner {:?})",
            entity.kind,
            id,
            entity.name,
            entity.owner
        );
        self.register(entity);

        Ok(id)
    }

    /// Adds `entity` to the registry. Re-adding a registered id is a no-op.
    pub fn register(&mut self, entity: Entity) -> bool {
        if self.entities.contains_key(&entity.id) {
            return false;
        }
        self.order.push(entity.id);
        self.entities.insert(entity.id, entity);
        true
    }

    /// Places `entity` at a random point of its team's area and gives it a
    /// fresh life.
    pub fn respawn(
        &mut self,
        entity: EntityId,
        team: Team,
        health: &mut HealthReplicationService,
        outbox: &mut Outbox,
    ) -> Result<Vec3, LifecycleError> {
        self.mode.require_authority("respawn")?;

        let area = *self.areas.get(team)?;
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or(LifecycleError::StaleReference(entity))?;

        let position = area.random_point(&mut self.rng);
        record.relocate(position)?;
        record.team = team;

        outbox.broadcast(ServerMessage::Respawned {
            entity,
            position: position.into(),
        });
        health.reset(entity, outbox);

        Ok(position)
    }

    /// Removes `entity` from the registry. Unknown ids are ignored.
    pub fn unregister_entity(&mut self, entity: EntityId) -> Option<Entity> {
        let record = self.entities.remove(&entity)?;
        self.order.retain(|&id| id != entity);
        if record.is_bot() {
            self.names.release(record.name.clone());
        }
        Some(record)
    }

    pub fn get(&self, entity: EntityId) -> Option<&Entity> {
        self.entities.get(&entity)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Registered entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    pub fn ids_reversed(&self) -> Vec<EntityId> {
        self.order.iter().rev().copied().collect()
    }

    pub fn owned_by(&self, connection: ConnectionId) -> Vec<EntityId> {
        self.entities()
            .filter(|e| e.is_owned_by(connection))
            .map(|e| e.id)
            .collect()
    }

    pub fn player_of(&self, connection: ConnectionId) -> Option<EntityId> {
        self.entities()
            .find(|e| !e.is_bot() && e.is_owned_by(connection))
            .map(|e| e.id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        EntityId(id)
    }
}
