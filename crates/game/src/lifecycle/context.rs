use crate::entity::{Entity, EntityId};
use crate::event::Outbox;
use crate::health::HealthReplicationService;
use crate::net::ServerMessage;
use crate::spawn::SpawnCoordinator;
use crate::team::TeamAssignmentService;

/// Borrowed view over the services an entity's lifecycle touches.
pub struct LifecycleContext<'a> {
    pub spawner: &'a mut SpawnCoordinator,
    pub teams: &'a mut TeamAssignmentService,
    pub health: &'a mut HealthReplicationService,
    pub outbox: &'a mut Outbox,
}

impl<'a> LifecycleContext<'a> {
    pub fn new(
        spawner: &'a mut SpawnCoordinator,
        teams: &'a mut TeamAssignmentService,
        health: &'a mut HealthReplicationService,
        outbox: &'a mut Outbox,
    ) -> Self {
        Self {
            spawner,
            teams,
            health,
            outbox,
        }
    }

    /// Removes `entity` from every service and tells clients. Returns `None`
    /// when it was already gone.
    pub fn despawn(&mut self, entity: EntityId) -> Option<Entity> {
        let record = self.spawner.unregister_entity(entity)?;
        self.health.remove(entity);
        self.teams.release(entity);
        self.outbox.broadcast(ServerMessage::Despawned { entity });
        log::debug!("despawned {} '{}'", entity, record.name);
        Some(record)
    }
}
