use glam::Vec3;

use crate::error::LifecycleError;
use crate::health::HealthModification;

use super::record::{ConnectionId, Entity, EntityId};

pub trait Spawnable {
    fn entity_id(&self) -> EntityId;

    fn owner(&self) -> Option<ConnectionId>;

    /// Moves the entity to `position`. Entities without a transform cannot be
    /// placed in the world.
    fn relocate(&mut self, position: Vec3) -> Result<(), LifecycleError>;
}

impl Spawnable for Entity {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn owner(&self) -> Option<ConnectionId> {
        self.owner
    }

    fn relocate(&mut self, position: Vec3) -> Result<(), LifecycleError> {
        let transform = self.transform.as_mut().ok_or_else(|| {
            LifecycleError::configuration(format!("entity {} has no transform attached", self.id))
        })?;
        transform.position = position;
        Ok(())
    }
}

pub trait Damageable {
    fn hit_points(&self) -> u32;

    fn max_hit_points(&self) -> u32;

    fn is_dead(&self) -> bool;

    /// Applies one modification. Returns `true` only on the call that moved
    /// the target from alive to dead.
    fn apply(&mut self, kind: HealthModification, amount: u32) -> bool;
}
