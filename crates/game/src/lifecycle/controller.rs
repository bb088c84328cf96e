use glam::Vec3;

use crate::entity::{ConnectionId, EntityId};
use crate::error::LifecycleError;
use crate::team::Team;

use super::context::LifecycleContext;

/// Per-entity façade tying identity (owner, team, role) to the health and
/// pick-up subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLifecycleController {
    entity: EntityId,
}

impl EntityLifecycleController {
    pub fn new(entity: EntityId) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Binds identity, enables subsystems and performs the first respawn.
    /// Returns `Ok(None)` if the entity was already initialized.
    pub fn initialize(
        &self,
        ctx: &mut LifecycleContext<'_>,
        is_bot: bool,
        owner: Option<ConnectionId>,
        team: Team,
    ) -> Result<Option<Vec3>, LifecycleError> {
        let record = ctx
            .spawner
            .get_mut(self.entity)
            .ok_or(LifecycleError::StaleReference(self.entity))?;

        if record.initialized {
            return Ok(None);
        }
        if record.transform.is_none() {
            return Err(LifecycleError::configuration(format!(
                "entity {} has no transform attached",
                self.entity
            )));
        }
        if record.is_bot() != is_bot {
            return Err(LifecycleError::configuration(format!(
                "entity {} initialized with the wrong role",
                self.entity
            )));
        }
        if !team.is_playable() {
            return Err(LifecycleError::configuration(format!(
                "entity {} initialized without a team",
                self.entity
            )));
        }

        record.owner = owner;
        record.team = team;
        record.health_enabled = true;
        record.pickups_enabled = true;
        record.initialized = true;
        ctx.health.register(self.entity);

        self.respawn(ctx).map(Some)
    }

    pub fn respawn(&self, ctx: &mut LifecycleContext<'_>) -> Result<Vec3, LifecycleError> {
        if !ctx.spawner.contains(self.entity) {
            return Err(LifecycleError::StaleReference(self.entity));
        }

        let team = ctx.teams.team_of(self.entity);
        if !team.is_playable() {
            return Err(LifecycleError::configuration(format!(
                "entity {} has no team to respawn with",
                self.entity
            )));
        }

        ctx.spawner
            .respawn(self.entity, team, ctx.health, ctx.outbox)
    }
}
