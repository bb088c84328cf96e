mod capability;
mod record;

pub use capability::{Damageable, Spawnable};
pub use record::{ConnectionId, Controller, Entity, EntityId, EntityKind, Transform};
