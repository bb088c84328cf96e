mod replica;
mod service;

pub use replica::{HealthReplica, ReplicaNotification};
pub use service::{
    HealthModification, HealthModificationIntent, HealthOutcome, HealthReplicationService,
    HealthState, LifeState,
};
