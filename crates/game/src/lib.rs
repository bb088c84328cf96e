pub mod entity;
pub mod error;
pub mod event;
pub mod game_over;
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod replica;
pub mod scene;
pub mod session;
pub mod settings;
pub mod spawn;
pub mod team;

pub use entity::{ConnectionId, Damageable, Entity, EntityId, EntityKind, Spawnable};
pub use error::{LifecycleError, NetMode};
pub use event::{MatchEvent, Outbox, Outgoing, Recipient};
pub use game_over::{GameOverCoordinator, MatchPhase};
pub use health::{
    HealthModification, HealthOutcome, HealthReplica, HealthReplicationService, ReplicaNotification,
};
pub use lifecycle::{EntityLifecycleController, LifecycleContext};
pub use net::{
    ClientMessage, ClientPacket, ConnectionManager, LoopbackTransport, ServerMessage, ServerPacket,
    Transport, WireError,
};
pub use replica::{ReplicaWorld, ReplicatedEntity};
pub use scene::{LoadProgress, SceneTransitionCoordinator};
pub use session::{Match, MatchStats};
pub use settings::{DEFAULT_CAPACITY_TARGET, DEFAULT_TICK_RATE, MatchSettings};
pub use spawn::{BotNamePool, SpawnArea, SpawnAreas, SpawnCoordinator, SpawnRequest};
pub use team::{Team, TeamAssignmentService};
