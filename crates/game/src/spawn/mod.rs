mod area;
mod coordinator;
mod names;

pub use area::{SpawnArea, SpawnAreas};
pub use coordinator::{SpawnCoordinator, SpawnRequest};
pub use names::{BotNamePool, DEFAULT_BOT_NAMES, MAX_BOT_NAME_LEN};
