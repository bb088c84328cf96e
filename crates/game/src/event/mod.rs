mod queue;
mod types;

pub use queue::{Outbox, Outgoing, Recipient};
pub use types::MatchEvent;
