use crate::entity::EntityId;

/// Failures raised by the authoritative match services.
///
/// Only `Configuration` is fatal. The other variants describe requests that
/// the caller rejects or drops; none of them is ever sent back to a client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("protocol violation: {0} is only valid on the authoritative server")]
    ProtocolViolation(&'static str),
    #[error("entity {0} is not registered")]
    StaleReference(EntityId),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("capacity exceeded: {what} (limit {limit})")]
    CapacityExceeded { what: &'static str, limit: usize },
}

impl LifecycleError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Whether the local process owns game truth or only mirrors it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetMode {
    Server,
    Client,
}

impl NetMode {
    pub fn is_authoritative(self) -> bool {
        matches!(self, Self::Server)
    }

    /// Logs and returns a `ProtocolViolation` when invoked off the server.
    pub fn require_authority(self, operation: &'static str) -> Result<(), LifecycleError> {
        if self.is_authoritative() {
            Ok(())
        } else {
            log::warn!("ignoring {} requested from a client context", operation);
            Err(LifecycleError::ProtocolViolation(operation))
        }
    }
}
