use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID threaded through every service boundary
///
/// One id is minted per inbound request or background job and attached to
/// tracing spans so a single operation can be followed across crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Mint a fresh correlation id (UUID v4)
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID, for persistence columns
    pub const fn to_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CorrelationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Uuid::try_parse(id).map_or_else(|_| Self(Uuid::new_v4()), Self)
    }
}
