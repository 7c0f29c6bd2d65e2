//! Unique identifiers for progress scopes.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a progress scope.
///
/// Ids are ULIDs, so scopes opened later sort after scopes opened earlier
/// when they show up in logs or recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeId(Ulid);

impl ScopeId {
    /// Generate a new ScopeId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for ScopeId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
