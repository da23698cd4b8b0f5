//! Identifier generation for stages and dispatched jobs.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Unique identity of a stage, and of the job it becomes once dispatched.
///
/// Template stages in the registry and each dispatched instance carry
/// distinct ids, so the engine's job id always identifies one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(Uuid);

impl StageId {
    /// Generates a fresh id.
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_uuid())
    }

    /// Parses an id from its string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for StageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
