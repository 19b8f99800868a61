//! Errors surfaced by the public simulation API.
//!
//! The tick pipeline itself never fails: references that went stale are
//! treated as absent there. These errors cover construction, commands and
//! lookups made by the host between `advance_time` calls.

use crate::components::UnitId;
use bevy_ecs::entity::Entity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unit {0:?} does not exist")]
    UnknownUnit(UnitId),
    #[error("unit {0:?} already exists")]
    DuplicateUnit(UnitId),
    #[error("unit {0:?} must have at least one fighter")]
    EmptyUnit(UnitId),
    /// The referenced entity has been despawned since the reference was taken.
    #[error("reference to {0:?} is no longer valid")]
    StaleReference(Entity),
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
