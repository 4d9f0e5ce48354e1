//! Construction-time failures.
//!
//! Nothing inside a tick returns an error: blocked moves, unreachable goals and
//! healthless targets all degrade in place. Only building a world (or loading the
//! configuration it is built from) can fail.

use crate::components::Faction;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid configuration `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("terrain has no walkable tile to place a {faction:?} agent")]
    NoWalkableTile { faction: Faction },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl SimError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
