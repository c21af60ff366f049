//! Errors surfaced at the session boundary.
//!
//! Recoverable engine conditions (missing targets, stuck animations, failing
//! listeners) are logged and never reach the caller as errors.

use crate::components::{EnemyId, RetaliationRule};
use crate::systems::abilities::AbilityKind;

#[derive(Debug, thiserror::Error)]
pub enum CombatError {
    #[error("input is locked while an attack is resolving")]
    InputLocked,

    #[error("no enemy with id {0}")]
    UnknownEnemy(EnemyId),

    #[error("no weapon with id {0}")]
    UnknownWeapon(u32),

    #[error("{ability} is not available with retaliation rule {rule:?}")]
    AbilityLocked {
        ability: AbilityKind,
        rule: RetaliationRule,
    },

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("listener failed: {0}")]
    Hook(String),
}
