//! Turn-based skirmish combat core.
//!
//! A player fights a formation of enemies laid out on rows. Player actions
//! resolve into damage rolls, play out as timed strike and dive sequences,
//! and feed atomic death batches that recompact the formation. Everything is
//! driven by `CombatSession::tick` from an external frame loop.

pub mod components;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod roster;
pub mod systems;
pub mod time_system;
pub mod turn_counter;
pub mod vfx;

pub use components::{Element, ElementMatrix, EnemyId, Player, RetaliationRule, Weapon};
pub use config::CombatConfig;
pub use engine::CombatSession;
pub use error::CombatError;
pub use events::{EventListener, GameEvent};
pub use roster::{EnemyView, Roster};
pub use systems::{AbilityKind, HitOptions, HitOutcome};
