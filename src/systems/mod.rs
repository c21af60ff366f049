//! Combat systems organized by concern.
//!
//! - `combat`: damage, roll, crit, miss and element math
//! - `abilities`: player action resolution into hit manifests
//! - `retaliation`: who strikes back
//! - `choreography`: outbound strike timing and retaliation dives
//! - `impact_queue`: per-enemy serialized damage application
//! - `death`: atomic death batches
//! - `formation`: layout, recompaction and the reposition shift
//! - `regen`: per-turn enemy healing

pub mod abilities;
pub mod animation;
pub mod choreography;
pub mod combat;
pub mod death;
pub mod formation;
pub mod impact_queue;
pub mod regen;
pub mod retaliation;

// Re-export commonly used items
pub use abilities::{perform_hit, AbilityKind, HitManifest, HitOptions, HitOutcome, HitResult, SkipReason};
pub use combat::{apply_damage, compute_single_hit, crit_from_luck, miss_for_weapon, roll_by_luck};
pub use death::{BatchFinalized, BatchId, DeathOrchestrator};
pub use formation::{advance_formation_if_needed, compute_layout, LayoutTarget};
pub use impact_queue::ImpactQueue;
pub use regen::regen_pass;
pub use retaliation::{select_retaliators, RetaliationRequest};
