//! Combat math constants.

/// Crit multiplies the rolled damage by this
pub const CRIT_MULTIPLIER: i32 = 2;
/// Luck points per crit percent
pub const LUCK_PER_CRIT_PERCENT: f32 = 10.0;
/// Floor of the luck-bias exponent (full luck)
pub const ROLL_MIN_EXPONENT: f64 = 0.3;
/// How strongly luck pulls the exponent down from 1.0
pub const ROLL_LUCK_SLOPE: f64 = 0.7;

/// Luck points per miss-reduction step
pub const DEFAULT_MISS_LUCK_STEP: f32 = 10.0;
/// Miss percent removed per luck step
pub const DEFAULT_MISS_PER_STEP_PCT: f32 = 1.0;

/// Minion retaliation scale against the enemy's attack
pub const RETALIATION_MUL: f32 = 0.5;
/// Boss retaliation scale against the boss's attack
pub const BOSS_RETALIATION_MUL: f32 = 0.75;
/// Base of the reactive multiplier (added to totalDamage / 100)
pub const REACTIVE_BASE: f32 = 0.3;
/// Cap of the reactive multiplier
pub const REACTIVE_CAP: f32 = 1.5;
/// Attack assumed when an enemy record has none
pub const DEFAULT_ENEMY_ATK: i32 = 6;

/// Actions consumed by an element shift
pub const SHIFT_ABILITY_COST: u32 = 2;
/// Stable id given to the boss at session reset
pub const BOSS_ID: u32 = 999;

/// Turns assumed by the fading boss pattern when the timer is unset
pub const FADING_BOSS_DEFAULT_TURNS: u32 = 10;
