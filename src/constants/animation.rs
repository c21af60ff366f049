//! Choreography timings (milliseconds) and animation shapes.

/// Dive toward the HP anchor
pub const DIVE_DOWN_MS: f32 = 240.0;
/// Dive without a known anchor (short local nod)
pub const DIVE_DOWN_NO_ANCHOR_MS: f32 = 140.0;
/// Hold at the anchor
pub const DIVE_HIT_MS: f32 = 120.0;
/// Return to the resting line
pub const DIVE_UP_MS: f32 = 260.0;
/// Return without a known anchor
pub const DIVE_UP_NO_ANCHOR_MS: f32 = 160.0;
/// Nod distance used when no anchor is known (pixels)
pub const DIVE_DROP_PX: f32 = 26.0;
/// Player damage lands once this much (or less) of the hit phase remains
pub const DIVE_APPLY_WINDOW_MS: f32 = 16.0;
/// How far above the resting line the return overshoots (pixels)
pub const DIVE_UP_OVERSHOOT_PX: f32 = 6.0;
/// Stagger between consecutive retaliation dives
pub const RETALIATION_CHAIN_GAP_MS: f32 = 120.0;

/// Death shrink/fade duration
pub const DEATH_ANIMATION_MS: f32 = 420.0;
/// Death progress at which the impact burst is spawned
pub const DEATH_IMPACT_PROGRESS: f32 = 0.15;
/// Wait between attempts when a dying enemy is still diving
pub const DEATH_RETRY_DELAY_MS: f32 = 40.0;
/// Attempts before a stuck death is force-completed
pub const DEATH_MAX_RETRIES: u32 = 50;

/// Shared repositioning shift after a death batch
pub const FORMATION_SHIFT_MS: f32 = 360.0;

/// Stagger between outbound hits of one manifest
pub const STRIKE_GAP_MS: f32 = 90.0;
/// Wind-up before the strike visual travels
pub const STRIKE_PRE_MS: f32 = 160.0;
/// Shorter wind-up for a missed hit
pub const STRIKE_PRE_MISS_MS: f32 = 80.0;
/// Strike travel time when the weapon does not specify one
pub const DEFAULT_STRIKE_MS: f32 = 480.0;
/// Fraction of the strike travel at which the hit lands
pub const STRIKE_IMPACT_FRACTION: f32 = 0.85;
/// Lifetime of the outbound impact flash
pub const STRIKE_IMPACT_VISUAL_MS: f32 = 380.0;
/// Slack between the last impact visual and the retaliation phase
pub const RETALIATION_BUFFER_MS: f32 = 120.0;

/// HP-anchor burst radii (start, end) for a dive hit
pub const HP_IMPACT_RADII: (f32, f32) = (6.0, 36.0);
/// Minimum lifetime of an HP-anchor burst
pub const HP_IMPACT_MIN_MS: f32 = 220.0;
/// HP-anchor burst radii (start, end) for a death
pub const DEATH_IMPACT_RADII: (f32, f32) = (8.0, 56.0);
/// Lifetime of the death burst
pub const DEATH_IMPACT_MS: f32 = 360.0;
/// Vertical offset of a burst when no anchor is known
pub const DEATH_IMPACT_FALLBACK_DROP_PX: f32 = 20.0;

/// Back-ease overshoot constant
pub const EASE_BACK_C1: f32 = 1.70158;
