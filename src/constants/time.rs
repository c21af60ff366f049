//! Turn counter constants.

/// Turn length when neither the options nor the config give one
pub const DEFAULT_MS_PER_TURN: f64 = 10_000.0;
/// Upper bound for a configured turn length (10 minutes)
pub const MAX_MS_PER_TURN: f64 = 600_000.0;
