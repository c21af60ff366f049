//! Field geometry defaults for the formation solver.

/// Logical canvas width the field is carved from
pub const CANVAS_WIDTH: f32 = 960.0;
/// Logical canvas height the field is carved from
pub const CANVAS_HEIGHT: f32 = 540.0;
/// Share of the canvas width the field occupies
pub const FIELD_WIDTH_RATIO: f32 = 0.35;
/// Default top padding
pub const FIELD_PADDING_TOP: f32 = 40.0;
/// Default bottom padding
pub const FIELD_PADDING_BOTTOM: f32 = 120.0;
/// Inset of the first and last row lines
pub const FIELD_LINE_INSET: f32 = 14.0;
/// Default number of row lines
pub const FIELD_DEFAULT_ROWS: u32 = 5;
/// Fewest row lines the solver will lay out
pub const FIELD_MIN_ROWS: u32 = 2;

/// Required clearance between circles of different rows
pub const MIN_ROW_GAP: f32 = 6.0;
/// Minion radius when the config omits one
pub const MINION_DEFAULT_RADIUS: f32 = 30.0;
/// Boss radius when the config omits one
pub const BOSS_DEFAULT_RADIUS: f32 = 60.0;
/// Minion row when the config omits one
pub const MINION_DEFAULT_ROW: u32 = 2;
/// Boss row when the config omits one
pub const BOSS_DEFAULT_ROW: u32 = 4;
