//! Engine constants organized by domain.
//!
//! Centralizing magic numbers makes tuning easier and documents intent.
//! Every value here is a default; `RulesConfig` and `TimerConfig` can override
//! the timing and balance ones per session.

mod animation;
mod combat;
mod formation;
mod time;

pub use animation::*;
pub use combat::*;
pub use formation::*;
pub use time::*;
