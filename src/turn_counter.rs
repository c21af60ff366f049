//! Turn and time budget.
//!
//! The counter snapshots a baseline action count the first time it starts
//! and derives a fixed time budget from it. Spending actions during play does
//! not shrink the budget; only `reset` with budget recompute rebases it. The
//! remaining action count itself lives outside the counter and is reached
//! through `ActionPool`.

use crate::components::Player;
use crate::config::TimerConfig;
use crate::constants::*;

/// Externally owned remaining-actions value
pub trait ActionPool {
    fn remaining(&self) -> u32;
    fn set_remaining(&mut self, value: u32);
}

impl ActionPool for Player {
    fn remaining(&self) -> u32 {
        self.actions_remaining
    }

    fn set_remaining(&mut self, value: u32) {
        self.actions_remaining = value;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CounterOptions {
    /// Explicit turn length; falls back to the timer config, then ten seconds
    pub ms_per_turn: Option<f64>,
    pub decrement_on_turn: bool,
    /// Fixed baseline; snapshotted from the pool on first start when unset
    pub initial_count: Option<u32>,
    pub recompute_budget_on_reset: bool,
    pub auto_start: bool,
    pub config_turn_ms: Option<f64>,
    pub config_max_turn_ms: Option<f64>,
}

impl Default for CounterOptions {
    fn default() -> Self {
        Self {
            ms_per_turn: None,
            decrement_on_turn: false,
            initial_count: None,
            recompute_budget_on_reset: true,
            auto_start: false,
            config_turn_ms: None,
            config_max_turn_ms: None,
        }
    }
}

impl CounterOptions {
    pub fn from_timer(timer: &TimerConfig) -> Self {
        Self {
            decrement_on_turn: timer.decrement_on_turn,
            initial_count: timer.turns,
            config_turn_ms: timer.turn_ms,
            config_max_turn_ms: timer.max_turn_ms,
            ..Self::default()
        }
    }

    pub fn resolve_ms_per_turn(&self) -> f64 {
        if let Some(ms) = self.ms_per_turn.filter(|ms| ms.is_finite() && *ms > 0.0) {
            return ms;
        }
        if let Some(ms) = self.config_turn_ms.filter(|ms| ms.is_finite() && *ms > 0.0) {
            let cap = self
                .config_max_turn_ms
                .filter(|ms| ms.is_finite() && *ms > 0.0)
                .unwrap_or(MAX_MS_PER_TURN);
            return ms.min(cap);
        }
        DEFAULT_MS_PER_TURN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroCause {
    ActionsSpent,
    BudgetElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CounterSignal {
    Tick {
        remaining: u32,
        in_turn_ms: f64,
        total_ms: f64,
    },
    Turn {
        remaining: u32,
    },
    Zero(ZeroCause),
}

#[derive(Debug, Clone)]
pub struct TurnCounter {
    opts: CounterOptions,
    running: bool,
    destroyed: bool,
    ms_per_turn: f64,
    baseline: Option<u32>,
    budget_ms: f64,
    acc_ms: f64,
    elapsed_ms: f64,
}

impl TurnCounter {
    pub fn new(opts: CounterOptions, pool: &dyn ActionPool) -> Self {
        let ms_per_turn = opts.resolve_ms_per_turn();
        let baseline = opts.initial_count;
        let mut counter = Self {
            running: false,
            destroyed: false,
            ms_per_turn,
            budget_ms: baseline.map_or(0.0, |b| b as f64 * ms_per_turn),
            baseline,
            acc_ms: 0.0,
            elapsed_ms: 0.0,
            opts,
        };
        if counter.opts.auto_start {
            counter.start(pool);
        }
        counter
    }

    pub fn start(&mut self, pool: &dyn ActionPool) {
        if self.running || self.destroyed {
            return;
        }
        self.ms_per_turn = self.opts.resolve_ms_per_turn();
        let baseline = *self.baseline.get_or_insert_with(|| pool.remaining());
        self.budget_ms = baseline as f64 * self.ms_per_turn;
        self.acc_ms = 0.0;
        self.elapsed_ms = 0.0;
        self.running = true;
        tracing::debug!(baseline, budget_ms = self.budget_ms, "turn counter started");
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Stop and clear progress. With a value, the pool is set to it and, if
    /// enabled, the budget is rebased on it.
    pub fn reset(&mut self, value: Option<u32>, pool: &mut dyn ActionPool) {
        self.stop();
        self.acc_ms = 0.0;
        self.elapsed_ms = 0.0;
        self.ms_per_turn = self.opts.resolve_ms_per_turn();
        if let Some(value) = value {
            pool.set_remaining(value);
            if self.opts.recompute_budget_on_reset {
                self.baseline = Some(value);
                self.budget_ms = value as f64 * self.ms_per_turn;
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self, pool: &dyn ActionPool) -> u32 {
        pool.remaining()
    }

    pub fn destroy(&mut self) {
        self.stop();
        self.destroyed = true;
    }

    pub fn ms_per_turn(&self) -> f64 {
        self.ms_per_turn
    }

    pub fn budget_ms(&self) -> f64 {
        self.budget_ms
    }

    pub fn baseline(&self) -> Option<u32> {
        self.baseline
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Advance the counter. `Zero` is reported at most once per run; the
    /// counter stops right after it.
    pub fn tick(&mut self, dt_ms: f64, pool: &mut dyn ActionPool) -> Vec<CounterSignal> {
        let mut signals = Vec::new();
        if !self.running {
            return signals;
        }
        let dt = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        self.acc_ms += dt;
        self.elapsed_ms += dt;

        let remaining = pool.remaining();
        if remaining == 0 {
            return self.hit_zero(signals, ZeroCause::ActionsSpent);
        }
        if self.budget_ms > 0.0 && self.elapsed_ms >= self.budget_ms {
            return self.hit_zero(signals, ZeroCause::BudgetElapsed);
        }

        signals.push(CounterSignal::Tick {
            remaining,
            in_turn_ms: self.acc_ms,
            total_ms: self.elapsed_ms,
        });

        if self.acc_ms >= self.ms_per_turn {
            let steps = (self.acc_ms / self.ms_per_turn).floor();
            self.acc_ms -= steps * self.ms_per_turn;
            for _ in 0..steps as u64 {
                let current = pool.remaining();
                if current == 0 {
                    return self.hit_zero(signals, ZeroCause::ActionsSpent);
                }
                if self.opts.decrement_on_turn {
                    let next = current - 1;
                    pool.set_remaining(next);
                    signals.push(CounterSignal::Turn { remaining: next });
                    if next == 0 {
                        return self.hit_zero(signals, ZeroCause::ActionsSpent);
                    }
                } else {
                    signals.push(CounterSignal::Turn { remaining: current });
                }
            }
        }
        signals
    }

    fn hit_zero(&mut self, mut signals: Vec<CounterSignal>, cause: ZeroCause) -> Vec<CounterSignal> {
        tracing::info!(?cause, elapsed_ms = self.elapsed_ms, "turn counter reached zero");
        signals.push(CounterSignal::Zero(cause));
        self.stop();
        signals
    }
}
