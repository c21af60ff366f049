//! Combat event system for decoupled communication with the presentation layer.
//!
//! Systems push events during a tick; the session dispatches them to every
//! registered listener at the end of the tick and keeps them for polling.

use glam::Vec2;

use crate::components::{Element, EnemyId};
use crate::error::CombatError;
use crate::systems::abilities::AbilityKind;

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// An outbound strike visual started toward a target
    StrikeStarted {
        target: EnemyId,
        from: Vec2,
        to: Vec2,
        strike_ms: f32,
    },
    /// Queued player damage landed on an enemy
    ImpactApplied {
        target: EnemyId,
        damage: i32,
        crit: bool,
        now_hp: i32,
        pos: Vec2,
        element: Element,
    },
    /// A miss or zero-damage hit reached its impact instant
    ImpactSkipped {
        target: EnemyId,
        missed: bool,
        pos: Vec2,
        element: Element,
    },
    EnemyDied { enemy: EnemyId, pos: Vec2 },
    /// Every member of a death batch finished and was removed
    DeathBatchFinalized { batch: u64, removed: Vec<EnemyId> },
    FormationShifted { moved: usize, advanced: bool },
    RetaliationStarted { wave: u64, enemies: Vec<EnemyId> },
    PlayerDamaged {
        amount: i32,
        enemy: EnemyId,
        reason: String,
        hp: i32,
    },
    RetaliationComplete { wave: u64 },
    ElementShifted {
        target: EnemyId,
        from: Element,
        to: Element,
        cost: u32,
    },
    AbilityUsed {
        ability: AbilityKind,
        target: EnemyId,
        total: i32,
        cost: u32,
    },
    EnemiesRegenerated { healed: Vec<(EnemyId, i32)> },
    TurnElapsed { remaining: u32 },
    OutOfTurns,
    PlayerDefeated,
}

/// Simple event queue - events are pushed during update, processed at end of frame
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.events.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

/// Presentation hook. A failing listener is logged and skipped; it never
/// interrupts the sequence that produced the event.
pub trait EventListener {
    fn on_event(&mut self, event: &GameEvent) -> Result<(), CombatError>;
}

impl<F> EventListener for F
where
    F: FnMut(&GameEvent) -> Result<(), CombatError>,
{
    fn on_event(&mut self, event: &GameEvent) -> Result<(), CombatError> {
        self(event)
    }
}

/// Hand one event to every listener, isolating failures
pub fn dispatch(listeners: &mut [Box<dyn EventListener>], event: &GameEvent) {
    for (index, listener) in listeners.iter_mut().enumerate() {
        if let Err(err) = listener.on_event(event) {
            tracing::error!(listener = index, %err, ?event, "event listener failed");
        }
    }
}
