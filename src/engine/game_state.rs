//! Core session state - owns the simulation data.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::components::{EnemyId, Player, RetaliationContext, RetaliationRule};
use crate::config::CombatConfig;
use crate::roster::Roster;
use crate::systems::abilities::AbilityKind;
use crate::systems::death::DeathOrchestrator;
use crate::systems::formation::{apply_layout, compute_layout};
use crate::systems::impact_queue::ImpactQueue;
use crate::systems::HitResult;
use crate::time_system::{GameClock, TimerQueue};
use crate::turn_counter::{CounterOptions, TurnCounter};

/// Delayed work, fired by the frame clock
#[derive(Debug, Clone)]
pub enum TimerEvent {
    /// Outbound strike visual begins
    StrikeStart { hit: HitResult, strike_ms: f32 },
    /// Outbound strike reaches its target; queue the damage
    StrikeImpact { hit: HitResult, volley: u64 },
    /// Every impact of a resolution is done; pick who strikes back
    Retaliate(RetaliationOrder),
    /// One selected enemy begins its dive
    DiveStart {
        enemy: EnemyId,
        wave: u64,
        context: RetaliationContext,
    },
}

#[derive(Debug, Clone)]
pub struct RetaliationOrder {
    pub primary: EnemyId,
    pub hits: Vec<HitResult>,
    pub rule: RetaliationRule,
    pub ability: AbilityKind,
    pub context: RetaliationContext,
    pub explicit: Option<Vec<EnemyId>>,
    /// Enemies tagged by the outbound strikes; untagged when this fires
    pub outbound: Vec<EnemyId>,
}

/// Impacts of one resolution still to land, and the deaths they caused so far.
///
/// The volley's deaths open a single batch once its last impact is applied.
#[derive(Debug, Clone, Default)]
pub struct Volley {
    pub impacts_left: usize,
    pub deaths: Vec<EnemyId>,
}

/// Core session state - owns all simulation data.
pub struct SessionState {
    pub config: CombatConfig,
    pub player: Player,
    pub roster: Roster,
    pub clock: GameClock,
    pub timers: TimerQueue<TimerEvent>,
    pub impacts: ImpactQueue,
    pub deaths: DeathOrchestrator,
    pub counter: TurnCounter,
    /// Retaliation waves still in flight, by wave id
    pub waves: BTreeMap<u64, BTreeSet<EnemyId>>,
    pub next_wave: u64,
    /// Strike resolutions whose impacts are still landing
    pub volleys: BTreeMap<u64, Volley>,
    pub next_volley: u64,
    pub hp_anchor: Option<f32>,
    pub player_defeated: bool,
    pub rng: StdRng,
}

impl SessionState {
    /// Build the player, roster and counter from the config and lay out the
    /// formation.
    pub fn new(config: CombatConfig, seed: u64) -> Self {
        let player = config.player.to_player();
        let mut roster = Roster::from_config(&config);
        let targets = compute_layout(&config.field, config.rules.min_row_gap, &roster);
        apply_layout(&mut roster, &targets);

        let mut counter = TurnCounter::new(CounterOptions::from_timer(&config.timer), &player);
        counter.start(&player);

        tracing::info!(
            enemies = roster.len(),
            actions = player.actions_remaining,
            ms_per_turn = counter.ms_per_turn(),
            "session state built"
        );

        Self {
            config,
            player,
            roster,
            clock: GameClock::new(),
            timers: TimerQueue::new(),
            impacts: ImpactQueue::new(),
            deaths: DeathOrchestrator::new(),
            counter,
            waves: BTreeMap::new(),
            next_wave: 0,
            volleys: BTreeMap::new(),
            next_volley: 0,
            hp_anchor: None,
            player_defeated: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn allocate_wave(&mut self) -> u64 {
        let wave = self.next_wave;
        self.next_wave += 1;
        wave
    }

    pub fn open_volley(&mut self, impacts: usize) -> u64 {
        let volley = self.next_volley;
        self.next_volley += 1;
        self.volleys.insert(
            volley,
            Volley {
                impacts_left: impacts,
                deaths: Vec::new(),
            },
        );
        volley
    }

    /// Turn budget used by the fading boss
    pub fn max_turns(&self) -> u32 {
        self.counter
            .baseline()
            .unwrap_or(self.player.max_actions)
            .max(1)
    }
}
