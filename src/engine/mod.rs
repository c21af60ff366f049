//! Combat session - owns all combat state and provides a clean API to the
//! presentation layer.
//!
//! The session handles:
//! - Session state (player, roster, clock, timers, counter)
//! - Input validation for player actions
//! - Simulation advancement, one frame per `tick`
//! - Event processing and listener dispatch
//!
//! The presentation layer only handles:
//! - Calling `tick` from its frame loop
//! - Forwarding player actions to `strike`
//! - Drawing the roster views and effects the session exposes

mod game_state;
mod simulation;

pub use game_state::{RetaliationOrder, SessionState, TimerEvent};

use crate::components::{EnemyId, Player, RetaliationContext, RetaliationRule, ATTACK_TAG};
use crate::config::CombatConfig;
use crate::error::CombatError;
use crate::events::{EventListener, EventQueue, GameEvent};
use crate::roster::{EnemyView, Roster};
use crate::systems::abilities::{perform_hit, AbilityKind, HitOptions, HitOutcome, HitResult};
use crate::systems::death::BatchId;
use crate::systems::formation::{self, LayoutTarget};
use crate::turn_counter::TurnCounter;
use crate::vfx::{VfxManager, VisualEffect};

/// One skirmish: a player against a roster, driven by an external frame clock
pub struct CombatSession {
    state: SessionState,
    vfx: VfxManager,
    events: EventQueue,
    listeners: Vec<Box<dyn EventListener>>,
    /// Processed events not yet taken by `drain_events`
    log: Vec<GameEvent>,
    seed: u64,
}

impl CombatSession {
    pub fn new(config: CombatConfig, seed: u64) -> Self {
        Self {
            state: SessionState::new(config, seed),
            vfx: VfxManager::new(),
            events: EventQueue::new(),
            listeners: Vec::new(),
            log: Vec::new(),
            seed,
        }
    }

    /// New game: rebuild player, roster, layout and counter from the current
    /// config. Listeners and the HP anchor survive.
    pub fn reset(&mut self) {
        let config = self.state.config.clone();
        self.rebuild(config);
    }

    /// Swap in a new config and start over with it
    pub fn reload(&mut self, config: CombatConfig) {
        self.rebuild(config);
    }

    fn rebuild(&mut self, config: CombatConfig) {
        let anchor = self.state.hp_anchor;
        self.state.counter.destroy();
        self.state = SessionState::new(config, self.seed);
        self.state.hp_anchor = anchor;
        self.vfx.clear();
        self.events.drain().for_each(drop);
        self.log.clear();
        tracing::info!(seed = self.seed, "session reset");
    }

    // =========================================================================
    // PLAYER INPUT
    // =========================================================================

    /// True while any strike, retaliation, death batch, formation shift or
    /// scheduled step is unresolved.
    pub fn is_input_locked(&self) -> bool {
        self.state.roster.any_tagged(ATTACK_TAG)
            || !self.state.timers.is_empty()
            || !self.state.waves.is_empty()
            || !self.state.volleys.is_empty()
            || !self.state.impacts.is_idle()
            || self.state.deaths.is_busy()
    }

    /// Resolve a player action and schedule its choreography.
    ///
    /// Damage lands at each strike's impact instant, not here. The shift
    /// ability applies immediately and draws no retaliation. A dead target
    /// is `HitOutcome::Skip`, not an error.
    pub fn strike(
        &mut self,
        target: EnemyId,
        weapon_id: u32,
        ability: AbilityKind,
        opts: &HitOptions,
    ) -> Result<HitOutcome, CombatError> {
        if self.is_input_locked() {
            return Err(CombatError::InputLocked);
        }
        let weapon = self
            .state
            .config
            .weapon(weapon_id)
            .cloned()
            .ok_or(CombatError::UnknownWeapon(weapon_id))?;
        if !self.state.roster.contains(target) {
            return Err(CombatError::UnknownEnemy(target));
        }
        if !ability.allowed_by(weapon.retaliation_rule) {
            return Err(CombatError::AbilityLocked {
                ability,
                rule: weapon.retaliation_rule,
            });
        }

        // shift cost is a balance rule, not a per-call option
        let opts = HitOptions {
            shift_cost: self.state.config.rules.shift_cost,
            ..opts.clone()
        };

        let state = &mut self.state;
        let outcome = perform_hit(
            &mut state.player,
            &weapon,
            &state.config.element_matrix,
            &mut state.roster,
            target,
            ability,
            &opts,
            &mut state.rng,
        );

        match &outcome {
            HitOutcome::Strike(manifest) => {
                tracing::info!(
                    target,
                    %ability,
                    total = manifest.total,
                    hits = manifest.hits.len(),
                    "player strike"
                );
                simulation::schedule_strike(state, target, manifest, &weapon);
                self.events.push(GameEvent::AbilityUsed {
                    ability,
                    target,
                    total: manifest.total,
                    cost: manifest.cost,
                });
            }
            HitOutcome::ElementShift {
                target_id,
                from,
                to,
                cost,
            } => {
                tracing::info!(target = *target_id, ?from, ?to, "element shifted");
                self.events.push(GameEvent::ElementShifted {
                    target: *target_id,
                    from: *from,
                    to: *to,
                    cost: *cost,
                });
            }
            HitOutcome::Skip(reason) => {
                tracing::debug!(target, ?reason, "strike skipped");
            }
        }
        Ok(outcome)
    }

    /// Schedule retaliation dives outside the normal strike flow.
    ///
    /// `explicit` replaces the selection rules. Returns the wave id reported
    /// by `RetaliationStarted` and `RetaliationComplete`.
    pub fn queue_enemy_retaliation(
        &mut self,
        primary: EnemyId,
        hits: &[HitResult],
        context: RetaliationContext,
        rule: RetaliationRule,
        ability: AbilityKind,
        explicit: Option<&[EnemyId]>,
    ) -> u64 {
        simulation::queue_retaliation(
            &mut self.state,
            &mut self.events,
            primary,
            hits,
            context,
            rule,
            ability,
            explicit,
        )
    }

    pub fn is_wave_complete(&self, wave: u64) -> bool {
        wave < self.state.next_wave && !self.state.waves.contains_key(&wave)
    }

    /// Run the exit animations of `dead` as one batch; the roster shrinks
    /// once every member is done.
    pub fn orchestrate_atomic_deaths(&mut self, dead: &[EnemyId]) -> BatchId {
        for id in dead {
            self.state.impacts.hold(*id);
        }
        let now = self.state.clock.now;
        let state = &mut self.state;
        state
            .deaths
            .orchestrate(&mut state.roster, dead, now, &state.config)
    }

    pub fn is_batch_finalized(&self, batch: BatchId) -> bool {
        self.state.deaths.is_finalized(batch)
    }

    // =========================================================================
    // FORMATION
    // =========================================================================

    /// Recompute and apply every enemy position
    pub fn layout_enemies(&mut self) -> Vec<LayoutTarget> {
        let state = &mut self.state;
        let targets = formation::compute_layout(
            &state.config.field,
            state.config.rules.min_row_gap,
            &state.roster,
        );
        formation::apply_layout(&mut state.roster, &targets);
        targets
    }

    pub fn advance_formation_if_needed(&mut self) -> bool {
        formation::advance_formation_if_needed(&mut self.state.roster)
    }

    // =========================================================================
    // TURN COUNTER
    // =========================================================================

    pub fn start_turns(&mut self) {
        let state = &mut self.state;
        state.counter.start(&state.player);
    }

    pub fn stop_turns(&mut self) {
        self.state.counter.stop();
    }

    /// Stop the counter; with a value, also set the action count to it
    pub fn reset_turns(&mut self, value: Option<u32>) {
        let state = &mut self.state;
        state.counter.reset(value, &mut state.player);
    }

    // =========================================================================
    // FRAME
    // =========================================================================

    /// Advance the session by `dt_ms` of frame time
    pub fn tick(&mut self, dt_ms: f64) {
        puffin::profile_function!();

        self.state.clock.advance(dt_ms);
        simulation::fire_due_timers(&mut self.state, &mut self.events);
        simulation::pump_impacts(&mut self.state, &mut self.events);
        simulation::update_animations(&mut self.state, &mut self.vfx, &mut self.events);
        simulation::tick_counter(&mut self.state, dt_ms, &mut self.events);
        simulation::sweep_waves(&mut self.state, &mut self.events);
        self.vfx.update(dt_ms as f32);

        simulation::process_events(
            &mut self.events,
            &mut self.vfx,
            &mut self.listeners,
            &mut self.log,
        );
    }

    pub fn add_listener(&mut self, listener: impl EventListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Take every event processed since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.log)
    }

    /// Vertical position of the player's HP bar; dives aim at it
    pub fn set_hp_anchor(&mut self, y: Option<f32>) {
        self.state.hp_anchor = y.filter(|y| y.is_finite());
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn config(&self) -> &CombatConfig {
        &self.state.config
    }

    pub fn player(&self) -> &Player {
        &self.state.player
    }

    pub fn roster(&self) -> &Roster {
        &self.state.roster
    }

    /// Render snapshot of every enemy, ordered by id
    pub fn enemies(&self) -> Vec<EnemyView> {
        self.state.roster.snapshot()
    }

    pub fn vfx_effects(&self) -> &[VisualEffect] {
        &self.vfx.effects
    }

    pub fn counter(&self) -> &TurnCounter {
        &self.state.counter
    }

    pub fn now(&self) -> f64 {
        self.state.clock.now
    }

    pub fn is_player_defeated(&self) -> bool {
        self.state.player_defeated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Element;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Deterministic session: no misses, no crits, fixed player damage
    fn session(minions: &str, rule: &str) -> CombatSession {
        let json = format!(
            r#"{{
                "player": {{ "hpMax": 100, "hp": 100, "hits": 10, "luck": 0, "def": 0,
                             "attack": {{ "min": 5, "max": 5 }} }},
                "boss": {{ "hp": 50, "atk": 10, "type": 4, "row": 4, "col": 0.5 }},
                "minions": {minions},
                "weapons": [ {{ "id": 1, "retaliationRule": "{rule}", "strikeMs": 480 }} ],
                "field": {{ "rows": 4 }}
            }}"#
        );
        let config = CombatConfig::from_json_str(&json).unwrap();
        let mut session = CombatSession::new(config, 7);
        session.set_hp_anchor(Some(500.0));
        session
    }

    fn run_until_unlocked(session: &mut CombatSession) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..1000 {
            session.tick(16.0);
            events.extend(session.drain_events());
            if !session.is_input_locked() {
                break;
            }
        }
        events
    }

    fn settle(session: &mut CombatSession, frames: usize) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..frames {
            session.tick(16.0);
            events.extend(session.drain_events());
        }
        events
    }

    #[test]
    fn test_strike_resolves_then_retaliates() {
        let mut session = session(
            r#"[ { "id": 1, "type": 1, "hp": 20, "atk": 6, "row": 1, "col": 0.5 } ]"#,
            "t1",
        );
        let outcome = session
            .strike(1, 1, AbilityKind::Basic, &HitOptions::default())
            .unwrap();
        assert!(matches!(outcome, HitOutcome::Strike(_)));
        assert!(session.is_input_locked());
        assert!(matches!(
            session.strike(1, 1, AbilityKind::Basic, &HitOptions::default()),
            Err(CombatError::InputLocked)
        ));

        let events = run_until_unlocked(&mut session);
        assert!(!session.is_input_locked());
        assert_eq!(session.roster().hp(1), Some(15));
        assert_eq!(session.player().actions_remaining, 9);

        let position = |pred: fn(&GameEvent) -> bool| events.iter().position(|e| pred(e)).unwrap();
        let impact = position(|e| matches!(e, GameEvent::ImpactApplied { target: 1, damage: 5, .. }));
        let started = position(|e| matches!(e, GameEvent::RetaliationStarted { .. }));
        let damaged = position(|e| matches!(e, GameEvent::PlayerDamaged { enemy: 1, .. }));
        let complete = position(|e| matches!(e, GameEvent::RetaliationComplete { .. }));
        assert!(impact < started && started < damaged && damaged < complete);

        // 6 * 0.5 * min(1.5, 0.3 + 5/100) = 1.05 -> 1
        assert_eq!(session.player().hp, 99);
    }

    #[test]
    fn test_kill_removes_enemy_and_skips_its_retaliation() {
        let mut session = session(
            r#"[ { "id": 1, "type": 1, "hp": 5, "row": 1, "col": 0.3 },
                 { "id": 2, "type": 2, "hp": 20, "row": 1, "col": 0.7 } ]"#,
            "t1",
        );
        session
            .strike(1, 1, AbilityKind::Basic, &HitOptions::default())
            .unwrap();
        let mut events = run_until_unlocked(&mut session);
        events.extend(settle(&mut session, 60));

        assert!(!session.roster().contains(1));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::EnemyDied { enemy: 1, .. })));
        assert!(events.iter().any(
            |e| matches!(e, GameEvent::DeathBatchFinalized { removed, .. } if removed == &vec![1])
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::RetaliationStarted { enemies, .. } if enemies.is_empty())));
        assert!(!events
            .iter()
            .any(|e| matches!(e, GameEvent::PlayerDamaged { .. })));
        assert_eq!(session.player().hp, 100);
    }

    #[test]
    fn test_split_kills_share_one_death_batch() {
        let mut session = session(
            r#"[ { "id": 1, "type": 1, "hp": 1, "row": 1, "col": 0.3 },
                 { "id": 2, "type": 1, "hp": 1, "row": 1, "col": 0.7 },
                 { "id": 3, "type": 1, "hp": 20, "row": 2, "col": 0.5 } ]"#,
            "t1",
        );
        let outcome = session
            .strike(1, 1, AbilityKind::Split, &HitOptions::default())
            .unwrap();
        let HitOutcome::Strike(manifest) = outcome else {
            panic!("expected a strike");
        };
        assert_eq!(manifest.hits.len(), 2);

        let mut events = run_until_unlocked(&mut session);
        events.extend(settle(&mut session, 10));

        let died: Vec<EnemyId> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::EnemyDied { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .collect();
        assert_eq!(died, vec![1, 2]);

        let batches: Vec<&Vec<EnemyId>> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::DeathBatchFinalized { removed, .. } => Some(removed),
                _ => None,
            })
            .collect();
        assert_eq!(batches, vec![&vec![1, 2]]);
        let shifts = events
            .iter()
            .filter(|e| matches!(e, GameEvent::FormationShifted { .. }))
            .count();
        assert_eq!(shifts, 1);
        assert_eq!(session.state.deaths.shift_passes(), 1);
        assert_eq!(session.roster().len(), 2);
    }

    #[test]
    fn test_input_stays_locked_until_formation_settles() {
        let mut session = session(
            r#"[ { "id": 1, "type": 1, "hp": 5, "row": 1, "col": 0.3 },
                 { "id": 2, "type": 1, "hp": 20, "row": 2, "col": 0.7 } ]"#,
            "t1",
        );
        session
            .strike(1, 1, AbilityKind::Basic, &HitOptions::default())
            .unwrap();

        let mut complete = false;
        for _ in 0..200 {
            session.tick(16.0);
            complete = session
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::RetaliationComplete { .. }));
            if complete {
                break;
            }
        }
        assert!(complete);

        // the killed enemy drew nobody, but its batch shift is still running
        assert!(session.state.timers.is_empty() && session.state.waves.is_empty());
        assert!(session.state.deaths.is_busy());
        assert!(session.is_input_locked());
        assert!(matches!(
            session.strike(2, 1, AbilityKind::Basic, &HitOptions::default()),
            Err(CombatError::InputLocked)
        ));

        run_until_unlocked(&mut session);
        assert!(!session.is_input_locked());
        assert!(!session.state.deaths.is_busy());
        assert!(!session.roster().contains(1));
        assert!(session
            .strike(2, 1, AbilityKind::Basic, &HitOptions::default())
            .is_ok());
    }

    #[test]
    fn test_boss_direct_hit_draws_every_minion() {
        let mut session = session(
            r#"[ { "id": 1, "type": 1, "hp": 20, "atk": 4, "row": 1, "col": 0.3 },
                 { "id": 2, "type": 1, "hp": 20, "atk": 4, "row": 2, "col": 0.7 } ]"#,
            "t1",
        );
        session
            .strike(999, 1, AbilityKind::Basic, &HitOptions::default())
            .unwrap();
        let events = run_until_unlocked(&mut session);

        let mut hitters: Vec<EnemyId> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::PlayerDamaged { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .collect();
        hitters.sort_unstable();
        assert_eq!(hitters, vec![1, 2]);
        assert_eq!(session.roster().hp(999), Some(45));
    }

    #[test]
    fn test_validation_errors() {
        let mut session = session(r#"[ { "id": 1, "hp": 20, "row": 1 } ]"#, "t1");
        assert!(matches!(
            session.strike(1, 9, AbilityKind::Basic, &HitOptions::default()),
            Err(CombatError::UnknownWeapon(9))
        ));
        assert!(matches!(
            session.strike(42, 1, AbilityKind::Basic, &HitOptions::default()),
            Err(CombatError::UnknownEnemy(42))
        ));
        assert!(matches!(
            session.strike(1, 1, AbilityKind::Pierce, &HitOptions::default()),
            Err(CombatError::AbilityLocked { .. })
        ));
        assert!(!session.is_input_locked());
    }

    #[test]
    fn test_element_shift_costs_actions_without_retaliation() {
        let mut session = session(
            r#"[ { "id": 1, "element": "fire", "hp": 20, "row": 1 } ]"#,
            "t1",
        );
        let outcome = session
            .strike(1, 1, AbilityKind::Shift, &HitOptions::default())
            .unwrap();
        assert!(matches!(
            outcome,
            HitOutcome::ElementShift {
                from: Element::Fire,
                to: Element::Water,
                ..
            }
        ));
        assert!(!session.is_input_locked());
        assert_eq!(session.player().actions_remaining, 8);
        assert_eq!(session.roster().view(1).unwrap().element, Element::Water);
    }

    #[test]
    fn test_explicit_retaliation_defeats_player() {
        let mut session = session(
            r#"[ { "id": 1, "hp": 20, "atk": 400, "row": 1 } ]"#,
            "t1",
        );
        let wave = session.queue_enemy_retaliation(
            1,
            &[],
            RetaliationContext::counter(0),
            RetaliationRule::T1,
            AbilityKind::Basic,
            Some(&[1, 1][..]),
        );
        assert!(session.is_input_locked());
        let events = run_until_unlocked(&mut session);

        assert!(session.is_wave_complete(wave));
        assert_eq!(session.player().hp, 0);
        assert!(session.is_player_defeated());
        let defeats = events
            .iter()
            .filter(|e| matches!(e, GameEvent::PlayerDefeated))
            .count();
        assert_eq!(defeats, 1);
    }

    #[test]
    fn test_atomic_deaths_and_layout() {
        let mut session = session(
            r#"[ { "id": 1, "hp": 20, "row": 1, "col": 0.2 },
                 { "id": 2, "hp": 20, "row": 1, "col": 0.8 },
                 { "id": 3, "hp": 20, "row": 2, "col": 0.5 } ]"#,
            "t1",
        );
        let batch = session.orchestrate_atomic_deaths(&[1, 2]);
        assert!(!session.is_batch_finalized(batch));
        settle(&mut session, 60);

        assert!(session.is_batch_finalized(batch));
        assert_eq!(session.roster().len(), 2);
        // the emptied front row is compacted away
        assert_eq!(session.roster().view(3).unwrap().row, 1);
        assert!(!session.advance_formation_if_needed());
    }

    #[test]
    fn test_turns_regen_enemies_and_run_out() {
        let json = r#"{
            "player": { "hits": 2, "luck": 0 },
            "minions": [ { "id": 1, "hp": 100, "row": 1 } ],
            "timer": { "turnMs": 1000, "regen": { "minionPct": 10 } }
        }"#;
        let mut session = CombatSession::new(CombatConfig::from_json_str(json).unwrap(), 1);
        session.state.roster.set_hp(1, 50);

        let events = settle(&mut session, 200);
        assert_eq!(session.roster().hp(1), Some(60));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::EnemiesRegenerated { .. })));
        let zeros = events
            .iter()
            .filter(|e| matches!(e, GameEvent::OutOfTurns))
            .count();
        assert_eq!(zeros, 1);
        assert!(!session.counter().is_running());
    }

    #[test]
    fn test_listeners_see_every_event_and_reset_keeps_them() {
        let mut session = session(r#"[ { "id": 1, "hp": 20, "row": 1 } ]"#, "t1");
        let seen = Rc::new(RefCell::new(0usize));
        let counter = Rc::clone(&seen);
        session.add_listener(move |_: &GameEvent| -> Result<(), CombatError> {
            *counter.borrow_mut() += 1;
            Ok(())
        });
        session.add_listener(|_: &GameEvent| -> Result<(), CombatError> {
            Err(CombatError::Hook("broken overlay".into()))
        });

        session
            .strike(1, 1, AbilityKind::Basic, &HitOptions::default())
            .unwrap();
        let events = run_until_unlocked(&mut session);
        assert_eq!(*seen.borrow(), events.len());

        session.reset();
        assert_eq!(session.roster().hp(1), Some(20));
        assert_eq!(session.player().actions_remaining, 10);
        assert_eq!(session.now(), 0.0);
        session
            .strike(1, 1, AbilityKind::Basic, &HitOptions::default())
            .unwrap();
        session.tick(16.0);
        assert!(*seen.borrow() > events.len());
    }
}
