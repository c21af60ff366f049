//! Session simulation - timer firing, per-frame system updates, and event processing.

use glam::Vec2;

use crate::components::{
    Element, EnemyId, EnemyKind, RetaliationContext, RetaliationRule, Weapon, ATTACK_TAG,
};
use crate::constants::*;
use crate::events::{dispatch, EventListener, EventQueue, GameEvent};
use crate::systems::abilities::{AbilityKind, HitManifest, HitResult};
use crate::systems::choreography::{
    boss_multiplier, plan_strike, retaliation_damage, start_dive, update_dives, DiveSignal,
};
use crate::systems::regen::regen_pass;
use crate::systems::retaliation::{select_retaliators, RetaliationRequest};
use crate::turn_counter::CounterSignal;
use crate::vfx::VfxManager;

use super::game_state::{RetaliationOrder, SessionState, TimerEvent};

/// Where outbound strikes leave from: mid-field, level with the HP anchor
pub fn strike_origin(state: &SessionState) -> Vec2 {
    let y = state
        .hp_anchor
        .unwrap_or(CANVAS_HEIGHT - FIELD_PADDING_BOTTOM * 0.5);
    Vec2::new(CANVAS_WIDTH * 0.5, y)
}

/// Tag every struck enemy and lay the manifest out on the timer heap.
///
/// Retaliation is scheduled after the last impact visual, so selection always
/// sees the hp left by every hit of the manifest.
pub fn schedule_strike(state: &mut SessionState, primary: EnemyId, manifest: &HitManifest, weapon: &Weapon) {
    let now = state.clock.now;
    let plan = plan_strike(&manifest.hits, weapon.strike_ms, now);
    let volley = state.open_volley(plan.strikes.len());

    let mut outbound = Vec::with_capacity(plan.strikes.len());
    for timing in &plan.strikes {
        let hit = timing.hit;
        state.roster.add_tag(hit.target_id, ATTACK_TAG);
        outbound.push(hit.target_id);
        state.timers.schedule(
            timing.start_at,
            TimerEvent::StrikeStart {
                hit,
                strike_ms: weapon.strike_ms,
            },
        );
        state
            .timers
            .schedule(timing.impact_at, TimerEvent::StrikeImpact { hit, volley });
    }

    state.timers.schedule(
        plan.retaliation_at,
        TimerEvent::Retaliate(RetaliationOrder {
            primary,
            hits: manifest.hits.clone(),
            rule: weapon.retaliation_rule,
            ability: manifest.ability,
            context: RetaliationContext::counter(manifest.total),
            explicit: None,
            outbound,
        }),
    );

    tracing::debug!(
        primary,
        volley,
        hits = manifest.hits.len(),
        retaliation_at = plan.retaliation_at,
        "strike scheduled"
    );
}

/// Fire every timer due at the current clock, including timers scheduled by
/// the ones firing now.
pub fn fire_due_timers(state: &mut SessionState, events: &mut EventQueue) {
    let now = state.clock.now;
    while let Some((_, timer)) = state.timers.pop_due(now) {
        fire_timer(state, timer, events);
    }
}

fn fire_timer(state: &mut SessionState, timer: TimerEvent, events: &mut EventQueue) {
    match timer {
        TimerEvent::StrikeStart { hit, strike_ms } => {
            let Some(to) = state.roster.position(hit.target_id) else {
                tracing::debug!(enemy = hit.target_id, "strike target gone before launch");
                return;
            };
            events.push(GameEvent::StrikeStarted {
                target: hit.target_id,
                from: strike_origin(state),
                to,
                strike_ms,
            });
        }
        TimerEvent::StrikeImpact { hit, volley } => {
            if let Some(pending) = state.volleys.get_mut(&volley) {
                pending.impacts_left = pending.impacts_left.saturating_sub(1);
            }
            if !state.impacts.enqueue(&hit, volley) {
                let (pos, element) = impact_point(state, hit.target_id).unwrap_or_default();
                events.push(GameEvent::ImpactSkipped {
                    target: hit.target_id,
                    missed: hit.missed,
                    pos,
                    element,
                });
            }
        }
        TimerEvent::Retaliate(order) => {
            for id in &order.outbound {
                state.roster.remove_tag(*id, ATTACK_TAG);
            }
            queue_retaliation(
                state,
                events,
                order.primary,
                &order.hits,
                order.context,
                order.rule,
                order.ability,
                order.explicit.as_deref(),
            );
        }
        TimerEvent::DiveStart {
            enemy,
            wave,
            context,
        } => {
            let now = state.clock.now;
            let started = start_dive(
                &mut state.roster,
                enemy,
                now,
                &state.config.rules,
                state.hp_anchor,
                context,
                wave,
            );
            if !started {
                tracing::debug!(enemy, wave, "dive refused, enemy dead or busy");
                state.roster.remove_tag(enemy, ATTACK_TAG);
                finish_wave_member(state, events, wave, enemy);
            }
        }
    }
}

/// Select the retaliators for one resolution and stagger their dives.
///
/// Returns the wave id; `RetaliationComplete` is emitted for it once every
/// selected dive has finished, or straight away if nobody was selected.
#[allow(clippy::too_many_arguments)]
pub fn queue_retaliation(
    state: &mut SessionState,
    events: &mut EventQueue,
    primary: EnemyId,
    hits: &[HitResult],
    context: RetaliationContext,
    rule: RetaliationRule,
    ability: AbilityKind,
    explicit: Option<&[EnemyId]>,
) -> u64 {
    let request = RetaliationRequest {
        primary,
        hits,
        rule,
        ability,
        explicit,
    };
    let chosen = select_retaliators(&state.roster.snapshot(), &request);
    let wave = state.allocate_wave();

    tracing::info!(wave, primary, ?rule, enemies = ?chosen, "retaliation queued");
    events.push(GameEvent::RetaliationStarted {
        wave,
        enemies: chosen.clone(),
    });

    if chosen.is_empty() {
        events.push(GameEvent::RetaliationComplete { wave });
        return wave;
    }

    let now = state.clock.now;
    let gap = state.config.rules.chain_gap_ms.max(0.0) as f64;
    for (index, enemy) in chosen.iter().enumerate() {
        state.roster.add_tag(*enemy, ATTACK_TAG);
        state.timers.schedule(
            now + index as f64 * gap,
            TimerEvent::DiveStart {
                enemy: *enemy,
                wave,
                context: context.clone(),
            },
        );
    }
    state.waves.insert(wave, chosen.into_iter().collect());
    wave
}

fn finish_wave_member(state: &mut SessionState, events: &mut EventQueue, wave: u64, enemy: EnemyId) {
    let Some(pending) = state.waves.get_mut(&wave) else {
        return;
    };
    pending.remove(&enemy);
    if pending.is_empty() {
        state.waves.remove(&wave);
        tracing::debug!(wave, "retaliation wave complete");
        events.push(GameEvent::RetaliationComplete { wave });
    }
}

/// Drop wave members whose enemy left the roster mid-wave
pub fn sweep_waves(state: &mut SessionState, events: &mut EventQueue) {
    let gone: Vec<(u64, EnemyId)> = state
        .waves
        .iter()
        .flat_map(|(wave, pending)| pending.iter().map(move |id| (*wave, *id)))
        .filter(|(_, id)| !state.roster.contains(*id))
        .collect();
    for (wave, enemy) in gone {
        tracing::debug!(wave, enemy, "retaliator left the roster mid-wave");
        finish_wave_member(state, events, wave, enemy);
    }
}

/// Where an impact lands on an enemy, following its current visual offset
fn impact_point(state: &SessionState, enemy: EnemyId) -> Option<(Vec2, Element)> {
    state
        .roster
        .view(enemy)
        .map(|v| (v.pos + Vec2::new(0.0, v.y_offset), v.element))
}

/// Apply queued impacts and collect each death into its volley.
///
/// A volley whose last impact has landed hands all of its deaths to one
/// batch, however many frames its impacts were spread over.
pub fn pump_impacts(state: &mut SessionState, events: &mut EventQueue) {
    let report = state.impacts.pump(&mut state.roster);

    let mut loose = Vec::new();
    for applied in &report.applied {
        let (pos, element) = impact_point(state, applied.target_id).unwrap_or_default();
        events.push(GameEvent::ImpactApplied {
            target: applied.target_id,
            damage: applied.damage,
            crit: applied.crit,
            now_hp: applied.now_hp,
            pos,
            element,
        });
        if !applied.died {
            continue;
        }
        let pos = state.roster.position(applied.target_id).unwrap_or(Vec2::ZERO);
        events.push(GameEvent::EnemyDied {
            enemy: applied.target_id,
            pos,
        });
        match state.volleys.get_mut(&applied.volley) {
            Some(volley) => volley.deaths.push(applied.target_id),
            None => loose.push(applied.target_id),
        }
    }

    let now = state.clock.now;
    let landed: Vec<u64> = state
        .volleys
        .iter()
        .filter(|(_, v)| v.impacts_left == 0)
        .map(|(id, _)| *id)
        .collect();
    for id in landed {
        let Some(volley) = state.volleys.remove(&id) else {
            continue;
        };
        if volley.deaths.is_empty() {
            continue;
        }
        tracing::debug!(volley = id, deaths = ?volley.deaths, "volley landed");
        state
            .deaths
            .orchestrate(&mut state.roster, &volley.deaths, now, &state.config);
    }

    if !loose.is_empty() {
        state
            .deaths
            .orchestrate(&mut state.roster, &loose, now, &state.config);
    }
}

/// Advance dives and death batches by one frame
pub fn update_animations(state: &mut SessionState, vfx: &mut VfxManager, events: &mut EventQueue) {
    let now = state.clock.now;

    let signals = update_dives(&mut state.roster, now, state.hp_anchor, vfx);
    for signal in signals {
        match signal {
            DiveSignal::DamageDue {
                enemy,
                wave,
                context,
            } => damage_player(state, events, enemy, wave, &context),
            DiveSignal::Finished { enemy, wave } => {
                state.roster.remove_tag(enemy, ATTACK_TAG);
                finish_wave_member(state, events, wave, enemy);
            }
        }
    }

    let finalized = state
        .deaths
        .update(&mut state.roster, now, &state.config, vfx, state.hp_anchor);
    for batch in finalized {
        for id in &batch.removed {
            state.impacts.release(*id);
        }
        events.push(GameEvent::DeathBatchFinalized {
            batch: batch.batch,
            removed: batch.removed,
        });
        events.push(GameEvent::FormationShifted {
            moved: batch.moved,
            advanced: batch.advanced,
        });
    }
}

fn damage_player(
    state: &mut SessionState,
    events: &mut EventQueue,
    enemy: EnemyId,
    wave: u64,
    context: &RetaliationContext,
) {
    let Some(view) = state.roster.view(enemy) else {
        tracing::debug!(enemy, wave, "retaliator gone before its hit landed");
        return;
    };
    let boss_mul = match view.kind {
        EnemyKind::Boss => boss_multiplier(
            view.boss_pattern,
            view.row,
            state.player.actions_remaining,
            state.max_turns(),
            state.roster.living_minion_count(),
        ),
        EnemyKind::Minion => 1.0,
    };
    let amount = retaliation_damage(
        view.atk,
        view.kind,
        context,
        &state.config.rules,
        boss_mul,
        state.player.def,
    );
    state.player.take_damage(amount);

    tracing::info!(
        enemy,
        wave,
        damage = amount,
        hp = state.player.hp,
        reason = %context.reason,
        "player hit by retaliation"
    );
    events.push(GameEvent::PlayerDamaged {
        amount,
        enemy,
        reason: context.reason.clone(),
        hp: state.player.hp,
    });

    if !state.player.is_alive() && !state.player_defeated {
        state.player_defeated = true;
        state.counter.stop();
        tracing::warn!(enemy, "player defeated");
        events.push(GameEvent::PlayerDefeated);
    }
}

/// Advance the turn counter; each elapsed turn runs a regen pass
pub fn tick_counter(state: &mut SessionState, dt_ms: f64, events: &mut EventQueue) {
    let signals = state.counter.tick(dt_ms, &mut state.player);
    for signal in signals {
        match signal {
            CounterSignal::Tick { .. } => {}
            CounterSignal::Turn { remaining } => {
                let regen = state.config.timer.regen;
                let healed = regen_pass(&mut state.roster, regen.minion_pct, regen.boss_pct);
                if !healed.is_empty() {
                    events.push(GameEvent::EnemiesRegenerated { healed });
                }
                events.push(GameEvent::TurnElapsed { remaining });
            }
            CounterSignal::Zero(cause) => {
                tracing::info!(?cause, "out of turns");
                events.push(GameEvent::OutOfTurns);
            }
        }
    }
}

/// Process all pending events: spawn their visuals, notify listeners, and
/// keep them for polling.
pub fn process_events(
    events: &mut EventQueue,
    vfx: &mut VfxManager,
    listeners: &mut [Box<dyn EventListener>],
    log: &mut Vec<GameEvent>,
) {
    for event in events.drain() {
        vfx.handle_event(&event);
        dispatch(listeners, &event);
        log.push(event);
    }
}
