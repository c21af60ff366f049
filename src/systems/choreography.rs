//! Strike and dive choreography.
//!
//! Outbound player strikes are planned up front as absolute timer instants.
//! Retaliation dives are hecs components advanced every frame through
//! down, hit and up phases.

use glam::Vec2;

use crate::components::{
    BossPattern, DiveAnimation, DivePhase, EnemyId, EnemyKind, Identity, Position,
    RetaliationContext, VisualOffset,
};
use crate::config::RulesConfig;
use crate::constants::*;
use crate::roster::Roster;
use crate::systems::abilities::HitResult;
use crate::systems::animation::{ease_in_out_quad, ease_out_back, lerp, phase_progress};
use crate::vfx::VfxManager;

// =============================================================================
// OUTBOUND STRIKES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeTiming {
    pub hit: HitResult,
    pub start_at: f64,
    pub impact_at: f64,
    pub finish_at: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrikePlan {
    pub strikes: Vec<StrikeTiming>,
    /// When retaliation selection runs; after every impact visual is done
    pub retaliation_at: f64,
}

/// Lay out the outbound strikes of one manifest, starting at `now`
pub fn plan_strike(hits: &[HitResult], strike_ms: f32, now: f64) -> StrikePlan {
    let strike_ms = if strike_ms.is_finite() && strike_ms > 0.0 {
        strike_ms
    } else {
        DEFAULT_STRIKE_MS
    };

    let strikes: Vec<StrikeTiming> = hits
        .iter()
        .enumerate()
        .map(|(index, hit)| {
            let pre = if hit.missed {
                STRIKE_PRE_MISS_MS
            } else {
                STRIKE_PRE_MS
            };
            let start_at = now + (index as f32 * STRIKE_GAP_MS) as f64;
            let impact_at = start_at + (pre + strike_ms * STRIKE_IMPACT_FRACTION).round() as f64;
            StrikeTiming {
                hit: *hit,
                start_at,
                impact_at,
                finish_at: impact_at + STRIKE_IMPACT_VISUAL_MS as f64,
            }
        })
        .collect();

    let last_finish = strikes.iter().map(|s| s.finish_at).fold(now, f64::max);
    StrikePlan {
        strikes,
        retaliation_at: last_finish + RETALIATION_BUFFER_MS as f64,
    }
}

// =============================================================================
// RETALIATION DIVES
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DiveSignal {
    /// The dive reached its impact instant; damage the player now
    DamageDue {
        enemy: EnemyId,
        wave: u64,
        context: RetaliationContext,
    },
    /// The dive returned to rest and its state is gone
    Finished { enemy: EnemyId, wave: u64 },
}

/// Begin a dive toward the HP anchor, or a short nod without one.
///
/// Returns false if the enemy is missing, dead, or already animating.
pub fn start_dive(
    roster: &mut Roster,
    enemy: EnemyId,
    now: f64,
    rules: &RulesConfig,
    hp_anchor: Option<f32>,
    context: RetaliationContext,
    wave: u64,
) -> bool {
    let Some(entity) = roster.entity(enemy) else {
        return false;
    };
    if !roster.is_alive(enemy) || roster.entity_is_animating(entity) {
        return false;
    }

    let start_y = roster.position(enemy).map(|p| p.y).unwrap_or(0.0);
    let (down_ms, up_ms, target_y) = match hp_anchor {
        Some(anchor) => (rules.out_ms, rules.back_ms, anchor),
        None => (
            DIVE_DOWN_NO_ANCHOR_MS,
            DIVE_UP_NO_ANCHOR_MS,
            start_y + rules.drop_px,
        ),
    };

    let anim = DiveAnimation {
        phase: DivePhase::Down,
        phase_started_at: now,
        down_ms,
        hit_ms: rules.hit_ms,
        up_ms,
        start_y,
        target_y,
        damage_applied: false,
        wave,
        context,
    };
    roster.world_mut().insert_one(entity, anim).is_ok()
}

/// Advance every running dive by one frame
pub fn update_dives(
    roster: &mut Roster,
    now: f64,
    hp_anchor: Option<f32>,
    vfx: &mut VfxManager,
) -> Vec<DiveSignal> {
    let mut signals = Vec::new();
    let mut finished = Vec::new();

    for (entity, (ident, anim, offset, pos)) in roster
        .world_mut()
        .query_mut::<(&Identity, &mut DiveAnimation, &mut VisualOffset, &Position)>()
    {
        let elapsed = (now - anim.phase_started_at) as f32;
        match anim.phase {
            DivePhase::Down => {
                let k = phase_progress(now, anim.phase_started_at, anim.down_ms);
                let y = lerp(anim.start_y, anim.target_y, ease_in_out_quad(k));
                offset.y = y - anim.start_y;
                if k >= 1.0 {
                    anim.phase = DivePhase::Hit;
                    anim.phase_started_at = now;
                    if hp_anchor.is_some() {
                        vfx.spawn_hp_impact(Vec2::new(pos.0.x, anim.target_y), anim.hit_ms);
                    }
                }
            }
            DivePhase::Hit => {
                let k = phase_progress(now, anim.phase_started_at, anim.hit_ms);
                offset.outline_kick = (k * std::f32::consts::PI).sin() * 2.0;
                if !anim.damage_applied && anim.hit_ms - elapsed <= DIVE_APPLY_WINDOW_MS {
                    anim.damage_applied = true;
                    signals.push(DiveSignal::DamageDue {
                        enemy: ident.id,
                        wave: anim.wave,
                        context: anim.context.clone(),
                    });
                }
                if k >= 1.0 {
                    anim.phase = DivePhase::Up;
                    anim.phase_started_at = now;
                }
            }
            DivePhase::Up => {
                let k = phase_progress(now, anim.phase_started_at, anim.up_ms);
                let rest = anim.start_y - DIVE_UP_OVERSHOOT_PX;
                let y = lerp(anim.target_y, rest, ease_out_back(k));
                offset.y = y - anim.start_y;
                if k >= 1.0 {
                    offset.y = 0.0;
                    offset.outline_kick = 0.0;
                    finished.push((entity, ident.id, anim.wave));
                }
            }
        }
    }

    for (entity, enemy, wave) in finished {
        if let Err(err) = roster.world_mut().remove_one::<DiveAnimation>(entity) {
            tracing::warn!(enemy, %err, "finished dive already detached");
        }
        signals.push(DiveSignal::Finished { enemy, wave });
    }
    signals
}

// =============================================================================
// RETALIATION DAMAGE
// =============================================================================

/// Boss damage scaling by pattern
pub fn boss_multiplier(
    pattern: BossPattern,
    row: u32,
    turns_left: u32,
    max_turns: u32,
    living_minions: usize,
) -> f32 {
    match pattern {
        BossPattern::Fading => {
            let max_turns = max_turns.max(1) as f32;
            let spent = (max_turns - (turns_left as f32).min(max_turns)) / max_turns;
            (3.0 - spent * 2.9).clamp(0.1, 3.0)
        }
        BossPattern::Positional => match row {
            4 => 4.0,
            3 => 3.0,
            2 => 2.0,
            _ => 1.0,
        },
        BossPattern::Swarm => (living_minions as f32).max(0.1),
        BossPattern::Flat => 1.0,
    }
}

/// Damage one retaliating enemy deals to the player, after defence
pub fn retaliation_damage(
    atk: i32,
    kind: EnemyKind,
    context: &RetaliationContext,
    rules: &RulesConfig,
    boss_mul: f32,
    player_def: i32,
) -> i32 {
    let mul = match kind {
        EnemyKind::Boss => rules.boss_retaliation_mul * boss_mul,
        EnemyKind::Minion => rules.retaliation_mul,
    };
    let reactive = match context.total_damage {
        Some(total) if total != 0 => (REACTIVE_BASE + total as f32 / 100.0).min(REACTIVE_CAP),
        _ => 1.0,
    };
    let raw = (atk as f32 * mul * reactive).round();
    let dmg = if raw.is_finite() { (raw as i32).max(1) } else { 1 };
    (dmg - player_def).max(0)
}
