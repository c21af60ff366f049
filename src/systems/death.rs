//! Atomic death batches.
//!
//! Enemies that die in the same resolution step form one batch. Each member
//! plays its exit animation (or waits out a dive that still owns it); only
//! when every member is done does the batch despawn them, compact the
//! formation, and start a single shared reposition shift.

use std::collections::HashSet;

use glam::Vec2;

use crate::components::{DeathAnimation, EnemyId, VisualOffset};
use crate::config::CombatConfig;
use crate::constants::*;
use crate::roster::Roster;
use crate::systems::animation::{ease_in_out_quad, phase_progress};
use crate::systems::formation::{advance_formation_if_needed, compute_layout, FormationShift};
use crate::vfx::VfxManager;

pub type BatchId = u64;

#[derive(Debug, Clone, Copy, PartialEq)]
enum MemberState {
    /// Another animation owns the enemy; try again at `next_try_at`
    Waiting { attempts: u32, next_try_at: f64 },
    Dying,
    Done,
}

#[derive(Debug, Clone)]
struct DeathBatch {
    id: BatchId,
    members: Vec<(EnemyId, MemberState)>,
}

impl DeathBatch {
    fn is_complete(&self) -> bool {
        self.members.iter().all(|(_, s)| *s == MemberState::Done)
    }
}

/// What a finalized batch did
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFinalized {
    pub batch: BatchId,
    pub removed: Vec<EnemyId>,
    pub advanced: bool,
    pub moved: usize,
}

#[derive(Debug, Default)]
pub struct DeathOrchestrator {
    batches: Vec<DeathBatch>,
    next_batch: BatchId,
    shift: Option<FormationShift>,
    shift_passes: u64,
}

impl DeathOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a batch. Duplicate ids are collapsed; ids no longer in the
    /// roster count as finished straight away.
    pub fn orchestrate(
        &mut self,
        roster: &mut Roster,
        dead: &[EnemyId],
        now: f64,
        cfg: &CombatConfig,
    ) -> BatchId {
        let id = self.next_batch;
        self.next_batch += 1;

        let mut seen = HashSet::new();
        let members = dead
            .iter()
            .copied()
            .filter(|e| seen.insert(*e))
            .map(|enemy| {
                let initial = MemberState::Waiting {
                    attempts: 0,
                    next_try_at: now,
                };
                (enemy, try_start(roster, enemy, initial, now, cfg))
            })
            .collect();

        tracing::debug!(batch = id, members = ?dead, "death batch started");
        self.batches.push(DeathBatch { id, members });
        id
    }

    /// Every batch handed out and no longer pending has finalized
    pub fn is_finalized(&self, batch: BatchId) -> bool {
        batch < self.next_batch && !self.batches.iter().any(|b| b.id == batch)
    }

    /// True while a batch is unresolved or the shared shift is running
    pub fn is_busy(&self) -> bool {
        !self.batches.is_empty() || self.shift.is_some()
    }

    pub fn shift_passes(&self) -> u64 {
        self.shift_passes
    }

    /// Drive every batch one frame forward
    pub fn update(
        &mut self,
        roster: &mut Roster,
        now: f64,
        cfg: &CombatConfig,
        vfx: &mut VfxManager,
        hp_anchor: Option<f32>,
    ) -> Vec<BatchFinalized> {
        puffin::profile_function!();

        for batch in &mut self.batches {
            for (enemy, state) in &mut batch.members {
                *state = match *state {
                    MemberState::Waiting { .. } => try_start(roster, *enemy, *state, now, cfg),
                    MemberState::Dying => tick_death(roster, *enemy, now, vfx, hp_anchor),
                    MemberState::Done => MemberState::Done,
                };
            }
        }

        let mut finished = Vec::new();
        let mut i = 0;
        while i < self.batches.len() {
            if self.batches[i].is_complete() {
                let batch = self.batches.remove(i);
                finished.push(self.finalize(roster, batch, now, cfg));
            } else {
                i += 1;
            }
        }

        if let Some(shift) = &self.shift {
            if shift.update(roster, now) {
                self.shift = None;
            }
        }

        finished
    }

    fn finalize(
        &mut self,
        roster: &mut Roster,
        batch: DeathBatch,
        now: f64,
        cfg: &CombatConfig,
    ) -> BatchFinalized {
        let removed: Vec<EnemyId> = batch
            .members
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| roster.remove(*id))
            .collect();

        let advanced = advance_formation_if_needed(roster);
        let targets = compute_layout(&cfg.field, cfg.rules.min_row_gap, roster);

        // Survivors that were mid-shift start from wherever they are now
        let shift = FormationShift::new(roster, &targets, now, cfg.rules.shift_ms);
        let moved = shift.len();
        self.shift = Some(shift);
        self.shift_passes += 1;

        tracing::info!(
            batch = batch.id,
            removed = removed.len(),
            advanced,
            "death batch finalized"
        );

        BatchFinalized {
            batch: batch.id,
            removed,
            advanced,
            moved,
        }
    }
}

fn try_start(
    roster: &mut Roster,
    enemy: EnemyId,
    state: MemberState,
    now: f64,
    cfg: &CombatConfig,
) -> MemberState {
    let MemberState::Waiting {
        attempts,
        next_try_at,
    } = state
    else {
        return state;
    };
    if now < next_try_at {
        return state;
    }
    let Some(entity) = roster.entity(enemy) else {
        tracing::debug!(enemy, "dying enemy already gone");
        return MemberState::Done;
    };

    if roster.world().get::<&DeathAnimation>(entity).is_ok() {
        return MemberState::Dying;
    }

    if roster.is_diving(enemy) {
        let attempt = attempts + 1;
        if attempt >= DEATH_MAX_RETRIES {
            tracing::warn!(enemy, attempt, "death start retries exhausted, forcing completion");
            return MemberState::Done;
        }
        tracing::debug!(enemy, attempt, "enemy still animating, death start deferred");
        return MemberState::Waiting {
            attempts: attempt,
            next_try_at: now + DEATH_RETRY_DELAY_MS as f64,
        };
    }

    let animation = DeathAnimation {
        started_at: now,
        duration_ms: cfg.rules.death_ms,
        impact_spawned: false,
    };
    if let Err(err) = roster.world_mut().insert_one(entity, animation) {
        tracing::warn!(enemy, %err, "death animation not attached, finishing member");
        return MemberState::Done;
    }
    MemberState::Dying
}

fn tick_death(
    roster: &mut Roster,
    enemy: EnemyId,
    now: f64,
    vfx: &mut VfxManager,
    hp_anchor: Option<f32>,
) -> MemberState {
    let Some(entity) = roster.entity(enemy) else {
        return MemberState::Done;
    };
    let pos = roster.position(enemy).unwrap_or(Vec2::ZERO);
    let world = roster.world();
    let Ok(mut anim) = world.get::<&mut DeathAnimation>(entity) else {
        return MemberState::Done;
    };

    let k = phase_progress(now, anim.started_at, anim.duration_ms);
    if let Ok(mut offset) = world.get::<&mut VisualOffset>(entity) {
        offset.death_scale = 1.0 - ease_in_out_quad(k);
        offset.death_alpha = 1.0 - k;
    }

    if k >= DEATH_IMPACT_PROGRESS && !anim.impact_spawned {
        anim.impact_spawned = true;
        let y = hp_anchor.unwrap_or(pos.y + DEATH_IMPACT_FALLBACK_DROP_PX);
        vfx.spawn_death_burst(Vec2::new(pos.x, y));
    }

    if k >= 1.0 {
        tracing::debug!(enemy, "death animation done");
        MemberState::Done
    } else {
        MemberState::Dying
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{DiveAnimation, DivePhase, RetaliationContext};
    use crate::roster::EnemySpawn;

    fn roster_with(ids: &[EnemyId]) -> Roster {
        let mut roster = Roster::new();
        for (i, id) in ids.iter().enumerate() {
            roster.spawn(EnemySpawn::minion(*id, 1 + i as u32 % 2, 0.2 * i as f32, 10));
        }
        roster
    }

    fn run_until_idle(
        orch: &mut DeathOrchestrator,
        roster: &mut Roster,
        cfg: &CombatConfig,
        vfx: &mut VfxManager,
        mut now: f64,
    ) -> (f64, Vec<BatchFinalized>) {
        let mut all = Vec::new();
        for _ in 0..2000 {
            now += 16.0;
            all.extend(orch.update(roster, now, cfg, vfx, None));
            if !orch.is_busy() {
                break;
            }
        }
        (now, all)
    }

    #[test]
    fn test_batch_waits_for_every_member() {
        let cfg = CombatConfig::default();
        let mut roster = roster_with(&[1, 2, 3]);
        roster.set_hp(1, 0);
        roster.set_hp(2, 0);
        let mut vfx = VfxManager::new();
        let mut orch = DeathOrchestrator::new();

        let batch = orch.orchestrate(&mut roster, &[1, 2, 1], 0.0, &cfg);
        // stagger: member 2 is still finishing a dive
        let entity = roster.entity(2).unwrap();
        roster.world_mut().remove_one::<DeathAnimation>(entity).unwrap();
        roster
            .world_mut()
            .insert_one(
                entity,
                DiveAnimation {
                    phase: DivePhase::Up,
                    phase_started_at: 0.0,
                    down_ms: 0.0,
                    hit_ms: 0.0,
                    up_ms: 0.0,
                    start_y: 0.0,
                    target_y: 0.0,
                    damage_applied: true,
                    wave: 0,
                    context: RetaliationContext::counter(0),
                },
            )
            .unwrap();
        orch.batches[0].members[1].1 = MemberState::Waiting {
            attempts: 0,
            next_try_at: 0.0,
        };

        let mut now = 0.0;
        while now < cfg.rules.death_ms as f64 + 32.0 {
            now += 16.0;
            assert!(orch.update(&mut roster, now, &cfg, &mut vfx, None).is_empty());
        }
        // member 1 finished long ago, nothing removed yet
        assert_eq!(roster.len(), 3);

        roster.world_mut().remove_one::<DiveAnimation>(entity).unwrap();
        let (_, finished) = run_until_idle(&mut orch, &mut roster, &cfg, &mut vfx, now);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].removed, vec![1, 2]);
        assert!(orch.is_finalized(batch));
        assert_eq!(orch.shift_passes(), 1);
        assert_eq!(roster.ids(), vec![3]);
    }

    #[test]
    fn test_two_kills_one_shift() {
        let cfg = CombatConfig::default();
        let mut roster = roster_with(&[1, 2, 3, 4]);
        roster.set_hp(2, 0);
        roster.set_hp(3, 0);
        let mut vfx = VfxManager::new();
        let mut orch = DeathOrchestrator::new();

        orch.orchestrate(&mut roster, &[2, 3], 0.0, &cfg);
        assert_eq!(roster.len(), 4);
        let (_, finished) = run_until_idle(&mut orch, &mut roster, &cfg, &mut vfx, 0.0);
        assert_eq!(finished.len(), 1);
        assert_eq!(roster.len(), 2);
        assert_eq!(orch.shift_passes(), 1);
        assert!(vfx
            .effects
            .iter()
            .any(|e| matches!(e.effect_type, crate::vfx::EffectType::DeathBurst { .. })));
    }

    #[test]
    fn test_stuck_dive_forces_completion() {
        let cfg = CombatConfig::default();
        let mut roster = roster_with(&[1]);
        let entity = roster.entity(1).unwrap();
        roster
            .world_mut()
            .insert_one(
                entity,
                DiveAnimation {
                    phase: DivePhase::Hit,
                    phase_started_at: 0.0,
                    down_ms: 1.0,
                    hit_ms: 1.0e9,
                    up_ms: 1.0,
                    start_y: 0.0,
                    target_y: 0.0,
                    damage_applied: false,
                    wave: 0,
                    context: RetaliationContext::counter(0),
                },
            )
            .unwrap();
        let mut vfx = VfxManager::new();
        let mut orch = DeathOrchestrator::new();
        orch.orchestrate(&mut roster, &[1], 0.0, &cfg);

        let (now, finished) = run_until_idle(&mut orch, &mut roster, &cfg, &mut vfx, 0.0);
        assert_eq!(finished.len(), 1);
        assert!(roster.is_empty());
        assert!(now >= (DEATH_MAX_RETRIES - 1) as f64 * DEATH_RETRY_DELAY_MS as f64);
    }

    #[test]
    fn test_missing_member_finishes_immediately() {
        let cfg = CombatConfig::default();
        let mut roster = roster_with(&[1]);
        let mut vfx = VfxManager::new();
        let mut orch = DeathOrchestrator::new();
        let batch = orch.orchestrate(&mut roster, &[42], 0.0, &cfg);
        let finished = orch.update(&mut roster, 16.0, &cfg, &mut vfx, None);
        assert_eq!(finished.len(), 1);
        assert!(finished[0].removed.is_empty());
        assert!(orch.is_finalized(batch));
        assert!(!orch.is_finalized(batch + 1));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_batches_finalize_out_of_order() {
        let cfg = CombatConfig::default();
        let mut roster = roster_with(&[1, 2]);
        let entity = roster.entity(1).unwrap();
        roster
            .world_mut()
            .insert_one(
                entity,
                DiveAnimation {
                    phase: DivePhase::Hit,
                    phase_started_at: 0.0,
                    down_ms: 1.0,
                    hit_ms: 1.0e9,
                    up_ms: 1.0,
                    start_y: 0.0,
                    target_y: 0.0,
                    damage_applied: false,
                    wave: 0,
                    context: RetaliationContext::counter(0),
                },
            )
            .unwrap();
        let mut vfx = VfxManager::new();
        let mut orch = DeathOrchestrator::new();
        let blocked = orch.orchestrate(&mut roster, &[1], 0.0, &cfg);
        let quick = orch.orchestrate(&mut roster, &[42], 0.0, &cfg);

        let finished = orch.update(&mut roster, 16.0, &cfg, &mut vfx, None);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].batch, quick);
        assert!(orch.is_finalized(quick));
        assert!(!orch.is_finalized(blocked));

        run_until_idle(&mut orch, &mut roster, &cfg, &mut vfx, 16.0);
        assert!(orch.is_finalized(blocked));
    }
}
