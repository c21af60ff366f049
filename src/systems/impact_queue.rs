//! Per-enemy serialized damage application.
//!
//! Each enemy id owns a FIFO of pending impacts. `pump` drains every queue in
//! order, so a later hit always observes the hp left by the earlier one. An
//! id whose enemy just died is held until its death batch finalizes or the
//! enemy leaves the roster; any impacts still queued then land on a removed
//! enemy and are dropped.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::components::{EnemyId, Health};
use crate::roster::Roster;
use crate::systems::abilities::HitResult;
use crate::systems::combat::apply_damage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueuedImpact {
    pub target_id: EnemyId,
    pub damage: i32,
    pub crit: bool,
    /// Resolution the hit belongs to
    pub volley: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedImpact {
    pub target_id: EnemyId,
    pub damage: i32,
    pub crit: bool,
    pub volley: u64,
    pub prev_hp: i32,
    pub now_hp: i32,
    pub died: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImpactReport {
    pub applied: Vec<AppliedImpact>,
    /// Ids that reached 0 hp during this pump, in the order they died
    pub deaths: Vec<EnemyId>,
    /// Ids whose enemy was gone by the time its impact ran
    pub missing: Vec<EnemyId>,
}

#[derive(Debug, Default)]
pub struct ImpactQueue {
    queues: BTreeMap<EnemyId, VecDeque<QueuedImpact>>,
    held: BTreeSet<EnemyId>,
}

impl ImpactQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a landed hit. Misses and non-positive damage are logged and
    /// dropped; returns whether anything was queued.
    pub fn enqueue(&mut self, hit: &HitResult, volley: u64) -> bool {
        if !hit.landed() {
            tracing::debug!(
                enemy = hit.target_id,
                damage = hit.damage,
                missed = hit.missed,
                "impact skipped"
            );
            return false;
        }
        self.queues
            .entry(hit.target_id)
            .or_default()
            .push_back(QueuedImpact {
                target_id: hit.target_id,
                damage: hit.damage,
                crit: hit.crit,
                volley,
            });
        true
    }

    pub fn pending(&self, id: EnemyId) -> usize {
        self.queues.get(&id).map_or(0, VecDeque::len)
    }

    pub fn is_idle(&self) -> bool {
        self.queues.values().all(VecDeque::is_empty)
    }

    pub fn is_held(&self, id: EnemyId) -> bool {
        self.held.contains(&id)
    }

    /// Hold an id until its death batch settles
    pub fn hold(&mut self, id: EnemyId) {
        self.held.insert(id);
    }

    pub fn release(&mut self, id: EnemyId) {
        self.held.remove(&id);
    }

    /// Apply every runnable impact, oldest first within each id
    pub fn pump(&mut self, roster: &mut Roster) -> ImpactReport {
        let mut report = ImpactReport::default();

        for (id, queue) in self.queues.iter_mut() {
            if self.held.contains(id) && roster.contains(*id) {
                continue;
            }
            while let Some(impact) = queue.pop_front() {
                let Some(entity) = roster.entity(*id) else {
                    tracing::debug!(enemy = *id, "impact target missing, skipped");
                    report.missing.push(*id);
                    continue;
                };
                let outcome = match roster.world().get::<&mut Health>(entity) {
                    Ok(mut health) => apply_damage(&mut health, impact.damage as f64),
                    Err(err) => {
                        tracing::warn!(enemy = *id, %err, "impact target has no health");
                        report.missing.push(*id);
                        continue;
                    }
                };
                tracing::debug!(
                    enemy = *id,
                    damage = impact.damage,
                    prev_hp = outcome.prev_hp,
                    now_hp = outcome.now_hp,
                    died = outcome.died,
                    "impact applied"
                );
                report.applied.push(AppliedImpact {
                    target_id: *id,
                    damage: impact.damage,
                    crit: impact.crit,
                    volley: impact.volley,
                    prev_hp: outcome.prev_hp,
                    now_hp: outcome.now_hp,
                    died: outcome.died,
                });
                if outcome.died {
                    report.deaths.push(*id);
                    self.held.insert(*id);
                    break;
                }
            }
        }

        self.queues.retain(|_, q| !q.is_empty());
        self.held.retain(|id| roster.contains(*id));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::EnemySpawn;

    fn hit(id: EnemyId, damage: i32) -> HitResult {
        HitResult {
            target_id: id,
            damage,
            missed: false,
            crit: false,
        }
    }

    #[test]
    fn test_hits_apply_in_order() {
        let mut roster = Roster::new();
        roster.spawn(EnemySpawn::minion(1, 1, 0.5, 10));
        let mut queue = ImpactQueue::new();
        assert!(queue.enqueue(&hit(1, 4), 0));
        assert!(queue.enqueue(&hit(1, 4), 0));
        assert_eq!(queue.pending(1), 2);

        let report = queue.pump(&mut roster);
        assert_eq!(roster.hp(1), Some(2));
        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.applied[0].now_hp, 6);
        assert_eq!(report.applied[1].prev_hp, 6);
        assert!(report.deaths.is_empty());
        assert!(queue.is_idle());
    }

    #[test]
    fn test_misses_never_queue() {
        let mut queue = ImpactQueue::new();
        let miss = HitResult {
            missed: true,
            ..hit(1, 5)
        };
        assert!(!queue.enqueue(&miss, 0));
        assert!(!queue.enqueue(&hit(1, 0), 0));
        assert!(queue.is_idle());
    }

    #[test]
    fn test_death_holds_remaining_impacts() {
        let mut roster = Roster::new();
        roster.spawn(EnemySpawn::minion(1, 1, 0.5, 5));
        let mut queue = ImpactQueue::new();
        queue.enqueue(&hit(1, 6), 0);
        queue.enqueue(&hit(1, 3), 0);

        let report = queue.pump(&mut roster);
        assert_eq!(report.deaths, vec![1]);
        assert!(queue.is_held(1));
        assert_eq!(queue.pending(1), 1);

        roster.remove(1);
        queue.release(1);
        let report = queue.pump(&mut roster);
        assert_eq!(report.missing, vec![1]);
        assert!(queue.is_idle());
    }

    #[test]
    fn test_held_id_drains_once_enemy_is_gone() {
        let mut roster = Roster::new();
        roster.spawn(EnemySpawn::minion(1, 1, 0.5, 5));
        let mut queue = ImpactQueue::new();
        queue.enqueue(&hit(1, 6), 3);
        queue.enqueue(&hit(1, 3), 3);

        let report = queue.pump(&mut roster);
        assert_eq!(report.applied[0].volley, 3);
        assert!(queue.is_held(1));

        // removed without a release
        roster.remove(1);
        let report = queue.pump(&mut roster);
        assert_eq!(report.missing, vec![1]);
        assert!(!queue.is_held(1));
        assert!(queue.is_idle());
    }

    #[test]
    fn test_missing_target_does_not_block_others() {
        let mut roster = Roster::new();
        roster.spawn(EnemySpawn::minion(2, 1, 0.5, 10));
        let mut queue = ImpactQueue::new();
        queue.enqueue(&hit(1, 3), 0);
        queue.enqueue(&hit(2, 3), 0);
        let report = queue.pump(&mut roster);
        assert_eq!(report.missing, vec![1]);
        assert_eq!(roster.hp(2), Some(7));
    }
}
