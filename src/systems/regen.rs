//! Per-turn enemy regeneration.

use crate::components::{EnemyId, EnemyKind, Health, Identity};
use crate::roster::Roster;

/// Heal every living enemy by a percent of its spawn max hp.
///
/// Minions and the boss use separate percentages. Dead enemies are never
/// revived and nobody goes above max. Returns the ids actually healed with
/// the amount.
pub fn regen_pass(roster: &mut Roster, minion_pct: f32, boss_pct: f32) -> Vec<(EnemyId, i32)> {
    let mut healed = Vec::new();
    for (_, (ident, health)) in roster
        .world_mut()
        .query_mut::<(&Identity, &mut Health)>()
    {
        let pct = match ident.kind {
            EnemyKind::Minion => minion_pct,
            EnemyKind::Boss => boss_pct,
        };
        if !pct.is_finite() || pct <= 0.0 {
            continue;
        }
        let amount = (health.max as f32 * pct / 100.0).round() as i32;
        let gained = health.heal(amount);
        if gained > 0 {
            healed.push((ident.id, gained));
        }
    }
    healed.sort_unstable_by_key(|(id, _)| *id);
    if !healed.is_empty() {
        tracing::debug!(count = healed.len(), "enemies regenerated");
    }
    healed
}
