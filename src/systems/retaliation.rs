//! Who strikes back after a player action.

use std::collections::HashSet;

use crate::components::{EnemyId, EnemyKind, RetaliationRule, Subtype};
use crate::roster::EnemyView;
use crate::systems::abilities::{AbilityKind, HitResult};

#[derive(Debug, Clone)]
pub struct RetaliationRequest<'a> {
    pub primary: EnemyId,
    pub hits: &'a [HitResult],
    pub rule: RetaliationRule,
    pub ability: AbilityKind,
    /// Replaces every rule below when set
    pub explicit: Option<&'a [EnemyId]>,
}

/// Pick the enemies that retaliate, in scheduling order, without duplicates.
///
/// Enemies that are dead or already mid-animation never appear.
pub fn select_retaliators(enemies: &[EnemyView], request: &RetaliationRequest<'_>) -> Vec<EnemyId> {
    let find = |id: EnemyId| enemies.iter().find(|e| e.id == id);

    if let Some(explicit) = request.explicit {
        let mut seen = HashSet::new();
        return explicit
            .iter()
            .filter(|id| find(**id).is_some_and(|e| e.is_alive()))
            .filter(|id| seen.insert(**id))
            .copied()
            .collect();
    }

    let Some(primary) = find(request.primary).filter(|e| e.is_alive()) else {
        return Vec::new();
    };

    let boss_direct = primary.kind == EnemyKind::Boss && request.ability.is_direct();

    let mut candidates: Vec<&EnemyView> = match request.rule {
        RetaliationRule::T1 => {
            if boss_direct {
                let minions: Vec<&EnemyView> = enemies
                    .iter()
                    .filter(|e| e.kind == EnemyKind::Minion && e.is_alive())
                    .collect();
                if minions.is_empty() {
                    vec![primary]
                } else {
                    minions
                }
            } else {
                vec![primary]
            }
        }
        RetaliationRule::T2 => {
            let neighbour = enemies
                .iter()
                .filter(|e| e.id != primary.id && e.is_alive() && e.row == primary.row)
                .min_by(|a, b| {
                    a.pos
                        .distance(primary.pos)
                        .total_cmp(&b.pos.distance(primary.pos))
                        .then(a.id.cmp(&b.id))
                });
            std::iter::once(primary).chain(neighbour).collect()
        }
        RetaliationRule::T3 => enemies
            .iter()
            .filter(|e| e.is_alive() && e.row == primary.row)
            .collect(),
    };

    // Minions actually hit outside the rule still get a chance to answer
    let joins = |e: &&EnemyView| e.is_alive() && e.kind == EnemyKind::Minion;
    for hit in request.hits.iter().filter(|h| h.landed()) {
        if let Some(e) = find(hit.target_id).filter(joins) {
            if !candidates.iter().any(|c| c.id == e.id) {
                candidates.push(e);
            }
        }
    }

    let landed_on = |id: EnemyId| request.hits.iter().any(|h| h.target_id == id && h.landed());

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|e| e.is_alive() && !e.animating)
        .filter(|e| match (e.kind, e.subtype) {
            (EnemyKind::Boss, _) => true,
            (EnemyKind::Minion, Subtype::Aggressive) => true,
            (EnemyKind::Minion, _) => e.id == primary.id && landed_on(e.id),
        })
        .filter(|e| seen.insert(e.id))
        .map(|e| e.id)
        .collect()
}
