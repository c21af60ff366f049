//! Player ability resolution.
//!
//! `perform_hit` rolls the damage for one player action and spends its cost.
//! No damage is applied here; the session queues the manifest entries and
//! applies them at their impact instants.

use std::fmt;

use rand::Rng;

use crate::components::{Element, ElementMatrix, EnemyId, Player, RetaliationRule, Weapon};
use crate::constants::*;
use crate::roster::{EnemyView, Roster};
use crate::systems::combat::{compute_single_hit, HitTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbilityKind {
    /// ab0: single target, no element
    Basic,
    /// Single target with a caller-chosen element
    Point,
    /// ab5: fire, plus the nearest living enemy
    Bounce,
    /// ab6: earth, plus the nearest living enemy in the same row
    Split,
    /// ab7: water, plus the next enemy forward in the same row
    Pierce,
    /// ab8: cycle the target's element, no damage
    Shift,
}

impl AbilityKind {
    pub fn code(self) -> &'static str {
        match self {
            AbilityKind::Basic => "ab0",
            AbilityKind::Point => "point",
            AbilityKind::Bounce => "ab5",
            AbilityKind::Split => "ab6",
            AbilityKind::Pierce => "ab7",
            AbilityKind::Shift => "ab8",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ab0" | "basic" => Some(AbilityKind::Basic),
            "point" => Some(AbilityKind::Point),
            "ab5" | "bounce" => Some(AbilityKind::Bounce),
            "ab6" | "split" => Some(AbilityKind::Split),
            "ab7" | "pierce" => Some(AbilityKind::Pierce),
            "ab8" | "shift" => Some(AbilityKind::Shift),
            _ => None,
        }
    }

    /// Fixed element of the super strikes
    pub fn super_element(self) -> Option<Element> {
        match self {
            AbilityKind::Bounce => Some(Element::Fire),
            AbilityKind::Split => Some(Element::Earth),
            AbilityKind::Pierce => Some(Element::Water),
            _ => None,
        }
    }

    /// Direct single-target strikes
    pub fn is_direct(self) -> bool {
        matches!(self, AbilityKind::Basic | AbilityKind::Point)
    }

    /// Whether a weapon with this retaliation rule unlocks the ability
    pub fn allowed_by(self, rule: RetaliationRule) -> bool {
        match self {
            AbilityKind::Basic | AbilityKind::Point | AbilityKind::Shift => true,
            AbilityKind::Split => rule == RetaliationRule::T1,
            AbilityKind::Pierce => rule == RetaliationRule::T2,
            AbilityKind::Bounce => rule == RetaliationRule::T3,
        }
    }
}

impl fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone)]
pub struct HitOptions {
    /// Element for `Point`, or the forced target element for `Shift`
    pub element: Option<Element>,
    /// Damage multiplier for the secondary target of a super strike
    pub secondary_multiplier: f32,
    pub shift_cost: u32,
    pub cycle_order: Vec<Element>,
}

impl Default for HitOptions {
    fn default() -> Self {
        Self {
            element: None,
            secondary_multiplier: 1.0,
            shift_cost: SHIFT_ABILITY_COST,
            cycle_order: Element::CYCLE.to_vec(),
        }
    }
}

impl HitOptions {
    pub fn with_element(element: Element) -> Self {
        Self {
            element: Some(element),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitResult {
    pub target_id: EnemyId,
    pub damage: i32,
    pub missed: bool,
    pub crit: bool,
}

impl HitResult {
    /// Landed hits are the only ones that mutate state
    pub fn landed(&self) -> bool {
        !self.missed && self.damage > 0
    }
}

/// Ordered damage rolls of one action; the primary target comes first
#[derive(Debug, Clone, PartialEq)]
pub struct HitManifest {
    pub ability: AbilityKind,
    pub hits: Vec<HitResult>,
    pub total: i32,
    pub cost: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TargetDead,
    TargetMissing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HitOutcome {
    Strike(HitManifest),
    ElementShift {
        target_id: EnemyId,
        from: Element,
        to: Element,
        cost: u32,
    },
    Skip(SkipReason),
}

/// Resolve one player action against `target`.
///
/// Spends the action cost from `player`. A dead or missing target is a skip
/// and costs nothing. Element shift writes the new element to the roster.
#[allow(clippy::too_many_arguments)]
pub fn perform_hit(
    player: &mut Player,
    weapon: &Weapon,
    matrix: &ElementMatrix,
    roster: &mut Roster,
    target: EnemyId,
    ability: AbilityKind,
    opts: &HitOptions,
    rng: &mut impl Rng,
) -> HitOutcome {
    let Some(primary) = roster.view(target) else {
        return HitOutcome::Skip(SkipReason::TargetMissing);
    };
    if !primary.is_alive() {
        return HitOutcome::Skip(SkipReason::TargetDead);
    }

    match ability {
        AbilityKind::Shift => {
            let from = primary.element;
            let to = match opts.element {
                Some(element) if element != Element::None => element,
                _ => from.next_in(&opts.cycle_order),
            };
            roster.set_element(target, to);
            player.spend_actions(opts.shift_cost);
            HitOutcome::ElementShift {
                target_id: target,
                from,
                to,
                cost: opts.shift_cost,
            }
        }
        AbilityKind::Basic | AbilityKind::Point => {
            let element = if ability == AbilityKind::Point {
                opts.element.unwrap_or(Element::None)
            } else {
                Element::None
            };
            let hit = roll_hit(player, weapon, matrix, &primary, element, 1.0, rng);
            player.spend_actions(1);
            HitOutcome::Strike(HitManifest {
                ability,
                total: hit.damage,
                hits: vec![hit],
                cost: 1,
            })
        }
        AbilityKind::Bounce | AbilityKind::Split | AbilityKind::Pierce => {
            let element = ability.super_element().unwrap_or(Element::None);
            let mut hits = vec![roll_hit(player, weapon, matrix, &primary, element, 1.0, rng)];

            let living = roster.living();
            if let Some(second) = select_secondary(ability, &primary, &living) {
                hits.push(roll_hit(
                    player,
                    weapon,
                    matrix,
                    second,
                    element,
                    opts.secondary_multiplier,
                    rng,
                ));
            }

            player.spend_actions(1);
            let total = hits.iter().map(|h| h.damage).sum();
            HitOutcome::Strike(HitManifest {
                ability,
                hits,
                total,
                cost: 1,
            })
        }
    }
}

fn roll_hit(
    player: &Player,
    weapon: &Weapon,
    matrix: &ElementMatrix,
    target: &EnemyView,
    element: Element,
    secondary_multiplier: f32,
    rng: &mut impl Rng,
) -> HitResult {
    let roll = compute_single_hit(
        player,
        weapon,
        HitTarget {
            element: target.element,
            row: target.row,
        },
        matrix,
        element,
        secondary_multiplier,
        false,
        rng,
    );
    HitResult {
        target_id: target.id,
        damage: roll.final_damage,
        missed: roll.did_miss,
        crit: roll.did_crit,
    }
}

/// Secondary target of a super strike. Ties go to the lower id.
pub fn select_secondary<'a>(
    ability: AbilityKind,
    primary: &EnemyView,
    candidates: &'a [EnemyView],
) -> Option<&'a EnemyView> {
    let others = candidates
        .iter()
        .filter(|e| e.id != primary.id && e.is_alive());

    match ability {
        AbilityKind::Bounce => nearest(others.map(|e| (e, e.pos.distance(primary.pos)))),
        AbilityKind::Split => nearest(
            others
                .filter(|e| e.row == primary.row)
                .map(|e| (e, (e.pos.x - primary.pos.x).abs())),
        ),
        AbilityKind::Pierce => nearest(
            others
                .filter(|e| e.row == primary.row && e.pos.x > primary.pos.x)
                .map(|e| (e, e.pos.x - primary.pos.x)),
        ),
        _ => None,
    }
}

fn nearest<'a>(iter: impl Iterator<Item = (&'a EnemyView, f32)>) -> Option<&'a EnemyView> {
    iter.min_by(|(a, da), (b, db)| da.total_cmp(db).then(a.id.cmp(&b.id)))
        .map(|(e, _)| e)
}
