//! Damage, roll, crit, miss and element math.
//!
//! Pure functions; randomness is passed in so callers control seeding.

use rand::Rng;

use crate::components::{Element, ElementMatrix, Health, Player, Weapon};
use crate::constants::*;

/// Draw an integer in `[min, max]`, biased toward `max` as luck grows.
///
/// The uniform draw is raised to `max(0.3, 1 - 0.7 * clamp(luck / 100))`,
/// so zero luck is a flat roll and full luck strongly favours the top.
pub fn roll_by_luck(min: i32, max: i32, luck: f32, rng: &mut impl Rng) -> i32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let luck = if luck.is_finite() { luck } else { 0.0 };
    let l = (luck as f64 / 100.0).clamp(0.0, 1.0);
    let exponent = (1.0 - ROLL_LUCK_SLOPE * l).max(ROLL_MIN_EXPONENT);
    let u: f64 = rng.gen::<f64>().powf(exponent);
    let span = i64::from(hi) - i64::from(lo);
    let value = (lo as f64 + span as f64 * u).round() as i32;
    value.clamp(lo, hi)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CritRoll {
    pub crit_pct: u32,
    pub did_crit: bool,
    pub multiplier: i32,
}

/// Crit chance of `floor(luck / 10)` percent, capped at 100
pub fn crit_chance_pct(luck: f32) -> u32 {
    if !luck.is_finite() || luck <= 0.0 {
        return 0;
    }
    ((luck / LUCK_PER_CRIT_PERCENT).floor() as u32).min(100)
}

pub fn crit_from_luck(luck: f32, rng: &mut impl Rng) -> CritRoll {
    let crit_pct = crit_chance_pct(luck);
    let did_crit = rng.gen::<f32>() * 100.0 < crit_pct as f32;
    CritRoll {
        crit_pct,
        did_crit,
        multiplier: if did_crit { CRIT_MULTIPLIER } else { 1 },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissRoll {
    pub miss_pct: f32,
    pub did_miss: bool,
}

/// Miss percent for a weapon against a row, before rolling
pub fn miss_chance_pct(weapon: &Weapon, row: u32, luck: f32) -> f32 {
    let table = &weapon.miss;
    let base = table.base_for(row);
    let step = if table.luck_step > 0.0 {
        table.luck_step
    } else {
        DEFAULT_MISS_LUCK_STEP
    };
    let luck = if luck.is_finite() { luck.max(0.0) } else { 0.0 };
    let steps = (luck / step).floor();
    (base - steps * table.luck_per_step_pct).clamp(0.0, 100.0)
}

pub fn miss_for_weapon(weapon: &Weapon, row: u32, luck: f32, rng: &mut impl Rng) -> MissRoll {
    let miss_pct = miss_chance_pct(weapon, row, luck);
    MissRoll {
        miss_pct,
        did_miss: rng.gen::<f32>() * 100.0 < miss_pct,
    }
}

pub fn elem_coef(matrix: &ElementMatrix, attacker: Element, defender: Element) -> f32 {
    let coef = matrix.get(attacker, defender);
    if coef.is_finite() {
        coef
    } else {
        1.0
    }
}

/// Share of the attack range an element strike uses.
///
/// `None` is the full range. Stored values above 1.001 are percents.
pub fn ability_pct_for(player: &Player, element: Element) -> f32 {
    if element == Element::None {
        return 1.0;
    }
    let mut pct = player.elements.get(&element).copied().unwrap_or(1.0);
    if !pct.is_finite() {
        return 1.0;
    }
    if pct > 1.001 {
        pct /= 100.0;
    }
    pct
}

/// What the hit is aimed at
#[derive(Debug, Clone, Copy)]
pub struct HitTarget {
    pub element: Element,
    pub row: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRoll {
    pub final_damage: i32,
    pub did_miss: bool,
    pub did_crit: bool,
    pub crit_multiplier: i32,
    pub base_roll: i32,
    pub miss_pct: f32,
}

/// Roll one hit.
///
/// The miss roll is independent of the damage roll; a miss only zeroes the
/// final number.
#[allow(clippy::too_many_arguments)]
pub fn compute_single_hit(
    player: &Player,
    weapon: &Weapon,
    target: HitTarget,
    matrix: &ElementMatrix,
    element: Element,
    secondary_multiplier: f32,
    skip_matrix: bool,
    rng: &mut impl Rng,
) -> HitRoll {
    let luck = player.luck;
    let pct = ability_pct_for(player, element);
    let pure_min = (player.attack.min as f32 * pct).floor() as i32;
    let pure_max = (player.attack.max as f32 * pct).floor() as i32;

    let base_coef = if skip_matrix {
        1.0
    } else {
        elem_coef(matrix, element, target.element)
    };
    let secondary = if secondary_multiplier.is_finite() {
        secondary_multiplier
    } else {
        1.0
    };
    let coef = base_coef * secondary;

    let miss = miss_for_weapon(weapon, target.row.clamp(1, 4), luck, rng);
    let base_roll = roll_by_luck(pure_min, pure_max, luck, rng);
    let crit = crit_from_luck(luck, rng);
    let rolled = (base_roll as f32 * coef * crit.multiplier as f32).round();
    let rolled = if rolled.is_finite() { rolled.max(0.0) as i32 } else { 0 };

    HitRoll {
        final_damage: if miss.did_miss { 0 } else { rolled },
        did_miss: miss.did_miss,
        did_crit: crit.did_crit,
        crit_multiplier: crit.multiplier,
        base_roll,
        miss_pct: miss.miss_pct,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    pub died: bool,
    pub prev_hp: i32,
    pub now_hp: i32,
}

/// Apply damage to an enemy's health.
///
/// Idempotent on the dead: hp at or below zero is left untouched and
/// `died` is false. Non-finite or negative amounts count as zero.
pub fn apply_damage(health: &mut Health, amount: f64) -> DamageOutcome {
    let prev_hp = health.current;
    if prev_hp <= 0 {
        return DamageOutcome {
            died: false,
            prev_hp,
            now_hp: prev_hp,
        };
    }
    let damage = if amount.is_finite() {
        amount.floor().clamp(0.0, i32::MAX as f64) as i32
    } else {
        0
    };
    health.current = (prev_hp - damage).clamp(0, health.max.max(prev_hp));
    DamageOutcome {
        died: health.current == 0,
        prev_hp,
        now_hp: health.current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AttackRange, MissTable};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn player(min: i32, max: i32, luck: f32) -> Player {
        Player {
            hp_max: 100,
            hp: 100,
            attack: AttackRange { min, max },
            luck,
            def: 0,
            elements: HashMap::new(),
            actions_remaining: 10,
            max_actions: 10,
        }
    }

    fn weapon_with_miss(base: f32) -> Weapon {
        Weapon {
            miss: MissTable {
                base_by_pos: vec![base; 4],
                ..MissTable::default()
            },
            ..Weapon::default()
        }
    }

    #[test]
    fn test_apply_damage_idempotent_on_dead() {
        let mut health = Health { current: 0, max: 10 };
        for _ in 0..2 {
            let out = apply_damage(&mut health, 5.0);
            assert!(!out.died);
            assert_eq!(health.current, 0);
        }
    }

    #[test]
    fn test_apply_damage_reports_death_once() {
        let mut health = Health::new(10);
        let out = apply_damage(&mut health, 12.7);
        assert!(out.died);
        assert_eq!(out.prev_hp, 10);
        assert_eq!(out.now_hp, 0);
        let again = apply_damage(&mut health, 1.0);
        assert!(!again.died);
    }

    #[test]
    fn test_apply_damage_coerces_bad_amounts() {
        let mut health = Health::new(10);
        apply_damage(&mut health, f64::NAN);
        apply_damage(&mut health, -4.0);
        apply_damage(&mut health, f64::INFINITY);
        assert_eq!(health.current, 10);
        apply_damage(&mut health, 3.9);
        assert_eq!(health.current, 7);
    }

    #[test]
    fn test_roll_by_luck_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for luck in 0..=100 {
            for _ in 0..50 {
                let v = roll_by_luck(3, 9, luck as f32, &mut rng);
                assert!((3..=9).contains(&v), "luck {luck} rolled {v}");
            }
        }
        assert_eq!(roll_by_luck(5, 5, 50.0, &mut rng), 5);
        let swapped = roll_by_luck(9, 3, 10.0, &mut rng);
        assert!((3..=9).contains(&swapped));
    }

    #[test]
    fn test_roll_by_luck_full_i32_span() {
        let mut rng = StdRng::seed_from_u64(3);
        let lucky: Vec<i32> = (0..200)
            .map(|_| roll_by_luck(i32::MIN, i32::MAX, 100.0, &mut rng))
            .collect();
        // a wrapped span would pin every roll near the bottom
        assert!(lucky.iter().any(|v| *v > 0));
    }

    #[test]
    fn test_luck_biases_toward_max() {
        let mut rng = StdRng::seed_from_u64(11);
        let unlucky: i64 = (0..2000).map(|_| roll_by_luck(0, 100, 0.0, &mut rng) as i64).sum();
        let lucky: i64 = (0..2000).map(|_| roll_by_luck(0, 100, 100.0, &mut rng) as i64).sum();
        assert!(lucky > unlucky);
    }

    #[test]
    fn test_crit_chance_from_luck() {
        assert_eq!(crit_chance_pct(50.0), 5);
        assert_eq!(crit_chance_pct(120.0), 12);
        assert_eq!(crit_chance_pct(9.0), 0);
        assert_eq!(crit_chance_pct(-30.0), 0);
        assert_eq!(crit_chance_pct(5000.0), 100);

        let mut rng = StdRng::seed_from_u64(1);
        let roll = crit_from_luck(0.0, &mut rng);
        assert!(!roll.did_crit);
        assert_eq!(roll.multiplier, 1);
        let roll = crit_from_luck(1000.0, &mut rng);
        assert!(roll.did_crit);
        assert_eq!(roll.multiplier, CRIT_MULTIPLIER);
    }

    #[test]
    fn test_miss_reduced_by_luck_steps() {
        let weapon = Weapon {
            miss: MissTable {
                base_by_pos: vec![0.0, 10.0, 20.0, 30.0],
                luck_step: 10.0,
                luck_per_step_pct: 2.0,
            },
            ..Weapon::default()
        };
        assert_eq!(miss_chance_pct(&weapon, 4, 0.0), 30.0);
        assert_eq!(miss_chance_pct(&weapon, 4, 25.0), 26.0);
        assert_eq!(miss_chance_pct(&weapon, 2, 100.0), 0.0);
        assert_eq!(miss_chance_pct(&weapon, 0, 0.0), 0.0);
    }

    #[test]
    fn test_elem_coef_default_neutral() {
        let matrix = ElementMatrix::neutral().with(Element::Fire, Element::Earth, 2.0);
        assert_eq!(elem_coef(&matrix, Element::Fire, Element::Earth), 2.0);
        assert_eq!(elem_coef(&matrix, Element::Water, Element::Earth), 1.0);
    }

    #[test]
    fn test_ability_pct_reads_percent_or_fraction() {
        let mut p = player(10, 10, 0.0);
        p.elements.insert(Element::Fire, 50.0);
        p.elements.insert(Element::Water, 0.25);
        assert_eq!(ability_pct_for(&p, Element::None), 1.0);
        assert_eq!(ability_pct_for(&p, Element::Fire), 0.5);
        assert_eq!(ability_pct_for(&p, Element::Water), 0.25);
        assert_eq!(ability_pct_for(&p, Element::Cosmos), 1.0);
    }

    #[test]
    fn test_single_hit_applies_coefficients() {
        let mut rng = StdRng::seed_from_u64(3);
        let p = player(10, 10, 0.0);
        let matrix = ElementMatrix::neutral().with(Element::Fire, Element::Earth, 1.5);
        let target = HitTarget {
            element: Element::Earth,
            row: 1,
        };
        let hit = compute_single_hit(
            &p,
            &weapon_with_miss(0.0),
            target,
            &matrix,
            Element::Fire,
            0.5,
            false,
            &mut rng,
        );
        assert!(!hit.did_miss);
        assert_eq!(hit.base_roll, 10);
        // 10 * 1.5 * 0.5
        assert_eq!(hit.final_damage, 8);

        let skipped = compute_single_hit(
            &p,
            &weapon_with_miss(0.0),
            target,
            &matrix,
            Element::Fire,
            1.0,
            true,
            &mut rng,
        );
        assert_eq!(skipped.final_damage, 10);
    }

    #[test]
    fn test_miss_zeroes_damage_but_keeps_roll() {
        let mut rng = StdRng::seed_from_u64(5);
        let hit = compute_single_hit(
            &player(7, 7, 0.0),
            &weapon_with_miss(100.0),
            HitTarget {
                element: Element::Earth,
                row: 2,
            },
            &ElementMatrix::neutral(),
            Element::None,
            1.0,
            false,
            &mut rng,
        );
        assert!(hit.did_miss);
        assert_eq!(hit.final_damage, 0);
        assert_eq!(hit.base_roll, 7);
        assert_eq!(hit.miss_pct, 100.0);
    }
}
