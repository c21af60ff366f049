//! Session configuration.
//!
//! Mirrors the JSON the presentation layer ships with. Every field has a
//! default so partial files load; missing sections fall back to the values in
//! `constants`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::components::{
    AttackRange, BossPattern, Element, ElementMatrix, Player, RetaliationRule, Subtype, Weapon,
};
use crate::constants::*;
use crate::error::CombatError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CombatConfig {
    /// A missing `field` takes the field defaults, not the built-in encounter's
    #[serde(default)]
    pub field: FieldConfig,
    pub player: PlayerConfig,
    pub boss: BossConfig,
    pub minions: Vec<MinionConfig>,
    pub weapons: Vec<Weapon>,
    pub element_matrix: ElementMatrix,
    pub timer: TimerConfig,
    pub rules: RulesConfig,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            field: FieldConfig {
                rows: 4,
                ..FieldConfig::default()
            },
            player: PlayerConfig::default(),
            boss: BossConfig::default(),
            minions: Vec::new(),
            weapons: vec![Weapon::default()],
            element_matrix: ElementMatrix::neutral(),
            timer: TimerConfig::default(),
            rules: RulesConfig::default(),
        }
    }
}

impl CombatConfig {
    pub fn from_json_str(json: &str) -> Result<Self, CombatError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CombatError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn weapon(&self, id: u32) -> Option<&Weapon> {
        self.weapons.iter().find(|w| w.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldAnchor {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Padding {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            left: 0.0,
            right: 0.0,
            top: FIELD_PADDING_TOP,
            bottom: FIELD_PADDING_BOTTOM,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldConfig {
    pub rows: u32,
    pub anchor: FieldAnchor,
    pub width_ratio: f32,
    pub padding: Padding,
    pub line_inset_top: f32,
    pub line_inset_bottom: f32,
    /// Caps the automatic row spacing when set
    pub line_step: Option<f32>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            rows: FIELD_DEFAULT_ROWS,
            anchor: FieldAnchor::Center,
            width_ratio: FIELD_WIDTH_RATIO,
            padding: Padding::default(),
            line_inset_top: FIELD_LINE_INSET,
            line_inset_bottom: FIELD_LINE_INSET,
            line_step: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerConfig {
    pub hp_max: i32,
    pub hp: i32,
    /// Action budget at session start
    pub hits: u32,
    pub max_hits: u32,
    pub luck: f32,
    pub def: i32,
    pub attack: AttackRange,
    pub elements: HashMap<Element, f32>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let elements = Element::CYCLE.iter().map(|e| (*e, 0.25)).collect();
        Self {
            hp_max: 2200,
            hp: 2200,
            hits: 60,
            max_hits: 60,
            luck: 1.0,
            def: 1,
            attack: AttackRange { min: 1, max: 10 },
            elements,
        }
    }
}

impl PlayerConfig {
    pub fn to_player(&self) -> Player {
        Player {
            hp_max: self.hp_max.max(0),
            hp: self.hp.clamp(0, self.hp_max.max(0)),
            attack: self.attack,
            luck: if self.luck.is_finite() { self.luck } else { 0.0 },
            def: self.def,
            elements: self.elements.clone(),
            actions_remaining: self.hits,
            max_actions: self.max_hits.max(self.hits),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BossConfig {
    /// Boss pattern code (1 fading, 2 positional, 3 swarm)
    #[serde(rename = "type")]
    pub pattern: u32,
    pub element: Element,
    pub hp: i32,
    pub atk: i32,
    pub row: Option<u32>,
    pub col: Option<f32>,
    pub radius: Option<f32>,
    pub line_offset: Option<f32>,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            pattern: 1,
            element: Element::Earth,
            hp: 88,
            atk: 28,
            row: Some(BOSS_DEFAULT_ROW),
            col: Some(0.5),
            radius: Some(80.0),
            line_offset: Some(10.0),
        }
    }
}

impl BossConfig {
    pub fn boss_pattern(&self) -> BossPattern {
        BossPattern::from_code(self.pattern)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MinionConfig {
    pub id: u32,
    /// Temperament code (1 aggressive, 2 passive)
    #[serde(rename = "type")]
    pub temperament: u32,
    pub element: Element,
    pub hp: i32,
    pub atk: i32,
    pub row: Option<u32>,
    pub col: Option<f32>,
    pub radius: Option<f32>,
    pub line_offset: Option<f32>,
}

impl Default for MinionConfig {
    fn default() -> Self {
        Self {
            id: 0,
            temperament: 1,
            element: Element::Earth,
            hp: 10,
            atk: DEFAULT_ENEMY_ATK,
            row: None,
            col: None,
            radius: None,
            line_offset: None,
        }
    }
}

impl MinionConfig {
    pub fn subtype(&self) -> Subtype {
        Subtype::from_code(self.temperament)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegenConfig {
    /// Percent of max hp healed per turn for minions
    pub minion_pct: f32,
    /// Percent of max hp healed per turn for the boss
    pub boss_pct: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerConfig {
    pub turns: Option<u32>,
    pub turn_ms: Option<f64>,
    pub max_turn_ms: Option<f64>,
    pub decrement_on_turn: bool,
    pub regen: RegenConfig,
}

/// Choreography timings and balance knobs
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesConfig {
    pub shift_ms: f32,
    pub chain_gap_ms: f32,
    pub out_ms: f32,
    pub hit_ms: f32,
    pub back_ms: f32,
    pub drop_px: f32,
    pub death_ms: f32,
    pub retaliation_mul: f32,
    pub boss_retaliation_mul: f32,
    pub min_row_gap: f32,
    /// Cost of the element shift ability
    pub shift_cost: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            shift_ms: FORMATION_SHIFT_MS,
            chain_gap_ms: RETALIATION_CHAIN_GAP_MS,
            out_ms: DIVE_DOWN_MS,
            hit_ms: DIVE_HIT_MS,
            back_ms: DIVE_UP_MS,
            drop_px: DIVE_DROP_PX,
            death_ms: DEATH_ANIMATION_MS,
            retaliation_mul: RETALIATION_MUL,
            boss_retaliation_mul: BOSS_RETALIATION_MUL,
            min_row_gap: MIN_ROW_GAP,
            shift_cost: SHIFT_ABILITY_COST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg = CombatConfig::from_json_str(
            r#"{
                "player": { "hpMax": 100, "hp": 100, "hits": 5, "attack": { "min": 2, "max": 4 } },
                "minions": [ { "id": 1, "type": 2, "element": "green", "hp": 12, "atk": 3, "row": 1 } ],
                "weapons": [ { "id": 2, "retaliationRule": "t3", "miss": { "baseByPos": [5, 10, 15, 20] } } ],
                "timer": { "turnMs": 1000, "regen": { "minionPct": 10 } }
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.player.hits, 5);
        assert_eq!(cfg.minions[0].element, Element::Earth);
        assert_eq!(cfg.minions[0].subtype(), Subtype::Passive);
        let weapon = cfg.weapon(2).unwrap();
        assert_eq!(weapon.retaliation_rule, RetaliationRule::T3);
        assert_eq!(weapon.miss.luck_step, DEFAULT_MISS_LUCK_STEP);
        assert_eq!(weapon.strike_ms, DEFAULT_STRIKE_MS);
        assert_eq!(cfg.timer.turn_ms, Some(1000.0));
        assert_eq!(cfg.timer.regen.minion_pct, 10.0);
        assert_eq!(cfg.rules.death_ms, DEATH_ANIMATION_MS);
        assert_eq!(cfg.field.rows, FIELD_DEFAULT_ROWS);
    }

    #[test]
    fn test_fallback_config() {
        let cfg = CombatConfig::default();
        assert_eq!(cfg.field.rows, 4);
        assert_eq!(cfg.player.hits, 60);
        assert_eq!(cfg.boss.boss_pattern(), BossPattern::Fading);
        assert!(cfg.weapon(1).is_some());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = CombatConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, CombatError::Config(_)));
    }

    #[test]
    fn test_player_hp_clamped_to_max() {
        let player = PlayerConfig {
            hp_max: 50,
            hp: 80,
            ..PlayerConfig::default()
        }
        .to_player();
        assert_eq!(player.hp, 50);
    }
}
