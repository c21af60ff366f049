//! Plain data records and hecs components.
//!
//! `Player`, `Weapon` and `ElementMatrix` are plain records owned by the
//! session. Enemies are hecs entities; the animation components below exist
//! only while the enemy is animating and are removed when the sequence ends.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::*;

/// Stable enemy identifier, unique within a session
pub type EnemyId = u32;

// =============================================================================
// ELEMENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Earth,
    Fire,
    Water,
    Cosmos,
    #[default]
    None,
}

impl Element {
    /// Order used by the element shift ability
    pub const CYCLE: [Element; 4] = [Element::Earth, Element::Fire, Element::Water, Element::Cosmos];

    pub fn index(self) -> usize {
        match self {
            Element::Earth => 0,
            Element::Fire => 1,
            Element::Water => 2,
            Element::Cosmos => 3,
            Element::None => 4,
        }
    }

    /// Next element in `order`; elements outside the order restart it.
    pub fn next_in(self, order: &[Element]) -> Element {
        if order.is_empty() {
            return self;
        }
        let next = order
            .iter()
            .position(|e| *e == self)
            .map(|i| (i + 1) % order.len())
            .unwrap_or(0);
        order[next]
    }

    /// Parse a config element name. Accepts the legacy aliases; anything
    /// unrecognised is earth.
    pub fn from_alias(name: &str) -> Element {
        match name.trim().to_ascii_lowercase().as_str() {
            "earth" | "green" => Element::Earth,
            "fire" => Element::Fire,
            "water" | "cold" => Element::Water,
            "cosmos" => Element::Cosmos,
            "none" => Element::None,
            _ => Element::Earth,
        }
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Element::from_alias(&raw))
    }
}

/// Attacker-element x defender-element damage multipliers.
///
/// Deserializes from a nested map (`{"fire": {"earth": 1.5}}`); pairs that
/// are not listed stay at 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementMatrix {
    cells: [[f32; 5]; 5],
}

impl ElementMatrix {
    pub fn neutral() -> Self {
        Self { cells: [[1.0; 5]; 5] }
    }

    pub fn get(&self, attacker: Element, defender: Element) -> f32 {
        self.cells[attacker.index()][defender.index()]
    }

    pub fn set(&mut self, attacker: Element, defender: Element, coef: f32) {
        self.cells[attacker.index()][defender.index()] = coef;
    }

    pub fn with(mut self, attacker: Element, defender: Element, coef: f32) -> Self {
        self.set(attacker, defender, coef);
        self
    }
}

impl Default for ElementMatrix {
    fn default() -> Self {
        Self::neutral()
    }
}

impl<'de> Deserialize<'de> for ElementMatrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: HashMap<String, HashMap<String, f32>> = HashMap::deserialize(deserializer)?;
        let mut matrix = ElementMatrix::neutral();
        for (atk, row) in raw {
            let atk = Element::from_alias(&atk);
            for (def, coef) in row {
                if coef.is_finite() {
                    matrix.set(atk, Element::from_alias(&def), coef);
                }
            }
        }
        Ok(matrix)
    }
}

// =============================================================================
// PLAYER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackRange {
    pub min: i32,
    pub max: i32,
}

/// The player's combat record. Reset on new game or config reload.
#[derive(Debug, Clone)]
pub struct Player {
    pub hp_max: i32,
    pub hp: i32,
    pub attack: AttackRange,
    pub luck: f32,
    pub def: i32,
    /// Per-element ability strength, in percent or as a fraction
    pub elements: HashMap<Element, f32>,
    pub actions_remaining: u32,
    pub max_actions: u32,
}

impl Player {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Spend `cost` actions, never going below zero
    pub fn spend_actions(&mut self, cost: u32) {
        self.actions_remaining = self.actions_remaining.saturating_sub(cost);
    }

    /// Subtract damage, clamped at zero. Returns the hp before the hit.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let prev = self.hp;
        self.hp = (self.hp - amount.max(0)).clamp(0, self.hp_max.max(0));
        prev
    }
}

// =============================================================================
// WEAPONS
// =============================================================================

/// Which enemies strike back after a player hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetaliationRule {
    /// Primary target only
    #[default]
    T1,
    /// Primary target and its nearest same-row neighbour
    T2,
    /// Every living enemy in the primary target's row
    T3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissTable {
    /// Base miss percent by target row 1..4
    pub base_by_pos: Vec<f32>,
    pub luck_step: f32,
    pub luck_per_step_pct: f32,
}

impl Default for MissTable {
    fn default() -> Self {
        Self {
            base_by_pos: Vec::new(),
            luck_step: DEFAULT_MISS_LUCK_STEP,
            luck_per_step_pct: DEFAULT_MISS_PER_STEP_PCT,
        }
    }
}

impl MissTable {
    /// Base miss percent for a row, with the row clamped to 1..4
    pub fn base_for(&self, row: u32) -> f32 {
        let idx = row.clamp(1, 4) as usize - 1;
        self.base_by_pos.get(idx).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Weapon {
    pub id: u32,
    pub name: String,
    pub miss: MissTable,
    pub retaliation_rule: RetaliationRule,
    /// Travel time of the outbound strike visual
    pub strike_ms: f32,
}

impl Default for Weapon {
    fn default() -> Self {
        Self {
            id: 1,
            name: "Sword".to_string(),
            miss: MissTable::default(),
            retaliation_rule: RetaliationRule::T1,
            strike_ms: DEFAULT_STRIKE_MS,
        }
    }
}

// =============================================================================
// ENEMY COMPONENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    Minion,
    Boss,
}

/// Minion temperament; drives the retaliation overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Subtype {
    /// Joins any retaliation it is a candidate for, or was hit in
    #[default]
    Aggressive,
    /// Strikes back only as the primary target of a landed hit
    Passive,
    Other,
}

impl Subtype {
    /// Config `type` codes: 1 aggressive, 2 passive, anything else other
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Subtype::Aggressive,
            2 => Subtype::Passive,
            _ => Subtype::Other,
        }
    }
}

/// How a boss scales its retaliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BossPattern {
    /// 3.0x at the start, shrinking to 0.1x as turns are spent
    Fading,
    /// Stronger the further back it stands
    Positional,
    /// One x per living minion
    Swarm,
    #[default]
    Flat,
}

impl BossPattern {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => BossPattern::Fading,
            2 => BossPattern::Positional,
            3 => BossPattern::Swarm,
            _ => BossPattern::Flat,
        }
    }
}

/// Who the enemy is. Never changes after spawn.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub subtype: Subtype,
    pub boss_pattern: BossPattern,
}

/// Combat stats; the element can be changed by the shift ability
#[derive(Debug, Clone, Copy)]
pub struct Combatant {
    pub element: Element,
    pub atk: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct Health {
    pub current: i32,
    /// Hp recorded at spawn; regen never exceeds it
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        let max = max.max(0);
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn percentage(&self) -> f32 {
        if self.max <= 0 {
            return 0.0;
        }
        (self.current as f32 / self.max as f32).clamp(0.0, 1.0)
    }

    /// Heal up to max. Dead entities stay dead.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if !self.is_alive() || amount <= 0 {
            return 0;
        }
        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        self.current - before
    }
}

/// Formation slot: row line and fractional column
#[derive(Debug, Clone, Copy)]
pub struct FormationSlot {
    pub row: u32,
    /// Horizontal placement, 0..1 across the field
    pub col: f32,
    pub radius: f32,
    /// Per-enemy vertical displacement from the row line
    pub line_offset: f32,
}

/// Absolute laid-out position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec2);

/// Transient render offsets written by the animation systems
#[derive(Debug, Clone, Copy)]
pub struct VisualOffset {
    pub y: f32,
    pub outline_kick: f32,
    pub death_scale: f32,
    pub death_alpha: f32,
}

impl Default for VisualOffset {
    fn default() -> Self {
        Self {
            y: 0.0,
            outline_kick: 0.0,
            death_scale: 1.0,
            death_alpha: 1.0,
        }
    }
}

/// Counted flags. The component is removed when the last flag goes away.
#[derive(Debug, Clone, Default)]
pub struct Tags {
    counts: HashMap<String, u32>,
}

/// Held by every enemy taking part in an unresolved strike or retaliation
pub const ATTACK_TAG: &str = "attack";

impl Tags {
    pub fn add(&mut self, tag: &str) {
        *self.counts.entry(tag.to_string()).or_insert(0) += 1;
    }

    /// Decrement; a flag that reaches zero is dropped
    pub fn remove(&mut self, tag: &str) {
        if let Some(count) = self.counts.get_mut(tag) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.counts.remove(tag);
            }
        }
    }

    pub fn has(&self, tag: &str) -> bool {
        self.count(tag) > 0
    }

    pub fn count(&self, tag: &str) -> u32 {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

// =============================================================================
// ANIMATION STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivePhase {
    Down,
    Hit,
    Up,
}

/// Why a dive is happening; carried through to the player damage
#[derive(Debug, Clone, PartialEq)]
pub struct RetaliationContext {
    pub reason: String,
    /// Damage the triggering resolution dealt, if any
    pub total_damage: Option<i32>,
}

impl RetaliationContext {
    pub fn counter(total_damage: i32) -> Self {
        Self {
            reason: "counter".to_string(),
            total_damage: Some(total_damage),
        }
    }
}

/// Dive-to-player animation; present only while the dive runs
#[derive(Debug, Clone)]
pub struct DiveAnimation {
    pub phase: DivePhase,
    pub phase_started_at: f64,
    pub down_ms: f32,
    pub hit_ms: f32,
    pub up_ms: f32,
    pub start_y: f32,
    pub target_y: f32,
    pub damage_applied: bool,
    pub wave: u64,
    pub context: RetaliationContext,
}

/// Exit animation; present from death start until the batch member finishes
#[derive(Debug, Clone, Copy)]
pub struct DeathAnimation {
    pub started_at: f64,
    pub duration_ms: f32,
    pub impact_spawned: bool,
}
