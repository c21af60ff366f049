//! The enemy roster: a hecs world plus the stable id index.
//!
//! Only death finalization despawns entities and only formation recompaction
//! rewrites rows; every other field is owned by the entity's own animation
//! and impact tasks.

use std::collections::HashMap;

use glam::Vec2;
use hecs::{Entity, World};

use crate::components::{
    BossPattern, Combatant, DeathAnimation, DiveAnimation, Element, EnemyId, EnemyKind,
    FormationSlot, Health, Identity, Position, Subtype, Tags, VisualOffset,
};
use crate::config::CombatConfig;
use crate::constants::*;

/// Everything needed to spawn one enemy
#[derive(Debug, Clone)]
pub struct EnemySpawn {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub subtype: Subtype,
    pub boss_pattern: BossPattern,
    pub element: Element,
    pub hp: i32,
    pub atk: i32,
    pub row: u32,
    pub col: f32,
    pub radius: f32,
    pub line_offset: f32,
}

impl EnemySpawn {
    pub fn minion(id: EnemyId, row: u32, col: f32, hp: i32) -> Self {
        Self {
            id,
            kind: EnemyKind::Minion,
            subtype: Subtype::Aggressive,
            boss_pattern: BossPattern::Flat,
            element: Element::Earth,
            hp,
            atk: DEFAULT_ENEMY_ATK,
            row,
            col,
            radius: MINION_DEFAULT_RADIUS,
            line_offset: 0.0,
        }
    }

    pub fn boss(id: EnemyId, row: u32, col: f32, hp: i32) -> Self {
        Self {
            kind: EnemyKind::Boss,
            radius: BOSS_DEFAULT_RADIUS,
            ..Self::minion(id, row, col, hp)
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.element = element;
        self
    }
}

/// Read-only copy of an enemy, used by the selection rules and the
/// presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyView {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub subtype: Subtype,
    pub boss_pattern: BossPattern,
    pub element: Element,
    pub hp: i32,
    pub max_hp: i32,
    pub atk: i32,
    pub row: u32,
    pub col: f32,
    pub radius: f32,
    pub line_offset: f32,
    pub pos: Vec2,
    pub y_offset: f32,
    pub death_scale: f32,
    pub death_alpha: f32,
    pub attacking: bool,
    pub animating: bool,
}

impl EnemyView {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

#[derive(Default)]
pub struct Roster {
    world: World,
    index: HashMap<EnemyId, Entity>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the configured minions followed by the boss
    pub fn from_config(cfg: &CombatConfig) -> Self {
        let mut roster = Roster::new();
        for m in &cfg.minions {
            roster.spawn(EnemySpawn {
                id: m.id,
                kind: EnemyKind::Minion,
                subtype: m.subtype(),
                boss_pattern: BossPattern::Flat,
                element: m.element,
                hp: m.hp,
                atk: m.atk,
                row: m.row.unwrap_or(MINION_DEFAULT_ROW),
                col: m.col.unwrap_or(0.5),
                radius: m.radius.unwrap_or(MINION_DEFAULT_RADIUS),
                line_offset: m.line_offset.unwrap_or(0.0),
            });
        }
        let boss = &cfg.boss;
        roster.spawn(EnemySpawn {
            id: BOSS_ID,
            kind: EnemyKind::Boss,
            subtype: Subtype::Other,
            boss_pattern: boss.boss_pattern(),
            element: boss.element,
            hp: boss.hp,
            atk: boss.atk,
            row: boss.row.unwrap_or(BOSS_DEFAULT_ROW),
            col: boss.col.unwrap_or(0.5),
            radius: boss.radius.unwrap_or(BOSS_DEFAULT_RADIUS),
            line_offset: boss.line_offset.unwrap_or(0.0),
        });
        roster
    }

    /// Spawn an enemy. A duplicate id replaces the earlier entity.
    pub fn spawn(&mut self, spawn: EnemySpawn) -> Entity {
        if let Some(old) = self.index.remove(&spawn.id) {
            tracing::warn!(enemy = spawn.id, "duplicate enemy id, replacing");
            if let Err(err) = self.world.despawn(old) {
                tracing::warn!(enemy = spawn.id, %err, "replaced entity already gone");
            }
        }
        let entity = self.world.spawn((
            Identity {
                id: spawn.id,
                kind: spawn.kind,
                subtype: spawn.subtype,
                boss_pattern: spawn.boss_pattern,
            },
            Combatant {
                element: spawn.element,
                atk: spawn.atk,
            },
            Health::new(spawn.hp),
            FormationSlot {
                row: spawn.row.max(1),
                col: spawn.col,
                radius: spawn.radius,
                line_offset: spawn.line_offset,
            },
            Position(Vec2::ZERO),
            VisualOffset::default(),
        ));
        self.index.insert(spawn.id, entity);
        entity
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn entity(&self, id: EnemyId) -> Option<Entity> {
        self.index.get(&id).copied()
    }

    pub fn contains(&self, id: EnemyId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// All ids, ascending
    pub fn ids(&self) -> Vec<EnemyId> {
        let mut ids: Vec<EnemyId> = self.index.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Despawn an enemy. Returns false if it was already gone.
    pub fn remove(&mut self, id: EnemyId) -> bool {
        match self.index.remove(&id) {
            Some(entity) => self.world.despawn(entity).is_ok(),
            None => false,
        }
    }

    pub fn hp(&self, id: EnemyId) -> Option<i32> {
        let entity = self.entity(id)?;
        self.world.get::<&Health>(entity).ok().map(|h| h.current)
    }

    pub fn is_alive(&self, id: EnemyId) -> bool {
        self.hp(id).is_some_and(|hp| hp > 0)
    }

    pub fn position(&self, id: EnemyId) -> Option<Vec2> {
        let entity = self.entity(id)?;
        self.world.get::<&Position>(entity).ok().map(|p| p.0)
    }

    /// True while a dive or death animation owns the enemy
    pub fn is_animating(&self, id: EnemyId) -> bool {
        self.entity(id).is_some_and(|e| self.entity_is_animating(e))
    }

    pub(crate) fn entity_is_animating(&self, entity: Entity) -> bool {
        self.world
            .entity(entity)
            .map(|r| r.has::<DiveAnimation>() || r.has::<DeathAnimation>())
            .unwrap_or(false)
    }

    pub fn is_diving(&self, id: EnemyId) -> bool {
        self.entity(id)
            .and_then(|e| self.world.entity(e).ok())
            .is_some_and(|r| r.has::<DiveAnimation>())
    }

    pub fn view(&self, id: EnemyId) -> Option<EnemyView> {
        let entity = self.entity(id)?;
        self.view_entity(entity)
    }

    fn view_entity(&self, entity: Entity) -> Option<EnemyView> {
        let ident = *self.world.get::<&Identity>(entity).ok()?;
        let combatant = *self.world.get::<&Combatant>(entity).ok()?;
        let health = *self.world.get::<&Health>(entity).ok()?;
        let slot = *self.world.get::<&FormationSlot>(entity).ok()?;
        let pos = self
            .world
            .get::<&Position>(entity)
            .map(|p| p.0)
            .unwrap_or(Vec2::ZERO);
        let offset = self
            .world
            .get::<&VisualOffset>(entity)
            .map(|o| *o)
            .unwrap_or_default();
        let attacking = self
            .world
            .get::<&Tags>(entity)
            .map(|t| t.has(crate::components::ATTACK_TAG))
            .unwrap_or(false);

        Some(EnemyView {
            id: ident.id,
            kind: ident.kind,
            subtype: ident.subtype,
            boss_pattern: ident.boss_pattern,
            element: combatant.element,
            hp: health.current,
            max_hp: health.max,
            atk: combatant.atk,
            row: slot.row,
            col: slot.col,
            radius: slot.radius,
            line_offset: slot.line_offset,
            pos,
            y_offset: offset.y,
            death_scale: offset.death_scale,
            death_alpha: offset.death_alpha,
            attacking,
            animating: self.entity_is_animating(entity),
        })
    }

    /// Every enemy, ordered by id
    pub fn snapshot(&self) -> Vec<EnemyView> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.view(id))
            .collect()
    }

    /// Living enemies, ordered by id
    pub fn living(&self) -> Vec<EnemyView> {
        self.snapshot().into_iter().filter(|e| e.is_alive()).collect()
    }

    pub fn living_minion_count(&self) -> usize {
        self.world
            .query::<(&Identity, &Health)>()
            .iter()
            .filter(|(_, (ident, health))| ident.kind == EnemyKind::Minion && health.is_alive())
            .count()
    }

    pub fn add_tag(&mut self, id: EnemyId, tag: &str) {
        let Some(entity) = self.entity(id) else {
            return;
        };
        if let Ok(mut tags) = self.world.get::<&mut Tags>(entity) {
            tags.add(tag);
            return;
        }
        let mut tags = Tags::default();
        tags.add(tag);
        if let Err(err) = self.world.insert_one(entity, tags) {
            tracing::warn!(enemy = id, tag, %err, "tag not attached");
        }
    }

    /// Decrement a tag; the component is dropped once empty
    pub fn remove_tag(&mut self, id: EnemyId, tag: &str) {
        let Some(entity) = self.entity(id) else {
            return;
        };
        let now_empty = match self.world.get::<&mut Tags>(entity) {
            Ok(mut tags) => {
                tags.remove(tag);
                tags.is_empty()
            }
            Err(_) => return,
        };
        if now_empty {
            if let Err(err) = self.world.remove_one::<Tags>(entity) {
                tracing::warn!(enemy = id, %err, "empty tags not detached");
            }
        }
    }

    pub fn has_tag(&self, id: EnemyId, tag: &str) -> bool {
        self.entity(id)
            .and_then(|e| self.world.get::<&Tags>(e).ok().map(|t| t.has(tag)))
            .unwrap_or(false)
    }

    pub fn any_tagged(&self, tag: &str) -> bool {
        self.world.query::<&Tags>().iter().any(|(_, tags)| tags.has(tag))
    }

    pub fn set_element(&mut self, id: EnemyId, element: Element) {
        if let Some(entity) = self.entity(id) {
            if let Ok(mut combatant) = self.world.get::<&mut Combatant>(entity) {
                combatant.element = element;
            }
        }
    }

    pub fn set_hp(&mut self, id: EnemyId, hp: i32) {
        if let Some(entity) = self.entity(id) {
            if let Ok(mut health) = self.world.get::<&mut Health>(entity) {
                health.current = hp.clamp(0, health.max);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ATTACK_TAG;

    #[test]
    fn test_from_config_spawns_minions_and_boss() {
        let mut cfg = CombatConfig::default();
        cfg.minions = vec![crate::config::MinionConfig {
            id: 3,
            temperament: 2,
            hp: 12,
            ..Default::default()
        }];
        let roster = Roster::from_config(&cfg);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.ids(), vec![3, BOSS_ID]);
        let minion = roster.view(3).unwrap();
        assert_eq!(minion.subtype, Subtype::Passive);
        assert_eq!(minion.row, MINION_DEFAULT_ROW);
        assert_eq!(roster.view(BOSS_ID).unwrap().kind, EnemyKind::Boss);
    }

    #[test]
    fn test_tag_component_dropped_when_empty() {
        let mut roster = Roster::new();
        let entity = roster.spawn(EnemySpawn::minion(1, 1, 0.5, 10));
        roster.add_tag(1, ATTACK_TAG);
        roster.add_tag(1, ATTACK_TAG);
        assert!(roster.any_tagged(ATTACK_TAG));
        roster.remove_tag(1, ATTACK_TAG);
        assert!(roster.has_tag(1, ATTACK_TAG));
        roster.remove_tag(1, ATTACK_TAG);
        assert!(!roster.has_tag(1, ATTACK_TAG));
        assert!(roster.world().get::<&Tags>(entity).is_err());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut roster = Roster::new();
        roster.spawn(EnemySpawn::minion(1, 1, 0.5, 10));
        assert!(roster.remove(1));
        assert!(!roster.remove(1));
        assert!(roster.is_empty());
    }
}
