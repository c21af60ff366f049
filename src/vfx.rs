//! One-shot visual effects (impact bursts, strike trails).
//!
//! These are separate from enemy state: spawned, aged by the frame clock and
//! removed without affecting combat. The presentation layer reads `effects`
//! each frame and draws them however it likes.

use glam::Vec2;

use crate::components::Element;
use crate::constants::*;
use crate::events::GameEvent;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualEffect {
    pub pos: Vec2,
    pub effect_type: EffectType,
    /// Milliseconds remaining
    pub timer: f32,
    pub duration: f32,
}

impl VisualEffect {
    pub fn new(pos: Vec2, effect_type: EffectType) -> Self {
        Self::with_duration(pos, effect_type, effect_type.duration())
    }

    pub fn with_duration(pos: Vec2, effect_type: EffectType, duration: f32) -> Self {
        let duration = duration.max(1.0);
        Self {
            pos,
            effect_type,
            timer: duration,
            duration,
        }
    }

    /// Progress from 0.0 (just started) to 1.0 (finished)
    pub fn progress(&self) -> f32 {
        (1.0 - self.timer / self.duration).clamp(0.0, 1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.timer <= 0.0
    }

    /// Age the effect, returns true if still alive
    pub fn update(&mut self, dt_ms: f32) -> bool {
        self.timer -= dt_ms;
        !self.is_finished()
    }

    /// Current ring radius for the burst effects
    pub fn radius(&self) -> Option<f32> {
        match self.effect_type {
            EffectType::HpImpact { r0, r1 } | EffectType::DeathBurst { r0, r1 } => {
                Some(r0 + (r1 - r0) * self.progress())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectType {
    /// Ring at the player's HP anchor when a dive lands
    HpImpact { r0: f32, r1: f32 },
    /// Ring spawned partway through a death animation
    DeathBurst { r0: f32, r1: f32 },
    /// Flash on an enemy when an outbound hit lands
    EnemyImpact { element: Element },
    /// Trail from the player toward a target
    Strike { to: Vec2 },
}

impl EffectType {
    pub fn duration(&self) -> f32 {
        match self {
            EffectType::HpImpact { .. } => HP_IMPACT_MIN_MS,
            EffectType::DeathBurst { .. } => DEATH_IMPACT_MS,
            EffectType::EnemyImpact { .. } => STRIKE_IMPACT_VISUAL_MS,
            EffectType::Strike { .. } => DEFAULT_STRIKE_MS,
        }
    }
}

/// Manager for all active visual effects
#[derive(Debug, Default)]
pub struct VfxManager {
    pub effects: Vec<VisualEffect>,
}

impl VfxManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, effect: VisualEffect) {
        self.effects.push(effect);
    }

    /// Burst at the HP anchor; lasts at least `HP_IMPACT_MIN_MS`
    pub fn spawn_hp_impact(&mut self, pos: Vec2, hit_ms: f32) {
        let (r0, r1) = HP_IMPACT_RADII;
        let duration = HP_IMPACT_MIN_MS.max(hit_ms + 80.0);
        self.spawn(VisualEffect::with_duration(
            pos,
            EffectType::HpImpact { r0, r1 },
            duration,
        ));
    }

    pub fn spawn_death_burst(&mut self, pos: Vec2) {
        let (r0, r1) = DEATH_IMPACT_RADII;
        self.spawn(VisualEffect::with_duration(
            pos,
            EffectType::DeathBurst { r0, r1 },
            HP_IMPACT_MIN_MS.max(DEATH_IMPACT_MS),
        ));
    }

    pub fn spawn_enemy_impact(&mut self, pos: Vec2, element: Element) {
        self.spawn(VisualEffect::new(pos, EffectType::EnemyImpact { element }));
    }

    pub fn spawn_strike(&mut self, from: Vec2, to: Vec2, duration_ms: f32) {
        self.spawn(VisualEffect::with_duration(
            from,
            EffectType::Strike { to },
            duration_ms,
        ));
    }

    /// Age all effects, removing finished ones
    pub fn update(&mut self, dt_ms: f32) {
        self.effects.retain_mut(|effect| effect.update(dt_ms));
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    /// Spawn the effects an event implies
    pub fn handle_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::ImpactApplied { pos, element, .. }
            | GameEvent::ImpactSkipped { pos, element, .. } => {
                self.spawn_enemy_impact(*pos, *element);
            }
            GameEvent::StrikeStarted {
                from,
                to,
                strike_ms,
                ..
            } => {
                self.spawn_strike(*from, *to, *strike_ms);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_expire() {
        let mut vfx = VfxManager::new();
        vfx.spawn_hp_impact(Vec2::ZERO, 120.0);
        vfx.spawn_enemy_impact(Vec2::ZERO, Element::Fire);
        assert_eq!(vfx.effects.len(), 2);
        vfx.update(210.0);
        assert_eq!(vfx.effects.len(), 2);
        vfx.update(20.0);
        // hp impact lasts max(220, 120 + 80)
        assert_eq!(vfx.effects.len(), 1);
        vfx.update(STRIKE_IMPACT_VISUAL_MS);
        assert!(vfx.effects.is_empty());
    }

    #[test]
    fn test_missed_strike_still_flashes() {
        let mut vfx = VfxManager::new();
        vfx.handle_event(&GameEvent::ImpactSkipped {
            target: 3,
            missed: true,
            pos: Vec2::new(40.0, 80.0),
            element: Element::Water,
        });
        assert_eq!(vfx.effects.len(), 1);
        assert_eq!(vfx.effects[0].pos, Vec2::new(40.0, 80.0));
        assert!(matches!(
            vfx.effects[0].effect_type,
            EffectType::EnemyImpact {
                element: Element::Water
            }
        ));
    }

    #[test]
    fn test_burst_radius_grows() {
        let mut effect = VisualEffect::with_duration(
            Vec2::ZERO,
            EffectType::DeathBurst { r0: 8.0, r1: 56.0 },
            100.0,
        );
        assert_eq!(effect.radius(), Some(8.0));
        effect.update(50.0);
        assert_eq!(effect.radius(), Some(32.0));
    }
}
