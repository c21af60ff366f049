//! Headless skirmish runner.
//!
//! Loads a config (the JSON path given as the first argument, or the built-in
//! demo encounter), then plays a scripted fight on a fixed 16 ms frame step
//! and prints every event. Set `SKIRMISH_PROFILE=1` to record puffin frames.

use skirmish_core::{
    AbilityKind, CombatConfig, CombatError, CombatSession, GameEvent, HitOptions, HitOutcome,
};

const FRAME_MS: f64 = 16.0;
const MAX_FRAMES: u32 = 20_000;
const HP_ANCHOR_Y: f32 = 500.0;

const DEMO_CONFIG: &str = r#"{
    "field": { "rows": 4 },
    "player": { "hpMax": 400, "hp": 400, "hits": 20, "maxHits": 20, "luck": 30, "def": 1,
                "attack": { "min": 4, "max": 12 },
                "elements": { "earth": 25, "fire": 30, "water": 20, "cosmos": 10 } },
    "boss": { "type": 1, "element": "cosmos", "hp": 60, "atk": 20 },
    "minions": [
        { "id": 1, "type": 1, "element": "fire", "hp": 14, "atk": 6, "row": 1, "col": 0.25 },
        { "id": 2, "type": 2, "element": "water", "hp": 18, "atk": 5, "row": 1, "col": 0.75 },
        { "id": 3, "type": 1, "element": "earth", "hp": 16, "atk": 7, "row": 2, "col": 0.5 },
        { "id": 4, "type": 3, "element": "green", "hp": 12, "atk": 4, "row": 3, "col": 0.3 }
    ],
    "weapons": [
        { "id": 1, "name": "Sword", "retaliationRule": "t1", "strikeMs": 480,
          "miss": { "baseByPos": [0, 5, 10, 15] } },
        { "id": 2, "name": "Spear", "retaliationRule": "t2", "strikeMs": 380,
          "miss": { "baseByPos": [5, 5, 10, 20] } },
        { "id": 3, "name": "Flail", "retaliationRule": "t3", "strikeMs": 640,
          "miss": { "baseByPos": [10, 10, 10, 10] } }
    ],
    "elementMatrix": {
        "fire": { "earth": 1.5, "water": 0.5 },
        "water": { "fire": 1.5, "earth": 0.5 },
        "earth": { "water": 1.5, "fire": 0.5 }
    },
    "timer": { "turnMs": 4000, "regen": { "minionPct": 5, "bossPct": 2 } }
}"#;

/// Weapon, ability and element for each scripted turn, cycled
const SCRIPT: [(u32, AbilityKind, Option<skirmish_core::Element>); 6] = [
    (1, AbilityKind::Basic, None),
    (1, AbilityKind::Split, None),
    (2, AbilityKind::Point, Some(skirmish_core::Element::Fire)),
    (2, AbilityKind::Pierce, None),
    (3, AbilityKind::Bounce, None),
    (1, AbilityKind::Shift, None),
];

fn main() -> Result<(), CombatError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let profiling = std::env::var_os("SKIRMISH_PROFILE").is_some();
    puffin::set_scopes_on(profiling);

    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(%path, "loading config");
            CombatConfig::load(&path)?
        }
        None => CombatConfig::from_json_str(DEMO_CONFIG)?,
    };

    let mut session = CombatSession::new(config, 0x5eed);
    session.set_hp_anchor(Some(HP_ANCHOR_Y));
    session.add_listener(|event: &GameEvent| -> Result<(), CombatError> {
        if let GameEvent::PlayerDefeated = event {
            tracing::warn!("the player has fallen");
        }
        Ok(())
    });

    let mut step = 0usize;
    let mut finished = false;
    for frame in 0..MAX_FRAMES {
        if profiling {
            puffin::GlobalProfiler::lock().new_frame();
        }

        if !session.is_input_locked() && !finished {
            finished = !take_turn(&mut session, &mut step)?;
        }

        session.tick(FRAME_MS);
        for event in session.drain_events() {
            println!("[{:>7.0} ms] {}", session.now(), describe(&event));
            if matches!(event, GameEvent::PlayerDefeated | GameEvent::OutOfTurns) {
                finished = true;
            }
        }

        if finished && !session.is_input_locked() {
            tracing::info!(frame, "skirmish over");
            break;
        }
    }

    let player = session.player();
    println!(
        "player hp {}/{}, actions left {}, enemies left {}",
        player.hp,
        player.hp_max,
        player.actions_remaining,
        session.enemies().iter().filter(|e| e.is_alive()).count()
    );
    Ok(())
}

/// Play the next scripted action. Returns false once nothing is left to hit.
fn take_turn(session: &mut CombatSession, step: &mut usize) -> Result<bool, CombatError> {
    let Some(target) = session
        .enemies()
        .into_iter()
        .filter(|e| e.is_alive() && !e.animating)
        .min_by_key(|e| (e.row, e.id))
        .map(|e| e.id)
    else {
        let anyone_left = session.enemies().iter().any(|e| e.is_alive());
        return Ok(anyone_left);
    };
    if session.player().actions_remaining == 0 || !session.player().is_alive() {
        return Ok(false);
    }

    let (weapon, ability, element) = SCRIPT[*step % SCRIPT.len()];
    *step += 1;
    let opts = HitOptions {
        element,
        ..HitOptions::default()
    };

    match session.strike(target, weapon, ability, &opts) {
        Ok(HitOutcome::Skip(reason)) => tracing::debug!(target, ?reason, "scripted strike skipped"),
        Ok(_) => {}
        Err(err @ (CombatError::AbilityLocked { .. } | CombatError::InputLocked)) => {
            tracing::debug!(%err, "scripted action unavailable");
        }
        Err(err) => return Err(err),
    }
    Ok(true)
}

fn describe(event: &GameEvent) -> String {
    match event {
        GameEvent::AbilityUsed {
            ability,
            target,
            total,
            cost,
        } => format!("{ability} on #{target}: {total} damage rolled, cost {cost}"),
        GameEvent::StrikeStarted { target, .. } => format!("strike launched at #{target}"),
        GameEvent::ImpactApplied {
            target,
            damage,
            crit,
            now_hp,
            ..
        } => format!(
            "#{target} takes {damage}{} -> {now_hp} hp",
            if *crit { " (crit)" } else { "" }
        ),
        GameEvent::ImpactSkipped { target, missed, .. } => {
            format!("#{target} {}", if *missed { "dodges" } else { "shrugs it off" })
        }
        GameEvent::EnemyDied { enemy, .. } => format!("#{enemy} falls"),
        GameEvent::DeathBatchFinalized { batch, removed } => {
            format!("death batch {batch} cleared {removed:?}")
        }
        GameEvent::FormationShifted { moved, advanced } => format!(
            "formation shifts {moved} enemies{}",
            if *advanced { ", rows advance" } else { "" }
        ),
        GameEvent::RetaliationStarted { wave, enemies } => {
            format!("retaliation wave {wave}: {enemies:?}")
        }
        GameEvent::PlayerDamaged {
            amount, enemy, hp, ..
        } => format!("#{enemy} hits the player for {amount} -> {hp} hp"),
        GameEvent::RetaliationComplete { wave } => format!("retaliation wave {wave} done"),
        GameEvent::ElementShifted {
            target, from, to, ..
        } => format!("#{target} shifts {from:?} -> {to:?}"),
        GameEvent::EnemiesRegenerated { healed } => format!("enemies regenerate {healed:?}"),
        GameEvent::TurnElapsed { remaining } => format!("turn passes, {remaining} actions left"),
        GameEvent::OutOfTurns => "out of turns".to_string(),
        GameEvent::PlayerDefeated => "player defeated".to_string(),
    }
}
