//! Formation layout: row lines, collision-free placement, recompaction and
//! the shared reposition shift.
//!
//! Row 1 is the front line at the bottom of the field; higher rows sit
//! further up the screen.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;

use crate::components::{EnemyId, FormationSlot, Health, Identity, Position};
use crate::config::{FieldAnchor, FieldConfig};
use crate::constants::*;
use crate::roster::Roster;
use crate::systems::animation::{ease_in_out_quad, phase_progress};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl FieldRect {
    /// Horizontal position of a fractional column
    pub fn x_at(&self, col: f32) -> f32 {
        let col = if col.is_finite() { col.clamp(0.0, 1.0) } else { 0.5 };
        self.x + col * self.w
    }
}

pub fn field_rect(field: &FieldConfig) -> FieldRect {
    let w = (CANVAS_WIDTH * field.width_ratio.clamp(0.0, 1.0)).floor();
    let h = CANVAS_HEIGHT - field.padding.top - field.padding.bottom;
    let x = match field.anchor {
        FieldAnchor::Left => field.padding.left,
        FieldAnchor::Right => (CANVAS_WIDTH - w - field.padding.right).max(0.0),
        FieldAnchor::Center => ((CANVAS_WIDTH - w) / 2.0).floor(),
    };
    FieldRect {
        x,
        y: field.padding.top,
        w,
        h,
    }
}

/// Number of row lines drawn for a field
pub fn row_count(field: &FieldConfig) -> u32 {
    field.rows.max(FIELD_MIN_ROWS)
}

/// Y of each row line, front row first
pub fn row_lines(field: &FieldConfig, rect: &FieldRect) -> Vec<f32> {
    let rows = row_count(field);
    let usable = rect.h - field.line_inset_top - field.line_inset_bottom;
    let auto_step = usable / (rows - 1) as f32;
    let step = match field.line_step {
        Some(step) if step > 0.0 => step.min(auto_step),
        _ => auto_step,
    };
    let y0 = rect.y + rect.h - field.line_inset_bottom;
    (0..rows).map(|i| y0 - i as f32 * step).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutTarget {
    pub id: EnemyId,
    pub pos: Vec2,
}

struct Placed {
    id: EnemyId,
    x: f32,
    base_y: f32,
    rel_offset: f32,
    radius: f32,
}

/// Solve every enemy's absolute position without touching the roster.
///
/// Rows are placed front to back. Each row keeps its natural center unless a
/// member would come within `min_row_gap` of a circle already placed in a
/// nearer row, in which case the whole row moves up just far enough.
pub fn compute_layout(field: &FieldConfig, min_row_gap: f32, roster: &Roster) -> Vec<LayoutTarget> {
    puffin::profile_function!();

    let rect = field_rect(field);
    let rows = row_count(field);
    let lines = row_lines(field, &rect);
    let line_y = |row: u32| lines[(row.clamp(1, rows) - 1) as usize];

    let mut by_row: BTreeMap<u32, Vec<(EnemyId, FormationSlot)>> = BTreeMap::new();
    for (_, (ident, slot)) in roster.world().query::<(&Identity, &FormationSlot)>().iter() {
        by_row
            .entry(slot.row.clamp(1, rows))
            .or_default()
            .push((ident.id, *slot));
    }

    let mut targets = Vec::new();
    let mut fixed: Vec<(Vec2, f32)> = Vec::new();

    for (row, mut members) in by_row {
        members.sort_by_key(|(id, _)| *id);
        let avg_offset =
            members.iter().map(|(_, s)| s.line_offset).sum::<f32>() / members.len() as f32;
        let center = line_y(row) + avg_offset;
        let placed: Vec<Placed> = members
            .iter()
            .map(|(id, slot)| Placed {
                id: *id,
                x: rect.x_at(slot.col),
                base_y: center,
                rel_offset: slot.line_offset - avg_offset,
                radius: slot.radius.max(0.0),
            })
            .collect();

        let natural = placed.iter().map(|p| p.base_y).sum::<f32>() / placed.len() as f32;
        let mut row_center = natural;
        for p in &placed {
            for (q, q_radius) in &fixed {
                let dx = (q.x - p.x).abs();
                let reach = q_radius + p.radius + min_row_gap;
                if dx >= reach {
                    continue;
                }
                let need_dy = (reach * reach - dx * dx).max(0.0).sqrt();
                row_center = row_center.min(q.y - need_dy);
            }
        }

        let widest = placed.iter().map(|p| p.radius).fold(0.0_f32, f32::max);
        row_center = row_center.max(rect.y + widest);

        for p in placed {
            let min_y = rect.y + p.radius;
            let max_y = (rect.y + rect.h - p.radius).max(min_y);
            let y = (row_center + p.rel_offset).clamp(min_y, max_y);
            let pos = Vec2::new(p.x, y);
            targets.push(LayoutTarget { id: p.id, pos });
            fixed.push((pos, p.radius));
        }
    }

    targets
}

/// Write layout targets straight into the roster
pub fn apply_layout(roster: &mut Roster, targets: &[LayoutTarget]) {
    for target in targets {
        let Some(entity) = roster.entity(target.id) else {
            continue;
        };
        if let Ok(mut pos) = roster.world().get::<&mut Position>(entity) {
            pos.0 = target.pos;
        }
    }
}

/// Compact the rows of living enemies so the occupied rows become 1..n.
/// Returns true when any row changed.
pub fn advance_formation_if_needed(roster: &mut Roster) -> bool {
    let mut occupied: Vec<u32> = roster
        .world()
        .query::<(&FormationSlot, &Health)>()
        .iter()
        .filter(|(_, (_, health))| health.is_alive())
        .map(|(_, (slot, _))| slot.row)
        .collect();
    occupied.sort_unstable();
    occupied.dedup();

    if occupied.iter().enumerate().all(|(i, row)| *row == i as u32 + 1) {
        return false;
    }

    let mapping: HashMap<u32, u32> = occupied
        .iter()
        .enumerate()
        .map(|(i, row)| (*row, i as u32 + 1))
        .collect();

    let mut changed = false;
    for (_, (slot, health)) in roster
        .world_mut()
        .query_mut::<(&mut FormationSlot, &Health)>()
    {
        if !health.is_alive() {
            continue;
        }
        if let Some(next) = mapping.get(&slot.row) {
            if *next != slot.row {
                tracing::debug!(from = slot.row, to = *next, "formation row advanced");
                slot.row = *next;
                changed = true;
            }
        }
    }
    changed
}

/// One shared tween moving every survivor to its new layout target
#[derive(Debug, Clone)]
pub struct FormationShift {
    started_at: f64,
    duration_ms: f32,
    moves: Vec<(EnemyId, Vec2, Vec2)>,
}

impl FormationShift {
    /// Capture start positions from the roster. Enemies without a target keep
    /// their place.
    pub fn new(roster: &Roster, targets: &[LayoutTarget], now: f64, duration_ms: f32) -> Self {
        let moves = targets
            .iter()
            .filter_map(|t| roster.position(t.id).map(|from| (t.id, from, t.pos)))
            .collect();
        Self {
            started_at: now,
            duration_ms,
            moves,
        }
    }

    /// Advance the tween. Returns true once every enemy has arrived.
    pub fn update(&self, roster: &mut Roster, now: f64) -> bool {
        let k = phase_progress(now, self.started_at, self.duration_ms);
        let ease = ease_in_out_quad(k);
        for (id, from, to) in &self.moves {
            let Some(entity) = roster.entity(*id) else {
                continue;
            };
            if let Ok(mut pos) = roster.world().get::<&mut Position>(entity) {
                pos.0 = from.lerp(*to, ease);
            }
        }
        k >= 1.0
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}
