//! End-of-tick removal of dead fighters and destroyed units.
//!
//! Despawns go through `Commands`, so they land at the sync point after
//! each system. Both systems keep the roster and the per-unit fighter lists
//! in step with what will be despawned.

use crate::components::*;
use crate::config::SimConfig;
use crate::events::{CasualtyRecord, RecentEvents};
use crate::world::UnitRoster;
use bevy_ecs::prelude::*;
use glam::Vec2;

/// Whether `position` lies inside the circle inscribed in the world square.
///
/// Fighters outside it have left the battlefield.
pub fn is_on_battlefield(position: Vec2, world_size: f32) -> bool {
    let radius = world_size / 2.0;
    position.distance_squared(Vec2::splat(radius)) < radius * radius
}

/// Remove flagged fighters, drown routing fighters caught in water and drop
/// fighters that wandered off the battlefield.
///
/// Casualties are counted on their unit and reported; strays are removed
/// silently. Surviving fighters are renumbered so their slots stay dense.
pub fn remove_casualties_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    roster: Res<UnitRoster>,
    mut recent: ResMut<RecentEvents>,
    mut units: Query<(&Faction, &UnitStats, &mut UnitState, &mut Fighters)>,
    mut fighters: Query<(&mut FighterState, &TerrainSample, &mut FighterSlot)>,
    flags: Query<&CasualtyFlag>,
) {
    for (mut state, ..) in fighters.iter_mut() {
        if let Some(opponent) = state.opponent {
            if flags.get(opponent).map_or(true, |flag| flag.0) {
                state.opponent = None;
            }
        }
    }

    for &unit in roster.entities() {
        let Ok((faction, stats, mut state, mut members)) = units.get_mut(unit) else {
            continue;
        };
        let routing = state.is_routing();
        let mut survivors = Vec::with_capacity(members.0.len());
        let mut stragglers = 0usize;

        for &fighter in &members.0 {
            let Ok((fs, sample, mut slot)) = fighters.get_mut(fighter) else {
                continue;
            };
            let killed = flags.get(fighter).is_ok_and(|flag| flag.0);
            let drowned = routing && sample.water;

            if killed || drowned {
                state.recent_casualties += 1;
                recent.casualties.push(CasualtyRecord {
                    position: fs.position,
                    faction: *faction,
                    platform: stats.platform,
                });
                commands.entity(fighter).despawn();
            } else if !is_on_battlefield(fs.position, config.world_size) {
                stragglers += 1;
                commands.entity(fighter).despawn();
            } else {
                slot.0 = survivors.len();
                survivors.push(fighter);
            }
        }

        if survivors.len() != members.0.len() {
            tracing::trace!(
                ?unit,
                casualties = state.recent_casualties,
                stragglers,
                remaining = survivors.len(),
                "fighters removed"
            );
        }
        members.0 = survivors;
    }
}

/// Remove units without fighters, then forget every reference to them.
pub fn remove_dead_units_system(
    mut commands: Commands,
    mut roster: ResMut<UnitRoster>,
    members: Query<&Fighters>,
    mut references: Query<(&mut UnitState, &mut UnitMovement)>,
) {
    let dead: Vec<(UnitId, Entity)> = roster
        .iter()
        .filter(|(_, unit)| members.get(*unit).map_or(true, |f| f.0.is_empty()))
        .collect();
    if dead.is_empty() {
        return;
    }

    for (id, unit) in dead {
        roster.remove(id);
        commands.entity(unit).despawn();
        tracing::info!(unit = id.0, "unit destroyed");
    }

    let alive = roster.entities();
    for &unit in alive {
        let Ok((mut state, mut movement)) = references.get_mut(unit) else {
            continue;
        };
        if state.ranged_target.unit.is_some_and(|t| !alive.contains(&t)) {
            state.ranged_target.release();
        }
        if movement.target.is_some_and(|t| !alive.contains(&t)) {
            movement.target = None;
        }
    }
}
