//! Movement collaborator - path following and per-fighter destinations.
//!
//! Route planning lives outside the combat core. Once per tick the core asks
//! it to advance each unit along its path (or away from the enemy when the
//! unit routs), then to name the point each fighter should walk toward.
//! `FormationMovement` is the stock implementation; hosts with a real path
//! planner install their own `MovementPlanner`.

use crate::components::*;
use crate::config::SimConfig;
use crate::world::UnitRoster;
use bevy_ecs::prelude::*;
use glam::Vec2;

/// Distance at which a waypoint counts as reached.
const WAYPOINT_RADIUS: f32 = 8.0;

/// How far ahead of the unit center a moving formation is anchored.
const FORMATION_LOOKAHEAD: f32 = 10.0;

/// Distance from a routing unit's center to its flight destination.
const FLIGHT_DISTANCE: f32 = 100.0;

/// Read-only view of a unit handed to the planner.
#[derive(Debug, Clone, Copy)]
pub struct UnitView<'a> {
    pub state: &'a UnitState,
    pub stats: &'a UnitStats,
    pub movement: &'a UnitMovement,
    pub formation: &'a Formation,
    pub fighter_count: usize,
}

pub trait MovementPlanner: Send + Sync {
    /// Progress path following for one unit. `target_center` is the center
    /// of the unit's movement target when it still exists.
    fn advance(
        &self,
        state: &UnitState,
        target_center: Option<Vec2>,
        movement: &mut UnitMovement,
        formation: &mut Formation,
        dt: f32,
    );

    /// Send a routing unit toward safety. `threat` is the center of the
    /// closest enemy unit, if there is one.
    fn flee(
        &self,
        state: &UnitState,
        threat: Option<Vec2>,
        world_size: f32,
        movement: &mut UnitMovement,
        formation: &mut Formation,
    );

    /// Point the fighter in `slot` should head for this tick.
    fn next_destination(&self, unit: &UnitView<'_>, slot: usize) -> Vec2;
}

/// Unit vector toward the closest side of the `[0, world_size]²` square.
pub fn toward_nearest_edge(position: Vec2, world_size: f32) -> Vec2 {
    [
        (position.x, Vec2::NEG_X),
        (world_size - position.x, Vec2::X),
        (position.y, Vec2::NEG_Y),
        (world_size - position.y, Vec2::Y),
    ]
    .into_iter()
    .min_by(|a, b| a.0.total_cmp(&b.0))
    .map_or(Vec2::NEG_X, |(_, direction)| direction)
}

/// Resource holding the installed planner.
#[derive(Resource)]
pub struct MovementResource(pub Box<dyn MovementPlanner>);

impl Default for MovementResource {
    fn default() -> Self {
        Self(Box::new(FormationMovement))
    }
}

/// Straight-line waypoint following with a rank-and-file formation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormationMovement;

impl MovementPlanner for FormationMovement {
    fn advance(
        &self,
        state: &UnitState,
        target_center: Option<Vec2>,
        movement: &mut UnitMovement,
        formation: &mut Formation,
        _dt: f32,
    ) {
        if let Some(center) = target_center {
            movement.path.clear();
            movement.destination = center;
        }

        while let Some(&waypoint) = movement.path.first() {
            if state.center.distance(waypoint) > WAYPOINT_RADIUS {
                break;
            }
            movement.path.remove(0);
            if movement.path.is_empty() {
                movement.destination = waypoint;
            }
        }

        let heading = movement
            .path
            .first()
            .copied()
            .unwrap_or(movement.destination);
        let steering = state.mode == UnitMode::Moving || target_center.is_some();
        if steering && state.center.distance(heading) > 1.0 {
            movement.direction = angle_of(heading - state.center);
        }

        formation.set_direction(movement.direction);
    }

    fn flee(
        &self,
        state: &UnitState,
        threat: Option<Vec2>,
        world_size: f32,
        movement: &mut UnitMovement,
        formation: &mut Formation,
    ) {
        // straight away from the enemy, or off the nearest edge if none is left
        let away = threat
            .map(|threat| (state.center - threat).normalize_or_zero())
            .filter(|away| *away != Vec2::ZERO)
            .unwrap_or_else(|| toward_nearest_edge(state.center, world_size));

        movement.path.clear();
        movement.target = None;
        movement.destination =
            (state.center + away * FLIGHT_DISTANCE).clamp(Vec2::ZERO, Vec2::splat(world_size));
        movement.direction = angle_of(away);
        formation.set_direction(movement.direction);
    }

    fn next_destination(&self, unit: &UnitView<'_>, slot: usize) -> Vec2 {
        let center = unit.state.center;
        let anchor = match unit.state.mode {
            UnitMode::Initializing => center,
            UnitMode::Standing => unit.movement.final_destination(),
            UnitMode::Moving => {
                let heading = unit
                    .movement
                    .path
                    .first()
                    .copied()
                    .unwrap_or(unit.movement.destination);
                let offset = heading - center;
                let distance = offset.length();
                if distance > FORMATION_LOOKAHEAD {
                    center + offset / distance * FORMATION_LOOKAHEAD
                } else {
                    heading
                }
            }
        };
        unit.formation
            .slot_position(anchor, unit.fighter_count, slot)
    }
}

/// Center of the `enemy` unit closest to `position`, first in roster order
/// on ties.
fn closest_enemy_center(
    roster: &UnitRoster,
    centers: &Query<(&Faction, &UnitState)>,
    enemy: Faction,
    position: Vec2,
) -> Option<Vec2> {
    roster
        .entities()
        .iter()
        .filter_map(|&e| centers.get(e).ok())
        .filter(|(faction, _)| **faction == enemy)
        .map(|(_, state)| state.center)
        .min_by(|a, b| {
            a.distance_squared(position)
                .total_cmp(&b.distance_squared(position))
        })
}

/// System that advances every unit's movement, in roster order. Routing
/// units flee instead of following their orders.
pub fn advance_movement_system(
    config: Res<SimConfig>,
    roster: Res<UnitRoster>,
    planner: Res<MovementResource>,
    mut units: Query<(&Faction, &UnitState, &mut UnitMovement, &mut Formation)>,
    centers: Query<(&Faction, &UnitState)>,
) {
    for &unit in roster.entities() {
        let Ok((faction, state, mut movement, mut formation)) = units.get_mut(unit) else {
            continue;
        };

        if state.is_routing() {
            let threat = closest_enemy_center(&roster, &centers, faction.opponent(), state.center);
            planner.0.flee(
                state,
                threat,
                config.world_size,
                &mut movement,
                &mut formation,
            );
            continue;
        }

        let target = movement.target;
        let target_center = match target {
            Some(target) => match centers.get(target) {
                Ok((_, target_state)) => Some(target_state.center),
                Err(_) => {
                    tracing::trace!(?unit, ?target, "movement target no longer valid");
                    movement.target = None;
                    None
                }
            },
            None => None,
        };

        planner.0.advance(
            state,
            target_center,
            &mut movement,
            &mut formation,
            config.fixed_timestep,
        );
    }
}
