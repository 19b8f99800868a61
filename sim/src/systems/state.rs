//! Two-phase state update.
//!
//! `compute_next_state_system` derives every unit's and fighter's next
//! state from committed state only, writing the result into the staged
//! components. `commit_next_state_system` then copies staged over committed
//! in one go, so no entity ever observes a half-updated neighbour.

use super::morale::{allied_influence, next_morale, RoutRules, UnitSummary, ROUTED_MORALE};
use super::movement::{MovementResource, UnitView};
use super::readiness::{advance_readiness, ReadinessContext};
use super::targeting::advance_shooting;
use crate::components::*;
use crate::config::SimConfig;
use crate::spatial::{FighterGrid, WeaponGrid};
use crate::terrain::TerrainResource;
use crate::world::{SimRng, UnitRoster, Winner};
use bevy_ecs::prelude::*;
use glam::Vec2;

/// Distance to the final destination that separates Standing from Moving.
pub const MOVING_THRESHOLD: f32 = 25.0;

/// Personal space kept between any two fighters.
pub const FIGHTER_SPACING: f32 = 0.9;

/// Distance kept from enemy weapon tips.
pub const WEAPON_CLEARANCE: f32 = 0.75;

/// Radius around a fighter's weapon tip searched for a new opponent.
pub const STRIKE_RADIUS: f32 = 1.1;

/// Fighters resample the terrain after moving this far.
pub const TERRAIN_RESAMPLE_DISTANCE: f32 = 5.0;

/// Mode a unit switches to for its next state.
pub fn next_unit_mode(mode: UnitMode, center: Vec2, final_destination: Vec2) -> UnitMode {
    match mode {
        UnitMode::Initializing => UnitMode::Standing,
        UnitMode::Standing if center.distance(final_destination) > MOVING_THRESHOLD => {
            UnitMode::Moving
        }
        UnitMode::Moving if center.distance(final_destination) <= MOVING_THRESHOLD => {
            UnitMode::Standing
        }
        mode => mode,
    }
}

/// Mean of the given positions, or `None` when there are none.
pub fn mean_position(positions: impl IntoIterator<Item = Vec2>) -> Option<Vec2> {
    let (sum, count) = positions
        .into_iter()
        .fold((Vec2::ZERO, 0usize), |(sum, n), p| (sum + p, n + 1));
    (count > 0).then(|| sum / count as f32)
}

/// Velocity toward `destination`, capped at `speed` and never overshooting.
pub fn steer_toward(position: Vec2, destination: Vec2, speed: f32) -> Vec2 {
    let diff = destination - position;
    if diff.length_squared() < 0.01 {
        return diff;
    }
    let delta = diff.normalize() * speed;
    if delta.length_squared() < diff.length_squared() {
        delta
    } else {
        diff
    }
}

/// Average of the given pushes; zero when there are none.
pub fn average_push(pushes: impl IntoIterator<Item = Vec2>) -> Vec2 {
    let (sum, count) = pushes
        .into_iter()
        .fold((Vec2::ZERO, 0usize), |(sum, n), p| (sum + p, n + 1));
    if count == 0 {
        Vec2::ZERO
    } else {
        sum / count as f32
    }
}

/// Push of length `clearance` pointing from `obstacle` to `position`.
/// Coincident points push with zero length.
#[inline]
pub fn push_away(position: Vec2, obstacle: Vec2, clearance: f32) -> Vec2 {
    (position - obstacle).normalize_or_zero() * clearance
}

/// Committed unit data gathered once per unit for its fighters' update.
struct UnitContext<'a> {
    entity: Entity,
    faction: Faction,
    stats: &'a UnitStats,
    state: &'a UnitState,
    movement: &'a UnitMovement,
    formation: &'a Formation,
    fighter_count: usize,
}

impl UnitContext<'_> {
    fn view(&self) -> UnitView<'_> {
        UnitView {
            state: self.state,
            stats: self.stats,
            movement: self.movement,
            formation: self.formation,
            fighter_count: self.fighter_count,
        }
    }
}

type UnitQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static Faction,
        &'static UnitStats,
        &'static UnitState,
        &'static UnitMovement,
        &'static Formation,
        &'static Fighters,
    ),
>;

/// Compute the staged state of every unit and fighter, in roster order.
#[allow(clippy::too_many_arguments)]
pub fn compute_next_state_system(
    config: Res<SimConfig>,
    roster: Res<UnitRoster>,
    winner: Res<Winner>,
    fighter_grid: Res<FighterGrid>,
    weapon_grid: Res<WeaponGrid>,
    planner: Res<MovementResource>,
    terrain: Option<Res<TerrainResource>>,
    mut rng: ResMut<SimRng>,
    units: UnitQuery,
    mut next_units: Query<&mut NextUnitState>,
    fighters: Query<(&FighterState, &FighterSlot)>,
    mut next_fighters: Query<(&mut NextFighterState, &mut TerrainSample)>,
) {
    let dt = config.fixed_timestep;
    let rules = RoutRules {
        winner: winner.0,
        practice: config.practice,
        world_size: config.world_size,
    };

    let summaries: Vec<UnitSummary> = roster
        .entities()
        .iter()
        .filter_map(|&entity| {
            let (faction, stats, state, ..) = units.get(entity).ok()?;
            Some(UnitSummary {
                entity,
                faction: *faction,
                center: state.center,
                morale: state.morale,
                training_level: stats.training_level,
            })
        })
        .collect();

    for &entity in roster.entities() {
        let Ok((faction, stats, state, movement, formation, members)) = units.get(entity) else {
            continue;
        };
        let unit = UnitContext {
            entity,
            faction: *faction,
            stats,
            state,
            movement,
            formation,
            fighter_count: members.0.len(),
        };

        let next = next_unit_state(&unit, &members.0, &fighters, &summaries, &rules, dt, &mut rng);
        if let Ok(mut staged) = next_units.get_mut(entity) {
            staged.0 = next;
        }

        for &fighter in &members.0 {
            let Ok((current, slot)) = fighters.get(fighter) else {
                continue;
            };
            let Ok((mut staged, mut sample)) = next_fighters.get_mut(fighter) else {
                continue;
            };
            staged.0 = next_fighter_state(
                fighter,
                current,
                slot.0,
                &unit,
                &fighters,
                &fighter_grid,
                &weapon_grid,
                &planner,
                terrain.as_deref(),
                &mut sample,
                dt,
            );
        }
    }
}

fn next_unit_state(
    unit: &UnitContext<'_>,
    members: &[Entity],
    fighters: &Query<(&FighterState, &FighterSlot)>,
    summaries: &[UnitSummary],
    rules: &RoutRules,
    dt: f32,
    rng: &mut SimRng,
) -> UnitState {
    let current = unit.state;
    let mut next = UnitState {
        direction: unit.movement.direction,
        mode: next_unit_mode(current.mode, current.center, unit.movement.final_destination()),
        recent_casualties: 0,
        ..*current
    };

    if current.mode != UnitMode::Initializing {
        let positions = members
            .iter()
            .filter_map(|&f| fighters.get(f).ok())
            .map(|(fs, _)| fs.position);
        if let Some(center) = mean_position(positions) {
            next.center = center;
        }
    }

    advance_shooting(
        current,
        &mut next,
        unit.faction,
        unit.stats.maximum_range,
        summaries,
        dt,
        &mut rng.0,
    );

    let training = unit.stats.training_level;
    next.morale = next_morale(current, training);
    next.influence = allied_influence(unit.faction, current.center, training, summaries);
    if rules.forced_rout(
        unit.faction,
        unit.fighter_count,
        current.is_routing(),
        next.center,
    ) {
        next.morale = ROUTED_MORALE;
    }

    if next.is_routing() && !current.is_routing() {
        tracing::debug!(unit = ?unit.entity, morale = next.morale, "unit routs");
    }
    next
}

#[allow(clippy::too_many_arguments)]
fn next_fighter_state(
    fighter: Entity,
    current: &FighterState,
    slot: usize,
    unit: &UnitContext<'_>,
    fighters: &Query<(&FighterState, &FighterSlot)>,
    fighter_grid: &FighterGrid,
    weapon_grid: &WeaponGrid,
    planner: &MovementResource,
    terrain: Option<&TerrainResource>,
    sample: &mut TerrainSample,
    dt: f32,
) -> FighterState {
    let stats = unit.stats;
    let routing = unit.state.is_routing();
    let opponent = current
        .opponent
        .and_then(|e| fighters.get(e).ok().map(|(fs, _)| (e, fs.position)));

    let mut next = FighterState::default();

    // position
    next.position = if unit.state.mode == UnitMode::Initializing {
        planner.0.next_destination(&unit.view(), slot)
    } else {
        let moved = current.position + current.velocity * dt;
        let crowding = fighter_grid
            .0
            .query(moved.x, moved.y, FIGHTER_SPACING)
            .filter(|e| e.fighter != fighter)
            .filter(|e| e.position.distance_squared(moved) < FIGHTER_SPACING * FIGHTER_SPACING)
            .map(|e| push_away(moved, e.position, FIGHTER_SPACING));
        let threats = weapon_grid
            .0
            .query(moved.x, moved.y, WEAPON_CLEARANCE)
            .filter(|e| e.faction != unit.faction)
            .map(|e| push_away(moved, e.position, WEAPON_CLEARANCE));
        moved + average_push(crowding.chain(threats))
    };

    // velocity
    let mut speed = if routing || unit.movement.running {
        stats.running_speed
    } else {
        stats.walking_speed
    };
    if matches!(current.ready, ReadyState::Striking | ReadyState::Stunned) {
        speed = stats.walking_speed / 4.0;
    }
    let needs_sample = sample
        .position
        .map_or(true, |p| p.distance(current.position) > TERRAIN_RESAMPLE_DISTANCE);
    if needs_sample {
        let (forest, water) = terrain
            .map(|t| t.classify(current.position.x, current.position.y))
            .unwrap_or((false, false));
        *sample = TerrainSample {
            position: Some(current.position),
            forest,
            water,
        };
    }
    if sample.forest {
        speed *= if stats.platform.is_mounted() { 0.5 } else { 0.9 };
    }
    next.velocity = steer_toward(current.position, current.destination, speed);

    // direction
    next.direction = if unit.state.mode == UnitMode::Moving {
        angle_of(current.velocity)
    } else if let Some((_, position)) = opponent {
        angle_of(position - current.position)
    } else {
        unit.state.direction
    };

    // opponent
    let reach = stats.weapon_reach;
    next.opponent = match opponent {
        Some((e, position)) if current.position.distance(position) <= reach * 2.0 => Some(e),
        _ if unit.state.mode != UnitMode::Moving && !routing => {
            let tip = current.weapon_tip(reach);
            fighter_grid
                .0
                .query(tip.x, tip.y, STRIKE_RADIUS)
                .find(|e| e.faction != unit.faction && e.fighter != fighter)
                .map(|e| e.fighter)
        }
        _ => None,
    };

    // destination
    next.destination = match (opponent, current.ready) {
        (Some((_, position)), _) => position - vector_from_angle(current.direction) * reach,
        (None, ReadyState::Unready | ReadyState::Readying | ReadyState::Prepared) => {
            planner.0.next_destination(&unit.view(), slot)
        }
        (None, ReadyState::Striking | ReadyState::Stunned) => current.position,
    };

    advance_readiness(
        current,
        &mut next,
        &ReadinessContext {
            unit_mode: unit.state.mode,
            has_movement_target: unit.movement.target.is_some(),
            readying_duration: stats.readying_duration,
            striking_duration: stats.striking_duration,
            dt,
        },
    );
    next
}

/// Copy staged state over committed state. Routing units stop moving.
pub fn commit_next_state_system(
    roster: Res<UnitRoster>,
    mut units: Query<(&NextUnitState, &mut UnitState, &mut UnitMovement, &Fighters)>,
    mut fighters: Query<(&NextFighterState, &mut FighterState)>,
) {
    for &entity in roster.entities() {
        let Ok((next, mut state, mut movement, members)) = units.get_mut(entity) else {
            continue;
        };
        *state = next.0;
        if state.is_routing() {
            movement.halt(state.center);
        }

        for &fighter in &members.0 {
            if let Ok((next, mut state)) = fighters.get_mut(fighter) {
                *state = next.0;
            }
        }
    }
}
