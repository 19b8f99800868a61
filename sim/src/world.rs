//! World-state resources and the presentation snapshot.
//!
//! The `Snapshot` struct provides a serializable, read-only view of the
//! committed simulation state for whatever is drawing the battle.

use crate::components::*;
use bevy_ecs::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Live units keyed by id. Iteration is in ascending id order, which is the
/// order every phase visits units in.
#[derive(Resource, Debug, Default)]
pub struct UnitRoster {
    by_id: BTreeMap<UnitId, Entity>,
    ordered: Vec<Entity>,
}

impl UnitRoster {
    pub fn insert(&mut self, id: UnitId, entity: Entity) -> Option<Entity> {
        let previous = self.by_id.insert(id, entity);
        self.reindex();
        previous
    }

    pub fn remove(&mut self, id: UnitId) -> Option<Entity> {
        let removed = self.by_id.remove(&id);
        if removed.is_some() {
            self.reindex();
        }
        removed
    }

    fn reindex(&mut self) {
        self.ordered = self.by_id.values().copied().collect();
    }

    pub fn get(&self, id: UnitId) -> Option<Entity> {
        self.by_id.get(&id).copied()
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Unit entities in ascending id order.
    pub fn entities(&self) -> &[Entity] {
        &self.ordered
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, Entity)> + '_ {
        self.by_id.iter().map(|(id, e)| (*id, *e))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Simulation clock.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimClock {
    pub tick: u64,
    pub time: f32,
}

/// Side that has won the battle, once decided.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Winner(pub Option<Faction>);

/// The one random source of the simulation.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub ChaCha8Rng);

/// System that advances the clock by one timestep.
pub fn advance_clock_system(config: Res<crate::config::SimConfig>, mut clock: ResMut<SimClock>) {
    clock.tick += 1;
    clock.time += config.fixed_timestep;
}

/// Snapshot of a single fighter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FighterSnapshot {
    pub x: f32,
    pub y: f32,
    pub direction: f32,
    pub ready: ReadyState,
}

/// Snapshot of a single unit's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: u32,
    pub faction: Faction,
    pub x: f32,
    pub y: f32,
    pub direction: f32,
    pub mode: UnitMode,
    pub morale: f32,
    pub influence: f32,
    pub routing: bool,
    pub fighters: Vec<FighterSnapshot>,
}

/// Committed simulation state for presentation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time.
    pub time: f32,
    pub winner: Option<Faction>,
    /// Units in ascending id order.
    pub units: Vec<UnitSnapshot>,
    /// Ranged attacks still in flight.
    pub shootings_in_flight: usize,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &World) -> Self {
        let clock = world.get_resource::<SimClock>().copied().unwrap_or_default();
        let winner = world.get_resource::<Winner>().and_then(|w| w.0);
        let shootings_in_flight = world
            .get_resource::<crate::events::Shootings>()
            .map(|s| s.0.len())
            .unwrap_or(0);
        let order: Vec<Entity> = world
            .get_resource::<UnitRoster>()
            .map(|r| r.entities().to_vec())
            .unwrap_or_default();

        let mut units = Vec::with_capacity(order.len());
        for unit in order {
            let (Some(id), Some(faction), Some(state), Some(members)) = (
                world.get::<UnitId>(unit),
                world.get::<Faction>(unit),
                world.get::<UnitState>(unit),
                world.get::<Fighters>(unit),
            ) else {
                continue;
            };

            let fighters = members
                .0
                .iter()
                .filter_map(|&f| world.get::<FighterState>(f))
                .map(|fs| FighterSnapshot {
                    x: fs.position.x,
                    y: fs.position.y,
                    direction: fs.direction,
                    ready: fs.ready,
                })
                .collect();

            units.push(UnitSnapshot {
                id: id.0,
                faction: *faction,
                x: state.center.x,
                y: state.center.y,
                direction: state.direction,
                mode: state.mode,
                morale: state.morale,
                influence: state.influence,
                routing: state.is_routing(),
                fighters,
            });
        }

        Self {
            tick: clock.tick,
            time: clock.time,
            winner,
            units,
            shootings_in_flight,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Live fighters per faction.
    pub fn fighter_count(&self, faction: Faction) -> usize {
        self.units
            .iter()
            .filter(|u| u.faction == faction)
            .map(|u| u.fighters.len())
            .sum()
    }
}
