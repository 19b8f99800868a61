//! Public API for the simulation.
//!
//! This module provides the main interface for a game client (or any other
//! host) to drive a battle.
//!
//! ## Fixed Timestep
//!
//! The simulation uses a fixed timestep internally (default 15 Hz). When
//! `advance_time(elapsed)` is called, the elapsed time is accumulated and
//! whole ticks run until less than one timestep remains. The remainder is
//! carried into the next call. Events produced by those ticks are handed to
//! the listener afterwards, and the winner is decided once per call.
//!
//! ## Commands
//!
//! Orders and queries are only valid between `advance_time` calls. They
//! address units by their caller-assigned `UnitId`.

use crate::components::*;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::events::{RecentEvents, Shooting, Shootings, SimulationListener};
use crate::spatial::{rebuild_spatial_index_system, FighterGrid, SpatialGrid, WeaponGrid};
use crate::systems::*;
use crate::terrain::{TerrainMap, TerrainResource};
use crate::world::{advance_clock_system, SimClock, SimRng, Snapshot, UnitRoster, Winner};
use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Description of a unit to add to the battle.
#[derive(Debug, Clone)]
pub struct UnitSpawn {
    pub id: UnitId,
    pub faction: Faction,
    pub stats: UnitStats,
    pub center: Vec2,
    /// Initial facing in radians.
    pub direction: f32,
    pub fighter_count: usize,
    pub formation: Formation,
}

impl UnitSpawn {
    pub fn new(id: u32, faction: Faction, center: Vec2, fighter_count: usize) -> Self {
        Self {
            id: UnitId(id),
            faction,
            stats: UnitStats::default(),
            center,
            direction: 0.0,
            fighter_count,
            formation: Formation::default(),
        }
    }

    pub fn with_stats(mut self, stats: UnitStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn facing(mut self, direction: f32) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_ranks(mut self, ranks: usize) -> Self {
        self.formation.number_of_ranks = ranks.max(1);
        self
    }
}

/// The battle simulation container.
///
/// Holds the ECS world and the tick schedule, providing a clean API for:
/// - Setting up units, terrain and collaborators
/// - Advancing the simulation
/// - Extracting state snapshots
/// - Issuing orders
pub struct BattleSim {
    world: World,
    schedule: Schedule,
    /// Time not yet consumed by a whole tick.
    time_accumulator: f64,
    listener: Option<Box<dyn SimulationListener + Send>>,
}

impl BattleSim {
    /// Create an empty battle with the default configuration.
    pub fn new() -> Self {
        Self::build(SimConfig::default())
    }

    /// Create an empty battle with a custom configuration.
    pub fn with_config(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimConfig) -> Self {
        let mut world = World::new();

        world.insert_resource(SimRng(ChaCha8Rng::seed_from_u64(config.seed)));
        world.insert_resource(FighterGrid(SpatialGrid::new(
            config.world_size,
            config.spatial_cell_size,
        )));
        world.insert_resource(WeaponGrid(SpatialGrid::new(
            config.world_size,
            config.spatial_cell_size,
        )));
        world.insert_resource(config);
        world.insert_resource(UnitRoster::default());
        world.insert_resource(SimClock::default());
        world.insert_resource(Winner::default());
        world.insert_resource(Shootings::default());
        world.insert_resource(RecentEvents::default());
        world.insert_resource(MovementResource::default());

        // Each phase reads what the previous one wrote, so the whole tick
        // is one chain on a single thread.
        let mut schedule = Schedule::default();
        schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        schedule.add_systems(
            (
                rebuild_spatial_index_system,
                advance_movement_system,
                compute_next_state_system,
                commit_next_state_system,
                resolve_melee_system,
                trigger_volleys_system,
                resolve_impacts_system,
                remove_casualties_system,
                remove_dead_units_system,
                advance_clock_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            time_accumulator: 0.0,
            listener: None,
        }
    }

    /// Create a small two-sided battle for demos and benchmarks.
    pub fn demo_battle() -> Result<Self> {
        let mut sim = Self::new();
        let toward_red = 0.0;
        let toward_blue = std::f32::consts::PI;

        sim.spawn_unit(UnitSpawn::new(1, Faction::Blue, Vec2::new(420.0, 480.0), 40).facing(toward_red))?;
        sim.spawn_unit(
            UnitSpawn::new(2, Faction::Blue, Vec2::new(400.0, 540.0), 32)
                .with_stats(UnitStats::archers())
                .facing(toward_red),
        )?;
        sim.spawn_unit(
            UnitSpawn::new(3, Faction::Blue, Vec2::new(410.0, 420.0), 16)
                .with_stats(UnitStats::cavalry())
                .with_ranks(2)
                .facing(toward_red),
        )?;

        sim.spawn_unit(UnitSpawn::new(101, Faction::Red, Vec2::new(600.0, 480.0), 40).facing(toward_blue))?;
        sim.spawn_unit(
            UnitSpawn::new(102, Faction::Red, Vec2::new(620.0, 540.0), 32)
                .with_stats(UnitStats::musketeers())
                .facing(toward_blue),
        )?;
        sim.spawn_unit(UnitSpawn::new(103, Faction::Red, Vec2::new(610.0, 420.0), 24).facing(toward_blue))?;

        sim.order_move(UnitId(1), vec![Vec2::new(500.0, 480.0)], false)?;
        sim.order_attack(UnitId(3), UnitId(103))?;
        sim.order_move(UnitId(101), vec![Vec2::new(520.0, 480.0)], false)?;

        Ok(sim)
    }

    /// Add a unit with its fighters laid out in formation around `center`.
    ///
    /// The unit starts Initializing and joins the fight from its first tick.
    pub fn spawn_unit(&mut self, spawn: UnitSpawn) -> Result<Entity> {
        if spawn.fighter_count == 0 {
            return Err(SimError::EmptyUnit(spawn.id));
        }
        if self.world.resource::<UnitRoster>().contains(spawn.id) {
            return Err(SimError::DuplicateUnit(spawn.id));
        }

        let mut formation = spawn.formation;
        formation.set_direction(spawn.direction);
        let state = UnitState {
            center: spawn.center,
            direction: spawn.direction,
            ..Default::default()
        };

        let unit = self
            .world
            .spawn(UnitBundle {
                unit_id: spawn.id,
                faction: spawn.faction,
                stats: spawn.stats,
                state,
                next: NextUnitState(state),
                movement: UnitMovement {
                    destination: spawn.center,
                    direction: spawn.direction,
                    ..Default::default()
                },
                formation,
                ..Default::default()
            })
            .id();

        let count = spawn.fighter_count;
        let fighters: Vec<Entity> = (0..count)
            .map(|slot| {
                let position = formation.slot_position(spawn.center, count, slot);
                self.world
                    .spawn(FighterBundle::new(unit, slot, position, spawn.direction))
                    .id()
            })
            .collect();
        self.world.entity_mut(unit).insert(Fighters(fighters));
        self.world
            .resource_mut::<UnitRoster>()
            .insert(spawn.id, unit);

        tracing::debug!(unit = spawn.id.0, faction = ?spawn.faction, fighters = count, "unit spawned");
        Ok(unit)
    }

    /// Install the terrain map fighters sample for forest and water.
    pub fn set_terrain(&mut self, map: impl TerrainMap + 'static) {
        self.world.insert_resource(TerrainResource::new(map));
    }

    /// Replace the movement collaborator.
    pub fn set_movement_planner(&mut self, planner: impl MovementPlanner + 'static) {
        self.world.insert_resource(MovementResource(Box::new(planner)));
    }

    /// Install the listener that receives events after each `advance_time`.
    pub fn set_listener(&mut self, listener: impl SimulationListener + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Remove and return the installed listener.
    pub fn take_listener(&mut self) -> Option<Box<dyn SimulationListener + Send>> {
        self.listener.take()
    }

    /// Advance by `elapsed` time units, reporting events to the installed
    /// listener. Returns the number of ticks run.
    pub fn advance_time(&mut self, elapsed: f32) -> u64 {
        match self.listener.take() {
            Some(mut boxed) => {
                let listener: &mut dyn SimulationListener = boxed.as_mut();
                let ticks = self.advance(elapsed, Some(listener));
                self.listener = Some(boxed);
                ticks
            }
            None => self.advance(elapsed, None),
        }
    }

    /// Like `advance_time`, but reports this call's events to `listener`
    /// instead of the installed one.
    pub fn advance_time_with(&mut self, elapsed: f32, listener: &mut dyn SimulationListener) -> u64 {
        self.advance(elapsed, Some(listener))
    }

    fn advance(&mut self, elapsed: f32, listener: Option<&mut dyn SimulationListener>) -> u64 {
        let dt = f64::from(self.world.resource::<SimConfig>().fixed_timestep);
        let (ticks, remainder) =
            split_whole_ticks(self.time_accumulator + f64::from(elapsed.max(0.0)), dt);
        self.time_accumulator = remainder;

        for _ in 0..ticks {
            self.schedule.run(&mut self.world);
        }

        self.world.resource_mut::<RecentEvents>().dispatch(listener);
        self.decide_winner();

        tracing::debug!(
            ticks,
            tick = self.current_tick(),
            units = self.unit_count(),
            "advanced"
        );
        ticks
    }

    /// Record a winner once exactly one side still has units that are not
    /// routing. A decided battle stays decided.
    fn decide_winner(&mut self) {
        if self.world.resource::<Winner>().0.is_some() {
            return;
        }

        let (mut blue, mut red) = (0usize, 0usize);
        for &unit in self.world.resource::<UnitRoster>().entities() {
            let (Some(faction), Some(state)) = (
                self.world.get::<Faction>(unit),
                self.world.get::<UnitState>(unit),
            ) else {
                continue;
            };
            if state.is_routing() {
                continue;
            }
            match faction {
                Faction::Blue => blue += 1,
                Faction::Red => red += 1,
            }
        }

        let winner = match (blue, red) {
            (b, 0) if b > 0 => Some(Faction::Blue),
            (0, r) if r > 0 => Some(Faction::Red),
            _ => None,
        };
        if let Some(side) = winner {
            self.world.resource_mut::<Winner>().0 = Some(side);
            tracing::info!(winner = ?side, tick = self.current_tick(), "battle decided");
        }
    }

    /// Get a snapshot of the committed simulation state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_world(&self.world)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&self) -> String {
        self.snapshot()
            .to_json()
            .unwrap_or_else(|_| "{}".to_string())
    }

    /// Order a unit along `path`. The last waypoint becomes its destination
    /// and any movement target is dropped.
    pub fn order_move(&mut self, id: UnitId, path: Vec<Vec2>, running: bool) -> Result<()> {
        let entity = self.unit_entity(id)?;
        let mut movement = self
            .world
            .get_mut::<UnitMovement>(entity)
            .ok_or(SimError::StaleReference(entity))?;
        if let Some(&last) = path.last() {
            movement.destination = last;
        }
        movement.path = path;
        movement.running = running;
        movement.target = None;
        Ok(())
    }

    /// Order a unit to charge another unit.
    pub fn order_attack(&mut self, id: UnitId, target: UnitId) -> Result<()> {
        let entity = self.unit_entity(id)?;
        let target = self.unit_entity(target)?;
        let mut movement = self
            .world
            .get_mut::<UnitMovement>(entity)
            .ok_or(SimError::StaleReference(entity))?;
        movement.path.clear();
        movement.target = Some(target);
        Ok(())
    }

    /// Point a unit's ranged attacks at another unit. The target stays
    /// locked until it leaves the line of fire.
    pub fn order_ranged_target(&mut self, id: UnitId, target: UnitId) -> Result<()> {
        let entity = self.unit_entity(id)?;
        let target = self.unit_entity(target)?;
        let mut state = self
            .world
            .get_mut::<UnitState>(entity)
            .ok_or(SimError::StaleReference(entity))?;
        state.ranged_target = RangedTarget {
            unit: Some(target),
            locked: true,
        };
        Ok(())
    }

    pub fn unit_entity(&self, id: UnitId) -> Result<Entity> {
        self.world
            .resource::<UnitRoster>()
            .get(id)
            .ok_or(SimError::UnknownUnit(id))
    }

    /// Committed state of a unit.
    pub fn unit_state(&self, id: UnitId) -> Result<UnitState> {
        let entity = self.unit_entity(id)?;
        self.world
            .get::<UnitState>(entity)
            .copied()
            .ok_or(SimError::StaleReference(entity))
    }

    /// Fighters of a unit in slot order.
    pub fn fighters(&self, id: UnitId) -> Result<Vec<Entity>> {
        let entity = self.unit_entity(id)?;
        self.world
            .get::<Fighters>(entity)
            .map(|f| f.0.clone())
            .ok_or(SimError::StaleReference(entity))
    }

    /// Committed state of a fighter; fails once the fighter is gone.
    pub fn fighter_state(&self, fighter: Entity) -> Result<FighterState> {
        self.world
            .get::<FighterState>(fighter)
            .copied()
            .ok_or(SimError::StaleReference(fighter))
    }

    pub fn winner(&self) -> Option<Faction> {
        self.world.resource::<Winner>().0
    }

    pub fn unit_count(&self) -> usize {
        self.world.resource::<UnitRoster>().len()
    }

    /// Volleys still in flight.
    pub fn shootings(&self) -> &[Shooting] {
        &self.world.resource::<Shootings>().0
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.world.resource::<SimClock>().tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.world.resource::<SimClock>().time
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for BattleSim {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole ticks of length `dt` contained in `accumulated`, and the time left
/// over. The count is taken up front, so any finite `accumulated` finishes.
fn split_whole_ticks(accumulated: f64, dt: f64) -> (u64, f64) {
    let ticks = (accumulated / dt).floor().max(0.0);
    (ticks as u64, (accumulated - ticks * dt).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::terrain::{Rgba, TerrainImage};

    fn tick(sim: &mut BattleSim) -> u64 {
        let dt = sim.config().fixed_timestep;
        sim.advance_time(dt)
    }

    #[test]
    fn test_new_sim() {
        let sim = BattleSim::new();
        assert_eq!(sim.current_tick(), 0);
        assert_eq!(sim.unit_count(), 0);
        assert_eq!(sim.winner(), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimConfig {
            fixed_timestep: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            BattleSim::with_config(config),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_spawn_rejects_duplicates_and_empty_units() {
        let mut sim = BattleSim::new();
        sim.spawn_unit(UnitSpawn::new(1, Faction::Blue, Vec2::new(500.0, 500.0), 12))
            .unwrap();
        assert!(matches!(
            sim.spawn_unit(UnitSpawn::new(1, Faction::Red, Vec2::new(600.0, 500.0), 12)),
            Err(SimError::DuplicateUnit(UnitId(1)))
        ));
        assert!(matches!(
            sim.spawn_unit(UnitSpawn::new(2, Faction::Red, Vec2::new(600.0, 500.0), 0)),
            Err(SimError::EmptyUnit(UnitId(2)))
        ));
        assert!(matches!(
            sim.order_move(UnitId(9), vec![], false),
            Err(SimError::UnknownUnit(UnitId(9)))
        ));
    }

    #[test]
    fn test_advance_runs_whole_ticks_and_carries_remainder() {
        let mut sim = BattleSim::new();
        assert_eq!(sim.advance_time(0.1), 1);
        assert_eq!(sim.advance_time(0.05), 1);
        assert_eq!(sim.advance_time(0.01), 0);
        assert_eq!(sim.current_tick(), 2);
        assert_eq!(sim.advance_time(-1.0), 0);
    }

    #[test]
    fn test_huge_elapsed_time_still_counts_ticks() {
        let (ticks, remainder) = split_whole_ticks(4.0e6 + 0.1, 0.25);
        assert_eq!(ticks, 16_000_000);
        assert!((remainder - 0.1).abs() < 1e-6);

        assert_eq!(split_whole_ticks(0.0, 0.25), (0, 0.0));
        let (ticks, remainder) = split_whole_ticks(0.2, 0.25);
        assert_eq!(ticks, 0);
        assert!((remainder - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_first_tick_settles_units() {
        let mut sim = BattleSim::new();
        sim.spawn_unit(UnitSpawn::new(1, Faction::Blue, Vec2::new(500.0, 500.0), 12))
            .unwrap();
        assert_eq!(
            sim.unit_state(UnitId(1)).unwrap().mode,
            UnitMode::Initializing
        );
        tick(&mut sim);
        let state = sim.unit_state(UnitId(1)).unwrap();
        assert_eq!(state.mode, UnitMode::Standing);
        assert_eq!(state.center, Vec2::new(500.0, 500.0));
    }

    #[test]
    fn test_winner_decided_once_when_other_side_is_gone() {
        let mut sim = BattleSim::new();
        sim.spawn_unit(UnitSpawn::new(1, Faction::Blue, Vec2::new(850.0, 850.0), 10))
            .unwrap();
        // far corner, outside the battlefield circle
        sim.spawn_unit(
            UnitSpawn::new(2, Faction::Red, Vec2::new(60.0, 60.0), 3).facing(std::f32::consts::PI),
        )
        .unwrap();

        let mut ticks = 0;
        while sim.snapshot().fighter_count(Faction::Red) > 0 {
            tick(&mut sim);
            ticks += 1;
            assert!(ticks < 100, "side B never vanished");
        }
        assert_eq!(sim.winner(), Some(Faction::Blue));
        assert_eq!(sim.unit_count(), 1);

        for _ in 0..30 {
            tick(&mut sim);
            assert_eq!(sim.winner(), Some(Faction::Blue));
        }
    }

    #[test]
    fn test_depleted_side_routs_and_loses() {
        let mut sim = BattleSim::new();
        sim.spawn_unit(UnitSpawn::new(1, Faction::Blue, Vec2::new(400.0, 500.0), 12))
            .unwrap();
        sim.spawn_unit(UnitSpawn::new(2, Faction::Red, Vec2::new(600.0, 500.0), 6))
            .unwrap();

        tick(&mut sim);

        assert!(sim.unit_state(UnitId(2)).unwrap().is_routing());
        assert!(!sim.unit_state(UnitId(1)).unwrap().is_routing());
        assert_eq!(sim.winner(), Some(Faction::Blue));
    }

    #[test]
    fn test_routing_unit_runs_from_the_enemy() {
        let mut sim = BattleSim::new();
        let start = Vec2::new(500.0, 500.0);
        sim.spawn_unit(UnitSpawn::new(1, Faction::Blue, start, 6))
            .unwrap();
        sim.spawn_unit(
            UnitSpawn::new(2, Faction::Red, Vec2::new(540.0, 500.0), 16)
                .facing(std::f32::consts::PI),
        )
        .unwrap();

        for _ in 0..150 {
            tick(&mut sim);
        }

        let state = sim.unit_state(UnitId(1)).unwrap();
        assert!(state.is_routing());
        assert!(state.center.x < start.x - 20.0);
        assert!(state.center.distance(start) > 20.0);
    }

    #[test]
    fn test_lines_in_contact_take_casualties() {
        let mut sim = BattleSim::new();
        sim.spawn_unit(UnitSpawn::new(1, Faction::Blue, Vec2::new(500.0, 500.0), 16))
            .unwrap();
        sim.spawn_unit(
            UnitSpawn::new(2, Faction::Red, Vec2::new(508.0, 500.0), 16)
                .facing(std::f32::consts::PI),
        )
        .unwrap();

        let mut log = EventLog::default();
        let dt = sim.config().fixed_timestep;
        for _ in 0..150 {
            sim.advance_time_with(dt, &mut log);
        }

        assert!(!log.casualties.is_empty());
        let snapshot = sim.snapshot();
        let total = snapshot.fighter_count(Faction::Blue) + snapshot.fighter_count(Faction::Red);
        assert!(total < 32);
    }

    #[test]
    fn test_archers_volley_with_prepared_fighters() {
        let mut sim = BattleSim::new();
        sim.spawn_unit(
            UnitSpawn::new(1, Faction::Blue, Vec2::new(400.0, 500.0), 16)
                .with_stats(UnitStats::archers()),
        )
        .unwrap();
        sim.spawn_unit(
            UnitSpawn::new(2, Faction::Red, Vec2::new(500.0, 500.0), 16)
                .facing(std::f32::consts::PI),
        )
        .unwrap();

        let mut log = EventLog::default();
        let dt = sim.config().fixed_timestep;
        for _ in 0..90 {
            sim.advance_time_with(dt, &mut log);
        }

        assert!(log
            .shootings
            .iter()
            .any(|s| s.weapon == Weapon::Bow && s.projectiles.len() == 16));
        let state = sim.unit_state(UnitId(1)).unwrap();
        assert!(state.shooting_counter >= 1);
        assert!(state.ranged_target.locked);
    }

    #[test]
    fn test_order_attack_closes_distance() {
        let mut sim = BattleSim::new();
        sim.spawn_unit(
            UnitSpawn::new(1, Faction::Blue, Vec2::new(400.0, 500.0), 16)
                .with_stats(UnitStats::cavalry()),
        )
        .unwrap();
        sim.spawn_unit(UnitSpawn::new(2, Faction::Red, Vec2::new(600.0, 500.0), 16))
            .unwrap();
        tick(&mut sim);

        sim.order_attack(UnitId(1), UnitId(2)).unwrap();
        for _ in 0..60 {
            tick(&mut sim);
        }

        let state = sim.unit_state(UnitId(1)).unwrap();
        assert_eq!(state.mode, UnitMode::Moving);
        assert!(state.center.x > 420.0);
    }

    #[test]
    fn test_order_ranged_target_locks() {
        let mut sim = BattleSim::new();
        sim.spawn_unit(UnitSpawn::new(1, Faction::Blue, Vec2::new(400.0, 500.0), 12))
            .unwrap();
        let red = sim
            .spawn_unit(UnitSpawn::new(2, Faction::Red, Vec2::new(500.0, 500.0), 12))
            .unwrap();
        sim.order_ranged_target(UnitId(1), UnitId(2)).unwrap();

        let target = sim.unit_state(UnitId(1)).unwrap().ranged_target;
        assert_eq!(target.unit, Some(red));
        assert!(target.locked);
    }

    #[test]
    fn test_fighter_reference_goes_stale() {
        let mut sim = BattleSim::new();
        sim.spawn_unit(UnitSpawn::new(1, Faction::Blue, Vec2::new(60.0, 60.0), 4))
            .unwrap();
        let fighter = sim.fighters(UnitId(1)).unwrap()[0];
        assert!(sim.fighter_state(fighter).is_ok());

        tick(&mut sim);

        assert!(matches!(
            sim.fighter_state(fighter),
            Err(SimError::StaleReference(e)) if e == fighter
        ));
        assert!(matches!(
            sim.unit_state(UnitId(1)),
            Err(SimError::UnknownUnit(_))
        ));
    }

    #[test]
    fn test_routing_unit_drowns_in_water() {
        let mut sim = BattleSim::new();
        let mut image = TerrainImage::new(256, 1024.0);
        image.paint_disc(500.0, 500.0, 40.0, Rgba::WATER);
        sim.set_terrain(image);
        sim.spawn_unit(UnitSpawn::new(1, Faction::Blue, Vec2::new(500.0, 500.0), 6))
            .unwrap();

        let mut log = EventLog::default();
        let dt = sim.config().fixed_timestep;
        for _ in 0..3 {
            sim.advance_time_with(dt, &mut log);
        }

        assert_eq!(log.casualties.len(), 6);
        assert_eq!(sim.unit_count(), 0);
    }

    #[test]
    fn test_installed_listener_receives_events() {
        let mut sim = BattleSim::new();
        sim.set_listener(EventLog::default());
        sim.spawn_unit(UnitSpawn::new(1, Faction::Blue, Vec2::new(500.0, 500.0), 12))
            .unwrap();
        tick(&mut sim);
        assert!(sim.take_listener().is_some());
        assert!(sim.take_listener().is_none());
    }

    #[test]
    fn test_same_seed_same_battle() {
        let run = || {
            let mut sim = BattleSim::demo_battle().unwrap();
            for _ in 0..40 {
                sim.advance_time(0.25);
            }
            sim.snapshot_json()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_snapshot_json() {
        let sim = BattleSim::demo_battle().unwrap();
        let json = sim.snapshot_json();
        assert!(json.contains("units"));
        assert!(json.contains("Blue"));
        assert!(json.contains("Red"));
    }
}
