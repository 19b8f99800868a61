//! Skirmish - Battle Simulation Core
//!
//! A deterministic, fixed-timestep simulation of formation combat between
//! two sides. Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod spatial;
pub mod systems;
pub mod terrain;
pub mod world;

pub use api::{BattleSim, UnitSpawn};
pub use components::*;
pub use config::SimConfig;
pub use error::{Result, SimError};
pub use events::{CasualtyRecord, EventLog, Projectile, Shooting, SimulationListener};
pub use spatial::SpatialGrid;
pub use systems::{FormationMovement, MovementPlanner, UnitView};
pub use terrain::{Rgba, TerrainImage, TerrainMap};
pub use world::Snapshot;
