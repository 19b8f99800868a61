//! Simulation configuration.

use crate::error::{Result, SimError};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for a battle simulation.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed timestep in time units (e.g., 1/15 for 15 Hz).
    pub fixed_timestep: f32,
    /// Side length of the square battlefield; coordinates run `0..=world_size`.
    pub world_size: f32,
    /// Cell size of both spatial grids.
    pub spatial_cell_size: f32,
    /// RNG seed. Same seed and same inputs give the same battle.
    pub seed: u64,
    /// One-sided practice battle: Red units that break stay broken.
    pub practice: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 15.0,
            world_size: 1024.0,
            spatial_cell_size: 8.0,
            seed: 42,
            practice: false,
        }
    }
}

impl SimConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fixed_timestep.is_nan() || self.fixed_timestep <= 0.0 {
            return Err(SimError::InvalidConfig("fixed_timestep must be positive"));
        }
        if self.world_size.is_nan() || self.world_size <= 0.0 {
            return Err(SimError::InvalidConfig("world_size must be positive"));
        }
        if self.spatial_cell_size.is_nan() || self.spatial_cell_size <= 0.0 {
            return Err(SimError::InvalidConfig("spatial_cell_size must be positive"));
        }
        Ok(())
    }
}
