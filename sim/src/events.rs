//! Ranged-attack events, casualty records and the listener they are
//! reported to.

use crate::components::{Faction, Platform, Weapon};
use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// One projectile of a volley.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub origin: Vec2,
    /// Point of impact, aiming noise included.
    pub target: Vec2,
    /// Delay between the volley trigger and this projectile's launch.
    pub delay: f32,
}

/// A volley fired by one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shooting {
    pub weapon: Weapon,
    /// Projectiles that have not landed yet.
    pub projectiles: Vec<Projectile>,
    /// Time left until every projectile lands.
    pub time_to_impact: f32,
}

/// A fighter lost during the casualty pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CasualtyRecord {
    pub position: Vec2,
    pub faction: Faction,
    pub platform: Platform,
}

/// Receives the events of one `advance_time` call, after all its ticks ran.
pub trait SimulationListener {
    fn on_shooting(&mut self, shooting: &Shooting);
    fn on_casualty(&mut self, casualty: &CasualtyRecord);
}

/// Volleys in flight.
#[derive(Resource, Debug, Default)]
pub struct Shootings(pub Vec<Shooting>);

/// Events emitted since the last dispatch, in emission order.
#[derive(Resource, Debug, Default)]
pub struct RecentEvents {
    pub shootings: Vec<Shooting>,
    pub casualties: Vec<CasualtyRecord>,
}

impl RecentEvents {
    /// Hand every pending event to `listener` (shootings first) and clear.
    pub fn dispatch(&mut self, listener: Option<&mut dyn SimulationListener>) {
        if let Some(listener) = listener {
            for shooting in &self.shootings {
                listener.on_shooting(shooting);
            }
            for casualty in &self.casualties {
                listener.on_casualty(casualty);
            }
        }
        self.shootings.clear();
        self.casualties.clear();
    }
}

/// Listener that keeps everything it is told. Handy for hosts that poll.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub shootings: Vec<Shooting>,
    pub casualties: Vec<CasualtyRecord>,
}

impl SimulationListener for EventLog {
    fn on_shooting(&mut self, shooting: &Shooting) {
        self.shootings.push(shooting.clone());
    }

    fn on_casualty(&mut self, casualty: &CasualtyRecord) {
        self.casualties.push(*casualty);
    }
}
