//! Morale and rout rules.
//!
//! Morale is carried on the unit state and recomputed by the compute pass.
//! A unit routs when its effective morale (morale plus allied influence)
//! drops below zero; several hard conditions force that immediately.

use crate::components::*;
use glam::Vec2;

/// Morale assigned to a unit that is forced to rout.
pub const ROUTED_MORALE: f32 = -1.0;

/// Units with this many fighters or fewer break.
pub const MIN_FIGHTERS: usize = 8;

/// Units whose center comes this close to the world edge break.
pub const EDGE_MARGIN: f32 = 8.0;

/// Distance at which allied influence falls to half strength.
const INFLUENCE_FALLOFF: f32 = 50.0;

/// Summary of one unit's committed state, shared by every unit's update.
#[derive(Debug, Clone, Copy)]
pub struct UnitSummary {
    pub entity: bevy_ecs::entity::Entity,
    pub faction: Faction,
    pub center: Vec2,
    pub morale: f32,
    pub training_level: f32,
}

/// Morale after casualty loss or slow recovery.
pub fn next_morale(current: &UnitState, training_level: f32) -> f32 {
    let mut morale = current.morale;
    if current.recent_casualties > 0 {
        morale -= current.recent_casualties as f32 * (2.4 - training_level) / 100.0;
    } else if -0.2 < morale && morale < 1.0 {
        morale += (0.1 + training_level) / 2000.0;
    }
    morale
}

/// Drag from shaken, poorly trained allies; nearer allies weigh more.
///
/// The unit itself is part of `units` and contributes like any ally.
pub fn allied_influence(
    faction: Faction,
    center: Vec2,
    training_level: f32,
    units: &[UnitSummary],
) -> f32 {
    units
        .iter()
        .filter(|other| other.faction == faction)
        .map(|other| {
            let distance = other.center.distance(center);
            let weight = INFLUENCE_FALLOFF / (distance + INFLUENCE_FALLOFF);
            -weight * (1.0 - other.morale) * (1.0 - training_level) * other.training_level
        })
        .sum()
}

/// Battle-wide facts the rout rules depend on.
#[derive(Debug, Clone, Copy)]
pub struct RoutRules {
    pub winner: Option<Faction>,
    pub practice: bool,
    pub world_size: f32,
}

impl RoutRules {
    /// Whether a unit must rout regardless of its morale.
    pub fn forced_rout(
        &self,
        faction: Faction,
        fighter_count: usize,
        currently_routing: bool,
        next_center: Vec2,
    ) -> bool {
        let lost = self.winner.is_some_and(|w| w != faction);
        let depleted = fighter_count <= MIN_FIGHTERS;
        let practice_broken = self.practice && faction == Faction::Red && currently_routing;
        let max = self.world_size - EDGE_MARGIN;
        let at_edge = next_center.x < EDGE_MARGIN
            || next_center.x > max
            || next_center.y < EDGE_MARGIN
            || next_center.y > max;

        lost || depleted || practice_broken || at_edge
    }
}
