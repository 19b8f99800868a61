//! ECS components for the Skirmish battle simulation.
//!
//! Units and fighters are both entities. A unit entity owns the ordered list
//! of its fighter entities; fighters point back at their unit. Every
//! cross-entity reference is a plain `Entity`, whose generation makes it
//! self-invalidating once the referenced entity is despawned.
//!
//! Entities that change every tick carry two copies of their state: the
//! committed snapshot (`UnitState`, `FighterState`) and a staged snapshot
//! (`NextUnitState`, `NextFighterState`) written by the compute pass.

use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Unit vector pointing along `angle` (radians, counter-clockwise from +x).
#[inline]
pub fn vector_from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle of a vector in radians. The zero vector maps to 0.
#[inline]
pub fn angle_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Signed difference `b - a`, wrapped into `[-PI, PI]`.
pub fn angle_difference(a: f32, b: f32) -> f32 {
    let tau = std::f32::consts::TAU;
    let mut d = (b - a) % tau;
    if d > std::f32::consts::PI {
        d -= tau;
    } else if d < -std::f32::consts::PI {
        d += tau;
    }
    d
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Caller-assigned unit identifier. Units are always visited in ascending id
/// order.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UnitId(pub u32);

/// The side a unit fights for.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    #[default]
    Blue,
    Red,
}

impl Faction {
    pub fn opponent(self) -> Self {
        match self {
            Faction::Blue => Faction::Red,
            Faction::Red => Faction::Blue,
        }
    }
}

// ============================================================================
// UNIT COMPONENTS
// ============================================================================

/// Weapon carried by every fighter of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weapon {
    /// Fast ranged weapon.
    Musket,
    /// Slow ranged weapon.
    Bow,
    Spear,
    Sword,
}

impl Weapon {
    pub fn is_ranged(self) -> bool {
        matches!(self, Weapon::Musket | Weapon::Bow)
    }

    /// Projectile speed in world units per time unit.
    pub fn projectile_speed(self) -> f32 {
        match self {
            Weapon::Musket => 750.0,
            _ => 75.0,
        }
    }

    /// Upper bound of the random delay between trigger and launch.
    pub fn launch_jitter(self) -> f32 {
        match self {
            Weapon::Musket => 0.5,
            _ => 0.2,
        }
    }
}

/// What the fighters of a unit stand or ride on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Infantry,
    Cavalry,
    General,
}

impl Platform {
    pub fn is_mounted(self) -> bool {
        matches!(self, Platform::Cavalry | Platform::General)
    }
}

/// Static per-unit statistics.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnitStats {
    /// 0.0 (levy) to 1.0 (veteran).
    pub training_level: f32,
    pub weapon: Weapon,
    pub platform: Platform,
    /// Distance from a fighter's body to its weapon tip.
    pub weapon_reach: f32,
    pub walking_speed: f32,
    pub running_speed: f32,
    /// Maximum ranged-attack distance.
    pub maximum_range: f32,
    pub readying_duration: f32,
    pub striking_duration: f32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self::spearmen()
    }
}

impl UnitStats {
    pub fn spearmen() -> Self {
        Self {
            training_level: 0.5,
            weapon: Weapon::Spear,
            platform: Platform::Infantry,
            weapon_reach: 2.0,
            walking_speed: 7.0,
            running_speed: 14.0,
            maximum_range: 0.0,
            readying_duration: 3.0,
            striking_duration: 2.0,
        }
    }

    pub fn archers() -> Self {
        Self {
            weapon: Weapon::Bow,
            weapon_reach: 1.0,
            maximum_range: 150.0,
            training_level: 0.3,
            ..Self::spearmen()
        }
    }

    pub fn musketeers() -> Self {
        Self {
            weapon: Weapon::Musket,
            weapon_reach: 1.0,
            maximum_range: 110.0,
            ..Self::spearmen()
        }
    }

    pub fn cavalry() -> Self {
        Self {
            weapon: Weapon::Sword,
            platform: Platform::Cavalry,
            weapon_reach: 1.0,
            walking_speed: 10.0,
            running_speed: 25.0,
            training_level: 0.8,
            readying_duration: 2.0,
            striking_duration: 1.0,
            ..Self::spearmen()
        }
    }
}

/// Coarse activity mode of a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitMode {
    /// Freshly spawned; fighters are placed on their formation slots.
    #[default]
    Initializing,
    Standing,
    Moving,
}

/// Enemy unit chosen for ranged attacks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangedTarget {
    pub unit: Option<Entity>,
    /// Locked targets are kept until they leave the line of fire.
    pub locked: bool,
}

impl RangedTarget {
    pub fn release(&mut self) {
        self.unit = None;
        self.locked = false;
    }
}

/// Committed per-tick state of a unit.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct UnitState {
    pub center: Vec2,
    /// Facing in radians.
    pub direction: f32,
    pub mode: UnitMode,
    pub morale: f32,
    /// Pressure from nearby shaken allies; always zero or negative.
    pub influence: f32,
    /// Advanced once per line-of-fire opportunity while Standing.
    pub shooting_counter: u32,
    pub shooting_timer: f32,
    /// Fighters lost during the last casualty pass.
    pub recent_casualties: u32,
    pub ranged_target: RangedTarget,
}

impl Default for UnitState {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            direction: 0.0,
            mode: UnitMode::Initializing,
            morale: 1.0,
            influence: 0.0,
            shooting_counter: 0,
            shooting_timer: 0.0,
            recent_casualties: 0,
            ranged_target: RangedTarget::default(),
        }
    }
}

impl UnitState {
    /// Morale after allied influence.
    pub fn effective_morale(&self) -> f32 {
        self.morale + self.influence
    }

    pub fn is_routing(&self) -> bool {
        self.effective_morale() < 0.0
    }
}

/// Staged unit state, produced by the compute pass and copied over
/// `UnitState` by the commit pass.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct NextUnitState(pub UnitState);

/// Path-following descriptor, advanced by the movement collaborator.
#[derive(Component, Debug, Clone, Default)]
pub struct UnitMovement {
    /// Remaining waypoints; the last one is the final destination.
    pub path: Vec<Vec2>,
    /// Final destination when the path is empty.
    pub destination: Vec2,
    /// Facing the unit should adopt.
    pub direction: f32,
    /// Enemy unit being charged, if any.
    pub target: Option<Entity>,
    pub running: bool,
}

impl UnitMovement {
    pub fn final_destination(&self) -> Vec2 {
        self.path.last().copied().unwrap_or(self.destination)
    }

    /// Drop the path, stop where the unit stands and forget the target.
    pub fn halt(&mut self, center: Vec2) {
        self.path.clear();
        self.destination = center;
        self.target = None;
    }
}

/// Rank-and-file layout of a unit.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Formation {
    pub number_of_ranks: usize,
    pub rank_distance: f32,
    pub file_distance: f32,
    /// One file step to the right, in world units.
    pub toward_right: Vec2,
    /// One rank step to the rear, in world units.
    pub toward_back: Vec2,
}

impl Default for Formation {
    fn default() -> Self {
        let mut formation = Self {
            number_of_ranks: 4,
            rank_distance: 1.7,
            file_distance: 1.7,
            toward_right: Vec2::ZERO,
            toward_back: Vec2::ZERO,
        };
        formation.set_direction(0.0);
        formation
    }
}

impl Formation {
    /// Re-orient the formation so the front rank faces `direction`.
    pub fn set_direction(&mut self, direction: f32) {
        let forward = vector_from_angle(direction);
        self.toward_back = -forward * self.rank_distance;
        self.toward_right = Vec2::new(forward.y, -forward.x) * self.file_distance;
    }

    pub fn number_of_files(&self, fighter_count: usize) -> usize {
        let ranks = self.number_of_ranks.max(1);
        fighter_count.div_ceil(ranks).max(1)
    }

    pub fn file_of(&self, slot: usize) -> usize {
        slot / self.number_of_ranks.max(1)
    }

    pub fn rank_of(&self, slot: usize) -> usize {
        slot % self.number_of_ranks.max(1)
    }

    /// Position of the front-left fighter for a formation centred on `center`.
    pub fn front_left(&self, center: Vec2, fighter_count: usize) -> Vec2 {
        let files = self.number_of_files(fighter_count) as f32;
        let ranks = self.number_of_ranks.min(fighter_count.max(1)) as f32;
        center - self.toward_right * (0.5 * (files - 1.0)) - self.toward_back * (0.5 * (ranks - 1.0))
    }

    pub fn slot_position(&self, center: Vec2, fighter_count: usize, slot: usize) -> Vec2 {
        self.front_left(center, fighter_count)
            + self.toward_right * self.file_of(slot) as f32
            + self.toward_back * self.rank_of(slot) as f32
    }
}

/// Fighters owned by a unit, in slot order.
#[derive(Component, Debug, Clone, Default)]
pub struct Fighters(pub Vec<Entity>);

/// Shooting counter value at the last volley this unit triggered.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ShotsTriggered(pub u32);

// ============================================================================
// FIGHTER COMPONENTS
// ============================================================================

/// Non-owning back-reference from a fighter to its unit.
#[derive(Component, Debug, Clone, Copy)]
pub struct FighterOf(pub Entity);

/// Index of the fighter within its unit; drives file/rank placement.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FighterSlot(pub usize);

/// Melee-cycle phase of a fighter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadyState {
    #[default]
    Unready,
    Readying,
    Prepared,
    Striking,
    Stunned,
}

/// Committed per-tick state of a fighter.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct FighterState {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Facing in radians.
    pub direction: f32,
    pub destination: Vec2,
    pub ready: ReadyState,
    pub readying_timer: f32,
    pub striking_timer: f32,
    pub stunned_timer: f32,
    /// Enemy fighter currently engaged.
    pub opponent: Option<Entity>,
    /// Enemy fighter whose strike lands this tick.
    pub melee_target: Option<Entity>,
}

impl FighterState {
    pub fn weapon_tip(&self, reach: f32) -> Vec2 {
        self.position + vector_from_angle(self.direction) * reach
    }
}

/// Staged fighter state.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct NextFighterState(pub FighterState);

/// Set when the fighter is killed; cleared fighters are compacted away at
/// the end of the tick.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CasualtyFlag(pub bool);

/// Cached terrain classification under a fighter.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct TerrainSample {
    /// Where the sample was taken; `None` until the first sample.
    pub position: Option<Vec2>,
    pub forest: bool,
    pub water: bool,
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a unit entity. Fighters are attached afterwards.
#[derive(Bundle, Default)]
pub struct UnitBundle {
    pub unit_id: UnitId,
    pub faction: Faction,
    pub stats: UnitStats,
    pub state: UnitState,
    pub next: NextUnitState,
    pub movement: UnitMovement,
    pub formation: Formation,
    pub fighters: Fighters,
    pub shots: ShotsTriggered,
}

impl Default for UnitId {
    fn default() -> Self {
        Self(0)
    }
}

/// Bundle for spawning a fighter entity.
#[derive(Bundle)]
pub struct FighterBundle {
    pub unit: FighterOf,
    pub slot: FighterSlot,
    pub state: FighterState,
    pub next: NextFighterState,
    pub casualty: CasualtyFlag,
    pub terrain: TerrainSample,
}

impl FighterBundle {
    pub fn new(unit: Entity, slot: usize, position: Vec2, direction: f32) -> Self {
        let state = FighterState {
            position,
            destination: position,
            direction,
            ..Default::default()
        };
        Self {
            unit: FighterOf(unit),
            slot: FighterSlot(slot),
            state,
            next: NextFighterState(state),
            casualty: CasualtyFlag(false),
            terrain: TerrainSample::default(),
        }
    }
}
