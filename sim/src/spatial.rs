//! Spatial partitioning for fighter proximity queries.
//!
//! The battlefield is a fixed square, so the grid is a dense array of cells
//! rather than a hash map. Points outside the square are filed into the
//! nearest edge cell, which keeps every inserted point reachable by a query
//! centred on it.
//!
//! Two grids are rebuilt from scratch every tick: one holding fighter
//! bodies and one holding weapon tips. Nearly every fighter moves every
//! tick, so incremental maintenance would not pay for itself.

use crate::components::*;
use crate::world::UnitRoster;
use bevy_ecs::prelude::*;
use glam::Vec2;

/// Bucket grid over `[0, world_size]²`.
#[derive(Debug, Clone)]
pub struct SpatialGrid<T> {
    cell_size: f32,
    cells_per_side: usize,
    cells: Vec<Vec<(Vec2, T)>>,
    len: usize,
}

impl<T> SpatialGrid<T> {
    /// Create an empty grid covering a square of side `world_size`.
    pub fn new(world_size: f32, cell_size: f32) -> Self {
        let cell_size = cell_size.max(f32::EPSILON);
        let cells_per_side = ((world_size / cell_size).ceil() as usize).max(1);
        let mut cells = Vec::with_capacity(cells_per_side * cells_per_side);
        cells.resize_with(cells_per_side * cells_per_side, Vec::new);
        Self {
            cell_size,
            cells_per_side,
            cells,
            len: 0,
        }
    }

    #[inline]
    fn axis_cell(&self, v: f32) -> usize {
        let last = self.cells_per_side as isize - 1;
        ((v / self.cell_size).floor() as isize).clamp(0, last) as usize
    }

    /// Convert world coordinates to (clamped) cell coordinates.
    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32) -> (usize, usize) {
        (self.axis_cell(x), self.axis_cell(y))
    }

    /// Remove every entry, keeping cell allocations for the next rebuild.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.len = 0;
    }

    pub fn insert(&mut self, x: f32, y: f32, value: T) {
        let (cx, cy) = self.world_to_cell(x, y);
        self.cells[cy * self.cells_per_side + cx].push((Vec2::new(x, y), value));
        self.len += 1;
    }

    /// Lazily yield every value whose point lies within `radius` of `(x, y)`.
    ///
    /// Values come out in cell order, then insertion order within a cell.
    /// The borrow on the grid keeps it from being mutated mid-query.
    pub fn query(&self, x: f32, y: f32, radius: f32) -> impl Iterator<Item = &T> + '_ {
        let radius = radius.max(0.0);
        let radius_sq = radius * radius;
        let center = Vec2::new(x, y);
        let (x0, y0) = self.world_to_cell(x - radius, y - radius);
        let (x1, y1) = self.world_to_cell(x + radius, y + radius);
        let stride = self.cells_per_side;

        (y0..=y1)
            .flat_map(move |cy| (x0..=x1).map(move |cx| cy * stride + cx))
            .flat_map(move |index| self.cells[index].iter())
            .filter(move |(point, _)| point.distance_squared(center) <= radius_sq)
            .map(|(_, value)| value)
    }

    /// Number of entries in one cell.
    pub fn cell_count(&self, cell: (usize, usize)) -> usize {
        self.cells
            .get(cell.1 * self.cells_per_side + cell.0)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Value stored in both fighter grids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FighterEntry {
    pub fighter: Entity,
    pub unit: Entity,
    pub faction: Faction,
    /// Body position of the fighter, also for weapon-tip entries.
    pub position: Vec2,
}

/// Grid of fighter body positions (collision, melee acquisition, impacts).
#[derive(Resource, Debug)]
pub struct FighterGrid(pub SpatialGrid<FighterEntry>);

/// Grid of weapon-tip points (reach-based threat avoidance).
#[derive(Resource, Debug)]
pub struct WeaponGrid(pub SpatialGrid<FighterEntry>);

/// System that rebuilds both grids from committed fighter positions.
///
/// Units still initializing are skipped; weapon tips are only filed for
/// units whose weapon has reach.
pub fn rebuild_spatial_index_system(
    roster: Res<UnitRoster>,
    mut fighter_grid: ResMut<FighterGrid>,
    mut weapon_grid: ResMut<WeaponGrid>,
    units: Query<(&Faction, &UnitStats, &UnitState, &Fighters)>,
    fighters: Query<&FighterState>,
) {
    fighter_grid.0.clear();
    weapon_grid.0.clear();

    for &unit in roster.entities() {
        let Ok((faction, stats, state, members)) = units.get(unit) else {
            continue;
        };
        if state.mode == UnitMode::Initializing {
            continue;
        }

        for &fighter in &members.0 {
            let Ok(fs) = fighters.get(fighter) else {
                continue;
            };
            let entry = FighterEntry {
                fighter,
                unit,
                faction: *faction,
                position: fs.position,
            };
            fighter_grid.0.insert(fs.position.x, fs.position.y, entry);

            if stats.weapon_reach > 0.0 {
                let tip = fs.weapon_tip(stats.weapon_reach);
                weapon_grid.0.insert(tip.x, tip.y, entry);
            }
        }
    }
}
