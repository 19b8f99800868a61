//! ECS systems for the Skirmish battle simulation.
//!
//! One tick runs these phases strictly in order, on a single thread:
//!
//! 1. `rebuild_spatial_index_system` - refill the fighter and weapon grids
//! 2. `advance_movement_system` - progress unit paths (movement planner)
//! 3. `compute_next_state_system` - derive staged unit and fighter states
//! 4. `commit_next_state_system` - staged state becomes committed state
//! 5. `resolve_melee_system` - land strikes whose timer ran out
//! 6. `trigger_volleys_system`, `resolve_impacts_system` - ranged combat
//! 7. `remove_casualties_system` - drop dead and stray fighters
//! 8. `remove_dead_units_system` - drop empty units and references to them
//! 9. `advance_clock_system` - tick counter and simulation time
//!
//! Every phase visits units in ascending id order and fighters in slot
//! order, and all randomness comes from the single `SimRng` resource, so a
//! seed fully determines a battle.

pub mod cleanup;
pub mod combat;
pub mod morale;
pub mod movement;
pub mod readiness;
pub mod state;
pub mod targeting;

pub use cleanup::{remove_casualties_system, remove_dead_units_system};
pub use combat::{resolve_impacts_system, resolve_melee_system, trigger_volleys_system};
pub use movement::{advance_movement_system, FormationMovement, MovementPlanner, MovementResource, UnitView};
pub use state::{commit_next_state_system, compute_next_state_system};
