//! Ranged target selection and the shooting cadence of Standing units.

use super::morale::UnitSummary;
use crate::components::*;
use glam::Vec2;
use rand::Rng;
use std::f32::consts::FRAC_PI_4;

/// Targets closer than this are too close to shoot at.
pub const MINIMUM_RANGE: f32 = 15.0;

/// Base delay between two shooting opportunities.
pub const SHOOTING_INTERVAL: f32 = 4.0;

/// Whether `target` can be shot at by a unit at `center` facing `direction`.
pub fn is_within_line_of_fire(
    center: Vec2,
    direction: f32,
    maximum_range: f32,
    target: Vec2,
) -> bool {
    let diff = target - center;
    let distance = diff.length();
    if distance < MINIMUM_RANGE || distance > maximum_range {
        return false;
    }
    angle_difference(direction, angle_of(diff)).abs() <= FRAC_PI_4
}

/// Closest enemy unit in the line of fire. Ties go to the first in `units`.
pub fn closest_enemy_in_line_of_fire(
    faction: Faction,
    center: Vec2,
    direction: f32,
    maximum_range: f32,
    units: &[UnitSummary],
) -> Option<bevy_ecs::entity::Entity> {
    let mut best: Option<(f32, bevy_ecs::entity::Entity)> = None;
    for other in units.iter().filter(|u| u.faction != faction) {
        if !is_within_line_of_fire(center, direction, maximum_range, other.center) {
            continue;
        }
        let distance_sq = other.center.distance_squared(center);
        if best.map_or(true, |(d, _)| distance_sq < d) {
            best = Some((distance_sq, other.entity));
        }
    }
    best.map(|(_, entity)| entity)
}

/// Write the shooting fields of `next` from the committed `current` state.
///
/// Only Standing units shoot. When the timer runs out the target is
/// re-validated (or a new one acquired and locked), and if it is in the
/// line of fire the shooting counter advances and the timer rearms with a
/// little jitter. Without a target the timer stays expired so the unit
/// checks again next tick.
pub fn advance_shooting(
    current: &UnitState,
    next: &mut UnitState,
    faction: Faction,
    maximum_range: f32,
    units: &[UnitSummary],
    dt: f32,
    rng: &mut impl Rng,
) {
    next.shooting_counter = current.shooting_counter;
    next.ranged_target = current.ranged_target;

    if current.mode != UnitMode::Standing {
        next.shooting_timer = SHOOTING_INTERVAL;
        return;
    }
    if current.shooting_timer >= dt {
        next.shooting_timer = current.shooting_timer - dt;
        return;
    }

    let center = current.center;
    let direction = current.direction;
    let center_of = |entity| {
        units
            .iter()
            .find(|u| u.entity == entity)
            .map(|u| u.center)
    };

    let mut target = current.ranged_target;
    if target.locked {
        let still_valid = target
            .unit
            .and_then(center_of)
            .is_some_and(|c| is_within_line_of_fire(center, direction, maximum_range, c));
        if !still_valid {
            tracing::trace!(unit = ?target.unit, "ranged target released");
            target.release();
        }
    }
    if !target.locked {
        target.unit =
            closest_enemy_in_line_of_fire(faction, center, direction, maximum_range, units);
        target.locked = target.unit.is_some();
    }

    next.shooting_timer = 0.0;
    let in_line_of_fire = target
        .unit
        .and_then(center_of)
        .is_some_and(|c| is_within_line_of_fire(center, direction, maximum_range, c));
    if in_line_of_fire {
        next.shooting_counter = current.shooting_counter + 1;
        next.shooting_timer = SHOOTING_INTERVAL + rng.gen_range(0..100) as f32 / 200.0;
    }
    next.ranged_target = target;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::entity::Entity;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn summary(id: u32, faction: Faction, x: f32, y: f32) -> UnitSummary {
        UnitSummary {
            entity: Entity::from_raw(id),
            faction,
            center: Vec2::new(x, y),
            morale: 1.0,
            training_level: 0.5,
        }
    }

    fn standing(center: Vec2) -> UnitState {
        UnitState {
            center,
            mode: UnitMode::Standing,
            ..Default::default()
        }
    }

    #[test]
    fn test_line_of_fire_bounds() {
        let c = Vec2::ZERO;
        assert!(is_within_line_of_fire(c, 0.0, 100.0, Vec2::new(50.0, 0.0)));
        assert!(!is_within_line_of_fire(c, 0.0, 100.0, Vec2::new(10.0, 0.0)));
        assert!(!is_within_line_of_fire(c, 0.0, 100.0, Vec2::new(101.0, 0.0)));
        // 45 degrees off the facing is still inside the cone
        assert!(is_within_line_of_fire(c, 0.0, 100.0, Vec2::new(40.0, 39.0)));
        assert!(!is_within_line_of_fire(c, 0.0, 100.0, Vec2::new(40.0, 45.0)));
        assert!(!is_within_line_of_fire(c, 0.0, 100.0, Vec2::new(-50.0, 0.0)));
    }

    #[test]
    fn test_closest_enemy_wins() {
        let units = [
            summary(1, Faction::Blue, 0.0, 0.0),
            summary(2, Faction::Red, 80.0, 0.0),
            summary(3, Faction::Red, 40.0, 5.0),
            summary(4, Faction::Blue, 30.0, 0.0),
        ];
        let target = closest_enemy_in_line_of_fire(Faction::Blue, Vec2::ZERO, 0.0, 100.0, &units);
        assert_eq!(target, Some(Entity::from_raw(3)));
    }

    #[test]
    fn test_moving_unit_rearms_timer() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let current = UnitState {
            mode: UnitMode::Moving,
            shooting_timer: 0.0,
            ..Default::default()
        };
        let mut next = UnitState::default();
        advance_shooting(&current, &mut next, Faction::Blue, 100.0, &[], 0.1, &mut rng);
        assert_eq!(next.shooting_timer, SHOOTING_INTERVAL);
    }

    #[test]
    fn test_expired_timer_acquires_locks_and_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let units = [
            summary(1, Faction::Blue, 100.0, 100.0),
            summary(2, Faction::Red, 150.0, 100.0),
        ];
        let current = standing(Vec2::new(100.0, 100.0));
        let mut next = UnitState::default();
        advance_shooting(&current, &mut next, Faction::Blue, 100.0, &units, 0.1, &mut rng);

        assert_eq!(next.shooting_counter, 1);
        assert_eq!(next.ranged_target.unit, Some(Entity::from_raw(2)));
        assert!(next.ranged_target.locked);
        assert!(next.shooting_timer >= SHOOTING_INTERVAL);
        assert!(next.shooting_timer < SHOOTING_INTERVAL + 0.5);
    }

    #[test]
    fn test_running_timer_counts_down() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let current = UnitState {
            shooting_timer: 1.0,
            shooting_counter: 3,
            ..standing(Vec2::ZERO)
        };
        let mut next = UnitState::default();
        advance_shooting(&current, &mut next, Faction::Blue, 100.0, &[], 0.25, &mut rng);
        assert_eq!(next.shooting_counter, 3);
        assert!((next.shooting_timer - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_target_out_of_range_is_swapped() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let units = [
            summary(2, Faction::Red, 400.0, 100.0),
            summary(3, Faction::Red, 160.0, 100.0),
        ];
        let current = UnitState {
            ranged_target: RangedTarget {
                unit: Some(Entity::from_raw(2)),
                locked: true,
            },
            ..standing(Vec2::new(100.0, 100.0))
        };
        let mut next = UnitState::default();
        advance_shooting(&current, &mut next, Faction::Blue, 100.0, &units, 0.1, &mut rng);
        assert_eq!(next.ranged_target.unit, Some(Entity::from_raw(3)));
        assert_eq!(next.shooting_counter, 1);
    }

    #[test]
    fn test_no_target_keeps_timer_expired() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let current = UnitState {
            ranged_target: RangedTarget {
                unit: Some(Entity::from_raw(9)),
                locked: true,
            },
            ..standing(Vec2::ZERO)
        };
        let mut next = UnitState::default();
        advance_shooting(&current, &mut next, Faction::Blue, 100.0, &[], 0.1, &mut rng);
        assert_eq!(next.shooting_counter, 0);
        assert_eq!(next.shooting_timer, 0.0);
        assert_eq!(next.ranged_target, RangedTarget::default());
    }
}
