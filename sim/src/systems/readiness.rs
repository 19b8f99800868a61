//! Fighter readiness - the melee cycle state machine.
//!
//! ```text
//! Unready --(unit has movement target)--> Prepared
//! Unready --(unit Standing)-------------> Readying   (readying timer = duration)
//! Readying --(timer expires)------------> Prepared
//! Prepared --(Moving, no target)--------> Unready
//! Prepared --(opponent acquired)--------> Striking   (striking timer = duration)
//! Striking --(timer expires)------------> Readying   (strike lands on opponent)
//! Stunned --(timer expires)-------------> Readying
//! ```
//!
//! A running timer counts down by one timestep while it is larger than the
//! timestep. Otherwise it snaps to zero and the transition happens on the
//! same tick, so timers never go negative.

use crate::components::{FighterState, ReadyState, UnitMode};

/// Unit-level facts the readiness transition depends on.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessContext {
    pub unit_mode: UnitMode,
    pub has_movement_target: bool,
    pub readying_duration: f32,
    pub striking_duration: f32,
    pub dt: f32,
}

/// Count a timer down by `dt`; `None` once it has expired.
#[inline]
fn count_down(timer: f32, dt: f32) -> Option<f32> {
    (timer > dt).then(|| timer - dt)
}

/// Write the readiness part of `next` from the committed `current` state.
///
/// `next.opponent` must already hold the opponent chosen this tick. Timers
/// that are not running in the resulting phase are zero.
pub fn advance_readiness(current: &FighterState, next: &mut FighterState, ctx: &ReadinessContext) {
    next.ready = current.ready;
    next.readying_timer = 0.0;
    next.striking_timer = 0.0;
    next.stunned_timer = 0.0;
    next.melee_target = None;

    match current.ready {
        ReadyState::Unready => {
            if ctx.has_movement_target {
                next.ready = ReadyState::Prepared;
            } else if ctx.unit_mode == UnitMode::Standing {
                next.ready = ReadyState::Readying;
                next.readying_timer = ctx.readying_duration;
            }
        }
        ReadyState::Readying => match count_down(current.readying_timer, ctx.dt) {
            Some(left) => next.readying_timer = left,
            None => next.ready = ReadyState::Prepared,
        },
        ReadyState::Prepared => {
            if ctx.unit_mode == UnitMode::Moving && !ctx.has_movement_target {
                next.ready = ReadyState::Unready;
            } else if next.opponent.is_some() {
                next.ready = ReadyState::Striking;
                next.striking_timer = ctx.striking_duration;
            }
        }
        ReadyState::Striking => match count_down(current.striking_timer, ctx.dt) {
            Some(left) => {
                next.striking_timer = left;
                next.opponent = current.opponent;
            }
            None => {
                next.melee_target = current.opponent;
                next.ready = ReadyState::Readying;
                next.readying_timer = ctx.readying_duration;
            }
        },
        ReadyState::Stunned => match count_down(current.stunned_timer, ctx.dt) {
            Some(left) => next.stunned_timer = left,
            None => {
                next.ready = ReadyState::Readying;
                next.readying_timer = ctx.readying_duration;
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::entity::Entity;

    const DT: f32 = 0.1;

    fn ctx(mode: UnitMode) -> ReadinessContext {
        ReadinessContext {
            unit_mode: mode,
            has_movement_target: false,
            readying_duration: 1.0,
            striking_duration: 0.5,
            dt: DT,
        }
    }

    fn step(current: &FighterState, ctx: &ReadinessContext) -> FighterState {
        let mut next = FighterState {
            opponent: current.opponent,
            ..Default::default()
        };
        advance_readiness(current, &mut next, ctx);
        next
    }

    #[test]
    fn test_unready_standing_starts_readying() {
        let next = step(&FighterState::default(), &ctx(UnitMode::Standing));
        assert_eq!(next.ready, ReadyState::Readying);
        assert_eq!(next.readying_timer, 1.0);
    }

    #[test]
    fn test_unready_with_movement_target_is_prepared() {
        let mut c = ctx(UnitMode::Moving);
        c.has_movement_target = true;
        let next = step(&FighterState::default(), &c);
        assert_eq!(next.ready, ReadyState::Prepared);
    }

    #[test]
    fn test_unready_moving_without_target_stays() {
        let next = step(&FighterState::default(), &ctx(UnitMode::Moving));
        assert_eq!(next.ready, ReadyState::Unready);
    }

    #[test]
    fn test_timer_equal_to_timestep_transitions_same_tick() {
        let current = FighterState {
            ready: ReadyState::Readying,
            readying_timer: DT,
            ..Default::default()
        };
        let next = step(&current, &ctx(UnitMode::Standing));
        assert_eq!(next.ready, ReadyState::Prepared);
        assert_eq!(next.readying_timer, 0.0);
    }

    #[test]
    fn test_timer_counts_down_without_going_negative() {
        let mut state = FighterState {
            ready: ReadyState::Readying,
            readying_timer: 0.35,
            ..Default::default()
        };
        let c = ctx(UnitMode::Standing);
        let mut ticks = 0;
        while state.ready == ReadyState::Readying {
            let next = step(&state, &c);
            assert!(next.readying_timer >= 0.0);
            assert!(next.readying_timer <= state.readying_timer);
            state = next;
            ticks += 1;
            assert!(ticks < 10);
        }
        assert_eq!(state.ready, ReadyState::Prepared);
        assert_eq!(ticks, 4);
    }

    #[test]
    fn test_prepared_with_opponent_strikes() {
        let current = FighterState {
            ready: ReadyState::Prepared,
            ..Default::default()
        };
        let mut next = FighterState {
            opponent: Some(Entity::from_raw(9)),
            ..Default::default()
        };
        advance_readiness(&current, &mut next, &ctx(UnitMode::Standing));
        assert_eq!(next.ready, ReadyState::Striking);
        assert_eq!(next.striking_timer, 0.5);
    }

    #[test]
    fn test_prepared_moving_without_target_goes_unready() {
        let current = FighterState {
            ready: ReadyState::Prepared,
            ..Default::default()
        };
        let next = step(&current, &ctx(UnitMode::Moving));
        assert_eq!(next.ready, ReadyState::Unready);
    }

    #[test]
    fn test_strike_lands_on_prior_opponent() {
        let opponent = Entity::from_raw(3);
        let current = FighterState {
            ready: ReadyState::Striking,
            striking_timer: DT,
            opponent: Some(opponent),
            ..Default::default()
        };
        let mut next = FighterState::default();
        advance_readiness(&current, &mut next, &ctx(UnitMode::Standing));
        assert_eq!(next.ready, ReadyState::Readying);
        assert_eq!(next.melee_target, Some(opponent));
        assert_eq!(next.readying_timer, 1.0);
        assert_eq!(next.striking_timer, 0.0);
    }

    #[test]
    fn test_striking_keeps_opponent_while_timer_runs() {
        let opponent = Entity::from_raw(4);
        let current = FighterState {
            ready: ReadyState::Striking,
            striking_timer: 0.3,
            opponent: Some(opponent),
            ..Default::default()
        };
        let mut next = FighterState::default();
        advance_readiness(&current, &mut next, &ctx(UnitMode::Standing));
        assert_eq!(next.ready, ReadyState::Striking);
        assert_eq!(next.opponent, Some(opponent));
        assert!(next.melee_target.is_none());
        assert!((next.striking_timer - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_stun_wears_off_into_readying() {
        let current = FighterState {
            ready: ReadyState::Stunned,
            stunned_timer: 0.05,
            ..Default::default()
        };
        let next = step(&current, &ctx(UnitMode::Standing));
        assert_eq!(next.ready, ReadyState::Readying);
        assert_eq!(next.stunned_timer, 0.0);
        assert_eq!(next.readying_timer, 1.0);
    }
}
