//! Combat resolution: melee strikes, volley triggering and projectile
//! impacts.
//!
//! All three systems gather their work in roster order first and then apply
//! it, so random draws happen in a fixed order and no strike sees another
//! strike's half-applied result.

use crate::components::*;
use crate::config::SimConfig;
use crate::events::{Projectile, RecentEvents, Shooting, Shootings};
use crate::spatial::FighterGrid;
use crate::world::{SimRng, UnitRoster};
use bevy_ecs::prelude::*;
use glam::Vec2;
use rand::Rng;

/// How long a fighter that survives a strike stays stunned.
pub const STUN_DURATION: f32 = 0.6;

/// Every fighter this close to a projectile's landing point is hit.
pub const IMPACT_RADIUS: f32 = 0.5;

/// Maximum aiming error per axis.
const AIM_SCATTER: f32 = 10.0;

/// Chance that a strike kills. Values above one always kill.
///
/// Better-trained attackers hit harder and better-trained defenders shrug
/// more off; ranged units are poor in melee, and moving attackers get a
/// bonus from their speed.
pub fn kill_probability(
    attacker_training: f32,
    defender_training: f32,
    attacker_is_ranged: bool,
    attacker_speed: f32,
) -> f32 {
    let ranged_penalty = if attacker_is_ranged { 0.15 } else { 1.0 };
    0.5 * (1.25 + attacker_training)
        * (1.25 - defender_training)
        * ranged_penalty
        * (0.9 + attacker_speed / 10.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeOutcome {
    Kill,
    Stun,
}

/// Apply one strike to its target given a uniform `roll` in `[0, 1)`.
pub fn apply_strike(
    roll: f32,
    probability: f32,
    target: &mut FighterState,
    casualty: &mut CasualtyFlag,
) -> StrikeOutcome {
    if roll < probability {
        casualty.0 = true;
        StrikeOutcome::Kill
    } else {
        target.ready = ReadyState::Stunned;
        target.stunned_timer = STUN_DURATION;
        StrikeOutcome::Stun
    }
}

struct PendingStrike {
    attacker: Entity,
    target: Entity,
    probability: f32,
    readying_duration: f32,
}

/// Land every strike whose timer ran out this tick.
pub fn resolve_melee_system(
    roster: Res<UnitRoster>,
    mut rng: ResMut<SimRng>,
    units: Query<(&UnitStats, &Fighters)>,
    mut fighters: Query<(&mut FighterState, &mut CasualtyFlag, &FighterOf)>,
) {
    let mut strikes = Vec::new();
    for &unit in roster.entities() {
        let Ok((stats, members)) = units.get(unit) else {
            continue;
        };
        for &attacker in &members.0 {
            let Ok((state, _, _)) = fighters.get(attacker) else {
                continue;
            };
            let Some(target) = state.melee_target else {
                continue;
            };
            let Ok((_, _, target_of)) = fighters.get(target) else {
                tracing::trace!(?attacker, ?target, "melee target no longer valid");
                continue;
            };
            let Ok((defender_stats, _)) = units.get(target_of.0) else {
                continue;
            };
            strikes.push(PendingStrike {
                attacker,
                target,
                probability: kill_probability(
                    stats.training_level,
                    defender_stats.training_level,
                    stats.weapon.is_ranged(),
                    state.velocity.length(),
                ),
                readying_duration: stats.readying_duration,
            });
        }
    }

    let mut kills = 0usize;
    for strike in &strikes {
        let roll: f32 = rng.0.gen();
        if let Ok((mut target, mut casualty, _)) = fighters.get_mut(strike.target) {
            if apply_strike(roll, strike.probability, &mut target, &mut casualty)
                == StrikeOutcome::Kill
            {
                kills += 1;
            }
        }
        if let Ok((mut attacker, _, _)) = fighters.get_mut(strike.attacker) {
            attacker.readying_timer = strike.readying_duration;
        }
    }

    if !strikes.is_empty() {
        tracing::trace!(strikes = strikes.len(), kills, "melee resolved");
    }
}

/// Build a volley from the Prepared fighters of a unit aiming at
/// `target_center`.
///
/// Each projectile lands within `AIM_SCATTER` of the target center on each
/// axis. The volley lands after the mean projectile distance, taken over
/// all fighters of the unit, divided by the projectile speed.
pub fn build_volley(
    weapon: Weapon,
    fighters: &[FighterState],
    target_center: Vec2,
    rng: &mut impl Rng,
) -> Shooting {
    let count = fighters.len().max(1) as f32;
    let mut distance = 0.0;
    let mut projectiles = Vec::new();
    for fighter in fighters.iter().filter(|f| f.ready == ReadyState::Prepared) {
        let target = target_center
            + Vec2::new(
                rng.gen_range(-AIM_SCATTER..AIM_SCATTER),
                rng.gen_range(-AIM_SCATTER..AIM_SCATTER),
            );
        let delay = weapon.launch_jitter() * rng.gen::<f32>();
        distance += fighter.position.distance(target) / count;
        projectiles.push(Projectile {
            origin: fighter.position,
            target,
            delay,
        });
    }

    Shooting {
        weapon,
        projectiles,
        time_to_impact: distance / weapon.projectile_speed(),
    }
}

/// Turn every new shooting opportunity into a volley.
///
/// Routing units let the opportunity pass. A unit whose ranged target no
/// longer exists fires nothing.
pub fn trigger_volleys_system(
    roster: Res<UnitRoster>,
    mut rng: ResMut<SimRng>,
    mut shootings: ResMut<Shootings>,
    mut recent: ResMut<RecentEvents>,
    mut units: Query<(&UnitStats, &UnitState, &Fighters, &mut ShotsTriggered)>,
    centers: Query<&UnitState>,
    fighters: Query<&FighterState>,
) {
    for &unit in roster.entities() {
        let Ok((stats, state, members, mut shots)) = units.get_mut(unit) else {
            continue;
        };
        if state.shooting_counter <= shots.0 {
            continue;
        }
        shots.0 = state.shooting_counter;
        if state.is_routing() {
            continue;
        }

        let target_center = state
            .ranged_target
            .unit
            .and_then(|target| centers.get(target).ok())
            .map(|target| target.center);
        let Some(target_center) = target_center else {
            tracing::trace!(?unit, "volley skipped, ranged target gone");
            continue;
        };

        let shooters: Vec<FighterState> = members
            .0
            .iter()
            .filter_map(|&f| fighters.get(f).ok())
            .copied()
            .collect();
        let volley = build_volley(stats.weapon, &shooters, target_center, &mut rng.0);
        tracing::debug!(
            ?unit,
            projectiles = volley.projectiles.len(),
            time_to_impact = volley.time_to_impact,
            "volley fired"
        );
        recent.shootings.push(volley.clone());
        shootings.0.push(volley);
    }
}

/// Age volleys in flight and resolve those that land.
///
/// A landing projectile flags every fighter within `IMPACT_RADIUS` of its
/// landing point, friend or foe. Spent volleys are dropped.
pub fn resolve_impacts_system(
    config: Res<SimConfig>,
    fighter_grid: Res<FighterGrid>,
    mut shootings: ResMut<Shootings>,
    mut casualties: Query<&mut CasualtyFlag>,
) {
    for shooting in shootings.0.iter_mut() {
        shooting.time_to_impact -= config.fixed_timestep;
        if shooting.time_to_impact > 0.0 {
            continue;
        }
        for projectile in shooting.projectiles.drain(..) {
            let hits = fighter_grid
                .0
                .query(projectile.target.x, projectile.target.y, IMPACT_RADIUS);
            for hit in hits {
                if let Ok(mut flag) = casualties.get_mut(hit.fighter) {
                    flag.0 = true;
                }
            }
        }
    }
    shootings.0.retain(|s| !s.projectiles.is_empty());
}
