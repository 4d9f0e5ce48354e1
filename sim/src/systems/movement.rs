//! Movement system - walks agents along their queued waypoints.
//!
//! Per agent and tick: an idle agent with a queued path targets the path head; an
//! agent within the arrival threshold of its target pops the next waypoint (or
//! goes idle); otherwise it steps toward the target, but only onto walkable
//! terrain. A blocked step cancels the whole order. Dying agents skip all of this
//! and only advance their death timer.

use crate::components::*;
use crate::config::SimConfig;
use crate::terrain::TerrainResource;
use bevy_ecs::prelude::*;

/// Resource containing the delta time for the current tick.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// What one movement step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No target and nothing queued.
    Idle,
    /// Moved toward the current target.
    Advanced,
    /// Reached a waypoint; the next one is now the target.
    ReachedWaypoint,
    /// Reached the final target; the order is complete.
    Arrived,
    /// The step would have left walkable terrain; the order was dropped.
    Blocked,
}

/// Advance one living agent by `dt`.
///
/// The step never exceeds the remaining distance to the target, so the distance
/// to the current waypoint strictly decreases until it is within
/// `arrival_threshold`.
pub fn advance_agent(
    position: &mut Position,
    movement: &mut Movement,
    dt: f32,
    arrival_threshold: f32,
    is_walkable: impl Fn(f32, f32) -> bool,
) -> MoveOutcome {
    if movement.target.is_none() {
        movement.target = movement.path.front().copied();
    }
    let Some(target) = movement.target else {
        return MoveOutcome::Idle;
    };

    let dx = target.x - position.x;
    let dy = target.y - position.y;
    let dist = (dx * dx + dy * dy).sqrt();

    if dist < arrival_threshold {
        if movement.path.pop_front().is_some() {
            if let Some(next) = movement.path.front().copied() {
                movement.target = Some(next);
                return MoveOutcome::ReachedWaypoint;
            }
        }
        movement.stop();
        return MoveOutcome::Arrived;
    }

    let step = movement.speed * dt;
    let (nx, ny) = if step >= dist {
        (target.x, target.y)
    } else {
        (position.x + dx / dist * step, position.y + dy / dist * step)
    };
    if is_walkable(nx, ny) {
        position.x = nx;
        position.y = ny;
        MoveOutcome::Advanced
    } else {
        movement.stop();
        MoveOutcome::Blocked
    }
}

fn tick_agent(
    position: &mut Position,
    movement: &mut Movement,
    lifecycle: &mut Lifecycle,
    clock: &mut AnimClock,
    dt: f32,
    config: &SimConfig,
    terrain: &TerrainResource,
) {
    clock.0 += dt;
    if lifecycle.is_dying() {
        lifecycle.advance(dt);
        return;
    }
    let grid = terrain.grid();
    advance_agent(position, movement, dt, config.arrival_threshold, |x, y| {
        grid.is_walkable(x, y)
    });
}

/// Moves player units (phase 1).
pub fn unit_movement_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    terrain: Res<TerrainResource>,
    mut query: Query<
        (&mut Position, &mut Movement, &mut Lifecycle, &mut AnimClock),
        (With<AgentId>, Without<AiControlled>),
    >,
) {
    for (mut pos, mut movement, mut lifecycle, mut clock) in query.iter_mut() {
        tick_agent(
            &mut pos,
            &mut movement,
            &mut lifecycle,
            &mut clock,
            dt.0,
            &config,
            &terrain,
        );
    }
}

/// Moves enemies after they have re-pathed (phase 4).
pub fn enemy_movement_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    terrain: Res<TerrainResource>,
    mut query: Query<
        (&mut Position, &mut Movement, &mut Lifecycle, &mut AnimClock),
        (With<AgentId>, With<AiControlled>),
    >,
) {
    for (mut pos, mut movement, mut lifecycle, mut clock) in query.iter_mut() {
        tick_agent(
            &mut pos,
            &mut movement,
            &mut lifecycle,
            &mut clock,
            dt.0,
            &config,
            &terrain,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{TerrainGrid, TileKind};

    fn open(_: f32, _: f32) -> bool {
        true
    }

    #[test]
    fn test_idle_without_orders() {
        let mut pos = Position::new(0.0, 0.0);
        let mut movement = Movement::new(100.0);
        assert_eq!(advance_agent(&mut pos, &mut movement, 0.1, 2.0, open), MoveOutcome::Idle);
        assert_eq!(pos, Position::new(0.0, 0.0));
    }

    #[test]
    fn test_idle_agent_picks_up_queued_path() {
        let mut pos = Position::new(0.0, 0.0);
        let mut movement = Movement::new(10.0);
        movement.path = vec![Waypoint::new(50.0, 0.0)].into();
        assert_eq!(advance_agent(&mut pos, &mut movement, 1.0, 2.0, open), MoveOutcome::Advanced);
        assert_eq!(movement.target, Some(Waypoint::new(50.0, 0.0)));
        assert!((pos.x - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_walks_full_path_and_goes_idle() {
        let mut pos = Position::new(0.0, 0.0);
        let mut movement = Movement::new(100.0);
        movement.follow(vec![
            Waypoint::new(0.0, 0.0),
            Waypoint::new(32.0, 0.0),
            Waypoint::new(32.0, 32.0),
        ]);

        let mut outcomes = Vec::new();
        for _ in 0..40 {
            let outcome = advance_agent(&mut pos, &mut movement, 1.0 / 30.0, 2.0, open);
            outcomes.push(outcome);
            if outcome == MoveOutcome::Arrived {
                break;
            }
        }
        assert_eq!(outcomes.last(), Some(&MoveOutcome::Arrived));
        assert_eq!(
            outcomes.iter().filter(|o| **o == MoveOutcome::ReachedWaypoint).count(),
            2
        );
        assert!(movement.is_idle());
        assert!(pos.distance_to(&Position::new(32.0, 32.0)) < 2.0);
    }

    #[test]
    fn test_distance_strictly_decreases_without_overshoot() {
        // Fast agent, large step: the step is capped at the remaining distance.
        let mut pos = Position::new(0.0, 0.0);
        let mut movement = Movement::new(1000.0);
        movement.follow(vec![Waypoint::new(45.0, 0.0), Waypoint::new(45.0, 90.0)]);

        let mut last_target = movement.target;
        let mut last_dist = f32::MAX;
        for _ in 0..20 {
            let outcome = advance_agent(&mut pos, &mut movement, 1.0 / 30.0, 2.0, open);
            match outcome {
                MoveOutcome::Advanced => {
                    let target = movement.target.unwrap();
                    let dist = pos.distance_to(&target.into());
                    if movement.target == last_target {
                        assert!(dist < last_dist, "{dist} !< {last_dist}");
                    }
                    last_dist = dist;
                    last_target = movement.target;
                }
                MoveOutcome::ReachedWaypoint => {
                    last_target = movement.target;
                    last_dist = f32::MAX;
                }
                MoveOutcome::Arrived => break,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(movement.is_idle());
        assert_eq!(pos, Position::new(45.0, 90.0));
    }

    #[test]
    fn test_direct_target_arrival() {
        let mut pos = Position::new(0.0, 0.0);
        let mut movement = Movement::new(100.0);
        movement.go_direct(Waypoint::new(1.0, 1.0));
        assert_eq!(advance_agent(&mut pos, &mut movement, 0.1, 2.0, open), MoveOutcome::Arrived);
        assert!(movement.is_idle());
    }

    #[test]
    fn test_blocked_step_cancels_order() {
        let grid = TerrainGrid::from_fn(4, 1, 32.0, |t| {
            if t.x == 2 {
                TileKind::Water
            } else {
                TileKind::Grass
            }
        });
        let mut pos = Position::new(60.0, 16.0);
        let mut movement = Movement::new(300.0);
        movement.follow(vec![Waypoint::new(112.0, 16.0)]);
        let outcome = advance_agent(&mut pos, &mut movement, 0.1, 2.0, |x, y| grid.is_walkable(x, y));
        assert_eq!(outcome, MoveOutcome::Blocked);
        assert!(movement.is_idle());
        assert_eq!(pos, Position::new(60.0, 16.0));
    }

    #[test]
    fn test_dying_agent_only_advances_timer() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(SimConfig::default());
        world.insert_resource(TerrainResource::new(TerrainGrid::filled(
            8,
            8,
            32.0,
            TileKind::Grass,
        )));

        let mut bundle = AgentBundle::new(AgentId(1), Faction::Player, 16.0, 16.0, 100.0, 10.0);
        bundle.movement.go_direct(Waypoint::new(200.0, 16.0));
        bundle.lifecycle.begin_dying();
        let entity = world.spawn(bundle).id();

        let mut schedule = Schedule::default();
        schedule.add_systems(unit_movement_system);
        schedule.run(&mut world);

        let pos = world.get::<Position>(entity).unwrap();
        let lifecycle = world.get::<Lifecycle>(entity).unwrap();
        let clock = world.get::<AnimClock>(entity).unwrap();
        assert_eq!(*pos, Position::new(16.0, 16.0));
        assert!((lifecycle.death_elapsed - 0.1).abs() < 1e-6);
        assert!((clock.0 - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_unit_system_ignores_enemies() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(SimConfig::default());
        world.insert_resource(TerrainResource::new(TerrainGrid::filled(
            8,
            8,
            32.0,
            TileKind::Grass,
        )));

        let mut bundle = AgentBundle::new(AgentId(1), Faction::Enemy, 16.0, 16.0, 100.0, 10.0);
        bundle.movement.go_direct(Waypoint::new(200.0, 16.0));
        let enemy = world.spawn((bundle, AiControlled::default())).id();

        let mut schedule = Schedule::default();
        schedule.add_systems(unit_movement_system);
        schedule.run(&mut world);
        assert_eq!(world.get::<Position>(enemy).unwrap().x, 16.0);

        let mut schedule = Schedule::default();
        schedule.add_systems(enemy_movement_system);
        schedule.run(&mut world);
        assert!((world.get::<Position>(enemy).unwrap().x - 26.0).abs() < 1e-4);
    }
}
