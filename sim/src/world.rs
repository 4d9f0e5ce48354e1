//! Snapshot types.
//!
//! A `Snapshot` is a serializable, read-only view of the simulation state for
//! renderers, minimaps and selection tools. Agents are listed in id order.

use crate::components::*;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a single unit or enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: u32,
    pub faction: Faction,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub health_max: f32,
    pub state: AgentState,
    pub death_elapsed: f32,
    pub anim_time: f32,
    /// Current movement target, if any.
    pub target: Option<Waypoint>,
    pub waypoints_left: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub owner: Faction,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub ttl: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSnapshot {
    pub kind: ParticleKind,
    pub x: f32,
    pub y: f32,
    /// Remaining lifetime in `[0, 1]`.
    pub life_fraction: f32,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    /// Player units.
    pub units: Vec<AgentSnapshot>,
    pub enemies: Vec<AgentSnapshot>,
    /// In-flight projectiles, in firing order.
    pub projectiles: Vec<ProjectileSnapshot>,
    pub particles: Vec<ParticleSnapshot>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let (units, enemies) = agent_snapshots(world);

        let mut shots: Vec<(u64, ProjectileSnapshot)> = world
            .query::<(&Projectile, &Position, &Velocity)>()
            .iter(world)
            .map(|(projectile, pos, vel)| {
                (
                    projectile.serial,
                    ProjectileSnapshot {
                        owner: projectile.owner,
                        x: pos.x,
                        y: pos.y,
                        vx: vel.vx,
                        vy: vel.vy,
                        ttl: projectile.ttl,
                    },
                )
            })
            .collect();
        shots.sort_by_key(|(serial, _)| *serial);

        let particles = world
            .query::<(&Particle, &Position)>()
            .iter(world)
            .map(|(particle, pos)| ParticleSnapshot {
                kind: particle.kind,
                x: pos.x,
                y: pos.y,
                life_fraction: particle.life_fraction(),
            })
            .collect();

        Self {
            tick,
            time,
            units,
            enemies,
            projectiles: shots.into_iter().map(|(_, s)| s).collect(),
            particles,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Look up an agent of either faction.
    pub fn agent(&self, id: AgentId) -> Option<&AgentSnapshot> {
        self.units
            .iter()
            .chain(self.enemies.iter())
            .find(|a| a.id == id.0)
    }
}

/// Units and enemies, each sorted by id.
pub(crate) fn agent_snapshots(world: &mut World) -> (Vec<AgentSnapshot>, Vec<AgentSnapshot>) {
    let mut units = Vec::new();
    let mut enemies = Vec::new();

    let mut query = world.query::<(
        &AgentId,
        &Faction,
        &Position,
        &Health,
        &Movement,
        &Lifecycle,
        &AnimClock,
    )>();
    for (id, faction, pos, health, movement, lifecycle, clock) in query.iter(world) {
        let snapshot = AgentSnapshot {
            id: id.0,
            faction: *faction,
            x: pos.x,
            y: pos.y,
            health: health.current,
            health_max: health.max,
            state: AgentState::of(movement, lifecycle),
            death_elapsed: lifecycle.death_elapsed,
            anim_time: clock.0,
            target: movement.target,
            waypoints_left: movement.path.len(),
        };
        match faction {
            Faction::Player => units.push(snapshot),
            Faction::Enemy => enemies.push(snapshot),
        }
    }

    units.sort_by_key(|a| a.id);
    enemies.sort_by_key(|a| a.id);
    (units, enemies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_lists_agents_in_id_order() {
        let mut world = World::new();
        world.spawn(AgentBundle::new(AgentId(5), Faction::Player, 1.0, 1.0, 1.0, 10.0));
        world.spawn(AgentBundle::new(AgentId(2), Faction::Player, 2.0, 2.0, 1.0, 10.0));
        let mut enemy = AgentBundle::new(AgentId(3), Faction::Enemy, 3.0, 3.0, 1.0, 6.0);
        enemy.lifecycle.begin_dying();
        world.spawn(enemy);

        let snapshot = Snapshot::from_world(&mut world, 7, 0.5);
        assert_eq!(snapshot.tick, 7);
        let ids: Vec<u32> = snapshot.units.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 5]);
        assert_eq!(snapshot.enemies.len(), 1);
        assert_eq!(snapshot.enemies[0].state, AgentState::Dying);
        assert_eq!(snapshot.agent(AgentId(3)).map(|a| a.health_max), Some(6.0));
        assert!(snapshot.agent(AgentId(9)).is_none());
    }

    #[test]
    fn test_projectiles_in_firing_order() {
        let mut world = World::new();
        for serial in [4u64, 1, 9] {
            world.spawn(ProjectileBundle {
                projectile: Projectile {
                    owner: Faction::Enemy,
                    damage: 1.0,
                    ttl: 1.0,
                    serial,
                },
                position: Position::new(serial as f32, 0.0),
                velocity: Velocity::default(),
            });
        }
        let snapshot = Snapshot::from_world(&mut world, 0, 0.0);
        let xs: Vec<f32> = snapshot.projectiles.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 4.0, 9.0]);
    }
}
