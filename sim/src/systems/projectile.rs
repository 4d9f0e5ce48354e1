//! Projectile advance and hit resolution (phase 5).
//!
//! Projectiles resolve in firing order. Each one moves by `velocity * dt` and
//! loses `dt` of its lifetime; it is discarded once its lifetime runs out or it
//! lands on non-walkable terrain. A surviving projectile hits the FIRST living
//! agent of the opposing faction (in id order) within the hit radius, not the
//! nearest one.
//!
//! A lethal hit only flags the target as dying; removal happens in the death
//! sweep once the death duration has elapsed.

use crate::components::*;
use crate::config::SimConfig;
use crate::systems::movement::DeltaTime;
use crate::terrain::TerrainResource;
use bevy_ecs::prelude::*;

/// Test whether a projectile at `at` hits any of `targets` (id order).
///
/// Returns the index of the first target within `hit_radius`.
pub fn first_hit(at: &Position, targets: &[(AgentId, Entity, Position)], hit_radius: f32) -> Option<usize> {
    let radius_sq = hit_radius * hit_radius;
    targets
        .iter()
        .position(|(_, _, pos)| at.distance_sq_to(pos) <= radius_sq)
}

pub fn projectile_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    terrain: Res<TerrainResource>,
    mut projectiles: Query<(Entity, &mut Projectile, &mut Position, &Velocity)>,
    mut agents: Query<
        (
            Entity,
            &AgentId,
            &Faction,
            &Position,
            Option<&mut Health>,
            &mut Lifecycle,
        ),
        Without<Projectile>,
    >,
) {
    let delta = dt.0;
    let grid = terrain.grid();

    // Living, non-dying targets per faction, in id order. Updated as hits land so
    // later projectiles in the same tick skip agents killed earlier.
    let living = |faction: Faction| {
        let mut list: Vec<(AgentId, Entity, Position)> = agents
            .iter()
            .filter(|(_, _, f, _, health, lifecycle)| {
                **f == faction
                    && !lifecycle.is_dying()
                    && health.as_ref().map_or(true, |h| h.is_alive())
            })
            .map(|(entity, id, _, pos, _, _)| (*id, entity, *pos))
            .collect();
        list.sort_by_key(|(id, ..)| *id);
        list
    };
    let mut players = living(Faction::Player);
    let mut enemies = living(Faction::Enemy);

    let mut order: Vec<(u64, Entity)> = projectiles
        .iter()
        .map(|(entity, projectile, ..)| (projectile.serial, entity))
        .collect();
    order.sort_unstable();

    for (_, entity) in order {
        let Ok((_, mut projectile, mut pos, vel)) = projectiles.get_mut(entity) else {
            continue;
        };
        pos.x += vel.vx * delta;
        pos.y += vel.vy * delta;
        projectile.ttl -= delta;

        if projectile.ttl <= 0.0 || !grid.is_walkable(pos.x, pos.y) {
            commands.entity(entity).despawn();
            continue;
        }

        let targets = match projectile.owner {
            Faction::Player => &mut enemies,
            Faction::Enemy => &mut players,
        };
        let Some(index) = first_hit(&pos, targets, config.hit_radius) else {
            continue;
        };

        commands.entity(entity).despawn();
        let impact = *pos;
        let (target_id, target_entity, _) = targets[index];

        if let Ok((_, _, _, _, health, mut lifecycle)) = agents.get_mut(target_entity) {
            if let Some(mut health) = health {
                health.damage(projectile.damage);
                if !health.is_alive() {
                    lifecycle.begin_dying();
                    targets.remove(index);
                    tracing::debug!(agent = target_id.0, "agent killed");
                    commands.spawn_batch(
                        ParticleBundle::burst(
                            ParticleKind::Debris,
                            impact,
                            config.spark_count.saturating_mul(2),
                            config.particle_speed * 0.5,
                            config.particle_lifetime * 2.0,
                        )
                        .collect::<Vec<_>>(),
                    );
                }
            }
        }

        commands.spawn_batch(
            ParticleBundle::burst(
                ParticleKind::Spark,
                impact,
                config.spark_count,
                config.particle_speed,
                config.particle_lifetime,
            )
            .collect::<Vec<_>>(),
        );
    }
}
