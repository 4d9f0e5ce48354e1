//! End-of-tick housekeeping: particle decay (phase 6) and the death sweep
//! (phase 7).

use crate::components::*;
use crate::config::SimConfig;
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;

/// Moves particles and removes the ones whose lifetime ran out.
pub fn particle_decay_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    mut query: Query<(Entity, &mut Particle, &mut Position, &Velocity)>,
) {
    let delta = dt.0;
    for (entity, mut particle, mut pos, vel) in query.iter_mut() {
        pos.x += vel.vx * delta;
        pos.y += vel.vy * delta;
        particle.ttl -= delta;
        if particle.ttl <= 0.0 {
            commands.entity(entity).despawn();
        }
    }
}

/// Removes dying agents whose death duration has elapsed.
pub fn death_sweep_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    query: Query<(Entity, &AgentId, &Faction, &Lifecycle)>,
) {
    for (entity, id, faction, lifecycle) in query.iter() {
        if lifecycle.is_expired(config.death_duration) {
            tracing::debug!(agent = id.0, ?faction, "removing dead agent");
            commands.entity(entity).despawn();
        }
    }
}
