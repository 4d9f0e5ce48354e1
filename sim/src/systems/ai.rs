//! Enemy AI - periodic re-pathing toward the nearest player unit.
//!
//! Every living enemy counts down its re-path timer. On expiry it picks the
//! nearest living unit (squared distance), asks the pathfinder for a route to it
//! and rolls a fresh timer from the configured jitter range, so enemies spread
//! their pathfinding over many ticks instead of all searching at once.
//!
//! ## Parallel Feature
//!
//! With `--features parallel` the searches of one tick run on the rayon pool.
//! Requests are gathered and results applied in `AgentId` order, so the outcome
//! does not depend on the feature.

use crate::components::*;
use crate::config::SimConfig;
use crate::pathfinding::Pathfinder;
use crate::systems::movement::DeltaTime;
use crate::terrain::TerrainResource;
use bevy_ecs::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Seeded random stream owned by the simulation.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub ChaCha8Rng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        use rand::SeedableRng;
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Random re-path interval within the configured bounds.
    pub fn repath_interval(&mut self, config: &SimConfig) -> f32 {
        self.0.gen_range(config.repath_min..=config.repath_max)
    }
}

/// One pending search.
#[derive(Debug, Clone, Copy)]
struct RepathRequest {
    entity: Entity,
    id: AgentId,
    from: Position,
    to: Position,
}

/// Re-paths enemies whose timer expired (phase 4a).
pub fn enemy_repath_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    terrain: Res<TerrainResource>,
    mut rng: ResMut<SimRng>,
    units: Query<(&AgentId, &Position, &Health, &Lifecycle), Without<AiControlled>>,
    mut enemies: Query<(
        Entity,
        &AgentId,
        &Position,
        &Health,
        &Lifecycle,
        &mut AiControlled,
        &mut Movement,
    )>,
) {
    let mut targets: Vec<(AgentId, Position)> = units
        .iter()
        .filter(|(_, _, health, lifecycle)| health.is_alive() && !lifecycle.is_dying())
        .map(|(id, pos, _, _)| (*id, *pos))
        .collect();
    targets.sort_by_key(|(id, _)| *id);

    let mut order: Vec<(AgentId, Entity)> = enemies
        .iter()
        .map(|(entity, id, ..)| (*id, entity))
        .collect();
    order.sort_by_key(|(id, _)| *id);

    let mut requests = Vec::new();
    for (_, entity) in order {
        let Ok((_, id, pos, health, lifecycle, mut ai, _)) = enemies.get_mut(entity) else {
            continue;
        };
        if !health.is_alive() || lifecycle.is_dying() {
            continue;
        }
        ai.repath_in -= dt.0;
        if ai.repath_in > 0.0 {
            continue;
        }
        if let Some(to) = nearest(pos, &targets) {
            requests.push(RepathRequest {
                entity,
                id: *id,
                from: *pos,
                to,
            });
        }
        ai.repath_in = rng.repath_interval(&config);
    }

    if requests.is_empty() {
        return;
    }

    let pathfinder = Pathfinder::new(terrain.grid());
    let search = |req: &RepathRequest| {
        pathfinder.find_world_path((req.from.x, req.from.y), (req.to.x, req.to.y))
    };

    #[cfg(feature = "parallel")]
    let results: Vec<_> = requests.par_iter().map(search).collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = requests.iter().map(search).collect();

    for (req, path) in requests.iter().zip(results) {
        match path {
            Some(waypoints) => {
                tracing::trace!(enemy = req.id.0, waypoints = waypoints.len(), "enemy re-pathed");
                if let Ok((.., mut movement)) = enemies.get_mut(req.entity) {
                    movement.follow(waypoints);
                }
            }
            None => {
                tracing::trace!(enemy = req.id.0, "no path to nearest unit; keeping orders");
            }
        }
    }
}

/// Position of the nearest target by squared distance; first in id order on ties.
fn nearest(origin: &Position, targets: &[(AgentId, Position)]) -> Option<Position> {
    let mut best: Option<(Position, f32)> = None;
    for (_, pos) in targets {
        let d2 = origin.distance_sq_to(pos);
        if best.map_or(true, |(_, best_d2)| d2 < best_d2) {
            best = Some((*pos, d2));
        }
    }
    best.map(|(pos, _)| pos)
}
