//! Combat system - target acquisition and firing.
//!
//! Each firing phase has two steps:
//!
//! 1. **Gather** - snapshot every living, non-dying candidate target of the
//!    opposing faction, sorted by `AgentId`.
//! 2. **Fire** - walk the shooters in `AgentId` order, tick their cooldowns and,
//!    when ready and a target is in range, spawn one projectile aimed at the
//!    target's current position.
//!
//! Projectiles are spawned through `Commands` and become visible to the
//! projectile phase after the schedule's sync point. Every shot takes the next
//! serial from [`ShotCounter`], which fixes the order projectiles resolve in.

use crate::components::*;
use crate::config::SimConfig;
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;

/// Monotonic shot counter; the next projectile's serial.
#[derive(Resource, Debug, Default)]
pub struct ShotCounter(pub u64);

impl ShotCounter {
    pub fn next(&mut self) -> u64 {
        let serial = self.0;
        self.0 += 1;
        serial
    }
}

/// Nearest candidate within `range` of `origin`, compared by squared distance.
///
/// `candidates` must already be in id order; on equal distance the earlier one
/// wins.
pub fn acquire_target(
    origin: &Position,
    candidates: &[(AgentId, Position)],
    range: f32,
) -> Option<(AgentId, Position)> {
    let range_sq = range * range;
    let mut best: Option<(AgentId, Position, f32)> = None;
    for (id, pos) in candidates {
        let d2 = origin.distance_sq_to(pos);
        if d2 > range_sq {
            continue;
        }
        match best {
            Some((_, _, best_d2)) if d2 >= best_d2 => {}
            _ => best = Some((*id, *pos, d2)),
        }
    }
    best.map(|(id, pos, _)| (id, pos))
}

type CombatQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static AgentId,
        &'static Faction,
        &'static Position,
        &'static Health,
        &'static Lifecycle,
        &'static mut FireCooldown,
    ),
>;

fn can_act(health: &Health, lifecycle: &Lifecycle) -> bool {
    health.is_alive() && !lifecycle.is_dying()
}

/// Run one firing phase for `shooter_faction`.
fn fire_volley(
    shooter_faction: Faction,
    dt: f32,
    config: &SimConfig,
    commands: &mut Commands,
    counter: &mut ShotCounter,
    query: &mut CombatQuery,
) {
    let target_faction = shooter_faction.opponent();

    // GATHER
    let mut candidates: Vec<(AgentId, Position)> = query
        .iter()
        .filter(|(_, _, faction, _, health, lifecycle, _)| {
            **faction == target_faction && can_act(health, lifecycle)
        })
        .map(|(_, id, _, pos, _, _, _)| (*id, *pos))
        .collect();
    candidates.sort_by_key(|(id, _)| *id);

    let mut shooters: Vec<(AgentId, Entity)> = query
        .iter()
        .filter(|(_, _, faction, _, health, lifecycle, _)| {
            **faction == shooter_faction && can_act(health, lifecycle)
        })
        .map(|(entity, id, _, _, _, _, _)| (*id, entity))
        .collect();
    shooters.sort_by_key(|(id, _)| *id);

    // FIRE
    let range = config.fire_range(shooter_faction);
    for (_, entity) in shooters {
        let Ok((_, _, _, origin, _, _, mut cooldown)) = query.get_mut(entity) else {
            continue;
        };
        cooldown.tick(dt);
        if !cooldown.is_ready() {
            continue;
        }
        let Some((_, target)) = acquire_target(origin, &candidates, range) else {
            continue;
        };

        commands.spawn(ProjectileBundle {
            projectile: Projectile {
                owner: shooter_faction,
                damage: config.projectile_damage(shooter_faction),
                ttl: config.projectile_lifetime,
                serial: counter.next(),
            },
            position: *origin,
            velocity: Velocity::toward(origin, &target, config.projectile_speed),
        });
        cooldown.reset(config.fire_cooldown(shooter_faction));
    }
}

/// Player units fire at enemies (phase 2).
pub fn player_fire_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut counter: ResMut<ShotCounter>,
    mut query: CombatQuery,
) {
    fire_volley(
        Faction::Player,
        dt.0,
        &config,
        &mut commands,
        &mut counter,
        &mut query,
    );
}

/// Enemies fire at player units (phase 3).
pub fn enemy_fire_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut counter: ResMut<ShotCounter>,
    mut query: CombatQuery,
) {
    fire_volley(
        Faction::Enemy,
        dt.0,
        &config,
        &mut commands,
        &mut counter,
        &mut query,
    );
}
