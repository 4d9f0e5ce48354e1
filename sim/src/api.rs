//! Public API for the simulation.
//!
//! `SimWorld` is the single handle renderers and input layers talk to. It owns
//! the ECS world and the tick schedule, and exposes three kinds of entry points:
//!
//! - **Construction** - [`SimWorld::new`] generates terrain from the configured
//!   seed; [`SimWorld::with_terrain`] takes a prepared grid.
//! - **Mutation** - [`SimWorld::update`] runs one tick and
//!   [`SimWorld::issue_move`] orders a set of units. Both take `&mut self`, so a
//!   move order can never land in the middle of a tick.
//! - **Queries** - snapshots, per-agent lookups and selection helpers.
//!
//! ## Tick order
//!
//! One `update(dt)` runs the chained schedule once:
//!
//! 1. unit movement (also death timers and animation clocks)
//! 2. player fire
//! 3. enemy fire
//! 4. enemy re-path, then enemy movement
//! 5. projectile advance and hits
//! 6. particle decay
//! 7. death sweep
//!
//! Commands issued by one phase are applied before the next one runs.

use crate::components::*;
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::pathfinding::Pathfinder;
use crate::systems::*;
use crate::terrain::{TerrainGrid, TerrainResource, TerrainSnapshot, TileCoord};
use crate::world::{agent_snapshots, AgentSnapshot, ProjectileSnapshot, Snapshot};
use bevy_ecs::prelude::*;
use rand::Rng;
use std::collections::HashMap;
use std::f32::consts::TAU;

/// Formation slot `i` of `n` around `center`.
///
/// Slots are spread evenly by angle (`i / n` of a full turn) and pushed outward
/// in three rings: the radius is `spread * (1 + i % 3)`.
pub fn formation_target(center: (f32, f32), i: usize, n: usize, spread: f32) -> (f32, f32) {
    let angle = i as f32 / n.max(1) as f32 * TAU;
    let radius = spread * (1 + i % 3) as f32;
    (
        center.0 + angle.cos() * radius,
        center.1 + angle.sin() * radius,
    )
}

/// The main simulation world container.
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    tick: u64,
    time: f32,
    next_agent_id: u32,
    config: SimConfig,
    terrain: TerrainResource,
}

impl SimWorld {
    /// Create a world with generated terrain and the configured population.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let grid = TerrainGrid::generate(
            config.world.width,
            config.world.height,
            config.world.tile_size,
            config.terrain_seed,
            config.water_threshold,
            config.dirt_threshold,
        );
        Self::with_terrain(config, grid)
    }

    /// Create a world over a prepared grid. The grid's dimensions win over the
    /// ones in `config.world`.
    pub fn with_terrain(mut config: SimConfig, grid: TerrainGrid) -> SimResult<Self> {
        config.world.width = grid.width();
        config.world.height = grid.height();
        config.world.tile_size = grid.tile_size();
        config.validate()?;

        let terrain = TerrainResource::new(grid);
        let mut world = World::new();

        // Core resources
        world.insert_resource(DeltaTime(0.0));
        world.insert_resource(config.clone());
        world.insert_resource(terrain.clone());
        world.insert_resource(ShotCounter::default());

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                unit_movement_system,
                player_fire_system,
                enemy_fire_system,
                enemy_repath_system,
                enemy_movement_system,
                projectile_system,
                particle_decay_system,
                death_sweep_system,
            )
                .chain(),
        );

        let mut sim = Self {
            world,
            schedule,
            tick: 0,
            time: 0.0,
            next_agent_id: 1,
            config,
            terrain,
        };

        let mut rng = SimRng::seeded(sim.config.rng_seed);
        sim.populate(&mut rng)?;
        sim.world.insert_resource(rng);

        let (units, enemies) = (sim.unit_count(), sim.enemy_count());
        let grid = sim.terrain.grid();
        tracing::info!(
            width = grid.width(),
            height = grid.height(),
            units,
            enemies,
            walkable = grid.walkable_fraction(),
            "simulation world created"
        );
        Ok(sim)
    }

    /// Place the starting units around the map centre and the enemies on random
    /// walkable tiles away from it.
    fn populate(&mut self, rng: &mut SimRng) -> SimResult<()> {
        let terrain = self.terrain.clone();
        let grid = terrain.grid();
        let (world_w, world_h) = grid.world_size();
        let (cx, cy) = (world_w / 2.0, world_h / 2.0);
        let search_radius = grid.width().max(grid.height()) as i32;

        let count = self.config.unit_count;
        let spacing = self.config.unit_spacing;
        for i in 0..count {
            let x = cx + (i as f32 - count as f32 / 2.0) * spacing;
            let y = cy + ((i % 5) as f32 - 2.0) * spacing;
            let (x, y) = if grid.is_walkable(x, y) {
                (x, y)
            } else {
                let tile = grid.world_to_tile(x, y);
                let clamped = TileCoord::new(
                    tile.x.clamp(0, grid.width() as i32 - 1),
                    tile.y.clamp(0, grid.height() as i32 - 1),
                );
                let snapped = grid
                    .find_nearest_walkable(clamped, search_radius)
                    .ok_or(SimError::NoWalkableTile {
                        faction: Faction::Player,
                    })?;
                grid.tile_center(snapped)
            };
            self.spawn(Faction::Player, x, y, 0.0);
        }

        if self.config.enemy_count == 0 {
            return Ok(());
        }
        let clearance_sq = self.config.enemy_spawn_clearance * self.config.enemy_spawn_clearance;
        let centre = Position::new(cx, cy);
        let mut spots: Vec<TileCoord> = grid
            .walkable_tiles()
            .filter(|tile| {
                let (x, y) = grid.tile_center(*tile);
                Position::new(x, y).distance_sq_to(&centre) >= clearance_sq
            })
            .collect();
        if spots.is_empty() {
            spots = grid.walkable_tiles().collect();
        }
        if spots.is_empty() {
            return Err(SimError::NoWalkableTile {
                faction: Faction::Enemy,
            });
        }

        for _ in 0..self.config.enemy_count {
            let tile = spots[rng.0.gen_range(0..spots.len())];
            let (x, y) = grid.tile_center(tile);
            let repath_in = rng.repath_interval(&self.config);
            self.spawn(Faction::Enemy, x, y, repath_in);
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        id
    }

    /// Add one agent with its faction's tuning. `repath_in` seeds an enemy's
    /// re-path timer and is ignored for units.
    fn spawn(&mut self, faction: Faction, x: f32, y: f32, repath_in: f32) -> AgentId {
        let id = self.allocate_id();
        let bundle = AgentBundle::new(
            id,
            faction,
            x,
            y,
            self.config.speed(faction),
            self.config.max_health(faction),
        );
        match faction {
            Faction::Player => self.world.spawn(bundle),
            Faction::Enemy => self.world.spawn((bundle, AiControlled { repath_in })),
        };
        id
    }

    /// Place an agent outside the initial population. Enemies start with the
    /// longest re-path interval.
    #[cfg(test)]
    pub(crate) fn spawn_agent(&mut self, faction: Faction, x: f32, y: f32) -> AgentId {
        self.spawn(faction, x, y, self.config.repath_max)
    }

    /// Advance the simulation by one tick of `dt` seconds.
    ///
    /// `dt` is clamped to `max_step`; a negative or non-finite `dt` runs a tick of
    /// length zero.
    pub fn update(&mut self, dt: f32) {
        let dt = if dt.is_finite() && dt > 0.0 {
            dt.min(self.config.max_step)
        } else {
            0.0
        };

        // Update delta time resource
        if let Some(mut dt_res) = self.world.get_resource_mut::<DeltaTime>() {
            dt_res.0 = dt;
        }

        // Run all systems
        self.schedule.run(&mut self.world);

        self.tick += 1;
        self.time += dt;
    }

    /// Order the given units to move to `(x, y)` in a ring formation.
    ///
    /// Duplicate ids count once. Ids that are unknown, belong to enemies or to
    /// dying units are skipped and do not take a formation slot. Each unit gets a
    /// path to its slot; when none exists it heads straight for the slot if that is
    /// walkable, and for `(x, y)` itself otherwise. A non-finite target is
    /// ignored.
    pub fn issue_move(&mut self, ids: impl IntoIterator<Item = AgentId>, x: f32, y: f32) {
        let mut requested: Vec<AgentId> = Vec::new();
        for id in ids {
            if !requested.contains(&id) {
                requested.push(id);
            }
        }
        if requested.is_empty() || !x.is_finite() || !y.is_finite() {
            return;
        }
        let n = requested.len();

        let movable: HashMap<AgentId, (Entity, Position)> = self
            .world
            .query::<(Entity, &AgentId, &Faction, &Position, &Health, &Lifecycle)>()
            .iter(&self.world)
            .filter(|(_, _, faction, _, health, lifecycle)| {
                **faction == Faction::Player && health.is_alive() && !lifecycle.is_dying()
            })
            .map(|(entity, id, _, pos, _, _)| (*id, (entity, *pos)))
            .collect();

        let terrain = self.terrain.clone();
        let grid = terrain.grid();
        let pathfinder = Pathfinder::new(grid);
        let spread = self.config.formation_spread;

        let mut slot = 0;
        for id in requested {
            let Some(&(entity, pos)) = movable.get(&id) else {
                continue;
            };
            let (tx, ty) = formation_target((x, y), slot, n, spread);
            slot += 1;

            let Some(mut movement) = self.world.get_mut::<Movement>(entity) else {
                continue;
            };
            match pathfinder.find_world_path((pos.x, pos.y), (tx, ty)) {
                Some(path) => movement.follow(path),
                None if grid.is_walkable(tx, ty) => {
                    tracing::debug!(unit = id.0, tx, ty, "no path; moving directly");
                    movement.go_direct(Waypoint::new(tx, ty));
                }
                None => {
                    tracing::debug!(unit = id.0, x, y, "no path; heading for raw target");
                    movement.go_direct(Waypoint::new(x, y));
                }
            }
        }
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Player units, in id order.
    pub fn units(&mut self) -> Vec<AgentSnapshot> {
        agent_snapshots(&mut self.world).0
    }

    /// Enemies, in id order.
    pub fn enemies(&mut self) -> Vec<AgentSnapshot> {
        agent_snapshots(&mut self.world).1
    }

    /// In-flight projectiles, in firing order.
    pub fn projectiles(&mut self) -> Vec<ProjectileSnapshot> {
        self.snapshot().projectiles
    }

    /// Any agent still in the world, dying ones included.
    pub fn agent(&mut self, id: AgentId) -> Option<AgentSnapshot> {
        let (units, enemies) = agent_snapshots(&mut self.world);
        units.into_iter().chain(enemies).find(|agent| agent.id == id.0)
    }

    /// Living units inside the rectangle spanned by two corners (drag-select).
    pub fn unit_ids_in_rect(&mut self, a: (f32, f32), b: (f32, f32)) -> Vec<AgentId> {
        let (min_x, max_x) = (a.0.min(b.0), a.0.max(b.0));
        let (min_y, max_y) = (a.1.min(b.1), a.1.max(b.1));
        self.selectable_units()
            .filter(|unit| {
                unit.x >= min_x && unit.x <= max_x && unit.y >= min_y && unit.y <= max_y
            })
            .map(|unit| AgentId(unit.id))
            .collect()
    }

    /// Nearest living unit within `radius` of `(x, y)` (click-select).
    pub fn unit_at(&mut self, x: f32, y: f32, radius: f32) -> Option<AgentId> {
        let click = Position::new(x, y);
        let radius_sq = radius * radius;
        let mut best: Option<(AgentId, f32)> = None;
        for unit in self.selectable_units() {
            let d2 = click.distance_sq_to(&Position::new(unit.x, unit.y));
            if d2 <= radius_sq && best.map_or(true, |(_, best_d2)| d2 < best_d2) {
                best = Some((AgentId(unit.id), d2));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Living, non-dying units in id order.
    fn selectable_units(&mut self) -> impl Iterator<Item = AgentSnapshot> {
        self.units()
            .into_iter()
            .filter(|unit| unit.health > 0.0 && unit.state != AgentState::Dying)
    }

    fn count_faction(&mut self, faction: Faction) -> usize {
        self.world
            .query::<(&AgentId, &Faction)>()
            .iter(&self.world)
            .filter(|(_, f)| **f == faction)
            .count()
    }

    /// Player units still in the world, dying ones included.
    pub fn unit_count(&mut self) -> usize {
        self.count_faction(Faction::Player)
    }

    /// Enemies still in the world, dying ones included.
    pub fn enemy_count(&mut self) -> usize {
        self.count_faction(Faction::Enemy)
    }

    pub fn projectile_count(&mut self) -> usize {
        self.world.query::<&Projectile>().iter(&self.world).count()
    }

    pub fn terrain(&self) -> &TerrainGrid {
        self.terrain.grid()
    }

    /// Get a full terrain snapshot.
    pub fn terrain_snapshot(&self) -> TerrainSnapshot {
        TerrainSnapshot::from_grid(self.terrain.grid())
    }

    /// Get terrain snapshot as JSON.
    pub fn terrain_snapshot_json(&self) -> String {
        terrain_to_json_string(&self.terrain_snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
