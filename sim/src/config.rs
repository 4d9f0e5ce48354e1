//! Simulation tuning.
//!
//! `SimConfig` is inserted into the ECS world as a resource so every system reads
//! the same constants. Nothing here is persisted by the simulation itself; a
//! caller may load a (partial) JSON document with [`SimConfig::from_json_str`].

use crate::components::Faction;
use crate::error::{SimError, SimResult};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Upper bound on sparks per hit; a kill spawns twice as many debris particles.
pub const MAX_SPARK_COUNT: u32 = 1024;

/// Grid dimensions handed to world creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Grid width in tiles.
    pub width: u32,
    /// Grid height in tiles.
    pub height: u32,
    /// Edge length of one tile in world units.
    pub tile_size: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            tile_size: 32.0,
        }
    }
}

/// Every adjustable constant of the simulation.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,

    /// Seed of the terrain LCG.
    pub terrain_seed: u32,
    /// Noise values below this become water.
    pub water_threshold: f64,
    /// Noise values below this (and above the water threshold) become dirt.
    pub dirt_threshold: f64,
    /// Seed for enemy placement and re-path jitter.
    pub rng_seed: u64,

    /// Largest `dt` accepted by a single update (seconds).
    pub max_step: f32,

    pub unit_count: u32,
    pub enemy_count: u32,
    /// Distance between neighbouring units in the starting block.
    pub unit_spacing: f32,
    /// Enemies are not placed closer than this to the map centre when possible.
    pub enemy_spawn_clearance: f32,

    pub unit_speed: f32,
    pub enemy_speed: f32,
    pub unit_health: f32,
    pub enemy_health: f32,

    pub player_fire_range: f32,
    pub enemy_fire_range: f32,
    /// Base fire cooldown shared by both factions (seconds).
    pub fire_cooldown: f32,
    /// Added to the base cooldown for enemies.
    pub enemy_cooldown_penalty: f32,
    pub player_damage: f32,
    pub enemy_damage: f32,

    pub projectile_speed: f32,
    /// Projectile time-to-live (seconds).
    pub projectile_lifetime: f32,
    pub hit_radius: f32,

    /// Time between lethal damage and removal from the simulation.
    pub death_duration: f32,

    /// Lower bound of the randomized enemy re-path interval (seconds).
    pub repath_min: f32,
    /// Upper bound of the randomized enemy re-path interval (seconds).
    pub repath_max: f32,

    /// Distance at which a waypoint counts as reached.
    pub arrival_threshold: f32,
    /// Base radius of the move-order formation ring.
    pub formation_spread: f32,

    pub particle_lifetime: f32,
    pub particle_speed: f32,
    /// Sparks emitted per hit.
    pub spark_count: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            terrain_seed: 12345,
            water_threshold: 0.12,
            dirt_threshold: 0.5,
            rng_seed: 0x5eed_cafe,
            max_step: 1.0 / 30.0,
            unit_count: 20,
            enemy_count: 24,
            unit_spacing: 24.0,
            enemy_spawn_clearance: 640.0,
            unit_speed: 120.0,
            enemy_speed: 90.0,
            unit_health: 10.0,
            enemy_health: 6.0,
            player_fire_range: 220.0,
            enemy_fire_range: 160.0,
            fire_cooldown: 0.6,
            enemy_cooldown_penalty: 0.3,
            player_damage: 3.0,
            enemy_damage: 2.0,
            projectile_speed: 600.0,
            projectile_lifetime: 2.0,
            hit_radius: 10.0,
            death_duration: 0.6,
            repath_min: 0.8,
            repath_max: 1.6,
            arrival_threshold: 2.0,
            formation_spread: 18.0,
            particle_lifetime: 0.35,
            particle_speed: 40.0,
            spark_count: 4,
        }
    }
}

impl SimConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_world(mut self, width: u32, height: u32, tile_size: f32) -> Self {
        self.world = WorldConfig {
            width,
            height,
            tile_size,
        };
        self
    }

    pub fn with_terrain_seed(mut self, seed: u32) -> Self {
        self.terrain_seed = seed;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    pub fn with_counts(mut self, units: u32, enemies: u32) -> Self {
        self.unit_count = units;
        self.enemy_count = enemies;
        self
    }

    /// Reject configurations the simulation cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        if self.world.width == 0 || self.world.height == 0 {
            return Err(SimError::invalid("world", "grid dimensions must be non-zero"));
        }
        positive("world.tile_size", self.world.tile_size)?;
        positive("max_step", self.max_step)?;
        positive("unit_health", self.unit_health)?;
        positive("enemy_health", self.enemy_health)?;
        positive("arrival_threshold", self.arrival_threshold)?;
        positive("projectile_lifetime", self.projectile_lifetime)?;

        for (field, value) in [
            ("unit_speed", self.unit_speed),
            ("enemy_speed", self.enemy_speed),
            ("player_fire_range", self.player_fire_range),
            ("enemy_fire_range", self.enemy_fire_range),
            ("fire_cooldown", self.fire_cooldown),
            ("enemy_cooldown_penalty", self.enemy_cooldown_penalty),
            ("projectile_speed", self.projectile_speed),
            ("hit_radius", self.hit_radius),
            ("death_duration", self.death_duration),
            ("repath_min", self.repath_min),
            ("repath_max", self.repath_max),
            ("player_damage", self.player_damage),
            ("enemy_damage", self.enemy_damage),
            ("unit_spacing", self.unit_spacing),
            ("enemy_spawn_clearance", self.enemy_spawn_clearance),
            ("formation_spread", self.formation_spread),
            ("particle_lifetime", self.particle_lifetime),
            ("particle_speed", self.particle_speed),
        ] {
            non_negative(field, value)?;
        }

        if !(self.repath_min <= self.repath_max) {
            return Err(SimError::invalid(
                "repath_max",
                format!("must be >= repath_min ({})", self.repath_min),
            ));
        }
        if self.spark_count > MAX_SPARK_COUNT {
            return Err(SimError::invalid(
                "spark_count",
                format!("must be at most {MAX_SPARK_COUNT}, got {}", self.spark_count),
            ));
        }
        if !(0.0..=1.0).contains(&self.water_threshold)
            || !(self.water_threshold..=1.0).contains(&self.dirt_threshold)
        {
            return Err(SimError::invalid(
                "dirt_threshold",
                "terrain thresholds must satisfy 0 <= water <= dirt <= 1",
            ));
        }
        Ok(())
    }

    pub fn fire_range(&self, faction: Faction) -> f32 {
        match faction {
            Faction::Player => self.player_fire_range,
            Faction::Enemy => self.enemy_fire_range,
        }
    }

    /// Cooldown applied after a shot; enemies pay the fixed penalty on top.
    pub fn fire_cooldown(&self, faction: Faction) -> f32 {
        match faction {
            Faction::Player => self.fire_cooldown,
            Faction::Enemy => self.fire_cooldown + self.enemy_cooldown_penalty,
        }
    }

    pub fn projectile_damage(&self, faction: Faction) -> f32 {
        match faction {
            Faction::Player => self.player_damage,
            Faction::Enemy => self.enemy_damage,
        }
    }

    pub fn speed(&self, faction: Faction) -> f32 {
        match faction {
            Faction::Player => self.unit_speed,
            Faction::Enemy => self.enemy_speed,
        }
    }

    pub fn max_health(&self, faction: Faction) -> f32 {
        match faction {
            Faction::Player => self.unit_health,
            Faction::Enemy => self.enemy_health,
        }
    }
}

fn positive(field: &'static str, value: f32) -> SimResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f32) -> SimResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(field, format!("must be non-negative, got {value}")))
    }
}
