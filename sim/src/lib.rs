//! Real-time skirmish simulation core.
//!
//! A tile grid with seeded terrain, A* pathfinding, player units that follow move
//! orders and autonomous enemies that hunt them, all fighting with projectiles.
//! Uses `bevy_ecs` for the entity-component-system architecture; rendering and
//! input live outside this crate and talk to it through [`SimWorld`].

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod pathfinding;
pub mod systems;
pub mod terrain;
pub mod world;

pub use api::{formation_target, SimWorld};
pub use components::*;
pub use config::{SimConfig, WorldConfig};
pub use error::{SimError, SimResult};
pub use pathfinding::Pathfinder;
pub use systems::*;
pub use terrain::{TerrainGrid, TerrainResource, TerrainSnapshot, TileCoord, TileKind};
pub use world::{AgentSnapshot, ParticleSnapshot, ProjectileSnapshot, Snapshot};

/// Build a world from `config`; same as [`SimWorld::new`].
pub fn create_world(config: SimConfig) -> SimResult<SimWorld> {
    SimWorld::new(config)
}
