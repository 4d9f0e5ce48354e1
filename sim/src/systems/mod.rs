//! ECS systems for the skirmish simulation.
//!
//! Systems contain the game logic that operates on components. They run as one
//! chained schedule per tick, in this order:
//!
//! 1. `unit_movement_system` - units walk their paths; dying agents only age
//! 2. `player_fire_system` - units fire at enemies in range
//! 3. `enemy_fire_system` - enemies fire at units in range
//! 4. `enemy_repath_system`, then `enemy_movement_system`
//! 5. `projectile_system` - projectiles fly, expire and hit
//! 6. `particle_decay_system`
//! 7. `death_sweep_system` - agents whose death duration elapsed are removed
//!
//! Anything that affects the outcome is processed in `AgentId` order (agents) or
//! shot serial order (projectiles), never in storage order.

pub mod ai;
pub mod combat;
pub mod lifecycle;
pub mod movement;
pub mod projectile;
pub mod serialization;

pub use ai::*;
pub use combat::*;
pub use lifecycle::*;
pub use movement::*;
pub use projectile::*;
pub use serialization::*;
