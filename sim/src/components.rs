//! ECS components for the skirmish simulation.
//!
//! Components are pure data containers attached to entities.
//! Per-tick logic lives in systems that query these components.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// Continuous world-space position.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        self.distance_sq_to(other).sqrt()
    }

    pub fn distance_sq_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// 2D velocity vector (world units per second).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    /// Velocity of magnitude `speed` pointing from `from` to `to`; zero when the
    /// points coincide.
    pub fn toward(from: &Position, to: &Position, speed: f32) -> Self {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len <= f32::EPSILON {
            Self::default()
        } else {
            Self::new(dx / len * speed, dy / len * speed)
        }
    }
}

/// Tile-centre world coordinate on a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
}

impl Waypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Waypoint> for Position {
    fn from(w: Waypoint) -> Self {
        Position::new(w.x, w.y)
    }
}

/// Queued waypoints, head first.
pub type Path = VecDeque<Waypoint>;

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Unique agent identifier, stable for the agent's lifetime. Ids are handed out
/// in increasing order, so id order is collection (insertion) order.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

/// Side an agent or projectile belongs to.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Player-controlled unit.
    Player,
    /// Autonomous enemy.
    Enemy,
}

impl Faction {
    /// The faction this one shoots at.
    pub fn opponent(self) -> Self {
        match self {
            Faction::Player => Faction::Enemy,
            Faction::Enemy => Faction::Player,
        }
    }
}

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Current and maximum health. `current <= max` always holds.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }
}

/// Time until the agent may fire again.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FireCooldown {
    pub remaining: f32,
}

impl FireCooldown {
    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn reset(&mut self, cooldown: f32) {
        self.remaining = cooldown;
    }
}

/// In-flight shot. The owner decides which collection it can hit.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub owner: Faction,
    pub damage: f32,
    /// Remaining time-to-live in seconds.
    pub ttl: f32,
    /// Firing order; projectiles resolve in this order every tick.
    pub serial: u64,
}

// ============================================================================
// MOVEMENT / LIFECYCLE COMPONENTS
// ============================================================================

/// Movement order: the immediate target and the queued path behind it.
///
/// While pathing, the head of `path` is the current target; it is popped when
/// reached. An empty path means no path is queued.
#[derive(Component, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// World units per second.
    pub speed: f32,
    pub target: Option<Waypoint>,
    pub path: Path,
}

impl Movement {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            target: None,
            path: Path::new(),
        }
    }

    /// Replace the current order with `waypoints`, targeting the first one.
    pub fn follow(&mut self, waypoints: Vec<Waypoint>) {
        self.path = waypoints.into();
        self.target = self.path.front().copied();
    }

    /// Head straight for `target` with no queued path.
    pub fn go_direct(&mut self, target: Waypoint) {
        self.path.clear();
        self.target = Some(target);
    }

    pub fn stop(&mut self) {
        self.target = None;
        self.path.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.target.is_none() && self.path.is_empty()
    }
}

/// Death sequencing. Once `dying` is set the agent neither moves nor fires, and it
/// is removed after `death_elapsed` reaches the configured duration.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub dying: bool,
    pub death_elapsed: f32,
}

impl Lifecycle {
    pub fn begin_dying(&mut self) {
        if !self.dying {
            self.dying = true;
            self.death_elapsed = 0.0;
        }
    }

    pub fn is_dying(&self) -> bool {
        self.dying
    }

    pub fn advance(&mut self, dt: f32) {
        if self.dying {
            self.death_elapsed += dt;
        }
    }

    /// Expiry needs at least one tick of dying, even with a zero duration.
    pub fn is_expired(&self, death_duration: f32) -> bool {
        self.dying && self.death_elapsed > 0.0 && self.death_elapsed >= death_duration
    }
}

/// Elapsed time driving walk/death animations in the renderer.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimClock(pub f32);

/// Movement state derived from `Movement` and `Lifecycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    Idle,
    Pathing,
    Dying,
}

impl AgentState {
    pub fn of(movement: &Movement, lifecycle: &Lifecycle) -> Self {
        if lifecycle.is_dying() {
            AgentState::Dying
        } else if movement.is_idle() {
            AgentState::Idle
        } else {
            AgentState::Pathing
        }
    }
}

// ============================================================================
// AI COMPONENTS
// ============================================================================

/// Marker plus re-path timer for autonomous enemies.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AiControlled {
    /// Seconds until the next re-path.
    pub repath_in: f32,
}

// ============================================================================
// COSMETIC COMPONENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Emitted at every impact.
    Spark,
    /// Emitted when a hit is lethal.
    Debris,
}

/// Short-lived visual effect; never affects the simulation.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub kind: ParticleKind,
    pub ttl: f32,
    pub lifetime: f32,
}

impl Particle {
    pub fn life_fraction(&self) -> f32 {
        if self.lifetime <= 0.0 {
            0.0
        } else {
            (self.ttl / self.lifetime).clamp(0.0, 1.0)
        }
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a unit or enemy.
#[derive(Bundle)]
pub struct AgentBundle {
    pub id: AgentId,
    pub faction: Faction,
    pub position: Position,
    pub health: Health,
    pub movement: Movement,
    pub cooldown: FireCooldown,
    pub clock: AnimClock,
    pub lifecycle: Lifecycle,
}

impl AgentBundle {
    pub fn new(id: AgentId, faction: Faction, x: f32, y: f32, speed: f32, health: f32) -> Self {
        Self {
            id,
            faction,
            position: Position::new(x, y),
            health: Health::new(health),
            movement: Movement::new(speed),
            cooldown: FireCooldown::default(),
            clock: AnimClock::default(),
            lifecycle: Lifecycle::default(),
        }
    }
}

/// Bundle for spawning a projectile.
#[derive(Bundle)]
pub struct ProjectileBundle {
    pub projectile: Projectile,
    pub position: Position,
    pub velocity: Velocity,
}

/// Bundle for spawning a particle.
#[derive(Bundle)]
pub struct ParticleBundle {
    pub particle: Particle,
    pub position: Position,
    pub velocity: Velocity,
}

impl ParticleBundle {
    /// `count` particles fanned evenly around `origin`.
    pub fn burst(
        kind: ParticleKind,
        origin: Position,
        count: u32,
        speed: f32,
        lifetime: f32,
    ) -> impl Iterator<Item = Self> {
        (0..count).map(move |i| {
            let angle = i as f32 / count as f32 * std::f32::consts::TAU;
            Self {
                particle: Particle {
                    kind,
                    ttl: lifetime,
                    lifetime,
                },
                position: origin,
                velocity: Velocity::new(angle.cos() * speed, angle.sin() * speed),
            }
        })
    }
}
