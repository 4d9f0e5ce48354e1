//! Basic demonstration of the skirmish simulation.
//!
//! Run with: cargo run --example basic_demo [terrain_seed] [rng_seed]
//! Set `RUST_LOG=rts_sim=debug` to see deaths and fallback move orders.

use rts_sim::{create_world, AgentId, SimConfig, SimWorld};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Grid Skirmish - Simulation Demo ===\n");

    let mut args = std::env::args().skip(1);
    let mut config = SimConfig::default();
    if let Some(seed) = args.next().and_then(|arg| arg.parse().ok()) {
        config = config.with_terrain_seed(seed);
    }
    if let Some(seed) = args.next().and_then(|arg| arg.parse().ok()) {
        config = config.with_rng_seed(seed);
    }

    let mut sim = match create_world(config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("failed to build world: {err}");
            return;
        }
    };

    println!("Initial state:");
    print_summary(&mut sim);

    // Send the whole squad toward the north-west corner of the map.
    let ids: Vec<AgentId> = sim.units().iter().map(|u| AgentId(u.id)).collect();
    let (w, h) = sim.terrain().world_size();
    println!("\n--- Ordering {} units to ({:.0}, {:.0}) ---\n", ids.len(), w * 0.3, h * 0.3);
    sim.issue_move(ids, w * 0.3, h * 0.3);

    // 20 seconds at 30 ticks/sec
    for tick in 0..600 {
        sim.update(1.0 / 30.0);

        if (tick + 1) % 60 == 0 {
            println!("--- Tick {} (t={:.1}s) ---", sim.current_tick(), sim.current_time());
            print_summary(&mut sim);
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    match sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to serialize snapshot: {err}"),
    }
}

fn print_summary(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();

    println!("  Units:");
    for unit in &snapshot.units {
        println!(
            "    Unit {}: pos=({:.1}, {:.1}) hp={:.0}/{:.0} [{:?}] waypoints={}",
            unit.id, unit.x, unit.y, unit.health, unit.health_max, unit.state, unit.waypoints_left
        );
    }

    let alive = snapshot.enemies.iter().filter(|e| e.health > 0.0).count();
    println!(
        "  Enemies: {} alive, {} dying",
        alive,
        snapshot.enemies.len() - alive
    );
    println!(
        "  Projectiles: {}  Particles: {}",
        snapshot.projectiles.len(),
        snapshot.particles.len()
    );
}
