//! Basic demonstration of the Skirmish battle simulation.
//!
//! Run with: cargo run --example basic_demo
//! Set RUST_LOG=skirmish_sim=debug for per-call logging.

use skirmish_sim::{BattleSim, EventLog, Faction, Snapshot};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Skirmish - Battle Simulation Demo ===\n");

    let mut sim = BattleSim::demo_battle()?;

    println!("Initial state:");
    print_snapshot(&sim.snapshot());

    // 60 frames per second of wall-clock time, two minutes of battle
    let frame = 1.0 / 60.0;
    let mut log = EventLog::default();
    for frame_index in 0..(60 * 120) {
        sim.advance_time_with(frame, &mut log);

        if (frame_index + 1) % (60 * 10) == 0 {
            println!(
                "--- Tick {} (t={:.1}) volleys={} casualties={} ---",
                sim.current_tick(),
                sim.current_time(),
                log.shootings.len(),
                log.casualties.len()
            );
            print_snapshot(&sim.snapshot());
        }
        if sim.winner().is_some() && sim.shootings().is_empty() {
            break;
        }
    }

    match sim.winner() {
        Some(side) => println!("\nWinner: {side:?}"),
        None => println!("\nNo winner yet"),
    }

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", sim.snapshot().to_json_pretty()?);
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    for faction in [Faction::Blue, Faction::Red] {
        println!(
            "  {faction:?} units ({} fighters):",
            snapshot.fighter_count(faction)
        );
        for unit in snapshot.units.iter().filter(|u| u.faction == faction) {
            println!(
                "    Unit {}: pos=({:.1}, {:.1}) fighters={} morale={:.2} influence={:.2} {:?}{}",
                unit.id,
                unit.x,
                unit.y,
                unit.fighters.len(),
                unit.morale,
                unit.influence,
                unit.mode,
                if unit.routing { " ROUTING" } else { "" }
            );
        }
    }
}
