use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use glam::Vec2;
use skirmish_sim::{BattleSim, Faction, UnitSpawn, UnitStats};

/// Two lines of `units_per_side` units facing each other across the middle
/// of the map.
fn lines(units_per_side: u32, fighters: usize) -> BattleSim {
    let mut sim = BattleSim::new();
    for i in 0..units_per_side {
        let y = 300.0 + i as f32 * 420.0 / units_per_side as f32;
        let stats = if i % 3 == 1 {
            UnitStats::archers()
        } else {
            UnitStats::spearmen()
        };
        sim.spawn_unit(
            UnitSpawn::new(i, Faction::Blue, Vec2::new(440.0, y), fighters).with_stats(stats),
        )
        .expect("blue unit");
        sim.spawn_unit(
            UnitSpawn::new(1000 + i, Faction::Red, Vec2::new(584.0, y), fighters)
                .with_stats(stats)
                .facing(std::f32::consts::PI),
        )
        .expect("red unit");
    }
    sim
}

fn bench_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("battle_tick");
    group.sample_size(20);

    for &(units, fighters) in &[(4u32, 40usize), (16, 60), (32, 80)] {
        group.bench_function(format!("{}x{}_fighters_60_ticks", units * 2, fighters), |b| {
            b.iter_batched(
                || {
                    let mut sim = lines(units, fighters);
                    // settle formations before measuring
                    sim.advance_time(1.0);
                    sim
                },
                |mut sim| {
                    let dt = sim.config().fixed_timestep;
                    for _ in 0..60 {
                        sim.advance_time(dt);
                    }
                    sim
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
