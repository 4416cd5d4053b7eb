use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gskin_ecs::{Entity, Schedule, System, SystemResult, Tick, World};

#[derive(Clone, Copy)]
struct Vec2(f32, f32);

fn world(size: usize) -> World {
    let mut world = World::new();
    for i in 0..size {
        let mut entity = Entity::new().with("pos", Vec2(i as f32, 0.0));
        // half the entities move
        if i % 2 == 0 {
            entity.insert("velocity", Vec2(1.0, 0.5));
        }
        world.spawn(entity);
    }
    world
}

fn schedule() -> Schedule {
    let mut schedule: Schedule = Schedule::new();
    schedule
        .register_system(System::new(
            "movement",
            ["pos", "velocity"],
            |pos: &mut Vec2, vel: &mut Vec2, tick: &Tick| -> SystemResult {
                pos.0 += vel.0 * tick.delta;
                pos.1 += vel.1 * tick.delta;
                Ok(())
            },
        ))
        .expect("movement registers");
    schedule
        .register_system(
            System::new("clamp", ["pos"], |pos: &mut Vec2, _: &Tick| -> SystemResult {
                pos.1 = pos.1.min(100.0);
                Ok(())
            })
            .with_filter(|entity: &Entity| entity.has("velocity")),
        )
        .expect("clamp registers");
    schedule
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for size in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut world = world(size);
            let mut schedule = schedule();
            b.iter(|| schedule.tick(black_box(&mut world)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
