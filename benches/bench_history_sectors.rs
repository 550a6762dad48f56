use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trafficsim::history::History;
use trafficsim::ids::{RoadIndex, VehicleIndex};
use trafficsim::road::Road;
use trafficsim::vehicle::{Vehicle, VehicleParams};
use trafficsim::world::World;

fn params() -> VehicleParams {
    VehicleParams {
        length: 4.5,
        max_speed: 20.0,
        max_acceleration: 3.5,
        reaction_time: 1.0,
        reaction_time_at_semaphore: 1.0,
        damping_factor: 0.18,
        sigma: 0.0,
        initial_position: 0.0,
        initial_speed: 0.0,
        initial_acceleration: 0.0,
    }
}

fn bench_save_state(c: &mut Criterion) {
    let mut world = World::new(1);
    let road_idx = RoadIndex(world.roads.insert(Road::new(5000.0, 2.0, 20.0, 0, 1)));
    for i in 0..500 {
        let id = world.next_vehicle_id();
        let vehicle = Vehicle::new(id, params(), 0.0);
        let vehicle_idx = VehicleIndex(world.vehicles.insert(vehicle));
        world.vehicles.get_mut(vehicle_idx.0).position = i as f64 * 9.0;
        world.roads.get_mut(road_idx.0).lanes[0].vehicles.push(vehicle_idx);
    }
    let mut history = History::new();
    history.configure(100.0, 0.8);
    history.register_road(road_idx, 5000.0);

    c.bench_function("history_save_state_500_vehicles", |b| {
        b.iter(|| {
            history.save_state(&world.roads, &world.vehicles, black_box(0.0));
        });
    });
}

criterion_group!(benches, bench_save_state);
criterion_main!(benches);
