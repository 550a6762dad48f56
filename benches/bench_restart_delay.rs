use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use trafficsim::vehicle::{Vehicle, VehicleParams, VehicleStatus};

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

fn bench_restart_chain(c: &mut Criterion) {
    c.bench_function("restart_chain_50", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(3);
            let mut prec_delay = 1.0_f64;
            for i in 0..50 {
                let mut v = Vehicle::new(i, params(), 0.0);
                v.status = VehicleStatus::GivingWay;
                v.is_departed = true;
                v.restart(&mut rng, 20.0, 1.0, Some(prec_delay));
                prec_delay = v.cumulative_delay;
                black_box(&v);
            }
        });
    });
}

criterion_group!(benches, bench_restart_chain);
criterion_main!(benches);
