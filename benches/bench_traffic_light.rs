use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trafficsim::traffic_light::TrafficLight;

fn bench_state_queries(c: &mut Criterion) {
    let light = TrafficLight::new(800.0, 40.0, 20.0, 5.0, 0.0);
    c.bench_function("traffic_light_state_sweep", |b| {
        b.iter(|| {
            let mut red_count = 0u32;
            let mut t = 0.0;
            while t < 10_000.0 {
                if light.is_red(black_box(t)) {
                    red_count += 1;
                }
                t += 1.0;
            }
            black_box(red_count);
        });
    });
}

criterion_group!(benches, bench_state_queries);
criterion_main!(benches);
