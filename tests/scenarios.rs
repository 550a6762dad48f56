//! End-to-end scenario tests (spec §8).

use trafficsim::ids::{RoadIndex, VehicleIndex};
use trafficsim::road::{self, Road};
use trafficsim::scenario::{build, ScenarioFile};
use trafficsim::simulator;
use trafficsim::traffic_light::TrafficLight;
use trafficsim::vehicle::{Vehicle, VehicleParams, VehicleStatus};
use trafficsim::world::World;

fn last_known_road(vehicle: &trafficsim::vehicle::Vehicle) -> Option<RoadIndex> {
    vehicle.history.iter().rev().find_map(|s| s.road)
}

fn first_known_road(vehicle: &trafficsim::vehicle::Vehicle) -> Option<RoadIndex> {
    vehicle.history.iter().find_map(|s| s.road)
}

/// Scenario 1: a 1000 m road with no lights; one car should reach the end
/// at roughly `t_accel + t_cruise` and never stop.
#[test]
fn scenario_single_road_free_flow_arrival() {
    let json = r#"{
        "simulation": { "name": "s1", "cycles": 50, "sectorLength": 100 },
        "vehicles": [
            { "length": 4.5, "initialSpeed": 0, "initialAcceleration": 0, "maxSpeed": 27.78, "maxAcceleration": 4.0 }
        ],
        "roads": [
            { "length": 1000, "vehicleDistance": 2, "speedLimit": 27.78, "isStartingRoad": true }
        ]
    }"#;
    let scenario: ScenarioFile = serde_json::from_str(json).unwrap();
    let mut loaded = build(&scenario, 1).unwrap();
    loaded.vehicle_injection_rate = loaded.cycles;
    simulator::run(&mut loaded);

    let (_, vehicle) = loaded.world.vehicles.iter().next().unwrap();
    assert!(vehicle.has_arrived());
    let t_accel = 27.78_f64 / 4.0;
    let expected = t_accel + (1000.0 - 0.5 * 4.0 * t_accel * t_accel) / 27.78;
    assert!((vehicle.arrival_time - expected).abs() < 3.0, "arrival_time={}", vehicle.arrival_time);
    assert_eq!(vehicle.number_of_stops, 0);
}

/// Scenario 2: a road with a red-phase semaphore at 800 m; the car must
/// wait for the light before crossing.
#[test]
fn scenario_single_red_semaphore_waits_then_releases() {
    let json = r#"{
        "simulation": { "name": "s2", "cycles": 90, "sectorLength": 100 },
        "vehicles": [
            { "length": 4.5, "initialSpeed": 0, "initialAcceleration": 0, "maxSpeed": 27.78, "maxAcceleration": 4.0 }
        ],
        "roads": [
            { "length": 1000, "vehicleDistance": 2, "speedLimit": 27.78, "isStartingRoad": true }
        ],
        "semaphores": [
            { "position": 800, "greenLight": 40, "redLight": 20, "yellowLight": 0, "startTime": 0, "road": 0 }
        ]
    }"#;
    let scenario: ScenarioFile = serde_json::from_str(json).unwrap();
    let mut loaded = build(&scenario, 1).unwrap();
    loaded.vehicle_injection_rate = loaded.cycles;
    simulator::run(&mut loaded);

    let (_, vehicle) = loaded.world.vehicles.iter().next().unwrap();
    let was_waiting = vehicle
        .history
        .iter()
        .any(|s| s.status == VehicleStatus::WaitingSemaphore);
    assert!(was_waiting, "vehicle should have waited at the red light");
    assert!(vehicle.time_waited >= 10.0, "time_waited={}", vehicle.time_waited);
}

/// Scenario 3: a 1-to-2 bifurcation with flux weights [0.8, 0.2]; with
/// enough samples the observed split should land close to the weights.
#[test]
fn scenario_bifurcation_matches_flux_weights() {
    let json = r#"{
        "simulation": { "name": "s3", "cycles": 1500, "vehicleInjectionRate": 1, "sectorLength": 50 },
        "vehicles": [
            { "length": 4.0, "initialSpeed": 10, "initialAcceleration": 0, "maxSpeed": 15, "maxAcceleration": 3.0, "sigma": 0 }
        ],
        "roads": [
            { "length": 20, "vehicleDistance": 2, "speedLimit": 15, "isStartingRoad": true },
            { "length": 5000, "vehicleDistance": 2, "speedLimit": 15 },
            { "length": 5000, "vehicleDistance": 2, "speedLimit": 15 }
        ],
        "intersections": [
            { "inRoads": [0], "outRoads": [1, 2], "outFluxes": [0.8, 0.2] }
        ]
    }"#;
    let scenario: ScenarioFile = serde_json::from_str(json).unwrap();
    let mut loaded = build(&scenario, 99).unwrap();
    simulator::run(&mut loaded);

    let road1 = RoadIndex(trafficsim::arena::Index(1));
    let road2 = RoadIndex(trafficsim::arena::Index(2));
    let mut on_road1 = 0u32;
    let mut on_road2 = 0u32;
    let mut total = 0u32;
    for (_, vehicle) in loaded.world.vehicles.iter() {
        match last_known_road(vehicle) {
            Some(r) if r == road1 => {
                on_road1 += 1;
                total += 1;
            }
            Some(r) if r == road2 => {
                on_road2 += 1;
                total += 1;
            }
            _ => {}
        }
    }
    assert!(total > 200, "not enough routed vehicles to judge the split: {total}");
    let frac1 = on_road1 as f64 / total as f64;
    let frac2 = on_road2 as f64 / total as f64;
    assert!((frac1 - 0.8).abs() < 0.07, "road-1 fraction {frac1} too far from 0.8");
    assert!((frac2 - 0.2).abs() < 0.07, "road-2 fraction {frac2} too far from 0.2");
}

/// Scenario 4: a 2-to-1 merge; the non-priority incoming road should show
/// strictly more waiting than the priority one under continuous injection.
#[test]
fn scenario_merge_gives_priority_road_less_waiting() {
    let json = r#"{
        "simulation": { "name": "s4", "cycles": 400, "vehicleInjectionRate": 3, "sectorLength": 50 },
        "vehicles": [
            { "length": 4.0, "initialSpeed": 5, "initialAcceleration": 0, "maxSpeed": 12, "maxAcceleration": 2.5, "sigma": 0 }
        ],
        "roads": [
            { "length": 150, "vehicleDistance": 2, "speedLimit": 12, "isStartingRoad": true, "priority": 0 },
            { "length": 150, "vehicleDistance": 2, "speedLimit": 12, "isStartingRoad": true, "priority": 1 },
            { "length": 3000, "vehicleDistance": 2, "speedLimit": 12 }
        ],
        "intersections": [
            { "inRoads": [0, 1], "outRoads": [2], "outFluxes": [1.0] }
        ]
    }"#;
    let scenario: ScenarioFile = serde_json::from_str(json).unwrap();
    let mut loaded = build(&scenario, 5).unwrap();
    simulator::run(&mut loaded);

    let road_a = RoadIndex(trafficsim::arena::Index(0));
    let road_b = RoadIndex(trafficsim::arena::Index(1));
    let mut wait_a = Vec::new();
    let mut wait_b = Vec::new();
    for (_, vehicle) in loaded.world.vehicles.iter() {
        match first_known_road(vehicle) {
            Some(r) if r == road_a => wait_a.push(vehicle.time_waited),
            Some(r) if r == road_b => wait_b.push(vehicle.time_waited),
            _ => {}
        }
    }
    assert!(!wait_a.is_empty() && !wait_b.is_empty());
    let mean_a = wait_a.iter().sum::<f64>() / wait_a.len() as f64;
    let mean_b = wait_b.iter().sum::<f64>() / wait_b.len() as f64;
    assert!(mean_b > mean_a, "non-priority mean wait {mean_b} should exceed priority mean wait {mean_a}");
}

/// Scenario 5: ten cars queued behind a red light depart with
/// nonincreasing inter-departure delay once it turns green.
#[test]
fn scenario_queue_startup_inter_departure_nonincreasing() {
    let mut world = World::new(11);
    let mut road = Road::new(2000.0, 2.0, 20.0, 0, 1);
    road.add_semaphore_at_position(TrafficLight::new(0.0, 1.0, 50.0, 0.0, 0.0));
    let road_idx = RoadIndex(world.roads.insert(road));

    let params = VehicleParams {
        length: 4.5,
        max_speed: 20.0,
        max_acceleration: 3.0,
        reaction_time: 1.0,
        reaction_time_at_semaphore: 1.0,
        damping_factor: 0.18,
        sigma: 0.0,
        initial_position: 0.0,
        initial_speed: 0.0,
        initial_acceleration: 0.0,
    };

    let mut vehicle_ids = Vec::new();
    for k in 0..10 {
        let id = world.next_vehicle_id();
        let vehicle = Vehicle::new(id, params, 0.0);
        let vehicle_idx = VehicleIndex(world.vehicles.insert(vehicle));
        let pos = 100.0 - k as f64 * 8.0;
        road::try_add_vehicle(&mut world, road_idx, vehicle_idx, 0.0, pos);
        vehicle_ids.push(vehicle_idx);
    }

    let mut departure_tick: Vec<Option<u32>> = vec![None; vehicle_ids.len()];
    for tick in 1..200u32 {
        let t = tick as f64;
        road::move_vehicles(&mut world, road_idx, t, 1.0);
        for (i, &vid) in vehicle_ids.iter().enumerate() {
            if departure_tick[i].is_none() && world.vehicles.get(vid.0).speed > 0.1 {
                departure_tick[i] = Some(tick);
            }
        }
    }

    let ticks: Vec<u32> = departure_tick.into_iter().flatten().collect();
    assert!(ticks.len() >= 8, "expected most queued vehicles to eventually depart, got {}", ticks.len());
    let deltas: Vec<i64> = ticks.windows(2).map(|w| w[1] as i64 - w[0] as i64).collect();
    for pair in deltas.windows(2) {
        assert!(pair[1] <= pair[0] + 1, "inter-departure delay grew: {:?}", pair);
    }
}

/// Scenario 6: a dead-end road with no junction at its far end removes the
/// vehicle on arrival and never exceeds the injected count.
#[test]
fn scenario_dead_end_road_removes_vehicle_on_arrival() {
    let json = r#"{
        "simulation": { "name": "s6", "cycles": 80, "sectorLength": 50 },
        "vehicles": [
            { "length": 4.0, "initialSpeed": 0, "initialAcceleration": 0, "maxSpeed": 15, "maxAcceleration": 3.0 }
        ],
        "roads": [
            { "length": 400, "vehicleDistance": 2, "speedLimit": 15, "isStartingRoad": true }
        ]
    }"#;
    let scenario: ScenarioFile = serde_json::from_str(json).unwrap();
    let mut loaded = build(&scenario, 2).unwrap();
    loaded.vehicle_injection_rate = loaded.cycles;
    let stats = simulator::run(&mut loaded);

    let mut total_removed = 0u32;
    for (_, vehicle) in loaded.world.vehicles.iter() {
        if vehicle.has_arrived() {
            total_removed += 1;
            assert!(vehicle.arrival_time > 0.0);
        }
    }
    assert!(total_removed as u64 <= stats.total_injected);
    assert!(total_removed >= 1);
}
