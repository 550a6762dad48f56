//! Tick loop, injection scheduling, and update ordering (spec §4.8,
//! component G).

use crate::ids::VehicleIndex;
use crate::road;
use crate::scenario::LoadedScenario;
use crate::vehicle::Vehicle;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    pub total_injected: u64,
    pub total_rejected: u64,
}

/// Runs every tick of `loaded.cycles`, mutating `loaded.world` in place.
pub fn run(loaded: &mut LoadedScenario) -> RunStats {
    let mut stats = RunStats::default();
    let dt = loaded.time_step;

    for i in 0..loaded.cycles {
        let t = i as f64 * dt;
        inject(loaded, i, t, &mut stats);
        move_all_roads(loaded, t, dt);
        let world = &mut loaded.world;
        world.history.save_state(&world.roads, &world.vehicles, t);
    }

    stats
}

/// Spawns one vehicle of each declared type on each starting road, every
/// `vehicleInjectionRate` ticks (spec §4.8 step 1).
fn inject(loaded: &mut LoadedScenario, tick: u64, t: f64, stats: &mut RunStats) {
    if tick % loaded.vehicle_injection_rate != 0 {
        return;
    }
    let world = &mut loaded.world;
    for template in &loaded.vehicle_templates {
        for &road_idx in &loaded.starting_roads {
            let id = world.next_vehicle_id();
            let vehicle = Vehicle::new(id, *template, t);
            let vehicle_idx = VehicleIndex(world.vehicles.insert(vehicle));
            match road::try_add_vehicle(world, road_idx, vehicle_idx, t, template.initial_position) {
                Some(_) => stats.total_injected += 1,
                None => stats.total_rejected += 1,
            }
        }
    }
}

/// Roads are traversed highest-id first so an outgoing road's vehicles have
/// already moved before its incoming roads attempt a handoff into it (spec
/// §5); this is the "minimum viable policy" the spec calls for absent an
/// explicit topological order.
fn move_all_roads(loaded: &mut LoadedScenario, t: f64, dt: f64) {
    let world = &mut loaded.world;
    let mut road_indices: Vec<_> = world.roads.indices().collect();
    road_indices.sort_by(|a, b| b.0.cmp(&a.0));
    for idx in road_indices {
        road::move_vehicles(world, crate::ids::RoadIndex(idx), t, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{build, ScenarioFile};

    #[test]
    fn single_free_flow_road_reaches_the_end() {
        let json = r#"{
            "simulation": { "name": "free-flow", "cycles": 60, "sectorLength": 100 },
            "vehicles": [
                { "length": 4.5, "initialSpeed": 0, "initialAcceleration": 0, "maxSpeed": 27.78, "maxAcceleration": 4.0 }
            ],
            "roads": [
                { "length": 1000, "vehicleDistance": 2, "speedLimit": 27.78, "isStartingRoad": true }
            ]
        }"#;
        let scenario: ScenarioFile = serde_json::from_str(json).unwrap();
        let mut loaded = build(&scenario, 1).unwrap();
        loaded.vehicle_injection_rate = loaded.cycles; // inject exactly once
        let stats = run(&mut loaded);
        assert_eq!(stats.total_injected, 1);
        let vehicle = loaded.world.vehicles.iter().next().unwrap().1;
        assert!(vehicle.has_arrived());
        assert!(vehicle.arrival_time > 0.0);
        assert_eq!(vehicle.number_of_stops, 0);
    }
}
