//! Scenario JSON schema (spec §6) and the loader that turns a parsed
//! document into a [`World`] plus the run configuration the simulator
//! needs (component H, ambient to the distilled spec).

use crate::error::SimError;
use crate::ids::{JunctionIndex, RoadIndex};
use crate::junction::Junction;
use crate::road::Road;
use crate::traffic_light::{TrafficLight, END_OF_ROAD};
use crate::vehicle::VehicleParams;
use crate::world::World;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    pub simulation: SimulationConfig,
    pub vehicles: Vec<VehicleTypeDef>,
    pub roads: Vec<RoadDef>,
    #[serde(default)]
    pub semaphores: Vec<SemaphoreDef>,
    #[serde(default)]
    pub intersections: Vec<IntersectionDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub name: String,
    pub cycles: u64,
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    #[serde(default = "default_injection_rate")]
    pub vehicle_injection_rate: u64,
    pub sector_length: f64,
    /// Overrides the run's RNG seed when present (§4.11); otherwise the
    /// caller-supplied seed (e.g. `main`'s default) is used.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_queue_density_threshold")]
    pub longest_queue_density_threshold: f64,
}

fn default_time_step() -> f64 {
    1.0
}
fn default_injection_rate() -> u64 {
    1
}
fn default_zero() -> f64 {
    0.0
}
fn default_queue_density_threshold() -> f64 {
    0.8
}
fn default_lanes() -> usize {
    1
}
fn default_reaction_time() -> f64 {
    1.0
}
fn default_damping_factor() -> f64 {
    0.18
}
fn default_false() -> bool {
    false
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleTypeDef {
    pub length: f64,
    #[serde(default = "default_zero")]
    pub initial_position: f64,
    pub initial_speed: f64,
    pub initial_acceleration: f64,
    pub max_speed: f64,
    pub max_acceleration: f64,
    #[serde(default = "default_zero")]
    pub creation_time: f64,
    #[serde(default = "default_zero")]
    pub sigma: f64,
    #[serde(default = "default_reaction_time")]
    pub reaction_time: f64,
    #[serde(default = "default_reaction_time")]
    pub reaction_time_at_semaphore: f64,
    #[serde(default = "default_damping_factor")]
    pub damping_factor: f64,
}

impl From<&VehicleTypeDef> for VehicleParams {
    fn from(def: &VehicleTypeDef) -> Self {
        VehicleParams {
            length: def.length,
            max_speed: def.max_speed,
            max_acceleration: def.max_acceleration,
            reaction_time: def.reaction_time,
            reaction_time_at_semaphore: def.reaction_time_at_semaphore,
            damping_factor: def.damping_factor,
            sigma: def.sigma,
            initial_position: def.initial_position,
            initial_speed: def.initial_speed,
            initial_acceleration: def.initial_acceleration,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadDef {
    pub length: f64,
    pub vehicle_distance: f64,
    pub speed_limit: f64,
    #[serde(default = "default_false")]
    pub is_starting_road: bool,
    /// Lower number = higher priority at a Merge junction (source's
    /// `Road.priority` constructor parameter, dropped from the distilled
    /// schema but restored here since merge arbitration is meaningless
    /// without it).
    #[serde(default)]
    pub priority: i32,
    /// Number of lane slots; only 1 is exercised by the default scenarios
    /// in spec.md §8, but `moveAndOvertakeIfPossible`'s lane-promotion step
    /// (§4.2) is general and activates once this is raised above 1.
    #[serde(default = "default_lanes")]
    pub lanes: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemaphoreDef {
    pub position: f64,
    pub green_light: f64,
    pub red_light: f64,
    #[serde(default = "default_zero")]
    pub yellow_light: f64,
    pub start_time: f64,
    pub road: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionDef {
    pub in_roads: Vec<usize>,
    pub out_roads: Vec<usize>,
    #[serde(default)]
    pub out_fluxes: Vec<f64>,
}

pub struct LoadedScenario {
    pub world: World,
    pub name: String,
    pub cycles: u64,
    pub time_step: f64,
    pub vehicle_injection_rate: u64,
    pub vehicle_templates: Vec<VehicleParams>,
    pub starting_roads: Vec<RoadIndex>,
}

pub fn load(path: &Path, seed: u64) -> Result<LoadedScenario, SimError> {
    let text = std::fs::read_to_string(path)?;
    let scenario: ScenarioFile = serde_json::from_str(&text)?;
    build(&scenario, seed)
}

pub fn build(scenario: &ScenarioFile, seed: u64) -> Result<LoadedScenario, SimError> {
    if scenario.roads.is_empty() {
        return Err(SimError::Config("scenario declares no roads".to_string()));
    }

    let effective_seed = scenario.simulation.seed.unwrap_or(seed);
    let mut world = World::new(effective_seed);
    let mut road_indices = Vec::with_capacity(scenario.roads.len());
    let mut starting_roads = Vec::new();

    for r in scenario.roads.iter() {
        let mut road = Road::new(r.length, r.vehicle_distance, r.speed_limit, r.priority, r.lanes);
        road.is_starting_road = r.is_starting_road;
        let idx = RoadIndex(world.roads.insert(road));
        road_indices.push(idx);
        if r.is_starting_road {
            starting_roads.push(idx);
        }
    }

    for s in &scenario.semaphores {
        let road_idx = *road_indices
            .get(s.road)
            .ok_or_else(|| SimError::Config(format!("semaphore references nonexistent road {}", s.road)))?;
        let light = TrafficLight::new(s.position, s.green_light, s.red_light, s.yellow_light, s.start_time);
        let road = world.roads.get_mut(road_idx.0);
        if s.position == END_OF_ROAD {
            road.add_semaphore_at_end(light);
        } else {
            road.add_semaphore_at_position(light);
        }
    }

    for def in &scenario.intersections {
        let incoming = resolve_roads(&road_indices, &def.in_roads)?;
        let outgoing = resolve_roads(&road_indices, &def.out_roads)?;

        if incoming.is_empty() {
            return Err(SimError::Topology("intersection has no incoming roads".to_string()));
        }

        let weights = if outgoing.is_empty() {
            Vec::new()
        } else if def.out_fluxes.is_empty() && outgoing.len() == 1 {
            vec![1.0]
        } else {
            if def.out_fluxes.len() != outgoing.len() {
                return Err(SimError::Topology("outFluxes length does not match outRoads length".to_string()));
            }
            let sum: f64 = def.out_fluxes.iter().sum();
            if (sum - 1.0).abs() > 1e-6 {
                return Err(SimError::Topology(format!("outFluxes must sum to 1 (±1e-6), got {sum}")));
            }
            def.out_fluxes.clone()
        };

        let junction = if incoming.len() == 1 {
            Junction::NFurcation { incoming: incoming[0], outgoing: outgoing.clone(), weights }
        } else if outgoing.len() == 1 {
            Junction::Merge { incoming: incoming.clone(), outgoing: outgoing[0] }
        } else {
            Junction::Intersection { incoming: incoming.clone(), outgoing: outgoing.clone(), weights }
        };

        let junction_idx = JunctionIndex(world.junctions.insert(junction));
        for &r in &incoming {
            world.roads.get_mut(r.0).end_junction = Some(junction_idx);
        }
        for &r in &outgoing {
            world.roads.get_mut(r.0).start_junction = Some(junction_idx);
        }
    }

    world
        .history
        .configure(scenario.simulation.sector_length, scenario.simulation.longest_queue_density_threshold);
    for &idx in &road_indices {
        let length = world.roads.get(idx.0).length;
        world.history.register_road(idx, length);
    }

    let vehicle_templates = scenario.vehicles.iter().map(VehicleParams::from).collect();

    Ok(LoadedScenario {
        world,
        name: scenario.simulation.name.clone(),
        cycles: scenario.simulation.cycles,
        time_step: scenario.simulation.time_step,
        vehicle_injection_rate: scenario.simulation.vehicle_injection_rate.max(1),
        vehicle_templates,
        starting_roads,
    })
}

fn resolve_roads(road_indices: &[RoadIndex], ids: &[usize]) -> Result<Vec<RoadIndex>, SimError> {
    ids.iter()
        .map(|&id| {
            road_indices
                .get(id)
                .copied()
                .ok_or_else(|| SimError::Config(format!("reference to nonexistent road {id}")))
        })
        .collect()
}
