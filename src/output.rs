//! Output artifact writers (spec §6, component I): the three JSON reports
//! plus an optional text log, written under an output directory.

use crate::error::SimError;
use crate::ids::RoadIndex;
use crate::scenario::LoadedScenario;
use crate::vehicle::VehicleStatus;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

fn round5(x: f64) -> f64 {
    (x * 100_000.0).round() / 100_000.0
}

#[derive(Serialize)]
struct VehicleTickEntry {
    #[serde(rename = "VehicleID")]
    vehicle_id: u64,
    #[serde(rename = "Position")]
    position: f64,
    #[serde(rename = "CoordX")]
    coord_x: f64,
    #[serde(rename = "CoordY")]
    coord_y: f64,
    #[serde(rename = "Speed")]
    speed: f64,
    #[serde(rename = "Acceleration")]
    acceleration: f64,
    #[serde(rename = "State")]
    state: VehicleStatus,
    #[serde(rename = "Road")]
    road: Option<usize>,
}

/// `<name>_vehicles_metrics_<cycles>.json`: one array entry per tick, each
/// holding every vehicle's state that tick.
pub fn write_vehicles_metrics(path: &Path, loaded: &LoadedScenario) -> Result<(), SimError> {
    let dt = loaded.time_step.max(1e-9);
    let mut ticks: Vec<Vec<VehicleTickEntry>> = (0..loaded.cycles as usize).map(|_| Vec::new()).collect();

    for (_, vehicle) in loaded.world.vehicles.iter() {
        for snapshot in &vehicle.history {
            let tick = (snapshot.time / dt).round() as usize;
            if tick >= ticks.len() {
                continue;
            }
            ticks[tick].push(VehicleTickEntry {
                vehicle_id: vehicle.id,
                position: round5(snapshot.position),
                coord_x: round5(snapshot.x),
                coord_y: round5(snapshot.y),
                speed: round5(snapshot.speed),
                acceleration: round5(snapshot.acceleration),
                state: snapshot.status,
                road: snapshot.road.map(|r| r.0 .0),
            });
        }
    }

    write_json(path, &ticks)
}

#[derive(Serialize)]
struct TickOutput {
    #[serde(rename = "Time")]
    time: f64,
    #[serde(rename = "VehiclesPerSector")]
    vehicles_per_sector: Vec<u32>,
    #[serde(rename = "DensityPerSector")]
    density_per_sector: Vec<f64>,
    #[serde(rename = "DensityPerLanePerSector")]
    density_per_lane_per_sector: Vec<f64>,
    #[serde(rename = "LongestTrafficQueue")]
    longest_traffic_queue: u32,
}

#[derive(Serialize)]
struct RoadHistoryOutput {
    #[serde(rename = "RoadID")]
    road_id: usize,
    #[serde(rename = "Ticks")]
    ticks: Vec<TickOutput>,
}

/// `<name>_map_history_<cycles>.json`: per-road, per-tick sector densities.
pub fn write_map_history(path: &Path, loaded: &LoadedScenario) -> Result<(), SimError> {
    let mut roads = Vec::new();
    for (road_idx, road_history) in &loaded.world.history.roads {
        roads.push(RoadHistoryOutput {
            road_id: road_idx.0 .0,
            ticks: road_history
                .ticks
                .iter()
                .map(|tick| TickOutput {
                    time: round5(tick.time),
                    vehicles_per_sector: tick.vehicles_per_sector.clone(),
                    density_per_sector: tick.density_per_sector.iter().copied().map(round5).collect(),
                    density_per_lane_per_sector: tick.density_per_lane_per_sector.iter().copied().map(round5).collect(),
                    longest_traffic_queue: tick.longest_traffic_queue,
                })
                .collect(),
        });
    }
    write_json(path, &roads)
}

#[derive(Serialize)]
struct RoadMetricsOutput {
    #[serde(rename = "RoadID")]
    road_id: usize,
    #[serde(rename = "MeanDensity")]
    mean_density: f64,
    #[serde(rename = "MeanVehiclesPerSector")]
    mean_vehicles_per_sector: f64,
    #[serde(rename = "MeanLongestQueueLength")]
    mean_longest_queue_length: f64,
}

/// `<name>_road_metrics_<cycles>.json`: aggregate metrics per road.
pub fn write_road_metrics(path: &Path, loaded: &LoadedScenario) -> Result<(), SimError> {
    let mut out = Vec::new();
    for road_idx in loaded.world.history.roads.keys() {
        if let Some(metrics) = loaded.world.history.aggregate_metrics(*road_idx) {
            out.push(RoadMetricsOutput {
                road_id: road_idx.0 .0,
                mean_density: round5(metrics.mean_density),
                mean_vehicles_per_sector: round5(metrics.mean_vehicles_per_sector),
                mean_longest_queue_length: round5(metrics.mean_longest_queue_length),
            });
        }
    }
    write_json(path, &out)
}

/// Optional text log mirroring tick-by-tick vehicle decisions, enabled by
/// `--log` on the CLI.
pub fn write_text_log(path: &Path, loaded: &LoadedScenario) -> Result<(), SimError> {
    let mut file = std::fs::File::create(path)?;
    for (_, vehicle) in loaded.world.vehicles.iter() {
        for snapshot in &vehicle.history {
            let road = snapshot.road.map(road_label).unwrap_or_else(|| "-".to_string());
            writeln!(
                file,
                "t={:.3} vehicle={} pos={:.3} speed={:.3} accel={:.3} status={:?} road={}",
                snapshot.time, vehicle.id, snapshot.position, snapshot.speed, snapshot.acceleration, snapshot.status, road
            )?;
        }
    }
    Ok(())
}

fn road_label(road_idx: RoadIndex) -> String {
    road_idx.0 .0.to_string()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SimError> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

pub fn output_paths(output_dir: &Path, name: &str, cycles: u64) -> (std::path::PathBuf, std::path::PathBuf, std::path::PathBuf, std::path::PathBuf) {
    (
        output_dir.join(format!("{name}_map_history_{cycles}.json")),
        output_dir.join(format!("{name}_road_metrics_{cycles}.json")),
        output_dir.join(format!("{name}_vehicles_metrics_{cycles}.json")),
        output_dir.join(format!("{name}_log_{cycles}.txt")),
    )
}
