//! Per-tick density sampling and longest-queue detection (spec §4.7,
//! component F).

use crate::arena::Arena;
use crate::ids::RoadIndex;
use crate::road::Road;
use crate::vehicle::Vehicle;
use std::collections::BTreeMap;

/// Sector boundaries for one road: fixed-length segments, with a trailing
/// remainder shorter than 1.5x the nominal sector length absorbed into the
/// last full sector instead of kept as its own short tail.
#[derive(Debug, Clone)]
pub struct RoadSectors {
    pub bounds: Vec<(f64, f64)>,
}

impl RoadSectors {
    pub fn new(road_length: f64, sector_length: f64) -> Self {
        let sector_length = sector_length.max(1e-6);
        let mut bounds = Vec::new();
        let mut start = 0.0;
        while start + sector_length < road_length {
            bounds.push((start, start + sector_length));
            start += sector_length;
        }
        let tail = road_length - start;
        if bounds.is_empty() {
            bounds.push((0.0, road_length.max(sector_length)));
        } else if tail < 1.5 * sector_length {
            bounds.last_mut().unwrap().1 = road_length;
        } else {
            bounds.push((start, road_length));
        }
        Self { bounds }
    }
}

#[derive(Debug, Clone)]
pub struct TickSnapshot {
    pub time: f64,
    pub vehicles_per_sector: Vec<u32>,
    pub density_per_sector: Vec<f64>,
    pub density_per_lane_per_sector: Vec<f64>,
    pub longest_traffic_queue: u32,
}

#[derive(Debug, Clone)]
pub struct RoadHistory {
    pub sectors: RoadSectors,
    pub ticks: Vec<TickSnapshot>,
}

pub struct RoadAggregateMetrics {
    pub mean_density: f64,
    pub mean_vehicles_per_sector: f64,
    pub mean_longest_queue_length: f64,
}

pub struct History {
    pub sector_length: f64,
    pub queue_density_threshold: f64,
    pub roads: BTreeMap<RoadIndex, RoadHistory>,
}

impl History {
    pub fn new() -> Self {
        Self {
            sector_length: 100.0,
            queue_density_threshold: 0.8,
            roads: BTreeMap::new(),
        }
    }

    pub fn configure(&mut self, sector_length: f64, queue_density_threshold: f64) {
        self.sector_length = sector_length;
        self.queue_density_threshold = queue_density_threshold;
    }

    pub fn register_road(&mut self, road_idx: RoadIndex, road_length: f64) {
        self.roads.insert(
            road_idx,
            RoadHistory {
                sectors: RoadSectors::new(road_length, self.sector_length),
                ticks: Vec::new(),
            },
        );
    }

    /// Takes a snapshot of every registered road at tick `t`. Called once
    /// per tick by the simulator after all roads have moved (spec §4.8
    /// step 3).
    pub fn save_state(&mut self, roads: &Arena<Road>, vehicles: &Arena<Vehicle>, t: f64) {
        let road_indices: Vec<RoadIndex> = self.roads.keys().copied().collect();
        for road_idx in road_indices {
            let road = roads.get(road_idx.0);
            let lane_count = road.lanes.len().max(1);
            let sectors = self.roads[&road_idx].sectors.bounds.clone();

            let mut vehicles_per_sector = vec![0u32; sectors.len()];
            let mut length_sum = vec![0.0f64; sectors.len()];
            for lane in &road.lanes {
                for &v_idx in &lane.vehicles {
                    let v = vehicles.get(v_idx.0);
                    if let Some(i) = sectors.iter().position(|(start, end)| v.position > *start && v.position <= *end) {
                        vehicles_per_sector[i] += 1;
                        length_sum[i] += v.length;
                    }
                }
            }

            let density_per_sector: Vec<f64> = sectors
                .iter()
                .enumerate()
                .map(|(i, (start, end))| {
                    let sector_len = (end - start).max(1e-9);
                    (length_sum[i] + vehicles_per_sector[i] as f64 * road.vehicle_distance) / sector_len
                })
                .collect();
            let density_per_lane_per_sector: Vec<f64> = density_per_sector.iter().map(|d| d / lane_count as f64).collect();
            let longest_traffic_queue = longest_run_over_threshold(&density_per_sector, self.queue_density_threshold);

            self.roads.get_mut(&road_idx).unwrap().ticks.push(TickSnapshot {
                time: t,
                vehicles_per_sector,
                density_per_sector,
                density_per_lane_per_sector,
                longest_traffic_queue,
            });
        }
    }

    pub fn aggregate_metrics(&self, road_idx: RoadIndex) -> Option<RoadAggregateMetrics> {
        let entry = self.roads.get(&road_idx)?;
        if entry.ticks.is_empty() {
            return Some(RoadAggregateMetrics {
                mean_density: 0.0,
                mean_vehicles_per_sector: 0.0,
                mean_longest_queue_length: 0.0,
            });
        }
        let n_ticks = entry.ticks.len() as f64;
        let mut density_sum = 0.0;
        let mut density_count = 0usize;
        let mut vps_sum = 0.0;
        let mut longest_sum = 0.0;
        for tick in &entry.ticks {
            density_sum += tick.density_per_sector.iter().sum::<f64>();
            density_count += tick.density_per_sector.len();
            vps_sum += tick.vehicles_per_sector.iter().sum::<u32>() as f64 / tick.vehicles_per_sector.len().max(1) as f64;
            longest_sum += tick.longest_traffic_queue as f64 * self.sector_length;
        }
        Some(RoadAggregateMetrics {
            mean_density: if density_count > 0 { density_sum / density_count as f64 } else { 0.0 },
            mean_vehicles_per_sector: vps_sum / n_ticks,
            mean_longest_queue_length: longest_sum / n_ticks,
        })
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

fn longest_run_over_threshold(densities: &[f64], threshold: f64) -> u32 {
    let mut longest = 0u32;
    let mut current = 0u32;
    for &d in densities {
        if d > threshold {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
