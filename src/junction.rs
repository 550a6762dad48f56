//! Closed-variant junction routing (spec §4.4, component E): a vehicle that
//! overshoots its road by `excess` meters is handed here to pick (or wait
//! for) its next road. Three variants replace the source's open-ended
//! inheritance hierarchy (spec §9).

use crate::ids::{JunctionIndex, RoadIndex, VehicleIndex};
use crate::road;
use crate::road::SAFETY_DISTANCE_AFTER_INTERSECTION;
use crate::traffic_light::END_OF_ROAD;
use crate::world::World;
use rand::Rng;

#[derive(Debug, Clone)]
pub enum Junction {
    /// One incoming road forking into N outgoing roads by flux weight.
    NFurcation { incoming: RoadIndex, outgoing: Vec<RoadIndex>, weights: Vec<f64> },
    /// Two or more incoming roads merging into one outgoing road; the
    /// incoming road with the smaller `priority` number always goes first.
    Merge { incoming: Vec<RoadIndex>, outgoing: RoadIndex },
    /// General N-to-M arbitration with per-outgoing flux weights and a
    /// right-of-way gate.
    Intersection { incoming: Vec<RoadIndex>, outgoing: Vec<RoadIndex>, weights: Vec<f64> },
}

pub fn handle_vehicle(
    world: &mut World,
    junction_idx: JunctionIndex,
    incoming_road: RoadIndex,
    lane_idx: usize,
    vehicle_idx: VehicleIndex,
    excess: f64,
    t: f64,
    dt: f64,
) {
    let junction = world.junctions.get(junction_idx).clone();
    match junction {
        Junction::NFurcation { outgoing, weights, .. } => {
            if outgoing.is_empty() {
                sink(world, incoming_road, lane_idx, vehicle_idx, t);
                return;
            }
            let target = weighted_draw(&mut world.rng, &outgoing, &weights);
            dispatch_or_wait(world, incoming_road, lane_idx, vehicle_idx, target, excess, t);
        }
        Junction::Merge { incoming, outgoing } => {
            let priority_road = incoming
                .iter()
                .copied()
                .min_by_key(|r| world.roads.get(*r).priority)
                .expect("a Merge junction has at least one incoming road");
            let is_priority = priority_road == incoming_road;
            let allowed = is_priority || !road::has_outgoing_vehicles(world, priority_road, dt);
            if !allowed {
                let wait_pos = excess + world.roads.get(incoming_road).length;
                road::wait_for_next_road(world, incoming_road, lane_idx, vehicle_idx, wait_pos);
                return;
            }
            dispatch_or_wait(world, incoming_road, lane_idx, vehicle_idx, outgoing, excess, t);
        }
        Junction::Intersection { incoming, outgoing, weights } => {
            if outgoing.is_empty() {
                sink(world, incoming_road, lane_idx, vehicle_idx, t);
                return;
            }
            let candidate = weighted_draw(&mut world.rng, &outgoing, &weights);
            if can_go(world, &incoming, incoming_road, candidate, excess, t, dt) {
                dispatch_or_wait(world, incoming_road, lane_idx, vehicle_idx, candidate, excess, t);
            } else {
                let pos = world
                    .vehicles
                    .get(vehicle_idx)
                    .position
                    .min(world.roads.get(incoming_road).length);
                world.vehicles.get_mut(vehicle_idx).give_way(pos);
            }
        }
    }
}

/// Phase 1 of intersection arbitration: deny if a higher-priority incoming
/// road currently has the right of way and traffic approaching the stop
/// bar, or if the chosen outgoing road has no room near the junction.
fn can_go(world: &mut World, incoming: &[RoadIndex], this_road: RoadIndex, candidate_outgoing: RoadIndex, excess: f64, t: f64, dt: f64) -> bool {
    let this_priority = world.roads.get(this_road).priority;
    for &other in incoming {
        if other == this_road {
            continue;
        }
        if world.roads.get(other).priority < this_priority && is_road_green(world, other, t) && road::has_outgoing_vehicles(world, other, dt) {
            return false;
        }
    }
    has_room_for_entry(world, candidate_outgoing, excess)
}

/// Only the explicit end-of-road semaphore (`position == END_OF_ROAD`) gates
/// right of way at a junction; a mid-road light doesn't count as the
/// entrance gate, and a road with no end-of-road semaphore is unconditionally
/// green for arbitration purposes.
fn is_road_green(world: &World, road_idx: RoadIndex, t: f64) -> bool {
    match world.roads.get(road_idx).semaphores.iter().find(|light| light.position == END_OF_ROAD) {
        Some(light) => !light.is_red(t),
        None => true,
    }
}

fn has_room_for_entry(world: &World, outgoing: RoadIndex, entry_pos: f64) -> bool {
    match world.roads.get(outgoing).last_vehicle_in_lane(0) {
        Some(tail_idx) => {
            let tail = world.vehicles.get(tail_idx);
            tail.position - tail.length - entry_pos >= SAFETY_DISTANCE_AFTER_INTERSECTION
        }
        None => true,
    }
}

fn dispatch_or_wait(world: &mut World, incoming_road: RoadIndex, lane_idx: usize, vehicle_idx: VehicleIndex, target: RoadIndex, excess: f64, t: f64) {
    match road::try_add_vehicle(world, target, vehicle_idx, t, excess) {
        Some(_) => {
            road::remove_vehicle_from_lane(world, incoming_road, lane_idx, vehicle_idx);
        }
        None => {
            let wait_pos = excess + world.roads.get(incoming_road).length;
            road::wait_for_next_road(world, incoming_road, lane_idx, vehicle_idx, wait_pos);
        }
    }
}

fn sink(world: &mut World, road_idx: RoadIndex, lane_idx: usize, vehicle_idx: VehicleIndex, t: f64) {
    road::remove_vehicle_from_lane(world, road_idx, lane_idx, vehicle_idx);
    world.vehicles.get_mut(vehicle_idx).arrive(t);
}

fn weighted_draw(rng: &mut impl Rng, items: &[RoadIndex], weights: &[f64]) -> RoadIndex {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return items[0];
    }
    let mut r = rng.random::<f64>() * total;
    for (item, w) in items.iter().zip(weights) {
        if r < *w {
            return *item;
        }
        r -= w;
    }
    *items.last().unwrap()
}
