//! Ordered vehicle container and the per-tick car-following driver (spec
//! §3/§4.2/§4.3/§4.5, component D, ~28% of the kernel).

use crate::arena::Arena;
use crate::error::SimError;
use crate::ids::{JunctionIndex, RoadIndex, VehicleIndex};
use crate::shape::Shape;
use crate::traffic_light::TrafficLight;
use crate::vehicle::{Vehicle, VehicleStatus};
use crate::world::World;
use rand::Rng;

pub const SAFETY_DISTANCE_TO_INTERSECTION: f64 = 10.0;
pub const SAFETY_DISTANCE_AFTER_INTERSECTION: f64 = 5.0;
pub const BRAKING_DISTANCE: f64 = 20.0;

#[derive(Debug, Clone, Default)]
pub struct Lane {
    /// Ordered by descending position: index 0 is the vehicle furthest
    /// forward on this lane.
    pub vehicles: Vec<VehicleIndex>,
}

#[derive(Debug, Clone)]
pub struct Road {
    pub length: f64,
    pub vehicle_distance: f64,
    pub speed_limit: f64,
    pub lanes: Vec<Lane>,
    /// Sorted ascending by resolved position; an end-of-road sentinel (-1)
    /// sorts last because it resolves to `length`, the maximum.
    pub semaphores: Vec<TrafficLight>,
    pub start_junction: Option<JunctionIndex>,
    pub end_junction: Option<JunctionIndex>,
    pub priority: i32,
    pub shape: Shape,
    pub is_starting_road: bool,
}

impl Road {
    pub fn new(length: f64, vehicle_distance: f64, speed_limit: f64, priority: i32, num_lanes: usize) -> Self {
        Self {
            length,
            vehicle_distance,
            speed_limit,
            lanes: vec![Lane::default(); num_lanes.max(1)],
            semaphores: Vec::new(),
            start_junction: None,
            end_junction: None,
            priority,
            shape: Shape::straight(length),
            is_starting_road: false,
        }
    }

    /// Adds a semaphore at an explicit position along the road. Kept as a
    /// distinctly named operation from [`Road::add_semaphore_at_end`]
    /// rather than an overload, because the source's overload of the same
    /// name silently shadowed the position-carrying form (spec §9).
    pub fn add_semaphore_at_position(&mut self, light: TrafficLight) {
        self.semaphores.push(light);
        self.sort_semaphores();
    }

    /// Adds a semaphore pinned to the end of the road (position sentinel
    /// `-1`, resolved to `self.length` by [`TrafficLight::position_on`]).
    pub fn add_semaphore_at_end(&mut self, mut light: TrafficLight) {
        light.position = crate::traffic_light::END_OF_ROAD;
        self.semaphores.push(light);
        self.sort_semaphores();
    }

    fn sort_semaphores(&mut self) {
        let length = self.length;
        self.semaphores
            .sort_by(|a, b| a.position_on(length).partial_cmp(&b.position_on(length)).unwrap());
    }

    /// The first semaphore at or after `pos`, honoring the end-of-road
    /// sentinel. `None` if the road has no semaphores at all.
    pub fn first_semaphore_from(&self, pos: f64) -> Option<&TrafficLight> {
        self.semaphores
            .iter()
            .find(|light| light.position_on(self.length) >= pos)
    }

    /// `None` means either this is the front of the lane or the lane is
    /// empty — an explicit `Option`, replacing the source's ambiguous
    /// "return the last vehicle when not found" behavior (spec §9).
    pub fn preceding_in_lane(&self, lane: usize, idx_in_lane: usize) -> Option<VehicleIndex> {
        if idx_in_lane == 0 {
            None
        } else {
            self.lanes[lane].vehicles.get(idx_in_lane - 1).copied()
        }
    }

    /// The vehicle closest to the rear of the queue (or `None` on an empty
    /// lane) — sorted-then-index-0 would be wrong since the lane is already
    /// kept sorted descending; this just takes the last element (spec §9's
    /// `getLastVehicle` bug fix).
    pub fn last_vehicle_in_lane(&self, lane: usize) -> Option<VehicleIndex> {
        self.lanes[lane].vehicles.last().copied()
    }
}

fn insert_sorted_desc(lane: &mut Vec<VehicleIndex>, vehicle_idx: VehicleIndex, position: f64, vehicles: &Arena<Vehicle>) {
    let insert_at = lane
        .iter()
        .position(|&v| vehicles.get(v).position < position)
        .unwrap_or(lane.len());
    lane.insert(insert_at, vehicle_idx);
}

/// Entry admission (spec §4.3). Returns the accepted position, or `None` on
/// rejection (the caller still owns the vehicle; nothing is mutated on
/// rejection beyond the lane scan itself).
pub fn try_add_vehicle(world: &mut World, road_idx: RoadIndex, vehicle_idx: VehicleIndex, t: f64, position: f64) -> Option<f64> {
    let position = if position < 0.0 {
        let err = SimError::State(format!(
            "vehicle {} admitted onto road {road_idx:?} at negative position {position:.3}; force-stopping at 0",
            world.vehicles.get(vehicle_idx).id
        ));
        log::warn!("{err}");
        0.0
    } else {
        position
    };
    let just_created = world.vehicles.get(vehicle_idx).status == VehicleStatus::Created;
    let (vehicle_distance, road_length, speed_limit, lane_count) = {
        let road = world.roads.get(road_idx);
        (road.vehicle_distance, road.length, road.speed_limit, road.lanes.len())
    };

    for lane_idx in 0..lane_count {
        let last_vehicle = world.roads.get(road_idx).last_vehicle_in_lane(lane_idx);
        let has_room = match last_vehicle {
            None => true,
            Some(tail_idx) => {
                let tail = world.vehicles.get(tail_idx);
                tail.position - tail.length - position >= vehicle_distance
            }
        };
        if !(has_room || just_created) {
            continue;
        }

        {
            let v = world.vehicles.get_mut(vehicle_idx);
            v.position = position;
            v.lane_index = lane_idx;
        }
        if !has_room && just_created {
            world.vehicles.get_mut(vehicle_idx).stop_at_vehicle(0.0);
        }

        let next_sem = world.roads.get(road_idx).first_semaphore_from(position).copied();
        match next_sem {
            Some(light) if light.is_red(t) => {
                let sem_pos = light.position_on(road_length);
                world.vehicles.get_mut(vehicle_idx).stop_at_semaphore(sem_pos);
            }
            _ => {
                let v = world.vehicles.get_mut(vehicle_idx);
                v.speed = v.speed.min(speed_limit);
                if v.status == VehicleStatus::Created {
                    v.status = VehicleStatus::Moving;
                }
            }
        }

        insert_sorted_desc(&mut world.roads.get_mut(road_idx).lanes[lane_idx].vehicles, vehicle_idx, position, &world.vehicles);
        world.vehicles.get_mut(vehicle_idx).road = Some(road_idx);
        return Some(position);
    }
    log::trace!("vehicle {} rejected entry onto road {road_idx:?}, no lane has room", world.vehicles.get(vehicle_idx).id);
    None
}

pub fn remove_vehicle_from_lane(world: &mut World, road_idx: RoadIndex, lane_idx: usize, vehicle_idx: VehicleIndex) {
    world.roads.get_mut(road_idx).lanes[lane_idx]
        .vehicles
        .retain(|&v| v != vehicle_idx);
}

/// The probabilistic crossing indicator (spec §4.5): is a vehicle on this
/// road projected to clear the stop bar within the current tick?
pub fn has_outgoing_vehicles(world: &mut World, road_idx: RoadIndex, dt: f64) -> bool {
    let (road_length, speed_limit, lane_count) = {
        let road = world.roads.get(road_idx);
        (road.length, road.speed_limit, road.lanes.len())
    };
    for lane_idx in 0..lane_count {
        let vehicles = world.roads.get(road_idx).lanes[lane_idx].vehicles.clone();
        for v in vehicles {
            let proj = world.vehicles.get(v).project_position(speed_limit, dt);
            if proj > road_length {
                return true;
            }
            let threshold_start = road_length - SAFETY_DISTANCE_TO_INTERSECTION;
            if proj > threshold_start {
                let p = (proj - threshold_start) / SAFETY_DISTANCE_TO_INTERSECTION;
                if world.rng.random::<f64>() < p {
                    return true;
                }
            }
        }
    }
    false
}

/// Driver for one road's worth of vehicles this tick (spec §4.2/§5): a
/// snapshot of each lane's order is taken up front so that in-iteration
/// junction handoffs don't corrupt the walk, and highest-index-first isn't
/// required here because the simulator already orders roads.
pub fn move_vehicles(world: &mut World, road_idx: RoadIndex, t: f64, dt: f64) {
    let lane_count = world.roads.get(road_idx).lanes.len();
    for lane_idx in 0..lane_count {
        let snapshot: Vec<VehicleIndex> = world.roads.get(road_idx).lanes[lane_idx].vehicles.clone();
        for vehicle_idx in snapshot {
            if !world.roads.get(road_idx).lanes[lane_idx].vehicles.contains(&vehicle_idx) {
                continue; // handed off to another road earlier this tick
            }
            let vehicle = world.vehicles.get(vehicle_idx);
            let already_updated = vehicle.last_update == t && vehicle.status != VehicleStatus::Created;
            if already_updated {
                continue;
            }
            move_vehicle(world, road_idx, lane_idx, vehicle_idx, t, dt);
        }
    }
}

/// The car-following decision tree (spec §4.2). This is the single largest
/// function in the kernel; it mirrors the branch structure of the
/// specification directly rather than a generic table, since "Stopped" and
/// "Moving" share little beyond the blocked/not-blocked split.
pub fn move_vehicle(world: &mut World, road_idx: RoadIndex, lane_idx: usize, vehicle_idx: VehicleIndex, t: f64, dt: f64) {
    let (road_length, road_speed_limit, vehicle_distance) = {
        let road = world.roads.get(road_idx);
        (road.length, road.speed_limit, road.vehicle_distance)
    };

    let idx_in_lane = world.roads.get(road_idx).lanes[lane_idx]
        .vehicles
        .iter()
        .position(|&v| v == vehicle_idx)
        .expect("vehicle must be in the lane it's being moved in");
    let preceding_idx = world.roads.get(road_idx).preceding_in_lane(lane_idx, idx_in_lane);

    let prior_status = world.vehicles.get(vehicle_idx).status;
    let next_pos = world.vehicles.get(vehicle_idx).project_position(road_speed_limit, dt);

    let lead = preceding_idx.map(|lead_idx| {
        let lead = world.vehicles.get(lead_idx);
        (lead.position - vehicle_distance - lead.length, lead.position, lead.length, lead.speed, lead.is_stopped())
    });
    let safe_pos = lead.map(|(s, ..)| s).unwrap_or(f64::INFINITY);

    let next_sem = world.roads.get(road_idx).first_semaphore_from(world.vehicles.get(vehicle_idx).position).copied();
    let sem_pos = next_sem.map(|l| l.position_on(road_length)).unwrap_or(road_length);
    let sem_red = next_sem.map(|l| l.is_red(t)).unwrap_or(false);

    let red_ahead = sem_red && next_pos >= sem_pos;
    let veh_ahead = lead.is_some() && next_pos > safe_pos;

    if world.vehicles.get(vehicle_idx).is_giving_way() {
        let old_position = world.vehicles.get(vehicle_idx).position;
        let preceding_cum_delay = preceding_idx.map(|l| world.vehicles.get(l).cumulative_delay);
        {
            let (vehicles, rng) = (&mut world.vehicles, &mut world.rng);
            vehicles.get_mut(vehicle_idx).restart(rng, road_speed_limit, dt, preceding_cum_delay);
        }
        end_of_road_handler(world, road_idx, lane_idx, vehicle_idx, t, dt);
        let still_here = world.vehicles.get(vehicle_idx).road == Some(road_idx);
        if still_here && world.vehicles.get(vehicle_idx).is_giving_way() {
            log::trace!("vehicle {} giveWay rollback on road {road_idx:?}", world.vehicles.get(vehicle_idx).id);
            world.vehicles.get_mut(vehicle_idx).position = old_position;
        }
    } else if world.vehicles.get(vehicle_idx).is_stopped() {
        let blocked = red_ahead || veh_ahead;
        if !blocked {
            if safe_pos < 0.0 {
                world.vehicles.get_mut(vehicle_idx).stop_at(0.0);
            } else {
                move_and_overtake_if_possible(world, road_idx, lane_idx, vehicle_idx, false, t, dt);
            }
        } else if red_ahead {
            // remains stopped at the light
        } else if veh_ahead {
            let lead_stopped = lead.map(|(_, _, _, _, stopped)| stopped).unwrap_or(false);
            if !lead_stopped && safe_pos >= 0.0 {
                move_and_overtake_if_possible(world, road_idx, lane_idx, vehicle_idx, false, t, dt);
            }
        }
        maybe_handle_end_of_road(world, road_idx, lane_idx, vehicle_idx, road_length, t, dt);
    } else {
        // Moving
        if !red_ahead && !veh_ahead {
            let mut next_stop_pos = f64::INFINITY;
            if let Some((safe, _, _, _, lead_stopped)) = lead {
                if lead_stopped {
                    next_stop_pos = next_stop_pos.min(safe);
                }
            }
            if sem_red {
                next_stop_pos = next_stop_pos.min(sem_pos);
            }
            let position = world.vehicles.get(vehicle_idx).position;
            if next_stop_pos < position + BRAKING_DISTANCE {
                world.vehicles.get_mut(vehicle_idx).brake_to_stop_at(next_stop_pos, dt);
            }
            move_and_overtake_if_possible(world, road_idx, lane_idx, vehicle_idx, true, t, dt);
        } else if red_ahead && veh_ahead {
            if sem_pos < safe_pos {
                world.vehicles.get_mut(vehicle_idx).stop_at_semaphore(sem_pos);
            } else if let Some((_, lead_position, lead_length, lead_speed, _)) = lead {
                world.vehicles.get_mut(vehicle_idx).follow_vehicle(lead_position, lead_length, lead_speed, vehicle_distance);
            }
        } else if red_ahead {
            world.vehicles.get_mut(vehicle_idx).stop_at_semaphore(sem_pos);
        } else {
            // veh_ahead only
            move_and_overtake_if_possible(world, road_idx, lane_idx, vehicle_idx, true, t, dt);
        }
        maybe_handle_end_of_road(world, road_idx, lane_idx, vehicle_idx, road_length, t, dt);
    }

    if let Some(lead_idx) = preceding_idx {
        let lead_still_here = world.vehicles.get(lead_idx).road == Some(road_idx);
        let lead_position = world.vehicles.get(lead_idx).position;
        let position = world.vehicles.get(vehicle_idx).position;
        if lead_still_here && world.vehicles.get(vehicle_idx).road == Some(road_idx) && position > lead_position {
            let err = SimError::State(format!(
                "vehicle {} inverted past its preceding vehicle on road {road_idx:?}; force-stopping at 0",
                world.vehicles.get(vehicle_idx).id
            ));
            log::warn!("{err}");
            world.vehicles.get_mut(vehicle_idx).stop_at(0.0);
        }
    }

    let road_for_update = world.vehicles.get(vehicle_idx).road;
    let shape = match road_for_update {
        Some(r) => world.roads.get(r).shape.clone(),
        None => world.roads.get(road_idx).shape.clone(),
    };
    world
        .vehicles
        .get_mut(vehicle_idx)
        .update(t, road_for_update, &shape, prior_status);
}

fn maybe_handle_end_of_road(world: &mut World, road_idx: RoadIndex, lane_idx: usize, vehicle_idx: VehicleIndex, road_length: f64, t: f64, dt: f64) {
    if world.vehicles.get(vehicle_idx).position > road_length {
        end_of_road_handler(world, road_idx, lane_idx, vehicle_idx, t, dt);
    }
}

/// `moveAndOvertakeIfPossible` (spec §4.2). `was_moving` distinguishes a
/// vehicle that was already rolling this tick from one resuming out of a
/// full stop: a resuming vehicle goes through `restart`'s reaction-time/
/// damping-delay model rather than plain free-flow kinematics.
fn move_and_overtake_if_possible(world: &mut World, road_idx: RoadIndex, lane_idx: usize, vehicle_idx: VehicleIndex, was_moving: bool, _t: f64, dt: f64) {
    let road_speed_limit = world.roads.get(road_idx).speed_limit;
    let vehicle_distance = world.roads.get(road_idx).vehicle_distance;

    let idx_in_lane = world.roads.get(road_idx).lanes[lane_idx]
        .vehicles
        .iter()
        .position(|&v| v == vehicle_idx)
        .expect("vehicle must be in the lane it's being moved in");
    let preceding_idx = world.roads.get(road_idx).preceding_in_lane(lane_idx, idx_in_lane);
    let preceding_cum_delay = preceding_idx.map(|l| world.vehicles.get(l).cumulative_delay);

    {
        let (vehicles, rng) = (&mut world.vehicles, &mut world.rng);
        let vehicle = vehicles.get_mut(vehicle_idx);
        if was_moving {
            vehicle.advance_free_flow(rng, road_speed_limit, dt, preceding_cum_delay);
        } else {
            vehicle.restart(rng, road_speed_limit, dt, preceding_cum_delay);
        }
    }

    if let Some(lead_idx) = preceding_idx {
        let (safe_pos, lead_position, lead_length, lead_speed, lead_stopped) = {
            let lead = world.vehicles.get(lead_idx);
            (lead.position - vehicle_distance - lead.length, lead.position, lead.length, lead.speed, lead.is_stopped())
        };
        let position = world.vehicles.get(vehicle_idx).position;

        if position > safe_pos {
            let lane_count = world.roads.get(road_idx).lanes.len();
            let next_lane = lane_idx + 1;
            let can_promote = next_lane < lane_count && {
                let closest_ahead = world.roads.get(road_idx).lanes[next_lane]
                    .vehicles
                    .iter()
                    .map(|&v| world.vehicles.get(v).position)
                    .filter(|&p| p > position)
                    .fold(f64::INFINITY, f64::min);
                closest_ahead - vehicle_distance >= position
            };
            if can_promote {
                let pos = world.vehicles.get(vehicle_idx).position;
                world.roads.get_mut(road_idx).lanes[lane_idx].vehicles.retain(|&v| v != vehicle_idx);
                insert_sorted_desc(&mut world.roads.get_mut(road_idx).lanes[next_lane].vehicles, vehicle_idx, pos, &world.vehicles);
                world.vehicles.get_mut(vehicle_idx).lane_index = next_lane;
            } else if lead_stopped {
                world.vehicles.get_mut(vehicle_idx).stop_at_vehicle(safe_pos);
            } else {
                world
                    .vehicles
                    .get_mut(vehicle_idx)
                    .follow_vehicle(lead_position, lead_length, lead_speed, vehicle_distance);
            }
        }
    }

    let limit = world.roads.get(road_idx).speed_limit;
    let v = world.vehicles.get_mut(vehicle_idx);
    if v.speed > limit {
        v.speed = limit;
    }
}

fn end_of_road_handler(world: &mut World, road_idx: RoadIndex, lane_idx: usize, vehicle_idx: VehicleIndex, t: f64, dt: f64) {
    let (position, road_length, end_junction) = {
        let road = world.roads.get(road_idx);
        (world.vehicles.get(vehicle_idx).position, road.length, road.end_junction)
    };
    if position <= road_length {
        return;
    }
    let excess = position - road_length;
    match end_junction {
        Some(junction_idx) => {
            crate::junction::handle_vehicle(world, junction_idx, road_idx, lane_idx, vehicle_idx, excess, t, dt);
        }
        None => {
            log::debug!("vehicle {} fell off dead-end road at t={t}", world.vehicles.get(vehicle_idx).id);
            remove_vehicle_from_lane(world, road_idx, lane_idx, vehicle_idx);
            world.vehicles.get_mut(vehicle_idx).arrive(t);
        }
    }
}

/// Sets the give-way position so a vehicle "knocks on the door" of the next
/// road without tail-gating the vehicle behind it (spec §4.4's
/// `waitForNextRoad`), never beyond `road.length`.
pub fn wait_for_next_road(world: &mut World, road_idx: RoadIndex, lane_idx: usize, vehicle_idx: VehicleIndex, desired_pos: f64) {
    let idx_in_lane = world.roads.get(road_idx).lanes[lane_idx]
        .vehicles
        .iter()
        .position(|&v| v == vehicle_idx);
    let road_length = world.roads.get(road_idx).length;

    let behind_follower_limit = match idx_in_lane {
        Some(i) if i + 1 < world.roads.get(road_idx).lanes[lane_idx].vehicles.len() => {
            let follower_idx = world.roads.get(road_idx).lanes[lane_idx].vehicles[i + 1];
            let follower = world.vehicles.get(follower_idx);
            follower.position + world.roads.get(road_idx).vehicle_distance + world.vehicles.get(vehicle_idx).length
        }
        _ => f64::NEG_INFINITY,
    };

    let pos = desired_pos.max(behind_follower_limit).min(road_length);
    world.vehicles.get_mut(vehicle_idx).give_way(pos);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_preceding_lookup_is_none_at_front() {
        let road = Road::new(1000.0, 2.0, 20.0, 0, 1);
        assert_eq!(road.preceding_in_lane(0, 0), None);
    }

    #[test]
    fn semaphore_sort_places_end_of_road_last() {
        let mut road = Road::new(1000.0, 2.0, 20.0, 0, 1);
        road.add_semaphore_at_end(TrafficLight::new(crate::traffic_light::END_OF_ROAD, 40.0, 20.0, 0.0, 0.0));
        road.add_semaphore_at_position(TrafficLight::new(200.0, 40.0, 20.0, 0.0, 0.0));
        assert_eq!(road.semaphores[0].position, 200.0);
        assert_eq!(road.semaphores[1].position_on(road.length), 1000.0);
    }

    #[test]
    fn last_vehicle_in_lane_on_empty_lane_is_none() {
        let road = Road::new(500.0, 2.0, 20.0, 0, 1);
        assert_eq!(road.last_vehicle_in_lane(0), None);
    }
}
