//! Vehicle kinematics (spec §4.1, component A): one-step integration,
//! braking, the restart-with-delay queue model, and per-tick history.

use crate::ids::RoadIndex;
use crate::kinematics::{clamped_acceleration, displacement_with_cap};
use crate::shape::Shape;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VehicleStatus {
    Created,
    Moving,
    Stopped,
    WaitingSemaphore,
    WaitingVehicle,
    GivingWay,
    Accelerating,
    Braking,
    Following,
    Arrived,
}

impl VehicleStatus {
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            VehicleStatus::Stopped
                | VehicleStatus::WaitingSemaphore
                | VehicleStatus::WaitingVehicle
                | VehicleStatus::GivingWay
        )
    }

    pub fn is_stopped_like(&self) -> bool {
        matches!(
            self,
            VehicleStatus::Stopped | VehicleStatus::WaitingSemaphore | VehicleStatus::WaitingVehicle
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct VehicleSnapshot {
    pub time: f64,
    pub position: f64,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub acceleration: f64,
    pub status: VehicleStatus,
    pub road: Option<RoadIndex>,
}

/// Fixed physical/behavioral parameters a vehicle is created with (spec §6
/// `vehicles[]` entries).
#[derive(Debug, Clone, Copy)]
pub struct VehicleParams {
    pub length: f64,
    pub max_speed: f64,
    pub max_acceleration: f64,
    pub reaction_time: f64,
    pub reaction_time_at_semaphore: f64,
    pub damping_factor: f64,
    pub sigma: f64,
    pub initial_position: f64,
    pub initial_speed: f64,
    pub initial_acceleration: f64,
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: u64,
    pub length: f64,
    pub max_speed: f64,
    pub max_acceleration: f64,
    pub reaction_time: f64,
    pub reaction_time_at_semaphore: f64,
    pub damping_factor: f64,
    pub sigma: f64,

    pub position: f64,
    pub speed: f64,
    pub acceleration: f64,
    pub lane_index: usize,

    pub status: VehicleStatus,

    pub creation_time: f64,
    pub last_update: f64,
    /// -1 until arrival.
    pub arrival_time: f64,
    pub depart_delay: f64,
    pub is_departed: bool,

    pub cumulative_delay: f64,
    pub current_delay: f64,

    pub number_of_stops: u64,
    pub time_waited: f64,

    pub history: Vec<VehicleSnapshot>,
    pub road: Option<RoadIndex>,
}

impl Vehicle {
    pub fn new(id: u64, params: VehicleParams, creation_time: f64) -> Self {
        Self {
            id,
            length: params.length,
            max_speed: params.max_speed,
            max_acceleration: params.max_acceleration,
            reaction_time: params.reaction_time,
            reaction_time_at_semaphore: params.reaction_time_at_semaphore,
            damping_factor: params.damping_factor,
            sigma: params.sigma,
            position: 0.0,
            speed: params.initial_speed,
            acceleration: params.initial_acceleration,
            lane_index: 0,
            status: VehicleStatus::Created,
            creation_time,
            last_update: creation_time,
            arrival_time: -1.0,
            depart_delay: 0.0,
            is_departed: false,
            cumulative_delay: 0.0,
            current_delay: 0.0,
            number_of_stops: 0,
            time_waited: 0.0,
            history: Vec::new(),
            road: None,
        }
    }

    pub fn is_giving_way(&self) -> bool {
        self.status == VehicleStatus::GivingWay
    }

    pub fn is_stopped(&self) -> bool {
        self.status.is_stopped_like()
    }

    pub fn has_arrived(&self) -> bool {
        self.status == VehicleStatus::Arrived
    }

    /// Pure free-flow projection: where would this vehicle be after `dt` if
    /// nothing blocked it? Used by `Road::move_vehicle` to look ahead for
    /// red lights and slower leaders without mutating state.
    pub fn project_position(&self, speed_limit: f64, dt: f64) -> f64 {
        if self.status == VehicleStatus::Accelerating {
            let effective_step = (dt - self.current_delay).max(0.0);
            if effective_step <= 0.0 {
                return self.position;
            }
            let limit = speed_limit.min(self.max_speed);
            let a = clamped_acceleration(self.speed, self.max_acceleration, limit, effective_step);
            let (d, _) = displacement_with_cap(self.speed, a, limit, effective_step);
            self.position + d
        } else {
            let limit = speed_limit.min(self.max_speed);
            let a = clamped_acceleration(self.speed, self.max_acceleration, limit, dt);
            let (d, _) = displacement_with_cap(self.speed, a, limit, dt);
            self.position + d
        }
    }

    /// The `move(speedLimit, dt)` operation: advance one step assuming free
    /// flow. Delegates to `restart` when a restart is already in progress.
    pub fn advance_free_flow(
        &mut self,
        rng: &mut impl Rng,
        speed_limit: f64,
        dt: f64,
        preceding_cumulative_delay: Option<f64>,
    ) {
        if self.status == VehicleStatus::Accelerating {
            self.restart(rng, speed_limit, dt, preceding_cumulative_delay);
            return;
        }

        let limit = speed_limit.min(self.max_speed);
        let a = clamped_acceleration(self.speed, self.max_acceleration, limit, dt);
        self.acceleration = a;
        let (displacement, uncapped_speed) = displacement_with_cap(self.speed, a, limit, dt);

        let mean_speed = self.speed + a * dt;
        let sampled_speed = if self.sigma > 0.0 {
            let normal = Normal::new(mean_speed, self.sigma).expect("sigma must be finite and >= 0");
            normal.sample(rng)
        } else {
            mean_speed
        };
        let new_speed = sampled_speed.min(limit).max(0.0).min(uncapped_speed.max(limit));

        self.position += displacement;
        self.speed = new_speed.min(limit).max(0.0);
        self.status = VehicleStatus::Moving;
    }

    /// `brakeToStopAt(target, dt)`: physically correct deceleration toward
    /// a stop target (spec §4.1).
    pub fn brake_to_stop_at(&mut self, target: f64, dt: f64) {
        if self.position >= target {
            self.speed = 0.0;
            self.acceleration = 0.0;
            self.status = VehicleStatus::Stopped;
            return;
        }
        let gap = (target - self.position).max(1e-6);
        let a = -(self.speed * self.speed) / (2.0 * gap);
        self.acceleration = a;
        let new_speed = (self.speed + a * dt).max(0.0);
        self.position = (self.position + self.speed * dt + 0.5 * a * dt * dt).min(target);
        self.speed = new_speed;
        self.status = if self.speed <= f64::EPSILON {
            VehicleStatus::Stopped
        } else {
            VehicleStatus::Braking
        };
    }

    /// The queue-delay restart model (spec §4.1, the central piece).
    /// `preceding_cumulative_delay` is `None` when there is no vehicle ahead
    /// on this road (e.g. a solitary vehicle giving way at the stop line).
    pub fn restart(
        &mut self,
        rng: &mut impl Rng,
        speed_limit: f64,
        dt: f64,
        preceding_cumulative_delay: Option<f64>,
    ) {
        let past_status = self.status;
        if past_status != VehicleStatus::Accelerating {
            self.cumulative_delay = if !self.is_departed {
                0.0
            } else if past_status == VehicleStatus::WaitingSemaphore {
                self.reaction_time_at_semaphore
            } else {
                let prec_delay = preceding_cumulative_delay.unwrap_or(0.0);
                prec_delay + self.reaction_time * (-self.damping_factor * prec_delay).exp()
            };
            self.current_delay = self.cumulative_delay;
        }

        let effective_step = (dt - self.current_delay).max(0.0);
        if effective_step > 0.0 {
            self.cumulative_delay = 0.0;
        }
        self.current_delay = (self.current_delay - dt).max(0.0);

        if effective_step > 0.0 {
            let limit = speed_limit.min(self.max_speed);
            let a = self.max_acceleration.min(clamped_acceleration(
                self.speed,
                self.max_acceleration,
                limit,
                effective_step,
            ));
            let a = a.max(0.0);
            let (displacement, new_speed) = displacement_with_cap(self.speed, a, limit, effective_step);
            self.acceleration = a;
            self.position += displacement;
            self.speed = new_speed;
        }

        let limit = speed_limit.min(self.max_speed);
        self.status = if self.speed >= limit - 1e-9 {
            VehicleStatus::Moving
        } else {
            VehicleStatus::Accelerating
        };
        self.is_departed = true;
    }

    pub fn stop_at(&mut self, pos: f64) {
        self.position = pos;
        self.speed = 0.0;
        self.acceleration = 0.0;
        self.status = VehicleStatus::Stopped;
    }

    pub fn stop_at_semaphore(&mut self, pos: f64) {
        self.position = pos;
        self.speed = 0.0;
        self.acceleration = 0.0;
        self.status = VehicleStatus::WaitingSemaphore;
    }

    pub fn stop_at_vehicle(&mut self, pos: f64) {
        self.position = pos;
        self.speed = 0.0;
        self.acceleration = 0.0;
        self.status = VehicleStatus::WaitingVehicle;
    }

    pub fn give_way(&mut self, pos: f64) {
        self.position = pos;
        self.speed = 0.0;
        self.acceleration = 0.0;
        self.status = VehicleStatus::GivingWay;
    }

    pub fn follow_vehicle(&mut self, lead_position: f64, lead_length: f64, lead_speed: f64, gap: f64) {
        self.position = lead_position - lead_length - gap;
        self.speed = lead_speed.min(self.max_speed).max(0.0);
        self.status = VehicleStatus::Following;
    }

    /// Commit-step hook: bookkeeping + history snapshot. `prior_status` is
    /// the vehicle's status at the start of this tick, before any of the
    /// branches in `Road::move_vehicle` ran.
    pub fn update(&mut self, t: f64, road: Option<RoadIndex>, shape: &Shape, prior_status: VehicleStatus) {
        if prior_status.is_waiting() && self.speed == 0.0 {
            self.time_waited += t - self.last_update;
        }
        if prior_status == VehicleStatus::Moving && self.status == VehicleStatus::Stopped {
            self.number_of_stops += 1;
        }
        if prior_status == VehicleStatus::Created && self.status.is_waiting() {
            self.depart_delay = t - self.creation_time;
        }

        let (x, y) = shape.point_at(self.position);
        self.history.push(VehicleSnapshot {
            time: t,
            position: self.position,
            x,
            y,
            speed: self.speed,
            acceleration: self.acceleration,
            status: self.status,
            road,
        });
        self.last_update = t;
    }

    pub fn arrive(&mut self, t: f64) {
        self.status = VehicleStatus::Arrived;
        self.arrival_time = t;
        self.road = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn default_params() -> VehicleParams {
        VehicleParams {
            length: 4.5,
            max_speed: 27.78,
            max_acceleration: 4.0,
            reaction_time: 1.0,
            reaction_time_at_semaphore: 1.0,
            damping_factor: 0.18,
            sigma: 0.0,
            initial_position: 0.0,
            initial_speed: 0.0,
            initial_acceleration: 0.0,
        }
    }

    #[test]
    fn free_flow_accelerates_toward_speed_limit() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut v = Vehicle::new(1, default_params(), 0.0);
        v.status = VehicleStatus::Moving;
        v.advance_free_flow(&mut rng, 27.78, 1.0, None);
        assert!(v.speed > 0.0);
        assert!(v.position > 0.0);
    }

    #[test]
    fn restart_converges_through_a_queue() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut tail_delay = 1.0_f64; // reaction_time_at_semaphore for the head of the queue
        for _ in 0..50 {
            let next = tail_delay + 1.0 * (-0.18_f64 * tail_delay).exp();
            tail_delay = next;
        }
        let bound = 1.0 + 1.0 / (1.0 - (-0.18_f64).exp());
        assert!(tail_delay <= bound + 1e-6);
        let _ = &mut rng; // silence unused warning if assertions above change
    }

    #[test]
    fn brake_to_stop_reaches_target_without_overshoot() {
        let mut v = Vehicle::new(2, default_params(), 0.0);
        v.position = 0.0;
        v.speed = 10.0;
        v.brake_to_stop_at(20.0, 1.0);
        assert!(v.position <= 20.0);
        assert!(v.speed >= 0.0);
    }

    #[test]
    fn stop_at_vehicle_sets_waiting_status() {
        let mut v = Vehicle::new(3, default_params(), 0.0);
        v.stop_at_vehicle(5.0);
        assert_eq!(v.status, VehicleStatus::WaitingVehicle);
        assert_eq!(v.speed, 0.0);
    }
}
