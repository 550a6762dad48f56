//! Periodic three-phase traffic light schedule (spec §3/§4.6, component C).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightColor {
    Green,
    Yellow,
    Red,
}

/// End-of-road sentinel for `TrafficLight::position`.
pub const END_OF_ROAD: f64 = -1.0;

#[derive(Debug, Clone, Copy)]
pub struct TrafficLight {
    pub green_time: f64,
    pub red_time: f64,
    pub yellow_time: f64,
    /// Position along the road; `END_OF_ROAD` (-1) means "at the end".
    pub position: f64,
    pub start_time: f64,
}

impl TrafficLight {
    pub fn new(position: f64, green_time: f64, red_time: f64, yellow_time: f64, start_time: f64) -> Self {
        Self {
            green_time,
            red_time,
            yellow_time,
            position,
            start_time,
        }
    }

    pub fn cycle_length(&self) -> f64 {
        self.green_time + self.yellow_time + self.red_time
    }

    /// Deterministic pure function of absolute time: before `start_time` the
    /// light is red; afterwards it cycles green -> yellow -> red.
    pub fn state(&self, t: f64) -> LightColor {
        if t < self.start_time {
            return LightColor::Red;
        }
        let tau = (t - self.start_time) % self.cycle_length();
        if tau < self.green_time {
            LightColor::Green
        } else if tau < self.green_time + self.yellow_time {
            LightColor::Yellow
        } else {
            LightColor::Red
        }
    }

    pub fn is_red(&self, t: f64) -> bool {
        matches!(self.state(t), LightColor::Red)
    }

    /// Resolves the `-1` end-of-road sentinel against an actual road length.
    pub fn position_on(&self, road_length: f64) -> f64 {
        if self.position == END_OF_ROAD {
            road_length
        } else {
            self.position
        }
    }

    /// Builds the opposite-phase sibling used to interlock two lights at an
    /// X-intersection: the new green window covers what used to be the
    /// trailing part of the red window (after subtracting one yellow slot,
    /// which becomes a shared pure-red safety gap), and the new red window
    /// covers what used to be green. Same `start_time`, same position unless
    /// the caller overrides it.
    pub fn opposite_phase(&self) -> Self {
        let new_green = (self.red_time - self.yellow_time).max(0.0);
        let new_red = self.green_time;
        Self {
            green_time: new_green,
            yellow_time: self.yellow_time,
            red_time: new_red,
            position: self.position,
            start_time: self.start_time,
        }
    }
}
