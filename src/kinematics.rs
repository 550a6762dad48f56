//! Shared scalar helpers for the explicit-Euler car-following step (spec
//! §4.1). Kept free of `Vehicle` so both `Vehicle::advance_free_flow` and
//! `Vehicle::restart` can reuse the same "don't overshoot the speed cap
//! mid-interval" displacement rule.

/// Acceleration clamped so that `v + a*dt` does not exceed `limit`, and
/// magnitude capped by `max_accel`. May be negative if `v` already exceeds
/// `limit` (e.g. a road's speed limit drops below the vehicle's max speed).
pub fn clamped_acceleration(v: f64, max_accel: f64, limit: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }
    max_accel.min((limit - v) / dt)
}

/// Displacement over `dt` under constant acceleration `a`, capped so that
/// the vehicle coasts at `limit` for the remainder of `dt` once it gets
/// there instead of overshooting past it within the same step.
///
/// Returns `(displacement, new_speed)`.
pub fn displacement_with_cap(v: f64, a: f64, limit: f64, dt: f64) -> (f64, f64) {
    if dt <= 0.0 {
        return (0.0, v.max(0.0));
    }
    if a > 0.0 {
        let t_to_limit = ((limit - v) / a).max(0.0);
        if t_to_limit < dt {
            let d1 = v * t_to_limit + 0.5 * a * t_to_limit * t_to_limit;
            let remaining = dt - t_to_limit;
            let d2 = limit.max(0.0) * remaining;
            return (d1 + d2, limit.max(0.0));
        }
    }
    let new_speed = (v + a * dt).max(0.0);
    (v * dt + 0.5 * a * dt * dt, new_speed)
}
