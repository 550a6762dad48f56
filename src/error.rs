//! Error taxonomy (spec §7): `Config` and `Topology` abort scenario loading
//! with a diagnostic; `State` is a tolerated, logged invariant violation,
//! constructed at its detection site purely to log and never propagated out
//! of the kernel.

use std::fmt;

#[derive(Debug, Clone)]
pub enum SimError {
    /// Unreadable file, JSON parse failure, schema violation, or a
    /// cross-reference to a nonexistent road id.
    Config(String),
    /// Intersection missing a required incoming/outgoing road, or flux
    /// weights that don't sum to 1 within epsilon.
    Topology(String),
    /// Invariant violation (preceding-vehicle position inversion, negative
    /// position after admission) detected and tolerated at the point of
    /// occurrence in `road::move_vehicle`/`road::try_add_vehicle`: the
    /// offending vehicle is force-stopped at position 0, a `State` error is
    /// constructed and logged via `log::warn!`, and the run continues. A
    /// vehicle present on two roads at once can't arise under this
    /// representation: `Vehicle::road` holds a single `Option<RoadIndex>`.
    State(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config(msg) => write!(f, "config error: {msg}"),
            SimError::Topology(msg) => write!(f, "topology error: {msg}"),
            SimError::State(msg) => write!(f, "state error: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Config(format!("I/O error: {e}"))
    }
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Config(format!("JSON error: {e}"))
    }
}
