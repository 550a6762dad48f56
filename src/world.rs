//! The single owner of all simulation state (spec §9 binding guidance):
//! roads, junctions and vehicles hold indices into each other rather than
//! direct references, so the kernel's free functions take `&mut World`
//! instead of fighting the borrow checker over cyclic graphs.

use crate::arena::Arena;
use crate::history::History;
use crate::junction::Junction;
use crate::road::Road;
use crate::vehicle::Vehicle;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub struct World {
    pub vehicles: Arena<Vehicle>,
    pub roads: Arena<Road>,
    pub junctions: Arena<Junction>,
    pub history: History,
    pub rng: StdRng,
    pub next_vehicle_id: u64,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self {
            vehicles: Arena::new(),
            roads: Arena::new(),
            junctions: Arena::new(),
            history: History::new(),
            rng: StdRng::seed_from_u64(seed),
            next_vehicle_id: 0,
        }
    }

    pub fn next_vehicle_id(&mut self) -> u64 {
        let id = self.next_vehicle_id;
        self.next_vehicle_id += 1;
        id
    }
}
