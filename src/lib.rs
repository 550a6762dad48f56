pub mod arena;
pub mod error;
pub mod history;
pub mod ids;
pub mod junction;
pub mod kinematics;
pub mod output;
pub mod road;
pub mod scenario;
pub mod shape;
pub mod simulator;
pub mod traffic_light;
pub mod vehicle;
pub mod world;

pub use error::SimError;
pub use world::World;
