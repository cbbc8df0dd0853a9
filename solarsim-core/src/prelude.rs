//! Convenient re-exports of the most commonly used items.

pub use crate::dataset::{generate, generate_to_csv, write_csv, DatasetConfig, SampleRecord};
pub use crate::environment::Environment;
pub use crate::optimize::{optimize, OptimizationResult, OptimizeParams, SpeedBounds};
pub use crate::params::PhysicalProperties;
pub use crate::simulate::{simulate, SimulationResult, TripSpec};
pub use crate::traits::SerdeAPI;
pub use crate::vehicle::SolarVehicle;
