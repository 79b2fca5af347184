pub mod config;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, LatticeConfig, KineticsConfig, InitialConditions, TimingConfig, OutputConfig, LatticeShape};
pub use sim_params::{SimParams, FUSED_MEAN_SCALE};
pub use snapshot::{Compartment, CompartmentCounts, Snapshot};
