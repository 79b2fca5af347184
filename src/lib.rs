//! Stochastic compartmental automaton for intracellular viral spread on a hexagonal
//! monolayer of cells.
//!
//! Cells move through HEALTHY -> ECLIPSE -> INFECTED -> DEAD, with an optional
//! INFECTED -> FUSED branch when two adjacent infected cells merge. Stage durations
//! are gamma distributed; every timestep reads a consistent snapshot of the previous
//! state.

pub mod batch;
pub mod error;
pub mod grid;
pub mod lattice_state;
pub mod registry;
pub mod sampler;
pub mod simulation;

pub use error::{Result, SimError};
pub use grid::{GridPos, HexLattice};
pub use lattice_state::CellTimers;
pub use registry::{SimulationId, SimulationRegistry};
pub use simulation::{StepReport, ViralSimulation};
pub use viral_abm_common::{Compartment, CompartmentCounts, LatticeShape, SimParams, SimulationConfig, Snapshot};
