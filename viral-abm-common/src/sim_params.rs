use serde::{Deserialize, Serialize};

use crate::config::LatticeShape;

/// Fusion re-samples the infectious stage with its mean stretched by this factor.
pub const FUSED_MEAN_SCALE: f64 = 1.5;

/// Simulation parameters derived from the configuration, used frequently during simulation steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    // Lattice
    pub layers: u32, // Number of hexagonal rings, including the center cell
    pub lattice_shape: LatticeShape,

    // Rates (per hour)
    pub probi: f64,       // Infection rate for a healthy cell with an infected neighbor
    pub fusion_prob: f64, // Fusion rate for an infected cell with an infected neighbor

    // Time
    pub timestep: f64,
    pub end_time: f64,

    // Stage durations: gamma(shape, mean / shape)
    pub tau_e: f64, // Mean eclipse duration
    pub tau_i: f64, // Mean infectious duration
    pub ne: f64,    // Eclipse shape (number of sub-stages)
    pub ni: f64,    // Infectious shape

    // Initial conditions
    pub initial_infected: u32,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            layers: 10,
            lattice_shape: LatticeShape::Hexagon,
            probi: 0.2,
            fusion_prob: 0.05,
            timestep: 0.005,
            end_time: 48.0,
            tau_e: 6.0,
            tau_i: 12.0,
            ne: 30.0,
            ni: 100.0,
            initial_infected: 1,
        }
    }
}

impl SimParams {
    /// Side length of the square index space holding the lattice.
    pub fn grid_size(&self) -> usize {
        (2 * self.layers as usize).saturating_sub(1)
    }

    /// Probability that an exposed healthy cell becomes infected within one timestep.
    pub fn infection_prob_per_dt(&self) -> f64 {
        self.probi * self.timestep
    }

    /// Probability that an infected cell with a free infected neighbor fuses within one timestep.
    pub fn fusion_prob_per_dt(&self) -> f64 {
        self.fusion_prob * self.timestep
    }

    pub fn fused_tau_i(&self) -> f64 {
        self.tau_i * FUSED_MEAN_SCALE
    }
}
