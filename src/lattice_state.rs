use viral_abm_common::{Compartment, CompartmentCounts};

use crate::grid::HexLattice;

/// A cell's stage timers and the deadlines they imply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellTimers {
    /// Absolute time the cell left HEALTHY (time it spent healthy before that).
    pub exposure_clock: f64,
    pub eclipse_duration: f64,
    pub infectious_duration: f64,
}

impl CellTimers {
    /// Time after which an ECLIPSE cell becomes INFECTED.
    pub fn eclipse_deadline(&self) -> f64 {
        self.exposure_clock + self.eclipse_duration
    }

    /// Time after which an INFECTED or FUSED cell dies.
    pub fn death_deadline(&self) -> f64 {
        self.exposure_clock + self.eclipse_duration + self.infectious_duration
    }
}

/// Holds the per-cell state vectors, indexed by flat lattice position.
///
/// Every step reads the `_in` buffers and writes the `_out` buffers, which start
/// the step as a copy of `_in` and are swapped in once all phases have run.
#[derive(Debug)]
pub struct LatticeState {
    // --- Ping-Pong Buffers ---
    // Compartments (current step's input)
    pub compartments_in: Vec<Compartment>,
    pub eclipse_durations_in: Vec<f64>,
    pub infectious_durations_in: Vec<f64>,
    /// Accumulated healthy time; frozen once the cell is exposed.
    pub exposure_clocks_in: Vec<f64>,

    // (next step's input, current step's output)
    pub compartments_out: Vec<Compartment>,
    pub eclipse_durations_out: Vec<f64>,
    pub infectious_durations_out: Vec<f64>,
    pub exposure_clocks_out: Vec<f64>,
}

impl LatticeState {
    /// Allocates state for `lattice`: active positions HEALTHY, the rest EMPTY, timers zeroed.
    pub fn new(lattice: &HexLattice) -> Self {
        let len = lattice.len();
        let compartments: Vec<Compartment> = (0..len)
            .map(|idx| if lattice.is_active(idx) { Compartment::Healthy } else { Compartment::Empty })
            .collect();

        Self {
            compartments_in: compartments.clone(),
            eclipse_durations_in: vec![0.0; len],
            infectious_durations_in: vec![0.0; len],
            exposure_clocks_in: vec![0.0; len],

            compartments_out: compartments,
            eclipse_durations_out: vec![0.0; len],
            infectious_durations_out: vec![0.0; len],
            exposure_clocks_out: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.compartments_in.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments_in.is_empty()
    }

    /// Current (pre-step) compartment at `idx`.
    #[inline(always)]
    pub fn compartment(&self, idx: usize) -> Compartment {
        self.compartments_in[idx]
    }

    /// Current (pre-step) timers at `idx`.
    #[inline(always)]
    pub fn timers(&self, idx: usize) -> CellTimers {
        CellTimers {
            exposure_clock: self.exposure_clocks_in[idx],
            eclipse_duration: self.eclipse_durations_in[idx],
            infectious_duration: self.infectious_durations_in[idx],
        }
    }

    /// Seeds the output buffers with the current state so phases only write what changes.
    pub fn begin_step(&mut self) {
        self.compartments_out.copy_from_slice(&self.compartments_in);
        self.eclipse_durations_out.copy_from_slice(&self.eclipse_durations_in);
        self.infectious_durations_out.copy_from_slice(&self.infectious_durations_in);
        self.exposure_clocks_out.copy_from_slice(&self.exposure_clocks_in);
    }

    /// Swaps the input and output buffers.
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.compartments_in, &mut self.compartments_out);
        std::mem::swap(&mut self.eclipse_durations_in, &mut self.eclipse_durations_out);
        std::mem::swap(&mut self.infectious_durations_in, &mut self.infectious_durations_out);
        std::mem::swap(&mut self.exposure_clocks_in, &mut self.exposure_clocks_out);
    }

    /// Flat indices currently in `compartment`, in row-major order.
    pub fn indices_in(&self, compartment: Compartment) -> Vec<usize> {
        self.compartments_in
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == compartment)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn counts(&self) -> CompartmentCounts {
        CompartmentCounts::tally(self.compartments_in.iter())
    }

    /// Copies the current compartments into rows of `size` cells.
    pub fn grid_rows(&self, size: usize) -> Vec<Vec<Compartment>> {
        if size == 0 {
            return Vec::new();
        }
        self.compartments_in.chunks(size).map(|row| row.to_vec()).collect()
    }
}
