use crate::error::{Result, SimError};
use crate::grid::{GridPos, HexLattice};
use crate::lattice_state::{CellTimers, LatticeState};
use crate::sampler::StageSamplers;
use log::{info, warn, debug, trace};
use rand::prelude::*;
use viral_abm_common::{Compartment, CompartmentCounts, SimParams, Snapshot};

/// Absorbs floating-point error when converting a requested time into a step count,
/// so that e.g. `0.3 / 0.1` lands on step 3 rather than the 2 a bare IEEE floor gives.
const STEP_EPSILON: f64 = 1e-9;

/// Transitions applied during one timestep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// HEALTHY -> ECLIPSE
    pub exposed: u32,
    /// ECLIPSE -> INFECTED
    pub became_infected: u32,
    /// INFECTED or FUSED -> DEAD
    pub died: u32,
    /// Flat indices of each pair fused this step.
    pub fused_pairs: Vec<(usize, usize)>,
}

/// Owns one lattice and advances it through the compartmental automaton.
#[derive(Debug)]
pub struct ViralSimulation {
    params: SimParams,
    lattice: HexLattice,
    state: LatticeState,
    samplers: StageSamplers,
    rng: StdRng,
    /// Number of timesteps applied so far; the clock is this times `timestep`.
    current_time_step: u64,
}

impl ViralSimulation {
    /// Creates a new simulation: builds the lattice, draws base durations for every
    /// active cell and seeds the initial infections.
    pub fn new(params: SimParams) -> Result<Self> {
        Self::with_rng(params, StdRng::from_os_rng())
    }

    /// Like [`ViralSimulation::new`] but draws from the given generator.
    pub fn with_rng(params: SimParams, rng: StdRng) -> Result<Self> {
        validate_params(&params)?;
        let samplers = StageSamplers::from_params(&params)?;
        let lattice = HexLattice::new(params.layers, params.lattice_shape);
        let state = LatticeState::new(&lattice);

        let mut sim = Self {
            params,
            lattice,
            state,
            samplers,
            rng,
            current_time_step: 0,
        };
        sim.initialize_timers();
        let seeded = sim.seed_initial_infections();

        info!(
            "Initialized lattice with {} layers: {} active cells, {} seeded into eclipse.",
            sim.params.layers,
            sim.lattice.num_active(),
            seeded
        );
        debug!("Simulation Parameters: {:#?}", sim.params);
        Ok(sim)
    }

    /// Draws eclipse and infectious durations for every active cell up front.
    fn initialize_timers(&mut self) {
        for &idx in self.lattice.active_indices() {
            self.state.eclipse_durations_in[idx] = self.samplers.eclipse.sample(&mut self.rng);
            self.state.infectious_durations_in[idx] = self.samplers.infectious.sample(&mut self.rng);
        }
    }

    /// Moves `initial_infected` distinct healthy cells straight into ECLIPSE at time 0.
    fn seed_initial_infections(&mut self) -> usize {
        let healthy = self.state.indices_in(Compartment::Healthy);
        let requested = self.params.initial_infected as usize;
        if requested > healthy.len() {
            warn!(
                "Requested {} initial infections but only {} cells exist. Seeding all of them.",
                requested,
                healthy.len()
            );
        }
        let amount = requested.min(healthy.len());

        for pick in rand::seq::index::sample(&mut self.rng, healthy.len(), amount) {
            let idx = healthy[pick];
            self.state.compartments_in[idx] = Compartment::Eclipse;
            self.state.exposure_clocks_in[idx] = 0.0;
            self.state.eclipse_durations_in[idx] = self.samplers.eclipse.sample(&mut self.rng);
        }
        amount
    }

    /// Advances the simulation by one timestep.
    ///
    /// Every phase reads the state as it was before the step; writes only become
    /// visible once the buffers are swapped at the end.
    pub fn step(&mut self) -> StepReport {
        let clock = self.clock();
        self.state.begin_step();

        let exposed = self.expose_healthy_cells();
        let became_infected = self.progress_eclipse_cells(clock);
        let killed = self.kill_expired(Compartment::Infected, clock);
        let (fused_pairs, revoked) = self.fuse_infected_pairs();
        let died = killed - revoked + self.kill_expired(Compartment::Fused, clock);
        let report = StepReport { exposed, became_infected, died, fused_pairs };

        self.state.swap_buffers();
        self.current_time_step += 1;

        trace!(
            "Step {} (t={:.4}): exposed={} infected={} died={} fused_pairs={}",
            self.current_time_step,
            self.clock(),
            report.exposed,
            report.became_infected,
            report.died,
            report.fused_pairs.len()
        );
        report
    }

    /// Healthy cells accumulate time; those with an infected neighbor are exposed with
    /// probability `probi * dt`. The rate does not scale with the number of infected neighbors.
    fn expose_healthy_cells(&mut self) -> u32 {
        let dt = self.params.timestep;
        let p_infect = self.params.infection_prob_per_dt();
        let mut exposed = 0;

        for &idx in self.lattice.active_indices() {
            if self.state.compartments_in[idx] != Compartment::Healthy {
                continue;
            }
            self.state.exposure_clocks_out[idx] = self.state.exposure_clocks_in[idx] + dt;

            if self.rng.random::<f64>() < p_infect
                && has_neighbor_in(&self.lattice, &self.state.compartments_in, idx, Compartment::Infected)
            {
                self.state.compartments_out[idx] = Compartment::Eclipse;
                self.state.eclipse_durations_out[idx] = self.samplers.eclipse.sample(&mut self.rng);
                exposed += 1;
            }
        }
        exposed
    }

    /// Eclipse cells past their eclipse deadline become infected with a fresh infectious duration.
    fn progress_eclipse_cells(&mut self, clock: f64) -> u32 {
        let mut progressed = 0;
        for &idx in self.lattice.active_indices() {
            if self.state.compartments_in[idx] != Compartment::Eclipse {
                continue;
            }
            if clock > self.state.timers(idx).eclipse_deadline() {
                self.state.compartments_out[idx] = Compartment::Infected;
                self.state.infectious_durations_out[idx] = self.samplers.infectious.sample(&mut self.rng);
                progressed += 1;
            }
        }
        progressed
    }

    /// Cells in `compartment` past their death deadline die.
    fn kill_expired(&mut self, compartment: Compartment, clock: f64) -> u32 {
        let mut died = 0;
        for &idx in self.lattice.active_indices() {
            if self.state.compartments_in[idx] != compartment {
                continue;
            }
            if clock > self.state.timers(idx).death_deadline() {
                self.state.compartments_out[idx] = Compartment::Dead;
                died += 1;
            }
        }
        died
    }

    /// Pairs up adjacent infected cells.
    ///
    /// Infected cells are visited in random order; a cell already claimed this step is
    /// skipped. With probability `fusion_prob * dt` a cell fuses with a uniformly chosen
    /// unclaimed infected neighbor. Both cells share one infectious duration drawn with
    /// the scaled mean and keep their own exposure clock and eclipse duration.
    ///
    /// A cell killed earlier in the same step can still be claimed, in which case FUSED
    /// replaces DEAD. Returns the pairs and the number of death writes replaced this way.
    fn fuse_infected_pairs(&mut self) -> (Vec<(usize, usize)>, u32) {
        let p_fusion = self.params.fusion_prob_per_dt();
        let mut infected = self.state.indices_in(Compartment::Infected);
        infected.shuffle(&mut self.rng);

        let mut claimed = vec![false; self.state.len()];
        let mut pairs = Vec::new();
        let mut revoked = 0;
        let mut candidates: Vec<usize> = Vec::with_capacity(6);

        for idx in infected {
            if claimed[idx] {
                continue;
            }
            candidates.clear();
            self.lattice.for_each_neighbor(idx, |n| {
                if self.state.compartments_in[n] == Compartment::Infected && !claimed[n] {
                    candidates.push(n);
                }
                true
            });
            if candidates.is_empty() || self.rng.random::<f64>() >= p_fusion {
                continue;
            }
            let Some(&partner) = candidates.choose(&mut self.rng) else {
                continue;
            };

            let shared_duration = self.samplers.fused.sample(&mut self.rng);
            for cell in [idx, partner] {
                if self.state.compartments_out[cell] == Compartment::Dead {
                    revoked += 1;
                }
                self.state.compartments_out[cell] = Compartment::Fused;
                self.state.infectious_durations_out[cell] = shared_duration;
                claimed[cell] = true;
            }
            pairs.push((idx, partner));
        }
        (pairs, revoked)
    }

    /// Applies as many timesteps as needed to reach `target_time` and reports the state.
    ///
    /// Time never moves backwards: a target at or before the current clock performs no
    /// work. The snapshot is labelled with `target_time` as requested, not the quantized clock.
    pub fn advance_to(&mut self, target_time: f64) -> Snapshot {
        let target_step = self.step_count_for(target_time);
        let start_step = self.current_time_step;

        if target_step > start_step {
            for _ in start_step..target_step {
                self.step();
            }
            let counts = self.counts();
            debug!(
                "Advanced {} steps to t={:.4} (requested {}): h={} e={} i={} f={} d={}",
                target_step - start_step,
                self.clock(),
                target_time,
                counts.healthy,
                counts.eclipse,
                counts.infected,
                counts.fused,
                counts.dead
            );
        } else {
            debug!(
                "Requested t={} is not ahead of step {} (t={:.4}); nothing to do.",
                target_time,
                start_step,
                self.clock()
            );
        }
        self.snapshot(target_time)
    }

    /// Number of whole timesteps that fit in `time`.
    ///
    /// This is `floor(time / dt)` with [`STEP_EPSILON`] added before flooring, so it
    /// intentionally differs from the plain IEEE floor when the quotient lands just
    /// below an integer (`0.3 / 0.1 == 2.9999999999999996` counts as 3 steps).
    fn step_count_for(&self, time: f64) -> u64 {
        if !time.is_finite() {
            warn!("Ignoring non-finite target time {}.", time);
            return self.current_time_step;
        }
        if time <= 0.0 {
            return 0;
        }
        (time / self.params.timestep + STEP_EPSILON).floor() as u64
    }

    /// Full lattice state and compartment counts, labelled with `label_time`.
    pub fn snapshot(&self, label_time: f64) -> Snapshot {
        Snapshot {
            time: label_time,
            grid: self.state.grid_rows(self.lattice.size()),
            counts: self.counts(),
        }
    }

    pub fn counts(&self) -> CompartmentCounts {
        self.state.counts()
    }

    /// Global simulation time.
    pub fn clock(&self) -> f64 {
        self.current_time_step as f64 * self.params.timestep
    }

    pub fn current_time_step(&self) -> u64 {
        self.current_time_step
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn lattice(&self) -> &HexLattice {
        &self.lattice
    }

    pub fn num_active_cells(&self) -> usize {
        self.lattice.num_active()
    }

    /// Compartment at `pos`; `None` outside the index space.
    pub fn compartment_at(&self, pos: GridPos) -> Option<Compartment> {
        self.lattice.index_of(pos).map(|idx| self.state.compartment(idx))
    }

    /// Stage timers at `pos`; `None` for inactive positions.
    pub fn cell_timers(&self, pos: GridPos) -> Option<CellTimers> {
        self.lattice
            .index_of(pos)
            .filter(|&idx| self.lattice.is_active(idx))
            .map(|idx| self.state.timers(idx))
    }
}

#[inline(always)]
fn has_neighbor_in(lattice: &HexLattice, compartments: &[Compartment], idx: usize, wanted: Compartment) -> bool {
    lattice.find_first_neighbor(idx, |n| compartments[n] == wanted).is_some()
}

/// Rejects parameters that would leave the lattice or the samplers undefined.
fn validate_params(params: &SimParams) -> Result<()> {
    if params.layers == 0 {
        return Err(SimError::invalid("layers", "must be at least 1"));
    }
    require_positive("timestep", params.timestep)?;
    require_positive("tau_e", params.tau_e)?;
    require_positive("tau_i", params.tau_i)?;
    require_positive("ne", params.ne)?;
    require_positive("ni", params.ni)?;
    require_non_negative("probi", params.probi)?;
    require_non_negative("fusion_prob", params.fusion_prob)?;
    require_non_negative("end_time", params.end_time)?;

    if params.infection_prob_per_dt() > 1.0 {
        warn!(
            "probi * timestep = {:.3} exceeds 1; exposure is certain whenever an infected neighbor exists.",
            params.infection_prob_per_dt()
        );
    }
    if params.fusion_prob_per_dt() > 1.0 {
        warn!(
            "fusion_prob * timestep = {:.3} exceeds 1; fusion is certain whenever a partner exists.",
            params.fusion_prob_per_dt()
        );
    }
    Ok(())
}

fn require_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(name, format!("must be positive and finite, got {}", value)))
    }
}

fn require_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(name, format!("must be non-negative and finite, got {}", value)))
    }
}
