//! Explicitly owned simulation instances, addressed by id.
//!
//! Each instance owns all of its state and random generator; nothing is shared
//! between instances.

use std::collections::HashMap;
use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};
use viral_abm_common::{SimParams, Snapshot};

use crate::error::{Result, SimError};
use crate::simulation::ViralSimulation;

/// Identifier handed out by [`SimulationRegistry::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimulationId(pub u64);

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct SimulationRegistry {
    next_id: u64,
    simulations: HashMap<SimulationId, ViralSimulation>,
}

impl SimulationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a simulation and returns its id with the initial snapshot at time 0.
    pub fn create(&mut self, params: SimParams) -> Result<(SimulationId, Snapshot)> {
        let sim = ViralSimulation::new(params)?;
        let snapshot = sim.snapshot(0.0);
        let id = self.insert(sim);
        Ok((id, snapshot))
    }

    /// Takes ownership of an already built simulation.
    pub fn insert(&mut self, sim: ViralSimulation) -> SimulationId {
        let id = SimulationId(self.next_id);
        self.next_id += 1;
        info!("Registered simulation {} ({} active cells).", id, sim.num_active_cells());
        self.simulations.insert(id, sim);
        id
    }

    /// Advances simulation `id` to `target_time`. See [`ViralSimulation::advance_to`].
    pub fn advance_to(&mut self, id: SimulationId, target_time: f64) -> Result<Snapshot> {
        let sim = self.simulations.get_mut(&id).ok_or(SimError::NoInstance(id))?;
        Ok(sim.advance_to(target_time))
    }

    /// Current state of simulation `id`, labelled with its clock.
    pub fn snapshot(&self, id: SimulationId) -> Result<Snapshot> {
        let sim = self.get(id).ok_or(SimError::NoInstance(id))?;
        Ok(sim.snapshot(sim.clock()))
    }

    pub fn get(&self, id: SimulationId) -> Option<&ViralSimulation> {
        self.simulations.get(&id)
    }

    pub fn remove(&mut self, id: SimulationId) -> Result<ViralSimulation> {
        self.simulations.remove(&id).ok_or(SimError::NoInstance(id))
    }

    pub fn len(&self) -> usize {
        self.simulations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.simulations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_returns_initial_snapshot() {
        let mut registry = SimulationRegistry::new();
        let (id, snapshot) = registry.create(SimParams { layers: 3, ..Default::default() }).unwrap();
        assert_eq!(snapshot.time, 0.0);
        assert_eq!(snapshot.counts.total(), 19);
        assert_eq!(snapshot.counts.eclipse, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(id).map(|s| s.current_time_step()), Some(0));
    }

    #[test]
    fn test_ids_are_unique_and_instances_independent() {
        let mut registry = SimulationRegistry::new();
        let (a, _) = registry.create(SimParams { layers: 2, ..Default::default() }).unwrap();
        let (b, _) = registry.create(SimParams { layers: 4, ..Default::default() }).unwrap();
        assert_ne!(a, b);

        registry.advance_to(a, 1.0).unwrap();
        assert_eq!(registry.get(a).map(|s| s.current_time_step()), Some(200));
        assert_eq!(registry.get(b).map(|s| s.current_time_step()), Some(0));
        assert_eq!(registry.snapshot(b).unwrap().counts.total(), 37);
    }

    #[test]
    fn test_unknown_id_is_reported() {
        let mut registry = SimulationRegistry::new();
        let missing = SimulationId(42);
        assert_eq!(registry.advance_to(missing, 1.0), Err(SimError::NoInstance(missing)));
        assert!(registry.snapshot(missing).is_err());
        assert!(registry.remove(missing).is_err());
    }

    #[test]
    fn test_removed_instance_cannot_advance() {
        let mut registry = SimulationRegistry::new();
        let (id, _) = registry.create(SimParams { layers: 2, ..Default::default() }).unwrap();
        assert!(registry.remove(id).is_ok());
        assert!(registry.is_empty());
        assert_eq!(registry.advance_to(id, 1.0), Err(SimError::NoInstance(id)));
    }

    #[test]
    fn test_invalid_params_do_not_register() {
        let mut registry = SimulationRegistry::new();
        let result = registry.create(SimParams { layers: 0, ..Default::default() });
        assert!(matches!(result, Err(SimError::InvalidParameter { name: "layers", .. })));
        assert!(registry.is_empty());
    }
}
