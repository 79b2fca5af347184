//! Runs independent replicates to a fixed end time, recording snapshots on a regular cadence.

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use viral_abm_common::{SimParams, Snapshot};

use crate::error::Result;
use crate::simulation::ViralSimulation;

/// Snapshots recorded for one replicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub replicate: u32,
    pub snapshots: Vec<Snapshot>,
}

/// Times at which snapshots are recorded: `0, interval, 2*interval, ...` up to `end_time`,
/// with `end_time` itself appended when it does not fall on the cadence.
pub fn record_times(end_time: f64, record_interval: f64) -> Vec<f64> {
    if !(end_time.is_finite() && end_time > 0.0 && record_interval > 0.0) {
        return vec![0.0];
    }
    let count = (end_time / record_interval + 1e-9).floor() as u64;
    let mut times: Vec<f64> = (0..=count).map(|k| k as f64 * record_interval).collect();
    if let Some(&last) = times.last() {
        if end_time - last > 1e-9 {
            times.push(end_time);
        }
    }
    times
}

/// Advances `sim` through every recording time, collecting a snapshot at each.
pub fn record_trajectory(sim: &mut ViralSimulation, end_time: f64, record_interval: f64) -> Vec<Snapshot> {
    record_times(end_time, record_interval)
        .into_iter()
        .map(|t| sim.advance_to(t))
        .collect()
}

/// Runs `replicates` independent simulations in parallel.
pub fn run_replicates(params: &SimParams, replicates: u32, record_interval: f64) -> Result<Vec<Trajectory>> {
    info!(
        "Running {} replicate(s) to t={} on {} Rayon threads.",
        replicates,
        params.end_time,
        rayon::current_num_threads()
    );
    (0..replicates)
        .into_par_iter()
        .map(|replicate| {
            let mut sim = ViralSimulation::new(params.clone())?;
            let snapshots = record_trajectory(&mut sim, params.end_time, record_interval);
            if let Some(last) = snapshots.last() {
                info!(
                    "Replicate {} finished at t={}: h={} e={} i={} f={} d={}",
                    replicate,
                    last.time,
                    last.counts.healthy,
                    last.counts.eclipse,
                    last.counts.infected,
                    last.counts.fused,
                    last.counts.dead
                );
            }
            Ok(Trajectory { replicate, snapshots })
        })
        .collect()
}
