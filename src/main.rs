use anyhow::Result;
use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use log::{info, error, debug};

use viral_abm::batch::{run_replicates, Trajectory};
use viral_abm::SimulationConfig;

/// Runs the viral spread automaton to its end time and saves the recorded snapshots.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the number of independent replicates
    #[arg(short, long)]
    replicates: Option<u32>,

    /// Override the snapshot output format (json, bincode, messagepack)
    #[arg(short, long)]
    format: Option<String>,

    /// Override the simulated end time (hours)
    #[arg(short, long)]
    end_time: Option<f64>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Viral ABM...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(replicates) = args.replicates {
        if replicates == 0 {
            anyhow::bail!("--replicates must be greater than 0.");
        }
        config.output.replicates = replicates;
    }
    if let Some(format) = args.format {
        config.output.format = Some(format);
    }
    if let Some(end_time) = args.end_time {
        config.timing.end_time = end_time;
    }
    let params = config.get_sim_params();
    debug!("Configuration: {:#?}", config);

    // --- Run ---
    let start_time = Instant::now();
    let trajectories = run_replicates(&params, config.output.replicates, config.timing.record_interval)?;
    let total_duration = start_time.elapsed();
    info!(
        "Simulation finished in {:.3} seconds ({} replicate(s), {} steps each).",
        total_duration.as_secs_f64(),
        config.output.replicates,
        (params.end_time / params.timestep).floor()
    );

    // --- Save Recorded Data ---
    info!("Saving recorded data...");
    if config.output.save_snapshots {
        let output_format = config.output.format.as_deref().unwrap_or("json");
        for trajectory in &trajectories {
            save_snapshots(&config.output.base_filename, output_format, trajectory);
        }
    } else {
        info!("Skipping saving snapshots as per config (save_snapshots is false).");
    }

    if config.output.save_counts {
        let filename = format!("{}_counts.csv", config.output.base_filename);
        match write_counts_csv(&filename, &trajectories) {
            Ok(()) => info!("Compartment counts saved to {}", filename),
            Err(e) => error!("Error saving CSV file '{}': {}", filename, e),
        }
    } else {
        info!("Skipping saving compartment counts as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

/// Writes one replicate's snapshots in the requested format; failures are logged, not fatal.
fn save_snapshots(base_filename: &str, output_format: &str, trajectory: &Trajectory) {
    let stem = format!("{}_rep{}_snapshots", base_filename, trajectory.replicate);
    let snapshots = &trajectory.snapshots;

    match output_format {
        "bincode" => {
            // Binary format (much more compact)
            let filename = format!("{}.bin", stem);
            match File::create(&filename) {
                Ok(file) => match bincode::serialize_into(file, snapshots) {
                    Ok(_) => info!("Snapshots saved to {} (binary format)", filename),
                    Err(e) => error!("Error serializing snapshots to bincode: {}", e),
                },
                Err(e) => error!("Error creating snapshot file '{}': {}", filename, e),
            }
        }
        "messagepack" => {
            // MessagePack format (compact and cross-platform)
            let filename = format!("{}.msgpack", stem);
            match &mut File::create(&filename) {
                Ok(file) => match rmp_serde::encode::write(file, snapshots) {
                    Ok(_) => info!("Snapshots saved to {} (MessagePack format)", filename),
                    Err(e) => error!("Error serializing snapshots to MessagePack: {}", e),
                },
                Err(e) => error!("Error creating snapshot file '{}': {}", filename, e),
            }
        }
        other => {
            if other != "json" {
                error!("Unknown output format: {}. Using JSON instead.", other);
            }
            let filename = format!("{}.json", stem);
            match File::create(&filename) {
                Ok(mut file) => match serde_json::to_string(snapshots) {
                    Ok(json_string) => {
                        if let Err(e) = file.write_all(json_string.as_bytes()) {
                            error!("Error writing snapshot JSON to file '{}': {}", filename, e);
                        } else {
                            info!("Snapshots saved to {} ({}KB)", filename, json_string.len() / 1024);
                        }
                    }
                    Err(e) => error!("Error serializing snapshots to JSON: {}", e),
                },
                Err(e) => error!("Error creating snapshot file '{}': {}", filename, e),
            }
        }
    }
}

/// One row per recorded snapshot: `replicate,time,h,e,i,d,f`.
fn write_counts_csv(filename: &str, trajectories: &[Trajectory]) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename)?;
    writer.write_record(["replicate", "time", "h", "e", "i", "d", "f"])?;
    for trajectory in trajectories {
        for snapshot in &trajectory.snapshots {
            let c = &snapshot.counts;
            writer.write_record(&[
                trajectory.replicate.to_string(),
                format!("{:.4}", snapshot.time),
                c.healthy.to_string(),
                c.eclipse.to_string(),
                c.infected.to_string(),
                c.dead.to_string(),
                c.fused.to_string(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}
