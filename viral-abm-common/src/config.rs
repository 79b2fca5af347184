use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::SimParams;
use std::path::Path;

/// How active positions are carved out of the square index space.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LatticeShape {
    /// Axial hex distance from the center is at most `layers - 1`.
    Hexagon,
    /// Euclidean index distance from the center is at most `layers - 1`.
    Disk,
}

// Configuration for the lattice
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LatticeConfig {
    #[serde(default = "default_layers")]
    pub layers: u32,
    #[serde(default = "default_shape")]
    pub shape: LatticeShape,
}

// Kinetic parameters for infection, fusion and stage durations
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct KineticsConfig {
    #[serde(default = "default_probi")]
    pub probi: f64,
    #[serde(default = "default_fusion_prob")]
    pub fusion_prob: f64,
    #[serde(default = "default_tau_e")]
    pub tau_e: f64,
    #[serde(default = "default_tau_i")]
    pub tau_i: f64,
    #[serde(default = "default_ne")]
    pub ne: f64,
    #[serde(default = "default_ni")]
    pub ni: f64,
}

// Initial conditions for the simulation, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InitialConditions {
    #[serde(default = "default_initial_infected")]
    pub initial_infected: u32,
}

// Configuration for timing (hours)
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_timestep")]
    pub timestep: f64,
    #[serde(default = "default_end_time")]
    pub end_time: f64,
    #[serde(default = "default_record_interval")]
    pub record_interval: f64,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_snapshots: bool,
    #[serde(default = "default_true")]
    pub save_counts: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
    #[serde(default = "default_replicates")]
    pub replicates: u32,
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub lattice: LatticeConfig,
    #[serde(default)]
    pub kinetics: KineticsConfig,
    #[serde(default)]
    pub initial_conditions: InitialConditions,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        LatticeConfig { layers: default_layers(), shape: default_shape() }
    }
}

impl Default for KineticsConfig {
    fn default() -> Self {
        KineticsConfig {
            probi: default_probi(),
            fusion_prob: default_fusion_prob(),
            tau_e: default_tau_e(),
            tau_i: default_tau_i(),
            ne: default_ne(),
            ni: default_ni(),
        }
    }
}

impl Default for InitialConditions {
    fn default() -> Self {
        InitialConditions { initial_infected: default_initial_infected() }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            timestep: default_timestep(),
            end_time: default_end_time(),
            record_interval: default_record_interval(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            save_snapshots: true,
            save_counts: true,
            format: None,
            replicates: default_replicates(),
        }
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML from '{}': {}", path_ref.display(), e))?;

        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)?;

        // Kinetic parameters are checked again when the simulation is built.
        if config.lattice.layers == 0 {
            anyhow::bail!("layers must be greater than 0.");
        }
        let interval = config.timing.record_interval;
        if !(interval.is_finite() && interval > 0.0) {
            anyhow::bail!("record_interval must be positive.");
        }
        if config.output.replicates == 0 {
            anyhow::bail!("replicates must be greater than 0.");
        }

        Ok(config)
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        SimParams {
            layers: self.lattice.layers,
            lattice_shape: self.lattice.shape,
            probi: self.kinetics.probi,
            fusion_prob: self.kinetics.fusion_prob,
            timestep: self.timing.timestep,
            end_time: self.timing.end_time,
            tau_e: self.kinetics.tau_e,
            tau_i: self.kinetics.tau_i,
            ne: self.kinetics.ne,
            ni: self.kinetics.ni,
            initial_infected: self.initial_conditions.initial_infected,
        }
    }
}

fn default_layers() -> u32 {
    10
}

fn default_shape() -> LatticeShape {
    LatticeShape::Hexagon
}

fn default_probi() -> f64 {
    0.2
}

fn default_fusion_prob() -> f64 {
    0.05
}

fn default_tau_e() -> f64 {
    6.0 // Hours spent infected but not yet producing virus
}

fn default_tau_i() -> f64 {
    12.0
}

fn default_ne() -> f64 {
    30.0
}

fn default_ni() -> f64 {
    100.0
}

fn default_initial_infected() -> u32 {
    1
}

fn default_timestep() -> f64 {
    0.005
}

fn default_end_time() -> f64 {
    48.0
}

fn default_record_interval() -> f64 {
    1.0
}

fn default_base_filename() -> String {
    "viral_abm".to_string()
}

fn default_true() -> bool {
    true
}

fn default_replicates() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config.get_sim_params(), SimParams::default());
        assert_eq!(config.timing.record_interval, 1.0);
        assert_eq!(config.output.replicates, 1);
        assert!(config.output.format.is_none());
    }

    #[test]
    fn test_partial_config_overrides() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [lattice]
            layers = 3
            shape = "disk"

            [kinetics]
            probi = 1.5

            [timing]
            timestep = 0.1

            [output]
            format = "bincode"
            replicates = 4
            "#,
        )
        .unwrap();
        let params = config.get_sim_params();
        assert_eq!(params.layers, 3);
        assert_eq!(params.lattice_shape, LatticeShape::Disk);
        assert_eq!(params.probi, 1.5);
        assert_eq!(params.fusion_prob, 0.05);
        assert_eq!(params.timestep, 0.1);
        assert_eq!(config.output.format.as_deref(), Some("bincode"));
        assert_eq!(config.output.replicates, 4);
    }

    #[test]
    fn test_rejects_zero_layers() {
        let result = SimulationConfig::from_toml_str("[lattice]\nlayers = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_shape() {
        let result = SimulationConfig::from_toml_str("[lattice]\nshape = \"square\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = SimulationConfig::load("does/not/exist.toml").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.toml"));
    }
}
