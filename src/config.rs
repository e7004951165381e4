//! Scenario configuration.
//!
//! One explicit `ScenarioConfig` struct holds every tunable of a run and is
//! passed by reference into the components that need it; there is no global
//! default registry. Defaults match the reference deployment (a 4x4 building
//! grid with three relays). A YAML file can replace any subset of the
//! defaults, and explicit command-line values override the file, so late
//! overrides always win.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::buildings::{GridError, GridSpec};

/// Complete configuration of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// RNG run index, for generating different deterministic drops
    pub run: u64,
    /// Reliable-link mode: acknowledged delivery when true
    pub rlc_acknowledged: bool,
    /// Number of relay nodes
    pub num_relays: u32,
    /// Link-layer transmit buffer size in megabytes
    pub rlc_buffer_mb: u32,
    /// Downlink inter-packet interval in microseconds
    pub inter_packet_interval_us: u64,
    /// Obstruction grid dimensions
    pub grid: GridSpec,
    /// Node antenna clearance above rooftops, in meters
    pub rooftop_clearance: f64,
    /// Delay before the end-user attachment pass fires, in microseconds
    pub attachment_delay_us: u64,
    /// Server application start time, in microseconds
    pub server_start_us: u64,
    /// Client application start time, in microseconds
    pub client_start_us: u64,
    /// Simulation stop time, in microseconds
    pub stop_us: u64,
    /// Downlink payload size in bytes
    pub packet_size: u32,
    /// Directory receiving the plot and registry files
    pub plot_dir: PathBuf,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            run: 0,
            rlc_acknowledged: true,
            num_relays: 3,
            rlc_buffer_mb: 1000,
            inter_packet_interval_us: 20_000,
            grid: GridSpec::default(),
            rooftop_clearance: crate::topology::ROOFTOP_CLEARANCE,
            attachment_delay_us: 300_000,
            server_start_us: 490_000,
            client_start_us: 500_000,
            stop_us: 1_200_000,
            packet_size: 1400,
            plot_dir: PathBuf::from("."),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("invalid timing: {0}")]
    InvalidTiming(String),
    #[error("invalid traffic configuration: {0}")]
    InvalidTraffic(String),
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl ScenarioConfig {
    /// Load defaults from a YAML file. Fields missing from the file keep
    /// their built-in default values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ScenarioConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration before any topology is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        if self.inter_packet_interval_us == 0 {
            return Err(ConfigError::InvalidTraffic(
                "inter-packet interval must be positive".to_string(),
            ));
        }
        if self.packet_size == 0 {
            return Err(ConfigError::InvalidTraffic("packet size must be positive".to_string()));
        }
        if self.client_start_us >= self.stop_us {
            return Err(ConfigError::InvalidTiming(format!(
                "client start ({} us) must precede the stop time ({} us)",
                self.client_start_us, self.stop_us
            )));
        }
        if self.attachment_delay_us >= self.stop_us {
            return Err(ConfigError::InvalidTiming(format!(
                "attachment delay ({} us) must fire before the stop time ({} us)",
                self.attachment_delay_us, self.stop_us
            )));
        }
        Ok(())
    }
}

/// Command-line values layered over the file/default configuration. `None`
/// means the flag was not given and the underlying value stays.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub run: Option<u64>,
    pub rlc_acknowledged: Option<bool>,
    pub num_relays: Option<u32>,
    pub rlc_buffer_mb: Option<u32>,
    pub inter_packet_interval_us: Option<u64>,
    pub plot_dir: Option<PathBuf>,
}

/// Resolve the effective configuration: built-in defaults, then the optional
/// file, then explicit command-line overrides.
pub fn resolve(overrides: &CliOverrides) -> Result<ScenarioConfig, ConfigError> {
    let mut config = match &overrides.config_file {
        Some(path) => {
            log::info!("loading configuration defaults from {}", path.display());
            ScenarioConfig::from_file(path)?
        }
        None => ScenarioConfig::default(),
    };

    if let Some(run) = overrides.run {
        config.run = run;
    }
    if let Some(am) = overrides.rlc_acknowledged {
        config.rlc_acknowledged = am;
    }
    if let Some(num_relays) = overrides.num_relays {
        config.num_relays = num_relays;
    }
    if let Some(rlc_buffer_mb) = overrides.rlc_buffer_mb {
        config.rlc_buffer_mb = rlc_buffer_mb;
    }
    if let Some(interval) = overrides.inter_packet_interval_us {
        config.inter_packet_interval_us = interval;
    }
    if let Some(plot_dir) = &overrides.plot_dir {
        config.plot_dir = plot_dir.clone();
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScenarioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_relays, 3);
        assert_eq!(config.inter_packet_interval_us, 20_000);
        assert_eq!(config.rlc_buffer_mb, 1000);
        assert!(config.rlc_acknowledged);
    }

    #[test]
    fn test_zero_dimension_grid_is_rejected() {
        let mut config = ScenarioConfig::default();
        config.grid.columns = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Grid(_))));
    }

    #[test]
    fn test_degenerate_timing_is_rejected() {
        let config = ScenarioConfig { client_start_us: 2_000_000, ..ScenarioConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTiming(_))));

        let config = ScenarioConfig { inter_packet_interval_us: 0, ..ScenarioConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTraffic(_))));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "num_relays: 2\nrun: 5").unwrap();

        let config = ScenarioConfig::from_file(file.path()).unwrap();
        assert_eq!(config.num_relays, 2);
        assert_eq!(config.run, 5);
        // Untouched fields keep their defaults
        assert_eq!(config.grid.rows, 4);
        assert_eq!(config.stop_us, 1_200_000);
    }

    #[test]
    fn test_cli_overrides_beat_file_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "num_relays: 2\nrlc_buffer_mb: 10").unwrap();

        let overrides = CliOverrides {
            config_file: Some(file.path().to_path_buf()),
            num_relays: Some(0),
            ..CliOverrides::default()
        };
        let config = resolve(&overrides).unwrap();
        assert_eq!(config.num_relays, 0, "explicit flag must beat the file");
        assert_eq!(config.rlc_buffer_mb, 10, "file must beat the built-in default");
    }

    #[test]
    fn test_resolve_without_file_uses_defaults() {
        let config = resolve(&CliOverrides::default()).unwrap();
        assert_eq!(config.num_relays, ScenarioConfig::default().num_relays);
    }
}
