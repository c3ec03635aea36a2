//! Configuration file handling for elmscan

use anyhow::{Context, Result};
use elmscan_obd::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

const DEFAULT_BAUDRATE: u32 = 38400;
const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Adapter serial port; auto-detected when unset
    pub port: Option<String>,
    pub baudrate: Option<u32>,
    /// Manufacturer for DTC descriptions and UDS catalogs
    pub manufacturer: Option<String>,
    /// Directory holding `dtc_generic.csv` and the manufacturer tables
    pub dtc_data_dir: Option<PathBuf>,
    /// Extra UDS catalog YAML files
    #[serde(default)]
    pub uds_catalogs: Vec<PathBuf>,
    /// Live monitor poll interval in milliseconds
    pub monitor_interval_ms: Option<u64>,
    /// Live monitor session log format
    pub log_format: Option<LogFormat>,
    /// Live monitor session log directory
    pub log_dir: Option<PathBuf>,
    /// Append raw adapter traffic to this file
    pub raw_log: Option<PathBuf>,
    pub output: Option<OutputFormat>,
    pub no_color: Option<bool>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides<'a> {
    pub port: Option<&'a str>,
    pub baudrate: Option<u32>,
    pub manufacturer: Option<&'a str>,
    pub raw_log: Option<&'a Path>,
    pub output: Option<OutputFormat>,
    pub no_color: bool,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("elmscan");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &CliOverrides<'_>) -> MergedConfig {
        let data_root = dirs::data_dir()
            .map(|d| d.join("elmscan"))
            .unwrap_or_else(|| PathBuf::from("data"));

        MergedConfig {
            port: args
                .port
                .map(String::from)
                .or_else(|| self.port.clone()),
            baudrate: args
                .baudrate
                .or(self.baudrate)
                .unwrap_or(DEFAULT_BAUDRATE),
            manufacturer: args
                .manufacturer
                .map(String::from)
                .or_else(|| self.manufacturer.clone())
                .filter(|m| !m.trim().is_empty() && m != "generic"),
            dtc_data_dir: self
                .dtc_data_dir
                .clone()
                .unwrap_or_else(|| data_root.join("dtc")),
            uds_catalogs: self.uds_catalogs.clone(),
            monitor_interval_ms: self.monitor_interval_ms.unwrap_or(DEFAULT_INTERVAL_MS),
            log_format: self.log_format,
            log_dir: self.log_dir.clone().unwrap_or_else(|| data_root.join("logs")),
            raw_log: args
                .raw_log
                .map(Path::to_path_buf)
                .or_else(|| self.raw_log.clone()),
            output: args.output.or(self.output).unwrap_or_default(),
            no_color: args.no_color || self.no_color.unwrap_or(false),
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone, PartialEq)]
pub struct MergedConfig {
    pub port: Option<String>,
    pub baudrate: u32,
    pub manufacturer: Option<String>,
    pub dtc_data_dir: PathBuf,
    pub uds_catalogs: Vec<PathBuf>,
    pub monitor_interval_ms: u64,
    /// Session logging is off unless a format is configured or requested
    pub log_format: Option<LogFormat>,
    pub log_dir: PathBuf,
    pub raw_log: Option<PathBuf>,
    pub output: OutputFormat,
    pub no_color: bool,
}

impl MergedConfig {
    /// Brand used for UDS catalog lookups
    pub fn brand(&self) -> &str {
        self.manufacturer.as_deref().unwrap_or("generic")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
port = "/dev/ttyUSB1"
manufacturer = "jeep"
monitor_interval_ms = 500
log_format = "json"
output = "json"
uds_catalogs = ["/etc/elmscan/jeep.yaml"]
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.log_format, Some(LogFormat::Json));
        assert_eq!(config.output, Some(OutputFormat::Json));
        assert_eq!(config.uds_catalogs.len(), 1);
        assert_eq!(config.baudrate, None);
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "baudrate = \"fast\"").unwrap();
        assert!(Config::load_from(&path).is_err());
        assert!(Config::load_from(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_args_override_file() {
        let config = Config {
            port: Some("/dev/ttyUSB1".into()),
            baudrate: Some(115200),
            manufacturer: Some("jeep".into()),
            output: Some(OutputFormat::Json),
            ..Default::default()
        };
        let merged = config.merge_with_args(&CliOverrides {
            port: Some("/dev/ttyACM0"),
            manufacturer: Some("landrover"),
            output: Some(OutputFormat::Csv),
            ..Default::default()
        });
        assert_eq!(merged.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(merged.baudrate, 115200);
        assert_eq!(merged.manufacturer.as_deref(), Some("landrover"));
        assert_eq!(merged.output, OutputFormat::Csv);
    }

    #[test]
    fn test_defaults() {
        let merged = Config::default().merge_with_args(&CliOverrides::default());
        assert_eq!(merged.port, None);
        assert_eq!(merged.baudrate, 38400);
        assert_eq!(merged.manufacturer, None);
        assert_eq!(merged.brand(), "generic");
        assert_eq!(merged.monitor_interval_ms, 1000);
        assert_eq!(merged.log_format, None);
        assert_eq!(merged.output, OutputFormat::Table);
        assert!(!merged.no_color);
    }

    #[test]
    fn test_generic_manufacturer_means_none() {
        let config = Config {
            manufacturer: Some("generic".into()),
            ..Default::default()
        };
        let merged = config.merge_with_args(&CliOverrides::default());
        assert_eq!(merged.manufacturer, None);
    }
}
