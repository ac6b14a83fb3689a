use anyhow::{Context, Result};
use config::{Config, File};
use log::{debug, info, LevelFilter};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::models::{
    PortValue, DEFAULT_BAUD_RATE, DEFAULT_PLUG_VALUE, DEFAULT_UPDATE_TIME, PERCENT_MAX,
};
use crate::registry::DEFAULT_DIAGNOSTICS_CAPACITY;

pub const DEFAULT_CONFIG_FILE: &str = "njord.ini";

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_update_time() -> u64 {
    DEFAULT_UPDATE_TIME
}

fn default_plug_value() -> PortValue {
    DEFAULT_PLUG_VALUE
}

fn default_diagnostics_capacity() -> usize {
    DEFAULT_DIAGNOSTICS_CAPACITY
}

fn default_notices_capacity() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceDefaultsConfig {
    #[serde(default = "default_update_time")]
    pub update_time: u64,
    #[serde(default = "default_plug_value")]
    pub default_plug_value: PortValue,
}

impl Default for DeviceDefaultsConfig {
    fn default() -> Self {
        Self {
            update_time: default_update_time(),
            default_plug_value: default_plug_value(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    #[serde(default = "default_diagnostics_capacity")]
    pub diagnostics_capacity: usize,
    #[serde(default = "default_notices_capacity")]
    pub notices_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            diagnostics_capacity: default_diagnostics_capacity(),
            notices_capacity: default_notices_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub device: DeviceDefaultsConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        Self::from_file(DEFAULT_CONFIG_FILE)
    }

    pub fn get_log_level(&self) -> LevelFilter {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info, // Default to Info if invalid
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        debug!("Loading configuration from {}", config_path.display());

        let config = Config::builder()
            .add_source(File::from(config_path).format(config::FileFormat::Ini))
            .build()
            .context(format!("Failed to load config from {}", config_path.display()))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize config")?;

        if app_config.device.default_plug_value as f32 > PERCENT_MAX {
            anyhow::bail!(
                "default_plug_value must be at most {}, got {}",
                PERCENT_MAX,
                app_config.device.default_plug_value
            );
        }

        Ok(app_config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_path = path.as_ref();

        let mut config_str = String::new();

        config_str.push_str(&format!("[serial]\nbaud_rate = {}\n\n", self.serial.baud_rate));

        config_str.push_str(&format!(
            "[device]\nupdate_time = {}\ndefault_plug_value = {}\n\n",
            self.device.update_time, self.device.default_plug_value
        ));

        config_str.push_str(&format!(
            "[registry]\ndiagnostics_capacity = {}\nnotices_capacity = {}\n\n",
            self.registry.diagnostics_capacity, self.registry.notices_capacity
        ));

        config_str.push_str(&format!("[logging]\nlevel = {}\n", self.logging.level));

        fs::write(config_path, config_str)
            .context(format!("Failed to save config to {}", config_path.display()))?;

        info!("Configuration saved to {}", config_path.display());
        Ok(())
    }
}
