//! # Migrator Configuration
//!
//! Layered configuration: built-in defaults, then `config/migrator.toml`, then
//! `config/migrator.<environment>.toml`, then `MIGRATOR__*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use migrator_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let wave_size = manager.config().orchestration.default_wave_size;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::system;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/migrator.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MigratorConfig {
    pub orchestration: OrchestrationConfig,
    pub license_cache: LicenseCacheConfig,
    pub sessions: SessionConfig,
    pub cli_probe: CliProbeConfig,
    pub database: DatabaseConfig,
}

/// Wave planning and pilot selection bounds
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    pub default_wave_size: usize,
    pub max_wave_size: usize,
    pub max_planning_passes: usize,
    pub default_pilot_limit: usize,
    pub max_pilot_limit: usize,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            default_wave_size: system::DEFAULT_WAVE_SIZE,
            max_wave_size: system::MAX_WAVE_SIZE,
            max_planning_passes: system::MAX_PLANNING_PASSES,
            default_pilot_limit: system::DEFAULT_PILOT_LIMIT,
            max_pilot_limit: system::MAX_PILOT_LIMIT,
        }
    }
}

/// Seat-check cache timings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LicenseCacheConfig {
    pub ttl_seconds: u64,
    /// Failed checks are cached for this long so outages recover quickly
    pub error_ttl_seconds: u64,
    pub check_timeout_ms: u64,
}

impl Default for LicenseCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: system::LICENSE_CACHE_TTL_SECONDS,
            error_ttl_seconds: system::LICENSE_CACHE_ERROR_TTL_SECONDS,
            check_timeout_ms: system::LICENSE_CHECK_TIMEOUT_MS,
        }
    }
}

impl LicenseCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn error_ttl(&self) -> Duration {
        Duration::from_secs(self.error_ttl_seconds)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: system::SESSION_IDLE_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CliProbeConfig {
    pub timeout_ms: u64,
    pub version_args: Vec<String>,
}

impl Default for CliProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: system::CLI_PROBE_TIMEOUT_MS,
            version_args: vec!["--version".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl MigratorConfig {
    /// Reject values that would make the orchestrator misbehave at runtime.
    pub fn validate(&self) -> ConfigResult<()> {
        let orchestration = &self.orchestration;

        if orchestration.default_wave_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.default_wave_size",
                "0",
                "must be at least 1",
            ));
        }
        if orchestration.default_wave_size > orchestration.max_wave_size {
            return Err(ConfigurationError::invalid_value(
                "orchestration.default_wave_size",
                orchestration.default_wave_size.to_string(),
                format!("exceeds max_wave_size ({})", orchestration.max_wave_size),
            ));
        }
        if orchestration.max_planning_passes == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.max_planning_passes",
                "0",
                "must be at least 1",
            ));
        }
        if orchestration.default_pilot_limit == 0
            || orchestration.default_pilot_limit > orchestration.max_pilot_limit
        {
            return Err(ConfigurationError::invalid_value(
                "orchestration.default_pilot_limit",
                orchestration.default_pilot_limit.to_string(),
                format!("must be between 1 and max_pilot_limit ({})", orchestration.max_pilot_limit),
            ));
        }

        let cache = &self.license_cache;
        if cache.ttl_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "license_cache.ttl_seconds",
                "0",
                "must be at least 1",
            ));
        }
        if cache.error_ttl_seconds > cache.ttl_seconds {
            return Err(ConfigurationError::invalid_value(
                "license_cache.error_ttl_seconds",
                cache.error_ttl_seconds.to_string(),
                format!("must not exceed ttl_seconds ({})", cache.ttl_seconds),
            ));
        }
        if cache.check_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "license_cache.check_timeout_ms",
                "0",
                "must be at least 1",
            ));
        }

        if self.cli_probe.version_args.is_empty() {
            return Err(ConfigurationError::missing_field("cli_probe.version_args"));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "must be at least 1",
            ));
        }

        Ok(())
    }
}
