//! Engine Configuration
//!
//! Configuration for every engine component, loadable from a TOML file with
//! environment-variable overrides.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. `GATEWAY_*` environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [routing]
//! output_token_ratio = 0.5
//! fallback_depth = 2
//!
//! [health]
//! ema_alpha = 0.3
//! health_check_interval_ms = 30000
//! staleness_window_ms = 90000
//! target_latency_ms = 1000
//!
//! [governor]
//! reservation_max_age_ms = 120000
//! sweep_interval_ms = 30000
//!
//! [governor.default_limits]
//! daily_limit_cents = 10000
//! monthly_limit_cents = 250000
//! per_request_limit_cents = 2500
//! emergency_stop_threshold_cents = 9000
//!
//! [telemetry]
//! idempotency_ttl_ms = 600000
//!
//! [alerts]
//! channel_capacity = 256
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::governor::OrgLimits;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

// ============================================================================
// Component Configs
// ============================================================================

/// Routing engine settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Assumed output/input token ratio when estimating cost; the wire-level
    /// split is unknown at admission time
    pub output_token_ratio: f64,

    /// Maximum fallback chain length on a decision
    pub fallback_depth: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            output_token_ratio: 0.5,
            fallback_depth: 2,
        }
    }
}

/// Health monitor settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// EMA weight for new samples (0.0 – 1.0]
    pub ema_alpha: f64,

    /// Expected cadence of health-relevant samples
    pub health_check_interval_ms: u64,

    /// Age past which a provider's score decays toward neutral; 0 derives
    /// 3× `health_check_interval_ms`
    pub staleness_window_ms: u64,

    /// Latency treated as "good" when composing the score
    pub target_latency_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            ema_alpha: 0.3,
            health_check_interval_ms: 30_000,
            staleness_window_ms: 90_000,
            target_latency_ms: 1_000,
        }
    }
}

/// Cost governor settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Limits applied to orgs without an explicit override
    pub default_limits: OrgLimits,

    /// Age at which an unsettled reservation is swept back to headroom
    pub reservation_max_age_ms: u64,

    /// Cadence of the background sweep
    pub sweep_interval_ms: u64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            default_limits: OrgLimits::default(),
            reservation_max_age_ms: 120_000, // 2 min
            sweep_interval_ms: 30_000,
        }
    }
}

/// Telemetry recorder settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// How long completion ids are remembered for duplicate suppression
    pub idempotency_ttl_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            idempotency_ttl_ms: 600_000, // 10 min
        }
    }
}

/// Alert dispatch settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Bounded capacity of the alert channel; overflow sheds
    pub channel_capacity: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

// ============================================================================
// Engine Config
// ============================================================================

/// Complete engine configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Routing settings
    pub routing: RoutingConfig,

    /// Health monitor settings
    pub health: HealthConfig,

    /// Cost governor settings
    pub governor: GovernorConfig,

    /// Telemetry settings
    pub telemetry: TelemetryConfig,

    /// Alerting settings
    pub alerts: AlertsConfig,
}

impl EngineConfig {
    /// Load from a TOML file, then apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ReadError`] when the file cannot be read,
    /// [`ConfigError::ParseError`] on malformed TOML,
    /// [`ConfigError::ValidationError`] on out-of-range values.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, validated.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidationError`] when an override is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `GATEWAY_*` environment variables over the current values.
    /// Unparseable values are ignored in favor of what is already set.
    pub fn apply_env_overrides(&mut self) {
        fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|v| v.parse().ok())
        }

        if let Some(v) = env_parse("GATEWAY_OUTPUT_TOKEN_RATIO") {
            self.routing.output_token_ratio = v;
        }
        if let Some(v) = env_parse("GATEWAY_FALLBACK_DEPTH") {
            self.routing.fallback_depth = v;
        }
        if let Some(v) = env_parse("GATEWAY_STALENESS_WINDOW_MS") {
            self.health.staleness_window_ms = v;
        }
        if let Some(v) = env_parse("GATEWAY_DAILY_LIMIT_CENTS") {
            self.governor.default_limits.daily_limit_cents = v;
        }
        if let Some(v) = env_parse("GATEWAY_MONTHLY_LIMIT_CENTS") {
            self.governor.default_limits.monthly_limit_cents = v;
        }
        if let Some(v) = env_parse("GATEWAY_PER_REQUEST_LIMIT_CENTS") {
            self.governor.default_limits.per_request_limit_cents = v;
        }
        if let Some(v) = env_parse("GATEWAY_EMERGENCY_STOP_CENTS") {
            self.governor.default_limits.emergency_stop_threshold_cents = v;
        }
        if let Some(v) = env_parse("GATEWAY_RESERVATION_MAX_AGE_MS") {
            self.governor.reservation_max_age_ms = v;
        }
        if let Some(v) = env_parse("GATEWAY_SWEEP_INTERVAL_MS") {
            self.governor.sweep_interval_ms = v;
        }
    }

    /// Check value ranges and derive dependent defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidationError`] naming the offending field.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.routing.output_token_ratio <= 0.0 {
            return Err(ConfigError::ValidationError(
                "routing.output_token_ratio must be > 0".to_string(),
            ));
        }
        if self.routing.fallback_depth > 8 {
            return Err(ConfigError::ValidationError(
                "routing.fallback_depth must be <= 8".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.health.ema_alpha) || self.health.ema_alpha == 0.0 {
            return Err(ConfigError::ValidationError(
                "health.ema_alpha must be in (0, 1]".to_string(),
            ));
        }
        if self.health.staleness_window_ms == 0 {
            // Derived default: stale after three missed check intervals
            self.health.staleness_window_ms = self.health.health_check_interval_ms * 3;
        }
        if self.governor.sweep_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "governor.sweep_interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let mut config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.routing.output_token_ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.routing.fallback_depth, 2);
        assert_eq!(config.governor.default_limits.daily_limit_cents, 10_000);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[routing]
fallback_depth = 3

[governor.default_limits]
daily_limit_cents = 777
"#
        )
        .unwrap();

        let config = EngineConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.routing.fallback_depth, 3);
        assert_eq!(config.governor.default_limits.daily_limit_cents, 777);
        // Untouched sections keep defaults
        assert_eq!(config.telemetry.idempotency_ttl_ms, 600_000);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = EngineConfig::load_from_path(Path::new("/nonexistent/gateway.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[routing\nbroken").unwrap();

        let err = EngineConfig::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation_rejects_bad_ratio() {
        let mut config = EngineConfig {
            routing: RoutingConfig {
                output_token_ratio: 0.0,
                ..RoutingConfig::default()
            },
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_alpha() {
        let mut config = EngineConfig {
            health: HealthConfig {
                ema_alpha: 1.5,
                ..HealthConfig::default()
            },
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_staleness_window_derived_from_interval() {
        let mut config = EngineConfig {
            health: HealthConfig {
                health_check_interval_ms: 10_000,
                staleness_window_ms: 0,
                ..HealthConfig::default()
            },
            ..EngineConfig::default()
        };
        config.validate().unwrap();
        assert_eq!(config.health.staleness_window_ms, 30_000);
    }
}
