//! Configuration for Mailsprint

use crate::types::GroupTailPolicy;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Send backend configuration
    #[serde(default)]
    pub send: SendConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval of the periodic completion check, in seconds
    #[serde(default = "default_completion_check_interval")]
    pub completion_check_interval_secs: u64,

    /// Working hours per day used when a calculation omits them (1..=24)
    #[serde(default = "default_working_hours")]
    pub default_working_hours: u32,

    /// How the planner fills a short tail group of senders
    #[serde(default)]
    pub group_tail: GroupTailPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            completion_check_interval_secs: default_completion_check_interval(),
            default_working_hours: default_working_hours(),
            group_tail: GroupTailPolicy::default(),
        }
    }
}

fn default_completion_check_interval() -> u64 {
    60
}

fn default_working_hours() -> u32 {
    24
}

/// Send backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendConfig {
    /// Backend kind: "simulated" or "smtp"
    #[serde(default = "default_send_backend")]
    pub backend: String,

    /// Minimum simulated latency per send, in milliseconds
    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,

    /// Maximum simulated latency per send, in milliseconds
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,

    /// Success probability on the simulated path (0.0..=1.0)
    #[serde(default = "default_success_probability")]
    pub success_probability: f64,

    /// Per-sender anti-spam limit over a rolling 60 s window
    #[serde(default = "default_per_minute_limit")]
    pub per_minute_limit: u32,

    /// Per-sender anti-spam limit over a rolling 3600 s window
    #[serde(default = "default_per_hour_limit")]
    pub per_hour_limit: u32,

    /// SMTP send timeout, in seconds
    #[serde(default = "default_send_timeout")]
    pub timeout_secs: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            backend: default_send_backend(),
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
            success_probability: default_success_probability(),
            per_minute_limit: default_per_minute_limit(),
            per_hour_limit: default_per_hour_limit(),
            timeout_secs: default_send_timeout(),
        }
    }
}

fn default_send_backend() -> String {
    "simulated".to_string()
}

fn default_min_latency_ms() -> u64 {
    100
}

fn default_max_latency_ms() -> u64 {
    1000
}

fn default_success_probability() -> f64 {
    0.95
}

fn default_per_minute_limit() -> u32 {
    30
}

fn default_per_hour_limit() -> u32 {
    500
}

fn default_send_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./mailsprint.toml"),
            std::path::PathBuf::from("/etc/mailsprint/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Config::default())
    }

    /// Check cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> crate::Result<()> {
        if !(1..=24).contains(&self.scheduler.default_working_hours) {
            return Err(crate::Error::Config(
                "scheduler.default_working_hours must be in 1..=24".to_string(),
            ));
        }
        if self.send.min_latency_ms > self.send.max_latency_ms {
            return Err(crate::Error::Config(
                "send.min_latency_ms must not exceed send.max_latency_ms".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.send.success_probability) {
            return Err(crate::Error::Config(
                "send.success_probability must be in 0.0..=1.0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scheduler.completion_check_interval_secs, 60);
        assert_eq!(config.scheduler.default_working_hours, 24);
        assert_eq!(config.send.backend, "simulated");
        assert_eq!(config.send.success_probability, 0.95);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[scheduler]
completion_check_interval_secs = 30
group_tail = "short"

[send]
backend = "smtp"
per_minute_limit = 10
per_hour_limit = 120

[logging]
level = "debug"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.scheduler.completion_check_interval_secs, 30);
        assert_eq!(
            config.scheduler.group_tail,
            crate::types::GroupTailPolicy::Short
        );
        assert_eq!(config.send.backend, "smtp");
        assert_eq!(config.send.per_minute_limit, 10);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut config = Config::default();
        config.send.success_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scheduler.default_working_hours = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.send.min_latency_ms = 2000;
        config.send.max_latency_ms = 100;
        assert!(config.validate().is_err());
    }
}
