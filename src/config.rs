use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub kafka: KafkaSettings,
    #[serde(default)]
    pub ingestion: IngestionSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    pub subscription: SubscriptionSettings,
    pub push: PushSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaSettings {
    pub brokers: String,
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_auto_offset_reset")]
    pub auto_offset_reset: String,
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    /// Consumer tasks joining the group from this instance
    #[serde(default = "default_consumers")]
    pub consumers: usize,
}

fn default_group_id() -> String { "job-alerts-matcher".to_string() }
fn default_topic() -> String { "job-post-events".to_string() }
fn default_auto_offset_reset() -> String { "earliest".to_string() }
fn default_session_timeout_ms() -> u64 { 45_000 }
fn default_consumers() -> usize { 1 }

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionSettings {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_max_concurrency() -> usize { 16 }
fn default_retry_backoff_ms() -> u64 { 1_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_region")]
    pub default_region: String,
    #[serde(default = "default_true")]
    pub skip_inactive: bool,
    #[serde(default)]
    pub weights: WeightsConfig,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_region: default_region(),
            skip_inactive: true,
            weights: WeightsConfig::default(),
        }
    }
}

fn default_region() -> String { "SOUTHEAST_ASIA".to_string() }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_skills_weight")]
    pub skills: f64,
    #[serde(default = "default_title_weight")]
    pub title: f64,
    #[serde(default = "default_employment_type_weight")]
    pub employment_type: f64,
    #[serde(default = "default_salary_weight")]
    pub salary: f64,
    #[serde(default = "default_location_weight")]
    pub location: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            skills: default_skills_weight(),
            title: default_title_weight(),
            employment_type: default_employment_type_weight(),
            salary: default_salary_weight(),
            location: default_location_weight(),
        }
    }
}

fn default_skills_weight() -> f64 { 0.40 }
fn default_title_weight() -> f64 { 0.20 }
fn default_employment_type_weight() -> f64 { 0.15 }
fn default_salary_weight() -> f64 { 0.15 }
fn default_location_weight() -> f64 { 0.10 }

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionSettings {
    pub endpoint: String,
    pub api_key: String,
    pub timeout_secs: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushSettings {
    /// Redis URL for pub/sub fan-out; in-process sessions only when unset
    pub redis_url: Option<String>,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_session_buffer")]
    pub session_buffer: usize,
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

fn default_queue_capacity() -> usize { 1024 }
fn default_session_buffer() -> usize { 32 }
fn default_drain_timeout_secs() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with JOBALERTS__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Development overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., JOBALERTS__KAFKA__BROKERS -> kafka.brokers
            .add_source(
                Environment::with_prefix("JOBALERTS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_well_known_env(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("JOBALERTS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply the conventional unprefixed variables on top of the layered config
///
/// `DATABASE_URL` wins over `database.url`, `KAFKA_BROKERS` over
/// `kafka.brokers` and `REDIS_URL` over `push.redis_url`.
fn apply_well_known_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    for (var, key) in [
        ("DATABASE_URL", "database.url"),
        ("KAFKA_BROKERS", "kafka.brokers"),
        ("REDIS_URL", "push.redis_url"),
    ] {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_weights() {
        let weights = WeightsConfig::default();
        assert_eq!(weights.skills, 0.40);
        assert_eq!(weights.title, 0.20);
        assert_eq!(weights.employment_type, 0.15);
        assert_eq!(weights.salary, 0.15);
        assert_eq!(weights.location, 0.10);
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_load_from_minimal_file() {
        let path = std::env::temp_dir().join(format!("job-alerts-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 8080

[database]
url = "postgres://localhost/job_alerts"

[kafka]
brokers = "localhost:9092"

[subscription]
endpoint = "http://payments.local/v1"
api_key = "secret"

[push]
queue_capacity = 8
"#
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.kafka.topic, "job-post-events");
        assert_eq!(settings.kafka.consumers, 1);
        assert_eq!(settings.matching.default_region, "SOUTHEAST_ASIA");
        assert!(settings.matching.skip_inactive);
        assert_eq!(settings.ingestion.max_concurrency, 16);
        assert_eq!(settings.push.queue_capacity, 8);
        assert_eq!(settings.push.session_buffer, 32);
        assert!(settings.push.redis_url.is_none());
    }
}
