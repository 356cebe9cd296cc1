use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    /// Width of a snapshot bucket in seconds
    #[serde(default = "default_bucket_seconds")]
    pub bucket_seconds: i64,
    /// Maximum statements submitted to the store in one batch
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
    /// Scheduler interval in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_bucket_seconds() -> i64 {
    300
}

fn default_batch_limit() -> usize {
    50
}

fn default_interval_secs() -> u64 {
    300
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            bucket_seconds: default_bucket_seconds(),
            batch_limit: default_batch_limit(),
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// User-Agent sent to upstream APIs
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "ProviderConfig::dexscreener")]
    pub dexscreener: ProviderConfig,
    #[serde(default = "ProviderConfig::jupiter")]
    pub jupiter: ProviderConfig,
    #[serde(default = "ProviderConfig::coingecko")]
    pub coingecko: ProviderConfig,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    "Axis-Snapshot/1.0".to_string()
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
            dexscreener: ProviderConfig::dexscreener(),
            jupiter: ProviderConfig::jupiter(),
            coingecko: ProviderConfig::coingecko(),
        }
    }
}

impl ProvidersConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Settings for a single upstream price provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Maximum ids per upstream request
    pub batch_size: usize,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn dexscreener() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.dexscreener.com".to_string(),
            batch_size: 30,
            api_key: None,
        }
    }

    pub fn jupiter() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.jup.ag".to_string(),
            batch_size: 100,
            api_key: None,
        }
    }

    pub fn coingecko() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            batch_size: 50,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for a daily rolling log file
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info,axis_indexer=debug,sqlx=warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

/// Per-provider defaults, so an env override may set a single field
/// (e.g. `AXIS_PROVIDERS__COINGECKO__ENABLED=true`).
fn provider_defaults(
    builder: Builder,
    name: &str,
    defaults: ProviderConfig,
) -> Result<Builder, ConfigError> {
    builder
        .set_default(format!("providers.{name}.enabled"), defaults.enabled)?
        .set_default(format!("providers.{name}.base_url"), defaults.base_url)?
        .set_default(
            format!("providers.{name}.batch_size"),
            defaults.batch_size as u64,
        )
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("database.max_connections", 5)?
            .set_default("snapshot.bucket_seconds", 300)?
            .set_default("snapshot.batch_limit", 50)?
            .set_default("snapshot.interval_secs", 300)?
            .set_default("providers.request_timeout_ms", 10_000)?
            .set_default("providers.user_agent", default_user_agent())?;

        let builder = provider_defaults(builder, "dexscreener", ProviderConfig::dexscreener())?;
        let builder = provider_defaults(builder, "jupiter", ProviderConfig::jupiter())?;
        let builder = provider_defaults(builder, "coingecko", ProviderConfig::coingecko())?;

        let builder = builder
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("AXIS_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (AXIS_DATABASE__URL, etc.)
            .add_source(
                Environment::with_prefix("AXIS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration pointing at a local database with every default applied
    pub fn local(database_url: &str) -> Self {
        Self {
            database: DatabaseConfig {
                url: database_url.to_string(),
                max_connections: default_max_connections(),
            },
            snapshot: SnapshotConfig::default(),
            providers: ProvidersConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.url.trim().is_empty() {
            errors.push("database.url must be set".to_string());
        }

        if self.snapshot.bucket_seconds <= 0 {
            errors.push("snapshot.bucket_seconds must be positive".to_string());
        }

        if self.snapshot.batch_limit == 0 {
            errors.push("snapshot.batch_limit must be positive".to_string());
        }

        if self.snapshot.interval_secs == 0 {
            errors.push("snapshot.interval_secs must be positive".to_string());
        }

        let providers = [
            ("dexscreener", &self.providers.dexscreener),
            ("jupiter", &self.providers.jupiter),
            ("coingecko", &self.providers.coingecko),
        ];

        for (name, provider) in providers {
            if provider.enabled && provider.batch_size == 0 {
                errors.push(format!("providers.{name}.batch_size must be positive"));
            }
        }

        if !providers.iter().any(|(_, p)| p.enabled) {
            errors.push("at least one price provider must be enabled".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
