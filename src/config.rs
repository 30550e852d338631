use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub wagers: WagerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External metrics provider (token endpoint + REST API)
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Client-credentials token endpoint
    pub token_url: String,
    /// REST API base URL (no trailing slash)
    pub api_base: String,
    pub client_id: String,
    pub client_secret: String,
    /// Provider-imposed batch-get limit (ids per metrics call)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Max in-flight recent-release fetches
    #[serde(default = "default_release_concurrency")]
    pub release_concurrency: usize,
    /// Retry attempts per unit of work before giving up on it
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds (doubles per attempt)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_batch_size() -> usize {
    50
}

fn default_release_concurrency() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl ProviderConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Page size for full-table reads
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_page_size() -> i64 {
    500
}

/// Point formula constants
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points per unit of popularity delta
    pub popularity_weight: f64,
    /// Release bonus for a single
    pub single_bonus: i64,
    /// Release bonus for an album or EP
    pub album_bonus: i64,
    /// Captain multiplier for a non-featured captain
    pub captain_multiplier: f64,
    /// Captain multiplier when the captain is featured
    pub featured_captain_multiplier: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            popularity_weight: 10.0,
            single_bonus: 20,
            album_bonus: 50,
            captain_multiplier: 1.5,
            featured_captain_multiplier: 2.0,
        }
    }
}

/// Head-to-head wager payouts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WagerConfig {
    /// Points awarded on a won wager
    pub win_points: i64,
    /// Coins awarded on a won wager (observed source keeps this at zero)
    pub win_coins: i64,
}

impl Default for WagerConfig {
    fn default() -> Self {
        Self {
            win_points: 100,
            win_coins: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port for trigger endpoints and health probe
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

fn default_log_level() -> String {
    "info".to_string()
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
            .set_default("logging.level", "info")?
            .set_default("database.max_connections", 5)?
            .set_default("database.page_size", 500)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("CRESCENDO_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (CRESCENDO_PROVIDER__CLIENT_ID, etc.)
            .add_source(
                Environment::with_prefix("CRESCENDO")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.provider.client_id.trim().is_empty() {
            errors.push("provider.client_id must not be empty".to_string());
        }
        if self.provider.client_secret.trim().is_empty() {
            errors.push("provider.client_secret must not be empty".to_string());
        }
        if self.provider.batch_size == 0 {
            errors.push("provider.batch_size must be positive".to_string());
        }
        if self.provider.release_concurrency == 0 {
            errors.push("provider.release_concurrency must be positive".to_string());
        }
        if self.provider.max_attempts == 0 {
            errors.push("provider.max_attempts must be positive".to_string());
        }

        if self.database.page_size <= 0 {
            errors.push("database.page_size must be positive".to_string());
        }

        if self.scoring.captain_multiplier < 1.0 {
            errors.push("scoring.captain_multiplier must be >= 1".to_string());
        }
        if self.scoring.featured_captain_multiplier < self.scoring.captain_multiplier {
            errors.push(
                "scoring.featured_captain_multiplier must be >= scoring.captain_multiplier"
                    .to_string(),
            );
        }

        if self.wagers.win_points < 0 {
            errors.push("wagers.win_points must not be negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
