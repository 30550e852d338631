use thiserror::Error;

/// Main error type for the scoring engine
#[derive(Error, Debug)]
pub enum CrescendoError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-retryable provider response (4xx other than 429)
    #[error("Provider rejected request (status {status}): {body}")]
    ProviderRejected { status: u16, body: String },

    /// Retryable provider response that exhausted its attempts
    #[error("Provider unavailable after {attempts} attempts (last status {status})")]
    ProviderExhausted { attempts: u32, status: u16 },

    // Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Data availability errors
    #[error("No active season")]
    NoActiveSeason,

    #[error("Inconsistent data: {0}")]
    InconsistentData(String),

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for CrescendoError
pub type Result<T> = std::result::Result<T, CrescendoError>;

impl CrescendoError {
    /// True when the error only degrades a single unit of work (one provider
    /// chunk, one batch write) and the run should carry on.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            CrescendoError::ProviderRejected { .. }
                | CrescendoError::ProviderExhausted { .. }
                | CrescendoError::InconsistentData(_)
        )
    }
}
