use thiserror::Error;

/// Main error type for the snapshot service
#[derive(Error, Debug)]
pub enum IndexerError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider {provider} failed: {reason}")]
    Provider { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout_ms}ms")]
    ProviderTimeout { provider: String, timeout_ms: u64 },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Persistence errors
    #[error("Persistence failed for batches {failed_batches:?} of {total_batches}: {reason}")]
    Persistence {
        failed_batches: Vec<usize>,
        total_batches: usize,
        reason: String,
    },

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for IndexerError
pub type Result<T> = std::result::Result<T, IndexerError>;

impl IndexerError {
    /// Shorthand for a provider-level failure
    pub fn provider(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        IndexerError::Provider {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_error_lists_batches() {
        let err = IndexerError::Persistence {
            failed_batches: vec![1, 3],
            total_batches: 4,
            reason: "connection reset".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Persistence failed for batches [1, 3] of 4: connection reset"
        );
    }

    #[test]
    fn test_invalid_config_joins_messages() {
        let err = IndexerError::InvalidConfig(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Invalid configuration: a; b");
    }
}
