//! Error types for the hydro_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for hydro_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Water amount rejected at the ledger boundary
    #[error("Invalid amount: {0} ml (must be 1..=5000)")]
    InvalidAmount(u32),

    /// Daily goal outside the accepted range
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    /// User profile rejected at the ledger boundary
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// Reminder interval outside the accepted range
    #[error("Invalid reminder interval: {0} minutes (must be 15..=120)")]
    InvalidInterval(u32),

    /// Persisted state violates an invariant
    #[error("State error: {0}")]
    State(String),
}
