//! Error types for the funnel bot.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to edit message on channel {name}: {reason}")]
    EditFailed { name: String, reason: String },

    #[error("No channel registered with name {0}")]
    UnknownChannel(String),
}

/// Errors raised while recording a lead.
#[derive(Debug, thiserror::Error)]
pub enum LeadSinkError {
    #[error("Failed to serialize lead: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to write lead: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the funnel bot.
pub type Result<T> = std::result::Result<T, Error>;
