//! Error types for the prediction pipeline.

/// Errors reported by an external scoring backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    /// The backend is not initialised or cannot be reached
    #[error("Scoring backend unavailable: {0}")]
    Unavailable(String),

    /// The backend was invoked but failed to produce a result
    #[error("Scoring backend failed: {0}")]
    Failure(String),
}

/// Errors a prediction handle can resolve to.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum PredictionError {
    /// The scoring backend returned an error
    #[error("Prediction failed")]
    Backend(#[from] BackendError),

    /// The background worker is no longer running
    #[error("Prediction worker stopped")]
    WorkerStopped,
}

/// Errors that can occur when loading an engine configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Error opening or reading the configuration file
    #[error("Failed to read configuration")]
    Io(#[source] std::io::Error),

    /// The configuration is not valid JSON for [`EngineConfig`](crate::config::EngineConfig)
    #[error("Failed to parse configuration")]
    Parse(#[source] serde_json::Error),
}

/// Errors that can occur when loading a keyboard layout.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LayoutError {
    /// Error opening or reading the layout file
    #[error("Failed to read layout")]
    Io(#[source] std::io::Error),

    /// The layout is not valid JSON
    #[error("Failed to parse layout")]
    Parse(#[source] serde_json::Error),

    /// The layout has no character keys
    #[error("Layout contains no character keys")]
    Empty,
}
