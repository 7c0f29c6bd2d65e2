//! Error types shared across the workspace.

/// Error type for progress operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors that can occur while building progress instrumentation.
///
/// Reporting itself never fails; these are raised at construction only.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// A driver, filter or configuration was given values it cannot work with
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration could not be parsed
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl ProgressError {
    /// Shorthand for [`ProgressError::InvalidConfiguration`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        ProgressError::InvalidConfiguration(reason.into())
    }
}
