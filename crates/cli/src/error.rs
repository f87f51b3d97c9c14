use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] pp_feed_core::errors::CoreError),

    #[error("run reported {count} problem(s)")]
    Diagnostics { count: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        use pp_feed_core::errors::CoreError;

        match self {
            Self::Core(CoreError::Config(_)) => 2,
            Self::Core(CoreError::Schema(_)) => 3,
            Self::Diagnostics { .. } => 5,
            Self::Core(_) | Self::Serialization(_) => 10,
        }
    }
}
