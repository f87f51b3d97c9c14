use thiserror::Error;

/// Unified error type for the entire pp-feed-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Record validation ───────────────────────────────────────────
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Date {date} is already stored for instrument {instrument}")]
    DuplicateDate { instrument: String, date: String },

    // ── Storage / File ──────────────────────────────────────────────
    #[error("Existing time series {path} is not a valid JSON array: {reason}")]
    CorruptExistingFile { path: String, reason: String },

    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("CSV error: {0}")]
    Csv(String),

    // ── Configuration ───────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ── Source adapters ─────────────────────────────────────────────
    #[error("Source error ({source_name}): {message}")]
    Source {
        source_name: String,
        message: String,
    },
}

impl CoreError {
    /// Whether the error only affects the record that produced it.
    /// Anything else stops further writes for the affected file.
    pub fn is_per_record(&self) -> bool {
        matches!(
            self,
            CoreError::Schema(_) | CoreError::DuplicateDate { .. } | CoreError::Source { .. }
        )
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<csv::Error> for CoreError {
    fn from(e: csv::Error) -> Self {
        CoreError::Csv(e.to_string())
    }
}

impl From<tempfile::PersistError> for CoreError {
    fn from(e: tempfile::PersistError) -> Self {
        CoreError::FileIO(format!("Failed to replace file atomically: {}", e.error))
    }
}
