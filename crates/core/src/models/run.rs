use std::path::PathBuf;

use crate::errors::CoreError;
use crate::storage::naming;

use super::settings::Settings;

/// Everything the stores need to know about the run they serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Name of the source adapter being run (e.g. "mak_historical").
    pub source_name: String,
    /// Grouping the output lands in (e.g. "mak"); see `Settings::source_aliases`.
    pub output_name: String,
    pub base_dir: PathBuf,
    pub feed_base_url: String,
}

impl RunContext {
    pub fn new(source_name: impl Into<String>, settings: &Settings) -> Self {
        let source_name = source_name.into();
        let output_name = settings.output_name(&source_name).to_string();
        Self {
            source_name,
            output_name,
            base_dir: settings.base_dir.clone(),
            feed_base_url: settings.feed_base_url.clone(),
        }
    }

    /// `<base_dir>/<output_name>`
    pub fn series_dir(&self) -> PathBuf {
        self.base_dir.join(&self.output_name)
    }

    /// `<base_dir>/<output_name>/<sanitized key>.json`
    pub fn series_path(&self, instrument_key: &str) -> PathBuf {
        naming::series_path(&self.base_dir, &self.output_name, instrument_key)
    }

    /// `<base_dir>/instruments/<output_name>.csv`
    pub fn catalog_path(&self) -> PathBuf {
        naming::catalog_path(&self.base_dir, &self.output_name)
    }

    pub fn feed_url(&self, instrument_key: &str) -> String {
        naming::feed_url(&self.feed_base_url, &self.output_name, instrument_key)
    }
}

/// A per-record or per-file problem encountered during a run.
#[derive(Debug)]
pub struct Diagnostic {
    /// Instrument label, when the record got far enough to have one.
    pub instrument: Option<String>,
    pub date: Option<String>,
    pub error: CoreError,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.instrument, &self.date) {
            (Some(i), Some(d)) => write!(f, "[{i} @ {d}] {}", self.error),
            (Some(i), None) => write!(f, "[{i}] {}", self.error),
            _ => write!(f, "{}", self.error),
        }
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub source_name: String,
    /// Observations received from the adapter (valid or not).
    pub received: usize,
    /// Observations appended to a time series.
    pub written: usize,
    /// Observations dropped because their date was already stored.
    pub duplicates_skipped: usize,
    /// New catalog rows.
    pub catalog_rows: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
