use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;
use crate::storage::naming;

/// Default host + path the published feeds are served from.
pub const DEFAULT_FEED_BASE_URL: &str = "https://cdn.statically.io/gh/havasd/pp-data/main";

/// How the time-series store persists appended observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Parse the existing array, append in memory, write a temp file and
    /// rename it over the original at close.
    #[default]
    AtomicRewrite,
    /// Cut the closing bracket off the existing file and append to it.
    InPlaceAppend,
}

/// What happens to an observation whose date is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Drop it with a debug log line.
    #[default]
    Skip,
    /// Drop it and surface `CoreError::DuplicateDate` to the caller.
    Reject,
}

/// Lifetime of the instrument catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogMode {
    /// Keep the existing file and append; rows already in it count as recorded.
    #[default]
    History,
    /// Recreate the file every run, listing only the instruments of that run.
    Snapshot,
}

/// Pipeline configuration. Missing keys in a config file take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of `<base_dir>/<source>/*.json` and `<base_dir>/instruments/*.csv`.
    pub base_dir: PathBuf,

    /// Prefix of the feed URLs written to the catalog notes.
    pub feed_base_url: String,

    pub write_mode: WriteMode,

    pub duplicate_policy: DuplicatePolicy,

    /// Abort the run on the first record that fails validation.
    pub strict_schema: bool,

    pub catalog_mode: CatalogMode,

    /// Source name → output grouping. Lets a historical scraper feed the
    /// same files as its daily counterpart.
    pub source_aliases: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            write_mode: WriteMode::default(),
            duplicate_policy: DuplicatePolicy::default(),
            strict_schema: false,
            catalog_mode: CatalogMode::default(),
            source_aliases: HashMap::from([("mak_historical".to_string(), "mak".to_string())]),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let settings: Settings = serde_json::from_str(&text).map_err(|e| {
            CoreError::Config(format!("cannot parse {}: {e}", path.display()))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would produce unusable paths or URLs.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.feed_base_url.trim().is_empty() {
            return Err(CoreError::Config("feed_base_url must not be empty".into()));
        }
        for (source, target) in &self.source_aliases {
            naming::check_directory_name(&format!("alias for source {source:?}"), target)?;
        }
        Ok(())
    }

    /// Output grouping (directory and catalog name) for a source.
    pub fn output_name<'a>(&'a self, source_name: &'a str) -> &'a str {
        self.source_aliases
            .get(source_name)
            .map(String::as_str)
            .unwrap_or(source_name)
    }
}
