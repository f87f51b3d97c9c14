pub mod errors;
pub mod models;
pub mod services;
pub mod sources;
pub mod storage;

use std::path::{Path, PathBuf};

use models::{
    observation::PriceObservation,
    run::{RunContext, RunReport},
    settings::Settings,
};
use services::pipeline_service::PipelineService;
use sources::{memory::StaticSource, traits::SourceAdapter};
use storage::naming;

use errors::CoreError;

/// Main entry point for the pp-feed core library.
///
/// Holds the settings and turns source adapter runs into per-instrument JSON
/// feeds (`<base_dir>/<source>/<key>.json`) plus one instrument catalog per
/// source (`<base_dir>/instruments/<source>.csv`).
#[must_use]
pub struct PriceFeed {
    pipeline: PipelineService,
}

impl std::fmt::Debug for PriceFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settings = self.pipeline.settings();
        f.debug_struct("PriceFeed")
            .field("base_dir", &settings.base_dir)
            .field("write_mode", &settings.write_mode)
            .field("duplicate_policy", &settings.duplicate_policy)
            .field("catalog_mode", &settings.catalog_mode)
            .finish()
    }
}

impl PriceFeed {
    /// Create a feed writer with the given settings.
    pub fn new(settings: Settings) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self {
            pipeline: PipelineService::new(settings),
        })
    }

    /// Create a feed writer with default settings rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline: PipelineService::new(Settings {
                base_dir: base_dir.into(),
                ..Settings::default()
            }),
        }
    }

    /// Load settings from a JSON config file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        Self::new(Settings::load_from_file(path)?)
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.pipeline.settings()
    }

    // ── Ingestion ───────────────────────────────────────────────────

    /// Run one pass of a source adapter into the stores.
    pub fn ingest(&self, adapter: &mut dyn SourceAdapter) -> Result<RunReport, CoreError> {
        self.pipeline.run(adapter)
    }

    /// Record already-validated observations as one run of `source_name`.
    pub fn ingest_observations(
        &self,
        source_name: &str,
        observations: &[PriceObservation],
    ) -> Result<RunReport, CoreError> {
        let mut source = StaticSource::from_observations(source_name, observations);
        self.pipeline.run(&mut source)
    }

    // ── Naming ──────────────────────────────────────────────────────

    /// Filesystem-safe key of an instrument label.
    #[must_use]
    pub fn sanitize(label: &str) -> String {
        naming::sanitize_file_name(label)
    }

    /// Where the time series of an instrument of `source_name` is stored.
    #[must_use]
    pub fn series_path(&self, source_name: &str, instrument_key: &str) -> PathBuf {
        self.context(source_name).series_path(instrument_key)
    }

    /// Where the instrument catalog of `source_name` is stored.
    #[must_use]
    pub fn catalog_path(&self, source_name: &str) -> PathBuf {
        self.context(source_name).catalog_path()
    }

    /// Public feed URL of an instrument of `source_name`.
    #[must_use]
    pub fn feed_url(&self, source_name: &str, instrument_key: &str) -> String {
        self.context(source_name).feed_url(instrument_key)
    }

    fn context(&self, source_name: &str) -> RunContext {
        RunContext::new(source_name, self.pipeline.settings())
    }
}
