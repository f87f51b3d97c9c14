use tracing::{error, info, warn};

use crate::errors::CoreError;
use crate::models::observation::PriceObservation;
use crate::models::run::{Diagnostic, RunContext, RunReport};
use crate::models::settings::Settings;
use crate::sources::traits::SourceAdapter;
use crate::storage::catalog::InstrumentCatalogStore;
use crate::storage::naming;
use crate::storage::time_series::{RecordOutcome, TimeSeriesStore};

/// Runs a source adapter into the time-series and catalog stores.
///
/// Per run:
/// 1. open both stores for the adapter's output grouping
/// 2. validate and record every observation, in the order the adapter yields them
/// 3. close both stores, also when a record failed or the run was aborted
///
/// Record-level problems (invalid observation, duplicate date under the
/// `reject` policy, a corrupt series file) end up in the report and the run
/// carries on with the next observation.
pub struct PipelineService {
    settings: Settings,
}

impl PipelineService {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one adapter pass.
    ///
    /// Returns `Err` only when the run as a whole cannot proceed: the source
    /// name is not a plain directory name, or `strict_schema` is set and an
    /// observation fails validation. The stores are closed before the error
    /// is returned.
    ///
    /// A catalog that cannot be opened is reported as a diagnostic and the
    /// time series are still recorded.
    pub fn run(&self, adapter: &mut dyn SourceAdapter) -> Result<RunReport, CoreError> {
        naming::check_directory_name("source name", adapter.name())?;
        let context = RunContext::new(adapter.name(), &self.settings);
        naming::check_directory_name("output name", &context.output_name)?;
        info!(
            source = %context.source_name,
            output = %context.series_dir().display(),
            "Starting run"
        );

        let mut series = TimeSeriesStore::open(context.clone(), &self.settings);
        let mut report = RunReport::new(context.source_name.clone());
        let mut catalog = match InstrumentCatalogStore::open(context.clone(), &self.settings) {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                error!(
                    source = %context.source_name,
                    path = %context.catalog_path().display(),
                    error = %e,
                    "Instrument catalog unavailable, recording time series only"
                );
                report.diagnostics.push(Diagnostic {
                    instrument: None,
                    date: None,
                    error: e,
                });
                None
            }
        };

        let aborted = self.process(adapter, &mut series, catalog.as_mut(), &mut report);

        report.diagnostics.extend(series.close());
        if let Some(Err(e)) = catalog.map(InstrumentCatalogStore::close) {
            report.diagnostics.push(Diagnostic {
                instrument: None,
                date: None,
                error: e,
            });
        }

        if let Some(e) = aborted {
            warn!(source = %context.source_name, error = %e, "Run aborted");
            return Err(e);
        }

        info!(
            source = %report.source_name,
            received = report.received,
            written = report.written,
            duplicates = report.duplicates_skipped,
            catalog_rows = report.catalog_rows,
            problems = report.diagnostics.len(),
            "Finished run"
        );
        Ok(report)
    }

    /// Feed every observation to both stores. Returns the error that aborted
    /// the run, if any.
    fn process(
        &self,
        adapter: &mut dyn SourceAdapter,
        series: &mut TimeSeriesStore,
        mut catalog: Option<&mut InstrumentCatalogStore>,
        report: &mut RunReport,
    ) -> Option<CoreError> {
        for item in adapter.observations() {
            report.received += 1;

            let raw = match item {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, "Source yielded an unusable item");
                    report.diagnostics.push(Diagnostic {
                        instrument: None,
                        date: None,
                        error: e,
                    });
                    continue;
                }
            };

            let instrument = raw.instrument_key.clone().or_else(|| raw.name.clone());
            let date = raw.date.clone();
            let obs = match PriceObservation::try_from(raw) {
                Ok(obs) => obs,
                Err(e) if self.settings.strict_schema => return Some(e),
                Err(e) => {
                    warn!(error = %e, "Dropped invalid observation");
                    report.diagnostics.push(Diagnostic { instrument, date, error: e });
                    continue;
                }
            };

            match series.record(&obs) {
                Ok(RecordOutcome::Written) => report.written += 1,
                Ok(RecordOutcome::SkippedDuplicate) => report.duplicates_skipped += 1,
                Err(e) => {
                    if e.is_per_record() {
                        warn!(instrument = %obs.instrument_key, date = %obs.date_key(), error = %e, "Dropped observation");
                    } else {
                        error!(instrument = %obs.instrument_key, date = %obs.date_key(), error = %e, "Series unavailable, observation dropped");
                    }
                    report.diagnostics.push(Diagnostic {
                        instrument: Some(obs.instrument_key.clone()),
                        date: Some(obs.date_key()),
                        error: e,
                    });
                    continue;
                }
            }

            let Some(catalog) = catalog.as_deref_mut() else {
                continue;
            };
            match catalog.record(&obs) {
                Ok(true) => report.catalog_rows += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(instrument = %obs.instrument_key, error = %e, "Instrument not added to catalog");
                    report.diagnostics.push(Diagnostic {
                        instrument: Some(obs.instrument_key.clone()),
                        date: None,
                        error: e,
                    });
                }
            }
        }
        None
    }
}
