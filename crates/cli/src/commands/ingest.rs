use serde::Serialize;

use pp_feed_core::models::run::RunReport;
use pp_feed_core::models::settings::Settings;
use pp_feed_core::sources::json_lines::JsonLinesSource;
use pp_feed_core::PriceFeed;

use crate::cli::IngestArgs;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct IngestSummary {
    source: String,
    received: usize,
    written: usize,
    duplicates_skipped: usize,
    catalog_rows: usize,
    diagnostics: Vec<String>,
}

impl From<&RunReport> for IngestSummary {
    fn from(report: &RunReport) -> Self {
        Self {
            source: report.source_name.clone(),
            received: report.received,
            written: report.written,
            duplicates_skipped: report.duplicates_skipped,
            catalog_rows: report.catalog_rows,
            diagnostics: report.diagnostics.iter().map(ToString::to_string).collect(),
        }
    }
}

pub fn run(mut settings: Settings, args: &IngestArgs) -> Result<(), CliError> {
    apply_overrides(&mut settings, args);

    let feed = PriceFeed::new(settings)?;
    let mut source = JsonLinesSource::new(&args.source, &args.input);
    let report = feed.ingest(&mut source)?;

    println!("{}", serde_json::to_string_pretty(&IngestSummary::from(&report))?);

    if args.deny_diagnostics && !report.is_clean() {
        return Err(CliError::Diagnostics {
            count: report.diagnostics.len(),
        });
    }
    Ok(())
}

/// Ingest flags win over the loaded settings; absent flags keep them.
pub fn apply_overrides(settings: &mut Settings, args: &IngestArgs) {
    if let Some(mode) = args.write_mode {
        settings.write_mode = mode.into();
    }
    if let Some(policy) = args.on_duplicate {
        settings.duplicate_policy = policy.into();
    }
    if let Some(mode) = args.catalog {
        settings.catalog_mode = mode.into();
    }
    if args.strict {
        settings.strict_schema = true;
    }
}
