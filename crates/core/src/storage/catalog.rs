use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::errors::CoreError;
use crate::models::instrument::{identity_of, InstrumentCatalogEntry};
use crate::models::observation::PriceObservation;
use crate::models::run::RunContext;
use crate::models::settings::{CatalogMode, Settings};

/// Fixed first line of every catalog file.
pub const CATALOG_HEADER: &str = "ticker symbol;isin;security name;currency;note;\n";

/// Field delimiter of catalog rows.
pub const CATALOG_DELIMITER: u8 = b';';

/// The per-source instrument catalog: one CSV row per distinct instrument,
/// importable by the portfolio tool alongside the JSON feeds.
///
/// Only the first observation of an identity key produces a row; later ones
/// are dropped even if their descriptive fields differ.
pub struct InstrumentCatalogStore {
    path: PathBuf,
    context: RunContext,
    writer: Option<csv::Writer<File>>,
    recorded: HashSet<String>,
}

impl InstrumentCatalogStore {
    /// Open (or create) the catalog of the run's source grouping.
    ///
    /// In `History` mode the identity keys already present in the file are
    /// treated as recorded, so no instrument is listed twice over the file's
    /// lifetime. In `Snapshot` mode the file is recreated empty.
    pub fn open(context: RunContext, settings: &Settings) -> Result<Self, CoreError> {
        let path = context.catalog_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let (file, recorded) = match settings.catalog_mode {
            CatalogMode::Snapshot => {
                let mut file = File::create(&path)?;
                file.write_all(CATALOG_HEADER.as_bytes())?;
                (file, HashSet::new())
            }
            CatalogMode::History => {
                let existing = if path.exists() { fs::read(&path)? } else { Vec::new() };
                let recorded = recorded_identities(&existing, &path)?;
                let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
                if existing.is_empty() {
                    file.write_all(CATALOG_HEADER.as_bytes())?;
                } else if existing.last() != Some(&b'\n') {
                    file.write_all(b"\n")?;
                }
                (file, recorded)
            }
        };

        info!(
            source = %context.source_name,
            path = %path.display(),
            known = recorded.len(),
            "Opened instrument catalog"
        );

        let writer = csv::WriterBuilder::new()
            .delimiter(CATALOG_DELIMITER)
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);

        Ok(Self {
            path,
            context,
            writer: Some(writer),
            recorded,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a row for this identity key exists (or was written this run).
    pub fn is_recorded(&self, identity_key: &str) -> bool {
        self.recorded.contains(identity_key)
    }

    /// Write the catalog row for an observation's instrument unless it is
    /// already listed. Returns whether a row was written.
    pub fn record(&mut self, obs: &PriceObservation) -> Result<bool, CoreError> {
        let feed_url = self.context.feed_url(&obs.instrument_key);
        let entry = InstrumentCatalogEntry::from_observation(obs, &feed_url)?;
        let key = entry.identity_key().unwrap_or_default().to_string();

        if !self.recorded.insert(key) {
            debug!(instrument = %obs.instrument_key, "Ignored item, it is already recorded in instruments");
            return Ok(false);
        }

        let writer = self.writer.as_mut().ok_or_else(|| {
            CoreError::FileIO(format!("catalog {} is already closed", self.path.display()))
        })?;
        writer.write_record(entry.to_record())?;
        Ok(true)
    }

    /// Flush and close the catalog file.
    pub fn close(mut self) -> Result<(), CoreError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for InstrumentCatalogStore {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                error!(path = %self.path.display(), error = %e, "Failed to flush instrument catalog");
            }
        }
    }
}

/// Identity keys of the rows in an existing catalog file.
///
/// Rows are read as bytes and the identity cells decoded lossily, so a cell
/// in a legacy encoding elsewhere in the row does not make the file unreadable.
fn recorded_identities(contents: &[u8], path: &Path) -> Result<HashSet<String>, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(CATALOG_DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(contents);

    let mut recorded = HashSet::new();
    for row in reader.byte_records() {
        let row = row.map_err(|e| CoreError::Csv(format!("{}: {e}", path.display())))?;
        let ticker = row.get(0).map(String::from_utf8_lossy);
        let isin = row.get(1).map(String::from_utf8_lossy);
        if let Some(key) = identity_of(ticker.as_deref(), isin.as_deref()) {
            recorded.insert(key.to_string());
        }
    }
    Ok(recorded)
}
