use serde_json::value::RawValue;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::errors::CoreError;
use crate::models::observation::{PriceObservation, TimeSeriesPoint};
use crate::models::run::{Diagnostic, RunContext};
use crate::models::settings::{DuplicatePolicy, Settings, WriteMode};

use super::format;
use super::naming::sanitize_file_name;

/// What `TimeSeriesStore::record` did with an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Written,
    /// The date was already stored (on disk or earlier in this run).
    SkippedDuplicate,
}

/// Per-instrument, append-only JSON array files for one run.
///
/// Files are opened lazily on the first observation of each instrument and
/// finalized by `close`. Dropping the store without closing it finalizes the
/// files as well, so a file is never left without its closing bracket.
///
/// Every instrument is isolated: a corrupt or unreadable file only fails the
/// records of that instrument.
pub struct TimeSeriesStore {
    context: RunContext,
    write_mode: WriteMode,
    duplicate_policy: DuplicatePolicy,
    /// Keyed by sanitized instrument name.
    series: HashMap<String, Slot>,
}

enum Slot {
    Open(SeriesHandle),
    /// Opening failed; later records of the instrument fail the same way.
    Failed { error: FailedOpen },
}

struct FailedOpen {
    path: String,
    reason: String,
    corrupt: bool,
}

impl FailedOpen {
    fn from_error(path: &Path, error: &CoreError) -> Self {
        match error {
            CoreError::CorruptExistingFile { path, reason } => Self {
                path: path.clone(),
                reason: reason.clone(),
                corrupt: true,
            },
            other => Self {
                path: path.display().to_string(),
                reason: other.to_string(),
                corrupt: false,
            },
        }
    }

    fn to_error(&self) -> CoreError {
        if self.corrupt {
            CoreError::CorruptExistingFile {
                path: self.path.clone(),
                reason: self.reason.clone(),
            }
        } else {
            CoreError::FileIO(format!("{} is unavailable: {}", self.path, self.reason))
        }
    }
}

struct SeriesHandle {
    instrument: String,
    path: PathBuf,
    dates: HashSet<String>,
    sink: SeriesSink,
}

enum SeriesSink {
    /// Elements are kept in memory and the file is replaced at close.
    Buffered {
        existing: Vec<Box<RawValue>>,
        appended: Vec<String>,
        existed: bool,
    },
    /// The file is open for appending with its closing bracket cut off.
    Appending {
        writer: BufWriter<File>,
        first_item: bool,
    },
}

impl TimeSeriesStore {
    /// Start a run. Nothing touches the disk until the first `record`.
    pub fn open(context: RunContext, settings: &Settings) -> Self {
        Self {
            context,
            write_mode: settings.write_mode,
            duplicate_policy: settings.duplicate_policy,
            series: HashMap::new(),
        }
    }

    /// Append an observation to its instrument's series unless its date is
    /// already stored.
    pub fn record(&mut self, obs: &PriceObservation) -> Result<RecordOutcome, CoreError> {
        let policy = self.duplicate_policy;
        let key = sanitize_file_name(&obs.instrument_key);
        let handle = self.handle_for(key, &obs.instrument_key)?;

        let date = obs.date_key();
        if handle.dates.contains(&date) {
            return match policy {
                DuplicatePolicy::Skip => {
                    debug!(instrument = %obs.instrument_key, %date, "Ignored item because it is already stored");
                    Ok(RecordOutcome::SkippedDuplicate)
                }
                DuplicatePolicy::Reject => Err(CoreError::DuplicateDate {
                    instrument: obs.instrument_key.clone(),
                    date,
                }),
            };
        }

        let element = format::render_element(&TimeSeriesPoint::from(obs))?;
        handle.sink.push(element)?;
        handle.dates.insert(date);
        Ok(RecordOutcome::Written)
    }

    /// Finalize every open file. Returns one diagnostic per file that could
    /// not be completed.
    pub fn close(mut self) -> Vec<Diagnostic> {
        self.finish_all()
    }

    fn handle_for(&mut self, key: String, instrument: &str) -> Result<&mut SeriesHandle, CoreError> {
        if !self.series.contains_key(&key) {
            let path = self.context.series_path(instrument);
            let slot = match SeriesHandle::open(instrument, path.clone(), self.write_mode) {
                Ok(handle) => Slot::Open(handle),
                Err(e) => {
                    error!(instrument, path = %path.display(), error = %e, "Cannot open time series");
                    Slot::Failed {
                        error: FailedOpen::from_error(&path, &e),
                    }
                }
            };
            self.series.insert(key.clone(), slot);
        }

        match self.series.get_mut(&key) {
            Some(Slot::Open(handle)) => Ok(handle),
            Some(Slot::Failed { error }) => Err(error.to_error()),
            None => Err(CoreError::FileIO(format!("no series slot for {key}"))),
        }
    }

    fn finish_all(&mut self) -> Vec<Diagnostic> {
        let mut failures = Vec::new();
        for (_, slot) in self.series.drain() {
            let Slot::Open(handle) = slot else { continue };
            let instrument = handle.instrument.clone();
            let path = handle.path.clone();
            if let Err(e) = handle.finish() {
                error!(%instrument, path = %path.display(), error = %e, "Failed to finalize time series");
                failures.push(Diagnostic {
                    instrument: Some(instrument),
                    date: None,
                    error: e,
                });
            }
        }
        failures
    }
}

impl Drop for TimeSeriesStore {
    fn drop(&mut self) {
        if !self.series.is_empty() {
            self.finish_all();
        }
    }
}

impl SeriesHandle {
    fn open(instrument: &str, path: PathBuf, mode: WriteMode) -> Result<Self, CoreError> {
        let (dates, sink) = if path.exists() {
            let bytes = fs::read(&path)?;
            let existing = format::parse_series(&bytes, &path)?;
            let sink = match mode {
                WriteMode::AtomicRewrite => SeriesSink::Buffered {
                    existing: existing.elements,
                    appended: Vec::new(),
                    existed: true,
                },
                WriteMode::InPlaceAppend => {
                    let offset = format::append_offset(&bytes, &path)?;
                    let file = OpenOptions::new().append(true).open(&path)?;
                    file.set_len(offset as u64)?;
                    SeriesSink::Appending {
                        writer: BufWriter::new(file),
                        first_item: existing.elements.is_empty(),
                    }
                }
            };
            debug!(instrument, path = %path.display(), stored = existing.dates.len(), "Reopened time series");
            (existing.dates, sink)
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let sink = match mode {
                WriteMode::AtomicRewrite => SeriesSink::Buffered {
                    existing: Vec::new(),
                    appended: Vec::new(),
                    existed: false,
                },
                WriteMode::InPlaceAppend => {
                    let mut writer = BufWriter::new(File::create(&path)?);
                    writer.write_all(format::ARRAY_OPEN)?;
                    SeriesSink::Appending {
                        writer,
                        first_item: true,
                    }
                }
            };
            info!(instrument, path = %path.display(), "Creating time series");
            (HashSet::new(), sink)
        };

        Ok(Self {
            instrument: instrument.to_string(),
            path,
            dates,
            sink,
        })
    }

    fn finish(self) -> Result<(), CoreError> {
        match self.sink {
            SeriesSink::Appending { mut writer, .. } => {
                writer.write_all(format::ARRAY_CLOSE)?;
                writer.flush()?;
                Ok(())
            }
            SeriesSink::Buffered {
                existing,
                appended,
                existed,
            } => {
                if existed && appended.is_empty() {
                    return Ok(());
                }
                let elements = existing
                    .iter()
                    .map(|raw| raw.get())
                    .chain(appended.iter().map(String::as_str));
                replace_file(&self.path, &format::render_array(elements))
            }
        }
    }
}

impl SeriesSink {
    fn push(&mut self, element: String) -> Result<(), CoreError> {
        match self {
            SeriesSink::Buffered { appended, .. } => appended.push(element),
            SeriesSink::Appending { writer, first_item } => {
                writer.write_all(format::element_prefix(*first_item))?;
                writer.write_all(element.as_bytes())?;
                *first_item = false;
            }
        }
        Ok(())
    }
}

/// Write `contents` to a temp file next to `path` and rename it into place.
fn replace_file(path: &Path, contents: &[u8]) -> Result<(), CoreError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
