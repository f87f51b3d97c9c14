use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::errors::CoreError;
use crate::models::observation::RawObservation;

use super::traits::{ObservationStream, SourceAdapter};

/// Adapter reading one JSON object per line (NDJSON) from a file.
///
/// This is the hand-off format for scrapers that run as separate programs.
/// Blank lines are skipped. A line that is not a valid observation object
/// yields an error item and reading continues with the next line.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    name: String,
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    fn error(&self, message: String) -> CoreError {
        CoreError::Source {
            source_name: self.name.clone(),
            message,
        }
    }
}

impl SourceAdapter for JsonLinesSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn observations(&mut self) -> ObservationStream<'_> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                let err = self.error(format!("cannot open {}: {e}", self.path.display()));
                return Box::new(std::iter::once(Err(err)));
            }
        };

        let lines = BufReader::new(file).lines().enumerate();
        Box::new(lines.filter_map(move |(idx, line)| {
            let line_no = idx + 1;
            match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(
                    serde_json::from_str::<RawObservation>(&line)
                        .map_err(|e| self.error(format!("line {line_no}: {e}"))),
                ),
                Err(e) => Some(Err(self.error(format!("line {line_no}: {e}")))),
            }
        }))
    }
}
