use serde::Deserialize;
use serde_json::value::RawValue;
use std::collections::HashSet;
use std::path::Path;

use crate::errors::CoreError;
use crate::models::observation::TimeSeriesPoint;

/// Opening bytes of a freshly created series file.
pub const ARRAY_OPEN: &[u8] = b"[";

/// Closing bytes written when a series file is finalized.
pub const ARRAY_CLOSE: &[u8] = b"\n]";

/// Bytes written before an element, depending on whether it is the first one.
pub fn element_prefix(first: bool) -> &'static [u8] {
    if first {
        b"\n"
    } else {
        b",\n"
    }
}

/// Serialize one time-series element (indented object).
pub fn render_element(point: &TimeSeriesPoint) -> Result<String, CoreError> {
    serde_json::to_string_pretty(point)
        .map_err(|e| CoreError::Serialization(format!("Failed to serialize {}: {e}", point.date)))
}

/// Render a whole series file from already-serialized elements.
///
/// Layout:
/// ```text
/// [
/// {element},
/// {element}
/// ]
/// ```
/// Appending to a file produced here and closing it again yields the same
/// bytes as rendering all elements at once.
pub fn render_array<'a>(elements: impl IntoIterator<Item = &'a str>) -> Vec<u8> {
    let mut buf = Vec::from(ARRAY_OPEN);
    for (idx, element) in elements.into_iter().enumerate() {
        buf.extend_from_slice(element_prefix(idx == 0));
        buf.extend_from_slice(element.as_bytes());
    }
    buf.extend_from_slice(ARRAY_CLOSE);
    buf
}

/// Parsed content of a series file that already exists on disk.
#[derive(Debug)]
pub struct ExistingSeries {
    /// Elements exactly as they appear in the file.
    pub elements: Vec<Box<RawValue>>,
    /// `date` of every element.
    pub dates: HashSet<String>,
}

#[derive(Deserialize)]
struct StoredDate {
    date: String,
}

/// Parse a series file. Anything but a JSON array of objects carrying a
/// string `date` is reported as `CorruptExistingFile`.
pub fn parse_series(bytes: &[u8], path: &Path) -> Result<ExistingSeries, CoreError> {
    let corrupt = |reason: String| CoreError::CorruptExistingFile {
        path: path.display().to_string(),
        reason,
    };

    let elements: Vec<Box<RawValue>> =
        serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;

    let mut dates = HashSet::with_capacity(elements.len());
    for (idx, element) in elements.iter().enumerate() {
        let stored: StoredDate = serde_json::from_str(element.get())
            .map_err(|e| corrupt(format!("element {idx} has no usable date: {e}")))?;
        dates.insert(stored.date);
    }

    Ok(ExistingSeries { elements, dates })
}

/// Length to truncate a parsed series file to so that it can be reopened for
/// appending: everything up to the last element (or the opening bracket),
/// dropping the closing bracket and the whitespace around it.
pub fn append_offset(bytes: &[u8], path: &Path) -> Result<usize, CoreError> {
    let close = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .filter(|&idx| bytes[idx] == b']')
        .ok_or_else(|| CoreError::CorruptExistingFile {
            path: path.display().to_string(),
            reason: "file does not end with a closing bracket".into(),
        })?;

    let keep = bytes[..close]
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|idx| idx + 1)
        .unwrap_or(0);

    Ok(keep)
}
