use std::path::{Path, PathBuf};

use crate::errors::CoreError;

/// Directory (under the base dir) holding the per-source instrument catalogs.
pub const CATALOG_DIR: &str = "instruments";

/// Turn a free-text instrument label into a filesystem- and URL-safe key.
///
/// Accented characters are transliterated to ASCII, the result is lower-cased,
/// and spaces and path separators become underscores:
/// `"Kiegyensúlyozott Portfólió"` → `"kiegyensulyozott_portfolio"`.
pub fn sanitize_file_name(label: &str) -> String {
    deunicode::deunicode(label)
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// `<base_dir>/<output_name>/<sanitized key>.json`
pub fn series_path(base_dir: &Path, output_name: &str, instrument_key: &str) -> PathBuf {
    base_dir
        .join(output_name)
        .join(format!("{}.json", sanitize_file_name(instrument_key)))
}

/// `<base_dir>/instruments/<output_name>.csv`
pub fn catalog_path(base_dir: &Path, output_name: &str) -> PathBuf {
    base_dir.join(CATALOG_DIR).join(format!("{output_name}.csv"))
}

/// Public URL of an instrument's time-series file. Uses the same
/// sanitization as `series_path`, so the two always point at the same file.
pub fn feed_url(feed_base_url: &str, output_name: &str, instrument_key: &str) -> String {
    format!(
        "{}/{}/{}.json",
        feed_base_url.trim_end_matches('/'),
        output_name,
        sanitize_file_name(instrument_key)
    )
}

/// Source names and alias targets become a directory and a file name under
/// the base dir, so they must be a single plain path component.
pub fn check_directory_name(kind: &str, name: &str) -> Result<(), CoreError> {
    let plain = !name.trim().is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != "..";
    if plain {
        Ok(())
    } else {
        Err(CoreError::Config(format!(
            "{kind} must be a plain directory name, got {name:?}"
        )))
    }
}
