//! Command-line arguments for `pp-feed`.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ingest` | Record an NDJSON file of observations as one source run |
//! | `sanitize` | Print the file key of an instrument label |
//! | `feed-url` | Print the feed URL of an instrument |
//!
//! ```bash
//! pp-feed --base-dir data ingest --source bamosz bamosz.ndjson
//! pp-feed sanitize "Kiegyensúlyozott Portfólió"
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pp_feed_core::models::settings::{CatalogMode, DuplicatePolicy, WriteMode};

/// Append-only price feeds for pension funds and government bonds.
#[derive(Debug, Parser)]
#[command(name = "pp-feed", author, version, about)]
pub struct Cli {
    /// JSON settings file. Flags override its values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory of the feeds and catalogs.
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Log debug output (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record observations from an NDJSON file.
    Ingest(IngestArgs),
    /// Print the sanitized file key of a label.
    Sanitize(SanitizeArgs),
    /// Print the feed URL of an instrument.
    FeedUrl(FeedUrlArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Source name; selects the output directory and catalog.
    #[arg(long)]
    pub source: String,

    /// One JSON observation per line.
    pub input: PathBuf,

    #[arg(long, value_enum)]
    pub write_mode: Option<WriteModeArg>,

    #[arg(long, value_enum)]
    pub on_duplicate: Option<DuplicateArg>,

    #[arg(long, value_enum)]
    pub catalog: Option<CatalogArg>,

    /// Abort on the first invalid observation.
    #[arg(long)]
    pub strict: bool,

    /// Exit with an error when the run reported any problem.
    #[arg(long)]
    pub deny_diagnostics: bool,
}

#[derive(Debug, Args)]
pub struct SanitizeArgs {
    pub label: String,
}

#[derive(Debug, Args)]
pub struct FeedUrlArgs {
    #[arg(long)]
    pub source: String,

    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WriteModeArg {
    AtomicRewrite,
    InPlaceAppend,
}

impl From<WriteModeArg> for WriteMode {
    fn from(value: WriteModeArg) -> Self {
        match value {
            WriteModeArg::AtomicRewrite => WriteMode::AtomicRewrite,
            WriteModeArg::InPlaceAppend => WriteMode::InPlaceAppend,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicateArg {
    Skip,
    Reject,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(value: DuplicateArg) -> Self {
        match value {
            DuplicateArg::Skip => DuplicatePolicy::Skip,
            DuplicateArg::Reject => DuplicatePolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatalogArg {
    History,
    Snapshot,
}

impl From<CatalogArg> for CatalogMode {
    fn from(value: CatalogArg) -> Self {
        match value {
            CatalogArg::History => CatalogMode::History,
            CatalogArg::Snapshot => CatalogMode::Snapshot,
        }
    }
}
