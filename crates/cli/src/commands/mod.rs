mod ingest;
mod naming;

use pp_feed_core::models::settings::Settings;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub fn run(cli: &Cli) -> Result<(), CliError> {
    let settings = load_settings(cli)?;

    match &cli.command {
        Command::Ingest(args) => ingest::run(settings, args),
        Command::Sanitize(args) => naming::sanitize(args),
        Command::FeedUrl(args) => naming::feed_url(settings, args),
    }
}

/// Settings from `--config` (or defaults) with global flags applied.
fn load_settings(cli: &Cli) -> Result<Settings, CliError> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from_file(path)?,
        None => Settings::default(),
    };
    if let Some(base_dir) = &cli.base_dir {
        settings.base_dir = base_dir.clone();
    }
    Ok(settings)
}
