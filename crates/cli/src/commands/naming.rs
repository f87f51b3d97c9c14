use pp_feed_core::models::settings::Settings;
use pp_feed_core::PriceFeed;

use crate::cli::{FeedUrlArgs, SanitizeArgs};
use crate::error::CliError;

pub fn sanitize(args: &SanitizeArgs) -> Result<(), CliError> {
    println!("{}", PriceFeed::sanitize(&args.label));
    Ok(())
}

pub fn feed_url(settings: Settings, args: &FeedUrlArgs) -> Result<(), CliError> {
    let feed = PriceFeed::new(settings)?;
    println!("{}", feed.feed_url(&args.source, &args.label));
    Ok(())
}
