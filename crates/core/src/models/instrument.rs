use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

use super::observation::PriceObservation;

/// Prefix of the catalog `note` column; the rest is the feed URL.
pub const NOTE_PREFIX: &str = "JSON feed url: ";

/// One row of an instrument catalog CSV.
///
/// Field order matches the catalog header
/// `ticker symbol;isin;security name;currency;note;`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentCatalogEntry {
    pub ticker_symbol: Option<String>,
    pub isin: Option<String>,
    pub security_name: Option<String>,
    pub currency: Option<String>,
    pub note: String,
}

impl InstrumentCatalogEntry {
    /// Derive the catalog row for an observation.
    /// Fails when the observation has neither a ticker symbol nor an ISIN.
    pub fn from_observation(obs: &PriceObservation, feed_url: &str) -> Result<Self, CoreError> {
        if obs.identity_key().is_none() {
            return Err(CoreError::Schema(format!(
                "instrument {} has neither ticker symbol nor ISIN",
                obs.instrument_key
            )));
        }

        Ok(Self {
            ticker_symbol: obs.ticker_symbol.clone(),
            isin: obs.isin.clone(),
            security_name: obs.security_name.clone(),
            currency: obs.currency.clone(),
            note: format!("{NOTE_PREFIX}{feed_url}"),
        })
    }

    /// Dedup key of the row: ticker symbol, else ISIN.
    pub fn identity_key(&self) -> Option<&str> {
        identity_of(self.ticker_symbol.as_deref(), self.isin.as_deref())
    }

    /// Cells in header order; absent values become empty cells.
    pub fn to_record(&self) -> [&str; 5] {
        [
            self.ticker_symbol.as_deref().unwrap_or(""),
            self.isin.as_deref().unwrap_or(""),
            self.security_name.as_deref().unwrap_or(""),
            self.currency.as_deref().unwrap_or(""),
            self.note.as_str(),
        ]
    }
}

/// Identity of a catalog row given its first two cells.
pub fn identity_of<'a>(ticker_symbol: Option<&'a str>, isin: Option<&'a str>) -> Option<&'a str> {
    ticker_symbol
        .filter(|t| !t.trim().is_empty())
        .or_else(|| isin.filter(|i| !i.trim().is_empty()))
}
