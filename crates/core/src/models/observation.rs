use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

use super::instrument::identity_of;

/// Date format used for both the stored `date` values and the duplicate check.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A price observation as yielded by a source adapter, before validation.
///
/// Every field is optional so that adapters can hand over whatever the upstream
/// site offered; `PriceObservation::try_from` decides whether it is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Free-text label the storage file name is derived from.
    #[serde(default, alias = "file_name")]
    pub instrument_key: Option<String>,

    /// Long label; used as the instrument key when no explicit key was given.
    #[serde(default)]
    pub name: Option<String>,

    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub price: Option<f64>,

    #[serde(default)]
    pub volume: Option<f64>,

    #[serde(default)]
    pub day_low: Option<f64>,

    #[serde(default)]
    pub day_high: Option<f64>,

    #[serde(default, alias = "long_name")]
    pub security_name: Option<String>,

    #[serde(default, alias = "symbol")]
    pub ticker_symbol: Option<String>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub start_date: Option<String>,

    #[serde(default)]
    pub isin: Option<String>,
}

/// Canonical, validated price observation for one instrument on one day.
///
/// Optional fields stay `None` when the source did not provide them, so a
/// missing volume is never confused with a volume of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Free-text label (fund, bond, portfolio name or ISIN).
    pub instrument_key: String,

    /// Trading day (no time component). Natural key within one series.
    pub date: NaiveDate,

    /// Unit-normalized price. Not range-checked here.
    pub price: f64,

    pub volume: Option<f64>,
    pub day_low: Option<f64>,
    pub day_high: Option<f64>,

    // Descriptive metadata, only consumed by the instrument catalog.
    pub security_name: Option<String>,
    pub ticker_symbol: Option<String>,
    pub currency: Option<String>,
    pub start_date: Option<String>,
    pub isin: Option<String>,
}

impl PriceObservation {
    pub fn new(instrument_key: impl Into<String>, date: NaiveDate, price: f64) -> Self {
        Self {
            instrument_key: instrument_key.into(),
            date,
            price,
            volume: None,
            day_low: None,
            day_high: None,
            security_name: None,
            ticker_symbol: None,
            currency: None,
            start_date: None,
            isin: None,
        }
    }

    pub fn with_ticker_symbol(mut self, ticker_symbol: impl Into<String>) -> Self {
        self.ticker_symbol = Some(ticker_symbol.into());
        self
    }

    pub fn with_isin(mut self, isin: impl Into<String>) -> Self {
        self.isin = Some(isin.into());
        self
    }

    pub fn with_security_name(mut self, security_name: impl Into<String>) -> Self {
        self.security_name = Some(security_name.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Attach the intraday fields (volume, low, high). NaN and infinite
    /// values count as absent.
    pub fn with_day_range(mut self, volume: Option<f64>, day_low: Option<f64>, day_high: Option<f64>) -> Self {
        self.volume = finite(volume);
        self.day_low = finite(day_low);
        self.day_high = finite(day_high);
        self
    }

    /// The date as it is written to and compared against the time-series file.
    pub fn date_key(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    /// Catalog identity: the ticker symbol, falling back to the ISIN.
    pub fn identity_key(&self) -> Option<&str> {
        identity_of(self.ticker_symbol.as_deref(), self.isin.as_deref())
    }
}

impl TryFrom<RawObservation> for PriceObservation {
    type Error = CoreError;

    fn try_from(raw: RawObservation) -> Result<Self, Self::Error> {
        let instrument_key = raw
            .instrument_key
            .or(raw.name)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CoreError::Schema("missing instrument key".into()))?;

        let date_str = raw.date.ok_or_else(|| {
            CoreError::Schema(format!("missing date for instrument {instrument_key}"))
        })?;
        let date = NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT).map_err(|e| {
            CoreError::Schema(format!(
                "invalid date {date_str:?} for instrument {instrument_key}: {e}"
            ))
        })?;

        let price = raw.price.ok_or_else(|| {
            CoreError::Schema(format!(
                "missing price for instrument {instrument_key} on {date_str}"
            ))
        })?;
        if !price.is_finite() {
            return Err(CoreError::Schema(format!(
                "non-finite price {price} for instrument {instrument_key} on {date_str}"
            )));
        }

        Ok(Self {
            instrument_key,
            date,
            price,
            volume: finite(raw.volume),
            day_low: finite(raw.day_low),
            day_high: finite(raw.day_high),
            security_name: raw.security_name,
            ticker_symbol: raw.ticker_symbol,
            currency: raw.currency,
            start_date: raw.start_date,
            isin: raw.isin,
        })
    }
}

/// Back to the loose shape, e.g. to feed validated records through a source.
impl From<&PriceObservation> for RawObservation {
    fn from(obs: &PriceObservation) -> Self {
        Self {
            instrument_key: Some(obs.instrument_key.clone()),
            name: None,
            date: Some(obs.date_key()),
            price: Some(obs.price),
            volume: obs.volume,
            day_low: obs.day_low,
            day_high: obs.day_high,
            security_name: obs.security_name.clone(),
            ticker_symbol: obs.ticker_symbol.clone(),
            currency: obs.currency.clone(),
            start_date: obs.start_date.clone(),
            isin: obs.isin.clone(),
        }
    }
}

/// The subset of an observation persisted in a time-series file.
/// Field order here is the key order in the written JSON objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub price: f64,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_high: Option<f64>,
}

impl From<&PriceObservation> for TimeSeriesPoint {
    fn from(obs: &PriceObservation) -> Self {
        Self {
            price: obs.price,
            date: obs.date_key(),
            volume: finite(obs.volume),
            day_low: finite(obs.day_low),
            day_high: finite(obs.day_high),
        }
    }
}

/// JSON has no NaN or infinity; such optional values are dropped.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
