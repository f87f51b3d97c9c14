use chrono::NaiveDate;
use pp_feed_core::errors::CoreError;
use pp_feed_core::models::instrument::{InstrumentCatalogEntry, NOTE_PREFIX};
use pp_feed_core::models::observation::{PriceObservation, RawObservation, TimeSeriesPoint};
use pp_feed_core::models::run::RunContext;
use pp_feed_core::models::settings::{
    CatalogMode, DuplicatePolicy, Settings, WriteMode, DEFAULT_FEED_BASE_URL,
};
use pp_feed_core::storage::naming::{
    catalog_path, check_directory_name, feed_url, sanitize_file_name, series_path,
};
use std::path::{Path, PathBuf};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn raw(key: &str, date: &str, price: f64) -> RawObservation {
    RawObservation {
        instrument_key: Some(key.into()),
        date: Some(date.into()),
        price: Some(price),
        ..RawObservation::default()
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Naming
// ═══════════════════════════════════════════════════════════════════

mod naming {
    use super::*;

    #[test]
    fn transliterates_and_lowercases() {
        assert_eq!(
            sanitize_file_name("Kiegyensúlyozott Portfólió"),
            "kiegyensulyozott_portfolio"
        );
    }

    #[test]
    fn hungarian_double_accents() {
        assert_eq!(sanitize_file_name("Növekedési Őrző Műszaki"), "novekedesi_orzo_muszaki");
    }

    #[test]
    fn slashes_become_underscores() {
        assert_eq!(sanitize_file_name("MÁPP/2027 J"), "mapp_2027_j");
    }

    #[test]
    fn plain_ascii_is_only_lowercased() {
        assert_eq!(sanitize_file_name("HU0000702709"), "hu0000702709");
        assert_eq!(sanitize_file_name("dkj_250115"), "dkj_250115");
    }

    #[test]
    fn deterministic_across_calls() {
        let label = "Kiegyensúlyozott Portfólió";
        let first = sanitize_file_name(label);
        for _ in 0..10 {
            assert_eq!(sanitize_file_name(label).as_bytes(), first.as_bytes());
        }
    }

    #[test]
    fn plain_directory_names() {
        for name in ["otp", "mak_historical", "bamosz-2024"] {
            assert!(check_directory_name("source name", name).is_ok(), "{name}");
        }
        for name in ["", " ", ".", "..", "../otp", "otp/daily", "otp\\daily"] {
            let err = check_directory_name("source name", name).unwrap_err();
            assert!(matches!(err, CoreError::Config(_)), "{name:?}");
        }
    }

    #[test]
    fn series_path_layout() {
        let path = series_path(Path::new("/data"), "otp_nyugdij", "Klasszikus Portfólió");
        assert_eq!(path, PathBuf::from("/data/otp_nyugdij/klasszikus_portfolio.json"));
    }

    #[test]
    fn catalog_path_layout() {
        let path = catalog_path(Path::new("/data"), "mak");
        assert_eq!(path, PathBuf::from("/data/instruments/mak.csv"));
    }

    #[test]
    fn feed_url_uses_same_key_as_file() {
        let url = feed_url(DEFAULT_FEED_BASE_URL, "bamosz", "Kiegyensúlyozott Portfólió");
        assert_eq!(
            url,
            "https://cdn.statically.io/gh/havasd/pp-data/main/bamosz/kiegyensulyozott_portfolio.json"
        );
    }

    #[test]
    fn feed_url_ignores_trailing_slash_on_base() {
        let url = feed_url("https://example.org/feeds/", "mak", "DKJ250115");
        assert_eq!(url, "https://example.org/feeds/mak/dkj250115.json");
    }
}

// ═══════════════════════════════════════════════════════════════════
//  RawObservation → PriceObservation
// ═══════════════════════════════════════════════════════════════════

mod validation {
    use super::*;

    #[test]
    fn minimal_record_is_accepted() {
        let obs = PriceObservation::try_from(raw("ABC", "2024-01-01", 1.23)).unwrap();
        assert_eq!(obs.instrument_key, "ABC");
        assert_eq!(obs.date, d(2024, 1, 1));
        assert_eq!(obs.price, 1.23);
        assert!(obs.volume.is_none());
        assert!(obs.ticker_symbol.is_none());
    }

    #[test]
    fn zero_price_is_kept() {
        let obs = PriceObservation::try_from(raw("ABC", "2024-01-01", 0.0)).unwrap();
        assert_eq!(obs.price, 0.0);
    }

    #[test]
    fn missing_key_is_schema_error() {
        let mut r = raw("ABC", "2024-01-01", 1.0);
        r.instrument_key = None;
        let err = PriceObservation::try_from(r).unwrap_err();
        assert!(matches!(err, CoreError::Schema(_)));
    }

    #[test]
    fn blank_key_is_schema_error() {
        let err = PriceObservation::try_from(raw("   ", "2024-01-01", 1.0)).unwrap_err();
        assert!(matches!(err, CoreError::Schema(_)));
    }

    #[test]
    fn name_is_used_when_key_missing() {
        let mut r = raw("ABC", "2024-01-01", 1.0);
        r.instrument_key = None;
        r.name = Some("HU0000702709".into());
        let obs = PriceObservation::try_from(r).unwrap();
        assert_eq!(obs.instrument_key, "HU0000702709");
    }

    #[test]
    fn missing_date_is_schema_error() {
        let mut r = raw("ABC", "2024-01-01", 1.0);
        r.date = None;
        let err = PriceObservation::try_from(r).unwrap_err();
        assert!(err.to_string().contains("missing date"));
    }

    #[test]
    fn malformed_date_is_schema_error() {
        let err = PriceObservation::try_from(raw("ABC", "2024.01.01.", 1.0)).unwrap_err();
        assert!(matches!(err, CoreError::Schema(_)));
        let err = PriceObservation::try_from(raw("ABC", "2024-02-30", 1.0)).unwrap_err();
        assert!(matches!(err, CoreError::Schema(_)));
    }

    #[test]
    fn missing_price_is_schema_error() {
        let mut r = raw("ABC", "2024-01-01", 1.0);
        r.price = None;
        let err = PriceObservation::try_from(r).unwrap_err();
        assert!(err.to_string().contains("missing price"));
    }

    #[test]
    fn nan_price_is_schema_error() {
        let err = PriceObservation::try_from(raw("ABC", "2024-01-01", f64::NAN)).unwrap_err();
        assert!(matches!(err, CoreError::Schema(_)));
    }

    #[test]
    fn negative_price_is_not_rejected() {
        let obs = PriceObservation::try_from(raw("ABC", "2024-01-01", -0.5)).unwrap();
        assert_eq!(obs.price, -0.5);
    }

    #[test]
    fn deserializes_scraper_field_names() {
        let json = r#"{
            "file_name": "Klasszikus",
            "date": "2024-03-15",
            "price": 3.456789,
            "symbol": "OTPNY_KLASS",
            "long_name": "OTP Klasszikus portfólió",
            "currency": "HUF"
        }"#;
        let r: RawObservation = serde_json::from_str(json).unwrap();
        let obs = PriceObservation::try_from(r).unwrap();
        assert_eq!(obs.instrument_key, "Klasszikus");
        assert_eq!(obs.ticker_symbol.as_deref(), Some("OTPNY_KLASS"));
        assert_eq!(obs.security_name.as_deref(), Some("OTP Klasszikus portfólió"));
        assert_eq!(obs.currency.as_deref(), Some("HUF"));
        assert_eq!(obs.price, 3.456789);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{"instrument_key":"A","date":"2024-01-01","price":1.0,"extra":true}"#;
        let r: RawObservation = serde_json::from_str(json).unwrap();
        assert!(PriceObservation::try_from(r).is_ok());
    }

    #[test]
    fn non_finite_optional_fields_become_absent() {
        let obs = PriceObservation::try_from(RawObservation {
            volume: Some(f64::NAN),
            day_low: Some(f64::INFINITY),
            day_high: Some(2.0),
            ..raw("ABC", "2024-01-01", 1.0)
        })
        .unwrap();
        assert_eq!(obs.volume, None);
        assert_eq!(obs.day_low, None);
        assert_eq!(obs.day_high, Some(2.0));
    }

    #[test]
    fn round_trips_through_raw() {
        let obs = PriceObservation::new("ABC", d(2024, 5, 6), 9.5)
            .with_isin("HU0000000001")
            .with_day_range(Some(100.0), Some(9.0), Some(10.0));
        let back = PriceObservation::try_from(RawObservation::from(&obs)).unwrap();
        assert_eq!(back, obs);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  PriceObservation helpers
// ═══════════════════════════════════════════════════════════════════

mod observation {
    use super::*;

    #[test]
    fn date_key_is_iso() {
        let obs = PriceObservation::new("A", d(2024, 1, 5), 1.0);
        assert_eq!(obs.date_key(), "2024-01-05");
    }

    #[test]
    fn identity_prefers_ticker() {
        let obs = PriceObservation::new("A", d(2024, 1, 5), 1.0)
            .with_ticker_symbol("TICK")
            .with_isin("HU1");
        assert_eq!(obs.identity_key(), Some("TICK"));
    }

    #[test]
    fn identity_falls_back_to_isin() {
        let obs = PriceObservation::new("A", d(2024, 1, 5), 1.0).with_isin("HU1");
        assert_eq!(obs.identity_key(), Some("HU1"));
    }

    #[test]
    fn blank_ticker_falls_back_to_isin() {
        let obs = PriceObservation::new("A", d(2024, 1, 5), 1.0)
            .with_ticker_symbol("")
            .with_isin("HU1");
        assert_eq!(obs.identity_key(), Some("HU1"));
    }

    #[test]
    fn no_identity() {
        let obs = PriceObservation::new("A", d(2024, 1, 5), 1.0);
        assert_eq!(obs.identity_key(), None);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  TimeSeriesPoint
// ═══════════════════════════════════════════════════════════════════

mod time_series_point {
    use super::*;

    #[test]
    fn absent_fields_are_omitted() {
        let obs = PriceObservation::new("ABC", d(2024, 1, 1), 1.23);
        let json = serde_json::to_string(&TimeSeriesPoint::from(&obs)).unwrap();
        assert_eq!(json, r#"{"price":1.23,"date":"2024-01-01"}"#);
    }

    #[test]
    fn present_fields_in_fixed_order() {
        let obs = PriceObservation::new("ABC", d(2024, 1, 1), 1.5)
            .with_day_range(Some(0.0), Some(1.25), Some(1.75));
        let json = serde_json::to_string(&TimeSeriesPoint::from(&obs)).unwrap();
        assert_eq!(
            json,
            r#"{"price":1.5,"date":"2024-01-01","volume":0.0,"day_low":1.25,"day_high":1.75}"#
        );
    }

    #[test]
    fn non_finite_day_range_is_omitted() {
        let obs = PriceObservation::new("ABC", d(2024, 1, 1), 1.5)
            .with_day_range(Some(f64::NAN), Some(f64::INFINITY), Some(1.75));
        assert_eq!(obs.volume, None);
        assert_eq!(obs.day_low, None);
        let json = serde_json::to_string(&TimeSeriesPoint::from(&obs)).unwrap();
        assert_eq!(json, r#"{"price":1.5,"date":"2024-01-01","day_high":1.75}"#);
    }

    #[test]
    fn non_finite_fields_set_directly_are_omitted() {
        let mut obs = PriceObservation::new("ABC", d(2024, 1, 1), 1.5);
        obs.volume = Some(f64::NEG_INFINITY);
        let json = serde_json::to_string(&TimeSeriesPoint::from(&obs)).unwrap();
        assert!(!json.contains("volume"));
        assert!(!json.contains("null"));
    }

    #[test]
    fn metadata_is_not_serialized() {
        let obs = PriceObservation::new("ABC", d(2024, 1, 1), 1.0)
            .with_ticker_symbol("T")
            .with_isin("HU1")
            .with_currency("HUF")
            .with_security_name("Name");
        let json = serde_json::to_string(&TimeSeriesPoint::from(&obs)).unwrap();
        assert!(!json.contains("HUF"));
        assert!(!json.contains("isin"));
    }

    #[test]
    fn full_precision_is_kept() {
        let price = 1.0123456789012345;
        let obs = PriceObservation::new("ABC", d(2024, 1, 1), price);
        let json = serde_json::to_string(&TimeSeriesPoint::from(&obs)).unwrap();
        let back: TimeSeriesPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back.price, price);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  InstrumentCatalogEntry
// ═══════════════════════════════════════════════════════════════════

mod catalog_entry {
    use super::*;

    #[test]
    fn record_cells_in_header_order() {
        let obs = PriceObservation::new("Klasszikus", d(2024, 1, 1), 1.0)
            .with_ticker_symbol("OTPNY_KLASS")
            .with_isin("HU1")
            .with_security_name("OTP Klasszikus")
            .with_currency("HUF");
        let entry = InstrumentCatalogEntry::from_observation(&obs, "https://x/otp/klasszikus.json").unwrap();
        assert_eq!(
            entry.to_record(),
            [
                "OTPNY_KLASS",
                "HU1",
                "OTP Klasszikus",
                "HUF",
                "JSON feed url: https://x/otp/klasszikus.json"
            ]
        );
    }

    #[test]
    fn note_has_prefix() {
        let obs = PriceObservation::new("A", d(2024, 1, 1), 1.0).with_isin("HU1");
        let entry = InstrumentCatalogEntry::from_observation(&obs, "u").unwrap();
        assert_eq!(entry.note, format!("{NOTE_PREFIX}u"));
    }

    #[test]
    fn isin_only_row_keeps_ticker_empty() {
        let obs = PriceObservation::new("A", d(2024, 1, 1), 1.0).with_isin("HU1");
        let entry = InstrumentCatalogEntry::from_observation(&obs, "u").unwrap();
        assert_eq!(entry.to_record()[0], "");
        assert_eq!(entry.identity_key(), Some("HU1"));
    }

    #[test]
    fn missing_identity_is_schema_error() {
        let obs = PriceObservation::new("A", d(2024, 1, 1), 1.0);
        let err = InstrumentCatalogEntry::from_observation(&obs, "u").unwrap_err();
        assert!(matches!(err, CoreError::Schema(_)));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Settings & RunContext
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.base_dir, PathBuf::from("."));
        assert_eq!(s.feed_base_url, DEFAULT_FEED_BASE_URL);
        assert_eq!(s.write_mode, WriteMode::AtomicRewrite);
        assert_eq!(s.duplicate_policy, DuplicatePolicy::Skip);
        assert_eq!(s.catalog_mode, CatalogMode::History);
        assert!(!s.strict_schema);
        assert_eq!(s.output_name("mak_historical"), "mak");
    }

    #[test]
    fn unaliased_source_maps_to_itself() {
        let s = Settings::default();
        assert_eq!(s.output_name("bamosz"), "bamosz");
    }

    #[test]
    fn load_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"base_dir": "/srv/feeds", "write_mode": "in_place_append", "duplicate_policy": "reject"}"#,
        )
        .unwrap();

        let s = Settings::load_from_file(&path).unwrap();
        assert_eq!(s.base_dir, PathBuf::from("/srv/feeds"));
        assert_eq!(s.write_mode, WriteMode::InPlaceAppend);
        assert_eq!(s.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(s.catalog_mode, CatalogMode::History);
        assert_eq!(s.feed_base_url, DEFAULT_FEED_BASE_URL);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = Settings::load_from_file("/nonexistent/pp-feed/settings.json").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn load_unknown_enum_value_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"write_mode": "sometimes"}"#).unwrap();
        let err = Settings::load_from_file(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn alias_with_separator_is_rejected() {
        let mut s = Settings::default();
        s.source_aliases.insert("x".into(), "../escape".into());
        assert!(matches!(s.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn parent_dir_alias_is_rejected() {
        let mut s = Settings::default();
        s.source_aliases.insert("x".into(), "..".into());
        assert!(matches!(s.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn empty_feed_url_is_rejected() {
        let s = Settings {
            feed_base_url: String::new(),
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn run_context_resolves_alias() {
        let s = Settings {
            base_dir: PathBuf::from("/data"),
            ..Settings::default()
        };
        let ctx = RunContext::new("mak_historical", &s);
        assert_eq!(ctx.source_name, "mak_historical");
        assert_eq!(ctx.output_name, "mak");
        assert_eq!(ctx.series_dir(), PathBuf::from("/data/mak"));
        assert_eq!(ctx.series_path("DKJ 250115"), PathBuf::from("/data/mak/dkj_250115.json"));
        assert_eq!(ctx.catalog_path(), PathBuf::from("/data/instruments/mak.csv"));
        assert!(ctx.feed_url("DKJ 250115").ends_with("/mak/dkj_250115.json"));
    }
}
