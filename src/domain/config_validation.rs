//! Configuration validation.
//!
//! Checks `[sources]`, `[skip_rows]`, `[http]`, `[cache]`, `[tickers]` and
//! `[export]` before any source is loaded.

use crate::domain::error::SalesIntelError;
use crate::domain::export::ExportFormat;
use crate::domain::loader::DEFAULT_TTL_DAYS;
use crate::ports::config_port::ConfigPort;
use chrono::TimeDelta;
use std::collections::BTreeMap;
use std::time::Duration;

pub const CACHE_SECTION: &str = "cache";
pub const HTTP_SECTION: &str = "http";
pub const SKIP_ROWS_SECTION: &str = "skip_rows";

const DEFAULT_HTTP_TIMEOUT_SECS: i64 = 60;
pub const EXPORT_SECTION: &str = "export";
pub const TICKERS_SECTION: &str = "tickers";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), SalesIntelError> {
    validate_sources(config)?;
    skip_rows(config)?;
    http_timeout(config)?;
    cache_ttl(config)?;
    default_export_format(config)?;
    validate_ticker_sets(config)?;
    Ok(())
}

fn validate_sources(config: &dyn ConfigPort) -> Result<(), SalesIntelError> {
    if config.get_section("sources").is_empty() {
        return Err(SalesIntelError::ConfigMissing {
            section: "sources".to_string(),
            key: "<any>".to_string(),
        });
    }
    Ok(())
}

/// `[skip_rows]`: source key to the number of banner rows above its header.
pub fn skip_rows(config: &dyn ConfigPort) -> Result<BTreeMap<String, usize>, SalesIntelError> {
    config
        .get_section(SKIP_ROWS_SECTION)
        .into_iter()
        .map(|(key, raw)| match raw.trim().parse::<usize>() {
            Ok(rows) => Ok((key, rows)),
            Err(_) => Err(SalesIntelError::ConfigInvalid {
                section: SKIP_ROWS_SECTION.to_string(),
                key,
                reason: format!("{raw:?} is not a row count"),
            }),
        })
        .collect()
}

/// `[http] timeout_secs`, default 60.
pub fn http_timeout(config: &dyn ConfigPort) -> Result<Duration, SalesIntelError> {
    let secs = config.get_int(HTTP_SECTION, "timeout_secs", DEFAULT_HTTP_TIMEOUT_SECS);
    if secs < 1 {
        return Err(SalesIntelError::ConfigInvalid {
            section: HTTP_SECTION.to_string(),
            key: "timeout_secs".to_string(),
            reason: "timeout_secs must be at least 1".to_string(),
        });
    }
    Ok(Duration::from_secs(secs.unsigned_abs()))
}

/// `[cache] ttl_days`, default 21.
pub fn cache_ttl(config: &dyn ConfigPort) -> Result<TimeDelta, SalesIntelError> {
    let days = config.get_int(CACHE_SECTION, "ttl_days", DEFAULT_TTL_DAYS);
    if days < 1 {
        return Err(SalesIntelError::ConfigInvalid {
            section: CACHE_SECTION.to_string(),
            key: "ttl_days".to_string(),
            reason: "ttl_days must be at least 1".to_string(),
        });
    }
    TimeDelta::try_days(days).ok_or_else(|| SalesIntelError::ConfigInvalid {
        section: CACHE_SECTION.to_string(),
        key: "ttl_days".to_string(),
        reason: format!("{days} days is out of range"),
    })
}

/// `[export] format`, default csv.
pub fn default_export_format(config: &dyn ConfigPort) -> Result<ExportFormat, SalesIntelError> {
    match config.get_string(EXPORT_SECTION, "format") {
        None => Ok(ExportFormat::Csv),
        Some(raw) => raw.parse().map_err(|_| SalesIntelError::ConfigInvalid {
            section: EXPORT_SECTION.to_string(),
            key: "format".to_string(),
            reason: format!("unsupported format {raw:?}, expected csv or xlsx"),
        }),
    }
}

fn validate_ticker_sets(config: &dyn ConfigPort) -> Result<(), SalesIntelError> {
    for (key, _) in config.get_section(TICKERS_SECTION) {
        if config.get_list(TICKERS_SECTION, &key).is_empty() {
            return Err(SalesIntelError::ConfigInvalid {
                section: TICKERS_SECTION.to_string(),
                key,
                reason: "ticker set lists no tickers".to_string(),
            });
        }
    }
    Ok(())
}

/// A named ticker allow-list from `[tickers]`.
pub fn ticker_set(config: &dyn ConfigPort, name: &str) -> Result<Vec<String>, SalesIntelError> {
    let tickers = config.get_list(TICKERS_SECTION, name);
    if tickers.is_empty() {
        return Err(SalesIntelError::ConfigMissing {
            section: TICKERS_SECTION.to_string(),
            key: name.to_string(),
        });
    }
    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_config_passes() {
        let config = make_config(
            r#"
[sources]
etf = etf.csv
zip_territory = zips.csv

[cache]
ttl_days = 7

[tickers]
buffer_etf = BUFR,BUFD
target_income_etf = SEPI

[export]
format = xlsx
"#,
        );
        assert!(validate_config(&config).is_ok());
        assert_eq!(cache_ttl(&config).unwrap(), TimeDelta::days(7));
        assert_eq!(default_export_format(&config).unwrap(), ExportFormat::Xlsx);
        assert_eq!(ticker_set(&config, "buffer_etf").unwrap(), vec!["BUFR", "BUFD"]);
    }

    #[test]
    fn defaults_apply() {
        let config = make_config("[sources]\netf = etf.csv\n");
        assert!(validate_config(&config).is_ok());
        assert_eq!(cache_ttl(&config).unwrap(), TimeDelta::days(21));
        assert_eq!(default_export_format(&config).unwrap(), ExportFormat::Csv);
    }

    #[test]
    fn missing_sources_fails() {
        let config = make_config("[cache]\nttl_days = 7\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, SalesIntelError::ConfigMissing { section, .. } if section == "sources"));
    }

    #[test]
    fn zero_ttl_fails() {
        let config = make_config("[sources]\netf = etf.csv\n[cache]\nttl_days = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, SalesIntelError::ConfigInvalid { key, .. } if key == "ttl_days"));
    }

    #[test]
    fn unknown_export_format_fails() {
        let config = make_config("[sources]\netf = etf.csv\n[export]\nformat = pdf\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, SalesIntelError::ConfigInvalid { key, .. } if key == "format"));
    }

    #[test]
    fn empty_ticker_set_fails() {
        let config = make_config("[sources]\netf = etf.csv\n[tickers]\nbuffer_etf = , ,\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, SalesIntelError::ConfigInvalid { key, .. } if key == "buffer_etf"));
    }

    #[test]
    fn http_timeout_lives_outside_sources() {
        let config = make_config("[sources]\netf = etf.csv\n[http]\ntimeout_secs = 15\n");
        assert!(validate_config(&config).is_ok());
        assert_eq!(http_timeout(&config).unwrap(), Duration::from_secs(15));
        let keys: Vec<String> = config.get_section("sources").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["etf"]);
    }

    #[test]
    fn http_section_alone_is_not_a_source() {
        let config = make_config("[http]\ntimeout_secs = 15\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, SalesIntelError::ConfigMissing { section, .. } if section == "sources"));
    }

    #[test]
    fn zero_http_timeout_fails() {
        let config = make_config("[sources]\netf = etf.csv\n[http]\ntimeout_secs = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, SalesIntelError::ConfigInvalid { key, .. } if key == "timeout_secs"));
        assert_eq!(http_timeout(&make_config("")).unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn skip_rows_must_be_counts() {
        let config = make_config("[sources]\nww = ww.xlsx\n[skip_rows]\nww = 3\n");
        assert_eq!(skip_rows(&config).unwrap(), BTreeMap::from([("ww".to_string(), 3)]));
        let config = make_config("[sources]\nww = ww.xlsx\n[skip_rows]\nww = three\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, SalesIntelError::ConfigInvalid { key, .. } if key == "ww"));
    }

    #[test]
    fn unknown_ticker_set_is_missing() {
        let config = make_config("[sources]\netf = etf.csv\n");
        let err = ticker_set(&config, "buffer_etf").unwrap_err();
        assert!(matches!(err, SalesIntelError::ConfigMissing { key, .. } if key == "buffer_etf"));
    }
}
