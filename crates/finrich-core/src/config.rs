use std::fmt::{Debug, Formatter};

use crate::adapters::{NASDAQ100_URL, POLYGON_BASE_URL, SP500_WIKITABLE_URL};
use crate::ConfigError;

pub const API_KEY_VAR: &str = "POLYGON_STOCK_API";
pub const POLYGON_BASE_URL_VAR: &str = "FINRICH_POLYGON_BASE_URL";
pub const NASDAQ100_URL_VAR: &str = "FINRICH_NASDAQ100_URL";
pub const SP500_URL_VAR: &str = "FINRICH_SP500_URL";
pub const HTTP_TIMEOUT_VAR: &str = "FINRICH_HTTP_TIMEOUT_MS";

const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Runtime settings resolved from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    api_key: String,
    pub polygon_base_url: String,
    pub nasdaq100_url: String,
    pub sp500_url: String,
    pub http_timeout_ms: u64,
}

impl Config {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let setting = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = setting(API_KEY_VAR)
            .map(|value| value.trim().to_owned())
            .ok_or(ConfigError::MissingSetting { name: API_KEY_VAR })?;

        let http_timeout_ms = match setting(HTTP_TIMEOUT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidSetting {
                    name: HTTP_TIMEOUT_VAR,
                    value: raw,
                })?,
            None => DEFAULT_HTTP_TIMEOUT_MS,
        };

        Ok(Self {
            api_key,
            polygon_base_url: setting(POLYGON_BASE_URL_VAR)
                .unwrap_or_else(|| POLYGON_BASE_URL.to_owned()),
            nasdaq100_url: setting(NASDAQ100_URL_VAR).unwrap_or_else(|| NASDAQ100_URL.to_owned()),
            sp500_url: setting(SP500_URL_VAR).unwrap_or_else(|| SP500_WIKITABLE_URL.to_owned()),
            http_timeout_ms,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("polygon_base_url", &self.polygon_base_url)
            .field("nasdaq100_url", &self.nasdaq100_url)
            .field("sp500_url", &self.sp500_url)
            .field("http_timeout_ms", &self.http_timeout_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect::<HashMap<_, _>>();
        move |name: &str| values.get(name).cloned()
    }

    #[test]
    fn missing_api_key_names_the_setting() {
        let err = Config::from_lookup(lookup(&[])).expect_err("must fail");
        assert_eq!(err, ConfigError::MissingSetting { name: "POLYGON_STOCK_API" });
        assert!(err.to_string().contains("POLYGON_STOCK_API"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[(API_KEY_VAR, "   ")])).expect_err("must fail");
        assert!(matches!(err, ConfigError::MissingSetting { .. }));
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let config = Config::from_lookup(lookup(&[(API_KEY_VAR, "pk_live")])).expect("valid");
        assert_eq!(config.api_key(), "pk_live");
        assert_eq!(config.polygon_base_url, POLYGON_BASE_URL);
        assert_eq!(config.http_timeout_ms, 10_000);
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = Config::from_lookup(lookup(&[(API_KEY_VAR, "k"), (HTTP_TIMEOUT_VAR, "soon")]))
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::InvalidSetting { .. }));
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let config = Config::from_lookup(lookup(&[(API_KEY_VAR, "pk_live_secret")])).expect("valid");
        assert!(!format!("{config:?}").contains("pk_live_secret"));
    }
}
