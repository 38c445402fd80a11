//! Runtime configuration read from `.env` and the process environment.

use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PREVIEW_ROWS: usize = 20;
const DEFAULT_INFER_SCHEMA_LENGTH: usize = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Backend base URL without a trailing slash.
    pub api_base_url: String,
    /// Read/write timeout for backend calls. Training runs inside `/predict`.
    pub request_timeout: Duration,
    pub preview_rows: usize,
    pub infer_schema_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let api_base_url = lookup("DEFECT_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_base_url);

        let timeout_secs = parse_or(&lookup, "DEFECT_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        Config {
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
            preview_rows: parse_or(&lookup, "DEFECT_PREVIEW_ROWS", defaults.preview_rows),
            infer_schema_length: parse_or(
                &lookup,
                "INFER_SCHEMA_LENGTH",
                defaults.infer_schema_length,
            ),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring invalid configuration value");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.api_base_url, "http://localhost:5000");
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let config = Config::from_lookup(lookup_from(&[(
            "DEFECT_API_URL",
            " https://ml.example.org/api/ ",
        )]));
        assert_eq!(config.api_base_url, "https://ml.example.org/api");
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DEFECT_API_TIMEOUT_SECS", "soon"),
            ("DEFECT_PREVIEW_ROWS", "5"),
        ]));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.preview_rows, 5);
    }
}
