use std::fmt;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;

/// Base URL of version 1 of the bus tracker API.
pub const DEFAULT_API_URL: &str = "http://www.ctabustracker.com/bustime/api/v1/";

/// Zone the API reports its wall-clock times in.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// Settings the client is constructed with.
///
/// Loadable from a JSON file:
/// ```json
/// {
///   "api_key": "abcdef123",
///   "base_url": "http://www.ctabustracker.com/bustime/api/v1/",
///   "timezone": "America/Chicago"
/// }
/// ```
/// Only `api_key` is required.
#[derive(Clone, Deserialize)]
pub struct Config {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

const fn default_timezone() -> Tz {
    DEFAULT_TIMEZONE
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("timezone", &self.timezone)
            .finish()
    }
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: default_base_url(), timezone: DEFAULT_TIMEZONE }
    }

    /// Overrides the API base URL, e.g. to point at a test server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.normalized()
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{path}'"))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file '{path}'"))?;
        Ok(config.normalized())
    }

    /// Reads `BUSTRACKER_API_KEY` (required), `BUSTRACKER_API_URL` and
    /// `BUSTRACKER_TIMEZONE`.
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("BUSTRACKER_API_KEY").context("BUSTRACKER_API_KEY must be set")?;
        let mut config = Self::new(api_key);

        if let Ok(url) = std::env::var("BUSTRACKER_API_URL") {
            config = config.with_base_url(url);
        }
        if let Ok(tz) = std::env::var("BUSTRACKER_TIMEZONE") {
            let tz: Tz = tz
                .parse()
                .map_err(|e| anyhow::anyhow!("BUSTRACKER_TIMEZONE '{tz}' is invalid: {e}"))?;
            config = config.with_timezone(tz);
        }
        Ok(config)
    }

    /// Operation names are appended to the base URL, so it must end in `/`.
    fn normalized(mut self) -> Self {
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = Config::new("key");
        assert_eq!(config.api_key, "key");
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert_eq!(config.timezone, chrono_tz::America::Chicago);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = Config::new("key").with_base_url("http://localhost:8080/api");
        assert_eq!(config.base_url, "http://localhost:8080/api/");
    }

    #[test]
    fn test_debug_masks_api_key() {
        let rendered = format!("{:?}", Config::new("secret-key-123"));
        assert!(!rendered.contains("secret-key-123"), "{rendered}");
        assert!(rendered.contains(r#"api_key: "***""#), "{rendered}");
        assert!(rendered.contains(DEFAULT_API_URL), "{rendered}");
    }

    #[test]
    fn test_load_json_file() {
        let path = temp_path("bustracker_test_config.json");
        fs::write(&path, r#"{"api_key": "abc", "base_url": "http://example.test/v1", "timezone": "UTC"}"#)
            .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.base_url, "http://example.test/v1/");
        assert_eq!(config.timezone, chrono_tz::UTC);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_requires_api_key() {
        let path = temp_path("bustracker_test_config_nokey.json");
        fs::write(&path, r#"{"base_url": "http://example.test/v1/"}"#).unwrap();

        assert!(Config::load(&path).is_err());

        fs::remove_file(&path).unwrap();
    }
}
