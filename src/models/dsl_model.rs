use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use url::Url;

use crate::error::{LoadError, Result};
use crate::utils::duration::deserialize_secs;

pub const DEFAULT_TARGET: &str = "http://localhost:30080/users";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
/// Longest run accepted: 30 days.
pub const MAX_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// A single load run. Immutable once the run starts.
///
/// Every field has a default, so a config file only needs the keys it wants
/// to change:
///
/// ```json
/// { "vus": 20, "duration": "1m", "rps": 50 }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub name: String,
    pub target: String,

    /// Number of virtual users (concurrent workers).
    pub vus: u64,

    /// Run length in seconds. Config files may also use `"5m"` style strings.
    #[serde(deserialize_with = "deserialize_secs")]
    pub duration: u64,

    /// Aggregate admitted requests per second across all VUs. `0` disables the cap.
    pub rps: u64,

    /// Per-request timeout in milliseconds.
    pub timeout: Option<u64>,

    /// Status code the check asserts on.
    pub expected_status: u16,

    pub auth: Option<Auth>,
    pub query_params: Option<HashMap<String, String>>,
    pub headers: Option<HashMap<String, String>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: "users".to_string(),
            target: DEFAULT_TARGET.to_string(),
            vus: 150,
            duration: 300,
            rps: 300,
            timeout: Some(DEFAULT_TIMEOUT_MS),
            expected_status: 200,
            auth: None,
            query_params: None,
            headers: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "credentials")]
pub enum Auth {
    None,
    Basic { username: String, password: String },
    Bearer { token: String },
    ApiKey { key_name: String, key_value: String, add_to: ApiKeyLocation },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
}

impl RunConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Rejects configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.vus == 0 {
            return Err(LoadError::InvalidConfig("vus must be at least 1".into()));
        }
        if self.duration == 0 {
            return Err(LoadError::InvalidConfig("duration must be at least 1s".into()));
        }
        if self.duration > MAX_DURATION_SECS {
            return Err(LoadError::InvalidConfig(format!(
                "duration {}s exceeds the {}s maximum",
                self.duration, MAX_DURATION_SECS
            )));
        }
        if self.timeout == Some(0) {
            return Err(LoadError::InvalidConfig("timeout must be positive".into()));
        }
        if hyper::StatusCode::from_u16(self.expected_status).is_err() {
            return Err(LoadError::InvalidConfig(format!(
                "expected_status {} is not an HTTP status code",
                self.expected_status
            )));
        }

        let url = self.target_url()?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(LoadError::InvalidConfig(format!(
                    "unsupported scheme '{other}', expected http or https"
                )))
            }
        }
        if url.host_str().is_none() {
            return Err(LoadError::InvalidConfig(format!("target '{}' has no host", self.target)));
        }
        Ok(())
    }

    pub fn target_url(&self) -> Result<Url> {
        Url::parse(&self.target).map_err(|source| LoadError::InvalidUrl {
            url: self.target.clone(),
            source,
        })
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_users_scenario() {
        let config = RunConfig::default();
        assert_eq!(config.vus, 150);
        assert_eq!(config.duration, 300);
        assert_eq!(config.rps, 300);
        assert_eq!(config.target, "http://localhost:30080/users");
        assert_eq!(config.expected_status, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RunConfig::from_json(r#"{ "vus": 10, "duration": "1m30s" }"#).unwrap();
        assert_eq!(config.vus, 10);
        assert_eq!(config.duration, 90);
        assert_eq!(config.rps, 300);
        assert_eq!(config.target, DEFAULT_TARGET);
    }

    #[test]
    fn numeric_duration_is_seconds() {
        let config = RunConfig::from_json(r#"{ "duration": 45 }"#).unwrap();
        assert_eq!(config.duration, 45);
    }

    #[test]
    fn bad_duration_string_fails_to_parse() {
        assert!(RunConfig::from_json(r#"{ "duration": "forever" }"#).is_err());
    }

    #[test]
    fn auth_variants_deserialize() {
        let config = RunConfig::from_json(
            r#"{ "auth": { "type": "ApiKey", "credentials": { "key_name": "k", "key_value": "v", "add_to": "query" } } }"#,
        )
        .unwrap();
        assert_eq!(
            config.auth,
            Some(Auth::ApiKey {
                key_name: "k".into(),
                key_value: "v".into(),
                add_to: ApiKeyLocation::Query,
            })
        );
    }

    #[test]
    fn validate_rejects_zero_vus_and_duration() {
        let config = RunConfig { vus: 0, ..RunConfig::default() };
        assert!(matches!(config.validate(), Err(LoadError::InvalidConfig(_))));

        let config = RunConfig { duration: 0, ..RunConfig::default() };
        assert!(matches!(config.validate(), Err(LoadError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_huge_duration() {
        let config = RunConfig { duration: u64::MAX, ..RunConfig::default() };
        assert!(matches!(config.validate(), Err(LoadError::InvalidConfig(_))));

        let config = RunConfig { duration: MAX_DURATION_SECS, ..RunConfig::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_targets() {
        let config = RunConfig { target: "not a url".into(), ..RunConfig::default() };
        assert!(matches!(config.validate(), Err(LoadError::InvalidUrl { .. })));

        let config = RunConfig { target: "ftp://localhost/users".into(), ..RunConfig::default() };
        assert!(matches!(config.validate(), Err(LoadError::InvalidConfig(_))));
    }

    #[test]
    fn zero_rps_is_allowed() {
        let config = RunConfig { rps: 0, ..RunConfig::default() };
        assert!(config.validate().is_ok());
    }
}
