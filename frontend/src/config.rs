//! Configuration for the client data layer.

use std::{collections::BTreeMap, env, time::Duration};

use thiserror::Error;
use url::Url;

// API base URL - 编译时从环境变量读取，默认本地开发地址
// 生产环境通过 workflow 设置 XIAOLI_API_BASE 环境变量
/// Compile-time default for the backend base URL.
pub const API_BASE: &str = match option_env!("XIAOLI_API_BASE") {
    Some(url) => url,
    None => "http://localhost:3000/api",
};

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("xiaoli-frontend/", env!("CARGO_PKG_VERSION"));

/// Runtime override for [`API_BASE`].
pub const ENV_API_BASE: &str = "XIAOLI_API_BASE";
/// Runtime override for the request timeout, in milliseconds.
pub const ENV_REQUEST_TIMEOUT_MS: &str = "XIAOLI_REQUEST_TIMEOUT_MS";
/// Runtime override for the user agent.
pub const ENV_USER_AGENT: &str = "XIAOLI_USER_AGENT";

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL does not parse or is not http(s).
    #[error("invalid API base URL `{value}`: {reason}")]
    InvalidApiBase {
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// A numeric setting is malformed or out of range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Setting name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Settings shared by every request the client issues.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_base: Url,
    request_timeout: Duration,
    user_agent: String,
    default_headers: BTreeMap<String, String>,
}

impl ClientConfig {
    /// Build a config for `api_base` with default timeout and headers.
    pub fn new(api_base: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: parse_api_base(api_base)?,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: BTreeMap::new(),
        })
    }

    /// Compile-time defaults overridden by `XIAOLI_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base = lookup(ENV_API_BASE)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| API_BASE.to_string());
        let mut config = Self::new(&api_base)?;

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            let millis = raw.trim().parse::<u64>().map_err(|err| ConfigError::InvalidValue {
                field: ENV_REQUEST_TIMEOUT_MS,
                reason: err.to_string(),
            })?;
            config = config.with_request_timeout(Duration::from_millis(millis))?;
        }
        if let Some(agent) = lookup(ENV_USER_AGENT).filter(|value| !value.trim().is_empty()) {
            config.user_agent = agent;
        }
        Ok(config)
    }

    /// Replace the default request timeout; zero is rejected.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.request_timeout = timeout;
        Ok(self)
    }

    /// Add a header sent with every request unless overridden per call.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Backend base URL.
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Deadline applied when a request sets none.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// `User-Agent` header value.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Headers merged under every request's own headers.
    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.default_headers
    }

    /// Absolute URL of an endpoint path; the base URL's own path is kept.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.api_base.as_str().trim_end_matches('/');
        // Remove leading slash if present
        let path = path.strip_prefix('/').unwrap_or(path);
        Url::parse(&format!("{base}/{path}"))
    }
}

fn parse_api_base(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim()).map_err(|err| ConfigError::InvalidApiBase {
        value: value.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidApiBase {
            value: value.to_string(),
            reason: format!("unsupported scheme `{}`", url.scheme()),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn endpoint_url_keeps_base_path() {
        let config = ClientConfig::new("http://localhost:3000/api/").expect("config");
        let url = config
            .endpoint_url("/section/get-section-lists")
            .expect("url");
        assert_eq!(url.as_str(), "http://localhost:3000/api/section/get-section-lists");
    }

    #[test]
    fn env_overrides_defaults() {
        let vars = HashMap::from([
            (ENV_API_BASE, "https://blog.example.com/api"),
            (ENV_REQUEST_TIMEOUT_MS, "2500"),
        ]);
        let config = ClientConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
            .expect("config");
        assert_eq!(config.api_base().as_str(), "https://blog.example.com/api");
        assert_eq!(config.request_timeout(), Duration::from_millis(2500));
        assert_eq!(config.user_agent(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ClientConfig::new("ftp://files.example.com"),
            Err(ConfigError::InvalidApiBase { .. })
        ));
        let vars = HashMap::from([(ENV_REQUEST_TIMEOUT_MS, "soon")]);
        assert!(matches!(
            ClientConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())),
            Err(ConfigError::InvalidValue { .. })
        ));
        let zero = ClientConfig::new(API_BASE)
            .expect("config")
            .with_request_timeout(Duration::ZERO);
        assert!(zero.is_err());
    }
}
