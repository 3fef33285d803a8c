//! Settings for one backend connection

use crate::error::{ConfigError, ConfigResult};
use baaskit_core::request::{DEFAULT_APP_CODE_HEADER, DEFAULT_SESSION_HEADER};
use baaskit_core::RequestFactory;
use baaskit_dispatch::{DispatcherConfig, RetryPolicy};
use baaskit_http::{TimeoutConfig, TimeoutManager};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

pub const ENV_API_DOMAIN: &str = "BAASKIT_API_DOMAIN";
pub const ENV_PORT: &str = "BAASKIT_PORT";
pub const ENV_APP_CODE: &str = "BAASKIT_APP_CODE";
pub const ENV_WORKERS: &str = "BAASKIT_WORKERS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_domain: String,
    pub port: u16,
    pub use_https: bool,
    pub api_base_path: String,
    /// Numeric codes are common in YAML, so numbers are accepted too
    #[serde(deserialize_with = "string_or_number")]
    pub app_code: String,
    pub workers: usize,
    pub timeouts: TimeoutConfig,
    /// Where the CLI keeps the session between runs
    pub credentials_file: Option<PathBuf>,
    pub session_header: String,
    pub app_code_header: String,
    /// Retry for transient failures; absent means a single attempt
    pub retry: Option<RetryPolicy>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_domain: "10.0.2.2".to_string(),
            port: 9000,
            use_https: false,
            api_base_path: "/".to_string(),
            app_code: "1234567890".to_string(),
            workers: 2,
            timeouts: TimeoutConfig::default(),
            credentials_file: None,
            session_header: DEFAULT_SESSION_HEADER.to_string(),
            app_code_header: DEFAULT_APP_CODE_HEADER.to_string(),
            retry: None,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

impl ClientConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `BAASKIT_*` overrides looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(domain) = lookup(ENV_API_DOMAIN) {
            self.api_domain = domain;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::Validation(format!("{} is not a port: '{}'", ENV_PORT, port)))?;
        }
        if let Some(app_code) = lookup(ENV_APP_CODE) {
            self.app_code = app_code;
        }
        if let Some(workers) = lookup(ENV_WORKERS) {
            self.workers = workers.parse().map_err(|_| {
                ConfigError::Validation(format!("{} is not a number: '{}'", ENV_WORKERS, workers))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.api_domain.trim().is_empty() {
            return Err(ConfigError::Validation("api_domain cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation("port cannot be 0".to_string()));
        }
        if self.app_code.is_empty() {
            return Err(ConfigError::Validation("app_code cannot be empty".to_string()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Validation("workers must be at least 1".to_string()));
        }
        if self.session_header.is_empty() || self.app_code_header.is_empty() {
            return Err(ConfigError::Validation("header names cannot be empty".to_string()));
        }
        TimeoutManager::new(self.timeouts).validate()?;
        Ok(())
    }

    /// `{scheme}://{domain}:{port}{base_path}`
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        format!("{}://{}:{}{}", scheme, self.api_domain, self.port, self.api_base_path)
    }

    pub fn request_factory(&self) -> ConfigResult<RequestFactory> {
        let factory = RequestFactory::from_parts(
            self.use_https,
            &self.api_domain,
            self.port,
            &self.api_base_path,
            self.app_code.clone(),
        )?;
        Ok(factory.with_header_names(&self.app_code_header, &self.session_header))
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig::with_workers(self.workers)
    }
}
