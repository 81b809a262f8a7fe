//! Configuration management for Scout
//!
//! Loads configuration with priority:
//! 1. Specified config file
//! 2. scout.toml in the current directory or a parent
//! 3. Defaults (credentials then come from the environment or `.env` files)
//!
//! String values of the form `${VAR_NAME}` in `[credentials]` and `[endpoints]`
//! are replaced by the named environment variable.

use crate::credentials::CredentialResolver;
use crate::http::RetryPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "scout.toml";

/// Scout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoutConfig {
    #[serde(default)]
    pub http: HttpSettings,

    /// Crawl orchestration settings; required by crawl tools
    pub crawl: Option<CrawlSettings>,

    /// Explicit credentials keyed by environment variable name
    #[serde(default)]
    pub credentials: HashMap<String, String>,

    /// Provider base URL overrides keyed by provider name
    #[serde(default)]
    pub endpoints: HashMap<String, String>,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub retry: RetrySettings,
}

/// Retry for transient transport failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// Crawl orchestration configuration
///
/// `max_wait_secs` has no default: a crawl never polls without an upper bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    pub max_wait_secs: u64,

    #[serde(default = "default_fetch_workers")]
    pub fetch_workers: usize,

    #[serde(default = "default_max_pages")]
    pub default_max_pages: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub json_logs: bool,

    pub log_filter: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }
}

impl CrawlSettings {
    /// Settings with the given upper bound and default interval/worker count
    pub fn with_max_wait(max_wait: Duration) -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: max_wait.as_secs(),
            fetch_workers: default_fetch_workers(),
            default_max_pages: default_max_pages(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_wait_secs == 0 {
            return Err(Error::config_error("crawl.max_wait_secs must be greater than 0"));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::config_error(
                "crawl.poll_interval_secs must be greater than 0",
            ));
        }
        if self.fetch_workers == 0 {
            return Err(Error::config_error("crawl.fetch_workers must be greater than 0"));
        }
        if self.default_max_pages == 0 {
            return Err(Error::config_error(
                "crawl.default_max_pages must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl ScoutConfig {
    /// Load scout.toml from the current directory or a parent
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`ScoutConfig::load`], falling back to defaults when no file exists
    pub fn load_or_default() -> Result<Self> {
        match Self::find_config_file()? {
            Some(path) => Self::load_from(Some(&path)),
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::find_config_file()?.ok_or_else(|| {
                Error::config_error(format!(
                    "{} not found in the current directory or its parents",
                    CONFIG_FILE_NAME
                ))
            })?,
        };

        tracing::debug!("Loading configuration from: {:?}", config_path);

        let contents = fs::read_to_string(&config_path).map_err(|e| {
            Error::config_error(format!("Failed to read config file {:?}: {}", config_path, e))
        })?;

        Self::from_toml_str(&contents)
    }

    /// Parse, resolve `${VAR}` references and validate
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: ScoutConfig = toml::from_str(contents)
            .map_err(|e| Error::config_error(format!("Failed to parse config: {}", e)))?;

        config.resolve_env_vars();
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(crawl) = &self.crawl {
            crawl.validate()?;
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::config_error("http.timeout_secs must be greater than 0"));
        }
        Ok(())
    }

    /// Crawl settings, or a configuration error naming the missing section
    pub fn crawl_settings(&self) -> Result<&CrawlSettings> {
        self.crawl.as_ref().ok_or_else(|| {
            Error::config_error(
                "crawling requires a [crawl] section with max_wait_secs in scout.toml",
            )
        })
    }

    /// Base URL for a provider, falling back to its public default
    pub fn endpoint(&self, provider: &str, default: &str) -> String {
        self.endpoints
            .get(provider)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| default.to_string())
    }

    /// Credential resolver seeded with the `[credentials]` table
    pub fn credential_resolver(&self) -> CredentialResolver {
        CredentialResolver::new().with_overrides(self.credentials.clone())
    }

    fn find_config_file() -> Result<Option<PathBuf>> {
        let mut current = env::current_dir()?;

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if !current.pop() {
                return Ok(None);
            }
        }
    }

    fn resolve_env_vars(&mut self) {
        self.credentials = resolve_table(std::mem::take(&mut self.credentials));
        self.endpoints = resolve_table(std::mem::take(&mut self.endpoints));
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }
}

/// Unresolvable references are dropped so lookups fall through to the environment chain.
fn resolve_table(table: HashMap<String, String>) -> HashMap<String, String> {
    table
        .into_iter()
        .filter_map(|(key, value)| ScoutConfig::resolve_env_var(&value).map(|v| (key, v)))
        .collect()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("Mozilla/5.0 (compatible; scout-tools/{})", env!("CARGO_PKG_VERSION"))
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_fetch_workers() -> usize {
    10
}

fn default_max_pages() -> u32 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_crawl_section() {
        let config = ScoutConfig::from_toml_str("").unwrap();
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.retry.max_attempts, 3);
        assert!(config.crawl.is_none());
        assert!(config.crawl_settings().unwrap_err().is_configuration());
    }

    #[test]
    fn test_crawl_section_requires_max_wait() {
        let err = ScoutConfig::from_toml_str("[crawl]\npoll_interval_secs = 2\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_crawl_section_defaults() {
        let config = ScoutConfig::from_toml_str("[crawl]\nmax_wait_secs = 120\n").unwrap();
        let crawl = config.crawl_settings().unwrap();
        assert_eq!(crawl.poll_interval(), Duration::from_secs(5));
        assert_eq!(crawl.max_wait(), Duration::from_secs(120));
        assert_eq!(crawl.fetch_workers, 10);
        assert_eq!(crawl.default_max_pages, 50);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = ScoutConfig::from_toml_str("[crawl]\nmax_wait_secs = 60\nfetch_workers = 0\n")
            .unwrap_err();
        assert!(err.to_string().contains("fetch_workers"));
    }

    #[test]
    fn test_resolve_env_var() {
        assert_eq!(ScoutConfig::resolve_env_var("${PATH}"), env::var("PATH").ok());
        assert_eq!(
            ScoutConfig::resolve_env_var("plain_value"),
            Some("plain_value".to_string())
        );
        assert_eq!(
            ScoutConfig::resolve_env_var("${SCOUT_TEST_SURELY_UNSET_VAR}"),
            None
        );
    }

    #[test]
    fn test_endpoint_override_and_credentials() {
        let config = ScoutConfig::from_toml_str(
            r#"
            [credentials]
            SERPER_API_KEY = "literal-key"
            MISSING = "${SCOUT_TEST_SURELY_UNSET_VAR}"

            [endpoints]
            olostep = "http://localhost:9999/v1/"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.endpoint("olostep", "https://api.olostep.com/v1"),
            "http://localhost:9999/v1"
        );
        assert_eq!(
            config.endpoint("serper", "https://google.serper.dev"),
            "https://google.serper.dev"
        );
        assert!(!config.credentials.contains_key("MISSING"));

        let resolver = config.credential_resolver();
        assert_eq!(
            resolver.resolve("serper_search", "SERPER_API_KEY", None).unwrap(),
            "literal-key"
        );
    }
}
