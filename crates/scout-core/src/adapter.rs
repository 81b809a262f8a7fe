//! Shared setup handed to every provider adapter factory

use crate::config::ScoutConfig;
use crate::credentials::CredentialResolver;
use crate::http::HttpClient;
use crate::Result;
use std::sync::Arc;

/// Configuration, HTTP client and credential resolver used to build adapters
#[derive(Debug, Clone)]
pub struct AdapterContext {
    config: Arc<ScoutConfig>,
    http: HttpClient,
    credentials: CredentialResolver,
}

impl AdapterContext {
    pub fn new(config: ScoutConfig, credentials: CredentialResolver) -> Result<Self> {
        let http = HttpClient::new(&config.http)?;
        Ok(Self {
            config: Arc::new(config),
            http,
            credentials,
        })
    }

    /// Context whose resolver is seeded from the config's `[credentials]` table
    pub fn from_config(config: ScoutConfig) -> Result<Self> {
        let credentials = config.credential_resolver();
        Self::new(config, credentials)
    }

    pub fn with_http(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }

    pub fn endpoint(&self, provider: &str, default: &str) -> String {
        self.config.endpoint(provider, default)
    }

    /// Resolve an API key on behalf of `tool`
    pub fn credential(&self, tool: &str, var: &str) -> Result<String> {
        self.credentials.resolve(tool, var, None)
    }
}
