use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "{tool} requires {var}: pass it explicitly, export it, or add it to a .env file"
    )]
    MissingCredential { tool: String, var: String },

    #[error("{tool} requires '{dependency}', which is not enabled in this build")]
    MissingDependency { tool: String, dependency: String },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("{service} returned HTTP {status}: {body}")]
    RemoteService {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {service}: {message}")]
    Protocol { service: String, message: String },

    #[error("Job {job_id} failed: {detail}")]
    JobFailed { job_id: String, detail: String },

    #[error("Gave up waiting for job {job_id} after {waited:?}")]
    Timeout { job_id: String, waited: Duration },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use scout_core::Error;
    /// let err = Error::config_error("crawl.max_wait_secs must be set");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating general errors with a message
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Error::InvalidParams(msg.into())
    }

    pub fn protocol(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Protocol {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn remote(service: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Error::RemoteService {
            service: service.into(),
            status,
            body: body.into(),
        }
    }

    /// True for failures only an operator can fix (missing keys, disabled features, bad config).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::MissingCredential { .. } | Error::MissingDependency { .. }
        )
    }

    /// True for transport failures that a bounded retry may clear.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}
