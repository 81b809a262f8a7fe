//! Credential resolution shared by every adapter
//!
//! A credential is looked up in this order:
//! 1. Explicit value (constructor argument or `[credentials]` in `scout.toml`)
//! 2. Environment variable
//! 3. `.env` file in the working directory or one of its parents
//!
//! `.env` files are read, never loaded into the process environment.

use crate::{Error, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Number of directories inspected for a `.env` file: the start directory plus three parents.
pub const DEFAULT_SEARCH_DEPTH: usize = 4;

pub const ENV_FILE_NAME: &str = ".env";

/// Where a resolved credential came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit,
    Environment,
    EnvFile(PathBuf),
}

#[derive(Debug, Clone)]
enum EnvSource {
    Process,
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    fn get(&self, var: &str) -> Option<String> {
        match self {
            EnvSource::Process => env::var(var).ok(),
            EnvSource::Fixed(vars) => vars.get(var).cloned(),
        }
    }
}

/// Three-tier credential lookup injected into every adapter.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    overrides: HashMap<String, String>,
    env: EnvSource,
    start_dir: Option<PathBuf>,
    search_depth: usize,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialResolver {
    /// Resolver over the process environment, searching from the working directory.
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            env: EnvSource::Process,
            start_dir: None,
            search_depth: DEFAULT_SEARCH_DEPTH,
        }
    }

    pub fn with_override(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(var.into(), value.into());
        self
    }

    pub fn with_overrides<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Replace the process environment with a fixed set of variables.
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = EnvSource::Fixed(vars);
        self
    }

    pub fn starting_at(mut self, dir: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(dir.into());
        self
    }

    pub fn with_search_depth(mut self, depth: usize) -> Self {
        self.search_depth = depth;
        self
    }

    /// Look up a credential without failing when it is absent.
    pub fn lookup(&self, var: &str) -> Result<Option<(String, CredentialSource)>> {
        if let Some(value) = non_empty(self.overrides.get(var).cloned()) {
            return Ok(Some((value, CredentialSource::Explicit)));
        }

        if let Some(value) = non_empty(self.env.get(var)) {
            return Ok(Some((value, CredentialSource::Environment)));
        }

        Ok(self
            .find_in_env_files(var)?
            .map(|(value, path)| (value, CredentialSource::EnvFile(path))))
    }

    /// Resolve a credential for `tool`, preferring `explicit` when given.
    pub fn resolve(&self, tool: &str, var: &str, explicit: Option<String>) -> Result<String> {
        if let Some(value) = non_empty(explicit) {
            return Ok(value);
        }

        match self.lookup(var)? {
            Some((value, source)) => {
                tracing::debug!(tool, var, ?source, "Resolved credential");
                Ok(value)
            }
            None => {
                tracing::warn!(tool, var, "Credential not found");
                Err(Error::MissingCredential {
                    tool: tool.to_string(),
                    var: var.to_string(),
                })
            }
        }
    }

    pub fn is_available(&self, var: &str) -> bool {
        matches!(self.lookup(var), Ok(Some(_)))
    }

    fn find_in_env_files(&self, var: &str) -> Result<Option<(String, PathBuf)>> {
        let mut current = match &self.start_dir {
            Some(dir) => dir.clone(),
            None => env::current_dir()?,
        };

        for _ in 0..self.search_depth {
            let candidate = current.join(ENV_FILE_NAME);
            if candidate.is_file() {
                if let Some(value) = read_env_file(&candidate, var)? {
                    return Ok(Some((value, candidate)));
                }
            }

            if !current.pop() {
                break;
            }
        }

        Ok(None)
    }
}

fn read_env_file(path: &Path, var: &str) -> Result<Option<String>> {
    let entries = dotenvy::from_path_iter(path)
        .map_err(|e| Error::config_error(format!("Failed to read {}: {}", path.display(), e)))?;

    for entry in entries {
        match entry {
            Ok((key, value)) if key == var => return Ok(non_empty(Some(value))),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping malformed .env line");
            }
        }
    }

    Ok(None)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
