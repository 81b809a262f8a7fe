//! Capability descriptors for tools
//!
//! Every tool declares what kind of tool it is, which credentials it needs and which
//! optional build features it depends on, so orchestration code can enumerate and
//! validate tools before invoking them.

use crate::{CredentialResolver, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Broad family a tool belongs to
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Web, news and video search engines
    Search,
    /// Single-page scrapers and site crawlers
    Scrape,
    /// Market data, papers and video metadata
    Data,
    #[default]
    General,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolKind::Search => "search",
            ToolKind::Scrape => "scrape",
            ToolKind::Data => "data",
            ToolKind::General => "general",
        };
        f.write_str(name)
    }
}

/// An optional build feature a tool relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub name: &'static str,
    pub available: bool,
}

impl Dependency {
    pub const fn new(name: &'static str, available: bool) -> Self {
        Self { name, available }
    }
}

/// What a tool needs before it can run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolCapabilities {
    pub kind: ToolKind,
    pub required_env: Vec<&'static str>,
    pub dependencies: Vec<Dependency>,
}

impl ToolCapabilities {
    pub fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn requires_env(mut self, var: &'static str) -> Self {
        self.required_env.push(var);
        self
    }

    pub fn depends_on(mut self, name: &'static str, available: bool) -> Self {
        self.dependencies.push(Dependency::new(name, available));
        self
    }

    /// Dependency name → availability
    pub fn analyze_dependencies(&self) -> BTreeMap<&'static str, bool> {
        self.dependencies
            .iter()
            .map(|dep| (dep.name, dep.available))
            .collect()
    }

    pub fn missing_dependencies(&self) -> Vec<&'static str> {
        self.dependencies
            .iter()
            .filter(|dep| !dep.available)
            .map(|dep| dep.name)
            .collect()
    }

    /// Verify dependencies, then credentials. Dependencies are reported first.
    pub fn check(&self, tool: &str, resolver: &CredentialResolver) -> Result<()> {
        if let Some(missing) = self.missing_dependencies().first() {
            return Err(Error::MissingDependency {
                tool: tool.to_string(),
                dependency: (*missing).to_string(),
            });
        }

        for var in &self.required_env {
            if resolver.lookup(var)?.is_none() {
                return Err(Error::MissingCredential {
                    tool: tool.to_string(),
                    var: (*var).to_string(),
                });
            }
        }

        Ok(())
    }
}
