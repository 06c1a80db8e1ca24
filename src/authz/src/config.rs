//! Engine configuration
//!
//! Defaults can be overridden from a JSON document or from environment
//! variables:
//! - `AUTHZ_CASE_SENSITIVE` - keep permission token case (default: false)
//! - `AUTHZ_DEFAULT_DOMAIN` - domain of plain named permissions (default: named)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{AuthzError, Result};
use crate::permission::{is_valid_domain, PermissionKind};

/// Environment variable for case-sensitive permission tokens
pub const ENV_CASE_SENSITIVE: &str = "AUTHZ_CASE_SENSITIVE";

/// Environment variable for the default permission domain
pub const ENV_DEFAULT_DOMAIN: &str = "AUTHZ_DEFAULT_DOMAIN";

/// Authorization engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Keep permission token case instead of folding to lower-case
    pub case_sensitive_permissions: bool,

    /// Domain used for plain named permissions
    pub default_domain: String,

    /// Extra permission kinds: kind name -> domain
    pub permission_kinds: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            case_sensitive_permissions: false,
            default_domain: PermissionKind::Named.domain(),
            permission_kinds: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading engine configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Apply overrides from a key lookup (environment-style)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CASE_SENSITIVE) {
            self.case_sensitive_permissions = parse_bool(ENV_CASE_SENSITIVE, &value)?;
        }
        if let Some(value) = lookup(ENV_DEFAULT_DOMAIN) {
            self.default_domain = value;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check the configuration for blank domains and domains with dividers
    pub fn validate(&self) -> Result<()> {
        if self.default_domain.trim().is_empty() {
            return Err(AuthzError::Config("default_domain cannot be empty".to_string()));
        }
        if !is_valid_domain(&self.default_domain) {
            return Err(AuthzError::Config(format!(
                "default_domain '{}' cannot contain part or token dividers",
                self.default_domain
            )));
        }
        for (kind, domain) in &self.permission_kinds {
            if kind.trim().is_empty() || domain.trim().is_empty() {
                return Err(AuthzError::Config(format!(
                    "permission kind '{}' has an empty name or domain",
                    kind
                )));
            }
            if !is_valid_domain(domain) {
                return Err(AuthzError::Config(format!(
                    "permission kind '{}' domain '{}' cannot contain part or token dividers",
                    kind, domain
                )));
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AuthzError::Config(format!("{} must be a boolean, got '{}'", key, other))),
    }
}
