//! Permission kinds and their domains
//!
//! Every kind of permission carries a domain string that becomes part 0 of
//! its wildcard form. Built-in kinds use a static table; other kinds derive
//! their domain from the type-style kind name (`DocumentPermission` becomes
//! `document`) unless registered explicitly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::types::{NamedPermission, PermissionOptions, PermissionResult};

/// Trailing text stripped from kind names when deriving a domain
const PERMISSION_SUFFIX: &str = "permission";

/// Built-in kinds: (kind name, domain)
const BUILTIN_KINDS: &[(&str, &str)] = &[
    ("NamedPermission", "named"),
    ("FilePermission", "file"),
    ("SocketPermission", "socket"),
    ("RuntimePermission", "runtime"),
];

/// Enumerated permission kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    /// Generic named permission (`named`)
    Named,
    /// File access (`file`)
    File,
    /// Network socket access (`socket`)
    Socket,
    /// Runtime facility access (`runtime`)
    Runtime,
    /// Any other kind, by its type-style name (e.g. `DocumentPermission`)
    Custom(String),
}

impl PermissionKind {
    /// Type-style name of this kind
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Named => BUILTIN_KINDS[0].0,
            Self::File => BUILTIN_KINDS[1].0,
            Self::Socket => BUILTIN_KINDS[2].0,
            Self::Runtime => BUILTIN_KINDS[3].0,
            Self::Custom(name) => name,
        }
    }

    /// Domain for this kind
    pub fn domain(&self) -> String {
        let kind_name = self.kind_name();
        BUILTIN_KINDS
            .iter()
            .find(|(name, _)| *name == kind_name)
            .map(|(_, domain)| domain.to_string())
            .unwrap_or_else(|| derive_domain(kind_name))
    }
}

/// Derive a domain from a type-style kind name
///
/// Lower-cases the name and cuts it at the last occurrence of
/// `permission`. A name without that suffix is only lower-cased.
///
/// ```
/// use idm_authz::permission::derive_domain;
///
/// assert_eq!(derive_domain("DocumentPermission"), "document");
/// assert_eq!(derive_domain("Printer"), "printer");
/// ```
pub fn derive_domain(kind_name: &str) -> String {
    let mut domain = kind_name.to_lowercase();
    if let Some(idx) = domain.rfind(PERMISSION_SUFFIX) {
        domain.truncate(idx);
    }
    domain
}

/// Lookup table from kind names to domains
///
/// Seeded with the built-in kinds. Unregistered kinds fall back to
/// [`derive_domain`].
#[derive(Debug, Clone)]
pub struct DomainRegistry {
    domains: BTreeMap<String, String>,
}

impl DomainRegistry {
    /// Registry holding the built-in kinds
    pub fn new() -> Self {
        let domains = BUILTIN_KINDS
            .iter()
            .map(|(kind, domain)| (kind.to_string(), domain.to_string()))
            .collect();
        Self { domains }
    }

    /// Register a kind under its derived domain, returning that domain
    pub fn register(&mut self, kind_name: impl Into<String>) -> String {
        let kind_name = kind_name.into();
        let domain = derive_domain(&kind_name);
        self.register_with_domain(kind_name, domain.clone());
        domain
    }

    /// Register a kind under an explicit domain
    pub fn register_with_domain(&mut self, kind_name: impl Into<String>, domain: impl Into<String>) {
        let kind_name = kind_name.into();
        let domain = domain.into();
        debug!("Registering permission kind {} -> {}", kind_name, domain);
        self.domains.insert(kind_name, domain);
    }

    /// Domain for a kind name
    pub fn domain_for(&self, kind_name: &str) -> String {
        self.domains
            .get(kind_name)
            .cloned()
            .unwrap_or_else(|| derive_domain(kind_name))
    }

    /// Whether a kind name has been registered
    pub fn contains(&self, kind_name: &str) -> bool {
        self.domains.contains_key(kind_name)
    }

    /// Build a permission of the named kind
    ///
    /// An explicit domain in `options` still takes precedence.
    pub fn permission(
        &self,
        name: impl Into<String>,
        kind_name: &str,
        options: PermissionOptions,
    ) -> PermissionResult<NamedPermission> {
        let domain = match options.domain {
            Some(domain) => domain,
            None => self.domain_for(kind_name),
        };
        NamedPermission::from_fields(
            name.into(),
            domain,
            options.actions.as_deref(),
            options.targets.as_deref(),
            options.case_sensitive,
        )
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
