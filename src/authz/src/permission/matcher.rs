//! Permission implication
//!
//! A held permission implies a requested one when, part by part, each held
//! part is a wildcard or a superset of the requested part. Missing trailing
//! held parts act as wildcards; extra trailing held parts must be wildcards.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{NamedPermission, WILDCARD_TOKEN};

impl NamedPermission {
    /// Whether this (held) permission covers `other` (requested)
    pub fn implies(&self, other: &NamedPermission) -> bool {
        let parts = self.parts();
        let other_parts = other.parts();

        for (i, other_part) in other_parts.iter().enumerate() {
            let Some(part) = parts.get(i) else {
                // Held permission ends here: remaining requested parts are implied
                debug!("{} implies {}: shorter held permission", self, other);
                return true;
            };

            if !part.contains(WILDCARD_TOKEN) && !part.is_superset(other_part) {
                debug!("{} does not imply {}: part {} not covered", self, other, i);
                return false;
            }
        }

        let implied = parts
            .iter()
            .skip(other_parts.len())
            .all(|part| part.contains(WILDCARD_TOKEN));

        debug!("{} implies {}: {}", self, other, implied);
        implied
    }
}

/// Collection of held permissions, unique by parts
///
/// Equality ignores insertion order. Deserializing drops duplicates the
/// same way [`PermissionSet::insert`] does.
///
/// # Examples
///
/// ```
/// use idm_authz::permission::{NamedPermission, PermissionSet};
///
/// let mut held = PermissionSet::new();
/// held.insert(NamedPermission::parse("printer:print").unwrap());
///
/// assert!(held.implies(&NamedPermission::parse("printer:print:lp7200").unwrap()));
/// assert!(!held.implies(&NamedPermission::parse("printer:query").unwrap()));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<NamedPermission>", into = "Vec<NamedPermission>")]
pub struct PermissionSet {
    permissions: Vec<NamedPermission>,
}

impl PermissionSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permission; duplicates (by parts) are ignored
    pub fn insert(&mut self, permission: NamedPermission) -> bool {
        if self.permissions.contains(&permission) {
            return false;
        }
        self.permissions.push(permission);
        true
    }

    /// Remove a permission (by parts)
    pub fn remove(&mut self, permission: &NamedPermission) -> bool {
        let before = self.permissions.len();
        self.permissions.retain(|p| p != permission);
        before != self.permissions.len()
    }

    /// Whether any held permission implies `requested`
    pub fn implies(&self, requested: &NamedPermission) -> bool {
        let granted = self.permissions.iter().find(|held| held.implies(requested));

        match granted {
            Some(held) => {
                debug!("Permission {} granted by {}", requested, held);
                true
            }
            None => {
                debug!("Permission {} not held", requested);
                false
            }
        }
    }

    /// Number of held permissions
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Iterate over held permissions
    pub fn iter(&self) -> impl Iterator<Item = &NamedPermission> {
        self.permissions.iter()
    }
}

impl PartialEq for PermissionSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|p| other.permissions.contains(p))
    }
}

impl Eq for PermissionSet {}

impl From<Vec<NamedPermission>> for PermissionSet {
    fn from(permissions: Vec<NamedPermission>) -> Self {
        permissions.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<NamedPermission> {
    fn from(set: PermissionSet) -> Self {
        set.permissions
    }
}

impl FromIterator<NamedPermission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = NamedPermission>>(iter: I) -> Self {
        let mut set = Self::new();
        for permission in iter {
            set.insert(permission);
        }
        set
    }
}
