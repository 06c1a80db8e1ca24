//! Role grant resolver
//!
//! Decides whether a caller or group holds a role. Three kinds of facts are
//! combined at query time:
//!
//! - **Direct grants** to callers and groups
//! - **Downward propagation**: a grant on a group applies to all descendants
//! - **Membership**: a caller holds every role held by a group in its
//!   effective membership ancestry
//!
//! Nothing is materialized; a revoke or membership removal is visible to the
//! very next query.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::hierarchy::GroupHierarchy;
use crate::store::RelationshipStore;
use crate::types::{Caller, Group, Role, RoleId, Subject};

/// Resolves role grants over callers, groups and the group tree
pub struct RoleGrantResolver<S: ?Sized = dyn RelationshipStore> {
    store: Arc<S>,
    hierarchy: GroupHierarchy<S>,
}

impl<S: ?Sized> Clone for RoleGrantResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hierarchy: self.hierarchy.clone(),
        }
    }
}

impl<S: RelationshipStore + ?Sized> RoleGrantResolver<S> {
    /// Create a resolver over `store`
    pub fn new(store: Arc<S>) -> Self {
        let hierarchy = GroupHierarchy::new(Arc::clone(&store));
        Self { store, hierarchy }
    }

    /// Group hierarchy over the same store
    pub fn hierarchy(&self) -> &GroupHierarchy<S> {
        &self.hierarchy
    }

    /// Whether `role` is granted to `group` or to any of its ancestors
    pub fn group_has_role(&self, group: &Group, role: &Role) -> bool {
        let held = self
            .hierarchy
            .ancestors_inclusive(group)
            .any(|g| self.directly_granted(&Subject::Group(g.id), role));

        debug!("group_has_role group={} role={}: {}", group.name, role.name, held);
        held
    }

    /// Whether `role` is granted to the caller directly or through any group
    /// in its effective membership ancestry
    pub fn caller_has_role(&self, caller: &Caller, role: &Role) -> bool {
        let held = self.directly_granted(&Subject::from(caller), role)
            || self
                .hierarchy
                .effective_membership_ancestry(caller)
                .into_iter()
                .any(|id| self.directly_granted(&Subject::Group(id), role));

        debug!("caller_has_role caller={} role={}: {}", caller.name, role.name, held);
        held
    }

    /// Whether `subject` holds `role`; unknown groups hold nothing
    pub fn has_role(&self, subject: &Subject, role: &Role) -> bool {
        match subject {
            Subject::Caller(name) => self.caller_has_role(&Caller::new(name.clone()), role),
            Subject::Group(id) => match self.store.group(id) {
                Some(group) => self.group_has_role(&group, role),
                None => {
                    debug!("has_role: unknown group {}", id);
                    false
                }
            },
        }
    }

    /// Every role `subject` holds, directly or by propagation
    pub fn effective_roles(&self, subject: &Subject) -> BTreeSet<RoleId> {
        let mut roles = BTreeSet::new();

        match subject {
            Subject::Caller(name) => {
                roles.extend(self.store.list_direct_role_grants(subject));
                let caller = Caller::new(name.clone());
                // The ancestry is already closed under parents
                for id in self.hierarchy.effective_membership_ancestry(&caller) {
                    roles.extend(self.store.list_direct_role_grants(&Subject::Group(id)));
                }
            }
            Subject::Group(id) => {
                if let Some(group) = self.store.group(id) {
                    for g in self.hierarchy.ancestors_inclusive(&group) {
                        roles.extend(self.store.list_direct_role_grants(&Subject::Group(g.id)));
                    }
                }
            }
        }

        roles
    }

    /// Grant `role` directly to `subject`
    pub fn grant_role(&self, subject: &Subject, role: &Role) -> Result<bool> {
        let changed = self
            .store
            .add_grant(subject, &role.name)
            .inspect_err(|e| warn!("Grant of {} to {} rejected: {}", role.name, subject, e))?;
        if changed {
            info!("Granted role {} to {}", role.name, subject);
        }
        Ok(changed)
    }

    /// Revoke a direct grant of `role` from `subject`
    pub fn revoke_role(&self, subject: &Subject, role: &Role) -> Result<bool> {
        let changed = self
            .store
            .remove_grant(subject, &role.name)
            .inspect_err(|e| warn!("Revoke of {} from {} rejected: {}", role.name, subject, e))?;
        if changed {
            info!("Revoked role {} from {}", role.name, subject);
        }
        Ok(changed)
    }

    /// Make `caller` a direct member of `group`
    pub fn add_to_group(&self, caller: &Caller, group: &Group) -> Result<bool> {
        let changed = self
            .store
            .add_membership(&caller.name, &group.id)
            .inspect_err(|e| warn!("Adding {} to {} rejected: {}", caller.name, group.name, e))?;
        if changed {
            info!("Added caller {} to group {}", caller.name, group.name);
        }
        Ok(changed)
    }

    /// Remove `caller`'s direct membership of `group`
    pub fn remove_from_group(&self, caller: &Caller, group: &Group) -> Result<bool> {
        let changed = self
            .store
            .remove_membership(&caller.name, &group.id)
            .inspect_err(|e| warn!("Removing {} from {} rejected: {}", caller.name, group.name, e))?;
        if changed {
            info!("Removed caller {} from group {}", caller.name, group.name);
        }
        Ok(changed)
    }

    fn directly_granted(&self, subject: &Subject, role: &Role) -> bool {
        self.store.list_direct_role_grants(subject).contains(&role.name)
    }
}
