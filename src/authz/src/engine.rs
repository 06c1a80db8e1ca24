//! Authorization engine facade
//!
//! Ties the identity store, group hierarchy, role grants and permission
//! construction together behind name-based lookups.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::grants::RoleGrantResolver;
use crate::hierarchy::GroupHierarchy;
use crate::permission::{DomainRegistry, NamedPermission, PermissionOptions, PermissionSet};
use crate::store::{InMemoryIdentityStore, RelationshipStore};
use crate::types::{Caller, Group, Role, Subject};

/// Main authorization engine
///
/// # Architecture
///
/// ```text
/// name / path → IdentityStore lookup → GroupHierarchy ─┐
///                                   → RoleGrantResolver ┴→ bool
/// wildcard string → DomainRegistry → NamedPermission → implies → bool
/// ```
pub struct AuthzEngine {
    /// Identity and relationship storage
    store: Arc<dyn RelationshipStore>,

    /// Role resolution over the group tree
    grants: RoleGrantResolver,

    /// Permission kind to domain mapping
    registry: DomainRegistry,

    /// Engine configuration
    config: EngineConfig,
}

impl AuthzEngine {
    /// Engine with default configuration over an empty in-memory store
    pub fn new() -> Self {
        Self::build(EngineConfig::default(), Arc::new(InMemoryIdentityStore::new()))
    }

    /// Engine over `store` with the given configuration
    pub fn with_store(config: EngineConfig, store: Arc<dyn RelationshipStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, store))
    }

    fn build(config: EngineConfig, store: Arc<dyn RelationshipStore>) -> Self {
        let mut registry = DomainRegistry::new();
        for (kind, domain) in &config.permission_kinds {
            registry.register_with_domain(kind.clone(), domain.clone());
        }

        info!(
            "AuthzEngine initialized with case_sensitive={}, default_domain={}, kinds={}",
            config.case_sensitive_permissions,
            config.default_domain,
            config.permission_kinds.len()
        );

        Self {
            grants: RoleGrantResolver::new(Arc::clone(&store)),
            store,
            registry,
            config,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Identity store
    pub fn store(&self) -> &Arc<dyn RelationshipStore> {
        &self.store
    }

    /// Role grant resolver
    pub fn grants(&self) -> &RoleGrantResolver {
        &self.grants
    }

    /// Group hierarchy resolver
    pub fn hierarchy(&self) -> &GroupHierarchy<dyn RelationshipStore> {
        self.grants.hierarchy()
    }

    /// Permission kind registry
    pub fn registry_mut(&mut self) -> &mut DomainRegistry {
        &mut self.registry
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Find a caller by name
    pub fn caller(&self, name: &str) -> Option<Caller> {
        self.store.find_caller_by_name(name)
    }

    /// Find a role by name
    pub fn role(&self, name: &str) -> Option<Role> {
        self.store.find_role_by_name(name)
    }

    /// Resolve a root-anchored group path such as `/manager/user`
    pub fn group(&self, path: &str) -> Option<Group> {
        self.hierarchy().resolve_group_by_path(path)
    }

    /// Find a group by simple name directly below `parent` (`None` for root)
    pub fn group_under(&self, name: &str, parent: Option<&Group>) -> Option<Group> {
        self.hierarchy().resolve_group(name, parent)
    }

    // ------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------

    /// Whether the named caller is a member of the group at `group_path`
    pub fn is_member(&self, caller: &str, group_path: &str) -> bool {
        match (self.caller(caller), self.group(group_path)) {
            (Some(caller), Some(group)) => self.hierarchy().is_member(&caller, &group),
            _ => {
                debug!("is_member: unknown caller {} or group {}", caller, group_path);
                false
            }
        }
    }

    /// Whether the named caller holds the named role
    pub fn has_role(&self, caller: &str, role: &str) -> bool {
        match (self.caller(caller), self.role(role)) {
            (Some(caller), Some(role)) => self.grants.caller_has_role(&caller, &role),
            _ => {
                debug!("has_role: unknown caller {} or role {}", caller, role);
                false
            }
        }
    }

    /// Whether the group at `group_path` holds the named role
    pub fn group_has_role(&self, group_path: &str, role: &str) -> bool {
        match (self.group(group_path), self.role(role)) {
            (Some(group), Some(role)) => self.grants.group_has_role(&group, &role),
            _ => {
                debug!("group_has_role: unknown group {} or role {}", group_path, role);
                false
            }
        }
    }

    /// Whether any permission in `held` covers `requested`
    pub fn is_permitted(&self, held: &PermissionSet, requested: &NamedPermission) -> bool {
        held.implies(requested)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Grant `role` to `subject`
    pub fn grant_role(&self, subject: &Subject, role: &Role) -> Result<bool> {
        self.grants.grant_role(subject, role)
    }

    /// Revoke `role` from `subject`
    pub fn revoke_role(&self, subject: &Subject, role: &Role) -> Result<bool> {
        self.grants.revoke_role(subject, role)
    }

    /// Make `caller` a direct member of `group`
    pub fn add_to_group(&self, caller: &Caller, group: &Group) -> Result<bool> {
        self.grants.add_to_group(caller, group)
    }

    /// Remove `caller`'s direct membership of `group`
    pub fn remove_from_group(&self, caller: &Caller, group: &Group) -> Result<bool> {
        self.grants.remove_from_group(caller, group)
    }

    // ------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------

    /// Build a plain named permission under the configured default domain
    pub fn permission(&self, name: &str, options: PermissionOptions) -> Result<NamedPermission> {
        let options = self.apply_case(options);
        let options = match options.domain {
            Some(_) => options,
            None => options.with_domain(self.config.default_domain.clone()),
        };
        Ok(self.registry.permission(name, "", options)?)
    }

    /// Build a permission of a registered (or derivable) kind
    pub fn permission_of_kind(
        &self,
        name: &str,
        kind_name: &str,
        options: PermissionOptions,
    ) -> Result<NamedPermission> {
        let options = self.apply_case(options);
        Ok(self.registry.permission(name, kind_name, options)?)
    }

    /// Parse a wildcard string under the configured case mode
    pub fn parse_permission(&self, wildcard: &str) -> Result<NamedPermission> {
        Ok(NamedPermission::parse_with_case(
            wildcard,
            self.config.case_sensitive_permissions,
        )?)
    }

    fn apply_case(&self, options: PermissionOptions) -> PermissionOptions {
        let case_sensitive = options.case_sensitive || self.config.case_sensitive_permissions;
        options.case_sensitive(case_sensitive)
    }
}

impl Default for AuthzEngine {
    fn default() -> Self {
        Self::new()
    }
}
