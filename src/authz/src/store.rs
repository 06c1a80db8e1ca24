//! Identity store contract and in-memory implementation
//!
//! The resolvers only read entities and relationships through
//! [`IdentityStore`] and mutate relationships through [`RelationshipStore`].
//! Each call observes the store state at that moment; nothing is cached
//! between calls.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::error::{AuthzError, Result};
use crate::types::{Caller, CallerId, Group, GroupId, Role, RoleId, Subject};

/// Separator used when rendering group paths
pub const GROUP_PATH_SEPARATOR: char = '/';

/// Read-side identity store contract
pub trait IdentityStore: Send + Sync {
    /// Find a caller by name
    fn find_caller_by_name(&self, name: &str) -> Option<Caller>;

    /// Find a role by name
    fn find_role_by_name(&self, name: &str) -> Option<Role>;

    /// Find a group with this simple name at any depth
    fn find_group_by_simple_name(&self, name: &str) -> Option<Group>;

    /// Find a group with this simple name directly below `parent`
    ///
    /// `None` as the parent selects root groups only.
    fn find_group_by_simple_name_under(&self, name: &str, parent: Option<&GroupId>) -> Option<Group>;

    /// Look up a group by id
    fn group(&self, id: &GroupId) -> Option<Group>;

    /// Parent of a group, `None` for roots and unknown groups
    fn parent_of(&self, group: &GroupId) -> Option<Group>;

    /// Direct children of a group
    fn children_of(&self, group: &GroupId) -> Vec<Group>;

    /// Groups the caller belongs to directly
    fn list_direct_group_memberships(&self, caller: &str) -> HashSet<GroupId>;

    /// Roles granted directly to the subject
    fn list_direct_role_grants(&self, subject: &Subject) -> HashSet<RoleId>;
}

/// Relationship mutation contract
///
/// Insert and remove report whether the relation changed. Mutations that
/// reference an entity missing from the store are rejected with
/// [`AuthzError::NotFound`].
pub trait RelationshipStore: IdentityStore {
    /// Record that `caller` is a direct member of `group`
    fn add_membership(&self, caller: &str, group: &GroupId) -> Result<bool>;

    /// Remove a direct membership
    fn remove_membership(&self, caller: &str, group: &GroupId) -> Result<bool>;

    /// Grant `role` directly to `subject`
    fn add_grant(&self, subject: &Subject, role: &str) -> Result<bool>;

    /// Revoke a direct grant
    fn remove_grant(&self, subject: &Subject, role: &str) -> Result<bool>;
}

#[derive(Debug, Default)]
struct StoreState {
    callers: HashMap<CallerId, Caller>,
    roles: HashMap<RoleId, Role>,
    /// Group arena
    groups: HashMap<GroupId, Group>,
    /// (parent, simple name) -> group
    by_parent: HashMap<(Option<GroupId>, String), GroupId>,
    memberships: HashMap<CallerId, HashSet<GroupId>>,
    grants: HashMap<Subject, HashSet<RoleId>>,
}

impl StoreState {
    fn depth(&self, id: &GroupId) -> usize {
        let mut depth = 0;
        let mut current = self.groups.get(id).and_then(|g| g.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.groups.get(&parent).and_then(|g| g.parent);
        }
        depth
    }

    fn require_caller(&self, name: &str) -> Result<()> {
        if self.callers.contains_key(name) {
            Ok(())
        } else {
            Err(AuthzError::NotFound(format!("caller '{}'", name)))
        }
    }

    fn require_role(&self, name: &str) -> Result<()> {
        if self.roles.contains_key(name) {
            Ok(())
        } else {
            Err(AuthzError::NotFound(format!("role '{}'", name)))
        }
    }

    fn require_group(&self, id: &GroupId) -> Result<()> {
        if self.groups.contains_key(id) {
            Ok(())
        } else {
            Err(AuthzError::NotFound(format!("group {}", id)))
        }
    }

    fn require_subject(&self, subject: &Subject) -> Result<()> {
        match subject {
            Subject::Caller(name) => self.require_caller(name),
            Subject::Group(id) => self.require_group(id),
        }
    }
}

/// In-memory identity store
///
/// Groups live in an arena keyed by [`GroupId`] with a (parent, name)
/// index. Every method takes the lock for its own duration only, so a
/// mutate-then-query sequence is not atomic.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    state: RwLock<StoreState>,
}

impl InMemoryIdentityStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a caller
    pub fn add_caller(&self, caller: Caller) -> Result<()> {
        let mut state = self.state.write();
        if caller.name.trim().is_empty() {
            return Err(AuthzError::InvalidInput("caller name cannot be empty".to_string()));
        }
        if state.callers.contains_key(&caller.name) {
            return Err(AuthzError::DuplicateEntity(format!("caller '{}'", caller.name)));
        }
        info!("Adding caller {}", caller.name);
        state.callers.insert(caller.name.clone(), caller);
        Ok(())
    }

    /// Add a role
    pub fn add_role(&self, role: Role) -> Result<()> {
        let mut state = self.state.write();
        if role.name.trim().is_empty() {
            return Err(AuthzError::InvalidInput("role name cannot be empty".to_string()));
        }
        if state.roles.contains_key(&role.name) {
            return Err(AuthzError::DuplicateEntity(format!("role '{}'", role.name)));
        }
        info!("Adding role {}", role.name);
        state.roles.insert(role.name.clone(), role);
        Ok(())
    }

    /// Add a group
    ///
    /// The parent must already exist and the name must be unique among its
    /// siblings. Names cannot contain the path separator.
    pub fn add_group(&self, group: Group) -> Result<()> {
        let mut state = self.state.write();

        if group.name.trim().is_empty() || group.name.contains(GROUP_PATH_SEPARATOR) {
            return Err(AuthzError::InvalidInput(format!(
                "invalid group name '{}'",
                group.name
            )));
        }
        if state.groups.contains_key(&group.id) {
            return Err(AuthzError::DuplicateEntity(format!("group {}", group.id)));
        }
        if let Some(parent) = &group.parent {
            state.require_group(parent)?;
        }

        let key = (group.parent, group.name.clone());
        if state.by_parent.contains_key(&key) {
            return Err(AuthzError::DuplicateEntity(format!(
                "group '{}' already exists under this parent",
                group.name
            )));
        }

        info!("Adding group {} ({})", group.name, group.id);
        state.by_parent.insert(key, group.id);
        state.groups.insert(group.id, group);
        Ok(())
    }

    /// Create and add a group, returning it
    pub fn create_group(&self, name: impl Into<String>, parent: Option<&Group>) -> Result<Group> {
        let name = name.into();
        let group = match parent {
            Some(parent) => Group::with_parent(name, parent),
            None => Group::new(name),
        };
        self.add_group(group.clone())?;
        Ok(group)
    }

    /// Remove a caller and its memberships and grants
    pub fn remove_caller(&self, name: &str) -> Result<()> {
        let mut state = self.state.write();
        state.require_caller(name)?;

        info!("Removing caller {}", name);
        state.callers.remove(name);
        state.memberships.remove(name);
        state.grants.remove(&Subject::Caller(name.to_string()));
        Ok(())
    }

    /// Remove a role and every grant of it
    pub fn remove_role(&self, name: &str) -> Result<()> {
        let mut state = self.state.write();
        state.require_role(name)?;

        info!("Removing role {}", name);
        state.roles.remove(name);
        state.grants.retain(|_, roles| {
            roles.remove(name);
            !roles.is_empty()
        });
        Ok(())
    }

    /// Remove a leaf group and every relationship that references it
    pub fn remove_group(&self, id: &GroupId) -> Result<()> {
        let mut state = self.state.write();
        state.require_group(id)?;

        if state.groups.values().any(|g| g.parent.as_ref() == Some(id)) {
            warn!("Refusing to remove group {} with children", id);
            return Err(AuthzError::InvalidInput(format!(
                "group {} still has child groups",
                id
            )));
        }

        if let Some(group) = state.groups.remove(id) {
            info!("Removing group {} ({})", group.name, id);
            state.by_parent.remove(&(group.parent, group.name));
        }
        state.memberships.retain(|_, groups| {
            groups.remove(id);
            !groups.is_empty()
        });
        state.grants.remove(&Subject::Group(*id));
        Ok(())
    }

    /// Move a group below a new parent (`None` makes it a root)
    ///
    /// Rejects moves that would place a group below itself.
    pub fn set_parent(&self, id: &GroupId, new_parent: Option<&GroupId>) -> Result<()> {
        let mut state = self.state.write();
        state.require_group(id)?;

        if let Some(parent) = new_parent {
            state.require_group(parent)?;

            let mut current = Some(*parent);
            while let Some(ancestor) = current {
                if ancestor == *id {
                    warn!("Rejecting parent change for group {}: cycle", id);
                    return Err(AuthzError::CycleDetected(format!(
                        "group {} cannot be placed below {}",
                        id, parent
                    )));
                }
                current = state.groups.get(&ancestor).and_then(|g| g.parent);
            }
        }

        let (old_key, name) = match state.groups.get(id) {
            Some(group) => ((group.parent, group.name.clone()), group.name.clone()),
            None => return Err(AuthzError::NotFound(format!("group {}", id))),
        };
        let new_key = (new_parent.copied(), name);
        if old_key == new_key {
            return Ok(());
        }
        if state.by_parent.contains_key(&new_key) {
            return Err(AuthzError::DuplicateEntity(format!(
                "group '{}' already exists under this parent",
                new_key.1
            )));
        }

        info!("Moving group {} below {:?}", id, new_parent);
        state.by_parent.remove(&old_key);
        state.by_parent.insert(new_key, *id);
        if let Some(group) = state.groups.get_mut(id) {
            group.parent = new_parent.copied();
        }
        Ok(())
    }

    /// All groups currently in the store
    pub fn groups(&self) -> Vec<Group> {
        self.state.read().groups.values().cloned().collect()
    }

    /// Render a group's absolute path, e.g. `/manager/user`
    pub fn path_of(&self, id: &GroupId) -> Option<String> {
        let state = self.state.read();
        let mut names = Vec::new();
        let mut current = Some(*id);
        while let Some(group_id) = current {
            let group = state.groups.get(&group_id)?;
            names.push(group.name.clone());
            current = group.parent;
        }
        names.reverse();
        Some(format!("{}{}", GROUP_PATH_SEPARATOR, names.join("/")))
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn find_caller_by_name(&self, name: &str) -> Option<Caller> {
        self.state.read().callers.get(name).cloned()
    }

    fn find_role_by_name(&self, name: &str) -> Option<Role> {
        self.state.read().roles.get(name).cloned()
    }

    fn find_group_by_simple_name(&self, name: &str) -> Option<Group> {
        let state = self.state.read();
        // Prefer the shallowest match so root groups win over nested ones
        state
            .groups
            .values()
            .filter(|g| g.name == name)
            .min_by_key(|g| (state.depth(&g.id), g.id))
            .cloned()
    }

    fn find_group_by_simple_name_under(&self, name: &str, parent: Option<&GroupId>) -> Option<Group> {
        let state = self.state.read();
        let id = state.by_parent.get(&(parent.copied(), name.to_string()))?;
        state.groups.get(id).cloned()
    }

    fn group(&self, id: &GroupId) -> Option<Group> {
        self.state.read().groups.get(id).cloned()
    }

    fn parent_of(&self, group: &GroupId) -> Option<Group> {
        let state = self.state.read();
        let parent = state.groups.get(group)?.parent?;
        state.groups.get(&parent).cloned()
    }

    fn children_of(&self, group: &GroupId) -> Vec<Group> {
        self.state
            .read()
            .groups
            .values()
            .filter(|g| g.parent.as_ref() == Some(group))
            .cloned()
            .collect()
    }

    fn list_direct_group_memberships(&self, caller: &str) -> HashSet<GroupId> {
        self.state
            .read()
            .memberships
            .get(caller)
            .cloned()
            .unwrap_or_default()
    }

    fn list_direct_role_grants(&self, subject: &Subject) -> HashSet<RoleId> {
        self.state
            .read()
            .grants
            .get(subject)
            .cloned()
            .unwrap_or_default()
    }
}

impl RelationshipStore for InMemoryIdentityStore {
    fn add_membership(&self, caller: &str, group: &GroupId) -> Result<bool> {
        let mut state = self.state.write();
        state.require_caller(caller)?;
        state.require_group(group)?;

        Ok(state
            .memberships
            .entry(caller.to_string())
            .or_default()
            .insert(*group))
    }

    fn remove_membership(&self, caller: &str, group: &GroupId) -> Result<bool> {
        let mut state = self.state.write();
        state.require_caller(caller)?;
        state.require_group(group)?;

        let Some(groups) = state.memberships.get_mut(caller) else {
            return Ok(false);
        };
        let removed = groups.remove(group);
        if groups.is_empty() {
            state.memberships.remove(caller);
        }
        Ok(removed)
    }

    fn add_grant(&self, subject: &Subject, role: &str) -> Result<bool> {
        let mut state = self.state.write();
        state.require_subject(subject)?;
        state.require_role(role)?;

        Ok(state
            .grants
            .entry(subject.clone())
            .or_default()
            .insert(role.to_string()))
    }

    fn remove_grant(&self, subject: &Subject, role: &str) -> Result<bool> {
        let mut state = self.state.write();
        state.require_subject(subject)?;
        state.require_role(role)?;

        let Some(roles) = state.grants.get_mut(subject) else {
            return Ok(false);
        };
        let removed = roles.remove(role);
        if roles.is_empty() {
            state.grants.remove(subject);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_find_entities() {
        let store = InMemoryIdentityStore::new();
        assert!(store.find_caller_by_name("joe").is_none());

        store.add_caller(Caller::new("joe")).unwrap();
        store.add_role(Role::new("admin")).unwrap();

        assert_eq!(store.find_caller_by_name("joe"), Some(Caller::new("joe")));
        assert_eq!(store.find_role_by_name("admin"), Some(Role::new("admin")));
        assert!(store.find_role_by_name("bottle washer").is_none());
    }

    #[test]
    fn test_duplicate_entities_rejected() {
        let store = InMemoryIdentityStore::new();
        store.add_caller(Caller::new("joe")).unwrap();
        assert!(matches!(
            store.add_caller(Caller::new("joe")),
            Err(AuthzError::DuplicateEntity(_))
        ));

        let manager = store.create_group("manager", None).unwrap();
        assert!(store.create_group("manager", None).is_err());
        // same name below a different parent is fine
        assert!(store.create_group("manager", Some(&manager)).is_ok());
    }

    #[test]
    fn test_group_requires_known_parent() {
        let store = InMemoryIdentityStore::new();
        let orphan_parent = Group::new("ghost");
        let result = store.create_group("child", Some(&orphan_parent));
        assert!(matches!(result, Err(AuthzError::NotFound(_))));
    }

    #[test]
    fn test_group_name_validation() {
        let store = InMemoryIdentityStore::new();
        assert!(matches!(
            store.create_group("a/b", None),
            Err(AuthzError::InvalidInput(_))
        ));
        assert!(store.create_group("  ", None).is_err());
    }

    #[test]
    fn test_find_group_by_simple_name() {
        let store = InMemoryIdentityStore::new();
        let manager = store.create_group("manager", None).unwrap();
        let user = store.create_group("user", Some(&manager)).unwrap();

        assert_eq!(store.find_group_by_simple_name("user"), Some(user.clone()));
        assert_eq!(store.find_group_by_simple_name_under("user", Some(&manager.id)), Some(user));
        assert!(store.find_group_by_simple_name_under("user", None).is_none());
        assert_eq!(store.find_group_by_simple_name_under("manager", None), Some(manager));
    }

    #[test]
    fn test_simple_name_prefers_root() {
        let store = InMemoryIdentityStore::new();
        let a = store.create_group("a", None).unwrap();
        let _nested = store.create_group("shared", Some(&a)).unwrap();
        let root = store.create_group("shared", None).unwrap();

        assert_eq!(store.find_group_by_simple_name("shared"), Some(root));
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let store = InMemoryIdentityStore::new();
        let g1 = store.create_group("g1", None).unwrap();
        let g2 = store.create_group("g2", Some(&g1)).unwrap();
        let g3 = store.create_group("g3", Some(&g2)).unwrap();

        assert!(matches!(
            store.set_parent(&g1.id, Some(&g3.id)),
            Err(AuthzError::CycleDetected(_))
        ));
        assert!(matches!(
            store.set_parent(&g1.id, Some(&g1.id)),
            Err(AuthzError::CycleDetected(_))
        ));

        store.set_parent(&g3.id, None).unwrap();
        assert!(store.parent_of(&g3.id).is_none());
        assert_eq!(store.path_of(&g3.id).as_deref(), Some("/g3"));
    }

    #[test]
    fn test_path_of() {
        let store = InMemoryIdentityStore::new();
        let manager = store.create_group("manager", None).unwrap();
        let user = store.create_group("user", Some(&manager)).unwrap();

        assert_eq!(store.path_of(&manager.id).as_deref(), Some("/manager"));
        assert_eq!(store.path_of(&user.id).as_deref(), Some("/manager/user"));
        assert!(store.path_of(&GroupId::new()).is_none());
    }

    #[test]
    fn test_relationship_mutations_require_entities() {
        let store = InMemoryIdentityStore::new();
        let g1 = store.create_group("g1", None).unwrap();
        store.add_role(Role::new("r1")).unwrap();

        assert!(matches!(
            store.add_membership("nobody", &g1.id),
            Err(AuthzError::NotFound(_))
        ));
        assert!(matches!(
            store.add_grant(&Subject::Group(g1.id), "missing"),
            Err(AuthzError::NotFound(_))
        ));

        store.add_caller(Caller::new("a1")).unwrap();
        assert!(store.add_membership("a1", &g1.id).unwrap());
        assert!(!store.add_membership("a1", &g1.id).unwrap());
        assert!(store.remove_membership("a1", &g1.id).unwrap());
        assert!(!store.remove_membership("a1", &g1.id).unwrap());
    }

    #[test]
    fn test_remove_group_cleans_relationships() {
        let store = InMemoryIdentityStore::new();
        let parent = store.create_group("parent", None).unwrap();
        let child = store.create_group("child", Some(&parent)).unwrap();
        store.add_caller(Caller::new("a1")).unwrap();
        store.add_role(Role::new("r1")).unwrap();
        store.add_membership("a1", &child.id).unwrap();
        store.add_grant(&Subject::Group(child.id), "r1").unwrap();

        assert!(store.remove_group(&parent.id).is_err());

        store.remove_group(&child.id).unwrap();
        assert!(store.list_direct_group_memberships("a1").is_empty());
        assert!(store.list_direct_role_grants(&Subject::Group(child.id)).is_empty());
        assert!(store.find_group_by_simple_name_under("child", Some(&parent.id)).is_none());
    }

    #[test]
    fn test_removing_last_relationship_prunes_entry() {
        let store = InMemoryIdentityStore::new();
        let g1 = store.create_group("g1", None).unwrap();
        store.add_caller(Caller::new("a1")).unwrap();
        store.add_role(Role::new("r1")).unwrap();
        let subject = Subject::Caller("a1".to_string());

        store.add_membership("a1", &g1.id).unwrap();
        store.add_grant(&subject, "r1").unwrap();
        assert!(store.remove_membership("a1", &g1.id).unwrap());
        assert!(store.remove_grant(&subject, "r1").unwrap());

        let state = store.state.read();
        assert!(state.memberships.is_empty());
        assert!(state.grants.is_empty());
    }

    #[test]
    fn test_remove_role_drops_grants() {
        let store = InMemoryIdentityStore::new();
        store.add_caller(Caller::new("a1")).unwrap();
        store.add_role(Role::new("r1")).unwrap();
        let subject = Subject::Caller("a1".to_string());
        store.add_grant(&subject, "r1").unwrap();

        store.remove_role("r1").unwrap();
        assert!(store.list_direct_role_grants(&subject).is_empty());
    }
}
