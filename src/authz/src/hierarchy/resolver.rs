//! Group hierarchy resolver
//!
//! Walks the group tree through the identity store: ancestor chains, path
//! resolution and caller membership. Membership propagates upward: a direct
//! member of a nested group is a member of every ancestor of that group.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

use crate::store::{IdentityStore, GROUP_PATH_SEPARATOR};
use crate::types::{Caller, Group, GroupId};

/// Iterator over a group and its ancestors, nearest first
///
/// Terminates because the store keeps the tree acyclic.
pub struct Ancestors<'a, S: ?Sized> {
    store: &'a S,
    next: Option<Group>,
}

impl<'a, S: IdentityStore + ?Sized> Iterator for Ancestors<'a, S> {
    type Item = Group;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = self.store.parent_of(&current.id);
        Some(current)
    }
}

impl<'a, S: ?Sized> Clone for Ancestors<'a, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            next: self.next.clone(),
        }
    }
}

/// Resolves group relationships over an identity store
///
/// # Examples
///
/// ```
/// use idm_authz::hierarchy::GroupHierarchy;
/// use idm_authz::store::InMemoryIdentityStore;
/// use std::sync::Arc;
///
/// let store = Arc::new(InMemoryIdentityStore::new());
/// let manager = store.create_group("manager", None).unwrap();
/// let user = store.create_group("user", Some(&manager)).unwrap();
///
/// let hierarchy = GroupHierarchy::new(store);
/// assert_eq!(hierarchy.resolve_group_by_path("/manager/user"), Some(user));
/// assert_eq!(hierarchy.resolve_group_by_path("user"), None);
/// ```
pub struct GroupHierarchy<S: ?Sized = dyn IdentityStore> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for GroupHierarchy<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: IdentityStore + ?Sized> GroupHierarchy<S> {
    /// Create a resolver over `store`
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// `group`, its parent, grandparent and so on up to the root
    pub fn ancestors_inclusive(&self, group: &Group) -> Ancestors<'_, S> {
        Ancestors {
            store: self.store.as_ref(),
            next: Some(group.clone()),
        }
    }

    /// Whether `ancestor` is a strict ancestor of `group`
    pub fn is_ancestor(&self, ancestor: &Group, group: &Group) -> bool {
        self.ancestors_inclusive(group).skip(1).any(|g| g.id == ancestor.id)
    }

    /// `group` followed by all of its descendants, breadth first
    pub fn descendants_inclusive(&self, group: &Group) -> Vec<Group> {
        let mut result = Vec::new();
        let mut queue = VecDeque::from([group.clone()]);

        while let Some(current) = queue.pop_front() {
            queue.extend(self.store.children_of(&current.id));
            result.push(current);
        }

        result
    }

    /// Resolve a group path
    ///
    /// The path is always anchored at the root: `/a/b` and `a/b` both require
    /// `a` to be a root group with a child `b`. An empty segment (as in
    /// `/manager/`) never matches, so such paths resolve to `None`.
    pub fn resolve_group_by_path(&self, path: &str) -> Option<Group> {
        let relative = path.strip_prefix(GROUP_PATH_SEPARATOR).unwrap_or(path);

        let mut current: Option<Group> = None;
        for segment in relative.split(GROUP_PATH_SEPARATOR) {
            if segment.is_empty() {
                debug!("Group path {:?} has an empty segment", path);
                return None;
            }

            let parent = current.as_ref().map(|g| g.id);
            match self.store.find_group_by_simple_name_under(segment, parent.as_ref()) {
                Some(group) => current = Some(group),
                None => {
                    debug!("Group path {:?} not found at segment {:?}", path, segment);
                    return None;
                }
            }
        }

        debug!("Resolved group path {:?}", path);
        current
    }

    /// Resolve a group by simple name and exact parent
    ///
    /// `None` as the expected parent requires a root group. The name is
    /// matched literally; it is not interpreted as a path.
    pub fn resolve_group(&self, name: &str, expected_parent: Option<&Group>) -> Option<Group> {
        let parent = expected_parent.map(|g| g.id);
        self.store.find_group_by_simple_name_under(name, parent.as_ref())
    }

    /// Every group the caller is a member of, directly or through a
    /// descendant it belongs to
    pub fn effective_membership_ancestry(&self, caller: &Caller) -> HashSet<GroupId> {
        let mut ancestry = HashSet::new();

        for group_id in self.store.list_direct_group_memberships(&caller.name) {
            let Some(group) = self.store.group(&group_id) else {
                continue;
            };
            for ancestor in self.ancestors_inclusive(&group) {
                // Already walked from here through a sibling membership
                if !ancestry.insert(ancestor.id) {
                    break;
                }
            }
        }

        ancestry
    }

    /// Whether the caller is a member of `group`, directly or by belonging
    /// to one of its descendants
    pub fn is_member(&self, caller: &Caller, group: &Group) -> bool {
        let member = self.effective_membership_ancestry(caller).contains(&group.id);
        debug!("is_member caller={} group={}: {}", caller.name, group.name, member);
        member
    }

    /// Absolute path of `group`, e.g. `/manager/user`
    pub fn path_of(&self, group: &Group) -> String {
        let mut names: Vec<String> = self.ancestors_inclusive(group).map(|g| g.name).collect();
        names.reverse();

        let mut path = String::new();
        for name in names {
            path.push(GROUP_PATH_SEPARATOR);
            path.push_str(&name);
        }
        path
    }
}
