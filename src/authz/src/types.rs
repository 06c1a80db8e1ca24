//! Core identity types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Unique caller identifier (the caller name)
pub type CallerId = String;

/// Unique role identifier (the role name)
pub type RoleId = String;

/// Stable group identifier
///
/// Group names are only unique below a given parent, so groups are keyed by
/// an opaque id and the parent link is stored as an id, never as an owned
/// group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl GroupId {
    /// Allocate a fresh group identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller (the authenticated principal)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    /// Caller name (e.g., "joe")
    pub name: CallerId,
}

impl Caller {
    /// Create a new caller
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Role that can be granted to callers and groups
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    /// Role name (e.g., "admin")
    pub name: RoleId,
}

impl Role {
    /// Create a new role
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Group node in the group tree
///
/// Equality and hashing use the id only, so a snapshot taken before a
/// parent change still compares equal to the live group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Stable identifier
    pub id: GroupId,

    /// Simple name, unique among siblings
    pub name: String,

    /// Parent group, `None` for a root group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<GroupId>,
}

impl Group {
    /// Create a root group with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            parent: None,
        }
    }

    /// Create a group nested below `parent`
    pub fn with_parent(name: impl Into<String>, parent: &Group) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            parent: Some(parent.id),
        }
    }

    /// Whether this group has no parent
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Group {}

impl Hash for Group {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Holder of a role grant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Subject {
    /// A caller, by name
    Caller(CallerId),
    /// A group, by id
    Group(GroupId),
}

impl From<&Caller> for Subject {
    fn from(caller: &Caller) -> Self {
        Subject::Caller(caller.name.clone())
    }
}

impl From<&Group> for Subject {
    fn from(group: &Group) -> Self {
        Subject::Group(group.id)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Caller(name) => write!(f, "caller:{}", name),
            Subject::Group(id) => write!(f, "group:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_equality_uses_id() {
        let manager = Group::new("manager");
        let mut moved = manager.clone();
        moved.parent = Some(GroupId::new());

        assert_eq!(manager, moved);
        assert_ne!(manager, Group::new("manager"));
    }

    #[test]
    fn test_nested_group() {
        let manager = Group::new("manager");
        let user = Group::with_parent("user", &manager);

        assert!(manager.is_root());
        assert!(!user.is_root());
        assert_eq!(user.parent, Some(manager.id));
    }

    #[test]
    fn test_subject_conversion() {
        let joe = Caller::new("joe");
        let admins = Group::new("admins");

        assert_eq!(Subject::from(&joe), Subject::Caller("joe".to_string()));
        assert_eq!(Subject::from(&admins), Subject::Group(admins.id));
        assert_eq!(Subject::from(&joe).to_string(), "caller:joe");
    }

    #[test]
    fn test_subject_serialization() {
        let json = serde_json::to_string(&Subject::Caller("joe".to_string())).unwrap();
        assert_eq!(json, r#"{"type":"caller","id":"joe"}"#);
    }
}
