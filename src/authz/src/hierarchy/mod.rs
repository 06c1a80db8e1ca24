//! Group hierarchy module
//!
//! Ancestor chains, root-anchored path resolution and upward membership
//! propagation over the group tree held by an identity store.
//!
//! # Examples
//!
//! ```
//! use idm_authz::hierarchy::GroupHierarchy;
//! use idm_authz::store::{InMemoryIdentityStore, RelationshipStore};
//! use idm_authz::types::Caller;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryIdentityStore::new());
//! let g2 = store.create_group("g2", None).unwrap();
//! let g3 = store.create_group("g3", Some(&g2)).unwrap();
//! store.add_caller(Caller::new("a3")).unwrap();
//! store.add_membership("a3", &g3.id).unwrap();
//!
//! let hierarchy = GroupHierarchy::new(store);
//! assert!(hierarchy.is_member(&Caller::new("a3"), &g2));
//! ```

mod resolver;


pub use resolver::{Ancestors, GroupHierarchy};
