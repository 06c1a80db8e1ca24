//! Role grant module
//!
//! Role grants flow *down* the group tree while membership flows *up*:
//! a role granted to a group is held by all of its descendants, and a caller
//! inherits the roles of every group it is effectively a member of.
//!
//! # Example
//!
//! ```rust
//! use idm_authz::grants::RoleGrantResolver;
//! use idm_authz::store::InMemoryIdentityStore;
//! use idm_authz::types::{Caller, Role, Subject};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryIdentityStore::new());
//! let staff = store.create_group("staff", None)?;
//! let support = store.create_group("support", Some(&staff))?;
//! store.add_caller(Caller::new("joe"))?;
//! store.add_role(Role::new("reader"))?;
//!
//! let resolver = RoleGrantResolver::new(store);
//! resolver.grant_role(&Subject::from(&staff), &Role::new("reader"))?;
//! resolver.add_to_group(&Caller::new("joe"), &support)?;
//!
//! assert!(resolver.caller_has_role(&Caller::new("joe"), &Role::new("reader")));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod resolver;

pub use resolver::RoleGrantResolver;
