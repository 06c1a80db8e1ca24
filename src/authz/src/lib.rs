//! # Identity Authorization Core
//!
//! Wildcard permission matching and hierarchical identity relationship
//! resolution.
//!
//! ## Features
//!
//! - **Wildcard permissions**: `domain[:actions][:targets]` with comma
//!   expansion and `*` tokens, plus an implication relation
//! - **Group hierarchy**: root-anchored path resolution and upward
//!   membership propagation
//! - **Role grants**: direct grants to callers or groups, propagated down the
//!   group tree and inherited through membership
//! - **Synchronous and cache-free**: every query reads the current store state
//!
//! ## Example
//!
//! ```rust
//! use idm_authz::{AuthzEngine, Caller, EngineConfig, InMemoryIdentityStore, Role, Subject};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryIdentityStore::new());
//!     let engine = AuthzEngine::with_store(EngineConfig::default(), store.clone())?;
//!
//!     let manager = store.create_group("manager", None)?;
//!     let user = store.create_group("user", Some(&manager))?;
//!     store.add_caller(Caller::new("joe"))?;
//!     store.add_role(Role::new("approver"))?;
//!
//!     engine.add_to_group(&Caller::new("joe"), &user)?;
//!     engine.grant_role(&Subject::from(&manager), &Role::new("approver"))?;
//!
//!     assert!(engine.is_member("joe", "/manager"));
//!     assert!(engine.has_role("joe", "approver"));
//!
//!     let held = engine.parse_permission("printer:print")?;
//!     assert!(held.implies(&engine.parse_permission("printer:print:lp7200")?));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod grants;
pub mod hierarchy;
pub mod permission;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::AuthzEngine;
pub use error::{AuthzError, Result};
pub use grants::RoleGrantResolver;
pub use hierarchy::GroupHierarchy;
pub use permission::{
    DomainRegistry, NamedPermission, PermissionError, PermissionKind, PermissionOptions,
    PermissionSet,
};
pub use store::{IdentityStore, InMemoryIdentityStore, RelationshipStore};
pub use types::{Caller, Group, GroupId, Role, Subject};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
