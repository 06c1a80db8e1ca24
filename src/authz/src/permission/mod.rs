//! Wildcard permission module
//!
//! Permissions are colon-delimited, comma-expandable strings of the shape
//! `domain[:actions][:targets]`, with `*` as the match-anything token.
//!
//! # Examples
//!
//! ```
//! use idm_authz::permission::NamedPermission;
//!
//! let held = NamedPermission::new("all").unwrap();
//! let requested = NamedPermission::with_actions("docs", "read").unwrap();
//!
//! assert_eq!(requested.to_string(), "named:read");
//! assert!(held.implies(&requested));
//! ```

mod kind;
mod matcher;
mod types;


pub use kind::{derive_domain, DomainRegistry, PermissionKind};
pub use matcher::PermissionSet;
pub use types::{
    is_valid_domain, NamedPermission, Part, PermissionError, PermissionOptions, PermissionResult,
    DEFAULT_CASE_SENSITIVE, PART_DIVIDER_TOKEN, SUBPART_DIVIDER_TOKEN, WILDCARD_TOKEN,
};
