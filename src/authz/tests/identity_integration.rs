//! Integration tests for identity resolution
//!
//! Drives the engine through its public API with the lookup, group,
//! membership and grant scenarios of a small realm.

use idm_authz::{
    AuthzEngine, AuthzError, Caller, EngineConfig, Group, IdentityStore, InMemoryIdentityStore,
    Role, Subject,
};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup() -> (AuthzEngine, Arc<InMemoryIdentityStore>) {
    init_tracing();
    let store = Arc::new(InMemoryIdentityStore::new());
    let engine = AuthzEngine::with_store(EngineConfig::default(), store.clone()).unwrap();
    (engine, store)
}

#[test]
fn test_caller_lookup() {
    let (engine, store) = setup();
    assert!(engine.caller("foo").is_none());

    for name in ["joe", "sam", "mary"] {
        store.add_caller(Caller::new(name)).unwrap();
    }

    assert_eq!(engine.caller("joe"), Some(Caller::new("joe")));
    assert_eq!(engine.caller("sam"), Some(Caller::new("sam")));
    assert_eq!(engine.caller("mary"), Some(Caller::new("mary")));
}

#[test]
fn test_role_lookup() {
    let (engine, store) = setup();
    assert!(engine.role("bottle washer").is_none());

    for name in ["admin", "manager", "user"] {
        store.add_role(Role::new(name)).unwrap();
    }

    assert_eq!(engine.role("admin"), Some(Role::new("admin")));
    assert_eq!(engine.role("manager"), Some(Role::new("manager")));
    assert_eq!(engine.role("user"), Some(Role::new("user")));
}

#[test]
fn test_group_lookup() {
    let (engine, store) = setup();
    assert!(engine.group("bottle washer").is_none());

    let admin = store.create_group("admin", None).unwrap();
    let manager = store.create_group("manager", None).unwrap();
    let user = store.create_group("user", Some(&manager)).unwrap();

    // by path
    assert_eq!(engine.group("admin"), Some(admin.clone()), "admin");
    assert_eq!(engine.group("/admin"), Some(admin.clone()), "/admin");
    assert_eq!(engine.group("/manager/"), None, "/manager/");
    assert_eq!(engine.group("/manager"), Some(manager.clone()), "/manager");
    assert_eq!(engine.group("manager"), Some(manager.clone()), "manager");
    assert_eq!(engine.group("user"), None, "user");
    assert_eq!(engine.group("/user"), None, "/user");
    assert_eq!(engine.group("/manager/user"), Some(user.clone()), "/manager/user");

    // by name and parent
    assert_eq!(engine.group_under("admin", None), Some(admin), "admin, root");
    assert_eq!(engine.group_under("/admin", None), None, "/admin, root");
    assert_eq!(engine.group_under("manager", None), Some(manager.clone()), "manager, root");
    assert_eq!(engine.group_under("user", Some(&manager)), Some(user.clone()), "user, manager");
    assert_eq!(engine.group_under("manager", Some(&user)), None, "manager, user");

    // the store contract still offers any-depth lookup
    assert_eq!(store.find_group_by_simple_name("user"), Some(user));
}

#[test]
fn test_group_membership() {
    let (engine, store) = setup();
    let g1 = store.create_group("g1", None).unwrap();
    let g2 = store.create_group("g2", None).unwrap();
    let g3 = store.create_group("g3", Some(&g2)).unwrap();

    for name in ["a1", "a2", "a3"] {
        store.add_caller(Caller::new(name)).unwrap();
    }

    engine.add_to_group(&Caller::new("a1"), &g1).unwrap();
    engine.add_to_group(&Caller::new("a2"), &g2).unwrap();
    engine.add_to_group(&Caller::new("a3"), &g3).unwrap();

    assert!(engine.is_member("a1", "/g1"), "1-1");
    assert!(engine.is_member("a2", "/g2"), "2-2");
    assert!(!engine.is_member("a1", "/g2"), "1-2");
    assert!(!engine.is_member("a2", "/g1"), "2-1");
    assert!(!engine.is_member("a3", "/g1"), "3-1");
    // parent
    assert!(engine.is_member("a3", "/g2"), "3-2");
    assert!(engine.is_member("a3", "/g2/g3"), "3-3");

    engine.remove_from_group(&Caller::new("a1"), &g1).unwrap();

    assert!(!engine.is_member("a1", "/g1"), "1-1 after removal");
    assert!(engine.is_member("a2", "/g2"), "2-2 after removal");
}

#[test]
fn test_grant() {
    let (engine, store) = setup();
    let (r1, r2) = (Role::new("r1"), Role::new("r2"));
    store.add_role(r1.clone()).unwrap();
    store.add_role(r2.clone()).unwrap();

    for name in ["a1", "a2", "a3"] {
        store.add_caller(Caller::new(name)).unwrap();
    }

    let g1 = store.create_group("g1", None).unwrap();
    let g2 = store.create_group("g2", Some(&g1)).unwrap();
    let g3 = store.create_group("g3", Some(&g2)).unwrap();
    engine.add_to_group(&Caller::new("a3"), &g3).unwrap();

    engine.grant_role(&Subject::Caller("a1".to_string()), &r1).unwrap();
    engine.grant_role(&Subject::Caller("a2".to_string()), &r2).unwrap();
    engine.grant_role(&Subject::from(&g2), &r2).unwrap();

    assert!(engine.has_role("a1", "r1"), "1-1");
    assert!(engine.has_role("a2", "r2"), "2-2");
    assert!(!engine.has_role("a1", "r2"), "1-2");
    assert!(!engine.has_role("a2", "r1"), "2-1");
    // inherited
    assert!(engine.group_has_role("/g1/g2/g3", "r2"), "g3-r2");
    assert!(engine.has_role("a3", "r2"), "a3-r2");
    assert!(engine.group_has_role("/g1/g2", "r2"), "g2-r2");
    // not passed up to the parent, only down to children
    assert!(!engine.group_has_role("/g1", "r2"), "g1-r2");

    engine.revoke_role(&Subject::Caller("a1".to_string()), &r1).unwrap();

    assert!(!engine.has_role("a1", "r1"), "1-1 after revoke");
    assert!(engine.has_role("a2", "r2"), "2-2 after revoke");
}

#[test]
fn test_grant_revoked_from_ancestor_disappears_downstream() {
    let (engine, store) = setup();
    let role = Role::new("auditor");
    store.add_role(role.clone()).unwrap();
    store.add_caller(Caller::new("joe")).unwrap();

    let org = store.create_group("org", None).unwrap();
    let team = store.create_group("team", Some(&org)).unwrap();
    engine.add_to_group(&Caller::new("joe"), &team).unwrap();
    engine.grant_role(&Subject::from(&org), &role).unwrap();
    assert!(engine.has_role("joe", "auditor"));

    engine.revoke_role(&Subject::from(&org), &role).unwrap();
    assert!(!engine.has_role("joe", "auditor"));
    assert!(!engine.group_has_role("/org/team", "auditor"));
}

#[test]
fn test_moving_a_group_changes_inheritance() {
    let (engine, store) = setup();
    let role = Role::new("ops");
    store.add_role(role.clone()).unwrap();

    let infra = store.create_group("infra", None).unwrap();
    let apps = store.create_group("apps", None).unwrap();
    let oncall = store.create_group("oncall", Some(&apps)).unwrap();
    engine.grant_role(&Subject::from(&infra), &role).unwrap();

    assert!(!engine.group_has_role("/apps/oncall", "ops"));

    store.set_parent(&oncall.id, Some(&infra.id)).unwrap();
    assert!(engine.group_has_role("/infra/oncall", "ops"));
    assert!(engine.group("/apps/oncall").is_none());
}

#[test]
fn test_mutations_with_unknown_entities_are_rejected() {
    let (engine, store) = setup();
    let g1 = store.create_group("g1", None).unwrap();
    store.add_role(Role::new("r1")).unwrap();

    let result = engine.add_to_group(&Caller::new("nobody"), &g1);
    assert!(matches!(result, Err(AuthzError::NotFound(_))));

    let stray = Group::new("stray");
    let result = engine.grant_role(&Subject::from(&stray), &Role::new("r1"));
    assert!(matches!(result, Err(AuthzError::NotFound(_))));
}
