//! End-to-end grant resolution scenarios
//!
//! Each test composes the engine the way the server does: a frozen
//! registry, an in-memory store behind the cache, and an event bus that
//! invalidates the cache and writes the audit log.

use std::sync::Arc;

use grantry_core::{
    CurrentTenant, DefinitionContext, PermissionDefinitionProvider, PermissionStore, Principal,
    ProviderKind, Result, TenantId,
};
use grantry_engine::{
    AuditLogHandler, EventBus, PermissionChecker, PermissionManager, PermissionRegistry,
};
use grantry_store::{
    CacheInvalidationHandler, CachedPermissionStore, CachedStoreConfig, InMemoryPermissionStore,
};

struct ShopProvider;

impl PermissionDefinitionProvider for ShopProvider {
    fn define(&self, ctx: &mut DefinitionContext) -> Result<()> {
        let mut orders = ctx.add_group("Orders", None)?;
        orders.add_permission("Orders.View", Some("View orders"))?;
        orders
            .add_permission("Orders.Help", None)?
            .granted_by_default(true);

        let mut letters = ctx.add_group("Letters", None)?;
        for name in ["X", "Y", "Z"] {
            letters.add_permission(name, None)?;
        }

        let mut tree = ctx.add_group("Tree", None)?;
        let mut parent = tree.add_permission("Parent", None)?;
        let mut child = parent.add_child("Child", None)?;
        child.add_child("GrandChild", None)?;
        Ok(())
    }
}

struct Engine {
    registry: Arc<PermissionRegistry>,
    checker: PermissionChecker,
    manager: PermissionManager,
    cache: Arc<CachedPermissionStore>,
}

fn engine() -> Engine {
    let registry = Arc::new(
        PermissionRegistry::builder()
            .provider(ShopProvider)
            .build_static()
            .unwrap(),
    );
    let cache = Arc::new(CachedPermissionStore::new(
        Arc::new(InMemoryPermissionStore::new()),
        CachedStoreConfig::default(),
    ));

    let mut events = EventBus::new();
    events.subscribe_all(Arc::new(CacheInvalidationHandler::new(cache.clone())));
    events.subscribe_all(Arc::new(AuditLogHandler));

    Engine {
        checker: PermissionChecker::new(registry.clone(), cache.clone()),
        manager: PermissionManager::new(registry.clone(), cache.clone(), Arc::new(events)),
        registry,
        cache,
    }
}

#[tokio::test]
async fn default_granted_permission_needs_no_grant() {
    let e = engine();
    let anyone = Principal::authenticated("someone", ["Nobody"]);
    assert!(e.checker.is_granted(&anyone, "Orders.Help").await.unwrap());
}

#[tokio::test]
async fn unauthenticated_principal_is_denied_everything() {
    let e = engine();
    let anonymous = Principal::anonymous();
    for definition in e.registry.permissions() {
        assert!(!e
            .checker
            .is_granted(&anonymous, &definition.name)
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn three_level_definition_has_dotted_full_name() {
    let e = engine();
    let grand_child = e.registry.get_permission("GrandChild").unwrap();
    assert_eq!(grand_child.full_name(), "Parent.Child.GrandChild");
    assert_eq!(grand_child.level(), 3);
}

#[tokio::test]
async fn role_grant_round_trip() {
    let e = engine();
    let admin = Principal::authenticated("u1", ["Admin"]);

    e.manager.grant("Orders.View", ProviderKind::Role, "Admin").await.unwrap();
    assert!(e.checker.is_granted(&admin, "Orders.View").await.unwrap());

    e.manager.revoke("Orders.View", ProviderKind::Role, "Admin").await.unwrap();
    assert!(!e.checker.is_granted(&admin, "Orders.View").await.unwrap());
}

#[tokio::test]
async fn user_prohibition_beats_role_grant() {
    let e = engine();
    e.manager.grant("Orders.View", ProviderKind::Role, "Manager").await.unwrap();

    let a = Principal::authenticated("a", ["Manager"]);
    let b = Principal::authenticated("b", ["Clerk"]);
    assert!(e.checker.is_granted(&a, "Orders.View").await.unwrap());
    assert!(!e.checker.is_granted(&b, "Orders.View").await.unwrap());

    e.manager.prohibit("Orders.View", ProviderKind::User, "a").await.unwrap();
    assert!(!e.checker.is_granted(&a, "Orders.View").await.unwrap());
    assert!(a.has_role("Manager"));
}

#[tokio::test]
async fn undefined_user_falls_back_to_any_granted_role() {
    let e = engine();
    e.manager.grant("Orders.View", ProviderKind::Role, "Second").await.unwrap();
    let user = Principal::authenticated("u1", ["First", "Second", "Third"]);
    assert!(e.checker.is_granted(&user, "Orders.View").await.unwrap());
}

#[tokio::test]
async fn batch_diff_produces_exact_set() {
    let e = engine();
    e.manager
        .grant_many(&["Y", "Z"], ProviderKind::Role, "Editor")
        .await
        .unwrap();

    let diff = e
        .manager
        .set_granted_set(ProviderKind::Role, "Editor", &["X", "Y"])
        .await
        .unwrap();
    assert_eq!(diff.added, vec!["X".to_string()]);
    assert_eq!(diff.removed, vec!["Z".to_string()]);

    let granted: Vec<String> = e
        .manager
        .get_all(ProviderKind::Role, "Editor")
        .await
        .unwrap()
        .into_iter()
        .filter(|g| g.is_granted)
        .map(|g| g.name)
        .collect();
    assert_eq!(granted, vec!["X".to_string(), "Y".to_string()]);
}

#[tokio::test]
async fn grants_are_isolated_per_tenant() {
    let e = engine();
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();

    CurrentTenant::scope(
        Some(tenant_a),
        e.manager.grant("Orders.View", ProviderKind::Role, "Clerk"),
    )
    .await
    .unwrap();

    let status_b = e
        .cache
        .is_granted("Orders.View", ProviderKind::Role, "Clerk", Some(tenant_b))
        .await
        .unwrap();
    assert!(status_b.is_undefined());

    let clerk = Principal::authenticated("u1", ["Clerk"]);
    let in_b = CurrentTenant::scope(Some(tenant_b), e.checker.is_granted(&clerk, "Orders.View"))
        .await
        .unwrap();
    let in_a = CurrentTenant::scope(Some(tenant_a), e.checker.is_granted(&clerk, "Orders.View"))
        .await
        .unwrap();
    assert!(!in_b);
    assert!(in_a);
}

#[tokio::test]
async fn revoke_is_visible_through_cached_reads() {
    let e = engine();
    e.manager.grant("Orders.View", ProviderKind::Role, "Admin").await.unwrap();

    let admin = Principal::authenticated("u1", ["Admin"]);
    assert!(e.checker.is_granted(&admin, "Orders.View").await.unwrap());
    assert_eq!(
        e.manager.get_all(ProviderKind::Role, "Admin").await.unwrap().len(),
        1
    );

    e.manager.revoke("Orders.View", ProviderKind::Role, "Admin").await.unwrap();
    assert!(e
        .manager
        .get_all(ProviderKind::Role, "Admin")
        .await
        .unwrap()
        .is_empty());
    assert!(!e.checker.is_granted(&admin, "Orders.View").await.unwrap());
}

#[tokio::test]
async fn independent_checks_run_in_parallel() {
    let e = engine();
    e.manager.grant("Orders.View", ProviderKind::Role, "Clerk").await.unwrap();
    let checker = e.checker.clone();

    let mut handles = Vec::new();
    for i in 0..20 {
        let checker = checker.clone();
        handles.push(tokio::spawn(async move {
            let role = if i % 2 == 0 { "Clerk" } else { "Guest" };
            let principal = Principal::authenticated(format!("u{}", i), [role]);
            (i, checker.is_granted(&principal, "Orders.View").await.unwrap())
        }));
    }
    for handle in handles {
        let (i, granted) = handle.await.unwrap();
        assert_eq!(granted, i % 2 == 0);
    }
}
