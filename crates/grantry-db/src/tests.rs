//! Unit and database tests for grantry-db
//!
//! Tests touching PostgreSQL (15 or newer) are ignored by default. Run
//! them with `DATABASE_URL` set and `--ignored`.

use super::*;
use grantry_core::{
    DynamicPermissionRecord, DynamicPermissionStore, PermissionStore, ProviderKind, TenantId,
};

// =============================================================================
// Migration Tests
// =============================================================================

#[cfg(test)]
mod migration_tests {
    use super::*;
    use crate::migrations::migrations;

    #[test]
    fn test_versions_are_strictly_increasing() {
        let versions: Vec<i32> = migrations().iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(versions.first(), Some(&1));
    }

    #[test]
    fn test_grant_key_is_unique_with_null_tenants() {
        let grants = &migrations()[0];
        assert!(grants.up_sql.contains("CREATE UNIQUE INDEX"));
        assert!(grants
            .up_sql
            .contains("(name, provider_kind, provider_key, tenant_id)"));
        assert!(grants.up_sql.contains("NULLS NOT DISTINCT"));
    }

    #[test]
    fn test_default_config_runs_migrations() {
        let config = DatabaseConfig::default();
        assert!(config.run_migrations);
        assert!(config.max_connections >= config.min_connections);
    }
}

// =============================================================================
// PostgreSQL Tests
// =============================================================================

#[cfg(test)]
mod postgres_tests {
    use super::*;
    use sqlx::PgPool;

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = create_pool(&DatabaseConfig {
            url,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn unique(prefix: &str) -> String {
        format!("{}-{}", prefix, uuid::Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore]
    async fn test_upsert_keeps_one_row_per_key() {
        let store = PgPermissionStore::new(pool().await);
        let key = unique("user");

        store
            .save("Orders.View", ProviderKind::User, &key, None, true)
            .await
            .unwrap();
        store
            .save("Orders.View", ProviderKind::User, &key, None, false)
            .await
            .unwrap();

        let grants = store.get_all(ProviderKind::User, &key, None).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert!(!grants[0].is_granted);
        assert!(store
            .is_granted("Orders.View", ProviderKind::User, &key, None)
            .await
            .unwrap()
            .is_prohibited());
    }

    #[tokio::test]
    #[ignore]
    async fn test_tenant_rows_are_isolated() {
        let store = PgPermissionStore::new(pool().await);
        let key = unique("role");
        let tenant = TenantId::new();

        store
            .save("Orders.View", ProviderKind::Role, &key, Some(tenant), true)
            .await
            .unwrap();

        assert!(store
            .is_granted("Orders.View", ProviderKind::Role, &key, None)
            .await
            .unwrap()
            .is_undefined());
        assert!(store
            .is_granted("Orders.View", ProviderKind::Role, &key, Some(tenant))
            .await
            .unwrap()
            .is_granted());
    }

    #[tokio::test]
    #[ignore]
    async fn test_batch_save_and_delete() {
        let store = PgPermissionStore::new(pool().await);
        let key = unique("role");
        let names = vec!["X".to_string(), "Y".to_string(), "Z".to_string()];

        store
            .save_many(&names, ProviderKind::Role, &key, None, true)
            .await
            .unwrap();
        assert_eq!(store.get_all(ProviderKind::Role, &key, None).await.unwrap().len(), 3);

        store
            .delete_many(&names[..2], ProviderKind::Role, &key, None)
            .await
            .unwrap();
        let left = store.get_all(ProviderKind::Role, &key, None).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name, "Z");
    }

    #[tokio::test]
    #[ignore]
    async fn test_dynamic_records_round_trip() {
        let store = PgDynamicPermissionStore::new(pool().await);
        let name = unique("Dyn");
        let record = DynamicPermissionRecord::new(&name)
            .with_group("Custom")
            .with_tenant(TenantId::new());

        store.save(&record).await.unwrap();
        assert_eq!(store.get(&name).await.unwrap(), Some(record));

        store.delete(&name).await.unwrap();
        assert!(store.get(&name).await.unwrap().is_none());
    }
}
