//! Grant repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use grantry_core::{
    GrantId, GrantStatus, GrantryError, PermissionGrant, PermissionStore, ProviderKind, Result,
    TenantId,
};

use super::{db_error, tenant_uuid};

/// PostgreSQL implementation of PermissionStore
///
/// The unique index on (name, provider_kind, provider_key, tenant_id)
/// serializes concurrent writers; saves are upserts so the last writer wins.
pub struct PgPermissionStore {
    pool: PgPool,
}

impl PgPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn grant_from_row(row: &PgRow) -> Result<PermissionGrant> {
    let kind: String = row.get("provider_kind");
    let provider_kind = kind.parse::<ProviderKind>().map_err(|_| {
        GrantryError::store_error(format!("Unknown provider kind in grant row: {}", kind))
    })?;
    let tenant: Option<Uuid> = row.get("tenant_id");
    let creation_time: DateTime<Utc> = row.get("creation_time");

    Ok(PermissionGrant {
        id: GrantId::from_uuid(row.get("id")),
        name: row.get("name"),
        provider_kind,
        provider_key: row.get("provider_key"),
        is_granted: row.get("is_granted"),
        tenant_id: tenant.map(TenantId::from_uuid),
        creation_time,
    })
}

const UPSERT_GRANT: &str = r#"
    INSERT INTO permission_grants (id, name, provider_kind, provider_key, is_granted, tenant_id, creation_time)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    ON CONFLICT (name, provider_kind, provider_key, tenant_id)
    DO UPDATE SET is_granted = EXCLUDED.is_granted
"#;

#[async_trait]
impl PermissionStore for PgPermissionStore {
    #[instrument(skip(self))]
    async fn is_granted(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<GrantStatus> {
        let row = sqlx::query(
            r#"
            SELECT is_granted
            FROM permission_grants
            WHERE name = $1
              AND provider_kind = $2
              AND provider_key = $3
              AND tenant_id IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(name)
        .bind(provider_kind.as_str())
        .bind(provider_key)
        .bind(tenant_uuid(tenant_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(GrantStatus::from_record(
            row.map(|row| row.get::<bool, _>("is_granted")),
        ))
    }

    #[instrument(skip(self))]
    async fn get_all(
        &self,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<Vec<PermissionGrant>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, provider_kind, provider_key, is_granted, tenant_id, creation_time
            FROM permission_grants
            WHERE provider_kind = $1
              AND provider_key = $2
              AND tenant_id IS NOT DISTINCT FROM $3
            ORDER BY name
            "#,
        )
        .bind(provider_kind.as_str())
        .bind(provider_key)
        .bind(tenant_uuid(tenant_id))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(grant_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn save(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
        is_granted: bool,
    ) -> Result<()> {
        sqlx::query(UPSERT_GRANT)
            .bind(GrantId::new().into_uuid())
            .bind(name)
            .bind(provider_kind.as_str())
            .bind(provider_key)
            .bind(is_granted)
            .bind(tenant_uuid(tenant_id))
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM permission_grants
            WHERE name = $1
              AND provider_kind = $2
              AND provider_key = $3
              AND tenant_id IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(name)
        .bind(provider_kind.as_str())
        .bind(provider_key)
        .bind(tenant_uuid(tenant_id))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    /// All rows are written in one transaction
    #[instrument(skip(self, names), fields(count = names.len()))]
    async fn save_many(
        &self,
        names: &[String],
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
        is_granted: bool,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let now = Utc::now();

        for name in names {
            sqlx::query(UPSERT_GRANT)
                .bind(GrantId::new().into_uuid())
                .bind(name)
                .bind(provider_kind.as_str())
                .bind(provider_key)
                .bind(is_granted)
                .bind(tenant_uuid(tenant_id))
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    #[instrument(skip(self, names), fields(count = names.len()))]
    async fn delete_many(
        &self,
        names: &[String],
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM permission_grants
            WHERE name = ANY($1)
              AND provider_kind = $2
              AND provider_key = $3
              AND tenant_id IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(names)
        .bind(provider_kind.as_str())
        .bind(provider_key)
        .bind(tenant_uuid(tenant_id))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}
