//! Dynamic permission repository implementation

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use grantry_core::{DynamicPermissionRecord, DynamicPermissionStore, Result, TenantId};

use super::{db_error, tenant_uuid};

/// PostgreSQL implementation of DynamicPermissionStore
pub struct PgDynamicPermissionStore {
    pool: PgPool,
}

impl PgDynamicPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &PgRow) -> DynamicPermissionRecord {
    let tenant: Option<Uuid> = row.get("tenant_id");
    DynamicPermissionRecord {
        name: row.get("name"),
        display_name: row.get("display_name"),
        description: row.get("description"),
        parent_name: row.get("parent_name"),
        group_name: row.get("group_name"),
        is_granted_by_default: row.get("is_granted_by_default"),
        tenant_id: tenant.map(TenantId::from_uuid),
    }
}

#[async_trait]
impl DynamicPermissionStore for PgDynamicPermissionStore {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<DynamicPermissionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT name, display_name, description, parent_name, group_name,
                   is_granted_by_default, tenant_id
            FROM dynamic_permissions
            ORDER BY created_at, name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn get(&self, name: &str) -> Result<Option<DynamicPermissionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT name, display_name, description, parent_name, group_name,
                   is_granted_by_default, tenant_id
            FROM dynamic_permissions
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.as_ref().map(record_from_row))
    }

    #[instrument(skip(self, record), fields(name = %record.name))]
    async fn save(&self, record: &DynamicPermissionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dynamic_permissions
                (name, display_name, description, parent_name, group_name, is_granted_by_default, tenant_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                description = EXCLUDED.description,
                parent_name = EXCLUDED.parent_name,
                group_name = EXCLUDED.group_name,
                is_granted_by_default = EXCLUDED.is_granted_by_default,
                tenant_id = EXCLUDED.tenant_id
            "#,
        )
        .bind(&record.name)
        .bind(&record.display_name)
        .bind(&record.description)
        .bind(&record.parent_name)
        .bind(&record.group_name)
        .bind(record.is_granted_by_default)
        .bind(tenant_uuid(record.tenant_id))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM dynamic_permissions WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
