//! Database migrations
//!
//! Migrations are applied in version order inside one transaction each and
//! recorded in `grantry_schema_migrations`.

use grantry_core::{GrantryError, Result};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    pub up_sql: &'static str,
}

/// Run all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Starting database migrations");

    create_migrations_table(pool).await?;
    let current_version = current_version(pool).await?;
    debug!(current_version, "Current migration version");

    for migration in migrations() {
        if migration.version > current_version {
            info!(version = migration.version, name = migration.name, "Running migration");
            run_migration(pool, &migration).await?;
        }
    }

    info!("Database migrations completed");
    Ok(())
}

async fn create_migrations_table(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grantry_schema_migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| GrantryError::store_error(e.to_string()))?;
    Ok(())
}

async fn current_version(pool: &PgPool) -> Result<i32> {
    let row = sqlx::query("SELECT COALESCE(MAX(version), 0) AS version FROM grantry_schema_migrations")
        .fetch_one(pool)
        .await
        .map_err(|e| GrantryError::store_error(e.to_string()))?;
    Ok(row.get("version"))
}

async fn run_migration(pool: &PgPool, migration: &Migration) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| GrantryError::store_error(e.to_string()))?;

    sqlx::raw_sql(migration.up_sql)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            GrantryError::store_error(format!("Migration {} failed: {}", migration.version, e))
        })?;

    sqlx::query("INSERT INTO grantry_schema_migrations (version, name) VALUES ($1, $2)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await
        .map_err(|e| GrantryError::store_error(e.to_string()))?;

    tx.commit()
        .await
        .map_err(|e| GrantryError::store_error(e.to_string()))?;

    info!(version = migration.version, "Migration completed");
    Ok(())
}

/// All migrations in order
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "create_permission_grants",
            // NULLS NOT DISTINCT needs PostgreSQL 15; host grants have a NULL tenant
            up_sql: r#"
                CREATE TABLE permission_grants (
                    id UUID PRIMARY KEY,
                    name VARCHAR(256) NOT NULL,
                    provider_kind VARCHAR(8) NOT NULL,
                    provider_key VARCHAR(256) NOT NULL,
                    is_granted BOOLEAN NOT NULL,
                    tenant_id UUID,
                    creation_time TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                );

                CREATE UNIQUE INDEX ux_permission_grants_key
                    ON permission_grants (name, provider_kind, provider_key, tenant_id)
                    NULLS NOT DISTINCT;

                CREATE INDEX ix_permission_grants_provider
                    ON permission_grants (provider_kind, provider_key, tenant_id);
            "#,
        },
        Migration {
            version: 2,
            name: "create_dynamic_permissions",
            up_sql: r#"
                CREATE TABLE dynamic_permissions (
                    name VARCHAR(256) PRIMARY KEY,
                    display_name VARCHAR(256),
                    description TEXT,
                    parent_name VARCHAR(256),
                    group_name VARCHAR(256),
                    is_granted_by_default BOOLEAN NOT NULL DEFAULT FALSE,
                    tenant_id UUID,
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                );
            "#,
        },
    ]
}
