//! Repository implementations for PostgreSQL

pub mod dynamic_permission;
pub mod grant;

pub use dynamic_permission::*;
pub use grant::*;

use grantry_core::{GrantryError, TenantId};
use uuid::Uuid;

fn db_error(e: sqlx::Error) -> GrantryError {
    GrantryError::store_error(e.to_string())
}

fn tenant_uuid(tenant_id: Option<TenantId>) -> Option<Uuid> {
    tenant_id.map(TenantId::into_uuid)
}
