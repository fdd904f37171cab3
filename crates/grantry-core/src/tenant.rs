//! Scoped access to the current tenant
//!
//! The tenant is carried in a task-local slot. Entering a scope shadows the
//! outer value and leaving it restores the outer value, so nested scopes
//! unwind in stack order and sibling tasks never observe each other's
//! tenant. The engine reads the slot once at its public boundary and passes
//! the value explicitly from there on.

use crate::ids::TenantId;
use std::future::Future;

tokio::task_local! {
    static CURRENT_TENANT: Option<TenantId>;
}

/// Accessor for the ambient tenant
pub struct CurrentTenant;

impl CurrentTenant {
    /// The active tenant, or `None` for the host / when no scope is active
    pub fn id() -> Option<TenantId> {
        CURRENT_TENANT.try_with(|tenant| *tenant).unwrap_or(None)
    }

    pub fn is_available() -> bool {
        Self::id().is_some()
    }

    /// Run `fut` with `tenant` as the active tenant
    pub async fn scope<F>(tenant: Option<TenantId>, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TENANT.scope(tenant, fut).await
    }

    /// Synchronous counterpart of [`CurrentTenant::scope`]
    pub fn sync_scope<R>(tenant: Option<TenantId>, f: impl FnOnce() -> R) -> R {
        CURRENT_TENANT.sync_scope(tenant, f)
    }
}
