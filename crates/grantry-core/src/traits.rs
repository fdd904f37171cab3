//! Core traits for the Grantry permission engine

use crate::{definition::DefinitionContext, error::Result, events::*, ids::*, models::*};
use async_trait::async_trait;

// =============================================================================
// Grant Storage
// =============================================================================

/// Durable mapping from (name, provider kind, provider key, tenant) to a
/// grant decision
///
/// Implementations must treat each tenant as a separate keyspace and must
/// serialize conflicting writes to the same key.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Look up a single grant decision
    async fn is_granted(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<GrantStatus>;

    /// All grant records of one provider within one tenant
    async fn get_all(
        &self,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<Vec<PermissionGrant>>;

    /// Insert or overwrite a grant record
    async fn save(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
        is_granted: bool,
    ) -> Result<()>;

    /// Remove a grant record; removing a missing record is not an error
    async fn delete(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<()>;

    /// Save several records for one provider
    async fn save_many(
        &self,
        names: &[String],
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
        is_granted: bool,
    ) -> Result<()> {
        for name in names {
            self.save(name, provider_kind, provider_key, tenant_id, is_granted)
                .await?;
        }
        Ok(())
    }

    /// Delete several records for one provider
    async fn delete_many(
        &self,
        names: &[String],
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<()> {
        for name in names {
            self.delete(name, provider_kind, provider_key, tenant_id).await?;
        }
        Ok(())
    }
}

/// Persistence for runtime-authored permission definitions
#[async_trait]
pub trait DynamicPermissionStore: Send + Sync {
    async fn list(&self) -> Result<Vec<DynamicPermissionRecord>>;
    async fn get(&self, name: &str) -> Result<Option<DynamicPermissionRecord>>;
    async fn save(&self, record: &DynamicPermissionRecord) -> Result<()>;
    async fn delete(&self, name: &str) -> Result<()>;
}

// =============================================================================
// Definitions
// =============================================================================

/// Registers permission groups and permissions at startup
pub trait PermissionDefinitionProvider: Send + Sync {
    fn define(&self, context: &mut DefinitionContext) -> Result<()>;
}

// =============================================================================
// Events
// =============================================================================

/// Receives grant change events from the event bus
#[async_trait]
pub trait PermissionEventHandler: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn handle(&self, event: &PermissionChangedEvent) -> Result<()>;
}
