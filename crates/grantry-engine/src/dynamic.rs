//! Runtime-authored permission definitions
//!
//! Dynamic records are merged into the registry after the static providers
//! have run. Records may reference parents that appear later in the list
//! (or that are themselves dynamic), so the merge repeats passes until no
//! further record can be placed.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use grantry_core::validation::ensure_not_blank;
use grantry_core::{
    CurrentTenant, DefinitionContext, DynamicPermissionRecord, DynamicPermissionStore,
    GrantryError, PermissionBuilder, Result, TenantId,
};

use crate::registry::PermissionRegistry;

/// Merge `records` into `context`, returning how many were added
///
/// Records without a parent become top-level permissions of their group,
/// creating the group on demand. Records whose parent never appears fail
/// the merge with a dependency error.
pub fn merge_dynamic_records(
    context: &mut DefinitionContext,
    records: &[DynamicPermissionRecord],
) -> Result<usize> {
    let mut pending: Vec<&DynamicPermissionRecord> = Vec::with_capacity(records.len());
    let mut merged = 0;

    for record in records {
        ensure_not_blank("permission name", &record.name)?;
        match record.parent() {
            Some(_) => pending.push(record),
            None => {
                let group = record.group();
                let mut builder = if context.has_group(group) {
                    context.group(group)?
                } else {
                    context.add_group(group, None)?
                };
                configure(
                    builder.add_permission(&record.name, record.display_name.as_deref())?,
                    record,
                );
                merged += 1;
            }
        }
    }

    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();

        for record in pending {
            let parent = record.parent().unwrap_or_default();
            if context.has_permission(parent) {
                configure(
                    context
                        .permission(parent)?
                        .add_child(&record.name, record.display_name.as_deref())?,
                    record,
                );
                merged += 1;
            } else {
                deferred.push(record);
            }
        }

        if deferred.len() == before {
            let stuck = deferred[0];
            warn!(
                count = deferred.len(),
                name = %stuck.name,
                "Dynamic permissions with unresolved parents"
            );
            return Err(GrantryError::dependency(
                &stuck.name,
                stuck.parent().unwrap_or_default(),
            ));
        }
        pending = deferred;
    }

    Ok(merged)
}

fn configure(builder: PermissionBuilder<'_>, record: &DynamicPermissionRecord) {
    let builder = builder
        .granted_by_default(record.is_granted_by_default)
        .with_tenant(record.tenant_id);
    if let Some(description) = &record.description {
        builder.with_description(description.clone());
    }
}

/// Create and delete dynamic permission records
///
/// Changes are persisted immediately and become part of the registry the
/// next time it is built. Reads and deletes only see records visible to the
/// current tenant; names stay unique across tenants because the merged
/// registry is keyed by name.
pub struct DynamicPermissionService {
    store: Arc<dyn DynamicPermissionStore>,
    registry: Arc<PermissionRegistry>,
}

impl DynamicPermissionService {
    pub fn new(store: Arc<dyn DynamicPermissionStore>, registry: Arc<PermissionRegistry>) -> Self {
        Self { store, registry }
    }

    /// Records visible to the current tenant
    pub async fn list(&self) -> Result<Vec<DynamicPermissionRecord>> {
        let tenant = CurrentTenant::id();
        let mut records = self.store.list().await?;
        records.retain(|r| r.is_visible_to(tenant));
        Ok(records)
    }

    pub async fn get(&self, name: &str) -> Result<DynamicPermissionRecord> {
        self.find_visible(name, CurrentTenant::id())
            .await?
            .ok_or_else(|| GrantryError::not_found("Dynamic permission", name))
    }

    async fn find_visible(
        &self,
        name: &str,
        tenant: Option<TenantId>,
    ) -> Result<Option<DynamicPermissionRecord>> {
        Ok(self
            .store
            .get(name)
            .await?
            .filter(|r| r.is_visible_to(tenant)))
    }

    #[instrument(skip(self, record), fields(name = %record.name))]
    pub async fn create(&self, record: DynamicPermissionRecord) -> Result<DynamicPermissionRecord> {
        ensure_not_blank("permission name", &record.name)?;

        if self.registry.find_permission(&record.name).is_some()
            || self.store.get(&record.name).await?.is_some()
        {
            return Err(GrantryError::conflict("Permission", &record.name));
        }

        if let Some(parent) = record.parent() {
            if parent == record.name {
                return Err(GrantryError::validation(
                    "parent_name",
                    "A permission cannot be its own parent",
                ));
            }
            let parent_known = self
                .registry
                .get_permission_for(parent, record.tenant_id)
                .is_ok()
                || self.find_visible(parent, record.tenant_id).await?.is_some();
            if !parent_known {
                return Err(GrantryError::dependency(&record.name, parent));
            }
        }

        self.store.save(&record).await?;
        info!("Dynamic permission created");
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<()> {
        ensure_not_blank("permission name", name)?;
        if self.find_visible(name, CurrentTenant::id()).await?.is_none() {
            return Err(GrantryError::not_found("Dynamic permission", name));
        }

        let records = self.store.list().await?;
        if let Some(child) = records.iter().find(|r| r.parent() == Some(name)) {
            return Err(GrantryError::dependency(&child.name, name));
        }

        self.store.delete(name).await?;
        info!("Dynamic permission deleted");
        Ok(())
    }
}
