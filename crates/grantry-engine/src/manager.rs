//! Grant management
//!
//! Every write validates the permission against the registry, persists the
//! change through the store and then publishes a change event. Event
//! handlers (cache invalidation among them) therefore observe the write
//! only after it is durable.

use std::collections::BTreeSet;
use std::sync::Arc;
use serde::Serialize;
use tracing::{info, instrument};

use grantry_core::validation::{ensure_grant_args, ensure_not_blank};
use grantry_core::{
    CurrentTenant, PermissionChangeKind, PermissionChangedEvent, PermissionGrant,
    PermissionStore, ProviderKind, Result, TenantId,
};

use crate::events::EventBus;
use crate::registry::PermissionRegistry;

/// Outcome of replacing a provider's granted set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrantDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl GrantDiff {
    /// Names to add and remove to turn `current` into `desired`
    pub fn between(current: &BTreeSet<String>, desired: &BTreeSet<String>) -> Self {
        Self {
            added: desired.difference(current).cloned().collect(),
            removed: current.difference(desired).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub struct PermissionManager {
    registry: Arc<PermissionRegistry>,
    store: Arc<dyn PermissionStore>,
    events: Arc<EventBus>,
}

impl PermissionManager {
    pub fn new(
        registry: Arc<PermissionRegistry>,
        store: Arc<dyn PermissionStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            store,
            events,
        }
    }

    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    #[instrument(skip(self))]
    pub async fn grant(&self, name: &str, provider_kind: ProviderKind, provider_key: &str) -> Result<()> {
        self.change(PermissionChangeKind::Granted, name, provider_kind, provider_key)
            .await
    }

    #[instrument(skip(self))]
    pub async fn revoke(&self, name: &str, provider_kind: ProviderKind, provider_key: &str) -> Result<()> {
        self.change(PermissionChangeKind::Revoked, name, provider_kind, provider_key)
            .await
    }

    /// Record an explicit denial; for users this overrides role grants
    #[instrument(skip(self))]
    pub async fn prohibit(&self, name: &str, provider_kind: ProviderKind, provider_key: &str) -> Result<()> {
        self.change(PermissionChangeKind::Prohibited, name, provider_kind, provider_key)
            .await
    }

    /// Every record of one provider in the current tenant
    pub async fn get_all(&self, provider_kind: ProviderKind, provider_key: &str) -> Result<Vec<PermissionGrant>> {
        ensure_not_blank("provider key", provider_key)?;
        self.store
            .get_all(provider_kind, provider_key, CurrentTenant::id())
            .await
    }

    /// Grant several permissions to one provider
    ///
    /// All names are validated before anything is written.
    #[instrument(skip(self, names), fields(count = names.len()))]
    pub async fn grant_many<S: AsRef<str>>(
        &self,
        names: &[S],
        provider_kind: ProviderKind,
        provider_key: &str,
    ) -> Result<()> {
        let tenant = CurrentTenant::id();
        ensure_not_blank("provider key", provider_key)?;
        let names = self.resolve_all(names, tenant)?;

        self.store
            .save_many(&names, provider_kind, provider_key, tenant, true)
            .await?;
        self.publish_all(PermissionChangeKind::Granted, &names, provider_kind, provider_key, tenant)
            .await
    }

    /// Revoke several permissions from one provider
    #[instrument(skip(self, names), fields(count = names.len()))]
    pub async fn revoke_many<S: AsRef<str>>(
        &self,
        names: &[S],
        provider_kind: ProviderKind,
        provider_key: &str,
    ) -> Result<()> {
        let tenant = CurrentTenant::id();
        ensure_not_blank("provider key", provider_key)?;
        let names = self.resolve_all(names, tenant)?;

        self.store
            .delete_many(&names, provider_kind, provider_key, tenant)
            .await?;
        self.publish_all(PermissionChangeKind::Revoked, &names, provider_kind, provider_key, tenant)
            .await
    }

    /// Make `desired` the exact granted set of one provider
    ///
    /// Names in `desired` that are not currently granted are granted
    /// (overwriting a prohibition); granted names missing from `desired`
    /// are revoked. Removals are not checked against the registry so grants
    /// for definitions that no longer exist can still be cleaned up.
    #[instrument(skip(self, desired), fields(count = desired.len()))]
    pub async fn set_granted_set<S: AsRef<str>>(
        &self,
        provider_kind: ProviderKind,
        provider_key: &str,
        desired: &[S],
    ) -> Result<GrantDiff> {
        let tenant = CurrentTenant::id();
        ensure_not_blank("provider key", provider_key)?;

        let desired: BTreeSet<String> = self.resolve_all(desired, tenant)?.into_iter().collect();
        let current: BTreeSet<String> = self
            .store
            .get_all(provider_kind, provider_key, tenant)
            .await?
            .into_iter()
            .filter(|grant| grant.is_granted)
            .map(|grant| grant.name)
            .collect();

        let diff = GrantDiff::between(&current, &desired);

        if !diff.added.is_empty() {
            self.store
                .save_many(&diff.added, provider_kind, provider_key, tenant, true)
                .await?;
            self.publish_all(PermissionChangeKind::Granted, &diff.added, provider_kind, provider_key, tenant)
                .await?;
        }
        if !diff.removed.is_empty() {
            self.store
                .delete_many(&diff.removed, provider_kind, provider_key, tenant)
                .await?;
            self.publish_all(PermissionChangeKind::Revoked, &diff.removed, provider_kind, provider_key, tenant)
                .await?;
        }

        info!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            "Granted set replaced"
        );
        Ok(diff)
    }

    async fn change(
        &self,
        kind: PermissionChangeKind,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
    ) -> Result<()> {
        let tenant = CurrentTenant::id();
        ensure_grant_args(name, provider_key)?;
        let name = self.resolve(name, tenant)?;

        match kind {
            PermissionChangeKind::Granted => {
                self.store
                    .save(&name, provider_kind, provider_key, tenant, true)
                    .await?
            }
            PermissionChangeKind::Prohibited => {
                self.store
                    .save(&name, provider_kind, provider_key, tenant, false)
                    .await?
            }
            PermissionChangeKind::Revoked => {
                self.store
                    .delete(&name, provider_kind, provider_key, tenant)
                    .await?
            }
        }

        info!(%kind, permission = %name, %provider_kind, provider_key, "Permission grant changed");
        self.events
            .publish(PermissionChangedEvent::new(kind, name, provider_kind, provider_key, tenant))
            .await
    }

    /// Canonical name of a visible definition
    fn resolve(&self, name: &str, tenant: Option<TenantId>) -> Result<String> {
        ensure_not_blank("permission name", name)?;
        Ok(self.registry.get_permission_for(name, tenant)?.name.clone())
    }

    fn resolve_all<S: AsRef<str>>(&self, names: &[S], tenant: Option<TenantId>) -> Result<Vec<String>> {
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            let name = self.resolve(name.as_ref(), tenant)?;
            if !resolved.contains(&name) {
                resolved.push(name);
            }
        }
        Ok(resolved)
    }

    async fn publish_all(
        &self,
        kind: PermissionChangeKind,
        names: &[String],
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant: Option<TenantId>,
    ) -> Result<()> {
        for name in names {
            self.events
                .publish(PermissionChangedEvent::new(kind, name, provider_kind, provider_key, tenant))
                .await?;
        }
        Ok(())
    }
}
