//! In-memory stores

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use grantry_core::{
    DynamicPermissionRecord, DynamicPermissionStore, GrantStatus, PermissionGrant,
    PermissionStore, ProviderKind, Result, TenantId,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GrantKey {
    tenant_id: Option<TenantId>,
    provider_kind: ProviderKind,
    provider_key: String,
    name: String,
}

impl GrantKey {
    fn new(
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self {
            tenant_id,
            provider_kind,
            provider_key: provider_key.to_string(),
            name: name.to_string(),
        }
    }
}

/// Grant store backed by a concurrent hash map
///
/// Writes to the same key are serialized by the map's shard locks, so
/// concurrent writers never leave duplicate records behind.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    grants: DashMap<GrantKey, PermissionGrant>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across every tenant
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn is_granted(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<GrantStatus> {
        let key = GrantKey::new(name, provider_kind, provider_key, tenant_id);
        Ok(GrantStatus::from_record(
            self.grants.get(&key).map(|grant| grant.is_granted),
        ))
    }

    async fn get_all(
        &self,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<Vec<PermissionGrant>> {
        let mut grants: Vec<PermissionGrant> = self
            .grants
            .iter()
            .filter(|entry| {
                let key = entry.key();
                key.tenant_id == tenant_id
                    && key.provider_kind == provider_kind
                    && key.provider_key == provider_key
            })
            .map(|entry| entry.value().clone())
            .collect();
        grants.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(grants)
    }

    async fn save(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
        is_granted: bool,
    ) -> Result<()> {
        let key = GrantKey::new(name, provider_kind, provider_key, tenant_id);
        self.grants
            .entry(key)
            .and_modify(|grant| grant.is_granted = is_granted)
            .or_insert_with(|| {
                PermissionGrant::new(name, provider_kind, provider_key, tenant_id, is_granted)
            });
        Ok(())
    }

    async fn delete(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<()> {
        let key = GrantKey::new(name, provider_kind, provider_key, tenant_id);
        self.grants.remove(&key);
        Ok(())
    }
}

/// Dynamic definition store keeping records in insertion order
#[derive(Debug, Default)]
pub struct InMemoryDynamicPermissionStore {
    records: RwLock<Vec<DynamicPermissionRecord>>,
}

impl InMemoryDynamicPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<DynamicPermissionRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl DynamicPermissionStore for InMemoryDynamicPermissionStore {
    async fn list(&self) -> Result<Vec<DynamicPermissionRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn get(&self, name: &str) -> Result<Option<DynamicPermissionRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|record| record.name == name)
            .cloned())
    }

    async fn save(&self, record: &DynamicPermissionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|existing| existing.name == record.name) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.records.write().await.retain(|record| record.name != name);
        Ok(())
    }
}
