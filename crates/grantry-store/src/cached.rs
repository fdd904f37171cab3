//! Cached grant store
//!
//! Wraps any [`PermissionStore`] with two moka caches: one for single grant
//! lookups and one for a provider's full record list. Keys always carry the
//! tenant, so one tenant's entries can never answer another tenant's
//! lookups. Every invalidation drops the single entry together with the
//! provider's list entry so the two views never diverge. Writes made
//! through the wrapper invalidate immediately; writes made elsewhere are
//! picked up through [`CacheInvalidationHandler`] or by expiry.
//!
//! A fill that raced with an invalidation is discarded: every invalidation
//! bumps a generation counter, and a miss only keeps the value it read when
//! the generation is unchanged after the insert.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use grantry_core::{
    GrantStatus, PermissionChangedEvent, PermissionEventHandler, PermissionGrant,
    PermissionStore, ProviderKind, Result, TenantId,
};

// =============================================================================
// Cache Key Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GrantCacheKey {
    tenant_id: Option<TenantId>,
    provider_kind: ProviderKind,
    provider_key: String,
    name: String,
}

impl GrantCacheKey {
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

/// Cache key for a provider's full record list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProviderCacheKey {
    tenant_id: Option<TenantId>,
    provider_kind: ProviderKind,
    provider_key: String,
}

impl ProviderCacheKey {
    fn new(provider_kind: ProviderKind, provider_key: &str, tenant_id: Option<TenantId>) -> Self {
        Self {
            tenant_id,
            provider_kind,
            provider_key: provider_key.to_string(),
        }
    }
}

// =============================================================================
// Cached Store
// =============================================================================

/// Configuration for the cached store
#[derive(Debug, Clone)]
pub struct CachedStoreConfig {
    /// When false every call goes straight to the inner store
    pub enabled: bool,
    /// Maximum number of entries per cache
    pub max_capacity: u64,
    /// Entries expire this long after insertion (default: 5 minutes)
    pub time_to_live: Duration,
    /// Entries expire after this long without being read
    pub time_to_idle: Option<Duration>,
    /// Whether writes through the wrapper invalidate the written key
    pub invalidate_on_write: bool,
}

impl Default for CachedStoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 10_000,
            time_to_live: Duration::from_secs(300),
            time_to_idle: None,
            invalidate_on_write: true,
        }
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub invalidations: AtomicU64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Read-through cache over a grant store
pub struct CachedPermissionStore {
    inner: Arc<dyn PermissionStore>,
    config: CachedStoreConfig,
    grant_cache: Cache<GrantCacheKey, GrantStatus>,
    provider_cache: Cache<ProviderCacheKey, Arc<Vec<PermissionGrant>>>,
    metrics: Arc<CacheMetrics>,
    generation: Arc<AtomicU64>,
}

impl CachedPermissionStore {
    pub fn new(inner: Arc<dyn PermissionStore>, config: CachedStoreConfig) -> Self {
        let mut grants = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.time_to_live);
        let mut providers = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.time_to_live);
        if let Some(idle) = config.time_to_idle {
            grants = grants.time_to_idle(idle);
            providers = providers.time_to_idle(idle);
        }

        Self {
            inner,
            config,
            grant_cache: grants.build(),
            provider_cache: providers.build(),
            metrics: Arc::new(CacheMetrics::default()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn inner(&self) -> &Arc<dyn PermissionStore> {
        &self.inner
    }

    pub fn config(&self) -> &CachedStoreConfig {
        &self.config
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Approximate number of cached entries
    pub fn entry_count(&self) -> u64 {
        self.grant_cache.entry_count() + self.provider_cache.entry_count()
    }

    /// Drop the cached decision for one key and the provider's list
    pub async fn invalidate(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) {
        let key = GrantCacheKey::new(name, provider_kind, provider_key, tenant_id);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.grant_cache.invalidate(&key).await;
        self.provider_cache
            .invalidate(&ProviderCacheKey::new(provider_kind, provider_key, tenant_id))
            .await;
        self.metrics.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(permission = name, %provider_kind, provider_key, "Invalidated cached grant");
    }

    /// Drop every cached decision
    pub async fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.grant_cache.invalidate_all();
        self.provider_cache.invalidate_all();
        self.grant_cache.run_pending_tasks().await;
        self.provider_cache.run_pending_tasks().await;
        self.metrics.invalidations.fetch_add(1, Ordering::Relaxed);
        info!("Invalidated entire grant cache");
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// True when no invalidation ran since `observed` was read
    fn is_current(&self, observed: u64) -> bool {
        self.current_generation() == observed
    }

    async fn invalidate_after_write(
        &self,
        names: &[String],
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) {
        if !self.config.invalidate_on_write {
            return;
        }
        for name in names {
            self.invalidate(name, provider_kind, provider_key, tenant_id)
                .await;
        }
    }
}

impl Clone for CachedPermissionStore {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config.clone(),
            grant_cache: self.grant_cache.clone(),
            provider_cache: self.provider_cache.clone(),
            metrics: self.metrics.clone(),
            generation: self.generation.clone(),
        }
    }
}

impl std::fmt::Debug for CachedPermissionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedPermissionStore")
            .field("config", &self.config)
            .field("entries", &self.entry_count())
            .field("metrics", &self.metrics)
            .finish()
    }
}

#[async_trait]
impl PermissionStore for CachedPermissionStore {
    #[instrument(skip(self))]
    async fn is_granted(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<GrantStatus> {
        if !self.config.enabled {
            return self
                .inner
                .is_granted(name, provider_kind, provider_key, tenant_id)
                .await;
        }

        let key = GrantCacheKey::new(name, provider_kind, provider_key, tenant_id);

        if let Some(status) = self.grant_cache.get(&key).await {
            self.metrics.hits.fetch_add(1, Ordering::Relaxed);
            debug!(?status, "Grant cache hit");
            return Ok(status);
        }

        self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Grant cache miss");

        let observed = self.current_generation();
        let status = self
            .inner
            .is_granted(name, provider_kind, provider_key, tenant_id)
            .await?;
        if self.is_current(observed) {
            self.grant_cache.insert(key.clone(), status).await;
            // an invalidation may have landed between the check and the insert
            if !self.is_current(observed) {
                self.grant_cache.invalidate(&key).await;
            }
        } else {
            debug!("Discarded grant read that raced an invalidation");
        }
        Ok(status)
    }

    #[instrument(skip(self))]
    async fn get_all(
        &self,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<Vec<PermissionGrant>> {
        if !self.config.enabled {
            return self.inner.get_all(provider_kind, provider_key, tenant_id).await;
        }

        let key = ProviderCacheKey::new(provider_kind, provider_key, tenant_id);

        if let Some(grants) = self.provider_cache.get(&key).await {
            self.metrics.hits.fetch_add(1, Ordering::Relaxed);
            debug!(count = grants.len(), "Provider grant list cache hit");
            return Ok(grants.as_ref().clone());
        }

        self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        let observed = self.current_generation();
        let grants = self
            .inner
            .get_all(provider_kind, provider_key, tenant_id)
            .await?;
        if self.is_current(observed) {
            self.provider_cache
                .insert(key.clone(), Arc::new(grants.clone()))
                .await;
            if !self.is_current(observed) {
                self.provider_cache.invalidate(&key).await;
            }
        } else {
            debug!("Discarded provider list read that raced an invalidation");
        }
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
        self.inner
            .save(name, provider_kind, provider_key, tenant_id, is_granted)
            .await?;
        self.invalidate_after_write(&[name.to_string()], provider_kind, provider_key, tenant_id)
            .await;
        Ok(())
    }

    async fn delete(
        &self,
        name: &str,
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<()> {
        self.inner
            .delete(name, provider_kind, provider_key, tenant_id)
            .await?;
        self.invalidate_after_write(&[name.to_string()], provider_kind, provider_key, tenant_id)
            .await;
        Ok(())
    }

    async fn save_many(
        &self,
        names: &[String],
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
        is_granted: bool,
    ) -> Result<()> {
        self.inner
            .save_many(names, provider_kind, provider_key, tenant_id, is_granted)
            .await?;
        self.invalidate_after_write(names, provider_kind, provider_key, tenant_id)
            .await;
        Ok(())
    }

    async fn delete_many(
        &self,
        names: &[String],
        provider_kind: ProviderKind,
        provider_key: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<()> {
        self.inner
            .delete_many(names, provider_kind, provider_key, tenant_id)
            .await?;
        self.invalidate_after_write(names, provider_kind, provider_key, tenant_id)
            .await;
        Ok(())
    }
}

// =============================================================================
// Event-driven invalidation
// =============================================================================

/// Drops cached decisions when a grant change event is published
pub struct CacheInvalidationHandler {
    cache: Arc<CachedPermissionStore>,
}

impl CacheInvalidationHandler {
    pub fn new(cache: Arc<CachedPermissionStore>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl PermissionEventHandler for CacheInvalidationHandler {
    fn name(&self) -> &str {
        "cache_invalidation"
    }

    async fn handle(&self, event: &PermissionChangedEvent) -> Result<()> {
        self.cache
            .invalidate(
                &event.name,
                event.provider_kind,
                &event.provider_key,
                event.tenant_id,
            )
            .await;
        Ok(())
    }
}
