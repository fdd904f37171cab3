//! Permission registry
//!
//! The registry is built in two phases: providers (and optionally the
//! dynamic permission store) populate a [`DefinitionContext`], which is then
//! frozen into a [`PermissionRegistry`]. After that the registry is
//! read-only and can be shared freely across tasks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use grantry_core::{
    DefinitionContext, DynamicPermissionStore, GrantryError, PermissionDefinition,
    PermissionDefinitionProvider, PermissionGroupDefinition, Result, TenantId,
};

use crate::dynamic::merge_dynamic_records;

/// Frozen, name-indexed tree of permission definitions
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    context: DefinitionContext,
}

impl PermissionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Freeze an already populated context
    pub fn from_context(context: DefinitionContext) -> Self {
        Self { context }
    }

    /// Resolve a permission by name or full name
    pub fn get_permission(&self, name: &str) -> Result<&PermissionDefinition> {
        self.context
            .get_permission(name)
            .ok_or_else(|| GrantryError::permission_not_found(name))
    }

    /// Resolve a permission as seen from `tenant`
    ///
    /// Tenant-owned definitions are reported as missing to every other
    /// tenant and to the host.
    pub fn get_permission_for(
        &self,
        name: &str,
        tenant: Option<TenantId>,
    ) -> Result<&PermissionDefinition> {
        let definition = self.get_permission(name)?;
        if !definition.is_visible_to(tenant) {
            return Err(GrantryError::permission_not_found(name));
        }
        Ok(definition)
    }

    pub fn find_permission(&self, name: &str) -> Option<&PermissionDefinition> {
        self.context.get_permission(name)
    }

    pub fn get_group(&self, name: &str) -> Result<&PermissionGroupDefinition> {
        self.context
            .get_group(name)
            .ok_or_else(|| GrantryError::not_found("Permission group", name))
    }

    pub fn groups(&self) -> Vec<&PermissionGroupDefinition> {
        self.context.groups().collect()
    }

    /// All definitions, flattened in registration order
    pub fn permissions(&self) -> Vec<&PermissionDefinition> {
        self.context.permissions().collect()
    }

    pub fn children_of(&self, name: &str) -> Vec<&PermissionDefinition> {
        self.context
            .get_permission(name)
            .map(|parent| {
                parent
                    .children
                    .iter()
                    .filter_map(|child| self.context.get_permission(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.context.permission_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collects definition sources and builds a [`PermissionRegistry`]
#[derive(Clone, Default)]
pub struct RegistryBuilder {
    providers: Vec<Arc<dyn PermissionDefinitionProvider>>,
    dynamic_store: Option<Arc<dyn DynamicPermissionStore>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: impl PermissionDefinitionProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn provider_arc(mut self, provider: Arc<dyn PermissionDefinitionProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Merge dynamic records after the static providers have run
    pub fn dynamic_store(mut self, store: Arc<dyn DynamicPermissionStore>) -> Self {
        self.dynamic_store = Some(store);
        self
    }

    /// Run the static providers only
    pub fn build_static(&self) -> Result<PermissionRegistry> {
        let mut context = DefinitionContext::new();
        for provider in &self.providers {
            provider.define(&mut context)?;
        }
        Ok(PermissionRegistry::from_context(context))
    }

    /// Run every provider, then merge the dynamic store
    #[instrument(skip(self), fields(providers = self.providers.len()))]
    pub async fn build(&self) -> Result<PermissionRegistry> {
        let mut context = self.build_static()?.context;

        if let Some(store) = &self.dynamic_store {
            let records = store.list().await?;
            let merged = merge_dynamic_records(&mut context, &records)?;
            debug!(merged, "Merged dynamic permissions");
        }

        info!(
            groups = context.groups().count(),
            permissions = context.permission_count(),
            "Permission registry built"
        );
        Ok(PermissionRegistry::from_context(context))
    }
}

/// Lazily builds the registry exactly once
///
/// Concurrent first callers wait for a single build instead of racing. A
/// failed build leaves the manager uninitialized so the next call retries.
pub struct DefinitionManager {
    builder: RegistryBuilder,
    registry: OnceCell<Arc<PermissionRegistry>>,
    builds: AtomicUsize,
}

impl DefinitionManager {
    pub fn new(builder: RegistryBuilder) -> Self {
        Self {
            builder,
            registry: OnceCell::new(),
            builds: AtomicUsize::new(0),
        }
    }

    /// The registry, building it on first use
    pub async fn registry(&self) -> Result<Arc<PermissionRegistry>> {
        self.registry
            .get_or_try_init(|| async {
                self.builds.fetch_add(1, Ordering::SeqCst);
                self.builder.build().await.map(Arc::new)
            })
            .await
            .cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.registry.initialized()
    }

    /// Number of build attempts so far
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub async fn get_permission(&self, name: &str) -> Result<PermissionDefinition> {
        self.registry().await?.get_permission(name).cloned()
    }

    pub async fn groups(&self) -> Result<Vec<PermissionGroupDefinition>> {
        Ok(self
            .registry()
            .await?
            .groups()
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn permissions(&self) -> Result<Vec<PermissionDefinition>> {
        Ok(self
            .registry()
            .await?
            .permissions()
            .into_iter()
            .cloned()
            .collect())
    }
}
