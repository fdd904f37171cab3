//! Application state for API handlers

use sqlx::PgPool;
use std::sync::Arc;

use grantry_core::{DynamicPermissionStore, PermissionStore};
use grantry_engine::{
    CheckerOptions, DynamicPermissionService, EventBus, PermissionChecker, PermissionManager,
    PermissionRegistry, PermissionTreeService, PolicyEvaluator,
};
use grantry_store::CachedPermissionStore;

/// Concrete application state with all services
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<PermissionRegistry>,
    pub checker: PermissionChecker,
    pub manager: Arc<PermissionManager>,
    pub tree: Arc<PermissionTreeService>,
    pub policies: PolicyEvaluator,
    /// Present when a dynamic permission store is configured
    pub dynamic: Option<Arc<DynamicPermissionService>>,
    /// Present when reads go through the grant cache (for health metrics)
    pub cache: Option<Arc<CachedPermissionStore>>,
    /// Present when grants live in PostgreSQL (for health checks)
    pub db_pool: Option<PgPool>,
    /// Require the PermissionManagement permissions on admin routes
    pub admin_guard: bool,
}

impl AppState {
    /// Wire the engine services around one registry, store and event bus
    pub fn new(
        registry: Arc<PermissionRegistry>,
        store: Arc<dyn PermissionStore>,
        events: Arc<EventBus>,
        checker_options: CheckerOptions,
    ) -> Self {
        let checker =
            PermissionChecker::new(registry.clone(), store.clone()).with_options(checker_options);
        let manager = Arc::new(PermissionManager::new(registry.clone(), store, events));
        let tree = Arc::new(PermissionTreeService::new(registry.clone(), manager.clone()));

        Self {
            policies: PolicyEvaluator::new(checker.clone()),
            registry,
            checker,
            manager,
            tree,
            dynamic: None,
            cache: None,
            db_pool: None,
            admin_guard: false,
        }
    }

    pub fn with_dynamic_store(mut self, store: Arc<dyn DynamicPermissionStore>) -> Self {
        self.dynamic = Some(Arc::new(DynamicPermissionService::new(
            store,
            self.registry.clone(),
        )));
        self
    }

    pub fn with_cache(mut self, cache: Arc<CachedPermissionStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    pub fn with_admin_guard(mut self, enabled: bool) -> Self {
        self.admin_guard = enabled;
        self
    }
}
