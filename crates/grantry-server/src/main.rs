//! Grantry permission service - Main Server

use anyhow::{Context, Result};
use axum::Router;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::Settings;
use grantry_api::{AppState, SystemDefinitionProvider};
use grantry_core::{DynamicPermissionStore, PermissionStore};
use grantry_db::{create_pool, run_migrations, PgDynamicPermissionStore, PgPermissionStore};
use grantry_engine::{
    AuditLogHandler, DeclaredDefinitionProvider, DefinitionManager, EventBus,
    PermissionDataSeeder, RegistryBuilder,
};
use grantry_store::{
    CacheInvalidationHandler, CachedPermissionStore, InMemoryDynamicPermissionStore,
    InMemoryPermissionStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let settings = Settings::load().context("Failed to load configuration")?;

    info!("Starting Grantry v{}", env!("CARGO_PKG_VERSION"));

    let state = initialize_services(&settings).await?;
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,grantry=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

struct Stores {
    grants: Arc<dyn PermissionStore>,
    dynamic: Arc<dyn DynamicPermissionStore>,
    pool: Option<PgPool>,
}

async fn open_stores(settings: &Settings) -> Result<Stores> {
    let Some(db_config) = settings.database.to_config() else {
        warn!("No database configured, grants are kept in memory");
        return Ok(Stores {
            grants: Arc::new(InMemoryPermissionStore::new()),
            dynamic: Arc::new(InMemoryDynamicPermissionStore::new()),
            pool: None,
        });
    };

    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&db_config)
        .await
        .context("Failed to connect to PostgreSQL")?;
    if db_config.run_migrations {
        run_migrations(&pool)
            .await
            .context("Failed to apply migrations")?;
    }
    info!("PostgreSQL connection established");

    Ok(Stores {
        grants: Arc::new(PgPermissionStore::new(pool.clone())),
        dynamic: Arc::new(PgDynamicPermissionStore::new(pool.clone())),
        pool: Some(pool),
    })
}

/// Composition root: store, cache, event bus, registry, then the services
async fn initialize_services(settings: &Settings) -> Result<AppState> {
    let stores = open_stores(settings).await?;

    let cache = Arc::new(CachedPermissionStore::new(
        stores.grants,
        settings.cache.to_config(),
    ));

    let mut events = EventBus::new().with_mode(settings.events.dispatch);
    events.subscribe_all(Arc::new(CacheInvalidationHandler::new(cache.clone())));
    events.subscribe_all(Arc::new(AuditLogHandler));

    let definitions = DefinitionManager::new(
        RegistryBuilder::new()
            .provider(SystemDefinitionProvider)
            .provider(DeclaredDefinitionProvider::new(settings.definitions.clone()))
            .dynamic_store(stores.dynamic.clone()),
    );
    let registry = definitions
        .registry()
        .await
        .context("Failed to build permission registry")?;
    info!(
        groups = registry.groups().len(),
        permissions = registry.len(),
        "Permission registry ready"
    );

    let mut state = AppState::new(
        registry,
        cache.clone(),
        Arc::new(events),
        settings.checker.to_options(),
    )
    .with_dynamic_store(stores.dynamic)
    .with_cache(cache)
    .with_admin_guard(settings.api.admin_guard);
    if let Some(pool) = stores.pool {
        state = state.with_db_pool(pool);
    }

    let report = PermissionDataSeeder::new(state.manager.clone())
        .seed(&settings.seed)
        .await;
    if !report.is_clean() {
        warn!(
            failed = report.failures.len(),
            "Some configured role grants could not be seeded"
        );
    }

    info!("All services initialized successfully");
    Ok(state)
}

fn create_app(state: AppState) -> Router {
    grantry_api::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
