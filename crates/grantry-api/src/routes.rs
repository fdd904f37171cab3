//! API route definitions

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::middleware::{
    admin_guard_middleware, principal_middleware, request_id_middleware, tenant_middleware,
};
use crate::state::AppState;

/// Create the full API router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::liveness))
        .route("/health/ready", get(handlers::readiness))
        .nest("/api/v1", api_v1_routes(state.clone()))
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
}

/// API v1 routes
///
/// The tenant scope wraps everything below so handlers and the admin
/// guard see the same tenant.
fn api_v1_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/check", post(handlers::check::check_permissions))
        .route("/authorize", post(handlers::check::authorize))
        .merge(admin_routes(state))
        .layer(middleware::from_fn(principal_middleware))
        .layer(middleware::from_fn(tenant_middleware))
}

/// Administrative routes behind the permission-management guard
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/definitions", get(handlers::definitions::list_definitions))
        .route("/definitions/{name}", get(handlers::definitions::get_definition))
        .nest("/grants", grant_routes())
        .merge(dynamic_routes())
        .route_layer(middleware::from_fn_with_state(state, admin_guard_middleware))
}

fn grant_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/{kind}/{key}",
            get(handlers::grants::list_grants).put(handlers::grants::set_granted_set),
        )
        .route(
            "/{kind}/{key}/tree",
            get(handlers::grants::get_tree).put(handlers::grants::update_tree),
        )
        .route(
            "/{kind}/{key}/{name}",
            post(handlers::grants::grant).delete(handlers::grants::revoke),
        )
        .route("/{kind}/{key}/{name}/prohibit", post(handlers::grants::prohibit))
}

fn dynamic_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/dynamic",
            get(handlers::dynamic::list_dynamic).post(handlers::dynamic::create_dynamic),
        )
        .route(
            "/dynamic/{name}",
            get(handlers::dynamic::get_dynamic).delete(handlers::dynamic::delete_dynamic),
        )
}
