//! Health check handlers
//!
//! - /health - component status with cache metrics
//! - /health/live - the process is running
//! - /health/ready - the grant store can serve traffic

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub permission_count: usize,
    pub components: Vec<ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hit_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_entries: Option<u64>,
}

#[derive(Serialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(Instant::now);
    start.elapsed().as_secs()
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut components = Vec::new();
    let mut overall_status = HealthStatus::Healthy;

    if let Some(db_health) = check_database(&state, Duration::from_secs(5)).await {
        if db_health.status == HealthStatus::Unhealthy {
            overall_status = HealthStatus::Unhealthy;
        }
        components.push(db_health);
    }

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: get_uptime_seconds(),
        permission_count: state.registry.len(),
        components,
        cache_hit_rate: state.cache.as_ref().map(|c| c.metrics().hit_rate()),
        cache_entries: state.cache.as_ref().map(|c| c.entry_count()),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// `None` when grants are held in memory
async fn check_database(state: &AppState, timeout: Duration) -> Option<ComponentHealth> {
    let pool = state.db_pool.as_ref()?;
    let start = Instant::now();

    let health = match tokio::time::timeout(timeout, sqlx::query("SELECT 1").fetch_one(pool)).await
    {
        Ok(Ok(_)) => {
            debug!("Database health check passed");
            ComponentHealth {
                name: "database".to_string(),
                status: HealthStatus::Healthy,
                message: None,
                latency_ms: start.elapsed().as_millis() as u64,
            }
        }
        Ok(Err(e)) => {
            warn!("Database health check failed: {}", e);
            ComponentHealth {
                name: "database".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some(format!("Query failed: {}", e)),
                latency_ms: start.elapsed().as_millis() as u64,
            }
        }
        Err(_) => {
            warn!("Database health check timed out");
            ComponentHealth {
                name: "database".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some(format!("Health check timed out after {:?}", timeout)),
                latency_ms: timeout.as_millis() as u64,
            }
        }
    };
    Some(health)
}

pub async fn liveness() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: "alive".to_string(),
        }),
    )
}

pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<SimpleHealthResponse>) {
    let db_ok = check_database(&state, Duration::from_secs(2))
        .await
        .map_or(true, |c| c.status == HealthStatus::Healthy);

    if db_ok {
        (
            StatusCode::OK,
            Json(SimpleHealthResponse {
                status: "ready".to_string(),
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleHealthResponse {
                status: "not ready: database unavailable".to_string(),
            }),
        )
    }
}
