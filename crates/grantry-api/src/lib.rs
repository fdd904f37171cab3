//! Grantry API - HTTP surface for permission administration and checks
//!
//! - Definition listing and the per-provider grant tree
//! - Grant, revoke, prohibit and granted-set replacement
//! - Permission checks and policy evaluation for the calling principal
//! - Dynamic permission administration
//!
//! The tenant is taken from `X-Tenant-Id` and the principal from
//! `X-User-Id` / `X-User-Roles`; an upstream gateway is expected to
//! authenticate requests and set these headers.

pub mod definitions;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validation;

#[cfg(test)]
mod tests;

pub use routes::create_router;
pub use definitions::SystemDefinitionProvider;
pub use state::AppState;
