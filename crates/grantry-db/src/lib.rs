//! PostgreSQL database layer for Grantry

pub mod migrations;
pub mod pool;
pub mod repositories;

#[cfg(test)]
mod tests;

pub use migrations::run_migrations;
pub use pool::{create_pool, DatabaseConfig};
pub use repositories::*;
