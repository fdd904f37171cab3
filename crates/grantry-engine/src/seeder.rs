//! Initial grant seeding

use std::collections::BTreeMap;
use std::sync::Arc;
use serde::Deserialize;
use tracing::{info, warn};

use grantry_core::ProviderKind;

use crate::manager::PermissionManager;

/// Role grants to apply at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SeedOptions {
    /// Role name to permission names
    #[serde(default)]
    pub role_permissions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedFailure {
    pub role: String,
    pub permission: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub granted: usize,
    pub failures: Vec<SeedFailure>,
}

impl SeedReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Grants configured permissions to roles
///
/// Seeding is idempotent and never aborts: a permission that cannot be
/// granted is logged and recorded in the report, and the rest continue.
pub struct PermissionDataSeeder {
    manager: Arc<PermissionManager>,
}

impl PermissionDataSeeder {
    pub fn new(manager: Arc<PermissionManager>) -> Self {
        Self { manager }
    }

    pub async fn seed(&self, options: &SeedOptions) -> SeedReport {
        let mut report = SeedReport::default();
        for (role, permissions) in &options.role_permissions {
            self.seed_role(role, permissions, &mut report).await;
        }
        info!(
            granted = report.granted,
            failed = report.failures.len(),
            "Permission seeding finished"
        );
        report
    }

    async fn seed_role(&self, role: &str, permissions: &[String], report: &mut SeedReport) {
        for permission in permissions {
            match self.manager.grant(permission, ProviderKind::Role, role).await {
                Ok(()) => report.granted += 1,
                Err(e) => {
                    warn!(role, permission = %permission, error = %e, "Failed to seed permission");
                    report.failures.push(SeedFailure {
                        role: role.to_string(),
                        permission: permission.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}
