//! Grant resolution
//!
//! A permission is granted when, in order:
//! 1. the principal is authenticated,
//! 2. the permission is defined and visible to the current tenant,
//! 3. it is granted by default, or the user holds a grant, or any role
//!    holds a grant.
//!
//! A user-level prohibition stops resolution before roles are consulted.
//! Role-level prohibitions carry no weight and behave like a missing record.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use grantry_core::validation::ensure_not_blank;
use grantry_core::{
    CurrentTenant, GrantStatus, GrantryError, PermissionCheckResult, PermissionStore, Principal,
    ProviderKind, Result, TenantId,
};

use crate::registry::PermissionRegistry;

#[derive(Debug, Clone, Default)]
pub struct CheckerOptions {
    /// Upper bound for a single check, store round trips included
    pub timeout: Option<Duration>,
}

/// Answers "is this principal granted this permission"
#[derive(Clone)]
pub struct PermissionChecker {
    registry: Arc<PermissionRegistry>,
    store: Arc<dyn PermissionStore>,
    options: CheckerOptions,
}

impl PermissionChecker {
    pub fn new(registry: Arc<PermissionRegistry>, store: Arc<dyn PermissionStore>) -> Self {
        Self {
            registry,
            store,
            options: CheckerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CheckerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    /// Check one permission for the current tenant
    #[instrument(skip(self, principal), fields(principal = ?principal.id))]
    pub async fn is_granted(&self, principal: &Principal, name: &str) -> Result<bool> {
        let tenant = CurrentTenant::id();
        let check = self.resolve(principal, name, tenant);

        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, check).await.map_err(|_| {
                GrantryError::cancelled(format!(
                    "permission check '{}' exceeded {:?}",
                    name, limit
                ))
            })?,
            None => check.await,
        }
    }

    /// Check one permission, giving up as soon as `cancel` completes
    pub async fn is_granted_until<C>(
        &self,
        principal: &Principal,
        name: &str,
        cancel: C,
    ) -> Result<bool>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => Err(GrantryError::cancelled(format!("permission check '{}'", name))),
            result = self.is_granted(principal, name) => result,
        }
    }

    /// Check several permissions; the results follow the input order
    pub async fn is_granted_many<S: AsRef<str>>(
        &self,
        principal: &Principal,
        names: &[S],
    ) -> Result<Vec<PermissionCheckResult>> {
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let granted = self.is_granted(principal, name).await?;
            results.push(PermissionCheckResult::new(name, granted));
        }
        Ok(results)
    }

    async fn resolve(
        &self,
        principal: &Principal,
        name: &str,
        tenant: Option<TenantId>,
    ) -> Result<bool> {
        ensure_not_blank("permission name", name)?;

        if !principal.is_authenticated() {
            debug!(permission = name, "Unauthenticated principal");
            return Ok(false);
        }

        let definition = self.registry.get_permission_for(name, tenant)?;
        if definition.is_granted_by_default {
            return Ok(true);
        }
        let name = definition.name.as_str();

        if let Some(user_id) = principal.id.as_deref().filter(|id| !id.is_empty()) {
            match self
                .store
                .is_granted(name, ProviderKind::User, user_id, tenant)
                .await?
            {
                GrantStatus::Granted => return Ok(true),
                GrantStatus::Prohibited => {
                    debug!(permission = name, user = user_id, "Prohibited for user");
                    return Ok(false);
                }
                GrantStatus::Undefined => {}
            }
        }

        for role in principal.roles.iter().filter(|r| !r.is_empty()) {
            let status = self
                .store
                .is_granted(name, ProviderKind::Role, role, tenant)
                .await?;
            if status.is_granted() {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
