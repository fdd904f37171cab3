//! Named authorization policies backed by permissions
//!
//! Any policy named `Permission.<name>` is satisfied exactly when the
//! checker grants `<name>` to the principal.

use serde::Serialize;
use tracing::debug;

use grantry_core::{Principal, Result};

use crate::checker::PermissionChecker;

pub const PERMISSION_POLICY_PREFIX: &str = "Permission.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionRequirement {
    pub permission: String,
}

impl PermissionRequirement {
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
        }
    }

    /// Parse a policy name; anything without the prefix is not ours
    pub fn from_policy(policy_name: &str) -> Option<Self> {
        policy_name
            .strip_prefix(PERMISSION_POLICY_PREFIX)
            .filter(|name| !name.trim().is_empty())
            .map(Self::new)
    }

    pub fn policy_name(&self) -> String {
        format!("{}{}", PERMISSION_POLICY_PREFIX, self.permission)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationDecision {
    pub policy: String,
    pub permission: String,
    pub succeeded: bool,
}

#[derive(Clone)]
pub struct PolicyEvaluator {
    checker: PermissionChecker,
}

impl PolicyEvaluator {
    pub fn new(checker: PermissionChecker) -> Self {
        Self { checker }
    }

    /// Evaluate a named policy
    ///
    /// Returns `None` when the name is not a permission policy so other
    /// policy sources can handle it.
    pub async fn authorize(
        &self,
        principal: &Principal,
        policy_name: &str,
    ) -> Result<Option<AuthorizationDecision>> {
        let Some(requirement) = PermissionRequirement::from_policy(policy_name) else {
            return Ok(None);
        };
        let succeeded = self.require(principal, &requirement).await?;
        Ok(Some(AuthorizationDecision {
            policy: policy_name.to_string(),
            permission: requirement.permission,
            succeeded,
        }))
    }

    pub async fn require(&self, principal: &Principal, requirement: &PermissionRequirement) -> Result<bool> {
        let granted = self
            .checker
            .is_granted(principal, &requirement.permission)
            .await?;
        debug!(permission = %requirement.permission, granted, "Permission requirement evaluated");
        Ok(granted)
    }
}
