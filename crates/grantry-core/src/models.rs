//! Domain models for grant storage and resolution

use crate::error::{GrantryError, Result};
use crate::ids::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Grant Providers
// =============================================================================

/// The kind of subject a grant record is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Grant attached to a single user, keyed by user id
    #[serde(rename = "U")]
    User,
    /// Grant attached to a role, keyed by role name
    #[serde(rename = "R")]
    Role,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::User => "U",
            ProviderKind::Role => "R",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = GrantryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "U" | "u" | "user" => Ok(ProviderKind::User),
            "R" | "r" | "role" => Ok(ProviderKind::Role),
            "" => Err(GrantryError::validation("provider_kind", "must not be empty")),
            other => Err(GrantryError::validation(
                "provider_kind",
                format!("unknown provider kind '{}'", other),
            )),
        }
    }
}

// =============================================================================
// Grant Status & Records
// =============================================================================

/// Tri-state outcome of a single store lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Granted,
    Prohibited,
    /// No record exists
    Undefined,
}

impl GrantStatus {
    /// Status for a possibly-missing record's `is_granted` flag
    pub fn from_record(is_granted: Option<bool>) -> Self {
        match is_granted {
            Some(true) => GrantStatus::Granted,
            Some(false) => GrantStatus::Prohibited,
            None => GrantStatus::Undefined,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, GrantStatus::Granted)
    }

    pub fn is_prohibited(&self) -> bool {
        matches!(self, GrantStatus::Prohibited)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, GrantStatus::Undefined)
    }
}

/// A persisted grant decision for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: GrantId,
    pub name: String,
    pub provider_kind: ProviderKind,
    pub provider_key: String,
    pub is_granted: bool,
    pub tenant_id: Option<TenantId>,
    pub creation_time: DateTime<Utc>,
}

impl PermissionGrant {
    pub fn new(
        name: impl Into<String>,
        provider_kind: ProviderKind,
        provider_key: impl Into<String>,
        tenant_id: Option<TenantId>,
        is_granted: bool,
    ) -> Self {
        Self {
            id: GrantId::new(),
            name: name.into(),
            provider_kind,
            provider_key: provider_key.into(),
            is_granted,
            tenant_id,
            creation_time: Utc::now(),
        }
    }

    pub fn status(&self) -> GrantStatus {
        GrantStatus::from_record(Some(self.is_granted))
    }
}

// =============================================================================
// Principals & Check Results
// =============================================================================

/// The subject of a permission check
///
/// Authentication happens upstream; this only carries its outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Option<String>,
    pub authenticated: bool,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn authenticated<I, S>(id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: Some(id.into()),
            authenticated: true,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Outcome of one entry in a batch check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheckResult {
    pub name: String,
    pub granted: bool,
}

impl PermissionCheckResult {
    pub fn new(name: impl Into<String>, granted: bool) -> Self {
        Self {
            name: name.into(),
            granted,
        }
    }
}

// =============================================================================
// Dynamic Permissions
// =============================================================================

/// Group used for dynamic records that do not name one
pub const DEFAULT_DYNAMIC_GROUP: &str = "Default";

/// A runtime-authored permission definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicPermissionRecord {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub parent_name: Option<String>,
    pub group_name: Option<String>,
    #[serde(default)]
    pub is_granted_by_default: bool,
    pub tenant_id: Option<TenantId>,
}

impl DynamicPermissionRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
            parent_name: None,
            group_name: None,
            is_granted_by_default: false,
            tenant_id: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_name = Some(parent.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group_name = Some(group.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Parent name with empty strings treated as absent
    pub fn parent(&self) -> Option<&str> {
        self.parent_name.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether this record may be seen from the given tenant
    pub fn is_visible_to(&self, tenant: Option<TenantId>) -> bool {
        match self.tenant_id {
            None => true,
            Some(owner) => tenant == Some(owner),
        }
    }

    pub fn group(&self) -> &str {
        self.group_name
            .as_deref()
            .filter(|g| !g.is_empty())
            .unwrap_or(DEFAULT_DYNAMIC_GROUP)
    }
}
