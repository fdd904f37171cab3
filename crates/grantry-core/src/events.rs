//! Grant change events emitted by the permission manager

use crate::ids::TenantId;
use crate::models::ProviderKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag used to index handlers in the event bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionChangeKind {
    Granted,
    Revoked,
    Prohibited,
}

impl PermissionChangeKind {
    pub const ALL: [PermissionChangeKind; 3] = [
        PermissionChangeKind::Granted,
        PermissionChangeKind::Revoked,
        PermissionChangeKind::Prohibited,
    ];
}

impl fmt::Display for PermissionChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionChangeKind::Granted => "permission_granted",
            PermissionChangeKind::Revoked => "permission_revoked",
            PermissionChangeKind::Prohibited => "permission_prohibited",
        };
        f.write_str(s)
    }
}

/// A single grant mutation that has already been applied to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChangedEvent {
    pub kind: PermissionChangeKind,
    pub name: String,
    pub provider_kind: ProviderKind,
    pub provider_key: String,
    pub tenant_id: Option<TenantId>,
    pub occurred_at: DateTime<Utc>,
}

impl PermissionChangedEvent {
    pub fn new(
        kind: PermissionChangeKind,
        name: impl Into<String>,
        provider_kind: ProviderKind,
        provider_key: impl Into<String>,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            provider_kind,
            provider_key: provider_key.into(),
            tenant_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn granted(
        name: impl Into<String>,
        provider_kind: ProviderKind,
        provider_key: impl Into<String>,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self::new(PermissionChangeKind::Granted, name, provider_kind, provider_key, tenant_id)
    }

    pub fn revoked(
        name: impl Into<String>,
        provider_kind: ProviderKind,
        provider_key: impl Into<String>,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self::new(PermissionChangeKind::Revoked, name, provider_kind, provider_key, tenant_id)
    }

    pub fn prohibited(
        name: impl Into<String>,
        provider_kind: ProviderKind,
        provider_key: impl Into<String>,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self::new(
            PermissionChangeKind::Prohibited,
            name,
            provider_kind,
            provider_key,
            tenant_id,
        )
    }
}
