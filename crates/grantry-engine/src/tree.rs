//! Grant tree for management screens
//!
//! Renders the registry as groups of nested permissions annotated with one
//! provider's grant state, and applies bulk on/off updates from the same
//! screen.

use std::collections::HashMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};

use grantry_core::{
    CurrentTenant, GrantStatus, PermissionDefinition, ProviderKind, Result, TenantId,
};

use crate::manager::PermissionManager;
use crate::registry::PermissionRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGroupView {
    pub name: String,
    pub display_name: String,
    pub permissions: Vec<PermissionNodeView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionNodeView {
    pub name: String,
    pub full_name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub level: u32,
    pub is_granted_by_default: bool,
    pub is_granted: bool,
    pub is_prohibited: bool,
    pub children: Vec<PermissionNodeView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PermissionUpdate {
    pub name: String,
    pub is_granted: bool,
}

pub struct PermissionTreeService {
    registry: Arc<PermissionRegistry>,
    manager: Arc<PermissionManager>,
}

impl PermissionTreeService {
    pub fn new(registry: Arc<PermissionRegistry>, manager: Arc<PermissionManager>) -> Self {
        Self { registry, manager }
    }

    /// The visible definition tree with the provider's own grant records
    pub async fn get_tree(
        &self,
        provider_kind: ProviderKind,
        provider_key: &str,
    ) -> Result<Vec<PermissionGroupView>> {
        let tenant = CurrentTenant::id();
        let grants: HashMap<String, GrantStatus> = self
            .manager
            .get_all(provider_kind, provider_key)
            .await?
            .into_iter()
            .map(|grant| {
                let status = grant.status();
                (grant.name, status)
            })
            .collect();

        let groups = self
            .registry
            .groups()
            .into_iter()
            .filter_map(|group| {
                let permissions: Vec<_> = group
                    .permissions
                    .iter()
                    .filter_map(|name| self.registry.find_permission(name))
                    .filter_map(|def| self.node(def, tenant, &grants))
                    .collect();
                if permissions.is_empty() && !group.permissions.is_empty() {
                    return None;
                }
                Some(PermissionGroupView {
                    name: group.name.clone(),
                    display_name: group.display_name.clone(),
                    permissions,
                })
            })
            .collect();
        Ok(groups)
    }

    /// Grant or revoke each listed permission
    pub async fn update(
        &self,
        provider_kind: ProviderKind,
        provider_key: &str,
        updates: &[PermissionUpdate],
    ) -> Result<()> {
        for update in updates {
            if update.is_granted {
                self.manager
                    .grant(&update.name, provider_kind, provider_key)
                    .await?;
            } else {
                self.manager
                    .revoke(&update.name, provider_kind, provider_key)
                    .await?;
            }
        }
        Ok(())
    }

    fn node(
        &self,
        def: &PermissionDefinition,
        tenant: Option<TenantId>,
        grants: &HashMap<String, GrantStatus>,
    ) -> Option<PermissionNodeView> {
        if !def.is_visible_to(tenant) {
            return None;
        }
        let children = def
            .children
            .iter()
            .filter_map(|name| self.registry.find_permission(name))
            .filter_map(|child| self.node(child, tenant, grants))
            .collect();
        let status = grants
            .get(&def.name)
            .copied()
            .unwrap_or(GrantStatus::Undefined);
        Some(PermissionNodeView {
            name: def.name.clone(),
            full_name: def.full_name().to_string(),
            display_name: def.display_name.clone(),
            description: def.description.clone(),
            level: def.level(),
            is_granted_by_default: def.is_granted_by_default,
            is_granted: status.is_granted(),
            is_prohibited: status.is_prohibited(),
            children,
        })
    }
}
