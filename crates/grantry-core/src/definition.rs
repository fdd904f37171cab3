//! Permission and group definitions
//!
//! Definitions are kept in flat, name-indexed maps. Parents, children and
//! groups refer to each other by name, so the structure has no ownership
//! cycles and serializes as-is. Full name and level are fixed when a
//! definition is registered; nothing can be re-parented afterwards.

use crate::error::{GrantryError, Result};
use crate::ids::TenantId;
use crate::validation::ensure_not_blank;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named, checkable capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub is_granted_by_default: bool,
    pub group: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    /// Set for tenant-authored dynamic permissions
    pub tenant_id: Option<TenantId>,
    full_name: String,
    level: u32,
}

impl PermissionDefinition {
    /// Dot-joined ancestor chain ending in this definition's name
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Distance from the root, roots being level 1
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether this definition may be seen from the given tenant
    pub fn is_visible_to(&self, tenant: Option<TenantId>) -> bool {
        match self.tenant_id {
            None => true,
            Some(owner) => tenant == Some(owner),
        }
    }
}

/// A display bucket of top-level permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroupDefinition {
    pub name: String,
    pub display_name: String,
    /// Top-level permission names in registration order
    pub permissions: Vec<String>,
}

/// Mutable context handed to definition providers
#[derive(Debug, Clone, Default)]
pub struct DefinitionContext {
    groups: HashMap<String, PermissionGroupDefinition>,
    group_order: Vec<String>,
    permissions: HashMap<String, PermissionDefinition>,
    permission_order: Vec<String>,
    full_names: HashMap<String, String>,
}

impl DefinitionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new group
    pub fn add_group(&mut self, name: &str, display_name: Option<&str>) -> Result<GroupBuilder<'_>> {
        ensure_not_blank("group name", name)?;
        if self.groups.contains_key(name) {
            return Err(GrantryError::conflict("Permission group", name));
        }

        self.groups.insert(
            name.to_string(),
            PermissionGroupDefinition {
                name: name.to_string(),
                display_name: display_name.unwrap_or(name).to_string(),
                permissions: Vec::new(),
            },
        );
        self.group_order.push(name.to_string());

        Ok(GroupBuilder {
            ctx: self,
            name: name.to_string(),
        })
    }

    /// Reopen an existing group to add more permissions to it
    pub fn group(&mut self, name: &str) -> Result<GroupBuilder<'_>> {
        if !self.groups.contains_key(name) {
            return Err(GrantryError::not_found("Permission group", name));
        }
        Ok(GroupBuilder {
            ctx: self,
            name: name.to_string(),
        })
    }

    /// Reopen an existing permission to add children to it
    pub fn permission(&mut self, name: &str) -> Result<PermissionBuilder<'_>> {
        if !self.permissions.contains_key(name) {
            return Err(GrantryError::permission_not_found(name));
        }
        Ok(PermissionBuilder {
            ctx: self,
            name: name.to_string(),
        })
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains_key(name)
    }

    /// Look up by name, then by full name
    pub fn get_permission(&self, name: &str) -> Option<&PermissionDefinition> {
        self.permissions.get(name).or_else(|| {
            self.full_names
                .get(name)
                .and_then(|canonical| self.permissions.get(canonical))
        })
    }

    pub fn get_group(&self, name: &str) -> Option<&PermissionGroupDefinition> {
        self.groups.get(name)
    }

    /// Groups in registration order
    pub fn groups(&self) -> impl Iterator<Item = &PermissionGroupDefinition> {
        self.group_order.iter().filter_map(|n| self.groups.get(n))
    }

    /// Every permission, flattened, in registration order
    pub fn permissions(&self) -> impl Iterator<Item = &PermissionDefinition> {
        self.permission_order
            .iter()
            .filter_map(|n| self.permissions.get(n))
    }

    pub fn permission_count(&self) -> usize {
        self.permissions.len()
    }

    fn insert_permission(
        &mut self,
        group: &str,
        parent: Option<&str>,
        name: &str,
        display_name: Option<&str>,
    ) -> Result<()> {
        ensure_not_blank("permission name", name)?;
        if self.permissions.contains_key(name) || self.full_names.contains_key(name) {
            return Err(GrantryError::conflict("Permission", name));
        }

        let (full_name, level) = match parent {
            Some(parent_name) => {
                let parent_def = self
                    .permissions
                    .get(parent_name)
                    .ok_or_else(|| GrantryError::permission_not_found(parent_name))?;
                (
                    format!("{}.{}", parent_def.full_name, name),
                    parent_def.level + 1,
                )
            }
            None => (name.to_string(), 1),
        };

        if full_name != name
            && (self.full_names.contains_key(&full_name) || self.permissions.contains_key(&full_name))
        {
            return Err(GrantryError::conflict("Permission", full_name));
        }

        let definition = PermissionDefinition {
            name: name.to_string(),
            display_name: display_name.unwrap_or(name).to_string(),
            description: None,
            is_granted_by_default: false,
            group: group.to_string(),
            parent: parent.map(str::to_string),
            children: Vec::new(),
            tenant_id: None,
            full_name: full_name.clone(),
            level,
        };

        match parent {
            Some(parent_name) => {
                if let Some(parent_def) = self.permissions.get_mut(parent_name) {
                    parent_def.children.push(name.to_string());
                }
            }
            None => {
                if let Some(group_def) = self.groups.get_mut(group) {
                    group_def.permissions.push(name.to_string());
                }
            }
        }

        self.full_names.insert(full_name, name.to_string());
        self.permissions.insert(name.to_string(), definition);
        self.permission_order.push(name.to_string());
        Ok(())
    }

    fn update(&mut self, name: &str, f: impl FnOnce(&mut PermissionDefinition)) {
        if let Some(def) = self.permissions.get_mut(name) {
            f(def);
        }
    }
}

/// Handle for adding permissions to a group
pub struct GroupBuilder<'a> {
    ctx: &'a mut DefinitionContext,
    name: String,
}

impl<'a> GroupBuilder<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a top-level permission to this group
    pub fn add_permission(
        &mut self,
        name: &str,
        display_name: Option<&str>,
    ) -> Result<PermissionBuilder<'_>> {
        self.ctx.insert_permission(&self.name, None, name, display_name)?;
        Ok(PermissionBuilder {
            ctx: &mut *self.ctx,
            name: name.to_string(),
        })
    }
}

/// Handle for configuring a registered permission and adding children
pub struct PermissionBuilder<'a> {
    ctx: &'a mut DefinitionContext,
    name: String,
}

impl<'a> PermissionBuilder<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.ctx
            .update(&self.name, |def| def.description = Some(description));
        self
    }

    pub fn granted_by_default(self, granted: bool) -> Self {
        self.ctx
            .update(&self.name, |def| def.is_granted_by_default = granted);
        self
    }

    pub fn with_tenant(self, tenant_id: Option<TenantId>) -> Self {
        self.ctx.update(&self.name, |def| def.tenant_id = tenant_id);
        self
    }

    /// Add a child permission; it joins this permission's group
    pub fn add_child(&mut self, name: &str, display_name: Option<&str>) -> Result<PermissionBuilder<'_>> {
        let group = self
            .ctx
            .permissions
            .get(&self.name)
            .map(|def| def.group.clone())
            .ok_or_else(|| GrantryError::permission_not_found(&self.name))?;
        self.ctx
            .insert_permission(&group, Some(&self.name), name, display_name)?;
        Ok(PermissionBuilder {
            ctx: &mut *self.ctx,
            name: name.to_string(),
        })
    }
}
