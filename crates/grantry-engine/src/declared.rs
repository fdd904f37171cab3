//! Definitions declared as data
//!
//! Lets a deployment describe groups and permissions in its configuration
//! file instead of code:
//!
//! ```toml
//! [[definitions]]
//! name = "Sales"
//!
//! [[definitions.permissions]]
//! name = "Orders"
//! children = [{ name = "Export" }]
//! ```
//!
//! Names are registered verbatim and must be unique across the registry.
//! A child's full name joins its ancestors, so `Export` above resolves as
//! `Orders.Export` too.

use serde::{Deserialize, Serialize};

use grantry_core::{DefinitionContext, PermissionBuilder, PermissionDefinitionProvider, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub permissions: Vec<PermissionSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSpec {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub granted_by_default: bool,
    #[serde(default)]
    pub children: Vec<PermissionSpec>,
}

impl PermissionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
            granted_by_default: false,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: PermissionSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn granted_by_default(mut self) -> Self {
        self.granted_by_default = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeclaredDefinitionProvider {
    groups: Vec<GroupSpec>,
}

impl DeclaredDefinitionProvider {
    pub fn new(groups: Vec<GroupSpec>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[GroupSpec] {
        &self.groups
    }
}

impl PermissionDefinitionProvider for DeclaredDefinitionProvider {
    fn define(&self, context: &mut DefinitionContext) -> Result<()> {
        for group in &self.groups {
            let mut builder = context.add_group(&group.name, group.display_name.as_deref())?;
            for spec in &group.permissions {
                define_permission(
                    builder.add_permission(&spec.name, spec.display_name.as_deref())?,
                    spec,
                )?;
            }
        }
        Ok(())
    }
}

fn define_permission(builder: PermissionBuilder<'_>, spec: &PermissionSpec) -> Result<()> {
    let mut builder = builder.granted_by_default(spec.granted_by_default);
    if let Some(description) = &spec.description {
        builder = builder.with_description(description.clone());
    }
    for child in &spec.children {
        define_permission(
            builder.add_child(&child.name, child.display_name.as_deref())?,
            child,
        )?;
    }
    Ok(())
}
