//! Permissions that protect the administration API itself

use grantry_core::{DefinitionContext, PermissionDefinitionProvider, Result};

pub const ADMINISTRATION_GROUP: &str = "Administration";
pub const PERMISSION_MANAGEMENT: &str = "PermissionManagement";
pub const PERMISSION_MANAGEMENT_VIEW: &str = "PermissionManagement.View";
pub const PERMISSION_MANAGEMENT_UPDATE: &str = "PermissionManagement.Update";

/// Defines the `Administration` group guarding the grant routes
pub struct SystemDefinitionProvider;

impl PermissionDefinitionProvider for SystemDefinitionProvider {
    fn define(&self, ctx: &mut DefinitionContext) -> Result<()> {
        let mut group = ctx.add_group(ADMINISTRATION_GROUP, Some("Administration"))?;
        let mut management =
            group.add_permission(PERMISSION_MANAGEMENT, Some("Permission management"))?;
        management
            .add_child(PERMISSION_MANAGEMENT_VIEW, Some("View grants"))?
            .with_description("Read definitions, grants and permission trees");
        management
            .add_child(PERMISSION_MANAGEMENT_UPDATE, Some("Change grants"))?
            .with_description("Grant, revoke and prohibit permissions");
        Ok(())
    }
}
