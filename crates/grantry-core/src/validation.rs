//! Argument checks shared by every public operation

use crate::error::{GrantryError, Result};

/// Reject empty or whitespace-only identifiers
pub fn ensure_not_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GrantryError::validation(field, "must not be empty"));
    }
    Ok(())
}

/// Validate a permission name and provider key pair
pub fn ensure_grant_args(name: &str, provider_key: &str) -> Result<()> {
    ensure_not_blank("permission name", name)?;
    ensure_not_blank("provider key", provider_key)
}
