//! Error types for the Grantry permission engine

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrantryError {
    #[error("{entity_type} not found: {name}")]
    NotFound { entity_type: String, name: String },

    #[error("{entity_type} already exists: {name}")]
    Conflict { entity_type: String, name: String },

    #[error("Permission '{name}' depends on unresolved parent '{parent}'")]
    Dependency { name: String, parent: String },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GrantryError {
    pub fn not_found(entity_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            name: name.into(),
        }
    }

    /// Shorthand for an unknown permission name
    pub fn permission_not_found(name: impl Into<String>) -> Self {
        Self::not_found("Permission", name)
    }

    pub fn conflict(entity_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Conflict {
            entity_type: entity_type.into(),
            name: name.into(),
        }
    }

    pub fn dependency(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::Dependency {
            name: name.into(),
            parent: parent.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn store_error(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code, used by the HTTP layer
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Dependency { .. } => "UNRESOLVED_DEPENDENCY",
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::Store { .. } => "STORE_UNAVAILABLE",
            Self::Cancelled { .. } => "CANCELLED",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, GrantryError>;
