//! Input validation
//!
//! Collects every problem with a request instead of stopping at the first,
//! so clients can fix them in one round trip.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::dto::ApiError;

pub const MAX_NAME_LENGTH: usize = 256;
pub const MAX_PROVIDER_KEY_LENGTH: usize = 256;
pub const MAX_DESCRIPTION_LENGTH: usize = 4096;

/// Permission and group names: letters, digits and `._:-`
static NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:\-]+$").unwrap());

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: String,
}

impl ValidationError {
    pub fn new(field: &str, message: &str, code: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
            code: code.to_string(),
        }
    }
}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Input validator
#[derive(Default)]
pub struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(self) -> ValidationResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    pub fn error(&mut self, field: &str, message: &str, code: &str) -> &mut Self {
        self.errors.push(ValidationError::new(field, message, code));
        self
    }

    /// Validate a permission or group name
    pub fn name(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.error(field, "Name is required", "required");
        } else if value.len() > MAX_NAME_LENGTH {
            self.error(field, "Name is too long", "too_long");
        } else if !NAME_REGEX.is_match(value) {
            self.error(
                field,
                "Name may only contain letters, digits and . _ : -",
                "invalid_format",
            );
        }
        self
    }

    pub fn name_optional(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.name(field, v);
        }
        self
    }

    pub fn provider_key(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.error(field, "Provider key is required", "required");
        } else if value.len() > MAX_PROVIDER_KEY_LENGTH {
            self.error(field, "Provider key is too long", "too_long");
        }
        self
    }

    pub fn max_length(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.len() > max {
            self.error(
                field,
                &format!("Must be at most {} characters", max),
                "too_long",
            );
        }
        self
    }
}

/// Fold validation errors into one API error
pub fn to_api_error(errors: Vec<ValidationError>) -> ApiError {
    let details: HashMap<String, String> = errors
        .iter()
        .map(|e| (e.field.clone(), format!("{} ({})", e.message, e.code)))
        .collect();
    ApiError {
        code: "VALIDATION_FAILED".to_string(),
        message: errors
            .first()
            .map(|e| format!("{}: {}", e.field, e.message))
            .unwrap_or_else(|| "Invalid request".to_string()),
        details: Some(details),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        let mut v = Validator::new();
        v.name("name", "Orders.View");
        assert!(v.validate().is_ok());

        let mut v = Validator::new();
        v.name("name", "Orders View");
        assert!(v.validate().is_err());

        let mut v = Validator::new();
        v.name("name", "   ");
        let errors = v.validate().unwrap_err();
        assert_eq!(errors[0].code, "required");
    }

    #[test]
    fn test_errors_accumulate() {
        let mut v = Validator::new();
        v.name("name", "")
            .provider_key("provider_key", "")
            .max_length("description", &"x".repeat(10), 5);
        let errors = v.validate().unwrap_err();
        assert_eq!(errors.len(), 3);

        let api = to_api_error(errors);
        assert_eq!(api.code, "VALIDATION_FAILED");
        assert_eq!(api.details.unwrap().len(), 3);
    }

    #[test]
    fn test_optional_name_skips_empty() {
        let mut v = Validator::new();
        v.name_optional("parent_name", None)
            .name_optional("group_name", Some(""));
        assert!(v.validate().is_ok());
    }
}
