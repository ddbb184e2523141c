// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Login request validator.
//!
//! Rejects malformed requests before the rate-limit store is touched:
//! - Email and password presence
//! - Length caps on both fields
//!
//! Credential rules (format, strength) belong to the identity provider and
//! are not checked here.

use crate::config::ValidationConfig;
use thiserror::Error;
use tracing::debug;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} exceeds {max} bytes")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Request body is not valid JSON: {0}")]
    MalformedBody(String),
}

/// Result of validation.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Request is valid
    Valid,
    /// Request is invalid
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(e) => Some(e),
        }
    }

    /// Convert into a `Result` for `?` propagation.
    pub fn into_result(self) -> Result<(), ValidationError> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(e) => Err(e),
        }
    }
}

/// Login request validator.
#[derive(Debug, Clone)]
pub struct CredentialsValidator {
    config: ValidationConfig,
}

impl Default for CredentialsValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl CredentialsValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate the email field. Surrounding whitespace does not count as
    /// content, but the value is never rewritten.
    pub fn validate_email(&self, email: Option<&str>) -> ValidationResult {
        let email = match email {
            Some(e) if !e.trim().is_empty() => e,
            _ => {
                debug!("Missing email");
                return ValidationResult::Invalid(ValidationError::MissingField("email"));
            }
        };

        if email.len() > self.config.max_email_len {
            debug!(len = email.len(), "Email too long");
            return ValidationResult::Invalid(ValidationError::FieldTooLong {
                field: "email",
                max: self.config.max_email_len,
            });
        }

        ValidationResult::Valid
    }

    /// Validate the password field. Whitespace-only passwords are passed
    /// through; only an absent or empty value is rejected.
    pub fn validate_password(&self, password: Option<&str>) -> ValidationResult {
        let password = match password {
            Some(p) if !p.is_empty() => p,
            _ => {
                debug!("Missing password");
                return ValidationResult::Invalid(ValidationError::MissingField("password"));
            }
        };

        if password.len() > self.config.max_password_len {
            debug!("Password too long");
            return ValidationResult::Invalid(ValidationError::FieldTooLong {
                field: "password",
                max: self.config.max_password_len,
            });
        }

        ValidationResult::Valid
    }

    /// Validate a complete login request.
    pub fn validate(&self, email: Option<&str>, password: Option<&str>) -> ValidationResult {
        let email_result = self.validate_email(email);
        if !email_result.is_valid() {
            return email_result;
        }

        self.validate_password(password)
    }
}
