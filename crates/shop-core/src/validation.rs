//! # Validation Module
//!
//! Input validation for account and cart requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (client)                                         │
//! │  ├── Mirrors the server's DTO constraints                              │
//! │  └── Fails before a request is sent                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Shop API (server)                                            │
//! │  ├── Bean validation on UserDTO / CartItemDTO                          │
//! │  └── Authoritative; its message is surfaced on the error stream        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shop_core::validation::{validate_email, validate_quantity};
//!
//! assert!(validate_email("john@example.com").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::NewAccount;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_length(field: &'static str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    let len = value.trim().chars().count();

    if len == 0 && min > 0 {
        return Err(ValidationError::Required {
            field,
        });
    }
    if len < min {
        return Err(ValidationError::TooShort {
            field,
            min,
        });
    }
    if len > max {
        return Err(ValidationError::TooLong {
            field,
            max,
        });
    }
    Ok(())
}

/// Validates a username: 3 to 50 characters.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_length("username", username, 3, 50)
}

/// Validates a first name: 1 to 100 characters.
pub fn validate_firstname(firstname: &str) -> ValidationResult<()> {
    validate_length("firstname", firstname, 1, 100)
}

/// Validates an email address.
///
/// ## Rules
/// - Must not be empty
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot that is neither first nor last
/// - No whitespace
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email",
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email",
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing '@'"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must contain exactly one '@' after a local part"));
    }

    match domain.rfind('.') {
        Some(dot) if dot > 0 && dot < domain.len() - 1 => Ok(()),
        _ => Err(invalid("domain must contain a dot")),
    }
}

/// Validates a password: at least 6 characters.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password",
        });
    }
    if password.chars().count() < 6 {
        return Err(ValidationError::TooShort {
            field: "password",
            min: 6,
        });
    }
    Ok(())
}

/// Validates a whole registration payload, field by field.
pub fn validate_new_account(account: &NewAccount) -> ValidationResult<()> {
    validate_username(&account.username)?;
    validate_firstname(&account.firstname)?;
    validate_email(&account.email)?;
    validate_password(&account.password)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a requested line quantity.
///
/// Must be ≥ 1; the server rejects anything lower with `@Min(1)`. There is
/// no upper bound.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 1 {
        return Err(ValidationError::MustBePositive {
            field: "quantity",
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> NewAccount {
        NewAccount {
            username: "jdoe".to_string(),
            firstname: "John".to_string(),
            email: "john@example.com".to_string(),
            password: "secret1".to_string(),
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("admin@admin.com").is_ok());
        assert!(validate_email("  a.b@c.io ").is_ok());

        assert!(matches!(validate_email(""), Err(ValidationError::Required { .. })));
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@b@c.com").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("a@.com").is_err());
        assert!(validate_email("a@example.").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn test_validate_username_bounds() {
        assert!(validate_username("abc").is_ok());
        assert!(matches!(
            validate_username("ab"),
            Err(ValidationError::TooShort { min: 3, .. })
        ));
        assert!(matches!(
            validate_username(&"x".repeat(51)),
            Err(ValidationError::TooLong { max: 50, .. })
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("123456").is_ok());
        assert!(matches!(
            validate_password("12345"),
            Err(ValidationError::TooShort { min: 6, .. })
        ));
        assert!(matches!(
            validate_password(""),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_new_account() {
        assert!(validate_new_account(&account()).is_ok());

        let mut bad = account();
        bad.firstname = "   ".to_string();
        assert!(matches!(
            validate_new_account(&bad),
            Err(ValidationError::Required { field }) if field == "firstname"
        ));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(1_000_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }
}
