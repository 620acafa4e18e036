//! Local input validation, applied before any network call.

use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Basic structural email check: one `@` with a non-empty local part and a
/// dotted domain, no whitespace. The provider remains the authority; this
/// only catches obvious typos cheaply.
pub fn email(value: &str) -> Result<(), AuthError> {
    let invalid = |message: &str| AuthError::Validation {
        field: "email".to_string(),
        message: message.to_string(),
    };

    if value.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }
    let Some((local, domain)) = value.split_once('@') else {
        return Err(invalid("missing '@'"));
    };
    if local.is_empty() || domain.is_empty() {
        return Err(invalid("missing local part or domain"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("invalid domain"));
    }
    Ok(())
}

/// Minimum-length password check. Complexity rules are enforced server-side.
pub fn password(value: &str) -> Result<(), AuthError> {
    if value.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation {
            field: "password".to_string(),
            message: format!("must be at least {MIN_PASSWORD_LEN} characters"),
        });
    }
    Ok(())
}
