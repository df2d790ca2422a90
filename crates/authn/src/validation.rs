//! Input validation for credential-bearing requests.
//!
//! Checks run before any store access or password hashing, so malformed input
//! is rejected without doing expensive work.

use crate::error::AuthError;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum password length, in bytes. Bounds the hashing work one request can
/// cause.
pub const MAX_PASSWORD_LEN: usize = 256;

/// Maximum email length, in bytes (RFC 5321 path limit).
pub const MAX_EMAIL_LEN: usize = 254;

/// Validates a display name: it must contain a non-whitespace character.
///
/// # Errors
///
/// Returns [`AuthError::InvalidInput`] for a blank name.
pub fn validate_name(name: &str) -> Result<(), AuthError> {
    if name.trim().is_empty() {
        return Err(AuthError::invalid_input("name is required"));
    }
    Ok(())
}

/// Validates an email address.
///
/// Deliberately shallow: exactly one `@`, non-empty local and domain parts,
/// no whitespace, and at most [`MAX_EMAIL_LEN`] bytes. Deliverability is not
/// this crate's concern.
///
/// # Errors
///
/// Returns [`AuthError::InvalidInput`] describing the first violated rule.
///
/// # Examples
///
/// ```
/// use tokengate_authn::validation::validate_email;
///
/// assert!(validate_email("ada@example.com").is_ok());
/// assert!(validate_email("ada@@example.com").is_err());
/// assert!(validate_email("@example.com").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::invalid_input("email is required"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(AuthError::invalid_input(format!(
            "email exceeds maximum length of {MAX_EMAIL_LEN} bytes"
        )));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(AuthError::invalid_input("email must not contain whitespace"));
    }

    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AuthError::invalid_input("email must have the form local@domain")),
    }
}

/// Validates a new password's length.
///
/// # Errors
///
/// Returns [`AuthError::InvalidInput`] if the password is shorter than
/// [`MIN_PASSWORD_LEN`] characters or longer than [`MAX_PASSWORD_LEN`] bytes.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::invalid_input(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AuthError::invalid_input(format!(
            "password exceeds maximum length of {MAX_PASSWORD_LEN} bytes"
        )));
    }
    Ok(())
}

/// Validates every field of a registration request.
///
/// # Errors
///
/// Returns the first [`AuthError::InvalidInput`] encountered, checking name,
/// then email, then password.
pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<(), AuthError> {
    validate_name(name)?;
    validate_email(email)?;
    validate_password(password)
}
