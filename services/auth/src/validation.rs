//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Minimum password length in characters
pub const PASSWORD_MIN_LEN: usize = 6;
/// Maximum password length in characters
pub const PASSWORD_MAX_LEN: usize = 72;

/// Trim and lower-case an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    let length = password.chars().count();

    if length < PASSWORD_MIN_LEN {
        return Err(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LEN
        ));
    }

    if length > PASSWORD_MAX_LEN {
        return Err(format!(
            "Password must be at most {} characters long",
            PASSWORD_MAX_LEN
        ));
    }

    Ok(())
}
