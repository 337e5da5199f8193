//! Input checks shared by the sign-up and feature endpoints. Each returns the
//! first problem found as a user-facing message, or `None` when valid.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").unwrap());

pub fn validate_email(email: &str) -> Option<&'static str> {
    if email.is_empty() {
        return Some("Email is required");
    }
    if !EMAIL.is_match(email) {
        return Some("Invalid email address");
    }
    None
}

pub fn validate_password(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        return Some("Password is required");
    }
    if password.chars().count() < 8 {
        return Some("Password must be at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("Password must contain at least one number");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("Password must contain at least one uppercase letter");
    }
    None
}

pub fn validate_name(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("Name is required");
    }
    if name.chars().count() < 2 {
        return Some("Name must be at least 2 characters");
    }
    None
}

/// Lengths are counted in characters, not bytes.
pub fn validate_feature(title: &str, description: &str) -> Option<&'static str> {
    if title.is_empty() || description.is_empty() {
        return Some("Missing required fields");
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Some("Title must be less than 100 characters");
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Some("Description must be less than 500 characters");
    }
    None
}
