use lazy_static::lazy_static;
use regex::Regex;

/// Longest email accepted, per RFC 5321 limits.
const MAX_EMAIL_LEN: usize = 254;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Outcome of a field validation: either valid, or invalid with a message the
/// user can act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: String,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            error: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: message.into(),
        }
    }

    pub fn into_result(self) -> Result<(), crate::error::AppError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(crate::error::AppError::Validation(self.error))
        }
    }
}

/// Validates email shape: non-empty, no whitespace, has "@" and ".", matches
/// a conservative pattern and stays within length limits.
pub fn validate_email(email: &str) -> ValidationResult {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }

    if email.trim().is_empty() {
        return ValidationResult::fail("email is required");
    }
    let email = email.trim();

    if email.contains(' ') {
        return ValidationResult::fail("email must not contain spaces");
    }
    if !email.contains('@') || !email.contains('.') {
        return ValidationResult::fail("please enter a valid email");
    }
    if !EMAIL_RE.is_match(email) {
        return ValidationResult::fail("email format is not valid");
    }
    if email.len() > MAX_EMAIL_LEN {
        return ValidationResult::fail("email is too long");
    }
    ValidationResult::ok()
}

/// Validates a password: non-blank, at least `min_length` characters, and
/// containing at least one alphanumeric character.
pub fn validate_password(password: &str, min_length: usize) -> ValidationResult {
    if password.is_empty() {
        return ValidationResult::fail("password is required");
    }
    if password.trim().is_empty() {
        return ValidationResult::fail("password must not be blank");
    }
    if password.chars().count() < min_length {
        return ValidationResult::fail(format!(
            "password must be at least {min_length} characters long"
        ));
    }
    if !password.chars().any(|c| c.is_alphanumeric()) {
        return ValidationResult::fail("password must contain at least one letter or number");
    }
    ValidationResult::ok()
}

/// Validates a display name: non-blank and between 2 and 100 characters after
/// trimming.
pub fn validate_name(name: &str) -> ValidationResult {
    if name.trim().is_empty() {
        return ValidationResult::fail("name is required");
    }
    let name = name.trim();
    if name.chars().count() < 2 {
        return ValidationResult::fail("name must be at least 2 characters long");
    }
    if name.chars().count() > 100 {
        return ValidationResult::fail("name is too long (maximum 100 characters)");
    }
    ValidationResult::ok()
}

/// Validates all registration fields, in order: name, email, password.
/// Short-circuits on the first failure.
pub fn validate_registration(email: &str, password: &str, name: &str) -> ValidationResult {
    let name_check = validate_name(name);
    if !name_check.is_valid {
        return name_check;
    }
    let email_check = validate_email(email);
    if !email_check.is_valid {
        return email_check;
    }
    let password_check = validate_password(password, MIN_PASSWORD_LEN);
    if !password_check.is_valid {
        return password_check;
    }
    ValidationResult::ok()
}

/// Login only checks that both fields are present. Format was already
/// enforced at registration, so it stays deliberately weaker here.
pub fn validate_login(email: &str, password: &str) -> ValidationResult {
    if email.trim().is_empty() {
        return ValidationResult::fail("email is required");
    }
    if password.trim().is_empty() {
        return ValidationResult::fail("password is required");
    }
    ValidationResult::ok()
}

/// Lowercases and trims an email. Must run before any store write or lookup
/// so that uniqueness is case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_emails() {
        assert!(validate_email("user@example.com").is_valid);
        assert!(validate_email("  user.name+tag@sub.example.org  ").is_valid);
    }

    #[test]
    fn rejects_bad_emails() {
        assert!(!validate_email("").is_valid);
        assert!(!validate_email("   ").is_valid);
        assert!(!validate_email("user example@test.com").is_valid);
        assert!(!validate_email("no-at-sign.com").is_valid);
        assert!(!validate_email("missing@dot").is_valid);
        assert!(!validate_email("double@@example.com").is_valid);
    }

    #[test]
    fn rejects_overlong_email() {
        let local = "a".repeat(250);
        assert!(!validate_email(&format!("{local}@example.com")).is_valid);
    }

    #[test]
    fn password_rules() {
        assert!(!validate_password("", MIN_PASSWORD_LEN).is_valid);
        assert!(!validate_password("      ", MIN_PASSWORD_LEN).is_valid);
        assert!(!validate_password("ab1", MIN_PASSWORD_LEN).is_valid);
        assert!(!validate_password("!!!!!!!!", MIN_PASSWORD_LEN).is_valid);
        assert!(validate_password("abc123", MIN_PASSWORD_LEN).is_valid);
    }

    #[test]
    fn name_rules() {
        assert!(!validate_name("").is_valid);
        assert!(!validate_name(" x ").is_valid);
        assert!(!validate_name(&"n".repeat(101)).is_valid);
        assert!(validate_name("  Ana  ").is_valid);
    }

    #[test]
    fn registration_checks_name_first() {
        let res = validate_registration("bad-email", "short", "");
        assert_eq!(res.error, "name is required");
        let res = validate_registration("bad-email", "short", "Ana");
        assert!(res.error.contains("email"));
        let res = validate_registration("ana@example.com", "abc", "Ana");
        assert!(res.error.contains("at least 6"));
    }

    #[test]
    fn login_only_requires_presence() {
        assert!(validate_login("not-an-email", "x").is_valid);
        assert!(!validate_login("", "secret").is_valid);
        assert!(!validate_login("ana@example.com", "  ").is_valid);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
        assert_eq!(normalize_name("  Ana Pérez  "), "Ana Pérez");
    }
}
