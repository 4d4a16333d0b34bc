use crate::error::{Error, Result};

/// Upper bound shared by `users.fullname`, `users.email` and `tasks.title`.
pub const MAX_TEXT_LEN: usize = 100;

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Invalid(format!("{field} must not be empty")));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(Error::Invalid(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<()> {
    require_text("task title", title)
}

pub fn validate_fullname(fullname: &str) -> Result<()> {
    require_text("full name", fullname)
}

/// Non-empty local part and domain around a single `@`, no whitespace.
pub fn validate_email(email: &str) -> Result<()> {
    require_text("email", email)?;
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(Error::Invalid(format!("'{email}' is not a valid email address")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_emails() {
        assert!(validate_email("a@example.com").is_ok());
        assert!(validate_email("first.last+tag@mail.example.org").is_ok());
    }

    #[test]
    fn invalid_emails() {
        assert!(validate_email("").is_err());
        assert!(validate_email("example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("a@b@c").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn titles() {
        assert!(validate_title("Write report").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(MAX_TEXT_LEN)).is_ok());
        assert!(validate_title(&"x".repeat(MAX_TEXT_LEN + 1)).is_err());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(validate_fullname(&"є".repeat(MAX_TEXT_LEN)).is_ok());
    }
}
