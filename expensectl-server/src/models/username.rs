//! Username validation
//!
//! Format: letters, digits and `@ . + - _`, like most login systems.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// Maximum length for usernames
const MAX_USERNAME_LEN: usize = 150;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9@.+_-]+$").expect("invalid username regex"));

/// Validated username
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Create a username, validating its format.
    ///
    /// # Example
    /// ```
    /// use expensectl_server::models::Username;
    ///
    /// assert!(Username::new("alice").is_ok());
    /// assert!(Username::new("alice smith").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "username" });
        }

        if s.len() > MAX_USERNAME_LEN {
            return Err(ValidationError::TooLong {
                field: "username",
                max: MAX_USERNAME_LEN,
            });
        }

        if !USERNAME_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "username",
                reason: "may contain only letters, digits and @/./+/-/_",
            });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_usernames() {
        assert!(Username::new("alice").is_ok());
        assert!(Username::new("bob.smith+expenses@example.com").is_ok());
        assert!(Username::new("user_1-a").is_ok());
    }

    #[test]
    fn rejects_spaces() {
        let err = Username::new("alice smith").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn rejects_empty_and_long() {
        assert!(matches!(Username::new(""), Err(ValidationError::Empty { .. })));
        let long = "a".repeat(151);
        assert!(matches!(Username::new(&long), Err(ValidationError::TooLong { max: 150, .. })));
    }
}
