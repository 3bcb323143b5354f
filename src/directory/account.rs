/// An active account resolved from the legacy database.
///
/// Built only from a fetched row; there are no setters because the account
/// database is the source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: String,
    email: String,
    username: String,
}

impl Account {
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            username: username.into(),
        }
    }

    /// Stable id of the row in the legacy database.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Primary login identifier.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Secondary login identifier.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn last_name(&self) -> &'static str {
        ""
    }

    /// Addresses are confirmed by the legacy system before an account becomes active.
    #[must_use]
    pub const fn email_verified(&self) -> bool {
        true
    }

    /// Inactive and deleted rows are filtered out by the fetch, so every account is enabled.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        true
    }

    /// Case-insensitive match against either identifier.
    #[must_use]
    pub fn matches(&self, identifier: &str) -> bool {
        eq_ignore_case(&self.email, identifier) || eq_ignore_case(&self.username, identifier)
    }
}

/// Full Unicode lowercasing of both strings; no per-character folding, so
/// `ß` never equals `SS` and `İ` never equals `i`.
fn eq_ignore_case(left: &str, right: &str) -> bool {
    left.eq_ignore_ascii_case(right) || left.to_lowercase() == right.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_either_identifier_ignoring_case() {
        let account = Account::new("7", "Alice@Example.org", "alice");
        assert!(account.matches("alice@example.org"));
        assert!(account.matches("ALICE"));
        assert!(!account.matches("alice2"));
        assert!(!account.matches(""));
    }

    #[test]
    fn matches_non_ascii_identifiers() {
        let account = Account::new("8", "jörg@example.org", "JÖRG");
        assert!(account.matches("JÖRG@EXAMPLE.ORG"));
        assert!(account.matches("jörg"));
    }

    #[test]
    fn special_case_folds_do_not_match() {
        let account = Account::new("10", "straße@example.org", "i");
        assert!(!account.matches("STRASSE@EXAMPLE.ORG"));
        assert!(account.matches("STRAẞE@EXAMPLE.ORG"));
        assert!(!account.matches("İ"));
        assert!(account.matches("I"));
    }

    #[test]
    fn profile_defaults() {
        let account = Account::new("9", "bob@example.org", "bob");
        assert_eq!(account.first_name(), "bob");
        assert_eq!(account.last_name(), "");
        assert!(account.email_verified());
        assert!(account.enabled());
    }
}
