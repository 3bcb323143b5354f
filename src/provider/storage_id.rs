use std::fmt;

const PREFIX: &str = "f";

/// Host-side id of a federated account: `f:<component>:<external id>`.
///
/// Hosts that strip the prefix hand back the bare external id, so that form
/// is accepted too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageId {
    component: Option<String>,
    external: String,
}

impl StorageId {
    #[must_use]
    pub fn new(component: impl Into<String>, external: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            external: external.into(),
        }
    }

    /// Returns `None` for an empty id or a prefixed id missing either part.
    #[must_use]
    pub fn parse(id: &str) -> Option<Self> {
        if id.is_empty() {
            return None;
        }

        let Some(rest) = id
            .strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_prefix(':'))
        else {
            return Some(Self {
                component: None,
                external: id.to_string(),
            });
        };

        // external ids may contain ':'
        let (component, external) = rest.split_once(':')?;
        if component.is_empty() || external.is_empty() {
            return None;
        }

        Some(Self::new(component, external))
    }

    #[must_use]
    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    #[must_use]
    pub fn external(&self) -> &str {
        &self.external
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.component {
            Some(component) => write!(f, "{PREFIX}:{component}:{}", self.external),
            None => f.write_str(&self.external),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefixed() {
        let id = StorageId::parse("f:galaxy:alice@example.org");
        assert_eq!(id, Some(StorageId::new("galaxy", "alice@example.org")));
        assert_eq!(
            id.map(|id| id.to_string()).as_deref(),
            Some("f:galaxy:alice@example.org")
        );
    }

    #[test]
    fn parse_keeps_colons_in_external_id() {
        let id = StorageId::parse("f:galaxy:a:b");
        assert_eq!(id.as_ref().map(StorageId::external), Some("a:b"));
    }

    #[test]
    fn parse_bare_external_id() {
        let id = StorageId::parse("alice@example.org");
        assert_eq!(id.as_ref().and_then(StorageId::component), None);
        assert_eq!(id.as_ref().map(StorageId::external), Some("alice@example.org"));
    }

    #[test]
    fn parse_rejects_malformed() {
        for id in ["", "f:", "f:galaxy", "f::alice", "f:galaxy:"] {
            assert_eq!(StorageId::parse(id), None, "{id}");
        }
    }
}
