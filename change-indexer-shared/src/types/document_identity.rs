//! Document identity types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a document in the search index.
///
/// Derived deterministically from a change event payload. Re-indexing the same identity
/// overwrites the stored document instead of creating a duplicate, which is what makes
/// redelivered records harmless. An identity is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentIdentity(String);

impl DocumentIdentity {
    /// Create an identity, returning `None` if the value is empty or whitespace only.
    ///
    /// # Example
    ///
    /// ```
    /// use change_indexer_shared::DocumentIdentity;
    ///
    /// assert!(DocumentIdentity::new("a1b2").is_some());
    /// assert!(DocumentIdentity::new("   ").is_none());
    /// ```
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identity and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
