//! Conversation identifier.
//!
//! Identifiers are opaque strings: callers may supply any text they received
//! earlier, and fresh identifiers are random UUID v4 tokens.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Generate a fresh random identifier.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap caller-supplied text as an identifier.
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse caller input, treating blank text as "no identifier".
    ///
    /// Non-blank text is kept verbatim, surrounding whitespace included.
    #[must_use]
    pub fn from_optional(value: Option<&str>) -> Option<Self> {
        value.filter(|v| !v.trim().is_empty()).map(Self::new)
    }

    /// Borrow the identifier text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the identifier text.
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConversationId {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for ConversationId {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ConversationId {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<ConversationId> for String {
    #[inline]
    fn from(value: ConversationId) -> Self {
        value.0
    }
}

impl AsRef<str> for ConversationId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}
