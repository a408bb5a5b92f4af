//! Identity references as they appear in admin lists and requests

use serde::{Deserialize, Serialize};
use std::fmt;

/// Leading character of a directory-issued identity ID
pub const CANONICAL_ID_PREFIX: char = 'U';

/// Total length of a directory-issued identity ID, prefix included
pub const CANONICAL_ID_LEN: usize = 11;

lazy_static::lazy_static! {
    static ref CANONICAL_ID_REGEX: regex::Regex =
        regex::Regex::new(r"^U[A-Z0-9]{10}$").unwrap();
}

/// A reference to an identity in one of its surface forms.
///
/// Admin lists mix directory IDs (`U1234567890`), handles with or without a
/// leading `@`, and email addresses. Parsing classifies the entry once so the
/// rest of the engine never inspects raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IdentityRef {
    CanonicalId(String),
    Handle(String),
    Email(String),
}

impl IdentityRef {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_canonical_id(trimmed) {
            return IdentityRef::CanonicalId(trimmed.to_string());
        }

        let bare = trimmed.strip_prefix('@').unwrap_or(trimmed);
        if bare.contains('@') {
            IdentityRef::Email(bare.to_string())
        } else {
            IdentityRef::Handle(bare.to_string())
        }
    }

    /// Canonical ID when the reference already is one
    pub fn canonical_id(&self) -> Option<&str> {
        match self {
            IdentityRef::CanonicalId(id) => Some(id),
            _ => None,
        }
    }

    /// Key used by the handle resolution cache: the bare handle or email
    pub fn cache_key(&self) -> &str {
        match self {
            IdentityRef::CanonicalId(v) | IdentityRef::Handle(v) | IdentityRef::Email(v) => v,
        }
    }
}

impl fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityRef::CanonicalId(id) => write!(f, "{}", id),
            IdentityRef::Handle(handle) => write!(f, "@{}", handle),
            IdentityRef::Email(email) => write!(f, "{}", email),
        }
    }
}

impl From<&str> for IdentityRef {
    fn from(raw: &str) -> Self {
        IdentityRef::parse(raw)
    }
}

/// Check the fixed prefix + fixed length shape of a directory ID
pub fn is_canonical_id(value: &str) -> bool {
    value.len() == CANONICAL_ID_LEN
        && value.starts_with(CANONICAL_ID_PREFIX)
        && CANONICAL_ID_REGEX.is_match(value)
}
