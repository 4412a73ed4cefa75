//! Identifier module.
//!
//! Provides the `Identifier` type, a shared string name used for prototypes,
//! node kinds and domain ids (entity types, items, tags, effects).
//! Uses `Arc<str>` so cloning during evaluation never allocates.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Shared string identifier.
///
/// Multiple clones of one `Identifier` share the same allocation, which
/// makes them cheap to hand out from registries and to store inside
/// parsed node kinds.
///
/// # Examples
///
/// ```rust
/// use xpcalc::Identifier;
///
/// let zombie = Identifier::new("zombie");
/// let zombie2: Identifier = "zombie".into();
/// let zombie3: Identifier = String::from("zombie").into();
///
/// assert_eq!(zombie, zombie2);
/// assert_eq!(zombie, zombie3);
/// assert_eq!(zombie.as_str(), "zombie");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Identifier(Arc<str>);

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Identifier::from(s))
    }
}

impl Identifier {
    /// Create a new `Identifier` from a string slice.
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Get the string representation of this identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&Identifier> for Identifier {
    fn from(id: &Identifier) -> Self {
        id.clone()
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl std::borrow::Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
