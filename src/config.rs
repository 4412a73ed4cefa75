//! Parser configuration.
//!
//! The `ConfigContext` is passed to every parse call. It carries the
//! options that change how strictly a configuration document is read; the
//! formula engine itself does not interpret domain data from it.

use crate::error::{FailureKind, ParseResult};
use crate::json::JsonPath;
use serde::{Deserialize, Serialize};

/// Options shared by every parse call.
///
/// # Examples
///
/// ```rust
/// use xpcalc::ConfigContext;
///
/// let defaults = ConfigContext::default();
/// assert!(defaults.legacy_schema);
/// assert!(!defaults.deny_unknown_fields);
///
/// let strict = ConfigContext::from_json_str(r#"{ "deny_unknown_fields": true }"#).unwrap();
/// assert!(strict.legacy_schema);
/// assert!(strict.deny_unknown_fields);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigContext {
    /// Accept calculations written in the older flat schema.
    pub legacy_schema: bool,

    /// Report members that a parsed object does not recognise.
    pub deny_unknown_fields: bool,
}

impl Default for ConfigContext {
    fn default() -> Self {
        Self {
            legacy_schema: true,
            deny_unknown_fields: false,
        }
    }
}

impl ConfigContext {
    /// Create a context with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that rejects the legacy schema and unknown fields.
    pub fn strict() -> Self {
        Self {
            legacy_schema: false,
            deny_unknown_fields: true,
        }
    }

    /// Load options from a JSON document. Absent options keep their defaults.
    pub fn from_json_str(text: &str) -> ParseResult<Self> {
        serde_json::from_str(text).map_err(|err| {
            JsonPath::root()
                .failure(FailureKind::Syntax(err.to_string()))
                .into()
        })
    }
}
