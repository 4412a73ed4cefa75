//! Error types for configuration parsing and registration.
//!
//! Parsing never panics on malformed configuration: every problem becomes
//! a [`Failure`] attributed to a [`JsonPath`], and sibling failures are
//! gathered into one [`ManyFailures`] report.

use crate::identifier::Identifier;
use crate::json::JsonPath;
use crate::node::NodeCategory;
use thiserror::Error;

/// Result type returned by every parse entry point.
pub type ParseResult<T> = Result<T, ManyFailures>;

/// Broad class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The document has the wrong shape: a field is missing, has the wrong
    /// JSON type, is not recognised, or the text is not JSON at all.
    Structural,
    /// The value is well-typed but not an acceptable choice.
    Semantic,
}

/// Reason attached to a single [`Failure`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureKind {
    /// A required field is absent.
    #[error("missing required field")]
    MissingField,

    /// A field is present with the wrong JSON type.
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    /// A node names a kind that is not registered on the prototype.
    #[error("unknown {category} type `{kind}` for prototype `{prototype}`")]
    UnknownKind {
        category: NodeCategory,
        kind: String,
        prototype: Identifier,
    },

    /// A field the object does not recognise (only reported when unknown
    /// fields are denied).
    #[error("unknown field")]
    UnknownField,

    /// The value is well-typed but out of range or otherwise unacceptable.
    #[error("{0}")]
    InvalidValue(String),

    /// The document text could not be read as JSON.
    #[error("malformed document: {0}")]
    Syntax(String),

    /// A required value was dropped without a recorded failure.
    #[error("incomplete object")]
    Incomplete,
}

impl FailureKind {
    /// Classify this failure as structural or semantic.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xpcalc::{FailureClass, FailureKind};
    ///
    /// assert_eq!(FailureKind::MissingField.class(), FailureClass::Structural);
    /// assert_eq!(
    ///     FailureKind::InvalidValue("negative".into()).class(),
    ///     FailureClass::Semantic
    /// );
    /// ```
    pub fn class(&self) -> FailureClass {
        match self {
            FailureKind::MissingField
            | FailureKind::WrongType { .. }
            | FailureKind::UnknownField
            | FailureKind::Syntax(_)
            | FailureKind::Incomplete => FailureClass::Structural,
            FailureKind::UnknownKind { .. } | FailureKind::InvalidValue(_) => {
                FailureClass::Semantic
            }
        }
    }
}

/// A single path-attributed configuration failure.
///
/// # Examples
///
/// ```rust
/// use xpcalc::{Failure, FailureKind, JsonPath};
///
/// let failure = Failure::new(JsonPath::root().field("cost"), FailureKind::MissingField);
/// assert_eq!(failure.to_string(), "cost: missing required field");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {kind}")]
pub struct Failure {
    path: JsonPath,
    kind: FailureKind,
}

impl Failure {
    /// Create a failure at `path`.
    pub fn new(path: JsonPath, kind: FailureKind) -> Self {
        Self { path, kind }
    }

    /// Path from the document root to the offending value.
    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    /// Reason for the failure.
    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// Shorthand for `self.kind().class()`.
    pub fn class(&self) -> FailureClass {
        self.kind.class()
    }
}

/// Format each failure on its own line.
fn format_failures(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(|failure| format!("  - {}", failure))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A non-empty, ordered collection of failures.
///
/// This is the error type of every parse entry point. Combining nested
/// collections flattens them while keeping encounter order, so a report
/// lists every offending path exactly once.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} configuration failure(s):\n{}", .failures.len(), format_failures(.failures))]
pub struct ManyFailures {
    failures: Vec<Failure>,
}

impl ManyFailures {
    /// Build from a list, returning `None` when the list is empty.
    pub fn from_vec(failures: Vec<Failure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    /// Flatten several collections into one, preserving order.
    ///
    /// Returns `None` when every input was empty (i.e. there were no inputs).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xpcalc::{Failure, FailureKind, JsonPath, ManyFailures};
    ///
    /// let a = ManyFailures::from(Failure::new(JsonPath::root().field("a"), FailureKind::MissingField));
    /// let b = ManyFailures::from(Failure::new(JsonPath::root().field("b"), FailureKind::MissingField));
    ///
    /// let combined = ManyFailures::combine([a, b]).unwrap();
    /// let paths: Vec<String> = combined.iter().map(|f| f.path().to_string()).collect();
    /// assert_eq!(paths, vec!["a", "b"]);
    /// ```
    pub fn combine(collections: impl IntoIterator<Item = ManyFailures>) -> Option<Self> {
        Self::from_vec(
            collections
                .into_iter()
                .flat_map(|many| many.failures)
                .collect(),
        )
    }

    /// Number of individual failures.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Iterate over the failures in encounter order.
    pub fn iter(&self) -> std::slice::Iter<'_, Failure> {
        self.failures.iter()
    }

    /// The first failure encountered.
    pub fn first(&self) -> &Failure {
        &self.failures[0]
    }

    /// Consume into the underlying list.
    pub fn into_vec(self) -> Vec<Failure> {
        self.failures
    }

    pub(crate) fn extend(&mut self, other: ManyFailures) {
        self.failures.extend(other.failures);
    }
}

impl From<Failure> for ManyFailures {
    fn from(failure: Failure) -> Self {
        Self {
            failures: vec![failure],
        }
    }
}

impl<'a> IntoIterator for &'a ManyFailures {
    type Item = &'a Failure;
    type IntoIter = std::slice::Iter<'a, Failure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.iter()
    }
}

/// Errors raised while assembling a prototype.
///
/// These describe programming mistakes in registration code, not problems
/// in configuration documents.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// The same kind name was registered twice in one category.
    #[error("{category} type `{kind}` is already registered on prototype `{prototype}`")]
    DuplicateKind {
        prototype: Identifier,
        category: NodeCategory,
        kind: Identifier,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(field: &str, kind: FailureKind) -> Failure {
        Failure::new(JsonPath::root().field(field), kind)
    }

    #[test]
    fn test_failure_display() {
        let failure = at(
            "cost",
            FailureKind::WrongType {
                expected: "integer",
                found: "string",
            },
        );
        assert_eq!(failure.to_string(), "cost: expected integer, found string");
    }

    #[test]
    fn test_many_failures_display_lists_every_path() {
        let mut many = ManyFailures::from(at("title", FailureKind::MissingField));
        many.extend(at("cost", FailureKind::InvalidValue("negative".into())).into());

        let display = many.to_string();
        assert!(display.starts_with("2 configuration failure(s)"));
        assert!(display.contains("title: missing required field"));
        assert!(display.contains("cost: negative"));
    }

    #[test]
    fn test_combine_flattens_in_order() {
        let mut first = ManyFailures::from(at("a", FailureKind::MissingField));
        first.extend(at("b", FailureKind::MissingField).into());
        let second = ManyFailures::from(at("c", FailureKind::MissingField));

        let combined = ManyFailures::combine([first, second]).unwrap();
        let paths: Vec<String> = combined.iter().map(|f| f.path().to_string()).collect();
        assert_eq!(paths, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_combine_of_nothing_is_none() {
        assert!(ManyFailures::combine(Vec::new()).is_none());
        assert!(ManyFailures::from_vec(Vec::new()).is_none());
    }

    #[test]
    fn test_failure_classes() {
        assert_eq!(FailureKind::UnknownField.class(), FailureClass::Structural);
        let unknown = FailureKind::UnknownKind {
            category: NodeCategory::Operation,
            kind: "nope".into(),
            prototype: Identifier::new("kill_entity"),
        };
        assert_eq!(unknown.class(), FailureClass::Semantic);
    }

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::DuplicateKind {
            prototype: Identifier::new("kill_entity"),
            category: NodeCategory::Condition,
            kind: Identifier::new("entity"),
        };
        assert_eq!(
            err.to_string(),
            "condition type `entity` is already registered on prototype `kill_entity`"
        );
    }
}
