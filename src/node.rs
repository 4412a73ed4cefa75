//! Configuration node headers.
//!
//! Every formula node in a document is an object with a `type` string that
//! selects a registered kind and an optional `data` member that the kind's
//! factory interprets.

use crate::accumulate::Accumulator;
use crate::config::ConfigContext;
use crate::error::{Failure, FailureKind, ParseResult};
use crate::identifier::Identifier;
use crate::json::{JsonElement, JsonObject, JsonPath};
use std::fmt;

/// The three node categories a prototype dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Yields a number and combines it into a running total.
    Operation,
    /// Yields a number from the context.
    Parameter,
    /// Yields a boolean from the context.
    Condition,
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeCategory::Operation => "operation",
            NodeCategory::Parameter => "parameter",
            NodeCategory::Condition => "condition",
        };
        write!(f, "{}", name)
    }
}

/// The `data` member of a node, which may be absent.
///
/// Factories decide whether absence is acceptable: `required` turns it into
/// a missing-field failure at the `data` path, `optional` does not.
#[derive(Debug, Clone)]
pub struct NodeData<'a> {
    element: Option<JsonElement<'a>>,
    path: JsonPath,
}

impl<'a> NodeData<'a> {
    /// Data that is present.
    pub fn present(element: JsonElement<'a>) -> Self {
        let path = element.path().clone();
        Self {
            element: Some(element),
            path,
        }
    }

    /// Data that is absent; `path` is where it would have been.
    pub fn absent(path: JsonPath) -> Self {
        Self {
            element: None,
            path,
        }
    }

    /// Read the `data` member of `object`.
    pub fn of(object: &JsonObject<'a>) -> Self {
        match object.get_optional("data") {
            Some(element) => Self::present(element),
            None => Self::absent(object.path().field("data")),
        }
    }

    /// Path of the data member.
    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    /// Whether the data member is present.
    pub fn is_present(&self) -> bool {
        self.element.is_some()
    }

    /// The data element, or a missing-field failure.
    pub fn required(self) -> Result<JsonElement<'a>, Failure> {
        let path = self.path;
        self.element
            .ok_or_else(|| path.failure(FailureKind::MissingField))
    }

    /// The data element if present.
    pub fn optional(self) -> Option<JsonElement<'a>> {
        self.element
    }
}

/// A node header: the selected kind name and its data.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    kind: &'a str,
    kind_path: JsonPath,
    data: NodeData<'a>,
}

impl<'a> Node<'a> {
    /// Read the header of `object`, recording failures into `failures`.
    ///
    /// Returns `None` when `type` is missing or not a string; the data of
    /// such a node cannot be interpreted. Members other than `type`, `data`
    /// and `extra_fields` are reported when the context denies unknown fields.
    pub fn read(
        object: &JsonObject<'a>,
        extra_fields: &[&str],
        config: &ConfigContext,
        failures: &mut Accumulator,
    ) -> Option<Self> {
        if config.deny_unknown_fields {
            let mut allowed = vec!["type", "data"];
            allowed.extend_from_slice(extra_fields);
            failures.record_all(object.unknown_fields(&allowed));
        }

        let kind = failures.take(object.get_string("type"))?;
        Some(Self {
            kind,
            kind_path: object.path().field("type"),
            data: NodeData::of(object),
        })
    }

    /// Parse a node header from an element with no extra members.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_json::json;
    /// use xpcalc::{ConfigContext, JsonElement};
    /// use xpcalc::node::Node;
    ///
    /// let doc = json!({ "type": "constant", "data": { "value": 3.0 } });
    /// let node = Node::parse(JsonElement::root(&doc), &ConfigContext::default()).unwrap();
    /// assert_eq!(node.kind(), "constant");
    /// assert!(node.data().is_present());
    /// ```
    pub fn parse(element: JsonElement<'a>, config: &ConfigContext) -> ParseResult<Self> {
        let object = element.as_object()?;
        let mut failures = Accumulator::new(object.path());
        let node = Self::read(&object, &[], config, &mut failures);
        failures.finish(node)
    }

    /// The selected kind name.
    pub fn kind(&self) -> &'a str {
        self.kind
    }

    /// Path of the `type` member.
    pub fn kind_path(&self) -> &JsonPath {
        &self.kind_path
    }

    /// The node's data.
    pub fn data(&self) -> &NodeData<'a> {
        &self.data
    }

    /// Consume the header, keeping only the data.
    pub fn into_data(self) -> NodeData<'a> {
        self.data
    }

    /// Failure for a kind that `prototype` does not register in `category`.
    pub fn unknown_kind(&self, category: NodeCategory, prototype: &Identifier) -> Failure {
        self.kind_path.failure(FailureKind::UnknownKind {
            category,
            kind: self.kind.to_string(),
            prototype: prototype.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_data_fails_only_when_required() {
        let doc = json!({ "type": "dropped_experience" });
        let node = Node::parse(JsonElement::root(&doc), &ConfigContext::default()).unwrap();
        assert!(!node.data().is_present());
        assert!(node.data().clone().optional().is_none());

        let failure = node.into_data().required().unwrap_err();
        assert_eq!(failure.path().to_string(), "data");
        assert_eq!(failure.kind(), &FailureKind::MissingField);
    }

    #[test]
    fn test_missing_type() {
        let doc = json!({ "data": {} });
        let err = Node::parse(JsonElement::root(&doc), &ConfigContext::default()).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.first().path().to_string(), "type");
    }

    #[test]
    fn test_unknown_fields_only_when_denied() {
        let doc = json!({ "type": "add", "dat": 1 });
        assert!(Node::parse(JsonElement::root(&doc), &ConfigContext::default()).is_ok());

        let strict = ConfigContext {
            deny_unknown_fields: true,
            ..ConfigContext::default()
        };
        let err = Node::parse(JsonElement::root(&doc), &strict).unwrap_err();
        assert_eq!(err.first().path().to_string(), "dat");
        assert_eq!(err.first().kind(), &FailureKind::UnknownField);
    }

    #[test]
    fn test_unknown_kind_points_at_type() {
        let doc = json!({ "operations": [{ "type": "nope" }] });
        let element = JsonElement::root(&doc)
            .as_object()
            .unwrap()
            .get_array("operations")
            .unwrap()
            .iter()
            .next()
            .unwrap();
        let node = Node::parse(element, &ConfigContext::default()).unwrap();
        let failure = node.unknown_kind(NodeCategory::Operation, &Identifier::new("kill_entity"));
        assert_eq!(failure.path().to_string(), "operations[0].type");
    }
}
