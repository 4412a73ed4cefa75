//! Typed views over a loosely structured JSON document.
//!
//! Every accessor converts "this field is missing or malformed" into a
//! [`Failure`] carrying the [`JsonPath`] of the offending value, instead of
//! panicking or returning a bare `Option`.

use crate::error::{Failure, FailureKind, ManyFailures, ParseResult};
use serde_json::{Map, Value};
use std::fmt;

/// One step of a [`JsonPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Object member access.
    Field(String),
    /// Array element access.
    Index(usize),
}

/// Structural path from the document root to a value.
///
/// Displays as `operations[1].data.value`; the root itself displays as `$`.
///
/// # Examples
///
/// ```rust
/// use xpcalc::JsonPath;
///
/// let path = JsonPath::root().field("operations").index(1).field("data");
/// assert_eq!(path.to_string(), "operations[1].data");
/// assert_eq!(JsonPath::root().to_string(), "$");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPath {
    steps: Vec<PathStep>,
}

impl JsonPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend with an object member.
    pub fn field(&self, name: &str) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Field(name.to_string()));
        Self { steps }
    }

    /// Extend with an array index.
    pub fn index(&self, index: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Index(index));
        Self { steps }
    }

    /// The steps of this path, root first.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Whether this is the document root.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Build a failure located at this path.
    pub fn failure(&self, kind: FailureKind) -> Failure {
        Failure::new(self.clone(), kind)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "$");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Field(name) if i == 0 => write!(f, "{}", name)?,
                PathStep::Field(name) => write!(f, ".{}", name)?,
                PathStep::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Name of the JSON type of `value`, for wrong-type messages.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse document text, reporting syntax errors as a failure at the root.
///
/// # Examples
///
/// ```rust
/// use xpcalc::json::parse_document;
///
/// assert!(parse_document(r#"{"cost": 2}"#).is_ok());
/// assert!(parse_document("{cost").is_err());
/// ```
pub fn parse_document(text: &str) -> Result<Value, Failure> {
    serde_json::from_str(text)
        .map_err(|err| JsonPath::root().failure(FailureKind::Syntax(err.to_string())))
}

/// A borrowed JSON value together with its path.
#[derive(Debug, Clone)]
pub struct JsonElement<'a> {
    value: &'a Value,
    path: JsonPath,
}

impl<'a> JsonElement<'a> {
    /// Wrap a document root.
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            path: JsonPath::root(),
        }
    }

    /// Wrap a value located at `path`.
    pub fn new(value: &'a Value, path: JsonPath) -> Self {
        Self { value, path }
    }

    /// The raw value.
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Path of this element.
    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    fn wrong_type(&self, expected: &'static str) -> Failure {
        self.path.failure(FailureKind::WrongType {
            expected,
            found: type_name(self.value),
        })
    }

    /// View as an object.
    pub fn as_object(&self) -> Result<JsonObject<'a>, Failure> {
        match self.value {
            Value::Object(map) => Ok(JsonObject {
                map,
                path: self.path.clone(),
            }),
            _ => Err(self.wrong_type("object")),
        }
    }

    /// View as an array.
    pub fn as_array(&self) -> Result<JsonArray<'a>, Failure> {
        match self.value {
            Value::Array(items) => Ok(JsonArray {
                items,
                path: self.path.clone(),
            }),
            _ => Err(self.wrong_type("array")),
        }
    }

    /// Read a string.
    pub fn as_str(&self) -> Result<&'a str, Failure> {
        self.value.as_str().ok_or_else(|| self.wrong_type("string"))
    }

    /// Read a number.
    pub fn as_f64(&self) -> Result<f64, Failure> {
        self.value.as_f64().ok_or_else(|| self.wrong_type("number"))
    }

    /// Read an integer that fits in `i32`.
    ///
    /// Fractional numbers are a wrong-type failure; integers outside the
    /// `i32` range are an invalid-value failure.
    pub fn as_i32(&self) -> Result<i32, Failure> {
        let value = match (self.value.as_i64(), self.value.as_u64()) {
            (Some(value), _) => i128::from(value),
            (None, Some(value)) => i128::from(value),
            (None, None) => return Err(self.wrong_type("integer")),
        };
        i32::try_from(value).map_err(|_| {
            self.path.failure(FailureKind::InvalidValue(format!(
                "integer {} is out of range",
                value
            )))
        })
    }

    /// Read a boolean.
    pub fn as_bool(&self) -> Result<bool, Failure> {
        self.value.as_bool().ok_or_else(|| self.wrong_type("boolean"))
    }

    /// Whether the value is a JSON number.
    pub fn is_number(&self) -> bool {
        self.value.is_number()
    }
}

/// A borrowed JSON object together with its path.
#[derive(Debug, Clone)]
pub struct JsonObject<'a> {
    map: &'a Map<String, Value>,
    path: JsonPath,
}

impl<'a> JsonObject<'a> {
    /// Path of this object.
    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    /// Whether a member named `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Member keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.map.keys().map(String::as_str)
    }

    /// Iterate over members as `(key, element)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&'a str, JsonElement<'a>)> + '_ {
        self.map
            .iter()
            .map(|(key, value)| (key.as_str(), JsonElement::new(value, self.path.field(key))))
    }

    /// Get a required member.
    pub fn get(&self, key: &str) -> Result<JsonElement<'a>, Failure> {
        self.get_optional(key)
            .ok_or_else(|| self.path.field(key).failure(FailureKind::MissingField))
    }

    /// Get an optional member; absence is not a failure.
    pub fn get_optional(&self, key: &str) -> Option<JsonElement<'a>> {
        self.map
            .get(key)
            .map(|value| JsonElement::new(value, self.path.field(key)))
    }

    /// Get a required string member.
    pub fn get_string(&self, key: &str) -> Result<&'a str, Failure> {
        self.get(key)?.as_str()
    }

    /// Get a required number member.
    pub fn get_f64(&self, key: &str) -> Result<f64, Failure> {
        self.get(key)?.as_f64()
    }

    /// Get a required integer member.
    pub fn get_i32(&self, key: &str) -> Result<i32, Failure> {
        self.get(key)?.as_i32()
    }

    /// Get a required boolean member.
    pub fn get_bool(&self, key: &str) -> Result<bool, Failure> {
        self.get(key)?.as_bool()
    }

    /// Get a required object member.
    pub fn get_object(&self, key: &str) -> Result<JsonObject<'a>, Failure> {
        self.get(key)?.as_object()
    }

    /// Get a required array member.
    pub fn get_array(&self, key: &str) -> Result<JsonArray<'a>, Failure> {
        self.get(key)?.as_array()
    }

    /// Parse an optional member, substituting `default` when it is absent.
    ///
    /// A member that is present but malformed is still a failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_json::json;
    /// use xpcalc::JsonElement;
    ///
    /// let doc = json!({ "cost": "x" });
    /// let object = JsonElement::root(&doc).as_object().unwrap();
    ///
    /// assert_eq!(object.get_or("required_points", 0, |e| e.as_i32()), Ok(0));
    /// assert!(object.get_or("cost", 1, |e| e.as_i32()).is_err());
    /// ```
    pub fn get_or<T>(
        &self,
        key: &str,
        default: T,
        parse: impl FnOnce(JsonElement<'a>) -> Result<T, Failure>,
    ) -> Result<T, Failure> {
        match self.get_optional(key) {
            Some(element) => parse(element),
            None => Ok(default),
        }
    }

    /// Failures for every member whose key is not in `allowed`.
    pub fn unknown_fields(&self, allowed: &[&str]) -> Vec<Failure> {
        self.map
            .keys()
            .filter(|key| !allowed.contains(&key.as_str()))
            .map(|key| self.path.field(key).failure(FailureKind::UnknownField))
            .collect()
    }
}

/// A borrowed JSON array together with its path.
#[derive(Debug, Clone)]
pub struct JsonArray<'a> {
    items: &'a [Value],
    path: JsonPath,
}

impl<'a> JsonArray<'a> {
    /// Path of this array.
    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over elements with their indexed paths.
    pub fn iter(&self) -> impl Iterator<Item = JsonElement<'a>> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(i, value)| JsonElement::new(value, self.path.index(i)))
    }

    /// Parse every element, reporting the failures of all malformed
    /// elements rather than stopping at the first.
    pub fn parse_each<T>(
        &self,
        mut parse: impl FnMut(JsonElement<'a>) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        let mut values = Vec::with_capacity(self.items.len());
        let mut failures: Option<ManyFailures> = None;
        for element in self.iter() {
            match parse(element) {
                Ok(value) => values.push(value),
                Err(err) => match failures.as_mut() {
                    Some(all) => all.extend(err),
                    None => failures = Some(err),
                },
            }
        }
        match failures {
            Some(failures) => Err(failures),
            None => Ok(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_display() {
        assert_eq!(JsonPath::root().field("cost").to_string(), "cost");
        assert_eq!(
            JsonPath::root().field("a").index(0).index(2).field("b").to_string(),
            "a[0][2].b"
        );
        assert_eq!(JsonPath::root().index(3).to_string(), "[3]");
    }

    #[test]
    fn test_missing_field_is_attributed() {
        let doc = json!({});
        let object = JsonElement::root(&doc).as_object().unwrap();
        let failure = object.get_string("title").unwrap_err();
        assert_eq!(failure.path().to_string(), "title");
        assert_eq!(failure.kind(), &FailureKind::MissingField);
    }

    #[test]
    fn test_wrong_type_reports_found_type() {
        let doc = json!({ "cost": "x" });
        let object = JsonElement::root(&doc).as_object().unwrap();
        let failure = object.get_i32("cost").unwrap_err();
        assert_eq!(
            failure.kind(),
            &FailureKind::WrongType {
                expected: "integer",
                found: "string"
            }
        );
    }

    #[test]
    fn test_root_wrong_type_has_root_path() {
        let doc = json!([1, 2]);
        let failure = JsonElement::root(&doc).as_object().unwrap_err();
        assert!(failure.path().is_root());
    }

    #[test]
    fn test_i32_range_and_fractions() {
        let doc = json!({ "big": 10_000_000_000i64, "frac": 1.5 });
        let object = JsonElement::root(&doc).as_object().unwrap();
        assert!(matches!(
            object.get_i32("big").unwrap_err().kind(),
            FailureKind::InvalidValue(_)
        ));
        assert!(matches!(
            object.get_i32("frac").unwrap_err().kind(),
            FailureKind::WrongType { .. }
        ));
    }

    #[test]
    fn test_integer_beyond_i64_is_out_of_range() {
        let doc: Value = serde_json::from_str(r#"{ "huge": 9223372036854775808 }"#).unwrap();
        let object = JsonElement::root(&doc).as_object().unwrap();
        let failure = object.get_i32("huge").unwrap_err();
        assert_eq!(
            failure.kind(),
            &FailureKind::InvalidValue("integer 9223372036854775808 is out of range".into())
        );
    }

    #[test]
    fn test_get_or_distinguishes_absent_from_malformed() {
        let doc = json!({ "frame": 3 });
        let object = JsonElement::root(&doc).as_object().unwrap();
        assert_eq!(object.get_or("cost", 1, |e| e.as_i32()), Ok(1));
        assert!(object.get_or("frame", "task", |e| e.as_str()).is_err());
    }

    #[test]
    fn test_unknown_fields() {
        let doc = json!({ "type": "add", "dta": {}, "extra": 1 });
        let object = JsonElement::root(&doc).as_object().unwrap();
        let unknown = object.unknown_fields(&["type", "data"]);
        let paths: Vec<String> = unknown.iter().map(|f| f.path().to_string()).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&"dta".to_string()));
        assert!(paths.contains(&"extra".to_string()));
    }

    #[test]
    fn test_parse_each_collects_all_element_failures() {
        let doc = json!([1, "a", 2, true]);
        let array = JsonElement::root(&doc).as_array().unwrap();
        let result = array.parse_each(|e| e.as_i32().map_err(ManyFailures::from));
        let failures = result.unwrap_err();
        let paths: Vec<String> = failures.iter().map(|f| f.path().to_string()).collect();
        assert_eq!(paths, vec!["[1]", "[3]"]);
    }

    #[test]
    fn test_parse_document_syntax_error() {
        let failure = parse_document("{").unwrap_err();
        assert!(matches!(failure.kind(), FailureKind::Syntax(_)));
        assert!(failure.path().is_root());
    }
}
