//! Accumulate-all parsing of sibling fields.
//!
//! When an object has several independent fields, each one is parsed on
//! its own and its failure (if any) is recorded here. The object is only
//! built once every field has been attempted, so one pass reports every
//! mistake in the document.

use crate::error::{Failure, FailureKind, ManyFailures, ParseResult};
use crate::json::JsonPath;

/// Collector for the failures of independently parsed fields.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use xpcalc::{Accumulator, JsonElement};
///
/// let doc = json!({ "limit": "ten", "reset": -1.5 });
/// let object = JsonElement::root(&doc).as_object().unwrap();
///
/// let mut failures = Accumulator::new(object.path());
/// let limit = failures.take(object.get_i32("limit"));
/// let reset = failures.take(object.get_i32("reset"));
///
/// let result = failures.finish(limit.zip(reset));
/// assert_eq!(result.unwrap_err().len(), 2);
/// ```
#[derive(Debug)]
pub struct Accumulator {
    path: JsonPath,
    failures: Option<ManyFailures>,
}

impl Accumulator {
    /// Start collecting failures for the object at `path`.
    pub fn new(path: &JsonPath) -> Self {
        Self {
            path: path.clone(),
            failures: None,
        }
    }

    /// Record the failure of `result`, if any, and return its value.
    ///
    /// A `None` return means the field failed and was recorded.
    pub fn take<T, E>(&mut self, result: Result<T, E>) -> Option<T>
    where
        E: Into<ManyFailures>,
    {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.record(err);
                None
            }
        }
    }

    /// Record failures directly.
    pub fn record(&mut self, failures: impl Into<ManyFailures>) {
        let failures = failures.into();
        match self.failures.as_mut() {
            Some(all) => all.extend(failures),
            None => self.failures = Some(failures),
        }
    }

    /// Record each failure in `failures`.
    pub fn record_all(&mut self, failures: impl IntoIterator<Item = Failure>) {
        for failure in failures {
            self.record(failure);
        }
    }

    /// Whether no failure has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.failures.is_none()
    }

    /// Decide the aggregate result.
    ///
    /// Any recorded failure wins. Otherwise `value` is returned; it can only
    /// be `None` if a required field was dropped without recording why, which
    /// is reported as an incomplete object at the accumulator's path.
    pub fn finish<T>(self, value: Option<T>) -> ParseResult<T> {
        match (self.failures, value) {
            (Some(failures), _) => Err(failures),
            (None, Some(value)) => Ok(value),
            (None, None) => Err(self.path.failure(FailureKind::Incomplete).into()),
        }
    }
}
