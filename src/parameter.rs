//! Number-producing nodes.
//!
//! A `Parameter<T>` is a pure function from a context `T` to a number.
//! Parameters are built once when a configuration is parsed and may then be
//! evaluated any number of times, from any thread.

use crate::accumulate::Accumulator;
use crate::config::ConfigContext;
use crate::error::ParseResult;
use crate::json::JsonElement;
use crate::node::{Node, NodeCategory, NodeData};
use crate::prototype::{ParseContext, PrototypeBuilder};
use std::fmt;
use std::sync::Arc;

type ParameterFn<T> = dyn Fn(&T) -> f64 + Send + Sync;

/// A number derived from a context of type `T`.
///
/// # Examples
///
/// ```rust
/// use xpcalc::Parameter;
///
/// struct Player {
///     level: u32,
/// }
///
/// let level = Parameter::new(|player: &Player| player.level as f64);
/// assert_eq!(level.evaluate(&Player { level: 7 }), 7.0);
/// ```
pub struct Parameter<T> {
    function: Arc<ParameterFn<T>>,
}

impl<T> Clone for Parameter<T> {
    fn clone(&self) -> Self {
        Self {
            function: Arc::clone(&self.function),
        }
    }
}

impl<T> fmt::Debug for Parameter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Parameter { .. }")
    }
}

impl<T: 'static> Parameter<T> {
    /// Wrap a function.
    pub fn new(function: impl Fn(&T) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            function: Arc::new(function),
        }
    }

    /// A parameter that ignores its context.
    pub fn constant(value: f64) -> Self {
        Self::new(move |_| value)
    }

    /// Evaluate against `context`.
    pub fn evaluate(&self, context: &T) -> f64 {
        (self.function)(context)
    }

    /// Evaluate against a value computed from a wider context `R`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xpcalc::Parameter;
    ///
    /// let double = Parameter::new(|v: &f64| v * 2.0);
    /// let of_len = double.map(|s: &String| s.len() as f64);
    /// assert_eq!(of_len.evaluate(&"abc".to_string()), 6.0);
    /// ```
    pub fn map<R: 'static>(self, transform: impl Fn(&R) -> T + Send + Sync + 'static) -> Parameter<R> {
        Parameter::new(move |context: &R| self.evaluate(&transform(context)))
    }

    /// Evaluate against a part of a wider context `R`, borrowed in place.
    pub fn focus<R: 'static>(self, accessor: impl Fn(&R) -> &T + Send + Sync + 'static) -> Parameter<R> {
        Parameter::new(move |context: &R| self.evaluate(accessor(context)))
    }

    /// Parse a parameter node: an object with a `type` registered as a
    /// parameter kind on the context's prototype.
    pub fn parse(element: JsonElement<'_>, context: &ParseContext<'_, T>) -> ParseResult<Self> {
        let node = Node::parse(element, context.config())?;
        let prototype = context.prototype();
        let factory = prototype
            .parameter(node.kind())
            .ok_or_else(|| node.unknown_kind(NodeCategory::Parameter, prototype.name()))?;
        factory.create(node.into_data(), context)
    }

    /// Parse either a bare number, taken as a constant, or a parameter node.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_json::json;
    /// use xpcalc::{ConfigContext, JsonElement, Parameter, Prototype};
    ///
    /// let prototype = Prototype::<()>::create("unit").build();
    /// let config = ConfigContext::default();
    /// let context = prototype.context(&config);
    ///
    /// let bare = json!(3.0);
    /// let node = json!({ "type": "constant", "data": { "value": 3.0 } });
    /// let a = Parameter::parse_value(JsonElement::root(&bare), &context).unwrap();
    /// let b = Parameter::parse_value(JsonElement::root(&node), &context).unwrap();
    /// assert_eq!(a.evaluate(&()), b.evaluate(&()));
    /// ```
    pub fn parse_value(element: JsonElement<'_>, context: &ParseContext<'_, T>) -> ParseResult<Self> {
        if element.is_number() {
            return Ok(Self::constant(element.as_f64()?));
        }
        Self::parse(element, context)
    }
}

type CreateParameter<T> =
    dyn Fn(NodeData<'_>, &ParseContext<'_, T>) -> ParseResult<Parameter<T>> + Send + Sync;

/// Builds a [`Parameter`] from a node's data.
pub struct ParameterFactory<T> {
    create: Arc<CreateParameter<T>>,
}

impl<T> Clone for ParameterFactory<T> {
    fn clone(&self) -> Self {
        Self {
            create: Arc::clone(&self.create),
        }
    }
}

impl<T: 'static> ParameterFactory<T> {
    /// A factory that may parse nested nodes through the parse context.
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(NodeData<'_>, &ParseContext<'_, T>) -> ParseResult<Parameter<T>> + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(create),
        }
    }

    /// A factory for a leaf kind that only reads its own data.
    pub fn with_data<F>(parse: F) -> Self
    where
        F: Fn(NodeData<'_>, &ConfigContext) -> ParseResult<Parameter<T>> + Send + Sync + 'static,
    {
        Self::new(move |data, context| parse(data, context.config()))
    }

    /// A factory for a kind that takes no data.
    pub fn simple(function: impl Fn(&T) -> f64 + Send + Sync + 'static) -> Self {
        let parameter = Parameter::new(function);
        Self::new(move |_, _| Ok(parameter.clone()))
    }

    /// Build a parameter from `data`.
    pub fn create(&self, data: NodeData<'_>, context: &ParseContext<'_, T>) -> ParseResult<Parameter<T>> {
        (self.create)(data, context)
    }
}

/// `{"type": "constant", "data": {"value": <number>}}`
fn constant<T: 'static>(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Parameter<T>> {
    let object = data.required()?.as_object()?;
    let mut failures = Accumulator::new(object.path());
    if config.deny_unknown_fields {
        failures.record_all(object.unknown_fields(&["value"]));
    }
    let value = failures.take(object.get_f64("value"));
    failures.finish(value.map(Parameter::constant))
}

/// Linear rescaling of a number: `value * multiplier + offset`.
///
/// `data` is optional; without it the number passes through unchanged.
/// Both members default when absent: `multiplier` to 1, `offset` to 0.
pub fn scaled(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Parameter<f64>> {
    let Some(element) = data.optional() else {
        return Ok(Parameter::new(|value: &f64| *value));
    };
    let object = element.as_object()?;
    let mut failures = Accumulator::new(object.path());
    if config.deny_unknown_fields {
        failures.record_all(object.unknown_fields(&["multiplier", "offset"]));
    }
    let multiplier = failures.take(object.get_or("multiplier", 1.0, |e| e.as_f64()));
    let offset = failures.take(object.get_or("offset", 0.0, |e| e.as_f64()));
    failures.finish(
        multiplier
            .zip(offset)
            .map(|(multiplier, offset)| Parameter::new(move |value: &f64| value * multiplier + offset)),
    )
}

pub(crate) fn register_builtins<T: 'static>(builder: &mut PrototypeBuilder<T>) {
    builder.insert_parameter("constant", ParameterFactory::with_data(constant));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::prototype::Prototype;
    use serde_json::json;

    #[derive(Clone)]
    struct Inner {
        value: f64,
    }

    struct Middle {
        inner: Inner,
    }

    struct Outer {
        middle: Middle,
    }

    #[test]
    fn test_map_composition_is_associative() {
        let base = Parameter::new(|inner: &Inner| inner.value * 3.0);
        let f = |m: &Middle| m.inner.clone();
        let g = |o: &Outer| Middle {
            inner: o.middle.inner.clone(),
        };

        let stepwise = base.clone().map(f).map(g);
        let composed = base.map(move |o: &Outer| f(&g(o)));

        let context = Outer {
            middle: Middle {
                inner: Inner { value: 2.5 },
            },
        };
        assert_eq!(stepwise.evaluate(&context), composed.evaluate(&context));
        assert_eq!(stepwise.evaluate(&context), 7.5);
    }

    #[test]
    fn test_focus_matches_map() {
        let base = Parameter::new(|inner: &Inner| inner.value + 1.0);
        let focused = base.clone().focus(|m: &Middle| &m.inner);
        let mapped = base.map(|m: &Middle| m.inner.clone());
        let context = Middle {
            inner: Inner { value: 4.0 },
        };
        assert_eq!(focused.evaluate(&context), mapped.evaluate(&context));
    }

    #[test]
    fn test_constant_node() {
        let prototype = Prototype::<()>::create("unit").build();
        let config = ConfigContext::default();
        let doc = json!({ "type": "constant", "data": { "value": -2.0 } });
        let parameter = Parameter::parse(JsonElement::root(&doc), &prototype.context(&config)).unwrap();
        assert_eq!(parameter.evaluate(&()), -2.0);
    }

    #[test]
    fn test_unknown_parameter_kind() {
        let prototype = Prototype::<()>::create("unit").build();
        let config = ConfigContext::default();
        let doc = json!({ "type": "level" });
        let err = Parameter::parse(JsonElement::root(&doc), &prototype.context(&config)).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.first().path().to_string(), "type");
        assert!(matches!(
            err.first().kind(),
            FailureKind::UnknownKind { category: NodeCategory::Parameter, .. }
        ));
    }

    #[test]
    fn test_scaled_defaults() {
        let identity = scaled(NodeData::absent(crate::json::JsonPath::root()), &ConfigContext::default()).unwrap();
        assert_eq!(identity.evaluate(&4.0), 4.0);

        let doc = json!({ "multiplier": 0.5 });
        let half = scaled(NodeData::present(JsonElement::root(&doc)), &ConfigContext::default()).unwrap();
        assert_eq!(half.evaluate(&4.0), 2.0);
    }

    #[test]
    fn test_scaled_reports_both_members() {
        let doc = json!({ "multiplier": "2", "offset": [] });
        let err = scaled(NodeData::present(JsonElement::root(&doc)), &ConfigContext::default()).unwrap_err();
        let paths: Vec<String> = err.iter().map(|f| f.path().to_string()).collect();
        assert_eq!(paths, vec!["multiplier", "offset"]);
    }
}
