//! Boolean-producing nodes.

use crate::accumulate::Accumulator;
use crate::config::ConfigContext;
use crate::error::ParseResult;
use crate::json::JsonElement;
use crate::node::{Node, NodeCategory, NodeData};
use crate::prototype::{ParseContext, PrototypeBuilder};
use std::fmt;
use std::sync::Arc;

/// A test over a context of type `T`.
///
/// Implemented for every `Fn(&T) -> bool` closure, and for the condition
/// structs that configuration kinds parse into.
///
/// # Examples
///
/// ```rust
/// use xpcalc::Predicate;
///
/// struct MinLevel(u32);
///
/// impl Predicate<u32> for MinLevel {
///     fn test(&self, level: &u32) -> bool {
///         *level >= self.0
///     }
/// }
///
/// assert!(MinLevel(5).test(&7));
/// assert!((|level: &u32| *level == 3).test(&3));
/// ```
pub trait Predicate<T>: Send + Sync {
    /// Whether `value` satisfies the predicate.
    fn test(&self, value: &T) -> bool;
}

impl<T, F> Predicate<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn test(&self, value: &T) -> bool {
        self(value)
    }
}

/// A shared, immutable predicate over `T`.
pub struct Condition<T> {
    predicate: Arc<dyn Predicate<T>>,
}

impl<T> Clone for Condition<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> fmt::Debug for Condition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition { .. }")
    }
}

impl<T> Predicate<T> for Condition<T> {
    fn test(&self, value: &T) -> bool {
        self.predicate.test(value)
    }
}

impl<T: 'static> Condition<T> {
    /// Wrap a predicate.
    pub fn new(predicate: impl Predicate<T> + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// A condition that ignores its context.
    pub fn constant(value: bool) -> Self {
        Self::new(move |_: &T| value)
    }

    /// Test `context`.
    pub fn test(&self, context: &T) -> bool {
        self.predicate.test(context)
    }

    /// Test a value computed from a wider context `R`.
    pub fn map<R: 'static>(self, transform: impl Fn(&R) -> T + Send + Sync + 'static) -> Condition<R> {
        Condition::new(move |context: &R| self.test(&transform(context)))
    }

    /// Test a part of a wider context `R`, borrowed in place.
    pub fn focus<R: 'static>(self, accessor: impl Fn(&R) -> &T + Send + Sync + 'static) -> Condition<R> {
        Condition::new(move |context: &R| self.test(accessor(context)))
    }

    /// Logical negation.
    pub fn not(self) -> Self {
        Self::new(move |context: &T| !self.test(context))
    }

    /// True when every condition holds; true for an empty list.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xpcalc::Condition;
    ///
    /// let positive = Condition::new(|v: &i32| *v > 0);
    /// let even = Condition::new(|v: &i32| v % 2 == 0);
    /// let both = Condition::all(vec![positive, even]);
    /// assert!(both.test(&4));
    /// assert!(!both.test(&3));
    /// assert!(Condition::<i32>::all(Vec::new()).test(&0));
    /// ```
    pub fn all(conditions: Vec<Condition<T>>) -> Self {
        Self::new(move |context: &T| conditions.iter().all(|c| c.test(context)))
    }

    /// True when at least one condition holds; false for an empty list.
    pub fn any(conditions: Vec<Condition<T>>) -> Self {
        Self::new(move |context: &T| conditions.iter().any(|c| c.test(context)))
    }

    /// Parse a condition node: an object with a `type` registered as a
    /// condition kind on the context's prototype.
    pub fn parse(element: JsonElement<'_>, context: &ParseContext<'_, T>) -> ParseResult<Self> {
        let node = Node::parse(element, context.config())?;
        let prototype = context.prototype();
        let factory = prototype
            .condition(node.kind())
            .ok_or_else(|| node.unknown_kind(NodeCategory::Condition, prototype.name()))?;
        factory.create(node.into_data(), context)
    }
}

type CreateCondition<T> =
    dyn Fn(NodeData<'_>, &ParseContext<'_, T>) -> ParseResult<Condition<T>> + Send + Sync;

/// Builds a [`Condition`] from a node's data.
pub struct ConditionFactory<T> {
    create: Arc<CreateCondition<T>>,
}

impl<T> Clone for ConditionFactory<T> {
    fn clone(&self) -> Self {
        Self {
            create: Arc::clone(&self.create),
        }
    }
}

impl<T: 'static> ConditionFactory<T> {
    /// A factory that may parse nested nodes through the parse context.
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(NodeData<'_>, &ParseContext<'_, T>) -> ParseResult<Condition<T>> + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(create),
        }
    }

    /// A factory for a leaf kind whose data parses into a predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_json::json;
    /// use xpcalc::{Condition, ConditionFactory, ConfigContext, JsonElement, Prototype};
    ///
    /// struct AtLeast(f64);
    ///
    /// impl xpcalc::Predicate<f64> for AtLeast {
    ///     fn test(&self, value: &f64) -> bool {
    ///         *value >= self.0
    ///     }
    /// }
    ///
    /// let mut builder = Prototype::<f64>::create("number");
    /// builder
    ///     .register_condition(
    ///         "at_least",
    ///         ConditionFactory::with_data(|data, _config| {
    ///             Ok(AtLeast(data.required()?.as_f64()?))
    ///         }),
    ///     )
    ///     .unwrap();
    /// let prototype = builder.build();
    ///
    /// let doc = json!({ "type": "at_least", "data": 10 });
    /// let config = ConfigContext::default();
    /// let condition = Condition::parse(JsonElement::root(&doc), &prototype.context(&config)).unwrap();
    /// assert!(condition.test(&12.0));
    /// ```
    pub fn with_data<P, F>(parse: F) -> Self
    where
        P: Predicate<T> + 'static,
        F: Fn(NodeData<'_>, &ConfigContext) -> ParseResult<P> + Send + Sync + 'static,
    {
        Self::new(move |data, context| parse(data, context.config()).map(Condition::new))
    }

    /// A factory for a kind that takes no data.
    pub fn simple(predicate: impl Predicate<T> + 'static) -> Self {
        let condition = Condition::new(predicate);
        Self::new(move |_, _| Ok(condition.clone()))
    }

    /// Build a condition from `data`.
    pub fn create(&self, data: NodeData<'_>, context: &ParseContext<'_, T>) -> ParseResult<Condition<T>> {
        (self.create)(data, context)
    }
}

/// `{"type": "all" | "any", "data": [<condition>...]}`
fn combinator<T: 'static>(
    combine: fn(Vec<Condition<T>>) -> Condition<T>,
) -> ConditionFactory<T> {
    ConditionFactory::new(move |data, context| {
        let conditions = data
            .required()?
            .as_array()?
            .parse_each(|element| Condition::parse(element, context))?;
        Ok(combine(conditions))
    })
}

/// `{"type": "not", "data": <condition>}`
fn negation<T: 'static>() -> ConditionFactory<T> {
    ConditionFactory::new(|data, context| Ok(Condition::parse(data.required()?, context)?.not()))
}

/// `{"type": "constant", "data": {"value": <bool>}}`
fn constant<T: 'static>(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Condition<T>> {
    let object = data.required()?.as_object()?;
    let mut failures = Accumulator::new(object.path());
    if config.deny_unknown_fields {
        failures.record_all(object.unknown_fields(&["value"]));
    }
    let value = failures.take(object.get_bool("value"));
    failures.finish(value.map(Condition::constant))
}

pub(crate) fn register_builtins<T: 'static>(builder: &mut PrototypeBuilder<T>) {
    builder.insert_condition("all", combinator(Condition::all));
    builder.insert_condition("any", combinator(Condition::any));
    builder.insert_condition("not", negation());
    builder.insert_condition("constant", ConditionFactory::with_data(constant));
}
