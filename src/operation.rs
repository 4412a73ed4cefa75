//! Operations module.
//!
//! An operation combines a number into the running total of a calculation.
//! Operations are applied in declaration order, mirroring the way stat
//! transforms are applied in registration order.

use crate::accumulate::Accumulator;
use crate::error::ParseResult;
use crate::node::NodeData;
use crate::parameter::Parameter;
use crate::prototype::{ParseContext, PrototypeBuilder};
use std::sync::Arc;

/// A step that transforms the running total of a calculation.
///
/// # Examples
///
/// ```rust
/// use xpcalc::Operation;
///
/// struct Halve;
///
/// impl Operation<()> for Halve {
///     fn apply(&self, total: f64, _context: &()) -> f64 {
///         total / 2.0
///     }
///
///     fn description(&self) -> String {
///         "halve".to_string()
///     }
/// }
///
/// assert_eq!(Halve.apply(10.0, &()), 5.0);
/// ```
pub trait Operation<C>: Send + Sync {
    /// Combine `total` with this operation's value for `context`.
    fn apply(&self, total: f64, context: &C) -> f64;

    /// Human-readable description for breakdowns.
    fn description(&self) -> String;
}

/// How an operation's value meets the running total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combine {
    /// `total + value`
    Add,
    /// `value`, discarding the total.
    Set,
    /// `total * value`
    Multiply,
    /// The smaller of the two; caps the total.
    Min,
    /// The larger of the two; floors the total.
    Max,
}

impl Combine {
    /// Every rule, in registration order.
    pub const ALL: [Combine; 5] = [
        Combine::Add,
        Combine::Set,
        Combine::Multiply,
        Combine::Min,
        Combine::Max,
    ];

    /// Apply the rule.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xpcalc::Combine;
    ///
    /// assert_eq!(Combine::Add.combine(3.0, 4.5), 7.5);
    /// assert_eq!(Combine::Set.combine(3.0, 4.5), 4.5);
    /// assert_eq!(Combine::Min.combine(3.0, 4.5), 3.0);
    /// ```
    pub fn combine(self, total: f64, value: f64) -> f64 {
        match self {
            Combine::Add => total + value,
            Combine::Set => value,
            Combine::Multiply => total * value,
            Combine::Min => total.min(value),
            Combine::Max => total.max(value),
        }
    }

    /// The kind name the rule is registered under.
    pub fn name(self) -> &'static str {
        match self {
            Combine::Add => "add",
            Combine::Set => "set",
            Combine::Multiply => "multiply",
            Combine::Min => "min",
            Combine::Max => "max",
        }
    }
}

/// An operation that combines a parameter's value into the total.
pub struct CombineOperation<C> {
    rule: Combine,
    value: Parameter<C>,
}

impl<C: 'static> CombineOperation<C> {
    /// Create an operation applying `rule` with `value`.
    pub fn new(rule: Combine, value: Parameter<C>) -> Self {
        Self { rule, value }
    }

    /// The combine rule.
    pub fn rule(&self) -> Combine {
        self.rule
    }
}

impl<C: 'static> Operation<C> for CombineOperation<C> {
    fn apply(&self, total: f64, context: &C) -> f64 {
        self.rule.combine(total, self.value.evaluate(context))
    }

    fn description(&self) -> String {
        self.rule.name().to_string()
    }
}

type CreateOperation<C> =
    dyn Fn(NodeData<'_>, &ParseContext<'_, C>) -> ParseResult<Arc<dyn Operation<C>>> + Send + Sync;

/// Builds an [`Operation`] from a node's data.
pub struct OperationFactory<C> {
    create: Arc<CreateOperation<C>>,
}

impl<C> Clone for OperationFactory<C> {
    fn clone(&self) -> Self {
        Self {
            create: Arc::clone(&self.create),
        }
    }
}

impl<C: 'static> OperationFactory<C> {
    /// A factory for a custom operation type.
    pub fn new<O, F>(create: F) -> Self
    where
        O: Operation<C> + 'static,
        F: Fn(NodeData<'_>, &ParseContext<'_, C>) -> ParseResult<O> + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(move |data: NodeData<'_>, context: &ParseContext<'_, C>| {
                create(data, context).map(|operation| Arc::new(operation) as Arc<dyn Operation<C>>)
            }),
        }
    }

    /// A factory for `{"value": <number | parameter>}` data combined by `rule`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_json::json;
    /// use xpcalc::{Combine, ConfigContext, JsonElement, NodeData, OperationFactory, Prototype};
    ///
    /// let prototype = Prototype::<()>::empty("unit").build();
    /// let config = ConfigContext::default();
    /// let data = json!({ "value": 2.0 });
    ///
    /// let double = OperationFactory::combining(Combine::Multiply)
    ///     .create(NodeData::present(JsonElement::root(&data)), &prototype.context(&config))
    ///     .unwrap();
    /// assert_eq!(double.apply(5.0, &()), 10.0);
    /// ```
    pub fn combining(rule: Combine) -> Self {
        Self::new(move |data, context| {
            let object = data.required()?.as_object()?;
            let mut failures = Accumulator::new(object.path());
            if context.config().deny_unknown_fields {
                failures.record_all(object.unknown_fields(&["value"]));
            }
            let value = failures.take(
                object
                    .get("value")
                    .map_err(Into::into)
                    .and_then(|element| Parameter::parse_value(element, context)),
            );
            failures.finish(value.map(|value| CombineOperation::new(rule, value)))
        })
    }

    /// Build an operation from `data`.
    pub fn create(
        &self,
        data: NodeData<'_>,
        context: &ParseContext<'_, C>,
    ) -> ParseResult<Arc<dyn Operation<C>>> {
        (self.create)(data, context)
    }
}

pub(crate) fn register_builtins<C: 'static>(builder: &mut PrototypeBuilder<C>) {
    for rule in Combine::ALL {
        builder.insert_operation(rule.name(), OperationFactory::combining(rule));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigContext;
    use crate::error::FailureKind;
    use crate::json::JsonElement;
    use crate::parameter::ParameterFactory;
    use crate::prototype::Prototype;
    use serde_json::json;

    struct Kill {
        dropped: f64,
    }

    fn create(kind: &str, data: serde_json::Value) -> ParseResult<Arc<dyn Operation<Kill>>> {
        let mut builder = Prototype::<Kill>::create("kill");
        builder
            .register_parameter("dropped", ParameterFactory::simple(|k: &Kill| k.dropped))
            .unwrap();
        let prototype = builder.build();
        let config = ConfigContext::strict();
        let factory = prototype.operation(kind).unwrap();
        factory.create(
            NodeData::present(JsonElement::root(&data)),
            &prototype.context(&config),
        )
    }

    #[test]
    fn test_every_rule_is_registered() {
        let prototype = Prototype::<Kill>::create("kill").build();
        for rule in Combine::ALL {
            assert!(prototype.operation(rule.name()).is_some());
        }
    }

    #[test]
    fn test_combine_with_parameter_node() {
        let op = create("max", json!({ "value": { "type": "dropped" } })).unwrap();
        assert_eq!(op.apply(3.0, &Kill { dropped: 10.0 }), 10.0);
        assert_eq!(op.apply(30.0, &Kill { dropped: 10.0 }), 30.0);
        assert_eq!(op.description(), "max");
    }

    #[test]
    fn test_missing_value() {
        let err = create("add", json!({})).err().unwrap();
        assert_eq!(err.len(), 1);
        assert_eq!(err.first().path().to_string(), "value");
        assert_eq!(err.first().kind(), &FailureKind::MissingField);
    }

    #[test]
    fn test_value_and_unknown_member_both_reported() {
        let err = create("add", json!({ "value": "ten", "scale": 2 })).err().unwrap();
        assert_eq!(err.len(), 2);
    }
}
