//! Calculation trees.
//!
//! A `Calculation<C>` is the ordered list of `(condition, operation)` steps
//! parsed from a configuration's `operations` array. Evaluation walks the
//! steps in declaration order over a running total that starts at 0:
//!
//! ```text
//! total = 0
//! for step in steps:
//!     if step.condition holds (or is absent):
//!         total = step.operation.apply(total, context)
//! ```
//!
//! A parsed calculation cannot fail to evaluate; every kind it refers to was
//! resolved against the prototype while parsing.

use crate::accumulate::Accumulator;
use crate::breakdown::Breakdown;
use crate::condition::Condition;
use crate::config::ConfigContext;
use crate::error::ParseResult;
use crate::identifier::Identifier;
use crate::json::{JsonElement, JsonObject};
use crate::node::{Node, NodeCategory};
use crate::operation::Operation;
use crate::prototype::{ParseContext, Prototype};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// One step of a calculation: an operation, optionally gated by a condition.
pub struct Step<C> {
    condition: Option<Condition<C>>,
    operation: Arc<dyn Operation<C>>,
}

impl<C> Clone for Step<C> {
    fn clone(&self) -> Self {
        Self {
            condition: self.condition.clone(),
            operation: Arc::clone(&self.operation),
        }
    }
}

impl<C> fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("conditional", &self.condition.is_some())
            .field("operation", &self.operation.description())
            .finish()
    }
}

impl<C: 'static> Step<C> {
    /// An unconditional step.
    pub fn new(operation: impl Operation<C> + 'static) -> Self {
        Self {
            condition: None,
            operation: Arc::new(operation),
        }
    }

    /// A step that only applies when `condition` holds.
    pub fn when(condition: Condition<C>, operation: impl Operation<C> + 'static) -> Self {
        Self {
            condition: Some(condition),
            operation: Arc::new(operation),
        }
    }

    /// Whether the step applies to `context`.
    pub fn applies(&self, context: &C) -> bool {
        self.condition.as_ref().map_or(true, |condition| condition.test(context))
    }

    /// The step's operation.
    pub fn operation(&self) -> &dyn Operation<C> {
        self.operation.as_ref()
    }

    /// Parse one entry of an `operations` array.
    ///
    /// The `type` and `condition` members are read independently and both
    /// reported, the operation first; `data` is only interpreted once `type`
    /// names a known kind.
    pub fn parse(element: JsonElement<'_>, context: &ParseContext<'_, C>) -> ParseResult<Self> {
        let object = element.as_object()?;
        let mut failures = Accumulator::new(object.path());

        let node = Node::read(&object, &["condition"], context.config(), &mut failures);
        let operation = node.and_then(|node| {
            let prototype = context.prototype();
            match prototype.operation(node.kind()) {
                Some(factory) => failures.take(factory.create(node.into_data(), context)),
                None => {
                    failures.record(node.unknown_kind(NodeCategory::Operation, prototype.name()));
                    None
                }
            }
        });

        let condition = object
            .get_optional("condition")
            .and_then(|element| failures.take(Condition::parse(element, context)));
        let condition_failed = object.contains("condition") && condition.is_none();

        let step = if condition_failed {
            None
        } else {
            operation.map(|operation| Self { condition, operation })
        };
        failures.finish(step)
    }
}

/// An ordered, immutable list of steps over context shape `C`.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use xpcalc::{Calculation, ConfigContext, JsonElement, ParameterFactory, Prototype};
///
/// struct Kill {
///     dropped: f64,
/// }
///
/// let mut builder = Prototype::<Kill>::create("kill");
/// builder
///     .register_parameter("dropped", ParameterFactory::simple(|k: &Kill| k.dropped))
///     .unwrap();
/// let prototype = builder.build();
///
/// let doc = json!({
///     "operations": [
///         { "type": "add", "data": { "value": { "type": "dropped" } } },
///         { "type": "multiply", "data": { "value": 1.5 } }
///     ]
/// });
/// let root = JsonElement::root(&doc).as_object().unwrap();
/// let calculation = Calculation::parse(&root, &prototype, &ConfigContext::default()).unwrap();
///
/// assert_eq!(calculation.evaluate(&Kill { dropped: 5.0 }), 7.5);
/// assert_eq!(calculation.evaluate_rounded(&Kill { dropped: 5.0 }), 8);
/// ```
pub struct Calculation<C> {
    prototype: Identifier,
    steps: Vec<Step<C>>,
}

impl<C> Clone for Calculation<C> {
    fn clone(&self) -> Self {
        Self {
            prototype: self.prototype.clone(),
            steps: self.steps.clone(),
        }
    }
}

impl<C> fmt::Debug for Calculation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculation")
            .field("prototype", &self.prototype)
            .field("steps", &self.steps)
            .finish()
    }
}

impl<C: 'static> Calculation<C> {
    /// Assemble a calculation from already-built steps.
    pub fn from_steps(prototype: &Prototype<C>, steps: Vec<Step<C>>) -> Self {
        debug!(prototype = %prototype.name(), steps = steps.len(), "calculation assembled");
        Self {
            prototype: prototype.name().clone(),
            steps,
        }
    }

    /// Parse the `operations` array of `root` against `prototype`.
    ///
    /// Every malformed step is reported. Other members of `root` are left to
    /// the caller, which usually owns further settings next to the formula.
    pub fn parse(
        root: &JsonObject<'_>,
        prototype: &Prototype<C>,
        config: &ConfigContext,
    ) -> ParseResult<Self> {
        let context = prototype.context(config);
        let steps = root
            .get_array("operations")?
            .parse_each(|element| Step::parse(element, &context))?;
        Ok(Self::from_steps(prototype, steps))
    }

    /// Name of the prototype the calculation was parsed against.
    pub fn prototype(&self) -> &Identifier {
        &self.prototype
    }

    /// The steps, in evaluation order.
    pub fn steps(&self) -> &[Step<C>] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether there are no steps; such a calculation evaluates to 0.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Evaluate against `context`.
    pub fn evaluate(&self, context: &C) -> f64 {
        self.steps.iter().fold(0.0, |total, step| {
            if step.applies(context) {
                step.operation.apply(total, context)
            } else {
                total
            }
        })
    }

    /// Evaluate and round half away from zero.
    pub fn evaluate_rounded(&self, context: &C) -> i64 {
        self.evaluate(context).round() as i64
    }

    /// Evaluate, recording every step.
    pub fn breakdown(&self, context: &C) -> Breakdown {
        let mut breakdown = Breakdown::new(self.prototype.clone());
        let mut total = 0.0;
        for (index, step) in self.steps.iter().enumerate() {
            let description = step.operation.description();
            if step.applies(context) {
                total = step.operation.apply(total, context);
                trace!(index, operation = %description, total, "step applied");
                breakdown.record_applied(description, total);
            } else {
                trace!(index, operation = %description, "step skipped");
                breakdown.record_skipped(description, total);
            }
        }
        breakdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionFactory;
    use crate::error::FailureKind;
    use crate::operation::{Combine, CombineOperation};
    use crate::parameter::{Parameter, ParameterFactory};
    use serde_json::json;

    struct Kill {
        dropped: f64,
        boss: bool,
    }

    fn prototype() -> Arc<Prototype<Kill>> {
        let mut builder = Prototype::<Kill>::create("kill");
        builder
            .register_parameter("dropped", ParameterFactory::simple(|k: &Kill| k.dropped))
            .unwrap();
        builder
            .register_condition("boss", ConditionFactory::simple(|k: &Kill| k.boss))
            .unwrap();
        builder.build()
    }

    fn parse(doc: &serde_json::Value) -> ParseResult<Calculation<Kill>> {
        let root = JsonElement::root(doc).as_object().unwrap();
        Calculation::parse(&root, &prototype(), &ConfigContext::default())
    }

    #[test]
    fn test_empty_calculation_is_zero() {
        let calculation = parse(&json!({ "operations": [] })).unwrap();
        assert!(calculation.is_empty());
        assert_eq!(calculation.evaluate(&Kill { dropped: 9.0, boss: true }), 0.0);
    }

    #[test]
    fn test_skipped_step_does_not_stop_later_steps() {
        let calculation = parse(&json!({
            "operations": [
                { "type": "set", "condition": { "type": "boss" }, "data": { "value": 100 } },
                { "type": "add", "data": { "value": { "type": "dropped" } } }
            ]
        }))
        .unwrap();

        assert_eq!(calculation.evaluate(&Kill { dropped: 4.0, boss: false }), 4.0);
        assert_eq!(calculation.evaluate(&Kill { dropped: 4.0, boss: true }), 104.0);
    }

    #[test]
    fn test_order_is_declaration_order() {
        let add_then_set = parse(&json!({
            "operations": [
                { "type": "add", "data": { "value": 5 } },
                { "type": "set", "data": { "value": 2 } }
            ]
        }))
        .unwrap();
        let set_then_add = parse(&json!({
            "operations": [
                { "type": "set", "data": { "value": 2 } },
                { "type": "add", "data": { "value": 5 } }
            ]
        }))
        .unwrap();
        let kill = Kill { dropped: 0.0, boss: false };
        assert_eq!(add_then_set.evaluate(&kill), 2.0);
        assert_eq!(set_then_add.evaluate(&kill), 7.0);
    }

    #[test]
    fn test_step_reports_type_before_condition() {
        let err = parse(&json!({
            "operations": [
                { "type": "divide", "condition": { "type": "elite" }, "data": { "value": 2 } }
            ]
        }))
        .unwrap_err();
        let paths: Vec<String> = err.iter().map(|f| f.path().to_string()).collect();
        assert_eq!(paths, vec!["operations[0].type", "operations[0].condition.type"]);
    }

    #[test]
    fn test_missing_operations() {
        let err = parse(&json!({ "experience": [] })).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.first().kind(), &FailureKind::MissingField);
        assert_eq!(err.first().path().to_string(), "operations");
    }

    #[test]
    fn test_breakdown_matches_evaluate() {
        let calculation = parse(&json!({
            "operations": [
                { "type": "add", "data": { "value": 3.0 } },
                { "type": "multiply", "condition": { "type": "boss" }, "data": { "value": 10 } },
                { "type": "add", "data": { "value": 4.5 } }
            ]
        }))
        .unwrap();
        let kill = Kill { dropped: 0.0, boss: false };
        let breakdown = calculation.breakdown(&kill);
        assert_eq!(breakdown.value, calculation.evaluate(&kill));
        assert_eq!(breakdown.steps.len(), 3);
        assert!(!breakdown.steps[1].applied);
        assert_eq!(breakdown.rounded(), 8);
    }

    #[test]
    fn test_from_steps() {
        let prototype = prototype();
        let calculation = Calculation::from_steps(
            &prototype,
            vec![
                Step::new(CombineOperation::new(Combine::Add, Parameter::new(|k: &Kill| k.dropped))),
                Step::when(
                    Condition::new(|k: &Kill| k.boss),
                    CombineOperation::new(Combine::Max, Parameter::constant(50.0)),
                ),
            ],
        );
        assert_eq!(calculation.evaluate(&Kill { dropped: 20.0, boss: true }), 50.0);
        assert_eq!(calculation.evaluate(&Kill { dropped: 20.0, boss: false }), 20.0);
        assert_eq!(calculation.prototype().as_str(), "kill");
    }

    #[test]
    fn test_calculation_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Calculation<Kill>>();
    }
}
