//! Legacy calculation schema.
//!
//! Older configurations describe a calculation as flat tables of named
//! functions plus an ordered `experience` list:
//!
//! ```json
//! {
//!   "parameters": { "hp": { "type": "entity_max_health" } },
//!   "conditions": { "zombie": { "type": "entity", "data": { "entity": "zombie" } } },
//!   "experience": [
//!     { "condition": "zombie", "expression": "hp" },
//!     { "expression": 1 }
//!   ]
//! }
//! ```
//!
//! The value is that of the first entry whose condition holds, or 0. The
//! legacy functions are ordinary parameter and condition kinds registered
//! through [`LegacyRegistry`], and the list compiles into ordinary `set`
//! steps, so evaluation has a single code path for both schemas.

use crate::accumulate::Accumulator;
use crate::calculation::{Calculation, Step};
use crate::condition::{Condition, ConditionFactory, Predicate};
use crate::config::ConfigContext;
use crate::error::{Failure, FailureKind, ParseResult, RegistryError};
use crate::json::{JsonElement, JsonObject};
use crate::node::NodeData;
use crate::operation::{Combine, CombineOperation};
use crate::parameter::{Parameter, ParameterFactory};
use crate::prototype::{Prototype, PrototypeBuilder};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Registers legacy function names on a prototype, reusing the parse
/// functions of the current node kinds.
///
/// # Examples
///
/// ```rust
/// use xpcalc::legacy::LegacyRegistry;
/// use xpcalc::{parameter, Prototype};
///
/// struct Kill {
///     dropped: f64,
/// }
///
/// let mut builder = Prototype::<Kill>::create("kill");
/// LegacyRegistry::new(&mut builder)
///     .register_number_function("entity_dropped_experience", parameter::scaled, |k: &Kill| &k.dropped)
///     .unwrap();
/// assert!(builder.build().parameter("entity_dropped_experience").is_some());
/// ```
pub struct LegacyRegistry<'b, C> {
    builder: &'b mut PrototypeBuilder<C>,
}

impl<'b, C: 'static> LegacyRegistry<'b, C> {
    /// Wrap `builder`.
    pub fn new(builder: &'b mut PrototypeBuilder<C>) -> Self {
        Self { builder }
    }

    /// Register a boolean function: `parse` reads the data into a predicate
    /// over `R`, which is tested against the part of `C` that `accessor`
    /// selects.
    pub fn register_boolean_function<R, P, F, A>(
        &mut self,
        name: &str,
        parse: F,
        accessor: A,
    ) -> Result<&mut Self, RegistryError>
    where
        R: 'static,
        P: Predicate<R> + 'static,
        F: Fn(NodeData<'_>, &ConfigContext) -> ParseResult<P> + Send + Sync + 'static,
        A: Fn(&C) -> &R + Send + Sync + 'static,
    {
        let accessor = Arc::new(accessor);
        let factory = ConditionFactory::new(move |data, context| {
            let accessor = Arc::clone(&accessor);
            Ok(Condition::new(parse(data, context.config())?).focus(move |c: &C| (*accessor)(c)))
        });
        self.builder.register_condition(name, factory)?;
        Ok(self)
    }

    /// Register a number function: `parse` reads the data into a parameter
    /// over `R`, evaluated against the part of `C` that `accessor` selects.
    pub fn register_number_function<R, F, A>(
        &mut self,
        name: &str,
        parse: F,
        accessor: A,
    ) -> Result<&mut Self, RegistryError>
    where
        R: 'static,
        F: Fn(NodeData<'_>, &ConfigContext) -> ParseResult<Parameter<R>> + Send + Sync + 'static,
        A: Fn(&C) -> &R + Send + Sync + 'static,
    {
        let accessor = Arc::new(accessor);
        let factory = ParameterFactory::new(move |data, context| {
            let accessor = Arc::clone(&accessor);
            Ok(parse(data, context.config())?.focus(move |c: &C| (*accessor)(c)))
        });
        self.builder.register_parameter(name, factory)?;
        Ok(self)
    }

    /// Register a number function whose parameter reads a value derived
    /// from the selected context by `transform`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_json::json;
    /// use xpcalc::legacy::LegacyRegistry;
    /// use xpcalc::{parameter, ConfigContext, JsonElement, Parameter, Prototype};
    ///
    /// struct Victim {
    ///     max_health: f32,
    /// }
    /// struct Kill {
    ///     victim: Victim,
    /// }
    ///
    /// let mut builder = Prototype::<Kill>::create("kill");
    /// LegacyRegistry::new(&mut builder)
    ///     .register_number_function_with(
    ///         "entity_max_health",
    ///         |victim: &Victim| victim.max_health as f64,
    ///         parameter::scaled,
    ///         |kill: &Kill| &kill.victim,
    ///     )
    ///     .unwrap();
    /// let prototype = builder.build();
    ///
    /// let doc = json!({ "type": "entity_max_health", "data": { "multiplier": 0.5 } });
    /// let config = ConfigContext::default();
    /// let hp = Parameter::parse(JsonElement::root(&doc), &prototype.context(&config)).unwrap();
    /// assert_eq!(hp.evaluate(&Kill { victim: Victim { max_health: 20.0 } }), 10.0);
    /// ```
    pub fn register_number_function_with<R, S, T, F, A>(
        &mut self,
        name: &str,
        transform: T,
        parse: F,
        accessor: A,
    ) -> Result<&mut Self, RegistryError>
    where
        R: 'static,
        S: 'static,
        T: Fn(&R) -> S + Send + Sync + 'static,
        F: Fn(NodeData<'_>, &ConfigContext) -> ParseResult<Parameter<S>> + Send + Sync + 'static,
        A: Fn(&C) -> &R + Send + Sync + 'static,
    {
        let transform = Arc::new(transform);
        self.register_number_function(
            name,
            move |data, config| {
                let transform = Arc::clone(&transform);
                Ok(parse(data, config)?.map(move |r: &R| (*transform)(r)))
            },
            accessor,
        )
    }
}

/// Parses a calculation written in either schema.
pub struct LegacyCalculation;

impl LegacyCalculation {
    /// Whether `root` is written in the legacy schema.
    pub fn is_legacy(root: &JsonObject<'_>) -> bool {
        root.contains("experience") && !root.contains("operations")
    }

    /// Parse `root` as a calculation, accepting the legacy schema when the
    /// context allows it.
    ///
    /// As with [`Calculation::parse`], members of `root` that belong to
    /// neither schema are left to the caller.
    pub fn parse<C: 'static>(
        root: &JsonObject<'_>,
        prototype: &Prototype<C>,
        config: &ConfigContext,
    ) -> ParseResult<Calculation<C>> {
        if !Self::is_legacy(root) {
            return Calculation::parse(root, prototype, config);
        }
        if !config.legacy_schema {
            return Err(root
                .path()
                .field("experience")
                .failure(FailureKind::InvalidValue(
                    "the legacy calculation schema is disabled; use `operations`".to_string(),
                ))
                .into());
        }
        warn!(
            prototype = %prototype.name(),
            path = %root.path(),
            "calculation uses the deprecated legacy schema"
        );
        Self::parse_legacy(root, prototype, config)
    }

    fn parse_legacy<C: 'static>(
        root: &JsonObject<'_>,
        prototype: &Prototype<C>,
        config: &ConfigContext,
    ) -> ParseResult<Calculation<C>> {
        let context = prototype.context(config);
        let mut failures = Accumulator::new(root.path());

        let parameters = NamedTable::parse(root, "parameters", &mut failures, |element| {
            Parameter::parse(element, &context)
        });
        let conditions = NamedTable::parse(root, "conditions", &mut failures, |element| {
            Condition::parse(element, &context)
        });

        let entries = failures.take(root.get_array("experience").map_err(Into::into).and_then(|array| {
            array.parse_each(|element| Entry::parse(element, &parameters, &conditions, config))
        }));

        // An entry is `None` only when it refers to a definition whose
        // failure is already recorded.
        let entries = entries.and_then(|entries| entries.into_iter().collect::<Option<Vec<_>>>());
        failures.finish(entries.map(|entries| {
            let steps = entries
                .into_iter()
                .rev()
                .map(|entry| {
                    let operation = CombineOperation::new(Combine::Set, entry.expression);
                    match entry.condition {
                        Some(condition) => Step::when(condition, operation),
                        None => Step::new(operation),
                    }
                })
                .collect();
            Calculation::from_steps(prototype, steps)
        }))
    }
}

/// A `name -> node` table. Names whose node failed to parse are remembered
/// so references to them are not reported a second time.
struct NamedTable<T> {
    parsed: HashMap<String, T>,
    failed: HashSet<String>,
}

impl<T: Clone> NamedTable<T> {
    fn parse<'a>(
        root: &JsonObject<'a>,
        key: &str,
        failures: &mut Accumulator,
        mut parse: impl FnMut(JsonElement<'a>) -> ParseResult<T>,
    ) -> Self {
        let mut table = Self {
            parsed: HashMap::new(),
            failed: HashSet::new(),
        };
        let Some(element) = root.get_optional(key) else {
            return table;
        };
        let Some(object) = failures.take(element.as_object()) else {
            return table;
        };
        for (name, element) in object.entries() {
            match failures.take(parse(element)) {
                Some(value) => {
                    table.parsed.insert(name.to_string(), value);
                }
                None => {
                    table.failed.insert(name.to_string());
                }
            }
        }
        debug!(table = key, entries = table.parsed.len(), "legacy table parsed");
        table
    }

    /// Resolve the name in `element`. `Ok(None)` means the name refers to
    /// an entry that already failed.
    fn resolve(&self, element: JsonElement<'_>, what: &str) -> Result<Option<T>, Failure> {
        let name = element.as_str()?;
        if let Some(value) = self.parsed.get(name) {
            return Ok(Some(value.clone()));
        }
        if self.failed.contains(name) {
            return Ok(None);
        }
        Err(element
            .path()
            .failure(FailureKind::InvalidValue(format!("{} `{}` is not defined", what, name))))
    }
}

struct Entry<C> {
    condition: Option<Condition<C>>,
    expression: Parameter<C>,
}

impl<C: 'static> Entry<C> {
    fn parse(
        element: JsonElement<'_>,
        parameters: &NamedTable<Parameter<C>>,
        conditions: &NamedTable<Condition<C>>,
        config: &ConfigContext,
    ) -> ParseResult<Option<Self>> {
        let object = element.as_object()?;
        let mut failures = Accumulator::new(object.path());
        if config.deny_unknown_fields {
            failures.record_all(object.unknown_fields(&["condition", "expression"]));
        }

        // `None` when the reference failed; `Some(None)` when it names a
        // definition whose own failure was already recorded.
        let condition = match object.get_optional("condition") {
            Some(element) => failures
                .take(conditions.resolve(element, "condition"))
                .map(|resolved| resolved.map(Some)),
            None => Some(Some(None)),
        };

        let expression = match object.get("expression") {
            Ok(element) if element.is_number() => {
                failures.take(element.as_f64()).map(|value| Some(Parameter::constant(value)))
            }
            Ok(element) => failures.take(parameters.resolve(element, "parameter")),
            Err(failure) => {
                failures.record(failure);
                None
            }
        };

        let entry = condition.zip(expression).map(|(condition, expression)| {
            condition
                .zip(expression)
                .map(|(condition, expression)| Self {
                    condition,
                    expression,
                })
        });
        failures.finish(entry)
    }
}
