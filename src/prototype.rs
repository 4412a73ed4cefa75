//! Prototype registry module.
//!
//! A `Prototype<C>` names one runtime context shape `C` and owns the
//! factories for every operation, parameter and condition kind that can be
//! evaluated against it. Factories are bound to `C` by their type, so a
//! kind written for one shape cannot be dispatched against another.
//!
//! Registration happens on a [`PrototypeBuilder`]; `build()` freezes the
//! registry into an `Arc<Prototype<C>>` that has no mutating methods and can
//! be shared across threads.

use crate::condition::{Condition, ConditionFactory};
use crate::config::ConfigContext;
use crate::error::RegistryError;
use crate::identifier::Identifier;
use crate::node::NodeCategory;
use crate::operation::OperationFactory;
use crate::parameter::{Parameter, ParameterFactory};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Everything a factory needs while parsing a node of shape `C`.
///
/// # Examples
///
/// ```rust
/// use xpcalc::{ConfigContext, Prototype};
///
/// let prototype = Prototype::<f64>::create("number").build();
/// let config = ConfigContext::default();
/// let context = prototype.context(&config);
/// assert_eq!(context.prototype().name().as_str(), "number");
/// ```
pub struct ParseContext<'a, C> {
    prototype: &'a Prototype<C>,
    config: &'a ConfigContext,
}

impl<'a, C> ParseContext<'a, C> {
    /// Create a parse context for `prototype`.
    pub fn new(prototype: &'a Prototype<C>, config: &'a ConfigContext) -> Self {
        Self { prototype, config }
    }

    /// The prototype nested nodes are resolved against.
    pub fn prototype(&self) -> &'a Prototype<C> {
        self.prototype
    }

    /// Parser options.
    pub fn config(&self) -> &'a ConfigContext {
        self.config
    }
}

impl<C> Clone for ParseContext<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for ParseContext<'_, C> {}

/// A named, immutable registry of node-kind factories for context shape `C`.
pub struct Prototype<C> {
    name: Identifier,
    operations: HashMap<Identifier, OperationFactory<C>>,
    parameters: HashMap<Identifier, ParameterFactory<C>>,
    conditions: HashMap<Identifier, ConditionFactory<C>>,
}

impl<C: 'static> Prototype<C> {
    /// Start a prototype with the built-in kinds already registered.
    ///
    /// Built-in operations: `add`, `set`, `multiply`, `min`, `max`.
    /// Built-in parameters: `constant`.
    /// Built-in conditions: `all`, `any`, `not`, `constant`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xpcalc::{NodeCategory, Prototype};
    ///
    /// let prototype = Prototype::<f64>::create("number").build();
    /// assert!(prototype.operation("add").is_some());
    /// assert!(prototype.condition("all").is_some());
    /// assert_eq!(prototype.kinds(NodeCategory::Parameter), vec!["constant"]);
    /// ```
    pub fn create(name: impl Into<Identifier>) -> PrototypeBuilder<C> {
        let mut builder = Self::empty(name);
        crate::operation::register_builtins(&mut builder);
        crate::parameter::register_builtins(&mut builder);
        crate::condition::register_builtins(&mut builder);
        builder
    }

    /// Start a prototype with nothing registered.
    pub fn empty(name: impl Into<Identifier>) -> PrototypeBuilder<C> {
        PrototypeBuilder {
            prototype: Prototype {
                name: name.into(),
                operations: HashMap::new(),
                parameters: HashMap::new(),
                conditions: HashMap::new(),
            },
        }
    }

    /// Parse context for this prototype.
    pub fn context<'a>(&'a self, config: &'a ConfigContext) -> ParseContext<'a, C> {
        ParseContext::new(self, config)
    }
}

impl<C> Prototype<C> {
    /// The prototype's name.
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Factory of the operation kind `kind`.
    pub fn operation(&self, kind: &str) -> Option<&OperationFactory<C>> {
        self.operations.get(kind)
    }

    /// Factory of the parameter kind `kind`.
    pub fn parameter(&self, kind: &str) -> Option<&ParameterFactory<C>> {
        self.parameters.get(kind)
    }

    /// Factory of the condition kind `kind`.
    pub fn condition(&self, kind: &str) -> Option<&ConditionFactory<C>> {
        self.conditions.get(kind)
    }

    /// Registered kind names of `category`, sorted.
    pub fn kinds(&self, category: NodeCategory) -> Vec<&str> {
        let mut kinds: Vec<&str> = match category {
            NodeCategory::Operation => self.operations.keys().map(Identifier::as_str).collect(),
            NodeCategory::Parameter => self.parameters.keys().map(Identifier::as_str).collect(),
            NodeCategory::Condition => self.conditions.keys().map(Identifier::as_str).collect(),
        };
        kinds.sort_unstable();
        kinds
    }

    fn contains(&self, category: NodeCategory, kind: &str) -> bool {
        match category {
            NodeCategory::Operation => self.operations.contains_key(kind),
            NodeCategory::Parameter => self.parameters.contains_key(kind),
            NodeCategory::Condition => self.conditions.contains_key(kind),
        }
    }
}

impl<C> fmt::Debug for Prototype<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prototype")
            .field("name", &self.name)
            .field("operations", &self.kinds(NodeCategory::Operation))
            .field("parameters", &self.kinds(NodeCategory::Parameter))
            .field("conditions", &self.kinds(NodeCategory::Condition))
            .finish()
    }
}

/// Registration phase of a [`Prototype`].
///
/// # Examples
///
/// ```rust
/// use xpcalc::{ParameterFactory, Prototype};
///
/// struct Kill {
///     dropped: f64,
/// }
///
/// let mut builder = Prototype::<Kill>::create("kill");
/// builder
///     .register_parameter("dropped", ParameterFactory::simple(|kill: &Kill| kill.dropped))
///     .unwrap();
/// let prototype = builder.build();
/// assert!(prototype.parameter("dropped").is_some());
/// ```
pub struct PrototypeBuilder<C> {
    prototype: Prototype<C>,
}

impl<C: 'static> PrototypeBuilder<C> {
    /// Name of the prototype being built.
    pub fn name(&self) -> &Identifier {
        &self.prototype.name
    }

    fn check_free(&self, category: NodeCategory, kind: &Identifier) -> Result<(), RegistryError> {
        if self.prototype.contains(category, kind.as_str()) {
            return Err(RegistryError::DuplicateKind {
                prototype: self.prototype.name.clone(),
                category,
                kind: kind.clone(),
            });
        }
        Ok(())
    }

    fn log_registration(&self, category: NodeCategory, kind: &Identifier) {
        debug!(
            prototype = %self.prototype.name,
            %category,
            %kind,
            "registered node kind"
        );
    }

    /// Register an operation kind.
    pub fn register_operation(
        &mut self,
        kind: impl Into<Identifier>,
        factory: OperationFactory<C>,
    ) -> Result<&mut Self, RegistryError> {
        let kind = kind.into();
        self.check_free(NodeCategory::Operation, &kind)?;
        self.insert_operation(kind, factory);
        Ok(self)
    }

    /// Register a parameter kind.
    pub fn register_parameter(
        &mut self,
        kind: impl Into<Identifier>,
        factory: ParameterFactory<C>,
    ) -> Result<&mut Self, RegistryError> {
        let kind = kind.into();
        self.check_free(NodeCategory::Parameter, &kind)?;
        self.insert_parameter(kind, factory);
        Ok(self)
    }

    /// Register a condition kind.
    pub fn register_condition(
        &mut self,
        kind: impl Into<Identifier>,
        factory: ConditionFactory<C>,
    ) -> Result<&mut Self, RegistryError> {
        let kind = kind.into();
        self.check_free(NodeCategory::Condition, &kind)?;
        self.insert_condition(kind, factory);
        Ok(self)
    }

    /// Expose every parameter and condition kind of `target` under `kind`.
    ///
    /// The view's `data` is a node of the target prototype; the parsed node
    /// is evaluated against the part of `C` that `accessor` selects. The
    /// target shape `R` is fixed here, at registration time, by the
    /// accessor's type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_json::json;
    /// use xpcalc::{ConfigContext, JsonElement, Parameter, ParameterFactory, Prototype};
    ///
    /// struct Victim {
    ///     max_health: f64,
    /// }
    /// struct Kill {
    ///     victim: Victim,
    /// }
    ///
    /// let mut victim = Prototype::<Victim>::create("victim");
    /// victim
    ///     .register_parameter("max_health", ParameterFactory::simple(|v: &Victim| v.max_health))
    ///     .unwrap();
    /// let victim = victim.build();
    ///
    /// let mut kill = Prototype::<Kill>::create("kill");
    /// kill.register_view("victim", &victim, |k: &Kill| &k.victim).unwrap();
    /// let kill = kill.build();
    ///
    /// let doc = json!({ "type": "victim", "data": { "type": "max_health" } });
    /// let config = ConfigContext::default();
    /// let parameter = Parameter::parse(JsonElement::root(&doc), &kill.context(&config)).unwrap();
    /// assert_eq!(parameter.evaluate(&Kill { victim: Victim { max_health: 20.0 } }), 20.0);
    /// ```
    pub fn register_view<R, A>(
        &mut self,
        kind: impl Into<Identifier>,
        target: &Arc<Prototype<R>>,
        accessor: A,
    ) -> Result<&mut Self, RegistryError>
    where
        R: 'static,
        A: Fn(&C) -> &R + Send + Sync + 'static,
    {
        let kind = kind.into();
        self.check_free(NodeCategory::Parameter, &kind)?;
        self.check_free(NodeCategory::Condition, &kind)?;

        let accessor = Arc::new(accessor);

        let parameter_target = Arc::clone(target);
        let parameter_accessor = Arc::clone(&accessor);
        let parameter = ParameterFactory::new(move |data, context| {
            let element = data.required()?;
            let nested = ParseContext::new(parameter_target.as_ref(), context.config());
            let accessor = Arc::clone(&parameter_accessor);
            Ok(Parameter::parse(element, &nested)?.focus(move |c: &C| (*accessor)(c)))
        });

        let condition_target = Arc::clone(target);
        let condition_accessor = Arc::clone(&accessor);
        let condition = ConditionFactory::new(move |data, context| {
            let element = data.required()?;
            let nested = ParseContext::new(condition_target.as_ref(), context.config());
            let accessor = Arc::clone(&condition_accessor);
            Ok(Condition::parse(element, &nested)?.focus(move |c: &C| (*accessor)(c)))
        });

        self.insert_parameter(kind.clone(), parameter);
        self.insert_condition(kind, condition);
        Ok(self)
    }

    /// Finish registration.
    pub fn build(self) -> Arc<Prototype<C>> {
        debug!(
            prototype = %self.prototype.name,
            operations = self.prototype.operations.len(),
            parameters = self.prototype.parameters.len(),
            conditions = self.prototype.conditions.len(),
            "prototype built"
        );
        Arc::new(self.prototype)
    }

    pub(crate) fn insert_operation(&mut self, kind: impl Into<Identifier>, factory: OperationFactory<C>) {
        let kind = kind.into();
        self.log_registration(NodeCategory::Operation, &kind);
        self.prototype.operations.insert(kind, factory);
    }

    pub(crate) fn insert_parameter(&mut self, kind: impl Into<Identifier>, factory: ParameterFactory<C>) {
        let kind = kind.into();
        self.log_registration(NodeCategory::Parameter, &kind);
        self.prototype.parameters.insert(kind, factory);
    }

    pub(crate) fn insert_condition(&mut self, kind: impl Into<Identifier>, factory: ConditionFactory<C>) {
        let kind = kind.into();
        self.log_registration(NodeCategory::Condition, &kind);
        self.prototype.conditions.insert(kind, factory);
    }
}
