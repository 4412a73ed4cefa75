//! # xpcalc - Configuration-Driven Reward Formula Engine
//!
//! Computes a numeric reward (such as experience for a kill) by evaluating
//! a formula tree loaded from JSON configuration:
//! - **Open-ended** node kinds: operations, parameters and conditions are
//!   registered by name on a prototype, not hard-coded
//! - **Shape-safe** dispatch: every kind is bound to the context type it
//!   reads, so a parsed formula cannot be evaluated against the wrong data
//! - **Accumulate-all** validation: one parse reports every malformed field
//! - **Pure** evaluation: parsed calculations are immutable and thread-safe
//!
//! ## Core Concepts
//!
//! ### Formula Pipeline
//!
//! ```text
//! [Prototype<C>] + JSON → [Calculation<C>] → evaluate(&C) → f64 → round
//! ```
//!
//! 1. **Prototypes** register the node kinds available for a context `C`
//! 2. **Calculations** are parsed from an `operations` list of
//!    `(condition?, operation)` steps
//! 3. **Evaluation** runs the steps in order over a running total from 0
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use xpcalc::*;
//!
//! struct Kill {
//!     dropped: f64,
//! }
//!
//! let mut builder = Prototype::<Kill>::create("kill");
//! builder
//!     .register_parameter("dropped", ParameterFactory::simple(|k: &Kill| k.dropped))
//!     .unwrap();
//! let prototype = builder.build();
//!
//! let doc = json!({
//!     "operations": [
//!         { "type": "add", "data": { "value": 3.0 } },
//!         { "type": "add", "data": { "value": { "type": "dropped" } } }
//!     ]
//! });
//! let root = JsonElement::root(&doc).as_object().unwrap();
//! let calculation = Calculation::parse(&root, &prototype, &ConfigContext::default()).unwrap();
//!
//! let kill = Kill { dropped: 4.5 };
//! assert_eq!(calculation.evaluate(&kill), 7.5);
//! assert_eq!(calculation.evaluate_rounded(&kill), 8);
//! ```
//!
//! ## Modules
//!
//! - [`identifier`] - Shared name type
//! - [`error`] - Failures and registry errors
//! - [`json`] - Path-tracking JSON views
//! - [`accumulate`] - Accumulate-all failure collection
//! - [`config`] - Parser options
//! - [`node`] - Node headers (`type` / `data`)
//! - [`prototype`] - Node-kind registries
//! - [`parameter`] - Number-producing nodes
//! - [`condition`] - Boolean-producing nodes
//! - [`operation`] - Total-combining nodes
//! - [`calculation`] - Calculation trees
//! - [`breakdown`] - Per-step evaluation traces
//! - [`legacy`] - The older flat calculation schema
//! - [`world`] - Game-world values
//! - [`experience`] - Experience sources built on the engine
//! - [`skill`] - Skill definitions

pub mod accumulate;
pub mod breakdown;
pub mod calculation;
pub mod condition;
pub mod config;
pub mod error;
pub mod experience;
pub mod identifier;
pub mod json;
pub mod legacy;
pub mod node;
pub mod operation;
pub mod parameter;
pub mod prototype;
pub mod skill;
pub mod world;

// Re-export main types for convenience
pub use accumulate::Accumulator;
pub use breakdown::{Breakdown, StepRecord};
pub use calculation::{Calculation, Step};
pub use condition::{Condition, ConditionFactory, Predicate};
pub use config::ConfigContext;
pub use error::{Failure, FailureClass, FailureKind, ManyFailures, ParseResult, RegistryError};
pub use identifier::Identifier;
pub use json::{JsonArray, JsonElement, JsonObject, JsonPath};
pub use legacy::{LegacyCalculation, LegacyRegistry};
pub use node::{NodeCategory, NodeData};
pub use operation::{Combine, CombineOperation, Operation, OperationFactory};
pub use parameter::{Parameter, ParameterFactory};
pub use prototype::{ParseContext, Prototype, PrototypeBuilder};
