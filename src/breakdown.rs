//! Evaluation breakdowns.
//!
//! A `Breakdown` records how a calculation reached its value: every step in
//! declaration order, whether its condition let it apply, and the running
//! total after it.

use crate::identifier::Identifier;
use serde::{Deserialize, Serialize};

/// One step of an evaluated calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRecord {
    /// Description of the step's operation.
    pub description: String,

    /// Whether the step's condition held. Skipped steps leave the total as is.
    pub applied: bool,

    /// Running total after this step.
    pub total: f64,
}

/// A calculation result with per-step breakdown.
///
/// Serializable, so it can be logged or sent to a client for debugging.
///
/// # Examples
///
/// ```rust
/// use xpcalc::{Breakdown, Identifier};
///
/// let mut breakdown = Breakdown::new(Identifier::new("kill_entity"));
/// breakdown.record_applied("add", 3.0);
/// breakdown.record_skipped("multiply", 3.0);
/// breakdown.record_applied("add", 7.5);
///
/// assert_eq!(breakdown.value, 7.5);
/// assert_eq!(breakdown.applied().count(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Breakdown {
    /// Prototype the calculation was parsed against.
    pub prototype: Identifier,

    /// The final, unrounded value.
    pub value: f64,

    /// Every step, in evaluation order.
    pub steps: Vec<StepRecord>,
}

impl Breakdown {
    /// An empty breakdown; its value is the initial total, 0.
    pub fn new(prototype: Identifier) -> Self {
        Self {
            prototype,
            value: 0.0,
            steps: Vec::new(),
        }
    }

    /// Record a step that applied, leaving `total`.
    pub fn record_applied(&mut self, description: impl Into<String>, total: f64) {
        self.push(description.into(), true, total);
    }

    /// Record a step whose condition did not hold.
    pub fn record_skipped(&mut self, description: impl Into<String>, total: f64) {
        self.push(description.into(), false, total);
    }

    /// Steps that applied.
    pub fn applied(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|step| step.applied)
    }

    /// The value rounded half away from zero.
    pub fn rounded(&self) -> i64 {
        self.value.round() as i64
    }

    fn push(&mut self, description: String, applied: bool, total: f64) {
        self.steps.push(StepRecord {
            description,
            applied,
            total,
        });
        self.value = total;
    }
}
