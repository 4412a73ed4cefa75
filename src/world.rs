//! Game-world values that experience sources evaluate against.
//!
//! These are plain data snapshots taken at the moment of an event; the
//! formula engine only ever reads them.

use crate::identifier::Identifier;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A point in the world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xpcalc::world::Position;
    ///
    /// let a = Position::new(0.0, 0.0, 0.0);
    /// let b = Position::new(3.0, 4.0, 0.0);
    /// assert_eq!(a.distance_to(&b), 5.0);
    /// ```
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// An active status effect. Amplifier 0 is level I.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusEffect {
    pub amplifier: u8,
}

impl StatusEffect {
    /// The effect's level: amplifier + 1.
    pub fn level(&self) -> f64 {
        f64::from(self.amplifier) + 1.0
    }
}

/// A player taking part in an event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    #[serde(default)]
    pub team: Option<Identifier>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub effects: HashMap<Identifier, StatusEffect>,
    #[serde(default)]
    pub attributes: HashMap<Identifier, f64>,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether both players are on the same team.
    pub fn is_teammate_of(&self, other: &Player) -> bool {
        matches!((&self.team, &other.team), (Some(a), Some(b)) if a == b)
    }
}

/// A living entity, such as a killed mob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivingEntity {
    pub entity_type: Identifier,
    #[serde(default)]
    pub tags: Vec<Identifier>,
    pub health: f64,
    pub max_health: f64,
}

impl LivingEntity {
    pub fn new(entity_type: impl Into<Identifier>, max_health: f64) -> Self {
        Self {
            entity_type: entity_type.into(),
            tags: Vec::new(),
            health: max_health,
            max_health,
        }
    }
}

/// A stack of items, such as the weapon used for a kill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: Identifier,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub tags: Vec<Identifier>,
    #[serde(default)]
    pub nbt: Map<String, Value>,
}

fn default_count() -> u32 {
    1
}

impl ItemStack {
    pub fn new(item: impl Into<Identifier>) -> Self {
        Self {
            item: item.into(),
            count: default_count(),
            tags: Vec::new(),
            nbt: Map::new(),
        }
    }

    /// An empty hand.
    pub fn empty() -> Self {
        Self::new("air")
    }
}

/// What dealt the final blow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageSource {
    pub damage_type: Identifier,
    #[serde(default)]
    pub tags: Vec<Identifier>,
}

impl DamageSource {
    pub fn new(damage_type: impl Into<Identifier>) -> Self {
        Self {
            damage_type: damage_type.into(),
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_teammates_need_a_shared_team() {
        let mut a = Player::new("a");
        let mut b = Player::new("b");
        assert!(!a.is_teammate_of(&b));

        a.team = Some(Identifier::new("red"));
        b.team = Some(Identifier::new("blue"));
        assert!(!a.is_teammate_of(&b));

        b.team = Some(Identifier::new("red"));
        assert!(a.is_teammate_of(&b));
    }

    #[test]
    fn test_item_stack_defaults() {
        let stack: ItemStack = serde_json::from_value(json!({ "item": "diamond_sword" })).unwrap();
        assert_eq!(stack.count, 1);
        assert!(stack.tags.is_empty());
        assert!(stack.nbt.is_empty());
    }

    #[test]
    fn test_effect_level() {
        assert_eq!(StatusEffect { amplifier: 0 }.level(), 1.0);
        assert_eq!(StatusEffect { amplifier: 2 }.level(), 3.0);
    }
}
