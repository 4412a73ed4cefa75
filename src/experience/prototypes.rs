//! Prototypes for the world value types.
//!
//! Experience sources expose these through views, so a kind written once
//! for `ItemStack` is available wherever a source has an item stack.

use super::kinds::{
    AttributeParameter, DamageTagCondition, DamageTypeCondition, EffectParameter, EntityTagCondition,
    EntityTypeCondition, ItemStackCondition, ItemTagCondition,
};
use crate::condition::{Condition, ConditionFactory};
use crate::error::RegistryError;
use crate::identifier::Identifier;
use crate::parameter::{self, ParameterFactory};
use crate::prototype::Prototype;
use crate::world::{DamageSource, ItemStack, LivingEntity, Player};
use std::sync::Arc;

/// The shared prototypes of the world value types.
///
/// # Examples
///
/// ```rust
/// use xpcalc::experience::BuiltinPrototypes;
/// use xpcalc::NodeCategory;
///
/// let builtins = BuiltinPrototypes::init().unwrap();
/// assert!(builtins.living_entity.condition("entity_type").is_some());
/// assert!(builtins.number.kinds(NodeCategory::Parameter).contains(&"scaled"));
/// ```
#[derive(Debug, Clone)]
pub struct BuiltinPrototypes {
    pub number: Arc<Prototype<f64>>,
    pub player: Arc<Prototype<Player>>,
    pub living_entity: Arc<Prototype<LivingEntity>>,
    pub item_stack: Arc<Prototype<ItemStack>>,
    pub damage_source: Arc<Prototype<DamageSource>>,
}

impl BuiltinPrototypes {
    /// Build every world prototype.
    pub fn init() -> Result<Self, RegistryError> {
        Ok(Self {
            number: Self::number()?,
            player: Self::player()?,
            living_entity: Self::living_entity()?,
            item_stack: Self::item_stack()?,
            damage_source: Self::damage_source()?,
        })
    }

    fn number() -> Result<Arc<Prototype<f64>>, RegistryError> {
        let mut builder = Prototype::<f64>::create("number");
        builder.register_parameter("scaled", ParameterFactory::with_data(parameter::scaled))?;
        Ok(builder.build())
    }

    fn player() -> Result<Arc<Prototype<Player>>, RegistryError> {
        let mut builder = Prototype::<Player>::create("player");
        builder
            .register_parameter("level", ParameterFactory::simple(|p: &Player| f64::from(p.level)))?
            .register_parameter("effect", ParameterFactory::with_data(EffectParameter::parameter))?
            .register_parameter("attribute", ParameterFactory::with_data(AttributeParameter::parameter))?
            .register_condition("on_team", ConditionFactory::simple(|p: &Player| p.team.is_some()))?;
        Ok(builder.build())
    }

    fn living_entity() -> Result<Arc<Prototype<LivingEntity>>, RegistryError> {
        let mut builder = Prototype::<LivingEntity>::create("living_entity");
        builder
            .register_parameter("health", ParameterFactory::simple(|e: &LivingEntity| e.health))?
            .register_parameter("max_health", ParameterFactory::simple(|e: &LivingEntity| e.max_health))?
            .register_condition(
                "entity_type",
                ConditionFactory::with_data(|data, config| {
                    EntityTypeCondition::parse(data, config)
                        .map(|c| Condition::<Identifier>::new(c).focus(|e: &LivingEntity| &e.entity_type))
                }),
            )?
            .register_condition("tag", ConditionFactory::with_data(EntityTagCondition::parse))?;
        Ok(builder.build())
    }

    fn item_stack() -> Result<Arc<Prototype<ItemStack>>, RegistryError> {
        let mut builder = Prototype::<ItemStack>::create("item_stack");
        builder
            .register_parameter("count", ParameterFactory::simple(|s: &ItemStack| f64::from(s.count)))?
            .register_condition("item", ConditionFactory::with_data(ItemStackCondition::parse))?
            .register_condition("tag", ConditionFactory::with_data(ItemTagCondition::parse))?;
        Ok(builder.build())
    }

    fn damage_source() -> Result<Arc<Prototype<DamageSource>>, RegistryError> {
        let mut builder = Prototype::<DamageSource>::create("damage_source");
        builder
            .register_condition(
                "damage_type",
                ConditionFactory::with_data(|data, config| {
                    DamageTypeCondition::parse(data, config)
                        .map(|c| Condition::<Identifier>::new(c).focus(|s: &DamageSource| &s.damage_type))
                }),
            )?
            .register_condition("tag", ConditionFactory::with_data(DamageTagCondition::parse))?;
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigContext;
    use crate::json::JsonElement;
    use crate::parameter::Parameter;
    use serde_json::json;

    #[test]
    fn test_init_registers_each_prototype() {
        let builtins = BuiltinPrototypes::init().unwrap();
        assert_eq!(builtins.number.name().as_str(), "number");
        assert_eq!(builtins.player.name().as_str(), "player");
        assert_eq!(builtins.living_entity.name().as_str(), "living_entity");
        assert_eq!(builtins.item_stack.name().as_str(), "item_stack");
        assert_eq!(builtins.damage_source.name().as_str(), "damage_source");
    }

    #[test]
    fn test_entity_type_node() {
        let builtins = BuiltinPrototypes::init().unwrap();
        let doc = json!({ "type": "entity_type", "data": { "entity": "zombie" } });
        let config = ConfigContext::default();
        let condition =
            Condition::parse(JsonElement::root(&doc), &builtins.living_entity.context(&config)).unwrap();
        assert!(condition.test(&LivingEntity::new("zombie", 20.0)));
        assert!(!condition.test(&LivingEntity::new("creeper", 20.0)));
    }

    #[test]
    fn test_scaled_number_node() {
        let builtins = BuiltinPrototypes::init().unwrap();
        let doc = json!({ "type": "scaled", "data": { "multiplier": 3, "offset": 1 } });
        let config = ConfigContext::default();
        let parameter = Parameter::parse(JsonElement::root(&doc), &builtins.number.context(&config)).unwrap();
        assert_eq!(parameter.evaluate(&2.0), 7.0);
    }
}
