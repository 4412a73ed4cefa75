//! Domain node kinds over world values.
//!
//! Each kind parses its own `data` object and nothing else, so one parse
//! function backs both the current node kinds and the legacy functions.

use crate::accumulate::Accumulator;
use crate::condition::Predicate;
use crate::config::ConfigContext;
use crate::error::{Failure, ParseResult};
use crate::identifier::Identifier;
use crate::json::JsonObject;
use crate::node::NodeData;
use crate::parameter::Parameter;
use crate::world::{DamageSource, ItemStack, LivingEntity, Player};
use serde_json::{Map, Value};

/// The data object of a kind, with unknown members already recorded.
fn data_object<'a>(
    data: NodeData<'a>,
    allowed: &[&str],
    config: &ConfigContext,
) -> Result<(JsonObject<'a>, Accumulator), Failure> {
    let object = data.required()?.as_object()?;
    let mut failures = Accumulator::new(object.path());
    if config.deny_unknown_fields {
        failures.record_all(object.unknown_fields(allowed));
    }
    Ok((object, failures))
}

/// `{"<field>": "<identifier>"}`
fn identifier_data(data: NodeData<'_>, field: &str, config: &ConfigContext) -> ParseResult<Identifier> {
    let (object, mut failures) = data_object(data, &[field], config)?;
    let id = failures.take(object.get_string(field));
    failures.finish(id.map(Identifier::new))
}

/// Matches an entity type. Data: `{"entity": "<type>"}`.
///
/// # Examples
///
/// ```rust
/// use xpcalc::experience::kinds::EntityTypeCondition;
/// use xpcalc::{Identifier, Predicate};
///
/// let zombie = EntityTypeCondition::new("zombie");
/// assert!(zombie.test(&Identifier::new("zombie")));
/// assert!(!zombie.test(&Identifier::new("skeleton")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTypeCondition {
    entity: Identifier,
}

impl EntityTypeCondition {
    /// Match entities of type `entity`.
    pub fn new(entity: impl Into<Identifier>) -> Self {
        Self { entity: entity.into() }
    }

    /// Parse `{"entity": "<type>"}`. Every malformed or unknown member is
    /// reported.
    pub fn parse(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Self> {
        identifier_data(data, "entity", config).map(Self::new)
    }
}

impl Predicate<Identifier> for EntityTypeCondition {
    fn test(&self, entity_type: &Identifier) -> bool {
        self.entity == *entity_type
    }
}

/// Matches entities carrying a tag. Data: `{"tag": "<tag>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTagCondition {
    tag: Identifier,
}

impl EntityTagCondition {
    /// Match entities tagged `tag`.
    pub fn new(tag: impl Into<Identifier>) -> Self {
        Self { tag: tag.into() }
    }

    /// Parse `{"tag": "<tag>"}`.
    pub fn parse(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Self> {
        identifier_data(data, "tag", config).map(Self::new)
    }
}

impl Predicate<LivingEntity> for EntityTagCondition {
    fn test(&self, entity: &LivingEntity) -> bool {
        entity.tags.contains(&self.tag)
    }
}

/// Matches an item stack by item, and optionally by NBT.
///
/// Data: `{"item": "<item>", "nbt": {...}}`. Every member of `nbt` must be
/// present with an equal value in the stack's NBT; other members of the
/// stack's NBT are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStackCondition {
    item: Identifier,
    nbt: Option<Map<String, Value>>,
}

impl ItemStackCondition {
    /// Match stacks of `item`, whatever their NBT.
    pub fn new(item: impl Into<Identifier>) -> Self {
        Self {
            item: item.into(),
            nbt: None,
        }
    }

    /// Also require the given NBT members.
    pub fn with_nbt(mut self, nbt: Map<String, Value>) -> Self {
        self.nbt = Some(nbt);
        self
    }

    /// Parse `{"item": "<item>", "nbt": {...}}`, where `nbt` is optional and
    /// must be an object when present.
    pub fn parse(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Self> {
        let (object, mut failures) = data_object(data, &["item", "nbt"], config)?;
        let item = failures.take(object.get_string("item"));
        let nbt = match object.get_optional("nbt") {
            Some(element) => failures
                .take(element.as_object())
                .map(|_| element.value().as_object().cloned()),
            None => Some(None),
        };
        failures.finish(item.zip(nbt).map(|(item, nbt)| Self {
            item: Identifier::new(item),
            nbt,
        }))
    }
}

impl Predicate<ItemStack> for ItemStackCondition {
    fn test(&self, stack: &ItemStack) -> bool {
        if stack.item != self.item {
            return false;
        }
        match &self.nbt {
            Some(required) => required
                .iter()
                .all(|(key, value)| stack.nbt.get(key) == Some(value)),
            None => true,
        }
    }
}

/// Matches item stacks carrying a tag. Data: `{"tag": "<tag>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTagCondition {
    tag: Identifier,
}

impl ItemTagCondition {
    /// Match stacks tagged `tag`.
    pub fn new(tag: impl Into<Identifier>) -> Self {
        Self { tag: tag.into() }
    }

    /// Parse `{"tag": "<tag>"}`.
    pub fn parse(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Self> {
        identifier_data(data, "tag", config).map(Self::new)
    }
}

impl Predicate<ItemStack> for ItemTagCondition {
    fn test(&self, stack: &ItemStack) -> bool {
        stack.tags.contains(&self.tag)
    }
}

/// Matches a damage type. Data: `{"damage": "<type>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageTypeCondition {
    damage: Identifier,
}

impl DamageTypeCondition {
    /// Match the damage type `damage`.
    pub fn new(damage: impl Into<Identifier>) -> Self {
        Self { damage: damage.into() }
    }

    /// Parse `{"damage": "<type>"}`.
    pub fn parse(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Self> {
        identifier_data(data, "damage", config).map(Self::new)
    }
}

impl Predicate<Identifier> for DamageTypeCondition {
    fn test(&self, damage_type: &Identifier) -> bool {
        self.damage == *damage_type
    }
}

/// Matches damage sources carrying a tag. Data: `{"tag": "<tag>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageTagCondition {
    tag: Identifier,
}

impl DamageTagCondition {
    /// Match damage sources tagged `tag`.
    pub fn new(tag: impl Into<Identifier>) -> Self {
        Self { tag: tag.into() }
    }

    /// Parse `{"tag": "<tag>"}`.
    pub fn parse(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Self> {
        identifier_data(data, "tag", config).map(Self::new)
    }
}

impl Predicate<DamageSource> for DamageTagCondition {
    fn test(&self, source: &DamageSource) -> bool {
        source.tags.contains(&self.tag)
    }
}

/// Level of an active status effect on a player, 0 when inactive.
/// Data: `{"effect": "<effect>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectParameter {
    effect: Identifier,
}

impl EffectParameter {
    /// Read the level of `effect`.
    pub fn new(effect: impl Into<Identifier>) -> Self {
        Self { effect: effect.into() }
    }

    /// Parse `{"effect": "<effect>"}`.
    pub fn parse(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Self> {
        identifier_data(data, "effect", config).map(Self::new)
    }

    /// Parse straight into a parameter.
    pub fn parameter(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Parameter<Player>> {
        Self::parse(data, config).map(Self::into_parameter)
    }

    /// Effect level on `player`: amplifier plus one, or 0 without the effect.
    pub fn evaluate(&self, player: &Player) -> f64 {
        player.effects.get(&self.effect).map_or(0.0, |effect| effect.level())
    }

    /// Box into a parameter over [`Player`].
    pub fn into_parameter(self) -> Parameter<Player> {
        Parameter::new(move |player: &Player| self.evaluate(player))
    }
}

/// Value of a player attribute, 0 when the player has none.
/// Data: `{"attribute": "<attribute>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeParameter {
    attribute: Identifier,
}

impl AttributeParameter {
    /// Read the value of `attribute`.
    pub fn new(attribute: impl Into<Identifier>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }

    /// Parse `{"attribute": "<attribute>"}`.
    pub fn parse(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Self> {
        identifier_data(data, "attribute", config).map(Self::new)
    }

    /// Parse straight into a parameter.
    pub fn parameter(data: NodeData<'_>, config: &ConfigContext) -> ParseResult<Parameter<Player>> {
        Self::parse(data, config).map(Self::into_parameter)
    }

    /// Attribute value on `player`, or 0 without the attribute.
    pub fn evaluate(&self, player: &Player) -> f64 {
        player.attributes.get(&self.attribute).copied().unwrap_or(0.0)
    }

    /// Box into a parameter over [`Player`].
    pub fn into_parameter(self) -> Parameter<Player> {
        Parameter::new(move |player: &Player| self.evaluate(player))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::json::{JsonElement, JsonPath};
    use crate::world::StatusEffect;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn present(doc: &Value) -> NodeData<'_> {
        NodeData::present(JsonElement::root(doc))
    }

    #[test]
    fn test_entity_type_condition_parse() {
        let doc = json!({ "entity": "zombie" });
        let condition = EntityTypeCondition::parse(present(&doc), &ConfigContext::default()).unwrap();
        assert_eq!(condition, EntityTypeCondition::new("zombie"));
    }

    #[test]
    fn test_identifier_kinds_require_data() {
        let err = DamageTypeCondition::parse(NodeData::absent(JsonPath::root().field("data")), &ConfigContext::default())
            .unwrap_err();
        assert_eq!(err.first().path().to_string(), "data");
        assert_eq!(err.first().kind(), &FailureKind::MissingField);
    }

    #[test]
    fn test_wrong_field_type() {
        let doc = json!({ "tag": 4 });
        let err = ItemTagCondition::parse(present(&doc), &ConfigContext::default()).unwrap_err();
        assert_matches!(err.first().kind(), FailureKind::WrongType { expected: "string", .. });
    }

    #[test]
    fn test_item_stack_condition_nbt_subset() {
        let doc = json!({ "item": "bow", "nbt": { "Unbreakable": 1 } });
        let condition = ItemStackCondition::parse(present(&doc), &ConfigContext::default()).unwrap();

        let mut bow = ItemStack::new("bow");
        assert!(!condition.test(&bow));
        bow.nbt.insert("Unbreakable".to_string(), json!(1));
        bow.nbt.insert("Damage".to_string(), json!(3));
        assert!(condition.test(&bow));
        assert!(!condition.test(&ItemStack::new("crossbow")));
    }

    #[test]
    fn test_item_stack_condition_reports_item_and_nbt() {
        let doc = json!({ "nbt": "Unbreakable" });
        let err = ItemStackCondition::parse(present(&doc), &ConfigContext::default()).unwrap_err();
        let paths: Vec<String> = err.iter().map(|f| f.path().to_string()).collect();
        assert_eq!(paths, vec!["item", "nbt"]);
    }

    #[test]
    fn test_unknown_data_member_when_strict() {
        let doc = json!({ "effect": "speed", "level": 2 });
        assert!(EffectParameter::parse(present(&doc), &ConfigContext::default()).is_ok());
        let err = EffectParameter::parse(present(&doc), &ConfigContext::strict()).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.first().path().to_string(), "level");
    }

    #[test]
    fn test_player_parameters() {
        let mut player = Player::new("steve");
        player.effects.insert(Identifier::new("speed"), StatusEffect { amplifier: 1 });
        player.attributes.insert(Identifier::new("luck"), 2.5);

        assert_eq!(EffectParameter::new("speed").evaluate(&player), 2.0);
        assert_eq!(EffectParameter::new("haste").evaluate(&player), 0.0);
        assert_eq!(AttributeParameter::new("luck").into_parameter().evaluate(&player), 2.5);
        assert_eq!(AttributeParameter::new("armor").evaluate(&player), 0.0);
    }

    #[test]
    fn test_tag_conditions() {
        let mut entity = LivingEntity::new("zombie", 20.0);
        entity.tags.push(Identifier::new("undead"));
        assert!(EntityTagCondition::new("undead").test(&entity));
        assert!(!EntityTagCondition::new("raider").test(&entity));

        let mut source = DamageSource::new("arrow");
        source.tags.push(Identifier::new("is_projectile"));
        assert!(DamageTagCondition::new("is_projectile").test(&source));
        assert!(DamageTypeCondition::new("arrow").test(&source.damage_type));
    }
}
