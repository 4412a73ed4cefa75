//! Experience for killing an entity.
//!
//! The reward is a calculation over [`KillData`]. Team sharing and
//! anti-farming are settings next to the calculation; both are applied by
//! the caller to the rounded number, never inside the formula.
//!
//! ```json
//! {
//!   "operations": [
//!     { "type": "add", "data": { "value": { "type": "dropped_experience" } } },
//!     {
//!       "type": "multiply",
//!       "condition": { "type": "weapon_item_stack", "data": { "type": "tag", "data": { "tag": "swords" } } },
//!       "data": { "value": 1.5 }
//!     }
//!   ],
//!   "team_shared_experience": true,
//!   "anti_farming": { "limit_per_chunk": 10, "reset_after_seconds": 300 }
//! }
//! ```

use super::anti_farming::AntiFarming;
use super::kinds::{
    AttributeParameter, DamageTagCondition, DamageTypeCondition, EffectParameter, EntityTagCondition,
    EntityTypeCondition, ItemStackCondition, ItemTagCondition,
};
use super::prototypes::BuiltinPrototypes;
use crate::accumulate::Accumulator;
use crate::breakdown::Breakdown;
use crate::calculation::Calculation;
use crate::condition::ConditionFactory;
use crate::config::ConfigContext;
use crate::error::{ParseResult, RegistryError};
use crate::json::{parse_document, JsonElement};
use crate::legacy::{LegacyCalculation, LegacyRegistry};
use crate::parameter::{self, ParameterFactory};
use crate::prototype::Prototype;
use crate::world::{DamageSource, ItemStack, LivingEntity, Player};
use std::sync::Arc;
use tracing::debug;

/// Teammates further than this from the killer get no share.
pub const MAX_TEAMMATE_SHARE_DISTANCE: f64 = 100.0;

/// Members of the source's configuration object.
const FIELDS: &[&str] = &[
    "operations",
    "parameters",
    "conditions",
    "experience",
    "team_shared_experience",
    "anti_farming",
];

/// Everything known about a kill.
#[derive(Debug, Clone)]
pub struct KillData {
    pub player: Player,
    pub victim: LivingEntity,
    pub weapon: ItemStack,
    pub damage_source: DamageSource,
    pub dropped_experience: f64,
}

/// Build the `kill_entity` prototype.
///
/// Current kinds: the views `player`, `killed_living_entity`,
/// `weapon_item_stack` and `damage_source`, the parameter
/// `dropped_experience` and the condition `is_on_team`. The legacy function
/// names are registered next to them.
pub fn prototype(builtins: &BuiltinPrototypes) -> Result<Arc<Prototype<KillData>>, RegistryError> {
    let mut builder = Prototype::<KillData>::create(KillEntityExperienceSource::ID);
    builder
        .register_view("player", &builtins.player, |d: &KillData| &d.player)?
        .register_view("killed_living_entity", &builtins.living_entity, |d: &KillData| &d.victim)?
        .register_view("weapon_item_stack", &builtins.item_stack, |d: &KillData| &d.weapon)?
        .register_view("damage_source", &builtins.damage_source, |d: &KillData| &d.damage_source)?
        .register_parameter(
            "dropped_experience",
            ParameterFactory::simple(|d: &KillData| d.dropped_experience),
        )?
        .register_condition(
            "is_on_team",
            ConditionFactory::simple(|d: &KillData| d.player.team.is_some()),
        )?;

    LegacyRegistry::new(&mut builder)
        .register_boolean_function("entity", EntityTypeCondition::parse, |d: &KillData| {
            &d.victim.entity_type
        })?
        .register_boolean_function("entity_tag", EntityTagCondition::parse, |d: &KillData| &d.victim)?
        .register_boolean_function("weapon", ItemStackCondition::parse, |d: &KillData| &d.weapon)?
        .register_boolean_function("weapon_nbt", ItemStackCondition::parse, |d: &KillData| &d.weapon)?
        .register_boolean_function("weapon_tag", ItemTagCondition::parse, |d: &KillData| &d.weapon)?
        .register_boolean_function("damage_type", DamageTypeCondition::parse, |d: &KillData| {
            &d.damage_source.damage_type
        })?
        .register_boolean_function("damage_type_tag", DamageTagCondition::parse, |d: &KillData| {
            &d.damage_source
        })?
        .register_number_function("player_effect", EffectParameter::parameter, |d: &KillData| &d.player)?
        .register_number_function("player_attribute", AttributeParameter::parameter, |d: &KillData| {
            &d.player
        })?
        .register_number_function("entity_dropped_experience", parameter::scaled, |d: &KillData| {
            &d.dropped_experience
        })?
        .register_number_function_with(
            "entity_max_health",
            |victim: &LivingEntity| victim.max_health,
            parameter::scaled,
            |d: &KillData| &d.victim,
        )?;

    Ok(builder.build())
}

/// How a reward is split across a team.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamShare<'p> {
    /// Experience for the killer and for each teammate.
    pub amount: i64,
    /// Teammates that receive `amount` as well.
    pub teammates: Vec<&'p Player>,
}

/// A parsed `kill_entity` experience source.
#[derive(Debug, Clone)]
pub struct KillEntityExperienceSource {
    calculation: Calculation<KillData>,
    team_shared_experience: bool,
    anti_farming: Option<AntiFarming>,
}

impl KillEntityExperienceSource {
    /// Name of the experience source kind, also used as its prototype name.
    pub const ID: &'static str = "kill_entity";

    /// Parse the source's configuration object.
    ///
    /// The calculation (either schema), `team_shared_experience` and
    /// `anti_farming` are parsed independently and all their failures are
    /// reported together.
    pub fn parse(
        element: JsonElement<'_>,
        prototype: &Prototype<KillData>,
        config: &ConfigContext,
    ) -> ParseResult<Self> {
        let root = element.as_object()?;
        let mut failures = Accumulator::new(root.path());
        if config.deny_unknown_fields {
            failures.record_all(root.unknown_fields(FIELDS));
        }

        let calculation = failures.take(LegacyCalculation::parse(&root, prototype, config));
        let team_shared_experience =
            failures.take(root.get_or("team_shared_experience", false, |e| e.as_bool()));
        let anti_farming = match root.get_optional("anti_farming") {
            Some(element) => failures.take(AntiFarming::parse(element, config)),
            None => Some(None),
        };

        let source = calculation
            .zip(team_shared_experience)
            .zip(anti_farming)
            .map(|((calculation, team_shared_experience), anti_farming)| Self {
                calculation,
                team_shared_experience,
                anti_farming,
            });
        if let Some(source) = &source {
            debug!(
                steps = source.calculation.len(),
                team_shared_experience = source.team_shared_experience,
                anti_farming = source.anti_farming.is_some(),
                "kill_entity source parsed"
            );
        }
        failures.finish(source)
    }

    /// Parse from document text.
    pub fn from_json_str(
        text: &str,
        prototype: &Prototype<KillData>,
        config: &ConfigContext,
    ) -> ParseResult<Self> {
        let document = parse_document(text)?;
        Self::parse(JsonElement::root(&document), prototype, config)
    }

    /// The reward for `data`, rounded to the nearest integer.
    pub fn value(&self, data: &KillData) -> i64 {
        self.calculation.evaluate_rounded(data)
    }

    /// The reward for `data`, step by step.
    pub fn breakdown(&self, data: &KillData) -> Breakdown {
        self.calculation.breakdown(data)
    }

    /// The parsed reward formula.
    pub fn calculation(&self) -> &Calculation<KillData> {
        &self.calculation
    }

    /// Whether rewards are split with teammates in range.
    pub fn team_shared_experience(&self) -> bool {
        self.team_shared_experience
    }

    /// The per-chunk kill limit, if one is configured and enabled.
    pub fn anti_farming(&self) -> Option<&AntiFarming> {
        self.anti_farming.as_ref()
    }

    /// Split `xp` between `player` and their teammates in range.
    ///
    /// `online` may include `player`. Without sharing, a team, or any
    /// teammate in range, the killer keeps the whole reward. Otherwise `xp`
    /// is divided by the number of teammates in range, rounded down, and the
    /// killer and each of those teammates receive that amount.
    pub fn apply_team_shared_experience<'p>(
        &self,
        player: &Player,
        online: &'p [Player],
        xp: i64,
    ) -> TeamShare<'p> {
        let unshared = TeamShare {
            amount: xp,
            teammates: Vec::new(),
        };
        if !self.team_shared_experience || player.team.is_none() {
            return unshared;
        }

        let teammates: Vec<&Player> = online
            .iter()
            .filter(|other| other.name != player.name)
            .filter(|other| other.is_teammate_of(player))
            .filter(|other| player.position.distance_to(&other.position) <= MAX_TEAMMATE_SHARE_DISTANCE)
            .collect();
        if teammates.is_empty() {
            return unshared;
        }

        let amount = xp / teammates.len() as i64;
        debug!(player = %player.name, teammates = teammates.len(), amount, "kill experience shared");
        TeamShare { amount, teammates }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use crate::world::Position;
    use serde_json::json;

    fn source(doc: serde_json::Value) -> KillEntityExperienceSource {
        let builtins = BuiltinPrototypes::init().unwrap();
        let prototype = prototype(&builtins).unwrap();
        KillEntityExperienceSource::parse(JsonElement::root(&doc), &prototype, &ConfigContext::default()).unwrap()
    }

    fn teammate(name: &str, team: &str, x: f64) -> Player {
        let mut player = Player::new(name);
        player.team = Some(Identifier::new(team));
        player.position = Position::new(x, 64.0, 0.0);
        player
    }

    #[test]
    fn test_defaults() {
        let source = source(json!({ "operations": [] }));
        assert!(!source.team_shared_experience());
        assert!(source.anti_farming().is_none());
    }

    #[test]
    fn test_share_is_divided_by_teammates_in_range() {
        let source = source(json!({ "operations": [], "team_shared_experience": true }));
        let killer = teammate("alex", "red", 0.0);
        let online = vec![
            killer.clone(),
            teammate("near", "red", 50.0),
            teammate("edge", "red", 100.0),
            teammate("far", "red", 150.0),
            teammate("rival", "blue", 10.0),
        ];

        let share = source.apply_team_shared_experience(&killer, &online, 11);
        assert_eq!(share.amount, 5);
        let names: Vec<&str> = share.teammates.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["near", "edge"]);
    }

    #[test]
    fn test_single_teammate_in_range_gets_the_whole_reward() {
        let source = source(json!({ "operations": [], "team_shared_experience": true }));
        let killer = teammate("alex", "red", 0.0);
        let online = vec![killer.clone(), teammate("near", "red", 10.0)];
        let share = source.apply_team_shared_experience(&killer, &online, 10);
        assert_eq!(share.amount, 10);
        assert_eq!(share.teammates.len(), 1);
    }

    #[test]
    fn test_share_without_teammates_keeps_reward() {
        let source = source(json!({ "operations": [], "team_shared_experience": true }));
        let killer = teammate("alex", "red", 0.0);
        let share = source.apply_team_shared_experience(&killer, std::slice::from_ref(&killer), 10);
        assert_eq!(share.amount, 10);
        assert!(share.teammates.is_empty());
    }

    #[test]
    fn test_share_disabled() {
        let source = source(json!({ "operations": [] }));
        let killer = teammate("alex", "red", 0.0);
        let online = vec![teammate("near", "red", 1.0)];
        assert_eq!(source.apply_team_shared_experience(&killer, &online, 10).amount, 10);
    }

    #[test]
    fn test_settings_and_calculation_failures_are_reported_together() {
        let builtins = BuiltinPrototypes::init().unwrap();
        let prototype = prototype(&builtins).unwrap();
        let doc = json!({
            "operations": [{ "type": "subtract" }],
            "team_shared_experience": "yes",
            "anti_farming": { "limit_per_chunk": 3 }
        });
        let err = KillEntityExperienceSource::parse(JsonElement::root(&doc), &prototype, &ConfigContext::default())
            .unwrap_err();
        let paths: Vec<String> = err.iter().map(|f| f.path().to_string()).collect();
        assert_eq!(
            paths,
            vec!["operations[0].type", "team_shared_experience", "anti_farming.reset_after_seconds"]
        );
    }

    #[test]
    fn test_from_json_str_syntax_error() {
        let builtins = BuiltinPrototypes::init().unwrap();
        let prototype = prototype(&builtins).unwrap();
        let err = KillEntityExperienceSource::from_json_str("{ operations", &prototype, &ConfigContext::default())
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.first().path().is_root());
    }
}
