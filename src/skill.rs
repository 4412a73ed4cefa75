//! Skill definitions.
//!
//! A skill definition is a flat object of independent fields; every
//! malformed field is reported in one pass.

use crate::accumulate::Accumulator;
use crate::config::ConfigContext;
use crate::error::{Failure, FailureKind, ParseResult};
use crate::identifier::Identifier;
use crate::json::JsonElement;
use serde::{Deserialize, Serialize};

/// How a skill is framed in the skill tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    #[default]
    Task,
    Goal,
    Challenge,
}

impl Frame {
    fn parse(element: JsonElement<'_>) -> Result<Self, Failure> {
        match element.as_str()? {
            "task" => Ok(Frame::Task),
            "goal" => Ok(Frame::Goal),
            "challenge" => Ok(Frame::Challenge),
            other => Err(element.path().failure(FailureKind::InvalidValue(format!(
                "expected `task`, `goal` or `challenge`, found `{}`",
                other
            )))),
        }
    }
}

/// A skill's display and cost settings.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use xpcalc::skill::{Frame, SkillDefinitionConfig};
/// use xpcalc::{ConfigContext, JsonElement};
///
/// let doc = json!({ "title": "Sharpness" });
/// let skill = SkillDefinitionConfig::parse("sharpness", JsonElement::root(&doc), &ConfigContext::default()).unwrap();
/// assert_eq!(skill.cost, 1);
/// assert_eq!(skill.frame, Frame::Task);
/// assert_eq!(skill.description, "");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDefinitionConfig {
    pub id: Identifier,
    pub title: String,
    pub description: String,
    pub frame: Frame,
    pub cost: i32,
    pub required_points: i32,
    pub required_spent_points: i32,
}

impl SkillDefinitionConfig {
    const FIELDS: &'static [&'static str] = &[
        "title",
        "description",
        "frame",
        "cost",
        "required_points",
        "required_spent_points",
    ];

    /// Parse the definition of skill `id`.
    ///
    /// `title` is required. Absent optional fields take their defaults;
    /// present but malformed ones are failures.
    pub fn parse(
        id: impl Into<Identifier>,
        element: JsonElement<'_>,
        config: &ConfigContext,
    ) -> ParseResult<Self> {
        let object = element.as_object()?;
        let mut failures = Accumulator::new(object.path());
        if config.deny_unknown_fields {
            failures.record_all(object.unknown_fields(Self::FIELDS));
        }

        let title = failures.take(object.get_string("title"));
        let description = failures.take(object.get_or("description", "", |e| e.as_str()));
        let frame = failures.take(object.get_or("frame", Frame::default(), Frame::parse));
        let cost = failures.take(object.get_or("cost", 1, |e| e.as_i32()));
        let required_points = failures.take(object.get_or("required_points", 0, |e| e.as_i32()));
        let required_spent_points = failures.take(object.get_or("required_spent_points", 0, |e| e.as_i32()));

        let skill = match (title, description, frame, cost, required_points, required_spent_points) {
            (
                Some(title),
                Some(description),
                Some(frame),
                Some(cost),
                Some(required_points),
                Some(required_spent_points),
            ) => Some(Self {
                id: id.into(),
                title: title.to_string(),
                description: description.to_string(),
                frame,
                cost,
                required_points,
                required_spent_points,
            }),
            _ => None,
        };
        failures.finish(skill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureClass;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn parse(doc: serde_json::Value) -> ParseResult<SkillDefinitionConfig> {
        SkillDefinitionConfig::parse("skill", JsonElement::root(&doc), &ConfigContext::default())
    }

    #[test]
    fn test_absent_optional_fields_use_defaults() {
        let skill = parse(json!({ "title": "Archery" })).unwrap();
        assert_eq!(skill.id.as_str(), "skill");
        assert_eq!(skill.cost, 1);
        assert_eq!(skill.required_points, 0);
        assert_eq!(skill.required_spent_points, 0);
    }

    #[test]
    fn test_malformed_cost_is_one_structural_failure() {
        let err = parse(json!({ "title": "Archery", "cost": "x" })).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.first().path().to_string(), "cost");
        assert_eq!(err.first().class(), FailureClass::Structural);
    }

    #[test]
    fn test_every_malformed_field_is_reported() {
        let err = parse(json!({
            "description": 3,
            "frame": "quest",
            "cost": 1.5,
            "required_points": "none"
        }))
        .unwrap_err();
        let paths: Vec<String> = err.iter().map(|f| f.path().to_string()).collect();
        assert_eq!(paths, vec!["title", "description", "frame", "cost", "required_points"]);
        assert_matches!(err.iter().nth(2).map(Failure::kind), Some(FailureKind::InvalidValue(_)));
    }

    #[test]
    fn test_frames() {
        let skill = parse(json!({ "title": "Boss", "frame": "challenge" })).unwrap();
        assert_eq!(skill.frame, Frame::Challenge);
    }

    #[test]
    fn test_unknown_member_when_strict() {
        let doc = json!({ "title": "Archery", "icon": "bow" });
        assert!(parse(doc.clone()).is_ok());
        let err = SkillDefinitionConfig::parse("skill", JsonElement::root(&doc), &ConfigContext::strict())
            .unwrap_err();
        assert_eq!(err.first().path().to_string(), "icon");
    }
}
