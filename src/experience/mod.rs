//! Experience sources built on the formula engine.
//!
//! - [`kinds`] - node kinds over world values
//! - [`prototypes`] - the shared world prototypes
//! - [`kill_entity`] - experience for killing an entity
//! - [`anti_farming`] - per-chunk kill limits applied after evaluation

pub mod anti_farming;
pub mod kill_entity;
pub mod kinds;
pub mod prototypes;

pub use anti_farming::{AntiFarming, ChunkKillCounter, ChunkPos};
pub use kill_entity::{KillData, KillEntityExperienceSource, TeamShare, MAX_TEAMMATE_SHARE_DISTANCE};
pub use prototypes::BuiltinPrototypes;
