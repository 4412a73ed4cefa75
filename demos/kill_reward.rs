//! Kill reward example: a kill_entity experience source from JSON
//!
//! This example demonstrates:
//! - Building the world prototypes and the kill_entity prototype
//! - Parsing a source with views, team sharing and anti-farming
//! - Evaluating kills and printing their breakdowns
//! - Reporting every failure of a malformed configuration
//!
//! Run with `RUST_LOG=xpcalc=debug` to see parser and evaluation events.

use tracing_subscriber::EnvFilter;
use xpcalc::experience::{kill_entity, BuiltinPrototypes, ChunkKillCounter, ChunkPos, KillData, KillEntityExperienceSource};
use xpcalc::world::{DamageSource, ItemStack, LivingEntity, Player, Position};
use xpcalc::{ConfigContext, Identifier};

const CONFIG: &str = r#"{
    "operations": [
        { "type": "add", "data": { "value": { "type": "dropped_experience" } } },
        {
            "type": "multiply",
            "condition": { "type": "weapon_item_stack", "data": { "type": "tag", "data": { "tag": "swords" } } },
            "data": { "value": 1.5 }
        },
        {
            "type": "add",
            "condition": {
                "type": "killed_living_entity",
                "data": { "type": "entity_type", "data": { "entity": "wither" } }
            },
            "data": { "value": { "type": "killed_living_entity", "data": { "type": "max_health" } } }
        },
        { "type": "min", "data": { "value": 500 } }
    ],
    "team_shared_experience": true,
    "anti_farming": { "limit_per_chunk": 2, "reset_after_seconds": 300 }
}"#;

const BROKEN_CONFIG: &str = r#"{
    "operations": [
        { "type": "subtract", "data": { "value": 1 } },
        { "type": "add", "data": { "value": "lots" } },
        { "type": "add", "condition": { "type": "player", "data": { "type": "sneaking" } } }
    ],
    "team_shared_experience": "yes"
}"#;

fn kill(entity_type: &str, max_health: f64, weapon: &str, dropped_experience: f64) -> KillData {
    let mut weapon = ItemStack::new(weapon);
    if weapon.item.as_str().ends_with("_sword") {
        weapon.tags.push(Identifier::new("swords"));
    }
    let mut player = Player::new("alex");
    player.team = Some(Identifier::new("red"));
    KillData {
        player,
        victim: LivingEntity::new(entity_type, max_health),
        weapon,
        damage_source: DamageSource::new("player_attack"),
        dropped_experience,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let builtins = BuiltinPrototypes::init()?;
    let prototype = kill_entity::prototype(&builtins)?;
    let config = ConfigContext::default();

    println!("Parsing kill_entity source...");
    let source = KillEntityExperienceSource::from_json_str(CONFIG, &prototype, &config)?;
    println!("  - {} steps", source.calculation().len());
    println!("  - team shared: {}", source.team_shared_experience());

    let kills = [
        kill("zombie", 20.0, "wooden_shovel", 5.0),
        kill("zombie", 20.0, "iron_sword", 5.0),
        kill("wither", 300.0, "diamond_sword", 50.0),
    ];

    for data in &kills {
        let breakdown = source.breakdown(data);
        println!("\n=== {} killed with {} ===", data.victim.entity_type, data.weapon.item);
        for step in &breakdown.steps {
            let marker = if step.applied { "applied" } else { "skipped" };
            println!("  {:<10} {:<8} total = {:.2}", step.description, marker, step.total);
        }
        println!("Reward: {}", breakdown.rounded());
    }

    println!("\n=== Team share ===");
    let killer = kills[0].player.clone();
    let mut teammate = Player::new("sam");
    teammate.team = killer.team.clone();
    teammate.position = Position::new(30.0, 64.0, 0.0);
    let online = vec![killer.clone(), teammate];
    let share = source.apply_team_shared_experience(&killer, &online, source.value(&kills[1]));
    println!("{} and {} teammate(s) get {} each", killer.name, share.teammates.len(), share.amount);

    if let Some(policy) = source.anti_farming() {
        println!("\n=== Anti-farming ===");
        let mut counter = ChunkKillCounter::new(*policy);
        let chunk = ChunkPos::containing(&killer.position);
        for now in [0, 10, 20, 400] {
            let reward = if counter.record_kill(chunk, now) { source.value(&kills[0]) } else { 0 };
            println!("  t={:<4} reward = {}", now, reward);
        }
    }

    println!("\n=== Malformed configuration ===");
    match KillEntityExperienceSource::from_json_str(BROKEN_CONFIG, &prototype, &config) {
        Ok(_) => println!("unexpectedly parsed"),
        Err(failures) => println!("{}", failures),
    }

    Ok(())
}
