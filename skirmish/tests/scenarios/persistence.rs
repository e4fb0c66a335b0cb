//! Persistence scenario tests
//!
//! Config files, JSON player saves and the timed driver

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use skirmish::combat::ScriptedDice;
use skirmish::equipment::Slot;
use skirmish::{
    run_driver, Ability, Arena, DriverStop, EngineConfig, InMemoryWorld, JsonPlayerStore,
    MessageLog, Room, Scenario,
};
use tokio::sync::watch;

use crate::harness::{brute, commoner, dagger};

const CONFIG: &str = r#"
round_interval_ms = 5
max_attuned_items = 1

[guilds.rogues]
primary_ability = "dexterity"
"#;

#[test]
fn test_config_file_drives_arena_rules() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", CONFIG).unwrap();
    let config = EngineConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.round_interval(), Duration::from_millis(5));
    assert_eq!(config.guilds["rogues"].primary_ability, Some(Ability::Dexterity));

    let mut arena = Arena::new(config);
    arena.add_combatant(commoner("hero", "Hero"));
    let ring = |id: &str, slot| {
        skirmish::equipment::EquippedItem::jewelry(id, "Ring of Protection", slot, 1)
            .requiring_attunement()
    };
    arena.equip("hero", ring("r1", Slot::RingLeft)).unwrap();
    arena.equip("hero", ring("r2", Slot::RingRight)).unwrap();
    arena.attune("hero", Slot::RingLeft).unwrap();
    assert!(arena.attune("hero", Slot::RingRight).is_err());
}

#[test]
fn test_json_store_saves_equipment_changes() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonPlayerStore::new(dir.path()).unwrap());
    let mut arena = Arena::new(EngineConfig::default()).with_store(store.clone());
    arena.add_combatant(commoner("hero", "Hero"));

    arena.equip("hero", dagger("d1")).unwrap();
    let saved = store.load_player("hero").unwrap().unwrap();
    assert_eq!(saved.equipment.main_hand().unwrap().name, "Dagger");

    arena.unequip("hero", Slot::MainHand).unwrap();
    let saved = store.load_player("hero").unwrap().unwrap();
    assert!(saved.equipment.is_empty());
}

#[tokio::test]
async fn test_driver_runs_fight_and_saves_xp() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonPlayerStore::new(dir.path()).unwrap());
    let log = MessageLog::shared();
    let mut world = InMemoryWorld::new();
    world.add_room(Room::new("cellar", "Damp Cellar"));

    // every die shows 20: the hero's first swing is a critical for 8
    let mut arena = Arena::new(EngineConfig::default())
        .with_dice(ScriptedDice::new([]).with_fallback(20))
        .with_narrator(log.clone())
        .with_world(world)
        .with_store(store.clone());
    arena.add_combatant(commoner("hero", "Hero").in_room("cellar"));
    arena.add_combatant(brute("rat", "Rat", 1, 4).in_room("cellar"));
    arena.engage("hero", "rat").unwrap();

    let (_tx, rx) = watch::channel(false);
    let summary = run_driver(&mut arena, Duration::from_millis(1), rx, Some(10)).await;
    assert_eq!(summary.stop, DriverStop::Idle);
    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.resolved, 1);

    let saved = store.load_player("hero").unwrap().unwrap();
    assert_eq!(saved.progression.xp, 96);
    assert!(log.messages().iter().any(|m| m == "Combat is over: victory_Hero."));
}

#[test]
fn test_demo_scenario_parses() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/arena.json");
    let scenario = Scenario::load(&path).unwrap();
    let mut arena = Arena::new(EngineConfig::default()).with_world(scenario.world());
    assert!(scenario.populate(&mut arena) > 0);
    assert!(arena.has_active_combats());
}
