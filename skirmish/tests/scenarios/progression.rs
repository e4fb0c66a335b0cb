//! Progression scenario tests
//!
//! XP from kills, cascading level-ups, guild hooks and stat choices

use std::sync::Arc;

use skirmish::progression::{
    xp_to_reach, GuildHook, GuildProfile, LevelPerk, StatIncreaseError,
};
use skirmish::{Ability, Combatant, EngineConfig, ScoreSet};

use crate::harness::{brute, commoner, ArenaTest};

fn fighters_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.guilds.insert(
        "fighters".to_string(),
        GuildProfile {
            primary_ability: Some(Ability::Strength),
            perks: vec![LevelPerk {
                level: 2,
                max_hp: 4,
                armor_class: 0,
                abilities: vec!["second_wind".to_string()],
            }],
        },
    );
    config
}

/// Killing a much stronger foe pays for two levels at once
#[test]
fn test_kill_cascades_levels_with_guild_perks() {
    let mut t = ArenaTest::with_config(
        fighters_config(),
        [
            20, 1, // initiative: hero, troll
            20, 4, 4, // critical for 4 + 4 + STR 3
        ],
    );
    let hero = Combatant::player("hero", "Hero", 1, ScoreSet::new(16, 10, 14, 10, 10, 10), 12)
        .with_guild("fighters");
    t.add([hero, brute("troll", "Troll", 10, 3)]);
    t.arena.engage("hero", "troll").unwrap();

    let tick = t.arena.tick();
    let resolution = &tick.resolutions[0];
    // 0.12 * 31849 * 1.5 for a mob five or more levels up
    assert_eq!(resolution.awards[0].amount, 5733);
    assert_eq!(resolution.level_ups.len(), 1);
    let (player_id, report) = &resolution.level_ups[0];
    assert_eq!(player_id, "hero");
    assert_eq!(report.from_level, 1);
    assert_eq!(report.to_level, 3);
    assert!(!report.halted);

    let hero = t.arena.combatant("hero").unwrap();
    assert_eq!(hero.level, 3);
    // 12 + 7 + 7 from CON, + 4 from the level 2 perk
    assert_eq!(hero.max_hp(), 30);
    assert_eq!(hero.hp(), 30);
    assert_eq!(hero.progression.unlocked_abilities, vec!["second_wind".to_string()]);
    assert_eq!(hero.progression.pending_stat_choices, 0);

    assert!(t.narrated("Hero has reached level 2!"));
    assert!(t.narrated("Hero has reached level 3!"));
    assert_eq!(t.store.get("hero").unwrap().level, 3);
}

/// A stat choice offered at level 4 is spent once
#[test]
fn test_manual_stat_increase() {
    let mut t = ArenaTest::new([]);
    t.add([commoner("hero", "Hero")]);

    let report = t.arena.award_xp("hero", xp_to_reach(4)).unwrap();
    assert_eq!(report.to_level, 4);
    assert_eq!(
        t.arena.combatant("hero").unwrap().progression.pending_stat_choices,
        1
    );

    assert_eq!(
        t.arena.increase_stat("hero", "charm"),
        Err(StatIncreaseError::UnknownStat("charm".to_string()))
    );
    let saves = t.store.save_count();
    let increase = t.arena.increase_stat("hero", "dex").unwrap();
    assert_eq!(increase.ability, Ability::Dexterity);
    assert_eq!(increase.new_score, 11);
    assert_eq!(t.store.save_count(), saves + 1);
    assert!(t.narrated("Your dexterity increases to 11."));

    assert_eq!(
        t.arena.increase_stat("hero", "dex"),
        Err(StatIncreaseError::NoPendingChoice)
    );
}

/// A registered hook can take over stat choices
#[test]
fn test_custom_guild_hook_resolves_choice() {
    struct Monks;
    impl GuildHook for Monks {
        fn handle_stat_choice(&self, player: &mut Combatant) -> bool {
            player.abilities.increase_base(Ability::Wisdom, 1);
            player.abilities.increase_base(Ability::Dexterity, 1);
            true
        }
    }

    let mut t = ArenaTest::new([]);
    t.arena.register_guild_hook("Monks", Arc::new(Monks));
    t.add([commoner("hero", "Hero").with_guild("monks")]);

    t.arena.award_xp("hero", xp_to_reach(4)).unwrap();
    let hero = t.arena.combatant("hero").unwrap();
    assert_eq!(hero.level, 4);
    assert_eq!(hero.progression.pending_stat_choices, 0);
    assert_eq!(hero.abilities.score(Ability::Wisdom), 11);
    assert!(t.narrated("Your guild training improves your abilities."));
}

/// The cascade guard stops a runaway award at the configured limit
#[test]
fn test_cascade_guard_from_config() {
    let config = EngineConfig {
        max_cascade_levels: 3,
        ..EngineConfig::default()
    };
    let mut t = ArenaTest::with_config(config, []);
    t.add([commoner("hero", "Hero")]);

    let report = t.arena.award_xp("hero", xp_to_reach(20)).unwrap();
    assert!(report.halted);
    assert_eq!(report.to_level, 4);
    assert_eq!(t.arena.combatant("hero").unwrap().progression.xp, xp_to_reach(20));
}

/// NPCs never collect experience
#[test]
fn test_npc_cannot_gain_xp() {
    let mut t = ArenaTest::new([]);
    t.add([brute("orc", "Orc", 1, 10)]);
    assert!(t.arena.award_xp("orc", 500).is_none());
    assert_eq!(t.arena.combatant("orc").unwrap().progression.xp, 0);
}
