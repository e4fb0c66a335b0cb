//! Combat scenario tests
//!
//! Full rounds through the arena with scripted dice

use skirmish::combat::{ActionKind, EffectType, StatusEffect};
use skirmish::equipment::Hand;

use crate::harness::{brute, commoner, dagger, off_hand_dagger, ArenaTest};

/// Two players wear down an ogre; both dealt enough damage to share the kill
#[test]
fn test_party_kill_splits_xp() {
    #[rustfmt::skip]
    let mut t = ArenaTest::new([
        // round 1 initiative in join order: alice, ogre, bob
        12, 15, 10,
        // ogre fumbles, alice hits for 4, bob hits for 1
        1, 15, 4, 15, 1,
        // round 2 initiative in last round's order: ogre, alice, bob
        15, 12, 10,
        1, 15, 4, 15, 1,
    ]);
    t.add([
        commoner("alice", "Alice"),
        commoner("bob", "Bob"),
        brute("ogre", "Ogre", 1, 10),
    ]);

    let combat_id = t.arena.engage("alice", "ogre").unwrap().combat_id;
    let joined = t.arena.engage("bob", "ogre").unwrap();
    assert!(!joined.created);
    assert_eq!(joined.combat_id, combat_id);
    assert_eq!(t.arena.registry().len(), 1);

    let (round1, resolution) = t.arena.run_round(&combat_id).unwrap();
    assert!(resolution.is_none());
    assert_eq!(
        round1.order,
        vec![
            ("ogre".to_string(), 15),
            ("alice".to_string(), 12),
            ("bob".to_string(), 10)
        ]
    );
    assert_eq!(round1.damage_by("alice"), 4);
    assert_eq!(round1.damage_by("bob"), 1);
    assert_eq!(t.hp("ogre"), 5);

    let (round2, _) = t.arena.run_round(&combat_id).unwrap();
    assert_eq!(round2.deaths, vec!["ogre".to_string()]);
    // allies are still standing, so the caller ends the fight
    assert!(round2.outcome.is_none());
    assert!(t.npcs_in_room().is_empty());

    let combat = t.arena.registry().combat(&combat_id).unwrap();
    assert_eq!(combat.damage_dealt("alice", "ogre"), 8);
    assert_eq!(combat.damage_dealt("bob", "ogre"), 2);

    let resolution = t.arena.resolve(&combat_id).unwrap();
    assert!(resolution.outcome.is_none());
    let shares: Vec<(String, u64)> = resolution
        .awards
        .iter()
        .map(|a| (a.player_id.clone(), a.amount))
        .collect();
    assert_eq!(
        shares,
        vec![("alice".to_string(), 48), ("bob".to_string(), 48)]
    );
    assert!(!t.arena.has_active_combats());
    assert!(t.narrated("Ogre has been slain by Bob!"));
}

/// The off-hand dagger adds no ability modifier to its damage
#[test]
fn test_dual_wield_off_hand_damage() {
    let mut t = ArenaTest::new([
        20, 1, // initiative: hero, dummy
        15, 2, // main hand hits for 2 + DEX 3
        15, 2, // off hand hits for 2
        1, // dummy fumbles
    ]);
    let hero = skirmish::Combatant::player(
        "hero",
        "Hero",
        1,
        skirmish::ScoreSet::new(10, 16, 10, 10, 10, 10),
        10,
    );
    t.add([hero, brute("dummy", "Training Dummy", 1, 100)]);
    t.arena.equip("hero", dagger("d1")).unwrap();
    t.arena.equip("hero", off_hand_dagger("d2")).unwrap();

    let combat_id = t.arena.engage("hero", "dummy").unwrap().combat_id;
    let (report, _) = t.arena.run_round(&combat_id).unwrap();

    let attacks: Vec<_> = report.attacks().filter(|(actor, _)| *actor == "hero").collect();
    assert_eq!(attacks.len(), 2);
    assert_eq!(attacks[0].1.hand, Hand::Main);
    assert_eq!(attacks[1].1.hand, Hand::Off);

    let main = attacks[0].1.damage.as_ref().unwrap();
    let off = attacks[1].1.damage.as_ref().unwrap();
    assert_eq!(main.breakdown.ability_modifier, 3);
    assert_eq!(main.damage, 5);
    assert_eq!(off.breakdown.ability_modifier, 0);
    assert_eq!(off.damage, 2);

    assert_eq!(report.damage_by("hero"), 7);
    assert_eq!(t.hp("dummy"), 93);
}

/// A stunned combatant loses its turn until the effect runs out
#[test]
fn test_stunned_combatant_skips_turn() {
    let mut t = ArenaTest::new([
        15, 10, // initiative: hero, goblin
        1,  // hero fumbles
    ]);
    t.add([commoner("hero", "Hero"), brute("goblin", "Goblin", 1, 20)]);
    let combat_id = t.arena.engage("hero", "goblin").unwrap().combat_id;
    assert!(t
        .arena
        .apply_status_effect("goblin", StatusEffect::new(EffectType::Stunned, 1)));

    let (report, _) = t.arena.run_round(&combat_id).unwrap();
    let goblin_action = report
        .actions
        .iter()
        .find(|a| a.actor == "goblin")
        .unwrap();
    assert_eq!(goblin_action.kind, ActionKind::Incapacitated);
    assert!(t.narrated("Goblin is unable to act."));

    let combat = t.arena.registry().combat(&combat_id).unwrap();
    assert!(combat.participant("goblin").unwrap().effects.is_empty());
    assert!(combat.participant("goblin").unwrap().can_act());
}

/// A lone kill ends the combat on its own and clears the room
#[test]
fn test_victory_resolves_combat() {
    let mut t = ArenaTest::new([
        20, 1, // initiative: hero, rat
        20, 4, 4, // critical: two d4s plus STR
    ]);
    t.add([commoner("hero", "Hero"), brute("rat", "Rat", 1, 4)]);
    t.arena.engage("hero", "rat").unwrap();

    let tick = t.arena.tick();
    assert_eq!(tick.resolutions.len(), 1);
    let resolution = &tick.resolutions[0];
    assert_eq!(resolution.rounds, 1);
    assert_eq!(
        resolution.outcome.as_ref().map(|o| o.to_string()),
        Some("victory_Hero".to_string())
    );
    assert!(t.narrated("Critical hit!"));
    assert!(t.narrated("Combat is over: victory_Hero."));
    assert!(t.npcs_in_room().is_empty());
    assert!(!t.arena.registry().is_in_combat("hero"));
}

/// Fleeing hands the win to whoever stays, with no XP for the runner
#[test]
fn test_flee_leaves_room() {
    let mut t = ArenaTest::new([]);
    t.add([
        commoner("hero", "Hero"),
        brute("kobold", "Kobold", 1, 5),
        brute("wolf", "Wolf", 1, 8),
    ]);
    let combat_id = t.arena.engage("hero", "kobold").unwrap().combat_id;
    t.arena.engage("wolf", "hero").unwrap();

    // three in the fight: one leaving does not end it
    assert!(t.arena.flee("kobold").is_none());
    assert_eq!(t.npcs_in_room(), vec!["wolf".to_string()]);
    assert!(t.arena.registry().combat(&combat_id).is_some());

    let resolution = t.arena.flee("wolf").unwrap();
    assert!(resolution.awards.is_empty());
    assert!(t.npcs_in_room().is_empty());
    assert!(!t.arena.has_active_combats());
}

/// A player who lands the killing blow and then falls still earns the kill
#[test]
fn test_fallen_killer_still_earns_xp() {
    let mut t = ArenaTest::new([
        20, 10, 1, // initiative: hero, rat, wolf
        20, 4, 4,  // hero crits the rat
        20, 4, 4,  // wolf crits the hero
    ]);
    let mut hero = commoner("hero", "Hero");
    hero.set_hp(3);
    t.add([hero, brute("rat", "Rat", 1, 4), brute("wolf", "Wolf", 1, 8)]);
    t.arena.engage("hero", "rat").unwrap();
    t.arena.engage("wolf", "hero").unwrap();

    let tick = t.arena.tick();
    assert_eq!(tick.resolutions.len(), 1);
    let resolution = &tick.resolutions[0];
    assert_eq!(
        resolution.outcome.as_ref().map(|o| o.to_string()),
        Some("victory_Wolf".to_string())
    );
    assert_eq!(resolution.awards.len(), 1);
    assert_eq!(resolution.awards[0].player_id, "hero");
    assert_eq!(resolution.awards[0].amount, 96);

    let hero = t.arena.combatant("hero").unwrap();
    assert!(!hero.is_alive());
    assert_eq!(hero.progression.xp, 96);
}
