//! Round orchestration
//!
//! One pass over a combat:
//! 1. Roll initiative (d20 + DEX) for every living participant
//! 2. In initiative order, each living participant applies start-of-turn
//!    effects and attacks the first other living participant, with a
//!    follow-up off-hand attack when dual wielding
//! 3. HP removed is recorded in the combat's damage ledger
//! 4. Status effects count down
//! 5. The combat resolves once at most one participant is left standing

use tracing::{debug, info, warn};

use crate::character::{EntityId, EntityKind, Roster};
use crate::config::EngineConfig;
use crate::equipment::{self, Hand};
use crate::narration::Narrator;
use crate::world::World;

use super::attack::{self, AttackResult};
use super::damage;
use super::dice::DiceSource;
use super::magic;
use super::state::{Combat, CombatId};

/// Collaborators a round needs
pub struct RoundContext<'a> {
    pub roster: &'a mut Roster,
    pub dice: &'a mut dyn DiceSource,
    pub narrator: &'a dyn Narrator,
    pub world: &'a mut dyn World,
    pub config: &'a EngineConfig,
}

/// How a combat ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombatOutcome {
    /// Nobody is left standing
    MutualDestruction,
    Victory { winner_id: EntityId, winner_name: String },
}

impl std::fmt::Display for CombatOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CombatOutcome::MutualDestruction => write!(f, "mutual_destruction"),
            CombatOutcome::Victory { winner_name, .. } => write!(f, "victory_{}", winner_name),
        }
    }
}

/// What a participant did with its turn
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Attack {
        target: EntityId,
        attack: AttackResult,
        /// Damage from on-hit item effects
        extra_damage: i32,
        /// HP actually removed from the target
        hp_removed: i32,
        slain: bool,
    },
    /// Stunned, paralyzed or similar
    Incapacitated,
    /// No living opponent
    NoTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub actor: EntityId,
    pub kind: ActionKind,
}

/// Summary of one round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub combat_id: CombatId,
    pub round: u32,
    /// Initiative order with rolls
    pub order: Vec<(EntityId, i32)>,
    pub actions: Vec<ActionRecord>,
    pub deaths: Vec<EntityId>,
    /// Set once the combat has resolved
    pub outcome: Option<CombatOutcome>,
}

impl RoundReport {
    /// Total HP an actor removed this round
    pub fn damage_by(&self, actor: &str) -> i32 {
        self.actions
            .iter()
            .filter(|a| a.actor == actor)
            .map(|a| match &a.kind {
                ActionKind::Attack { hp_removed, .. } => *hp_removed,
                _ => 0,
            })
            .sum()
    }

    /// Attacks made this round
    pub fn attacks(&self) -> impl Iterator<Item = (&EntityId, &AttackResult)> {
        self.actions.iter().filter_map(|a| match &a.kind {
            ActionKind::Attack { attack, .. } => Some((&a.actor, attack)),
            _ => None,
        })
    }
}

/// Send a line to everyone watching a combat
fn broadcast(combat: &Combat, narrator: &dyn Narrator, message: &str) {
    match &combat.room_id {
        Some(room_id) => narrator.announce(room_id, message, &[]),
        None => {
            for participant in &combat.participants {
                narrator.tell(&participant.entity_id, message);
            }
        }
    }
}

/// Outcome if at most one participant is alive
pub fn check_outcome(combat: &Combat, roster: &Roster) -> Option<CombatOutcome> {
    let living: Vec<&EntityId> = combat
        .participants
        .iter()
        .map(|p| &p.entity_id)
        .filter(|id| roster.is_alive(id))
        .collect();
    match living.as_slice() {
        [] => Some(CombatOutcome::MutualDestruction),
        [winner] => Some(CombatOutcome::Victory {
            winner_id: (*winner).clone(),
            winner_name: roster.name_of(winner),
        }),
        _ => None,
    }
}

/// Reorder participants by fresh initiative, highest first.
/// The sort is stable so ties keep their previous order.
fn roll_initiative(combat: &mut Combat, ctx: &mut RoundContext<'_>) -> Vec<(EntityId, i32)> {
    for participant in &mut combat.participants {
        participant.initiative = match ctx.roster.get(&participant.entity_id) {
            Some(c) if c.is_alive() => attack::roll_initiative(c, ctx.dice),
            _ => i32::MIN,
        };
    }
    combat
        .participants
        .sort_by(|a, b| b.initiative.cmp(&a.initiative));
    combat
        .participants
        .iter()
        .filter(|p| p.initiative != i32::MIN)
        .map(|p| (p.entity_id.clone(), p.initiative))
        .collect()
}

/// Resolve one attack with one hand and apply its damage
fn strike(
    combat: &mut Combat,
    ctx: &mut RoundContext<'_>,
    actor_id: &str,
    target_id: &str,
    hand: Hand,
    deaths: &mut Vec<EntityId>,
) -> Option<ActionKind> {
    let (Some(attacker), Some(defender)) = (ctx.roster.get(actor_id), ctx.roster.get(target_id))
    else {
        warn!(attacker = actor_id, defender = target_id, "combatant missing, skipping attack");
        return None;
    };
    let Some(participant) = combat.participant(actor_id) else {
        warn!(attacker = actor_id, "not a participant, skipping attack");
        return None;
    };

    let mut result =
        attack::resolve_attack(attacker, defender, participant, hand, ctx.config, ctx.dice);
    let mut extra_damage = 0;
    let mut messages = Vec::new();
    if result.hit {
        let dmg = damage::resolve_damage(attacker, defender, &result, hand, ctx.config, ctx.dice);
        let on_hit = magic::on_hit(attacker, defender, &result, ctx.dice);
        extra_damage = on_hit.extra_damage;
        messages = on_hit.messages;
        result.damage = Some(dmg);
    }

    let attacker_name = attacker.name.clone();
    let defender_name = defender.name.clone();
    let defender_kind = defender.kind;
    let defender_room = defender.room_id.clone();

    let total = result.damage_dealt() + extra_damage;
    let (hp_removed, slain) = match ctx.roster.get_mut(target_id) {
        Some(target) if total > 0 => {
            let removed = target.take_damage(total);
            (removed, !target.is_alive())
        }
        _ => (0, false),
    };
    combat.record_damage(actor_id, target_id, hp_removed.max(0) as u32);

    broadcast(
        combat,
        ctx.narrator,
        &describe_attack(&attacker_name, &defender_name, &result),
    );
    for message in &messages {
        broadcast(combat, ctx.narrator, message);
    }

    if slain {
        combat.record_death(target_id);
        deaths.push(target_id.to_string());
        broadcast(
            combat,
            ctx.narrator,
            &format!("{} has been slain by {}!", defender_name, attacker_name),
        );
        info!(combat = %combat.id, victim = target_id, killer = actor_id, "combatant slain");
        if defender_kind == EntityKind::Npc {
            if let Some(room_id) = defender_room.as_deref().or(combat.room_id.as_deref()) {
                ctx.world.remove_npc(room_id, target_id);
            }
        }
    }

    Some(ActionKind::Attack {
        target: target_id.to_string(),
        attack: result,
        extra_damage,
        hp_removed,
        slain,
    })
}

fn describe_attack(attacker: &str, defender: &str, result: &AttackResult) -> String {
    let roll = if result.rolls.len() > 1 {
        format!("{} ({} of {:?})", result.natural, result.mode, result.rolls)
    } else {
        result.natural.to_string()
    };
    let hand = match result.hand {
        Hand::Main => "",
        Hand::Off => " off-hand",
    };
    let head = format!(
        "{} attacks {} with{} {}: rolled {} {:+} = {} vs AC {}",
        attacker, defender, hand, result.weapon, roll, result.bonus.total(), result.total, result.target_ac
    );
    if result.fumble {
        format!("{}. Fumble!", head)
    } else if let Some(dmg) = &result.damage {
        let crit = if result.critical { "Critical hit! " } else { "" };
        format!(
            "{}. {}{} damage ({})",
            head, crit, dmg.damage, dmg.damage_type
        )
    } else {
        format!("{}. Miss.", head)
    }
}

/// Run one round of a combat
pub fn run_round(combat: &mut Combat, ctx: &mut RoundContext<'_>) -> RoundReport {
    combat.round += 1;
    let order = roll_initiative(combat, ctx);
    debug!(combat = %combat.id, round = combat.round, ?order, "initiative");

    let mut actions = Vec::new();
    let mut deaths = Vec::new();

    for (actor_id, _) in &order {
        let Some(actor) = ctx.roster.get_mut(actor_id) else {
            warn!(combat = %combat.id, entity = %actor_id, "participant missing from roster");
            continue;
        };
        if !actor.is_alive() {
            continue;
        }

        for message in magic::on_start_of_turn(actor, true, ctx.dice) {
            broadcast(combat, ctx.narrator, &message);
        }

        let can_act = combat.participant(actor_id).is_some_and(|p| p.can_act());
        if !can_act {
            let name = ctx.roster.name_of(actor_id);
            broadcast(combat, ctx.narrator, &format!("{} is unable to act.", name));
            actions.push(ActionRecord {
                actor: actor_id.clone(),
                kind: ActionKind::Incapacitated,
            });
            continue;
        }

        let target = combat
            .participants
            .iter()
            .map(|p| &p.entity_id)
            .find(|id| *id != actor_id && ctx.roster.is_alive(id))
            .cloned();
        let Some(target_id) = target else {
            actions.push(ActionRecord {
                actor: actor_id.clone(),
                kind: ActionKind::NoTarget,
            });
            continue;
        };

        if let Some(kind) = strike(combat, ctx, actor_id, &target_id, Hand::Main, &mut deaths) {
            actions.push(ActionRecord {
                actor: actor_id.clone(),
                kind,
            });
        }

        let dual = ctx
            .roster
            .get(actor_id)
            .is_some_and(|a| a.is_alive() && equipment::can_dual_wield(a));
        if dual && ctx.roster.is_alive(&target_id) {
            if let Some(kind) = strike(combat, ctx, actor_id, &target_id, Hand::Off, &mut deaths) {
                actions.push(ActionRecord {
                    actor: actor_id.clone(),
                    kind,
                });
            }
        }
    }

    for participant in &mut combat.participants {
        for expired in participant.tick_effects() {
            debug!(entity = %participant.entity_id, effect = %expired, "effect expired");
        }
    }

    let outcome = check_outcome(combat, ctx.roster);
    if let Some(outcome) = &outcome {
        broadcast(combat, ctx.narrator, &format!("Combat is over: {}.", outcome));
    }

    RoundReport {
        combat_id: combat.id.clone(),
        round: combat.round,
        order,
        actions,
        deaths,
        outcome,
    }
}
