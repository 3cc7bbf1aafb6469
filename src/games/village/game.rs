//! Village game implementation.

use crate::actions::{Action, ActionKindId, ActionQueue, Effect, ResolveError};
use crate::auxiliary::AuxSpec;
use crate::convert::{resolve_child, ConvertError, ConverterTable, TargetType, Value};
use crate::core::{Game, GameConfig, ObjectId, ObjectKind, RegistryError};
use crate::events::{Event, PRE_ACTION, TRY_PHASE_CHANGE};

/// Action kinds the village registers.
#[derive(Clone, Copy, Debug)]
pub struct VillageKinds {
    /// Record a vote on the shared tally.
    pub vote: ActionKindId,
    /// Mark the target dead.
    pub kill: ActionKindId,
    /// Grant one-phase protection.
    pub protect: ActionKindId,
}

/// A small social-deduction game built on the kernel.
pub struct VillageGame {
    /// The registry; exposed so tests and drivers can inspect state.
    pub game: Game,
    kinds: VillageKinds,
    tally: ObjectId,
    moderator: ObjectId,
}

/// Builder for creating a village.
#[derive(Clone, Debug, Default)]
pub struct VillageBuilder {
    villagers: Vec<String>,
    killers: Vec<String>,
    protectors: Vec<String>,
}

impl VillageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an actor with only the vote ability.
    pub fn villager(mut self, name: impl Into<String>) -> Self {
        self.villagers.push(name.into());
        self
    }

    /// Add an actor with vote and kill abilities.
    pub fn killer(mut self, name: impl Into<String>) -> Self {
        self.killers.push(name.into());
        self
    }

    /// Add an actor with vote and protect abilities.
    pub fn protector(mut self, name: impl Into<String>) -> Self {
        self.protectors.push(name.into());
        self
    }

    /// Build the game and its initial objects.
    pub fn build(self) -> Result<VillageGame, RegistryError> {
        let mut game = Game::new(GameConfig::new());

        let kinds = VillageKinds {
            vote: game.register_action_kind("vote")?,
            kill: game.register_action_kind("kill")?,
            protect: game.register_action_kind("protect")?,
        };

        let tally = AuxSpec::new("vote_tally", "tally").get_or_create(&mut game)?;
        let moderator = AuxSpec::new("moderator", "moderator").get_or_create(&mut game)?;

        for name in &self.villagers {
            let actor = game.spawn_actor(name.clone());
            game.spawn_ability(actor, "vote")?;
        }
        for name in &self.killers {
            let actor = game.spawn_actor(name.clone());
            game.spawn_ability(actor, "vote")?;
            game.spawn_ability(actor, "kill")?;
        }
        for name in &self.protectors {
            let actor = game.spawn_actor(name.clone());
            game.spawn_ability(actor, "vote")?;
            game.spawn_ability(actor, "protect")?;
        }

        Ok(VillageGame {
            game,
            kinds,
            tally,
            moderator,
        })
    }
}

impl VillageGame {
    /// The registered action kinds.
    #[must_use]
    pub fn kinds(&self) -> VillageKinds {
        self.kinds
    }

    /// The shared vote tally object.
    #[must_use]
    pub fn tally(&self) -> ObjectId {
        self.tally
    }

    /// Exact-name actor lookup.
    #[must_use]
    pub fn actor(&self, name: &str) -> Option<ObjectId> {
        self.game.actor_named(name).map(|obj| obj.id)
    }

    fn ability(&self, owner: ObjectId, name: &str) -> Result<ObjectId, RegistryError> {
        self.game
            .child_named(owner, ObjectKind::Ability, name)
            .map(|obj| obj.id)
            .ok_or(RegistryError::UnknownObject(owner))
    }

    /// Build a vote action. Voting only appends to the tally; it has no
    /// other side effect.
    pub fn vote(&self, voter: ObjectId, target: ObjectId) -> Result<Action, RegistryError> {
        let ability = self.ability(voter, "vote")?;
        Ok(Action::new(self.kinds.vote, ability)
            .with_target(target)
            .with_effect(Effect::AppendRecord {
                target: self.tally,
                key: "votes".to_string(),
                row: (voter.as_i64(), target.as_i64()),
            }))
    }

    /// Build a vote action from loose caller input (names, paths, or
    /// handles), coercing each named parameter through the table.
    pub fn vote_from_input(
        &self,
        table: &ConverterTable,
        voter: &Value,
        target: &Value,
    ) -> Result<Action, ConvertError> {
        let voter = table
            .convert(&self.game, TargetType::Actor, voter)?
            .object()
            .expect("actor conversions yield objects");
        let target = table
            .convert(&self.game, TargetType::Actor, target)?
            .object()
            .expect("actor conversions yield objects");
        let ability = resolve_child(
            &self.game,
            table.matcher(),
            voter,
            ObjectKind::Ability,
            "vote",
        )?;

        Ok(Action::new(self.kinds.vote, ability)
            .with_target(target)
            .with_effect(Effect::AppendRecord {
                target: self.tally,
                key: "votes".to_string(),
                row: (voter.as_i64(), target.as_i64()),
            }))
    }

    /// Build a kill action from the killer's kill ability.
    pub fn kill(&self, killer: ObjectId, target: ObjectId) -> Result<Action, RegistryError> {
        let ability = self.ability(killer, "kill")?;
        Ok(Action::new(self.kinds.kill, ability)
            .with_target(target)
            .with_effect(Effect::SetStatus {
                target,
                key: "dead".to_string(),
                value: 1,
            }))
    }

    /// Protect an actor until the end of the current phase.
    ///
    /// The protection is a self-expiring aux object vetoing any kill on
    /// its ward; repeated grants reuse the same object.
    pub fn protect(
        &mut self,
        guard: ObjectId,
        ward: ObjectId,
    ) -> Result<ObjectId, RegistryError> {
        self.ability(guard, "protect")?;

        let key = format!("protect:{}", ward.raw());
        let kill = self.kinds.kill;
        let (id, created) = AuxSpec::new(key, "protection")
            .with_status("ward", ward.as_i64())
            .expiring()
            .ensure(&mut self.game)?;
        if created {
            self.game.subscribe(
                id,
                &[PRE_ACTION],
                Box::new(move |_, event| {
                    let view = event.action.as_ref()?;
                    if view.kind == kill && view.targets.contains(&ward) {
                        Some(vec![Action::cancel_action(id, view.id)])
                    } else {
                        None
                    }
                }),
            );
        }
        Ok(id)
    }

    /// Resolve a set of actions in one pass.
    pub fn resolve(&mut self, actions: Vec<Action>) -> Result<(), ResolveError> {
        crate::actions::resolve(&mut self.game, actions)
    }

    /// Close the current phase: announce the attempt, then resolve the
    /// responses together with the phase-change action itself.
    pub fn end_phase(&mut self) -> Result<(), ResolveError> {
        let attempt = Event::new(TRY_PHASE_CHANGE, self.game.phase());
        let responses = self.game.broadcast(&attempt);

        let mut queue = ActionQueue::new();
        for action in responses {
            queue.enqueue(&mut self.game, action);
        }
        let change = Action::phase_change(self.moderator);
        queue.enqueue(&mut self.game, change);
        queue.process_all(&mut self.game)
    }

    /// The recorded votes, oldest first.
    #[must_use]
    pub fn votes(&self) -> Vec<(ObjectId, ObjectId)> {
        self.game
            .object(self.tally)
            .map(|tally| {
                tally
                    .records("votes")
                    .iter()
                    .map(|(voter, target)| {
                        (ObjectId::new(*voter as u32), ObjectId::new(*target as u32))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether an actor has been killed.
    #[must_use]
    pub fn is_dead(&self, actor: ObjectId) -> bool {
        self.game
            .object(actor)
            .is_some_and(|obj| obj.status("dead", 0) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn village() -> VillageGame {
        VillageBuilder::new()
            .villager("Alice")
            .villager("Bob")
            .killer("Mallory")
            .protector("Grace")
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_registers_everything() {
        let village = village();

        assert_eq!(village.game.actors().count(), 4);
        assert!(village.actor("Alice").is_some());
        assert!(village.actor("Nobody").is_none());

        let mallory = village.actor("Mallory").unwrap();
        assert!(village
            .game
            .child_named(mallory, ObjectKind::Ability, "kill")
            .is_some());
    }

    #[test]
    fn test_vote_requires_the_ability() {
        let mut village = village();
        let alice = village.actor("Alice").unwrap();
        let bob = village.actor("Bob").unwrap();

        let vote = village.vote(alice, bob).unwrap();
        village.resolve(vec![vote]).unwrap();
        assert_eq!(village.votes(), vec![(alice, bob)]);

        // The tally object cannot vote.
        let tally = village.tally();
        assert!(village.vote(tally, bob).is_err());
    }

    #[test]
    fn test_kill_marks_dead() {
        let mut village = village();
        let mallory = village.actor("Mallory").unwrap();
        let bob = village.actor("Bob").unwrap();

        let kill = village.kill(mallory, bob).unwrap();
        village.resolve(vec![kill]).unwrap();

        assert!(village.is_dead(bob));
        assert!(!village.is_dead(mallory));

        // Villagers cannot kill.
        let alice = village.actor("Alice").unwrap();
        assert!(village.kill(alice, bob).is_err());
    }

    #[test]
    fn test_protection_expires_at_phase_end() {
        let mut village = village();
        let grace = village.actor("Grace").unwrap();
        let mallory = village.actor("Mallory").unwrap();
        let bob = village.actor("Bob").unwrap();

        village.protect(grace, bob).unwrap();

        // Protected: the kill is vetoed.
        let kill = village.kill(mallory, bob).unwrap();
        village.resolve(vec![kill]).unwrap();
        assert!(!village.is_dead(bob));

        // The phase boundary removes the protection.
        village.end_phase().unwrap();
        assert_eq!(village.game.aux_lookup(&format!("protect:{}", bob.raw())), None);

        let kill = village.kill(mallory, bob).unwrap();
        village.resolve(vec![kill]).unwrap();
        assert!(village.is_dead(bob));
    }

    #[test]
    fn test_protect_twice_reuses_the_marker() {
        let mut village = village();
        let grace = village.actor("Grace").unwrap();
        let bob = village.actor("Bob").unwrap();

        let first = village.protect(grace, bob).unwrap();
        let second = village.protect(grace, bob).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_end_phase_advances_the_cycle() {
        let mut village = village();

        assert_eq!(village.game.phase_name(), "day");
        village.end_phase().unwrap();
        assert_eq!(village.game.phase_name(), "night");
    }
}
