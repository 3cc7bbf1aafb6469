//! Effects: the closed mutation vocabulary of action execution.
//!
//! All externally visible change to shared state flows through effect
//! application, which happens exactly once per executed action. Handlers
//! and constraints never mutate the registry directly; they describe
//! change by returning actions carrying effects.
//!
//! Games give meaning to status keys and record keys; the kernel only
//! applies the mutations.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::core::{Game, ObjectId, PhaseId};

use super::action::ActionId;

/// An atomic mutation applied during action execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Set an object's status value.
    SetStatus {
        target: ObjectId,
        key: String,
        value: i64,
    },

    /// Add a delta to an object's status value.
    ModifyStatus {
        target: ObjectId,
        key: String,
        delta: i64,
    },

    /// Append an ordered `(i64, i64)` row to an object's records.
    AppendRecord {
        target: ObjectId,
        key: String,
        row: (i64, i64),
    },

    /// Mark a pending action canceled. Monotonic; unknown or already
    /// settled targets are ignored.
    Cancel { action: ActionId },

    /// Remove an object (and its children) from the registry.
    RemoveObject { target: ObjectId },

    /// Jump to a specific phase.
    SetPhase { phase: PhaseId },

    /// Advance to the next phase in the cycle, wrapping to the first
    /// and incrementing the day counter at the end.
    AdvancePhase,
}

/// Result of applying a single effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EffectOutcome {
    /// Effect applied.
    Applied,
    /// Effect could not apply (e.g. target already removed).
    Failed(String),
}

/// Applies effects to the registry.
///
/// Failures are reported in the outcome and logged, never raised:
/// execution has no return channel, and a mid-list failure must not
/// block the remaining effects.
pub struct EffectResolver;

impl EffectResolver {
    /// Apply a full effect list in order.
    pub fn resolve_all(
        game: &mut Game,
        canceled: &mut FxHashSet<ActionId>,
        effects: &[Effect],
    ) -> Vec<EffectOutcome> {
        effects
            .iter()
            .map(|effect| Self::resolve(game, canceled, effect))
            .collect()
    }

    /// Apply a single effect.
    pub fn resolve(
        game: &mut Game,
        canceled: &mut FxHashSet<ActionId>,
        effect: &Effect,
    ) -> EffectOutcome {
        trace!(?effect, "applying effect");

        match effect {
            Effect::SetStatus { target, key, value } => match game.object_mut(*target) {
                Some(obj) => {
                    obj.set_status(key.clone(), *value);
                    EffectOutcome::Applied
                }
                None => Self::missing(*target),
            },

            Effect::ModifyStatus { target, key, delta } => match game.object_mut(*target) {
                Some(obj) => {
                    obj.modify_status(key, *delta);
                    EffectOutcome::Applied
                }
                None => Self::missing(*target),
            },

            Effect::AppendRecord { target, key, row } => match game.object_mut(*target) {
                Some(obj) => {
                    obj.append_record(key.clone(), *row);
                    EffectOutcome::Applied
                }
                None => Self::missing(*target),
            },

            Effect::Cancel { action } => {
                canceled.insert(*action);
                EffectOutcome::Applied
            }

            Effect::RemoveObject { target } => {
                if game.remove_object(*target).is_some() {
                    EffectOutcome::Applied
                } else {
                    Self::missing(*target)
                }
            }

            Effect::SetPhase { phase } => {
                if game.config().phase_name(*phase).is_some() {
                    game.set_phase(*phase);
                    EffectOutcome::Applied
                } else {
                    warn!(%phase, "phase outside the configured cycle");
                    EffectOutcome::Failed(format!("{phase} is not configured"))
                }
            }

            Effect::AdvancePhase => {
                game.advance_phase();
                EffectOutcome::Applied
            }
        }
    }

    fn missing(target: ObjectId) -> EffectOutcome {
        warn!(%target, "effect target no longer in the registry");
        EffectOutcome::Failed(format!("{target} not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GameConfig;

    fn game_with_actor() -> (Game, ObjectId) {
        let mut game = Game::new(GameConfig::new());
        let actor = game.spawn_actor("Alice");
        (game, actor)
    }

    #[test]
    fn test_set_and_modify_status() {
        let (mut game, actor) = game_with_actor();
        let mut canceled = FxHashSet::default();

        let outcomes = EffectResolver::resolve_all(
            &mut game,
            &mut canceled,
            &[
                Effect::SetStatus {
                    target: actor,
                    key: "dead".to_string(),
                    value: 1,
                },
                Effect::ModifyStatus {
                    target: actor,
                    key: "dead".to_string(),
                    delta: -1,
                },
            ],
        );

        assert_eq!(outcomes, vec![EffectOutcome::Applied, EffectOutcome::Applied]);
        assert_eq!(game.object(actor).unwrap().status("dead", 0), 0);
    }

    #[test]
    fn test_append_record() {
        let (mut game, actor) = game_with_actor();
        let mut canceled = FxHashSet::default();

        EffectResolver::resolve(
            &mut game,
            &mut canceled,
            &Effect::AppendRecord {
                target: actor,
                key: "visits".to_string(),
                row: (3, 4),
            },
        );

        assert_eq!(game.object(actor).unwrap().records("visits"), &[(3, 4)]);
    }

    #[test]
    fn test_cancel_marks_action() {
        let (mut game, _) = game_with_actor();
        let mut canceled = FxHashSet::default();

        let outcome = EffectResolver::resolve(
            &mut game,
            &mut canceled,
            &Effect::Cancel {
                action: ActionId::new(7),
            },
        );

        assert_eq!(outcome, EffectOutcome::Applied);
        assert!(canceled.contains(&ActionId::new(7)));
    }

    #[test]
    fn test_remove_object() {
        let (mut game, actor) = game_with_actor();
        let mut canceled = FxHashSet::default();

        let outcome =
            EffectResolver::resolve(&mut game, &mut canceled, &Effect::RemoveObject { target: actor });
        assert_eq!(outcome, EffectOutcome::Applied);
        assert!(game.object(actor).is_none());

        // Second removal fails quietly.
        let outcome =
            EffectResolver::resolve(&mut game, &mut canceled, &Effect::RemoveObject { target: actor });
        assert!(matches!(outcome, EffectOutcome::Failed(_)));
    }

    #[test]
    fn test_phase_effects() {
        let (mut game, _) = game_with_actor();
        let mut canceled = FxHashSet::default();

        EffectResolver::resolve(&mut game, &mut canceled, &Effect::AdvancePhase);
        assert_eq!(game.phase(), PhaseId::new(1));

        // Wrap increments the day counter.
        EffectResolver::resolve(&mut game, &mut canceled, &Effect::AdvancePhase);
        assert_eq!(game.phase(), PhaseId::new(0));
        assert_eq!(game.day(), 2);

        let outcome = EffectResolver::resolve(
            &mut game,
            &mut canceled,
            &Effect::SetPhase {
                phase: PhaseId::new(9),
            },
        );
        assert!(matches!(outcome, EffectOutcome::Failed(_)));
        assert_eq!(game.phase(), PhaseId::new(0));
    }
}
