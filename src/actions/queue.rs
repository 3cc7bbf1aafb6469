//! Priority-ordered, depth-bounded action resolution.
//!
//! The queue turns "one action" into "that action, everything it
//! provoked, and everything those provoked" in a single deterministic
//! pass:
//!
//! 1. Pop the *batch*: every pending action sharing the maximum
//!    priority, in insertion order.
//! 2. Broadcast each batch action's pre event and collect every
//!    handler response across the whole batch.
//! 3. Fully resolve the responses in a fresh sub-queue one recursion
//!    level deeper, before anything in the batch executes. This is
//!    where vetoes land.
//! 4. Execute every batch action not yet canceled, appending each to
//!    history in batch order. Canceled actions enter history too,
//!    marked canceled, and never execute.
//! 5. Broadcast post events for the executed actions only, and resolve
//!    those responses in another sub-queue one level deeper.
//!
//! So for any batch: every pre-phase side effect resolves before any
//! execution, and every execution happens before any post-phase side
//! effect.
//!
//! Recursion is bounded by [`RECURSION_LIMIT`]. Exceeding it aborts the
//! pass: history already appended stands, the rest of the in-flight
//! action tree is abandoned. This is a hard backstop against mutually
//! triggering reactions, not a recoverable error.

use std::cmp::Ordering;
use std::mem;

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::core::Game;

use super::action::{Action, ActionId, ActionRecord};
use super::effect::EffectResolver;

/// Maximum reaction nesting depth before resolution aborts.
pub const RECURSION_LIMIT: usize = 20;

/// Resolution failures. Fatal to the pass, not to the process.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Reactions kept provoking reactions past [`RECURSION_LIMIT`]
    /// levels.
    #[error("reaction chain exceeded {limit} nesting levels")]
    RecursionLimit { limit: usize },
}

#[derive(Debug)]
struct QueueEntry {
    id: ActionId,
    action: Action,
}

/// A priority-ordered scheduler of pending actions.
///
/// Pending actions execute in strictly decreasing priority order;
/// equal priorities keep insertion order. An action is processed at
/// most once.
#[derive(Debug, Default)]
pub struct ActionQueue {
    /// Pending actions in insertion order; batches are selected by
    /// priority scan, so ties stay first-in-first-out.
    entries: Vec<QueueEntry>,

    /// Cancellations observed so far in this pass. Monotonic.
    canceled: FxHashSet<ActionId>,
}

impl ActionQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            canceled: FxHashSet::default(),
        }
    }

    /// Enqueue an action, assigning its identity.
    pub fn enqueue(&mut self, game: &mut Game, action: Action) -> ActionId {
        let id = game.alloc_action_id();
        self.entries.push(QueueEntry { id, action });
        id
    }

    /// Number of pending actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pop every pending action sharing the maximum priority, in
    /// insertion order.
    fn pop_batch(&mut self) -> Vec<QueueEntry> {
        let Some(top) = self
            .entries
            .iter()
            .map(|entry| entry.action.priority)
            .max_by(f64::total_cmp)
        else {
            return Vec::new();
        };

        let (batch, rest) = mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.action.priority.total_cmp(&top) == Ordering::Equal);
        self.entries = rest;
        batch
    }

    /// Resolve the current highest-priority batch and everything it
    /// provokes.
    ///
    /// On a recursion fault the queue keeps its remaining entries, but
    /// the pass's guarantees no longer hold; callers should treat the
    /// error as fatal to the resolution.
    pub fn process_next_batch(&mut self, game: &mut Game) -> Result<(), ResolveError> {
        let batch = self.pop_batch();
        if batch.is_empty() {
            return Ok(());
        }

        let mut canceled = mem::take(&mut self.canceled);
        let result = Self::resolve_batch(game, &mut canceled, batch, 0);
        self.canceled = canceled;
        result
    }

    /// Resolve batches until nothing is pending.
    pub fn process_all(&mut self, game: &mut Game) -> Result<(), ResolveError> {
        while !self.is_empty() {
            self.process_next_batch(game)?;
        }
        Ok(())
    }

    fn resolve_batch(
        game: &mut Game,
        canceled: &mut FxHashSet<ActionId>,
        mut batch: Vec<QueueEntry>,
        depth: usize,
    ) -> Result<(), ResolveError> {
        debug!(depth, size = batch.len(), "resolving batch");

        // Pre events are broadcast for every batch action, including
        // ones a reaction is about to cancel.
        let mut responses = Vec::new();
        for entry in &batch {
            let event = entry.action.pre(entry.id, game);
            responses.append(&mut game.broadcast(&event));
        }
        Self::resolve_reactions(game, canceled, responses, depth)?;

        // Execute survivors; everything enters history in batch order.
        let mut executed = Vec::new();
        for mut entry in batch.drain(..) {
            if canceled.contains(&entry.id) {
                entry.action.cancel();
            }
            if entry.action.canceled() {
                game.push_history(ActionRecord::of(entry.id, &entry.action, depth));
                continue;
            }
            EffectResolver::resolve_all(game, canceled, &entry.action.effects);
            game.push_history(ActionRecord::of(entry.id, &entry.action, depth));
            executed.push(entry);
        }

        // Post events only for actions that actually ran.
        let mut responses = Vec::new();
        for entry in &executed {
            let event = entry.action.post(entry.id, game);
            responses.append(&mut game.broadcast(&event));
        }
        Self::resolve_reactions(game, canceled, responses, depth)
    }

    /// Fully resolve a response set in a fresh sub-queue one level
    /// deeper than the batch that provoked it.
    fn resolve_reactions(
        game: &mut Game,
        canceled: &mut FxHashSet<ActionId>,
        responses: Vec<Action>,
        depth: usize,
    ) -> Result<(), ResolveError> {
        if responses.is_empty() {
            return Ok(());
        }
        if depth >= RECURSION_LIMIT {
            warn!(depth, "abandoning in-flight reactions: nesting limit reached");
            return Err(ResolveError::RecursionLimit {
                limit: RECURSION_LIMIT,
            });
        }

        let mut sub = ActionQueue::new();
        for action in responses {
            sub.enqueue(game, action);
        }
        while !sub.entries.is_empty() {
            let batch = sub.pop_batch();
            Self::resolve_batch(game, canceled, batch, depth + 1)?;
        }
        Ok(())
    }
}

/// Resolve a set of actions against a game in one pass.
///
/// Convenience for the common "enqueue these, drain everything" shape.
pub fn resolve(game: &mut Game, actions: Vec<Action>) -> Result<(), ResolveError> {
    let mut queue = ActionQueue::new();
    for action in actions {
        queue.enqueue(game, action);
    }
    queue.process_all(game)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Effect;
    use crate::core::{GameConfig, ObjectId};

    fn game() -> Game {
        Game::new(GameConfig::new())
    }

    fn mark(kind: crate::actions::ActionKindId, source: ObjectId, tag: i64) -> Action {
        Action::new(kind, source).with_effect(Effect::AppendRecord {
            target: source,
            key: "log".to_string(),
            row: (tag, 0),
        })
    }

    #[test]
    fn test_priority_order_with_fifo_ties() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");
        let kind = game.register_action_kind("noop").unwrap();

        let mut queue = ActionQueue::new();
        queue.enqueue(&mut game, mark(kind, actor, 1).with_priority(0.0));
        queue.enqueue(&mut game, mark(kind, actor, 2).with_priority(5.0));
        queue.enqueue(&mut game, mark(kind, actor, 3).with_priority(0.0));
        queue.enqueue(&mut game, mark(kind, actor, 4).with_priority(-2.0));
        queue.enqueue(&mut game, mark(kind, actor, 5).with_priority(5.0));

        queue.process_all(&mut game).unwrap();

        let tags: Vec<i64> = game
            .object(actor)
            .unwrap()
            .records("log")
            .iter()
            .map(|row| row.0)
            .collect();
        assert_eq!(tags, vec![2, 5, 1, 3, 4]);
    }

    #[test]
    fn test_equal_priority_actions_share_a_batch() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");
        let kind = game.register_action_kind("noop").unwrap();

        let mut queue = ActionQueue::new();
        queue.enqueue(&mut game, mark(kind, actor, 1));
        queue.enqueue(&mut game, mark(kind, actor, 2));
        queue.enqueue(&mut game, mark(kind, actor, 3).with_priority(-1.0));

        queue.process_next_batch(&mut game).unwrap();
        assert_eq!(game.object(actor).unwrap().records("log").len(), 2);
        assert_eq!(queue.len(), 1);

        queue.process_next_batch(&mut game).unwrap();
        assert_eq!(game.object(actor).unwrap().records("log").len(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_canceled_action_skips_execution_and_post() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");
        let watcher = game.spawn_actor("watcher");
        let kill = game.register_action_kind("kill").unwrap();
        let pre_kill = game.action_kinds().pre_event(kill).unwrap();
        let post_kill = game.action_kinds().post_event(kill).unwrap();

        // Veto every kill at its pre event.
        game.subscribe(
            watcher,
            &[pre_kill],
            Box::new(move |_, event| {
                let view = event.action.as_ref()?;
                Some(vec![Action::cancel_action(watcher, view.id)])
            }),
        );
        // A post handler that would leave a visible mark.
        game.subscribe(
            watcher,
            &[post_kill],
            Box::new(move |_, _| {
                Some(vec![Action::new(kill, watcher).with_effect(Effect::SetStatus {
                    target: watcher,
                    key: "post_seen".to_string(),
                    value: 1,
                })])
            }),
        );

        let kill_action = Action::new(kill, actor).with_effect(Effect::SetStatus {
            target: actor,
            key: "dead".to_string(),
            value: 1,
        });
        resolve(&mut game, vec![kill_action]).unwrap();

        // Never executed, post never broadcast.
        assert_eq!(game.object(actor).unwrap().status("dead", 0), 0);
        assert_eq!(game.object(watcher).unwrap().status("post_seen", 0), 0);

        // Both the cancel and the canceled kill are in history; the kill
        // is marked canceled.
        let kill_record = game
            .history()
            .iter()
            .find(|rec| rec.kind == kill)
            .unwrap();
        assert!(kill_record.canceled);
        assert!(game.history().iter().any(|rec| rec.kind == crate::actions::CANCEL));
    }

    #[test]
    fn test_pre_effects_resolve_before_any_batch_execution() {
        // Two equal-priority kills; a constraint cancels the second
        // during the shared pre round, so it must not run even though
        // the first already executed.
        let mut game = game();
        let alice = game.spawn_actor("Alice");
        let bob = game.spawn_actor("Bob");
        let guard = game.spawn_actor("guard");
        let kill = game.register_action_kind("kill").unwrap();
        let pre_kill = game.action_kinds().pre_event(kill).unwrap();

        game.subscribe(
            guard,
            &[pre_kill],
            Box::new(move |_, event| {
                let view = event.action.as_ref()?;
                if view.targets.contains(&bob) {
                    Some(vec![Action::cancel_action(guard, view.id)])
                } else {
                    None
                }
            }),
        );

        let kill_alice = Action::new(kill, guard)
            .with_target(alice)
            .with_effect(Effect::SetStatus {
                target: alice,
                key: "dead".to_string(),
                value: 1,
            });
        let kill_bob = Action::new(kill, guard)
            .with_target(bob)
            .with_effect(Effect::SetStatus {
                target: bob,
                key: "dead".to_string(),
                value: 1,
            });
        resolve(&mut game, vec![kill_alice, kill_bob]).unwrap();

        assert_eq!(game.object(alice).unwrap().status("dead", 0), 1);
        assert_eq!(game.object(bob).unwrap().status("dead", 0), 0);
    }

    #[test]
    fn test_post_reactions_run_after_whole_batch() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");
        let echo = game.spawn_actor("echo");
        let noop = game.register_action_kind("noop").unwrap();
        let post_noop = game.action_kinds().post_event(noop).unwrap();
        let react = game.register_action_kind("react").unwrap();

        game.subscribe(
            echo,
            &[post_noop],
            Box::new(move |_, _| {
                Some(vec![Action::new(react, echo).with_effect(Effect::AppendRecord {
                    target: echo,
                    key: "log".to_string(),
                    row: (99, 0),
                })])
            }),
        );

        let mut queue = ActionQueue::new();
        queue.enqueue(&mut game, mark(noop, actor, 1));
        queue.enqueue(&mut game, mark(noop, actor, 2));
        queue.process_all(&mut game).unwrap();

        // Batch actions first (in order), then the two post reactions.
        let depths: Vec<usize> = game.history().iter().map(|rec| rec.depth).collect();
        assert_eq!(depths, vec![0, 0, 1, 1]);
        assert_eq!(game.object(echo).unwrap().records("log").len(), 2);
    }

    #[test]
    fn test_recursion_limit_faults() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");
        let echo_kind = game.register_action_kind("echo").unwrap();
        let post_echo = game.action_kinds().post_event(echo_kind).unwrap();

        // Every executed echo provokes another echo.
        game.subscribe(
            actor,
            &[post_echo],
            Box::new(move |_, _| Some(vec![Action::new(echo_kind, actor)])),
        );

        let err = resolve(&mut game, vec![Action::new(echo_kind, actor)]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::RecursionLimit {
                limit: RECURSION_LIMIT
            }
        );

        // One echo executed per nesting level before the fault; that
        // history stands.
        assert_eq!(game.history().len(), RECURSION_LIMIT + 1);
    }

    #[test]
    fn test_recursion_limit_faults_before_any_execution_on_pre_loop() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");
        let echo_kind = game.register_action_kind("echo").unwrap();
        let pre_echo = game.action_kinds().pre_event(echo_kind).unwrap();

        // A pre-event loop never lets any echo reach execution.
        game.subscribe(
            actor,
            &[pre_echo],
            Box::new(move |_, _| Some(vec![Action::new(echo_kind, actor)])),
        );

        let err = resolve(&mut game, vec![Action::new(echo_kind, actor)]).unwrap_err();
        assert!(matches!(err, ResolveError::RecursionLimit { .. }));
        assert!(game.history().is_empty());
    }

    #[test]
    fn test_history_depth_tracks_reaction_nesting() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");
        let ping = game.register_action_kind("ping").unwrap();
        let pong = game.register_action_kind("pong").unwrap();
        let post_ping = game.action_kinds().post_event(ping).unwrap();

        game.subscribe(
            actor,
            &[post_ping],
            Box::new(move |_, _| Some(vec![Action::new(pong, actor)])),
        );

        resolve(&mut game, vec![Action::new(ping, actor)]).unwrap();

        let history = game.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, ping);
        assert_eq!(history[0].depth, 0);
        assert_eq!(history[1].kind, pong);
        assert_eq!(history[1].depth, 1);
    }

    #[test]
    fn test_empty_queue_is_a_noop() {
        let mut game = game();
        let mut queue = ActionQueue::new();
        queue.process_next_batch(&mut game).unwrap();
        queue.process_all(&mut game).unwrap();
        assert!(game.history().is_empty());
    }
}
