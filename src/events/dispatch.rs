//! Handler bindings and broadcast.
//!
//! Subscribers are registry objects; each binding pairs an owning object
//! with one or more event types and a reaction callback. A broadcast
//! routes one event to every handler whose declared type is the event's
//! type or an ancestor of it, exactly once per handler, in a
//! deterministic order:
//!
//! 1. ancestor-type groups before descendant-type groups,
//! 2. registration order within a group,
//! 3. a handler bound to several matching types fires at its
//!    ancestor-most position.
//!
//! Handlers only read state; they describe reactions by returning
//! actions, which the caller (the action queue) is responsible for
//! scheduling.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::actions::Action;
use crate::core::{Game, ObjectId};

use super::event::{Event, EventTypeId};

/// Identity of one handler binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

impl HandlerId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A reaction callback: reads the game and the event, optionally
/// returns actions to schedule.
pub type Handler = Box<dyn Fn(&Game, &Event) -> Option<Vec<Action>>>;

struct HandlerEntry {
    owner: ObjectId,
    event_types: Vec<EventTypeId>,
    callback: Handler,
}

/// Routes events to subscribed handlers.
pub struct Dispatch {
    handlers: FxHashMap<HandlerId, HandlerEntry>,

    /// Handler IDs per exact event type, in registration order.
    by_type: FxHashMap<EventTypeId, Vec<HandlerId>>,

    next_id: u64,
}

impl Dispatch {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: FxHashMap::default(),
            by_type: FxHashMap::default(),
            next_id: 0,
        }
    }

    /// Bind a callback for `owner` to the given event types.
    pub fn subscribe(
        &mut self,
        owner: ObjectId,
        event_types: &[EventTypeId],
        callback: Handler,
    ) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;

        for ty in event_types {
            self.by_type.entry(*ty).or_default().push(id);
        }

        self.handlers.insert(
            id,
            HandlerEntry {
                owner,
                event_types: event_types.to_vec(),
                callback,
            },
        );
        id
    }

    /// Remove every binding of `owner` to `ty`. Idempotent: unknown
    /// owners and never-subscribed types are no-ops.
    pub fn unsubscribe(&mut self, owner: ObjectId, ty: EventTypeId) {
        let removed: Vec<HandlerId> = self
            .by_type
            .get(&ty)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| {
                        self.handlers
                            .get(id)
                            .is_some_and(|entry| entry.owner == owner)
                    })
                    .collect()
            })
            .unwrap_or_default();

        if removed.is_empty() {
            return;
        }

        if let Some(ids) = self.by_type.get_mut(&ty) {
            ids.retain(|id| !removed.contains(id));
            if ids.is_empty() {
                self.by_type.remove(&ty);
            }
        }

        for id in removed {
            let drop_entry = {
                let entry = self.handlers.get_mut(&id).expect("indexed handler exists");
                entry.event_types.retain(|t| *t != ty);
                entry.event_types.is_empty()
            };
            if drop_entry {
                self.handlers.remove(&id);
            }
        }
    }

    /// Remove every binding owned by `owner`.
    pub fn unsubscribe_all(&mut self, owner: ObjectId) {
        let types: Vec<EventTypeId> = self
            .handlers
            .values()
            .filter(|entry| entry.owner == owner)
            .flat_map(|entry| entry.event_types.iter().copied())
            .collect();

        for ty in types {
            self.unsubscribe(owner, ty);
        }
    }

    /// Route an event to every matching handler exactly once; collect
    /// the returned actions.
    ///
    /// The caller schedules the result; broadcast never enqueues.
    pub fn broadcast(&self, game: &Game, event: &Event) -> Vec<Action> {
        let chain = game.event_types().ancestry(event.event_type);

        let mut seen: FxHashSet<HandlerId> = FxHashSet::default();
        let mut responses = Vec::new();

        // Ancestor groups fire before descendant groups.
        for ty in chain.iter().rev() {
            let Some(ids) = self.by_type.get(ty) else {
                continue;
            };
            for id in ids {
                if !seen.insert(*id) {
                    continue;
                }
                let entry = &self.handlers[id];
                if let Some(actions) = (entry.callback)(game, event) {
                    responses.extend(actions);
                }
            }
        }

        trace!(
            event_type = %event.event_type,
            handlers = seen.len(),
            responses = responses.len(),
            "broadcast"
        );
        responses
    }

    /// Total number of live handler bindings.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Whether `owner` has any binding to `ty`.
    #[must_use]
    pub fn is_subscribed(&self, owner: ObjectId, ty: EventTypeId) -> bool {
        self.by_type.get(&ty).is_some_and(|ids| {
            ids.iter().any(|id| {
                self.handlers
                    .get(id)
                    .is_some_and(|entry| entry.owner == owner)
            })
        })
    }
}

impl Default for Dispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("handlers", &self.handlers.len())
            .field("types", &self.by_type.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GameConfig;
    use crate::events::{ANY, PRE_ACTION, TRY_PHASE_CHANGE};

    // Handlers subscribe through the game so broadcast sees the same
    // dispatcher the game owns.
    fn game() -> Game {
        Game::new(GameConfig::new())
    }

    fn marker(source: ObjectId) -> Action {
        Action::new(crate::actions::CANCEL, source)
    }

    #[test]
    fn test_subscribe_and_broadcast() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");

        game.subscribe(
            actor,
            &[TRY_PHASE_CHANGE],
            Box::new(move |_, _| Some(vec![marker(actor)])),
        );

        let event = Event::new(TRY_PHASE_CHANGE, game.phase());
        let responses = game.broadcast(&event);
        assert_eq!(responses.len(), 1);
    }

    #[test]
    fn test_ancestor_handler_sees_descendant_event() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");
        let kill = game.register_action_kind("kill").unwrap();
        let pre_kill = game.action_kinds().pre_event(kill).unwrap();

        game.subscribe(
            actor,
            &[PRE_ACTION],
            Box::new(move |_, _| Some(vec![marker(actor)])),
        );

        let event = Event::new(pre_kill, game.phase());
        assert_eq!(game.broadcast(&event).len(), 1);

        // The reverse does not hold.
        let mut game = self::game();
        let actor = game.spawn_actor("Bob");
        let kill = game.register_action_kind("kill").unwrap();
        let pre_kill = game.action_kinds().pre_event(kill).unwrap();
        game.subscribe(
            actor,
            &[pre_kill],
            Box::new(move |_, _| Some(vec![marker(actor)])),
        );
        let generic = Event::new(PRE_ACTION, game.phase());
        assert!(game.broadcast(&generic).is_empty());
    }

    #[test]
    fn test_exactly_once_across_matching_types() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");
        let kill = game.register_action_kind("kill").unwrap();
        let pre_kill = game.action_kinds().pre_event(kill).unwrap();

        // One handler bound to three types on the same ancestry chain.
        game.subscribe(
            actor,
            &[pre_kill, PRE_ACTION, ANY],
            Box::new(move |_, _| Some(vec![marker(actor)])),
        );

        let event = Event::new(pre_kill, game.phase());
        assert_eq!(game.broadcast(&event).len(), 1);
    }

    #[test]
    fn test_ancestor_groups_fire_first() {
        let mut game = game();
        let generic = game.spawn_actor("generic");
        let specific = game.spawn_actor("specific");
        let kill = game.register_action_kind("kill").unwrap();
        let pre_kill = game.action_kinds().pre_event(kill).unwrap();

        // Specific subscription registered first; the generic one must
        // still fire before it.
        game.subscribe(
            specific,
            &[pre_kill],
            Box::new(move |_, _| Some(vec![marker(specific)])),
        );
        game.subscribe(
            generic,
            &[PRE_ACTION],
            Box::new(move |_, _| Some(vec![marker(generic)])),
        );

        let event = Event::new(pre_kill, game.phase());
        let responses = game.broadcast(&event);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].source, generic);
        assert_eq!(responses[1].source, specific);
    }

    #[test]
    fn test_registration_order_within_type() {
        let mut game = game();
        let first = game.spawn_actor("first");
        let second = game.spawn_actor("second");

        game.subscribe(
            first,
            &[TRY_PHASE_CHANGE],
            Box::new(move |_, _| Some(vec![marker(first)])),
        );
        game.subscribe(
            second,
            &[TRY_PHASE_CHANGE],
            Box::new(move |_, _| Some(vec![marker(second)])),
        );

        let responses = game.broadcast(&Event::new(TRY_PHASE_CHANGE, game.phase()));
        assert_eq!(responses[0].source, first);
        assert_eq!(responses[1].source, second);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");

        game.subscribe(
            actor,
            &[TRY_PHASE_CHANGE],
            Box::new(move |_, _| Some(vec![marker(actor)])),
        );
        assert_eq!(game.handler_count(), 1);

        game.unsubscribe(actor, TRY_PHASE_CHANGE);
        assert_eq!(game.handler_count(), 0);

        // Again, and for a type never subscribed: no-ops.
        game.unsubscribe(actor, TRY_PHASE_CHANGE);
        game.unsubscribe(actor, PRE_ACTION);
        assert_eq!(game.handler_count(), 0);

        assert!(game.broadcast(&Event::new(TRY_PHASE_CHANGE, game.phase())).is_empty());
    }

    #[test]
    fn test_unsubscribe_one_type_keeps_others() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");

        game.subscribe(
            actor,
            &[TRY_PHASE_CHANGE, PRE_ACTION],
            Box::new(move |_, _| Some(vec![marker(actor)])),
        );

        game.unsubscribe(actor, TRY_PHASE_CHANGE);
        assert_eq!(game.handler_count(), 1);
        assert!(game.broadcast(&Event::new(TRY_PHASE_CHANGE, game.phase())).is_empty());
        assert_eq!(game.broadcast(&Event::new(PRE_ACTION, game.phase())).len(), 1);
    }

    #[test]
    fn test_handler_returning_none() {
        let mut game = game();
        let actor = game.spawn_actor("Alice");

        game.subscribe(actor, &[ANY], Box::new(|_, _| None));

        assert!(game.broadcast(&Event::new(TRY_PHASE_CHANGE, game.phase())).is_empty());
    }
}
