//! The object registry.
//!
//! One [`Game`] owns every live object of one game instance, assigns
//! all identity, and is the single mutation boundary handed to every
//! operation. It also carries the per-game registries (event types,
//! action kinds), the dispatcher, the phase cycle position, and the
//! append-only action history.
//!
//! Objects are created only through the `spawn_*` operations, which
//! register the object as the final construction step; callers never
//! register objects manually. An object belongs to its registry until
//! explicitly removed.

use im::Vector;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::actions::{Action, ActionId, ActionKindId, ActionKinds, ActionRecord};
use crate::convert::{TargetType, ValueKind};
use crate::events::{Dispatch, Event, EventTypeId, EventTypes, Handler, HandlerId};

use super::config::{GameConfig, PhaseId};
use super::object::{GameObject, ObjectId, ObjectKind};

/// Identity and registration conflicts.
///
/// All of these are logic errors in game content or setup code; they
/// are raised immediately and never silently coerced.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// Referenced object does not exist in this registry.
    #[error("{0} not found in the registry")]
    UnknownObject(ObjectId),

    /// The object cannot own a child of that kind.
    #[error("{parent} cannot own a {child:?}")]
    InvalidParent { parent: ObjectId, child: ObjectKind },

    /// The parent already owns a same-kind child with that name.
    #[error("{parent} already owns a {kind:?} named '{name}'")]
    DuplicateChild {
        parent: ObjectId,
        kind: ObjectKind,
        name: String,
    },

    /// An aux key is bound to a different concrete type.
    #[error("aux key '{key}' is bound to type '{existing}', not '{requested}'")]
    AuxTypeMismatch {
        key: String,
        existing: String,
        requested: String,
    },

    /// Event type name re-registered with a different parent.
    #[error("event type '{name}' is already registered with a different parent")]
    EventTypeConflict { name: String },

    /// Referenced event type was never registered.
    #[error("unknown event type {0}")]
    UnknownEventType(EventTypeId),

    /// Action kind name re-registered with different pre/post events.
    #[error("action kind '{name}' is already registered with different events")]
    ActionKindConflict { name: String },

    /// A coercion for this (target, source) pair already exists.
    #[error("a converter for ({target:?}, {kind:?}) is already registered")]
    DuplicateConverter {
        target: TargetType,
        kind: ValueKind,
    },
}

/// The object registry and per-game state for one game instance.
#[derive(Debug)]
pub struct Game {
    config: GameConfig,

    objects: FxHashMap<ObjectId, GameObject>,
    /// Object IDs in creation order, for deterministic iteration.
    order: Vec<ObjectId>,
    /// Aux key index: key -> aux object.
    aux_keys: FxHashMap<String, ObjectId>,

    event_types: EventTypes,
    action_kinds: ActionKinds,
    dispatch: Dispatch,

    phase: PhaseId,
    day: u32,

    history: Vector<ActionRecord>,

    next_object: u32,
    next_action: u64,
}

impl Game {
    /// Create a game from a configuration.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        assert!(config.phase_count() > 0, "Must configure at least 1 phase");

        let mut event_types = EventTypes::standard();
        let action_kinds = ActionKinds::standard(&mut event_types);

        Self {
            config,
            objects: FxHashMap::default(),
            order: Vec::new(),
            aux_keys: FxHashMap::default(),
            event_types,
            action_kinds,
            dispatch: Dispatch::new(),
            phase: PhaseId::default(),
            day: 1,
            history: Vector::new(),
            next_object: 0,
            next_action: 0,
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    // === Object Creation ===

    fn alloc_object(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next_object);
        self.next_object += 1;
        id
    }

    pub(crate) fn spawn_object(
        &mut self,
        kind: ObjectKind,
        name: impl Into<String>,
        parent: Option<ObjectId>,
        type_tag: Option<String>,
    ) -> ObjectId {
        let id = self.alloc_object();
        let obj = GameObject::new(id, name, kind, parent, type_tag);
        debug!(object = %obj, "registered");
        self.objects.insert(id, obj);
        self.order.push(id);
        id
    }

    /// Create and register an actor.
    pub fn spawn_actor(&mut self, name: impl Into<String>) -> ObjectId {
        self.spawn_object(ObjectKind::Actor, name, None, None)
    }

    /// Create and register an ability owned by an actor.
    pub fn spawn_ability(
        &mut self,
        owner: ObjectId,
        name: impl Into<String>,
    ) -> Result<ObjectId, RegistryError> {
        self.spawn_child(owner, ObjectKind::Ability, name.into())
    }

    /// Create and register a trigger owned by an actor.
    pub fn spawn_trigger(
        &mut self,
        owner: ObjectId,
        name: impl Into<String>,
    ) -> Result<ObjectId, RegistryError> {
        self.spawn_child(owner, ObjectKind::Trigger, name.into())
    }

    fn spawn_child(
        &mut self,
        owner: ObjectId,
        kind: ObjectKind,
        name: String,
    ) -> Result<ObjectId, RegistryError> {
        let Some(parent) = self.objects.get(&owner) else {
            return Err(RegistryError::UnknownObject(owner));
        };
        if parent.kind != ObjectKind::Actor {
            return Err(RegistryError::InvalidParent {
                parent: owner,
                child: kind,
            });
        }
        if self.child_named(owner, kind, &name).is_some() {
            return Err(RegistryError::DuplicateChild {
                parent: owner,
                kind,
                name,
            });
        }
        Ok(self.spawn_object(kind, name, Some(owner), None))
    }

    /// Create and register a keyed aux object. Use
    /// [`AuxSpec::get_or_create`] for the idempotent public entry point.
    ///
    /// [`AuxSpec::get_or_create`]: crate::auxiliary::AuxSpec::get_or_create
    pub(crate) fn spawn_aux(
        &mut self,
        key: &str,
        name: impl Into<String>,
        type_tag: String,
    ) -> ObjectId {
        let id = self.spawn_object(ObjectKind::Aux, name, None, Some(type_tag));
        self.aux_keys.insert(key.to_string(), id);
        id
    }

    // === Object Removal ===

    /// Remove an object, its children, and all of their handler
    /// bindings. Returns the removed object.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<GameObject> {
        let mut doomed = vec![id];
        let mut index = 0;
        while index < doomed.len() {
            let parent = doomed[index];
            doomed.extend(
                self.order
                    .iter()
                    .copied()
                    .filter(|child| {
                        self.objects
                            .get(child)
                            .is_some_and(|obj| obj.parent == Some(parent))
                    }),
            );
            index += 1;
        }

        let mut removed_root = None;
        for victim in doomed {
            let Some(obj) = self.objects.remove(&victim) else {
                continue;
            };
            debug!(object = %obj, "removed");
            self.order.retain(|o| *o != victim);
            self.aux_keys.retain(|_, aux| *aux != victim);
            self.dispatch.unsubscribe_all(victim);
            if victim == id {
                removed_root = Some(obj);
            }
        }
        removed_root
    }

    // === Lookups ===

    /// Get an object by ID.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(&id)
    }

    /// Get a mutable object by ID.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.objects.get_mut(&id)
    }

    /// Check if an object is registered.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Total number of live objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// All objects of one kind, in creation order.
    pub fn objects_of(&self, kind: ObjectKind) -> impl Iterator<Item = &GameObject> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.objects.get(id))
            .filter(move |obj| obj.kind == kind)
    }

    /// All actors, in creation order.
    pub fn actors(&self) -> impl Iterator<Item = &GameObject> + '_ {
        self.objects_of(ObjectKind::Actor)
    }

    /// Children of one kind under a parent, in creation order.
    pub fn children(
        &self,
        parent: ObjectId,
        kind: ObjectKind,
    ) -> impl Iterator<Item = &GameObject> + '_ {
        self.objects_of(kind)
            .filter(move |obj| obj.parent == Some(parent))
    }

    /// Exact-name child lookup (fuzzy lookup lives in the converter).
    #[must_use]
    pub fn child_named(&self, parent: ObjectId, kind: ObjectKind, name: &str) -> Option<&GameObject> {
        self.children(parent, kind).find(|obj| obj.name == name)
    }

    /// Exact-name actor lookup (fuzzy lookup lives in the converter).
    #[must_use]
    pub fn actor_named(&self, name: &str) -> Option<&GameObject> {
        self.actors().find(|obj| obj.name == name)
    }

    /// Aux object bound to a key, if any.
    #[must_use]
    pub fn aux_lookup(&self, key: &str) -> Option<ObjectId> {
        self.aux_keys.get(key).copied()
    }

    // === Event Types & Action Kinds ===

    /// Registered event types.
    #[must_use]
    pub fn event_types(&self) -> &EventTypes {
        &self.event_types
    }

    /// Registered action kinds.
    #[must_use]
    pub fn action_kinds(&self) -> &ActionKinds {
        &self.action_kinds
    }

    /// Register an event type under an optional parent.
    pub fn register_event_type(
        &mut self,
        name: &str,
        parent: Option<EventTypeId>,
    ) -> Result<EventTypeId, RegistryError> {
        self.event_types.register(name, parent)
    }

    /// Register an action kind, creating its pre/post event types.
    pub fn register_action_kind(&mut self, name: &str) -> Result<ActionKindId, RegistryError> {
        self.action_kinds.register(&mut self.event_types, name)
    }

    // === Dispatch ===

    /// Bind a handler for `owner` to the given event types.
    pub fn subscribe(
        &mut self,
        owner: ObjectId,
        event_types: &[EventTypeId],
        handler: Handler,
    ) -> HandlerId {
        self.dispatch.subscribe(owner, event_types, handler)
    }

    /// Remove every binding of `owner` to `ty`. Idempotent.
    pub fn unsubscribe(&mut self, owner: ObjectId, ty: EventTypeId) {
        self.dispatch.unsubscribe(owner, ty);
    }

    /// Route an event to every matching handler exactly once and collect
    /// the returned actions. The caller is responsible for scheduling
    /// them.
    #[must_use]
    pub fn broadcast(&self, event: &Event) -> Vec<Action> {
        self.dispatch.broadcast(self, event)
    }

    /// Total number of live handler bindings.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.dispatch.handler_count()
    }

    /// Whether `owner` has any binding to `ty`.
    #[must_use]
    pub fn is_subscribed(&self, owner: ObjectId, ty: EventTypeId) -> bool {
        self.dispatch.is_subscribed(owner, ty)
    }

    // === Phase ===

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> PhaseId {
        self.phase
    }

    /// Current day (starts at 1, increments when the phase cycle wraps).
    #[must_use]
    pub fn day(&self) -> u32 {
        self.day
    }

    /// Name of the current phase.
    #[must_use]
    pub fn phase_name(&self) -> &str {
        self.config
            .phase_name(self.phase)
            .expect("current phase is always within the configured cycle")
    }

    pub(crate) fn set_phase(&mut self, phase: PhaseId) {
        self.phase = phase;
    }

    pub(crate) fn advance_phase(&mut self) {
        let next = self.phase.raw() + 1;
        if next as usize >= self.config.phase_count() {
            self.phase = PhaseId::new(0);
            self.day += 1;
        } else {
            self.phase = PhaseId::new(next);
        }
        debug!(phase = self.phase_name(), day = self.day, "phase advanced");
    }

    // === History ===

    /// The resolved action history, oldest first.
    #[must_use]
    pub fn history(&self) -> &Vector<ActionRecord> {
        &self.history
    }

    pub(crate) fn push_history(&mut self, record: ActionRecord) {
        self.history.push_back(record);
    }

    pub(crate) fn alloc_action_id(&mut self) -> ActionId {
        let id = ActionId::new(self.next_action);
        self.next_action += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> Game {
        Game::new(GameConfig::new())
    }

    #[test]
    fn test_spawn_assigns_unique_identity() {
        let mut game = game();

        let a = game.spawn_actor("Alice");
        let b = game.spawn_actor("Bob");

        assert_ne!(a, b);
        assert_eq!(game.object_count(), 2);
        assert_eq!(game.object(a).unwrap().name, "Alice");
        assert!(game.contains(b));
    }

    #[test]
    fn test_spawn_ability_requires_actor_parent() {
        let mut game = game();
        let alice = game.spawn_actor("Alice");
        let vote = game.spawn_ability(alice, "vote").unwrap();

        // An ability cannot own another ability.
        let err = game.spawn_ability(vote, "nested").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidParent { .. }));

        // Unknown parents are rejected outright.
        let err = game.spawn_ability(ObjectId::new(99), "vote").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownObject(_)));
    }

    #[test]
    fn test_duplicate_child_name_rejected() {
        let mut game = game();
        let alice = game.spawn_actor("Alice");
        game.spawn_ability(alice, "vote").unwrap();

        let err = game.spawn_ability(alice, "vote").unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateChild { .. }));

        // Same name under a different kind or parent is fine.
        game.spawn_trigger(alice, "vote").unwrap();
        let bob = game.spawn_actor("Bob");
        game.spawn_ability(bob, "vote").unwrap();
    }

    #[test]
    fn test_filtered_iteration_in_creation_order() {
        let mut game = game();
        let alice = game.spawn_actor("Alice");
        game.spawn_ability(alice, "vote").unwrap();
        let bob = game.spawn_actor("Bob");
        game.spawn_ability(bob, "kill").unwrap();

        let actors: Vec<&str> = game.actors().map(|o| o.name.as_str()).collect();
        assert_eq!(actors, vec!["Alice", "Bob"]);

        let abilities: Vec<&str> = game
            .objects_of(ObjectKind::Ability)
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(abilities, vec!["vote", "kill"]);
    }

    #[test]
    fn test_child_and_actor_lookup() {
        let mut game = game();
        let alice = game.spawn_actor("Alice");
        let vote = game.spawn_ability(alice, "vote").unwrap();

        assert_eq!(game.actor_named("Alice").unwrap().id, alice);
        assert!(game.actor_named("alice").is_none()); // exact only

        assert_eq!(game.child_named(alice, ObjectKind::Ability, "vote").unwrap().id, vote);
        assert!(game.child_named(alice, ObjectKind::Trigger, "vote").is_none());
    }

    #[test]
    fn test_remove_object_cascades_to_children() {
        let mut game = game();
        let alice = game.spawn_actor("Alice");
        let vote = game.spawn_ability(alice, "vote").unwrap();
        game.subscribe(vote, &[crate::events::PRE_ACTION], Box::new(|_, _| None));

        let removed = game.remove_object(alice).unwrap();
        assert_eq!(removed.id, alice);
        assert!(game.object(vote).is_none());
        assert_eq!(game.handler_count(), 0);

        // Removing again is a miss, not a panic.
        assert!(game.remove_object(alice).is_none());
    }

    #[test]
    fn test_aux_key_index() {
        let mut game = game();
        let tally = game.spawn_aux("vote_tally", "vote_tally", "tally".to_string());

        assert_eq!(game.aux_lookup("vote_tally"), Some(tally));
        assert_eq!(game.aux_lookup("other"), None);

        game.remove_object(tally);
        assert_eq!(game.aux_lookup("vote_tally"), None);
    }

    #[test]
    fn test_phase_cycle() {
        let mut game = game();

        assert_eq!(game.phase_name(), "day");
        assert_eq!(game.day(), 1);

        game.advance_phase();
        assert_eq!(game.phase_name(), "night");
        assert_eq!(game.day(), 1);

        game.advance_phase();
        assert_eq!(game.phase_name(), "day");
        assert_eq!(game.day(), 2);
    }

    #[test]
    #[should_panic(expected = "Must configure at least 1 phase")]
    fn test_zero_phases_rejected() {
        Game::new(GameConfig::new().with_phases(Vec::new()));
    }
}
