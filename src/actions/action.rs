//! Action representation: kind + source + targets + effect payload.
//!
//! An action is the one mutable, cancelable, prioritized unit of effect
//! in the kernel. Games define their verbs by registering action
//! *kinds*; registering a kind also creates its dedicated pre/post event
//! types as children of the generic [`PRE_ACTION`]/[`POST_ACTION`]
//! types, so subscribers can react either to one verb or to everything.
//!
//! An action's externally visible behavior is its [`Effect`] list,
//! applied exactly once when the action executes. Cancellation is
//! monotonic: once canceled, an action never executes and never
//! broadcasts its post event.
//!
//! [`PRE_ACTION`]: crate::events::PRE_ACTION
//! [`POST_ACTION`]: crate::events::POST_ACTION
//! [`Effect`]: crate::actions::Effect

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{Game, ObjectId, RegistryError};
use crate::events::{
    ActionView, Event, EventTypeId, EventTypes, POST_ACTION, POST_PHASE_CHANGE, PRE_ACTION,
    PRE_PHASE_CHANGE,
};

use super::effect::Effect;

/// Identity of an enqueued action within one resolution pass.
///
/// Assigned when the action enters a queue; actions not yet enqueued
/// have no identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u64);

impl ActionId {
    /// Create an action ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Action({})", self.0)
    }
}

/// Action kind identifier. Games define what kinds exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionKindId(pub u32);

impl ActionKindId {
    /// Create an action kind ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ActionKindId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ActionKind({})", self.0)
    }
}

/// Builtin kind: mark another pending action canceled.
pub const CANCEL: ActionKindId = ActionKindId(0);
/// Builtin kind: remove an object from the registry.
pub const REMOVE: ActionKindId = ActionKindId(1);
/// Builtin kind: advance the phase cycle.
pub const PHASE_CHANGE: ActionKindId = ActionKindId(2);

/// Priority of cancel actions, ahead of ordinary reactions in the same
/// response set.
pub const CANCEL_PRIORITY: f64 = 100.0;

#[derive(Clone, Debug)]
struct KindEntry {
    name: String,
    pre: EventTypeId,
    post: EventTypeId,
}

/// Registry of action kinds and their pre/post event pairing.
///
/// Each kind statically pairs with exactly one pre and one post event
/// type. Re-registering an existing name is an idempotent reload and
/// returns the existing ID; pairing the name with different events is a
/// conflict.
#[derive(Clone, Debug)]
pub struct ActionKinds {
    kinds: Vec<KindEntry>,
    names: FxHashMap<String, ActionKindId>,
}

impl ActionKinds {
    /// Create a registry containing the builtin kinds, creating their
    /// event types in `event_types`.
    #[must_use]
    pub fn standard(event_types: &mut EventTypes) -> Self {
        let mut kinds = Self {
            kinds: Vec::new(),
            names: FxHashMap::default(),
        };

        // Insertion order must match the builtin constants.
        kinds
            .register(event_types, "cancel")
            .expect("builtin kind registration cannot conflict");
        kinds
            .register(event_types, "remove")
            .expect("builtin kind registration cannot conflict");
        kinds
            .register_with_events(event_types, "phase_change", PRE_PHASE_CHANGE, POST_PHASE_CHANGE)
            .expect("builtin kind registration cannot conflict");
        kinds
    }

    /// Register a kind, auto-creating `pre:<name>` / `post:<name>` event
    /// types under the generic pre/post roots.
    pub fn register(
        &mut self,
        event_types: &mut EventTypes,
        name: &str,
    ) -> Result<ActionKindId, RegistryError> {
        let pre = event_types.register(&format!("pre:{name}"), Some(PRE_ACTION))?;
        let post = event_types.register(&format!("post:{name}"), Some(POST_ACTION))?;
        self.register_with_events(event_types, name, pre, post)
    }

    /// Register a kind with explicit pre/post event types.
    pub fn register_with_events(
        &mut self,
        event_types: &EventTypes,
        name: &str,
        pre: EventTypeId,
        post: EventTypeId,
    ) -> Result<ActionKindId, RegistryError> {
        if event_types.name(pre).is_none() {
            return Err(RegistryError::UnknownEventType(pre));
        }
        if event_types.name(post).is_none() {
            return Err(RegistryError::UnknownEventType(post));
        }

        if let Some(&existing) = self.names.get(name) {
            let entry = &self.kinds[existing.0 as usize];
            if entry.pre == pre && entry.post == post {
                return Ok(existing);
            }
            return Err(RegistryError::ActionKindConflict {
                name: name.to_string(),
            });
        }

        let id = ActionKindId::new(self.kinds.len() as u32);
        self.kinds.push(KindEntry {
            name: name.to_string(),
            pre,
            post,
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Look up a kind by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ActionKindId> {
        self.names.get(name).copied()
    }

    /// Name of a kind.
    #[must_use]
    pub fn name(&self, kind: ActionKindId) -> Option<&str> {
        self.kinds.get(kind.0 as usize).map(|k| k.name.as_str())
    }

    /// Pre-event type paired with a kind.
    #[must_use]
    pub fn pre_event(&self, kind: ActionKindId) -> Option<EventTypeId> {
        self.kinds.get(kind.0 as usize).map(|k| k.pre)
    }

    /// Post-event type paired with a kind.
    #[must_use]
    pub fn post_event(&self, kind: ActionKindId) -> Option<EventTypeId> {
        self.kinds.get(kind.0 as usize).map(|k| k.post)
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// A unit of effect: mutable until executed, then frozen into history.
///
/// ## Lifecycle
///
/// Constructed by an initiator, enqueued (gaining an [`ActionId`]), then
/// either canceled before execution or executed exactly once. Canceled
/// actions still broadcast their pre event, never their post event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// The verb.
    pub kind: ActionKindId,

    /// Who or what initiated this action (an ability, a constraint, an
    /// aux helper).
    pub source: ObjectId,

    /// Targets, in declaration order.
    pub targets: SmallVec<[ObjectId; 2]>,

    /// Scheduling priority; higher executes earlier. Equal priorities
    /// keep insertion order.
    pub priority: f64,

    /// The externally visible behavior, applied once on execution.
    pub effects: Vec<Effect>,

    canceled: bool,
}

impl Action {
    /// Create an action with default priority and no targets or effects.
    #[must_use]
    pub fn new(kind: ActionKindId, source: ObjectId) -> Self {
        Self {
            kind,
            source,
            targets: SmallVec::new(),
            priority: 0.0,
            effects: Vec::new(),
            canceled: false,
        }
    }

    /// Add a target (builder pattern).
    #[must_use]
    pub fn with_target(mut self, target: ObjectId) -> Self {
        self.targets.push(target);
        self
    }

    /// Set the priority (builder pattern).
    #[must_use]
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// Add an effect (builder pattern).
    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// A cancel action against a pending action.
    #[must_use]
    pub fn cancel_action(source: ObjectId, target: ActionId) -> Self {
        Self::new(CANCEL, source)
            .with_priority(CANCEL_PRIORITY)
            .with_effect(Effect::Cancel { action: target })
    }

    /// A remove-object action.
    #[must_use]
    pub fn remove_object(source: ObjectId, target: ObjectId) -> Self {
        Self::new(REMOVE, source)
            .with_target(target)
            .with_effect(Effect::RemoveObject { target })
    }

    /// The builtin phase-advance action.
    #[must_use]
    pub fn phase_change(source: ObjectId) -> Self {
        Self::new(PHASE_CHANGE, source).with_effect(Effect::AdvancePhase)
    }

    /// Whether this action has been canceled.
    #[must_use]
    pub fn canceled(&self) -> bool {
        self.canceled
    }

    /// Cancel this action. Monotonic: there is no way back.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    /// Derive the canonical pre event for this action.
    ///
    /// Built fresh on every call; events are snapshots, not stored.
    #[must_use]
    pub fn pre(&self, id: ActionId, game: &Game) -> Event {
        let ty = game
            .action_kinds()
            .pre_event(self.kind)
            .unwrap_or(PRE_ACTION);
        Event::new(ty, game.phase()).with_action(ActionView::of(id, self))
    }

    /// Derive the canonical post event for this action.
    #[must_use]
    pub fn post(&self, id: ActionId, game: &Game) -> Event {
        let ty = game
            .action_kinds()
            .post_event(self.kind)
            .unwrap_or(POST_ACTION);
        Event::new(ty, game.phase()).with_action(ActionView::of(id, self))
    }
}

/// A resolved action as it entered history.
///
/// Records both executed and canceled actions; `canceled` rows never ran
/// their effects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Identity the action held while pending.
    pub id: ActionId,

    /// The verb.
    pub kind: ActionKindId,

    /// Initiator.
    pub source: ObjectId,

    /// Targets, in declaration order.
    pub targets: SmallVec<[ObjectId; 2]>,

    /// Priority it was scheduled at.
    pub priority: f64,

    /// The effect payload (applied only if not canceled).
    pub effects: Vec<Effect>,

    /// True if the action was vetoed before execution.
    pub canceled: bool,

    /// Recursion level the action resolved at (0 = top-level queue).
    pub depth: usize,
}

impl ActionRecord {
    pub(crate) fn of(id: ActionId, action: &Action, depth: usize) -> Self {
        Self {
            id,
            kind: action.kind,
            source: action.source,
            targets: action.targets.clone(),
            priority: action.priority,
            effects: action.effects.clone(),
            canceled: action.canceled,
            depth,
        }
    }
}
