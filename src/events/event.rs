//! Event types and event values.
//!
//! Events are immutable descriptions of "X is about to occur / occurred",
//! broadcast to subscribers. Event *types* form a single-parent tree:
//! a handler bound to a type also sees every descendant type. Games
//! register their own types under the builtin roots; the kernel never
//! interprets them beyond the ancestry relation.
//!
//! ## Builtin types
//!
//! - [`ANY`]: root of the tree
//! - [`PRE_ACTION`] / [`POST_ACTION`]: generic pre/post pair; every
//!   action kind's own pre/post types descend from these
//! - [`TRY_PHASE_CHANGE`]: a phase change is being requested
//! - [`PRE_PHASE_CHANGE`] / [`POST_PHASE_CHANGE`]: the pre/post pair of
//!   the builtin phase-change action

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::actions::{Action, ActionId, ActionKindId};
use crate::core::{ObjectId, PhaseId, RegistryError};

/// Event type identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventTypeId(pub u32);

impl EventTypeId {
    /// Create an event type ID.
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

impl std::fmt::Display for EventTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventType({})", self.0)
    }
}

/// Root of the event type tree.
pub const ANY: EventTypeId = EventTypeId(0);
/// An action is about to execute (broadcast even if it ends up canceled).
pub const PRE_ACTION: EventTypeId = EventTypeId(1);
/// An action executed successfully (never broadcast for canceled actions).
pub const POST_ACTION: EventTypeId = EventTypeId(2);
/// Someone asked for the phase to advance.
pub const TRY_PHASE_CHANGE: EventTypeId = EventTypeId(3);
/// The builtin phase-change action is about to execute.
pub const PRE_PHASE_CHANGE: EventTypeId = EventTypeId(4);
/// The builtin phase-change action executed.
pub const POST_PHASE_CHANGE: EventTypeId = EventTypeId(5);

/// Registry of event types and their ancestry.
///
/// Types are registered by name with an optional parent; the full
/// ancestor chain (self first, root last) is computed at registration so
/// dispatch never walks the tree at broadcast time. Re-registering an
/// existing name with the same parent is an idempotent reload and
/// returns the existing ID; a mismatched parent is a conflict.
#[derive(Clone, Debug)]
pub struct EventTypes {
    names: FxHashMap<String, EventTypeId>,
    labels: Vec<String>,
    parents: Vec<Option<EventTypeId>>,
    ancestry: Vec<Vec<EventTypeId>>,
}

impl EventTypes {
    /// Create a registry containing only the builtin types.
    #[must_use]
    pub fn standard() -> Self {
        let mut types = Self {
            names: FxHashMap::default(),
            labels: Vec::new(),
            parents: Vec::new(),
            ancestry: Vec::new(),
        };

        // Insertion order must match the builtin constants.
        types.insert("any", None);
        types.insert("pre_action", Some(ANY));
        types.insert("post_action", Some(ANY));
        types.insert("try_phase_change", Some(ANY));
        types.insert("pre_phase_change", Some(PRE_ACTION));
        types.insert("post_phase_change", Some(POST_ACTION));
        types
    }

    fn insert(&mut self, name: &str, parent: Option<EventTypeId>) -> EventTypeId {
        let id = EventTypeId::new(self.labels.len() as u32);

        let mut chain = vec![id];
        if let Some(parent) = parent {
            chain.extend_from_slice(&self.ancestry[parent.0 as usize]);
        }

        self.names.insert(name.to_string(), id);
        self.labels.push(name.to_string());
        self.parents.push(parent);
        self.ancestry.push(chain);
        id
    }

    /// Register an event type under an optional parent.
    ///
    /// Returns the existing ID when the same name is re-registered with
    /// the same parent.
    pub fn register(
        &mut self,
        name: &str,
        parent: Option<EventTypeId>,
    ) -> Result<EventTypeId, RegistryError> {
        if let Some(parent) = parent {
            if parent.0 as usize >= self.labels.len() {
                return Err(RegistryError::UnknownEventType(parent));
            }
        }

        if let Some(&existing) = self.names.get(name) {
            if self.parents[existing.0 as usize] == parent {
                return Ok(existing);
            }
            return Err(RegistryError::EventTypeConflict {
                name: name.to_string(),
            });
        }

        Ok(self.insert(name, parent))
    }

    /// Look up a type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<EventTypeId> {
        self.names.get(name).copied()
    }

    /// Name of a type.
    #[must_use]
    pub fn name(&self, ty: EventTypeId) -> Option<&str> {
        self.labels.get(ty.0 as usize).map(String::as_str)
    }

    /// Ancestor chain of a type: itself first, then each parent up to
    /// the root.
    #[must_use]
    pub fn ancestry(&self, ty: EventTypeId) -> &[EventTypeId] {
        self.ancestry
            .get(ty.0 as usize)
            .map_or(&[], Vec::as_slice)
    }

    /// Whether `ancestor` is `ty` itself or one of its ancestors.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: EventTypeId, ty: EventTypeId) -> bool {
        self.ancestry(ty).contains(&ancestor)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for EventTypes {
    fn default() -> Self {
        Self::standard()
    }
}

/// Immutable snapshot of the action an event concerns.
///
/// Handlers inspect pending actions through this view; the action itself
/// stays owned by the resolution pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionView {
    /// Identity of the pending action (the handle cancel actions target).
    pub id: ActionId,
    /// The action's kind.
    pub kind: ActionKindId,
    /// Who or what initiated the action.
    pub source: ObjectId,
    /// Targets, in declaration order.
    pub targets: SmallVec<[ObjectId; 2]>,
    /// Scheduling priority.
    pub priority: f64,
}

impl ActionView {
    pub(crate) fn of(id: ActionId, action: &Action) -> Self {
        Self {
            id,
            kind: action.kind,
            source: action.source,
            targets: action.targets.clone(),
            priority: action.priority,
        }
    }
}

/// An immutable occurrence broadcast to subscribers.
///
/// Pre/post events carry the [`ActionView`] of the action they concern;
/// every event carries the phase it was broadcast in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The concrete type of this event.
    pub event_type: EventTypeId,

    /// The action this event concerns, for pre/post pairs.
    pub action: Option<ActionView>,

    /// Phase current at broadcast time.
    pub phase: PhaseId,
}

impl Event {
    /// Create an event with no action attached.
    #[must_use]
    pub fn new(event_type: EventTypeId, phase: PhaseId) -> Self {
        Self {
            event_type,
            action: None,
            phase,
        }
    }

    /// Attach an action view (builder pattern).
    #[must_use]
    pub fn with_action(mut self, view: ActionView) -> Self {
        self.action = Some(view);
        self
    }
}
