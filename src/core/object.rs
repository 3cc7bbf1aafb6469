//! Object identity and per-object state.
//!
//! Every live entity in a game (actor, ability, trigger, constraint,
//! auxiliary helper) is a `GameObject` owned by exactly one [`Game`]
//! registry for its whole lifetime. Cross-references between objects are
//! expressed as `ObjectId` handles resolved through the registry, never
//! as owning pointers.
//!
//! ## State Values
//!
//! Object state uses `i64` throughout:
//! - Booleans: 0/1
//! - Object references: `ObjectId.raw() as i64`
//! - Enums: discriminant values
//!
//! Ordered data (vote tallies, visit logs) lives in `records`: named
//! lists of `(i64, i64)` rows that preserve insertion order.
//!
//! [`Game`]: crate::core::Game

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Unique identifier for any game object.
///
/// Actors, abilities, triggers, constraints, and aux helpers all have
/// ObjectIds. Identity is assigned by the owning registry and is never
/// reused within one game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Create an object ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Raw value as `i64`, for storage in status maps and records.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

impl From<u32> for ObjectId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object({})", self.0)
    }
}

/// What role an object plays in the registry.
///
/// The kernel interprets kinds only for structural rules (abilities and
/// triggers belong to actors, constraints to abilities) and for filtered
/// lookups; all behavioral meaning comes from handlers and effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// A participant (player, moderator stand-in, or NPC).
    Actor,
    /// A named, invocable capability owned by an actor.
    Ability,
    /// A named passive reaction owned by an actor.
    Trigger,
    /// A vetoing watcher attached to an ability or standing alone.
    Constraint,
    /// A keyed shared helper (counter, tracker, temporary effect).
    Aux,
}

/// A live entity owned by one registry.
///
/// Constructed only through the registry's `spawn_*` operations, which
/// assign identity and register the object in one step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameObject {
    /// Identity within the owning registry.
    pub id: ObjectId,

    /// Human-facing name; the unit of name/path resolution.
    pub name: String,

    /// Structural role.
    pub kind: ObjectKind,

    /// Owning object, if any (ability/trigger -> actor,
    /// constraint -> watched ability).
    pub parent: Option<ObjectId>,

    /// Concrete-type marker for aux objects. Two aux registrations under
    /// one key must agree on this tag.
    pub type_tag: Option<String>,

    /// Integer state ("dead", "uses_left", ...). Missing keys read as a
    /// caller-supplied default.
    status: FxHashMap<String, i64>,

    /// Named insertion-ordered rows of `(i64, i64)` pairs.
    records: FxHashMap<String, Vec<(i64, i64)>>,
}

impl GameObject {
    pub(crate) fn new(
        id: ObjectId,
        name: impl Into<String>,
        kind: ObjectKind,
        parent: Option<ObjectId>,
        type_tag: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            parent,
            type_tag,
            status: FxHashMap::default(),
            records: FxHashMap::default(),
        }
    }

    /// Get a status value with a default for missing keys.
    #[must_use]
    pub fn status(&self, key: &str, default: i64) -> i64 {
        self.status.get(key).copied().unwrap_or(default)
    }

    /// Set a status value.
    pub fn set_status(&mut self, key: impl Into<String>, value: i64) {
        self.status.insert(key.into(), value);
    }

    /// Add a delta to a status value (missing keys start at 0).
    pub fn modify_status(&mut self, key: &str, delta: i64) {
        let current = self.status(key, 0);
        self.status.insert(key.to_string(), current + delta);
    }

    /// Rows appended under `key`, in insertion order.
    #[must_use]
    pub fn records(&self, key: &str) -> &[(i64, i64)] {
        self.records.get(key).map_or(&[], Vec::as_slice)
    }

    /// Append a row under `key`.
    pub fn append_record(&mut self, key: impl Into<String>, row: (i64, i64)) {
        self.records.entry(key.into()).or_default().push(row);
    }

    /// Check whether the object carries the given aux type tag.
    #[must_use]
    pub fn has_type_tag(&self, tag: &str) -> bool {
        self.type_tag.as_deref() == Some(tag)
    }
}

impl std::fmt::Display for GameObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} '{}' ({})", self.kind, self.name, self.id)
    }
}
