//! # deduction-engine
//!
//! An event-driven rules kernel for turn/phase-based social-deduction
//! games.
//!
//! ## Design Principles
//!
//! 1. **Content-Agnostic**: No hardcoded roles, abilities, or win
//!    conditions. Games register their action kinds and event types at
//!    startup and attach behavior through handlers.
//!
//! 2. **One Mutation Boundary**: A single [`Game`] registry owns every
//!    live object; all state change flows through action execution
//!    during a resolution pass.
//!
//! 3. **Deterministic Resolution**: Priority-ordered batches, stable
//!    handler ordering, and an append-only history make every pass
//!    replayable.
//!
//! ## Architecture
//!
//! Mutually unaware pieces of game logic coordinate through events: an
//! action's pre event is broadcast before it executes (reactions may
//! veto it), its post event after. Reactions are themselves actions,
//! resolved recursively in sub-queues with a hard nesting bound.
//!
//! ## Modules
//!
//! - `core`: object identity, the registry, configuration
//! - `events`: event types with ancestry, the dispatch engine
//! - `actions`: actions, effects, the resolution queue
//! - `constraints`: vetoing subscribers
//! - `auxiliary`: keyed shared helpers with optional self-expiry
//! - `convert`: name/path resolution and value coercion
//! - `games`: bundled demo content

pub mod core;
pub mod events;
pub mod actions;
pub mod constraints;
pub mod auxiliary;
pub mod convert;
pub mod games;

// Re-export commonly used types
pub use crate::core::{
    Game, GameConfig, GameObject, ObjectId, ObjectKind, PhaseId, RegistryError,
};

pub use crate::events::{
    ActionView, Dispatch, Event, EventTypeId, EventTypes, Handler, HandlerId,
    ANY, POST_ACTION, POST_PHASE_CHANGE, PRE_ACTION, PRE_PHASE_CHANGE, TRY_PHASE_CHANGE,
};

pub use crate::actions::{
    resolve, Action, ActionId, ActionKindId, ActionKinds, ActionQueue, ActionRecord,
    Effect, EffectOutcome, EffectResolver, ResolveError, CANCEL, CANCEL_PRIORITY,
    PHASE_CHANGE, RECURSION_LIMIT, REMOVE,
};

pub use crate::constraints::{Constraint, ConstraintPolicy};

pub use crate::auxiliary::{AuxSpec, CLEANUP_PRIORITY};

pub use crate::convert::{
    resolve_path, Converted, Converter, ConverterTable, ConvertError, JaroWinkler,
    MatchStrategy, NameMatcher, TargetType, Value, ValueKind,
};

pub use crate::games::village::{VillageBuilder, VillageGame, VillageKinds};
