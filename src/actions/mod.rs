//! Actions, effects, and the resolution queue.
//!
//! An action is the unit of change: a kind (the verb), a source, a
//! priority, a cancel flag, and an effect payload applied exactly once
//! on execution. The queue drains actions in priority order, weaving in
//! every reaction their pre/post events provoke.

pub mod action;
pub mod effect;
pub mod queue;

pub use action::{
    Action, ActionId, ActionKindId, ActionKinds, ActionRecord, CANCEL, CANCEL_PRIORITY,
    PHASE_CHANGE, REMOVE,
};
pub use effect::{Effect, EffectOutcome, EffectResolver};
pub use queue::{resolve, ActionQueue, ResolveError, RECURSION_LIMIT};
