//! Event model and dispatch engine.
//!
//! Events are immutable descriptions of occurrences; the dispatcher
//! routes each broadcast to every subscribed handler whose declared
//! event type is the event's type or an ancestor of it, exactly once
//! per handler, in a deterministic order. Handlers react by returning
//! actions for the action queue to schedule.

pub mod dispatch;
pub mod event;

pub use dispatch::{Dispatch, Handler, HandlerId};
pub use event::{
    ActionView, Event, EventTypeId, EventTypes, ANY, POST_ACTION, POST_PHASE_CHANGE, PRE_ACTION,
    PRE_PHASE_CHANGE, TRY_PHASE_CHANGE,
};
