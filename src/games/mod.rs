//! Bundled game content.
//!
//! The kernel is content-agnostic; this module carries a minimal game
//! built on top of it, used to validate the public surface end to end.

pub mod village;
