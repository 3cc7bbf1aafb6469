//! Core kernel types: object identity, the registry, configuration.
//!
//! This module contains the game-agnostic foundations. Game content
//! configures phases via `GameConfig` and registers everything else
//! (objects, event types, action kinds) against the live `Game`.

pub mod config;
pub mod game;
pub mod object;

pub use config::{GameConfig, PhaseId};
pub use game::{Game, RegistryError};
pub use object::{GameObject, ObjectId, ObjectKind};
