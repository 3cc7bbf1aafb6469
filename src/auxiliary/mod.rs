//! Auxiliary objects: keyed, shared, possibly self-expiring helpers.
//!
//! Aux objects carry temporary or shared state that belongs to no single
//! actor: vote tallies, per-night trackers, protection markers. They are
//! addressed by a string key unique within the registry, with idempotent
//! get-or-create semantics: the same key always yields the same object,
//! and a key collision between different concrete types is a logic
//! error.
//!
//! A self-expiring aux object watches the phase-change post event and
//! responds with a remove-self action at [`CLEANUP_PRIORITY`], far below
//! any normal priority, so "lasts until the end of the phase" needs no
//! cleanup calls from unrelated code.

use crate::actions::Action;
use crate::core::{Game, ObjectId, RegistryError};
use crate::events::POST_PHASE_CHANGE;

/// Priority of expiry actions; runs after all normal-priority actions
/// in the same resolution pass.
pub const CLEANUP_PRIORITY: f64 = -1.0e6;

/// Specification for a keyed aux object.
///
/// ## Idempotence
///
/// `get_or_create` with a key already bound to the same `type_tag`
/// returns the existing object, applying the requested status overrides
/// to it. A key bound to a different `type_tag` is a
/// [`RegistryError::AuxTypeMismatch`].
#[derive(Clone, Debug)]
pub struct AuxSpec {
    key: String,
    type_tag: String,
    name: Option<String>,
    status: Vec<(String, i64)>,
    expires: bool,
}

impl AuxSpec {
    /// Describe an aux object under `key` with a concrete type tag.
    #[must_use]
    pub fn new(key: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            type_tag: type_tag.into(),
            name: None,
            status: Vec::new(),
            expires: false,
        }
    }

    /// Override the object name (defaults to the key).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a status value; on reuse this updates the existing object.
    #[must_use]
    pub fn with_status(mut self, key: impl Into<String>, value: i64) -> Self {
        self.status.push((key.into(), value));
        self
    }

    /// Remove the object automatically at the end of the current phase.
    #[must_use]
    pub fn expiring(mut self) -> Self {
        self.expires = true;
        self
    }

    /// Idempotent keyed lookup-or-construction.
    pub fn get_or_create(self, game: &mut Game) -> Result<ObjectId, RegistryError> {
        self.ensure(game).map(|(id, _)| id)
    }

    /// Like [`get_or_create`], also reporting whether the object was
    /// created by this call. Callers binding handlers to a fresh aux
    /// object use the flag to subscribe only once.
    ///
    /// [`get_or_create`]: Self::get_or_create
    pub fn ensure(self, game: &mut Game) -> Result<(ObjectId, bool), RegistryError> {
        if let Some(id) = game.aux_lookup(&self.key) {
            let obj = game
                .object(id)
                .expect("aux key index only holds live objects");
            if !obj.has_type_tag(&self.type_tag) {
                return Err(RegistryError::AuxTypeMismatch {
                    key: self.key,
                    existing: obj.type_tag.clone().unwrap_or_default(),
                    requested: self.type_tag,
                });
            }
            let obj = game.object_mut(id).expect("checked above");
            for (key, value) in self.status {
                obj.set_status(key, value);
            }
            return Ok((id, false));
        }

        let name = self.name.unwrap_or_else(|| self.key.clone());
        let id = game.spawn_aux(&self.key, name, self.type_tag);

        let obj = game.object_mut(id).expect("just spawned");
        for (key, value) in self.status {
            obj.set_status(key, value);
        }

        if self.expires {
            game.subscribe(
                id,
                &[POST_PHASE_CHANGE],
                Box::new(move |_, _| {
                    Some(vec![
                        Action::remove_object(id, id).with_priority(CLEANUP_PRIORITY)
                    ])
                }),
            );
        }

        Ok((id, true))
    }
}
