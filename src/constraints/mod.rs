//! Constraints: vetoing subscribers.
//!
//! A constraint watches pre-action events and answers "should this
//! pending action be stopped". When its policy vetoes, it responds with
//! a single cancel action against the pending action. Every applicable
//! constraint gets an independent chance; there is no short-circuiting,
//! and because cancellation is monotonic, redundant cancels are
//! harmless.

use tracing::debug;

use crate::actions::Action;
use crate::core::{Game, ObjectId, ObjectKind, RegistryError};
use crate::events::{ActionView, PRE_ACTION};

/// A veto predicate: inspect the pending action, return `true` to stop
/// it.
pub type ConstraintPolicy = Box<dyn Fn(&Game, &ActionView) -> bool>;

/// Factory for vetoing subscribers.
pub struct Constraint;

impl Constraint {
    /// Register a constraint object whose policy is consulted for every
    /// pending action.
    pub fn attach(
        game: &mut Game,
        name: impl Into<String>,
        parent: Option<ObjectId>,
        policy: ConstraintPolicy,
    ) -> Result<ObjectId, RegistryError> {
        if let Some(parent) = parent {
            if !game.contains(parent) {
                return Err(RegistryError::UnknownObject(parent));
            }
        }

        let id = game.spawn_object(ObjectKind::Constraint, name, parent, None);
        game.subscribe(
            id,
            &[PRE_ACTION],
            Box::new(move |game, event| {
                let view = event.action.as_ref()?;
                if policy(game, view) {
                    debug!(action = %view.id, constraint = %id, "veto");
                    Some(vec![Action::cancel_action(id, view.id)])
                } else {
                    None
                }
            }),
        );
        Ok(id)
    }

    /// Register a constraint watching one ability: the policy is only
    /// consulted for actions whose source is that ability's owner or the
    /// ability itself.
    pub fn attach_to_ability(
        game: &mut Game,
        name: impl Into<String>,
        ability: ObjectId,
        policy: ConstraintPolicy,
    ) -> Result<ObjectId, RegistryError> {
        let Some(obj) = game.object(ability) else {
            return Err(RegistryError::UnknownObject(ability));
        };
        if obj.kind != ObjectKind::Ability {
            return Err(RegistryError::InvalidParent {
                parent: ability,
                child: ObjectKind::Constraint,
            });
        }
        let owner = obj.parent;

        Self::attach(
            game,
            name,
            Some(ability),
            Box::new(move |game, view| {
                if view.source != ability && Some(view.source) != owner {
                    return false;
                }
                policy(game, view)
            }),
        )
    }
}
