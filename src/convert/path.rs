//! Path resolution for nested entities.
//!
//! External callers address entities by name with a fixed `/` separator:
//!
//! - `"{owner}"`: an actor
//! - `"{owner}/ability/{name}"`: an ability of that actor
//! - `"{owner}/trigger/{name}"`: a trigger of that actor
//!
//! Every segment goes through the [`NameMatcher`], so misspellings
//! resolve when they score above the cutoff and ties surface as
//! ambiguity errors.

use crate::core::{Game, ObjectId, ObjectKind};

use super::error::ConvertError;
use super::matching::NameMatcher;

/// The fixed path separator.
pub const SEPARATOR: char = '/';

const SELECTORS: [(&str, ObjectKind); 2] = [
    ("ability", ObjectKind::Ability),
    ("trigger", ObjectKind::Trigger),
];

/// Resolve an actor by (possibly misspelled) name.
pub fn resolve_actor(
    game: &Game,
    matcher: &NameMatcher,
    name: &str,
) -> Result<ObjectId, ConvertError> {
    let candidates: Vec<(String, ObjectId)> = game
        .actors()
        .map(|obj| (obj.name.clone(), obj.id))
        .collect();
    matcher.best(name, "actor", &candidates)
}

/// Resolve a child of an actor by kind and (possibly misspelled) name.
pub fn resolve_child(
    game: &Game,
    matcher: &NameMatcher,
    owner: ObjectId,
    kind: ObjectKind,
    name: &str,
) -> Result<ObjectId, ConvertError> {
    let owner_name = game
        .object(owner)
        .map_or_else(|| owner.to_string(), |obj| obj.name.clone());
    let candidates: Vec<(String, ObjectId)> = game
        .children(owner, kind)
        .map(|obj| (obj.name.clone(), obj.id))
        .collect();
    matcher.best(
        name,
        &format!("{kind:?} of {owner_name}").to_lowercase(),
        &candidates,
    )
}

/// Resolve a `/`-separated path to an object.
pub fn resolve_path(
    game: &Game,
    matcher: &NameMatcher,
    path: &str,
) -> Result<ObjectId, ConvertError> {
    let segments: Vec<&str> = path.split(SEPARATOR).collect();

    match segments.as_slice() {
        [owner] if !owner.is_empty() => resolve_actor(game, matcher, owner),

        [owner, selector, name] if !owner.is_empty() && !name.is_empty() => {
            let owner = resolve_actor(game, matcher, owner)?;
            let kinds: Vec<(String, ObjectKind)> = SELECTORS
                .iter()
                .map(|(label, kind)| ((*label).to_string(), *kind))
                .collect();
            let kind = matcher.best(selector, "path selector", &kinds)?;
            resolve_child(game, matcher, owner, kind, name)
        }

        _ => Err(ConvertError::BadPath {
            path: path.to_string(),
        }),
    }
}
