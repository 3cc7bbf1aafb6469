//! The converter table: coercing loose values into core object types.
//!
//! Public entry points accept either live handles or human-typed
//! identifiers; the table turns the latter into the former. It is an
//! explicit state object with a defined initialization
//! ([`ConverterTable::standard`]) and a [`reset`](ConverterTable::reset)
//! hook for test isolation, not a hidden module-level global.
//!
//! Every coercion is parameterized by the [`Game`] whose live objects
//! names resolve against.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{Game, ObjectId, ObjectKind, PhaseId, RegistryError};

use super::error::ConvertError;
use super::matching::NameMatcher;
use super::path::{resolve_actor, resolve_path};

/// A loosely-typed input value from a caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Already a live handle.
    Object(ObjectId),
    /// A name or `/`-separated path.
    Text(String),
    /// A raw numeric identifier.
    Number(i64),
}

impl Value {
    /// The source-kind this value converts from.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Object(_) => ValueKind::Object,
            Value::Text(_) => ValueKind::Text,
            Value::Number(_) => ValueKind::Number,
        }
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Number(number)
    }
}

/// Source-value families the table dispatches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Object,
    Text,
    Number,
}

/// Coercion targets: the core object model plus phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    /// Any registered object.
    Object,
    Actor,
    Ability,
    Trigger,
    Aux,
    Phase,
}

impl TargetType {
    fn object_kind(self) -> Option<ObjectKind> {
        match self {
            TargetType::Actor => Some(ObjectKind::Actor),
            TargetType::Ability => Some(ObjectKind::Ability),
            TargetType::Trigger => Some(ObjectKind::Trigger),
            TargetType::Aux => Some(ObjectKind::Aux),
            TargetType::Object | TargetType::Phase => None,
        }
    }
}

/// A successfully coerced value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Converted {
    Object(ObjectId),
    Phase(PhaseId),
}

impl Converted {
    /// The object handle, if this coerced to an object.
    #[must_use]
    pub fn object(self) -> Option<ObjectId> {
        match self {
            Converted::Object(id) => Some(id),
            Converted::Phase(_) => None,
        }
    }

    /// The phase, if this coerced to a phase.
    #[must_use]
    pub fn phase(self) -> Option<PhaseId> {
        match self {
            Converted::Phase(phase) => Some(phase),
            Converted::Object(_) => None,
        }
    }
}

/// A registered coercion function.
pub type Converter = Box<dyn Fn(&Game, &NameMatcher, &Value) -> Result<Converted, ConvertError>>;

/// Maps (target type, source-value kind) to a coercion function.
pub struct ConverterTable {
    matcher: NameMatcher,
    converters: FxHashMap<(TargetType, ValueKind), Converter>,
}

impl ConverterTable {
    /// The standard table: name/path lookups for text, handle
    /// validation for numbers, with the given fuzzy cutoff.
    #[must_use]
    pub fn standard(cutoff: f64) -> Self {
        let mut table = Self {
            matcher: NameMatcher::new(cutoff),
            converters: FxHashMap::default(),
        };
        table.install_standard();
        table
    }

    fn install_standard(&mut self) {
        for target in [
            TargetType::Object,
            TargetType::Actor,
            TargetType::Ability,
            TargetType::Trigger,
            TargetType::Aux,
        ] {
            self.converters.insert(
                (target, ValueKind::Text),
                Box::new(move |game, matcher, value| text_to_object(game, matcher, value, target)),
            );
            self.converters.insert(
                (target, ValueKind::Number),
                Box::new(move |game, _, value| number_to_object(game, value, target)),
            );
        }

        self.converters.insert(
            (TargetType::Phase, ValueKind::Text),
            Box::new(|game, matcher, value| {
                let Value::Text(text) = value else {
                    unreachable!("dispatched on value kind");
                };
                let candidates: Vec<(String, u32)> = game
                    .config()
                    .phases
                    .iter()
                    .enumerate()
                    .map(|(index, name)| (name.clone(), index as u32))
                    .collect();
                let index = matcher.best(text, "phase", &candidates)?;
                Ok(Converted::Phase(PhaseId::new(index)))
            }),
        );
        self.converters.insert(
            (TargetType::Phase, ValueKind::Number),
            Box::new(|game, _, value| {
                let Value::Number(number) = value else {
                    unreachable!("dispatched on value kind");
                };
                let phase = PhaseId::new(*number as u32);
                if *number >= 0 && game.config().phase_name(phase).is_some() {
                    Ok(Converted::Phase(phase))
                } else {
                    Err(ConvertError::NotFound {
                        query: number.to_string(),
                        domain: "phase".to_string(),
                    })
                }
            }),
        );
    }

    /// Register an additional coercion. Additive only: an existing
    /// (target, source) pair is a registration conflict.
    pub fn register(
        &mut self,
        target: TargetType,
        source: ValueKind,
        converter: Converter,
    ) -> Result<(), RegistryError> {
        if self.converters.contains_key(&(target, source)) {
            return Err(RegistryError::DuplicateConverter { target, kind: source });
        }
        self.converters.insert((target, source), converter);
        Ok(())
    }

    /// Drop every non-standard registration.
    pub fn reset(&mut self) {
        self.converters.clear();
        self.install_standard();
    }

    /// The matcher used for name segments.
    #[must_use]
    pub fn matcher(&self) -> &NameMatcher {
        &self.matcher
    }

    /// Coerce a value to a target type.
    ///
    /// A value that already satisfies the target passes through
    /// unchanged; otherwise the registered converter for the value's
    /// kind runs with the game in scope.
    pub fn convert(
        &self,
        game: &Game,
        target: TargetType,
        value: &Value,
    ) -> Result<Converted, ConvertError> {
        trace!(?target, ?value, "convert");

        // Pass-through for handles that already satisfy the target.
        if let Value::Object(id) = value {
            match object_to_target(game, *id, target) {
                Ok(converted) => return Ok(converted),
                // A registered (target, Object) converter may still
                // apply; otherwise surface the original failure.
                Err(err) => {
                    if !self.converters.contains_key(&(target, ValueKind::Object)) {
                        return Err(err);
                    }
                }
            }
        }

        let Some(converter) = self.converters.get(&(target, value.kind())) else {
            return Err(ConvertError::NoConverter {
                target,
                kind: value.kind(),
            });
        };
        converter(game, &self.matcher, value)
    }

    /// Coerce against a union of targets, trying each alternative in
    /// declared order and returning the first success.
    pub fn convert_any(
        &self,
        game: &Game,
        targets: &[TargetType],
        value: &Value,
    ) -> Result<Converted, ConvertError> {
        for target in targets {
            if let Ok(converted) = self.convert(game, *target, value) {
                return Ok(converted);
            }
        }
        Err(ConvertError::UnionExhausted {
            targets: targets.to_vec(),
        })
    }
}

impl std::fmt::Debug for ConverterTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterTable")
            .field("matcher", &self.matcher)
            .field("converters", &self.converters.len())
            .finish()
    }
}

fn object_to_target(
    game: &Game,
    id: ObjectId,
    target: TargetType,
) -> Result<Converted, ConvertError> {
    let Some(obj) = game.object(id) else {
        return Err(ConvertError::NotFound {
            query: id.to_string(),
            domain: format!("{target:?}").to_lowercase(),
        });
    };
    if target == TargetType::Phase {
        return Err(ConvertError::WrongKind {
            query: id.to_string(),
            expected: target,
            found: format!("{:?}", obj.kind).to_lowercase(),
        });
    }
    if let Some(kind) = target.object_kind() {
        if obj.kind != kind {
            return Err(ConvertError::WrongKind {
                query: id.to_string(),
                expected: target,
                found: format!("{:?}", obj.kind).to_lowercase(),
            });
        }
    }
    Ok(Converted::Object(id))
}

fn text_to_object(
    game: &Game,
    matcher: &NameMatcher,
    value: &Value,
    target: TargetType,
) -> Result<Converted, ConvertError> {
    let Value::Text(text) = value else {
        unreachable!("dispatched on value kind");
    };

    let id = match target {
        // Actors resolve from a bare name; paths also work.
        TargetType::Actor => {
            if text.contains(super::path::SEPARATOR) {
                resolve_path(game, matcher, text)?
            } else {
                resolve_actor(game, matcher, text)?
            }
        }
        // Aux objects resolve by exact key.
        TargetType::Aux => game.aux_lookup(text).ok_or_else(|| ConvertError::NotFound {
            query: text.clone(),
            domain: "aux object".to_string(),
        })?,
        _ => resolve_path(game, matcher, text)?,
    };
    object_to_target(game, id, target)
}

fn number_to_object(game: &Game, value: &Value, target: TargetType) -> Result<Converted, ConvertError> {
    let Value::Number(number) = value else {
        unreachable!("dispatched on value kind");
    };
    if *number < 0 || *number > i64::from(u32::MAX) {
        return Err(ConvertError::NotFound {
            query: number.to_string(),
            domain: format!("{target:?}").to_lowercase(),
        });
    }
    object_to_target(game, ObjectId::new(*number as u32), target)
}
