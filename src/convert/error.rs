//! Conversion and resolution errors.
//!
//! All of these are recoverable: the kernel surfaces them to the caller
//! (who may re-prompt a user) and never retries on its own.

use super::table::{TargetType, ValueKind};

/// Why a coercion or name resolution failed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConvertError {
    /// No candidate matched the query at or above the cutoff.
    #[error("no {domain} matches '{query}'")]
    NotFound { query: String, domain: String },

    /// Two candidates matched the query equally well.
    #[error("'{query}' is ambiguous between '{first}' and '{second}'")]
    Ambiguous {
        query: String,
        first: String,
        second: String,
    },

    /// The path does not follow `owner`, `owner/ability/name`, or
    /// `owner/trigger/name`.
    #[error("malformed path '{path}'")]
    BadPath { path: String },

    /// No coercion is registered for this (target, source) pair.
    #[error("no converter from {kind:?} to {target:?}")]
    NoConverter {
        target: TargetType,
        kind: ValueKind,
    },

    /// The value resolved to an object of the wrong kind.
    #[error("'{query}' is a {found}, not a {expected:?}")]
    WrongKind {
        query: String,
        expected: TargetType,
        found: String,
    },

    /// Every alternative of a union target failed.
    #[error("value matches none of {targets:?}")]
    UnionExhausted { targets: Vec<TargetType> },
}
