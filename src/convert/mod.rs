//! Name resolution and value coercion.
//!
//! Callers at the public boundary may address entities by live handle,
//! by human-typed (possibly misspelled) name, by `/`-separated path, or
//! by raw numeric ID; this module turns all of them into validated
//! handles against a specific game's registry.

pub mod error;
pub mod matching;
pub mod path;
pub mod table;

pub use error::ConvertError;
pub use matching::{JaroWinkler, MatchStrategy, NameMatcher};
pub use path::{resolve_actor, resolve_child, resolve_path, SEPARATOR};
pub use table::{Converted, Converter, ConverterTable, TargetType, Value, ValueKind};
