//! Small shared helpers: identifiers and dotted-path value lookup.

pub mod path;
mod uuid_utils;

pub use path::{lookup, value_to_string};
pub use uuid_utils::{generate_uuid, StageId};
