//! Global parameters and placeholder resolution.
//!
//! Parameters come from an optional `{ parameters: {...} }` document. Stage
//! data values of the exact form `%name%` are replaced by the parameter of
//! that name when a workflow is loaded.

mod placeholder;
mod set;

pub use placeholder::{interpolate_paths, Placeholder};
pub use set::{EnvSource, ParameterSet, ParametersDocument, ProcessEnv};
