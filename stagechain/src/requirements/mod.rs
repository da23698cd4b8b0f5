//! Trigger payload requirements.
//!
//! A workflow may declare `requirements.data`: a list of mappings from a
//! dotted payload path to an expectation. A trigger only dispatches the
//! workflow when every expectation holds.

mod matcher;
mod model;

pub use matcher::{PlaceholderSource, RequirementMatcher};
pub use model::{Expectation, Pattern, Requirement, Requirements};
