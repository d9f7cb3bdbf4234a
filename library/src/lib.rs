//! Core library for the synthetic scene generator.
//!
//! Scene features declare their parameters as sampling rules — constants,
//! uniform choices, exhausting sequences, invocables, structured mappings or
//! nested properties. The pipeline resolves every rule once per iteration
//! and caches the result, so a parameter read twice while building one scene
//! yields one consistent value, and a new scene is drawn simply by updating.

pub mod error;
pub mod model;
pub mod pipeline;
pub mod sampling;

// Re-exports for easier access
pub use error::ResolveError;
pub use model::value::Value;
pub use pipeline::property::{Property, PropertyMap, PropertySource, SharedProperty};
pub use pipeline::sequential::{SequentialProperty, StepContext, StepFn, StepRule};
pub use sampling::random::RandomSource;
pub use sampling::rule::{MappingEntry, SampleFn, SamplingRule, SequenceCursor};
