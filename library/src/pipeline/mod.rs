//! Per-iteration resolution of scene parameters.
//!
//! Each feature of a scene describes its parameters as a `PropertyMap`. The
//! pipeline calls `update()` once per iteration, then reads cached values
//! while building the scene, so every consumer of a parameter observes the
//! same draw within one iteration.

pub mod property;
pub mod sequential;

pub use self::property::{Property, PropertyMap, PropertySource, SharedProperty};
pub use self::sequential::{SequentialProperty, StepContext, StepFn, StepRule};
