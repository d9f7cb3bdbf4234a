//! Rule resolution: turning declarative sampling rules into concrete values.

pub mod random;
pub mod rule;

pub use self::random::RandomSource;
pub use self::rule::{MappingEntry, SampleFn, SamplingRule, SequenceCursor};
