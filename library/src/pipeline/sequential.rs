//! Frame-sequence parameters: one resolved value per step of a scene
//! sequence.
//!
//! Where a [`Property`](crate::pipeline::property::Property) holds one value
//! per pipeline iteration, a `SequentialProperty` holds a whole
//! time-sequence — a particle trajectory, a fading intensity — rebuilt on
//! each `update`. Element 0 is the initializer; every later element comes
//! from the step rule, which can read the previous element and the matching
//! step of other, already-updated sequences.

use indexmap::IndexMap;
use std::fmt;

use crate::error::ResolveError;
use crate::model::value::Value;
use crate::sampling::random::RandomSource;
use crate::sampling::rule::SamplingRule;

/// Per-step producer for evolving sequences.
pub type StepFn = Box<dyn FnMut(&StepContext) -> Result<Value, Box<dyn std::error::Error>>>;

/// What an evolving step rule sees at each step.
pub struct StepContext<'a> {
    /// Index of the element being produced (1-based; element 0 is the
    /// initializer and never runs the rule).
    pub step: usize,
    /// The element produced at the previous step.
    pub previous_value: &'a Value,
    /// Named input sequences, each clamped to its final element when
    /// shorter than the sequence being built.
    pub inputs: &'a IndexMap<String, Value>,
}

/// Rule applied once per step past the initializer.
pub enum StepRule {
    /// An ordinary sampling rule resolved independently at each step.
    Fixed(SamplingRule),
    /// A closure over the step context, for values that evolve from the
    /// previous element.
    Evolving(StepFn),
}

impl StepRule {
    pub fn fixed(rule: SamplingRule) -> Self {
        StepRule::Fixed(rule)
    }

    pub fn evolving<F>(f: F) -> Self
    where
        F: FnMut(&StepContext) -> Result<Value, Box<dyn std::error::Error>> + 'static,
    {
        StepRule::Evolving(Box::new(f))
    }
}

impl fmt::Debug for StepRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepRule::Fixed(rule) => write!(f, "Fixed({:?})", rule),
            StepRule::Evolving(_) => f.write_str("Evolving(..)"),
        }
    }
}

/// A scene parameter resolved as a whole sequence of per-step values.
///
/// Unlike `Property`, construction resolves nothing: a sequence has no
/// length until the first [`update`](SequentialProperty::update), so the
/// cached sequence starts empty.
#[derive(Debug)]
pub struct SequentialProperty {
    rule: StepRule,
    initializer: Value,
    random: RandomSource,
    current_value: Vec<Value>,
}

impl SequentialProperty {
    pub fn new(rule: StepRule, initializer: impl Into<Value>, random: RandomSource) -> Self {
        Self {
            rule,
            initializer: initializer.into(),
            random,
            current_value: Vec::new(),
        }
    }

    /// Rebuild the cached sequence at the given length.
    pub fn update(&mut self, sequence_length: usize) -> Result<(), ResolveError> {
        self.update_with(sequence_length, &[])
    }

    /// Rebuild the cached sequence, exposing other sequences to the step
    /// rule by name. Inputs must already hold their own updated sequences.
    pub fn update_with(
        &mut self,
        sequence_length: usize,
        inputs: &[(&str, &SequentialProperty)],
    ) -> Result<(), ResolveError> {
        let mut sequence = Vec::with_capacity(sequence_length);
        if sequence_length == 0 {
            self.current_value = sequence;
            return Ok(());
        }
        sequence.push(self.initializer.clone());
        for step in 1..sequence_length {
            let step_inputs = inputs
                .iter()
                .map(|(name, input)| Ok((name.to_string(), input.value_at(step)?)))
                .collect::<Result<IndexMap<String, Value>, ResolveError>>()?;
            let value = match &mut self.rule {
                StepRule::Fixed(rule) => rule.resolve(&self.random)?,
                StepRule::Evolving(f) => f(&StepContext {
                    step,
                    previous_value: &sequence[step - 1],
                    inputs: &step_inputs,
                })
                .map_err(ResolveError::Propagated)?,
            };
            sequence.push(value);
        }
        self.current_value = sequence;
        Ok(())
    }

    /// The most recently resolved sequence; empty before the first update.
    pub fn current_value(&self) -> &[Value] {
        &self.current_value
    }

    fn value_at(&self, step: usize) -> Result<Value, ResolveError> {
        match self.current_value.last() {
            Some(last) => Ok(self.current_value.get(step).unwrap_or(last).clone()),
            None => Err(ResolveError::Unresolved),
        }
    }
}
