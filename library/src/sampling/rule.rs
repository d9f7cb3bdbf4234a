//! Sampling rules and their resolution into concrete values.
//!
//! A `SamplingRule` describes how one scene parameter produces its value on
//! each pipeline iteration: nested property, structured mapping, uniform
//! choice, exhausting sequence, invocable or plain constant. Resolution is a
//! single ordered match over the closed enum, so exactly one shape applies
//! to any rule and the precedence between shapes is fixed at construction
//! time rather than re-derived structurally on every draw.

use log::debug;
use std::fmt;

use crate::error::ResolveError;
use crate::model::value::Value;
use crate::pipeline::property::SharedProperty;
use crate::sampling::random::RandomSource;

use indexmap::IndexMap;

/// Zero-argument producer. Randomness-consuming invocables close over a
/// cloned [`RandomSource`] handle.
pub type SampleFn = Box<dyn FnMut() -> Result<Value, Box<dyn std::error::Error>>>;

/// Stateful, possibly-exhausting producer advanced one element per
/// resolution.
pub struct SequenceCursor {
    iter: Box<dyn Iterator<Item = Value>>,
}

impl SequenceCursor {
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Value> + 'static,
    {
        Self {
            iter: Box::new(iter),
        }
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self::new(values.into_iter())
    }

    fn advance(&mut self) -> Option<Value> {
        self.iter.next()
    }
}

impl fmt::Debug for SequenceCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceCursor").finish_non_exhaustive()
    }
}

/// One entry of a structured mapping rule: either a nested property whose
/// resample result is substituted in, or a plain value copied unchanged.
///
/// Entries are values-or-properties by construction, so mapping resolution
/// is a one-level walk; values inside a nested `Array` or `Map` are never
/// substituted.
pub enum MappingEntry {
    Node(SharedProperty),
    Value(Value),
}

impl From<Value> for MappingEntry {
    fn from(value: Value) -> Self {
        MappingEntry::Value(value)
    }
}

impl From<SharedProperty> for MappingEntry {
    fn from(property: SharedProperty) -> Self {
        MappingEntry::Node(property)
    }
}

impl fmt::Debug for MappingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingEntry::Node(_) => f.write_str("Node(..)"),
            MappingEntry::Value(v) => write!(f, "Value({:?})", v),
        }
    }
}

/// How a scene parameter's value is produced or varies.
///
/// Variants are listed in resolution precedence order. A rule is constructed
/// as exactly one variant, so a producer that could be seen as both
/// sequence-like and invocable is classified once, at construction.
pub enum SamplingRule {
    /// A property nested inside another property's rule; resolution invokes
    /// its resample capability without touching its cache.
    Node(SharedProperty),
    /// Name → entry mapping resolved one level deep, key order preserved.
    Mapping(IndexMap<String, MappingEntry>),
    /// Bounded candidate set; one element drawn uniformly per resolution.
    Choice(Vec<Value>),
    /// Exhausting producer advanced one element per resolution.
    Sequence(SequenceCursor),
    /// Zero-argument producer called once per resolution.
    Invocable(SampleFn),
    /// Returned unchanged on every resolution.
    Constant(Value),
}

impl SamplingRule {
    pub fn node(property: SharedProperty) -> Self {
        SamplingRule::Node(property)
    }

    pub fn mapping<I, N, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, E)>,
        N: Into<String>,
        E: Into<MappingEntry>,
    {
        SamplingRule::Mapping(
            entries
                .into_iter()
                .map(|(name, entry)| (name.into(), entry.into()))
                .collect(),
        )
    }

    pub fn choice<I, V>(candidates: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        SamplingRule::Choice(candidates.into_iter().map(Into::into).collect())
    }

    pub fn sequence(cursor: SequenceCursor) -> Self {
        SamplingRule::Sequence(cursor)
    }

    pub fn sequence_from<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        SamplingRule::Sequence(SequenceCursor::from_values(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn invocable<F>(f: F) -> Self
    where
        F: FnMut() -> Result<Value, Box<dyn std::error::Error>> + 'static,
    {
        SamplingRule::Invocable(Box::new(f))
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        SamplingRule::Constant(value.into())
    }

    /// Resolve this rule into one concrete value.
    ///
    /// Rule-internal state (sequence cursors, `FnMut` invocables, the random
    /// source) may advance; nothing else is mutated. Errors surface to the
    /// caller unchanged.
    pub fn resolve(&mut self, random: &RandomSource) -> Result<Value, ResolveError> {
        match self {
            SamplingRule::Node(property) => property.borrow_mut().sample(),
            SamplingRule::Mapping(entries) => {
                debug!("resolving structured mapping with {} entries", entries.len());
                let mut resolved = IndexMap::with_capacity(entries.len());
                for (name, entry) in entries.iter_mut() {
                    let value = match entry {
                        MappingEntry::Node(property) => property.borrow_mut().sample()?,
                        MappingEntry::Value(value) => value.clone(),
                    };
                    resolved.insert(name.clone(), value);
                }
                Ok(Value::Map(resolved))
            }
            SamplingRule::Choice(candidates) => {
                if candidates.is_empty() {
                    return Err(ResolveError::EmptyChoice);
                }
                Ok(candidates[random.index(candidates.len())].clone())
            }
            SamplingRule::Sequence(cursor) => {
                cursor.advance().ok_or(ResolveError::ExhaustedSequence)
            }
            SamplingRule::Invocable(f) => f().map_err(ResolveError::Propagated),
            SamplingRule::Constant(value) => Ok(value.clone()),
        }
    }
}

impl fmt::Debug for SamplingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingRule::Node(_) => f.write_str("Node(..)"),
            SamplingRule::Mapping(entries) => write!(f, "Mapping({:?})", entries),
            SamplingRule::Choice(candidates) => write!(f, "Choice({:?})", candidates),
            SamplingRule::Sequence(cursor) => write!(f, "Sequence({:?})", cursor),
            SamplingRule::Invocable(_) => f.write_str("Invocable(..)"),
            SamplingRule::Constant(value) => write!(f, "Constant({:?})", value),
        }
    }
}
