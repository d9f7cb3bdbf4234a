//! Scene parameters as resolvable properties.
//!
//! A `Property` pairs one sampling rule with its most recently resolved
//! value. Feature code groups properties into a `PropertyMap` and calls
//! `update()` once per pipeline iteration; between updates, every read of
//! the map observes one consistent snapshot of the scene parameters.

use indexmap::IndexMap;
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::error::ResolveError;
use crate::model::value::Value;
use crate::sampling::random::RandomSource;
use crate::sampling::rule::SamplingRule;

/// Shared handle to a property, for nesting inside other rules or binding
/// one property under several names.
pub type SharedProperty = Rc<RefCell<Property>>;

/// One scene parameter: a sampling rule plus the cached result of its most
/// recent resolution.
///
/// The rule is fixed at construction and never reassigned. Construction
/// performs the first resolution, so a freshly built property already has a
/// current value; the cache changes only through [`Property::update`].
#[derive(Debug)]
pub struct Property {
    rule: SamplingRule,
    random: RandomSource,
    current_value: Option<Value>,
}

impl Property {
    /// Build a property and resolve its initial value.
    pub fn new(rule: SamplingRule, random: RandomSource) -> Result<Self, ResolveError> {
        let mut property = Self {
            rule,
            random,
            current_value: None,
        };
        property.update()?;
        Ok(property)
    }

    pub fn into_shared(self) -> SharedProperty {
        Rc::new(RefCell::new(self))
    }

    /// Resolve the rule without touching the cached value.
    ///
    /// Rule-internal state (sequence cursors, invocables, the random source)
    /// still advances; a property must not appear inside its own rule.
    pub fn sample(&mut self) -> Result<Value, ResolveError> {
        self.rule.resolve(&self.random)
    }

    /// Resolve the rule and store the result as the current value. The only
    /// operation that writes the cache.
    pub fn update(&mut self) -> Result<(), ResolveError> {
        let value = self.sample()?;
        self.current_value = Some(value);
        Ok(())
    }

    /// The most recently resolved value.
    pub fn current_value(&self) -> Result<&Value, ResolveError> {
        self.current_value.as_ref().ok_or(ResolveError::Unresolved)
    }
}

/// What a named slot is built from: a bare rule (wrapped in a fresh
/// property) or an existing shared property (adopted by reference).
pub enum PropertySource {
    Rule(SamplingRule),
    Node(SharedProperty),
}

impl From<SamplingRule> for PropertySource {
    fn from(rule: SamplingRule) -> Self {
        PropertySource::Rule(rule)
    }
}

impl From<SharedProperty> for PropertySource {
    fn from(property: SharedProperty) -> Self {
        PropertySource::Node(property)
    }
}

/// Ordered name → property mapping describing one feature's parameters.
///
/// Insertion order is preserved, so snapshots and batch samples list
/// parameters in declaration order.
#[derive(Debug)]
pub struct PropertyMap {
    slots: IndexMap<String, SharedProperty>,
    random: RandomSource,
}

impl PropertyMap {
    pub fn new(random: RandomSource) -> Self {
        Self {
            slots: IndexMap::new(),
            random,
        }
    }

    /// Build a map from `(name, rule-or-property)` pairs.
    pub fn from_pairs<I, N>(random: RandomSource, pairs: I) -> Result<Self, ResolveError>
    where
        I: IntoIterator<Item = (N, PropertySource)>,
        N: Into<String>,
    {
        let mut map = Self::new(random);
        for (name, source) in pairs {
            map.insert(name, source)?;
        }
        Ok(map)
    }

    /// Add a named slot. A bare rule becomes a fresh property sharing this
    /// map's random source and is resolved immediately; an existing shared
    /// property is adopted by reference.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        source: impl Into<PropertySource>,
    ) -> Result<(), ResolveError> {
        let name = name.into();
        let property = match source.into() {
            PropertySource::Rule(rule) => Property::new(rule, self.random.clone())?.into_shared(),
            PropertySource::Node(property) => property,
        };
        if self.slots.insert(name.clone(), property).is_some() {
            warn!("property '{}' replaced by a new definition", name);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SharedProperty> {
        self.slots.get(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SharedProperty)> {
        self.slots.iter()
    }

    /// Refresh every property's cached value, in insertion order.
    ///
    /// A property bound under several names is refreshed once per pass; the
    /// later slots observe the freshly updated value. On failure the error
    /// propagates immediately: earlier properties keep their fresh values
    /// and later ones stay stale. That partial state is valid and
    /// observable, not rolled back.
    pub fn update(&mut self) -> Result<(), ResolveError> {
        debug!("updating {} properties", self.slots.len());
        let mut refreshed = HashSet::new();
        for (name, property) in self.slots.iter() {
            if !refreshed.insert(Rc::as_ptr(property)) {
                debug!("property '{}' already refreshed this pass; skipping", name);
                continue;
            }
            property.borrow_mut().update()?;
        }
        Ok(())
    }

    /// Resolve every slot without touching any cache, returning a fresh
    /// name → value mapping in insertion order. Slots aliasing one property
    /// each draw independently.
    pub fn sample(&self) -> Result<IndexMap<String, Value>, ResolveError> {
        let mut resolved = IndexMap::with_capacity(self.slots.len());
        for (name, property) in self.slots.iter() {
            resolved.insert(name.clone(), property.borrow_mut().sample()?);
        }
        Ok(resolved)
    }

    /// Cached values of every slot, in insertion order, resolving nothing.
    pub fn current_value_snapshot(&self) -> Result<IndexMap<String, Value>, ResolveError> {
        let mut snapshot = IndexMap::with_capacity(self.slots.len());
        for (name, property) in self.slots.iter() {
            snapshot.insert(name.clone(), property.borrow().current_value()?.clone());
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn construction_resolves_eagerly() {
        let random = RandomSource::seeded(1);
        let property = Property::new(SamplingRule::constant(1i64), random).unwrap();
        assert_eq!(property.current_value().unwrap(), &Value::from(1i64));
    }

    #[test]
    fn constant_survives_any_number_of_updates() {
        let random = RandomSource::seeded(2);
        let mut property = Property::new(SamplingRule::constant(1i64), random).unwrap();
        for _ in 0..50 {
            property.update().unwrap();
            assert_eq!(property.current_value().unwrap(), &Value::from(1i64));
        }
    }

    #[test]
    fn sequence_property_walks_elements_in_order() {
        let random = RandomSource::seeded(3);
        let mut property =
            Property::new(SamplingRule::sequence_from([10i64, 20, 30]), random).unwrap();
        assert_eq!(property.current_value().unwrap(), &Value::from(10i64));
        property.update().unwrap();
        assert_eq!(property.current_value().unwrap(), &Value::from(20i64));
        property.update().unwrap();
        assert_eq!(property.current_value().unwrap(), &Value::from(30i64));
        // One past the end.
        assert!(matches!(
            property.update(),
            Err(ResolveError::ExhaustedSequence)
        ));
        // The failed update left the cache alone.
        assert_eq!(property.current_value().unwrap(), &Value::from(30i64));
    }

    #[test]
    fn sample_never_writes_the_cache() {
        let random = RandomSource::seeded(4);
        let mut property =
            Property::new(SamplingRule::choice([1i64, 2, 3]), random).unwrap();
        let cached = property.current_value().unwrap().clone();
        for _ in 0..20 {
            property.sample().unwrap();
        }
        assert_eq!(property.current_value().unwrap(), &cached);
    }

    fn counting_rule(counter: Rc<Cell<i64>>) -> SamplingRule {
        SamplingRule::invocable(move || {
            counter.set(counter.get() + 1);
            Ok(Value::from(counter.get()))
        })
    }

    #[test]
    fn mixed_map_snapshot_and_updates() {
        let random = RandomSource::seeded(5);
        let noise = random.clone();
        let mut map = PropertyMap::new(random);
        map.insert("a", SamplingRule::constant(1i64)).unwrap();
        map.insert("b", SamplingRule::choice([1i64, 2, 3])).unwrap();
        map.insert(
            "c",
            SamplingRule::invocable(move || Ok(Value::from(noise.uniform()))),
        )
        .unwrap();

        let snapshot = map.current_value_snapshot().unwrap();
        let keys: Vec<_> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(snapshot["a"], Value::from(1i64));
        let b = snapshot["b"].as_i64().unwrap();
        assert!((1..=3).contains(&b));

        let mut c_values = Vec::new();
        c_values.push(snapshot["c"].clone());
        for _ in 0..10 {
            map.update().unwrap();
            let snapshot = map.current_value_snapshot().unwrap();
            assert_eq!(snapshot["a"], Value::from(1i64));
            let b = snapshot["b"].as_i64().unwrap();
            assert!((1..=3).contains(&b));
            c_values.push(snapshot["c"].clone());
        }
        // Fresh randomness on every update.
        let distinct: HashSet<Value> = c_values.iter().cloned().collect();
        assert_eq!(distinct.len(), c_values.len());
    }

    #[test]
    fn sampling_between_updates_leaves_snapshot_unchanged() {
        let random = RandomSource::seeded(6);
        let mut map = PropertyMap::new(random.clone());
        map.insert("radius", SamplingRule::choice([1.0, 2.0, 3.0]))
            .unwrap();
        let noise = random.clone();
        map.insert(
            "offset",
            SamplingRule::invocable(move || Ok(Value::from(noise.uniform_in(-1.0, 1.0)))),
        )
        .unwrap();

        map.update().unwrap();
        let before = map.current_value_snapshot().unwrap();
        for _ in 0..5 {
            map.sample().unwrap();
        }
        assert_eq!(map.current_value_snapshot().unwrap(), before);
    }

    #[test]
    fn failed_update_keeps_earlier_values_and_leaves_later_stale() {
        let _ = env_logger::builder().is_test(true).try_init();

        let random = RandomSource::seeded(7);
        let first = Rc::new(Cell::new(0i64));
        let last = Rc::new(Cell::new(0i64));
        let mut map = PropertyMap::new(random);
        map.insert("a", counting_rule(first.clone())).unwrap();
        map.insert("b", SamplingRule::sequence_from([5i64])).unwrap();
        map.insert("c", counting_rule(last.clone())).unwrap();
        // Construction resolved each property once.
        assert_eq!(first.get(), 1);
        assert_eq!(last.get(), 1);

        // The single-element sequence was consumed at construction, so the
        // pass fails at `b` after refreshing `a`.
        assert!(matches!(
            map.update(),
            Err(ResolveError::ExhaustedSequence)
        ));
        assert_eq!(first.get(), 2);
        assert_eq!(last.get(), 1);

        let snapshot = map.current_value_snapshot().unwrap();
        assert_eq!(snapshot["a"], Value::from(2i64));
        assert_eq!(snapshot["b"], Value::from(5i64));
        assert_eq!(snapshot["c"], Value::from(1i64));
    }

    #[test]
    fn aliased_property_refreshes_once_per_pass() {
        let random = RandomSource::seeded(8);
        let counter = Rc::new(Cell::new(0i64));
        let shared = Property::new(counting_rule(counter.clone()), random.clone())
            .unwrap()
            .into_shared();
        assert_eq!(counter.get(), 1);

        let mut map = PropertyMap::new(random);
        map.insert("exposure", shared.clone()).unwrap();
        map.insert("gain", shared.clone()).unwrap();

        map.update().unwrap();
        // One resolution despite two slots.
        assert_eq!(counter.get(), 2);
        let snapshot = map.current_value_snapshot().unwrap();
        assert_eq!(snapshot["exposure"], Value::from(2i64));
        assert_eq!(snapshot["gain"], Value::from(2i64));
    }

    #[test]
    fn from_pairs_adopts_rules_and_nodes() {
        let random = RandomSource::seeded(9);
        let shared = Property::new(SamplingRule::constant(2.5), random.clone())
            .unwrap()
            .into_shared();
        let map = PropertyMap::from_pairs(
            random,
            [
                ("position", PropertySource::from(SamplingRule::constant(0.0))),
                ("intensity", PropertySource::from(shared.clone())),
            ],
        )
        .unwrap();

        assert_eq!(map.len(), 2);
        let snapshot = map.current_value_snapshot().unwrap();
        assert_eq!(snapshot["position"], Value::from(0.0));
        assert_eq!(snapshot["intensity"], Value::from(2.5));
        // Adopted by reference, not copied.
        assert!(Rc::ptr_eq(map.get("intensity").unwrap(), &shared));
    }
}
