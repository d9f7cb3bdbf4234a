//! Injected random source shared by choice draws and user invocables.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Cloneable handle to a shared random number generator.
///
/// Clones share the same underlying generator, so a property and the
/// invocables nested in its rule consume one stream of randomness. The core
/// is single-threaded; for parallel scene generation create one seeded
/// source per thread instead of sharing a handle.
#[derive(Clone)]
pub struct RandomSource {
    rng: Rc<RefCell<StdRng>>,
}

impl RandomSource {
    /// Deterministic source for reproducible scenes and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Rc::new(RefCell::new(StdRng::seed_from_u64(seed))),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Rc::new(RefCell::new(StdRng::from_entropy())),
        }
    }

    /// Uniform index into a collection of `len` elements. `len` must be > 0.
    pub fn index(&self, len: usize) -> usize {
        self.rng.borrow_mut().gen_range(0..len)
    }

    /// Uniform draw from `[0, 1)`.
    pub fn uniform(&self) -> f64 {
        self.rng.borrow_mut().gen_range(0.0..1.0)
    }

    /// Uniform draw from `[low, high)`.
    pub fn uniform_in(&self, low: f64, high: f64) -> f64 {
        self.rng.borrow_mut().gen_range(low..high)
    }
}

impl fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomSource").finish_non_exhaustive()
    }
}
