use crate::{IdProvider, RandomProvider, RngProvider, SequentialIds};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use std::fmt;
use std::sync::Arc;

/// The injected collaborators shared by every genetic operation
/// of a run: the ID sequence and the random provider.
///
/// # Examples
/// ```
/// use neatflow::Context;
///
/// let mut a = Context::seeded(42);
/// let mut b = Context::seeded(42);
/// assert_eq!(a.between(0.0, 10.0), b.between(0.0, 10.0));
///
/// let first = a.next_id();
/// assert!(a.next_id() > first);
/// ```
pub struct Context {
    ids: Arc<dyn IdProvider>,
    random: Box<dyn RandomProvider + Send>,
}

impl Context {
    pub fn new(ids: Arc<dyn IdProvider>, random: Box<dyn RandomProvider + Send>) -> Context {
        Context { ids, random }
    }

    /// Returns a deterministic context: fresh sequential IDs and a
    /// ChaCha8 generator seeded with `seed`.
    pub fn seeded(seed: u64) -> Context {
        Context::new(
            Arc::new(SequentialIds::new()),
            Box::new(RngProvider::new(ChaCha8Rng::seed_from_u64(seed))),
        )
    }

    /// Returns a context with fresh sequential IDs and an
    /// entropy-seeded generator.
    pub fn from_entropy() -> Context {
        Context::new(
            Arc::new(SequentialIds::new()),
            Box::new(RngProvider::new(ChaCha8Rng::from_entropy())),
        )
    }

    /// Returns a handle to the shared ID sequence.
    pub fn ids(&self) -> Arc<dyn IdProvider> {
        Arc::clone(&self.ids)
    }

    pub fn next_id(&self) -> u64 {
        self.ids.next()
    }

    /// Uniform value in `[min, max]`.
    pub fn between(&mut self, min: f64, max: f64) -> f64 {
        self.random.between(min, max)
    }

    /// Returns `true` with probability `chance`.
    /// Never consumes randomness for `chance <= 0`.
    pub fn chance(&mut self, chance: f64) -> bool {
        if chance <= 0.0 {
            false
        } else if chance >= 1.0 {
            true
        } else {
            self.random.between(0.0, 1.0) < chance
        }
    }

    /// A fair coin flip.
    pub fn coin(&mut self) -> bool {
        self.random.between(0.0, 1.0) < 0.5
    }

    /// Uniform index in `0..len`.
    ///
    /// # Panics
    /// Panics if `len` is zero.
    pub fn index(&mut self, len: usize) -> usize {
        assert!(len > 0, "cannot pick an index from an empty range");
        (self.random.between(0.0, len as f64).floor() as usize).min(len - 1)
    }

    /// Uniformly chosen element, or `None` if `items` is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.index(items.len())])
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed list of values, cycling.
    struct Scripted(Vec<f64>, usize);

    impl RandomProvider for Scripted {
        fn between(&mut self, min: f64, max: f64) -> f64 {
            let unit = self.0[self.1 % self.0.len()];
            self.1 += 1;
            min + unit * (max - min)
        }
    }

    fn scripted(values: &[f64]) -> Context {
        Context::new(
            Arc::new(SequentialIds::new()),
            Box::new(Scripted(values.to_vec(), 0)),
        )
    }

    #[test]
    fn chance_extremes_are_certain() {
        let mut context = scripted(&[0.999_999]);
        assert!(context.chance(1.0));
        assert!(!context.chance(0.0));
        assert!(!context.chance(0.5));
    }

    #[test]
    fn index_never_reaches_len() {
        let mut context = scripted(&[1.0, 0.0, 0.5]);
        assert_eq!(context.index(4), 3);
        assert_eq!(context.index(4), 0);
        assert_eq!(context.index(4), 2);
    }

    #[test]
    fn choose_from_empty_is_none() {
        let mut context = Context::seeded(1);
        let empty: [u8; 0] = [];
        assert!(context.choose(&empty).is_none());
        assert_eq!(context.choose(&[7]), Some(&7));
    }
}
