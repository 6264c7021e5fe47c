use rand::Rng;

/// A source of uniformly distributed floats.
///
/// Injected into a [`Context`] so that evolution can be made
/// deterministic (seeded) or scripted in tests.
///
/// [`Context`]: crate::Context
pub trait RandomProvider {
    /// Returns a uniformly distributed value in `[min, max]`.
    /// Returns `min` if the range is empty.
    fn between(&mut self, min: f64, max: f64) -> f64;
}

/// Wrapper adapting any `T: Rng` to a [`RandomProvider`],
/// needed for dependency inversion (a generic `Rng` can't
/// be boxed behind a trait object directly).
///
/// # Examples
/// ```
/// use neatflow::{RandomProvider, RngProvider};
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
///
/// let mut random = RngProvider::new(ChaCha8Rng::seed_from_u64(3));
/// let x = random.between(-2.0, 2.0);
/// assert!((-2.0..=2.0).contains(&x));
/// assert_eq!(random.between(1.0, 1.0), 1.0);
/// ```
#[derive(Clone, Debug)]
pub struct RngProvider<T: Rng>(T);

impl<T: Rng> RngProvider<T> {
    pub fn new(rng: T) -> RngProvider<T> {
        RngProvider(rng)
    }
}

impl<T: Rng> RandomProvider for RngProvider<T> {
    fn between(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            min
        } else {
            self.0.gen_range(min..=max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = RngProvider::new(ChaCha8Rng::seed_from_u64(11));
        let mut b = RngProvider::new(ChaCha8Rng::seed_from_u64(11));
        for _ in 0..32 {
            assert_eq!(a.between(-1.0, 1.0), b.between(-1.0, 1.0));
        }
    }

    #[test]
    fn inverted_range_returns_min() {
        let mut random = RngProvider::new(ChaCha8Rng::seed_from_u64(0));
        assert_eq!(random.between(3.0, -3.0), 3.0);
    }
}
