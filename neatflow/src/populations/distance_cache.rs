use crate::{Genome, GenomeId};

use ahash::RandomState;

use std::collections::HashMap;

/// Memoizes symmetric pairwise genome distances for the
/// duration of one speciation pass.
///
/// Entries are keyed by genome ID pairs, so a cache must not
/// outlive the generation it was built for.
pub struct GenomeDistanceCache<'a, G: Genome> {
    config: &'a G::Config,
    distances: HashMap<(GenomeId, GenomeId), f64, RandomState>,
    hits: usize,
    misses: usize,
}

impl<'a, G: Genome> GenomeDistanceCache<'a, G> {
    pub fn new(config: &'a G::Config) -> GenomeDistanceCache<'a, G> {
        GenomeDistanceCache {
            config,
            distances: HashMap::default(),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the distance between two genomes, computing
    /// it only on the first request for the pair.
    pub fn distance(&mut self, first: &G, second: &G) -> f64 {
        let key = if first.id() <= second.id() {
            (first.id(), second.id())
        } else {
            (second.id(), first.id())
        };
        if let Some(distance) = self.distances.get(&key) {
            self.hits += 1;
            return *distance;
        }
        self.misses += 1;
        let distance = G::genetic_distance(first, second, self.config);
        self.distances.insert(key, distance);
        distance
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{point, PointConfig};

    #[test]
    fn pair_order_shares_entry() {
        let config = PointConfig {
            spread: 1.0,
            mutation_power: 0.0,
        };
        let (a, b) = (point(3, 1.0, 0.0), point(8, -0.5, 0.0));
        let mut cache = GenomeDistanceCache::new(&config);

        assert_eq!(cache.distance(&a, &b), 1.5);
        assert_eq!(cache.distance(&b, &a), 1.5);
        assert_eq!(cache.len(), 1);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }
}
