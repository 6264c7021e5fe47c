//! A one-dimensional genome used to exercise the population
//! machinery without a neural network.
use crate::{Context, Genome, GenomeId, Result};

use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PointGenome {
    pub(crate) id: GenomeId,
    pub(crate) position: f64,
    pub(crate) fitness: f64,
}

#[derive(Clone, Debug)]
pub(crate) struct PointConfig {
    pub(crate) spread: f64,
    pub(crate) mutation_power: f64,
}

impl Genome for PointGenome {
    type Config = PointConfig;

    fn new(id: GenomeId, config: &PointConfig, context: &mut Context) -> Result<Self> {
        Ok(PointGenome {
            id,
            position: context.between(-config.spread, config.spread),
            fitness: 0.0,
        })
    }

    fn id(&self) -> GenomeId {
        self.id
    }

    fn genetic_distance(first: &Self, second: &Self, _: &PointConfig) -> f64 {
        (first.position - second.position).abs()
    }

    fn mate(
        id: GenomeId,
        parent1: &Self,
        parent2: &Self,
        _: &PointConfig,
        context: &mut Context,
    ) -> Result<Self> {
        let position = if context.coin() {
            parent1.position
        } else {
            parent2.position
        };
        Ok(PointGenome {
            id,
            position,
            fitness: 0.0,
        })
    }

    fn mutate(&mut self, config: &PointConfig, context: &mut Context) {
        self.position += context.between(-config.mutation_power, config.mutation_power);
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    fn fitness(&self) -> f64 {
        self.fitness
    }
}

pub(crate) fn point(id: GenomeId, position: f64, fitness: f64) -> PointGenome {
    PointGenome {
        id,
        position,
        fitness,
    }
}

/// Builds a genome map from `(id, position, fitness)` triples.
pub(crate) fn points(triples: &[(GenomeId, f64, f64)]) -> BTreeMap<GenomeId, PointGenome> {
    triples
        .iter()
        .map(|&(id, position, fitness)| (id, point(id, position, fitness)))
        .collect()
}

/// A seeded context whose IDs start after `last`, so fresh
/// genomes never collide with hand-built ones.
pub(crate) fn context_after(last: GenomeId, seed: u64) -> Context {
    use crate::{RngProvider, SequentialIds};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    Context::new(
        Arc::new(SequentialIds::starting_after(last)),
        Box::new(RngProvider::new(ChaCha8Rng::seed_from_u64(seed))),
    )
}
