use crate::{Context, GenomeId, Result};

/// An interface for genomes that can be evolved by a
/// [`Population`].
///
/// Implementations must keep [`genetic_distance`] symmetric, and
/// zero between a genome and a copy of itself, for speciation to be
/// stable.
///
/// [`Population`]: crate::Population
/// [`genetic_distance`]: Genome::genetic_distance
pub trait Genome: Clone {
    type Config;

    /// Returns a randomized genome with the given ID.
    ///
    /// # Errors
    /// Returns [`NeatError::Configuration`] if `config` cannot
    /// describe a valid genome.
    ///
    /// [`NeatError::Configuration`]: crate::NeatError::Configuration
    fn new(id: GenomeId, config: &Self::Config, context: &mut Context) -> Result<Self>;

    fn id(&self) -> GenomeId;

    /// Returns the genetic distance between two genomes.
    /// Lower values mean more similar genomes.
    fn genetic_distance(first: &Self, second: &Self, config: &Self::Config) -> f64;

    /// Combines two genomes and returns an (unmutated) child
    /// with the given ID. The fitter parent dominates.
    fn mate(
        id: GenomeId,
        parent1: &Self,
        parent2: &Self,
        config: &Self::Config,
        context: &mut Context,
    ) -> Result<Self>;

    /// Mutates the genome in place.
    fn mutate(&mut self, config: &Self::Config, context: &mut Context);

    /// Sets the genome's fitness value.
    fn set_fitness(&mut self, fitness: f64);

    /// Returns the genome's fitness value.
    fn fitness(&self) -> f64;
}
