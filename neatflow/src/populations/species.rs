use crate::populations::PopulationConfig;
use crate::{Genome, GenomeId};

use serde::{Deserialize, Serialize};

use std::fmt;

/// Species identifier, drawn from a per-[`SpeciesSet`]
/// monotonically increasing counter.
///
/// [`SpeciesSet`]: crate::SpeciesSet
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SpeciesId(pub u64);

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Species are collections of reproductively
/// compatible (within a certain [genetic distance])
/// genomes. Membership is determined by calculating
/// the genetic distance to a _representative_, a
/// snapshot of the member nearest to the previous
/// representative, re-chosen every generation.
///
/// Species that fail to improve for [`max_stagnation`]
/// generations are removed during reproduction, unless
/// protected by [`species_elitism`].
///
/// [genetic distance]: PopulationConfig::compatibility_threshold
/// [`max_stagnation`]: PopulationConfig::max_stagnation
/// [`species_elitism`]: PopulationConfig::species_elitism
#[derive(Debug, Clone)]
pub struct Species<G> {
    id: SpeciesId,
    created: usize,
    pub(super) last_improved: usize,
    pub(super) representative: G,
    pub(super) members: Vec<GenomeId>,
    pub(super) adjusted_fitness: f64,
    pub(super) fitness_history: Vec<f64>,
    pub(super) best_fitness: f64,
    pub(super) mean_fitness: f64,
}

impl<G: Genome> Species<G> {
    /// Creates a new species with the specified ID and
    /// representative. The representative is also its
    /// first member.
    ///
    /// # Examples
    /// ```
    /// use neatflow::{Context, Genome, Species, SpeciesId};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    ///
    /// let mut context = Context::seeded(0);
    /// let genome = NeuralGenome::new(1, &GeneticConfig::default(), &mut context).unwrap();
    /// let species = Species::new(SpeciesId(4), genome, 12);
    ///
    /// assert_eq!(species.id(), SpeciesId(4));
    /// assert_eq!(species.members(), &[1]);
    /// assert_eq!(species.created(), 12);
    /// assert_eq!(species.time_stagnated(15), 3);
    /// ```
    pub fn new(id: SpeciesId, representative: G, generation: usize) -> Species<G> {
        Species {
            id,
            created: generation,
            last_improved: generation,
            members: vec![representative.id()],
            representative,
            adjusted_fitness: 0.0,
            fitness_history: vec![],
            best_fitness: 0.0,
            mean_fitness: 0.0,
        }
    }

    pub fn id(&self) -> SpeciesId {
        self.id
    }

    /// Returns the species' representative, a snapshot
    /// taken during the latest speciation.
    pub fn representative(&self) -> &G {
        &self.representative
    }

    /// Returns the IDs of the species' current members.
    pub fn members(&self) -> &[GenomeId] {
        &self.members
    }

    /// Generation in which the species was founded.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Latest generation in which the species' fitness
    /// exceeded its historical maximum.
    pub fn last_improved(&self) -> usize {
        self.last_improved
    }

    /// Returns the number of generations since the species
    /// last improved.
    pub fn time_stagnated(&self, generation: usize) -> usize {
        generation.saturating_sub(self.last_improved)
    }

    /// One species fitness value per generation the species
    /// went through reproduction.
    pub fn fitness_history(&self) -> &[f64] {
        &self.fitness_history
    }

    /// The species' latest fitness, if it has one.
    pub fn fitness(&self) -> Option<f64> {
        self.fitness_history.last().copied()
    }

    /// Species mean fitness normalized against the
    /// population's fitness range, as of the latest
    /// reproduction.
    pub fn adjusted_fitness(&self) -> f64 {
        self.adjusted_fitness
    }

    /// Best member fitness as of the latest summary.
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// Mean member fitness as of the latest summary.
    pub fn mean_fitness(&self) -> f64 {
        self.mean_fitness
    }

    /// Returns the genetic distance between the species'
    /// representative and `other`.
    pub fn genetic_distance(&self, other: &G, config: &G::Config) -> f64 {
        G::genetic_distance(&self.representative, other, config)
    }

    /// Returns whether `genome` is close enough to the
    /// representative to belong to this species.
    pub fn is_compatible(&self, genome: &G, threshold: f64, config: &G::Config) -> bool {
        self.genetic_distance(genome, config) < threshold
    }

    /// Recomputes best and mean fitness from member fitnesses.
    pub(super) fn summarize(&mut self, fitnesses: impl Iterator<Item = f64>) {
        let (mut best, mut sum, mut count) = (f64::NEG_INFINITY, 0.0, 0usize);
        for fitness in fitnesses {
            best = best.max(fitness);
            sum += fitness;
            count += 1;
        }
        if count == 0 {
            self.best_fitness = 0.0;
            self.mean_fitness = 0.0;
        } else {
            self.best_fitness = best;
            self.mean_fitness = sum / count as f64;
        }
    }

    pub(super) fn count_elite(&self, config: &PopulationConfig) -> usize {
        self.members.len().min(config.elitism)
    }

    /// Size of the mating pool: the top survival fraction,
    /// at least two members when available.
    pub(super) fn count_survivors(&self, config: &PopulationConfig) -> usize {
        let len = self.members.len();
        ((len as f64 * config.survival_threshold).ceil() as usize)
            .max(2)
            .min(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{point, PointConfig};

    fn config() -> PointConfig {
        PointConfig {
            spread: 1.0,
            mutation_power: 0.1,
        }
    }

    #[test]
    fn identical_genomes_are_compatible() {
        let representative = point(1, 0.25, 0.0);
        let species = Species::new(SpeciesId(0), representative.clone(), 0);
        let copy = point(2, 0.25, 0.0);

        assert_eq!(species.genetic_distance(&copy, &config()), 0.0);
        assert!(species.is_compatible(&copy, 0.5, &config()));
        assert!(!species.is_compatible(&point(3, 2.0, 0.0), 0.5, &config()));
    }

    #[test]
    fn survivors_bounded_by_members() {
        let mut species = Species::new(SpeciesId(0), point(1, 0.0, 0.0), 0);
        let config = PopulationConfig {
            survival_threshold: 0.2,
            elitism: 3,
            ..PopulationConfig::zero()
        };
        assert_eq!(species.count_survivors(&config), 1);
        assert_eq!(species.count_elite(&config), 1);

        species.members = (1..=10).collect();
        assert_eq!(species.count_survivors(&config), 2);
        assert_eq!(species.count_elite(&config), 3);

        species.members = (1..=20).collect();
        assert_eq!(species.count_survivors(&config), 4);
    }

    #[test]
    fn summary_of_members() {
        let mut species = Species::new(SpeciesId(0), point(1, 0.0, 0.0), 0);
        species.summarize([1.0, 4.0, 7.0].into_iter());
        assert_eq!(species.best_fitness(), 7.0);
        assert_eq!(species.mean_fitness(), 4.0);

        species.summarize(std::iter::empty());
        assert_eq!(species.best_fitness(), 0.0);
    }
}
