use super::offspring_factory::{Ancestry, OffspringFactory};
use super::{PopulationConfig, SpeciesId, SpeciesSet, Stagnation};
use crate::{Context, Genome, GenomeId, NeatError, Result};

use tracing::{debug, info};

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Creates genomes: the initial random population, and each
/// following generation from the surviving species.
#[derive(Clone, Debug)]
pub struct Reproduction {
    stagnation: Stagnation,
    ancestry: Ancestry,
}

impl Reproduction {
    pub fn new(config: &PopulationConfig) -> Reproduction {
        Reproduction {
            stagnation: Stagnation::new(config),
            ancestry: Ancestry::default(),
        }
    }

    /// Creates `count` random genomes with fresh IDs.
    pub fn create_new<G: Genome>(
        &mut self,
        count: usize,
        genetic_config: &G::Config,
        context: &mut Context,
    ) -> Result<BTreeMap<GenomeId, G>> {
        let mut genomes = BTreeMap::new();
        for _ in 0..count {
            let id = context.next_id();
            genomes.insert(id, G::new(id, genetic_config, context)?);
            self.ancestry.insert(id, None);
        }
        Ok(genomes)
    }

    /// Produces the next generation.
    ///
    /// Stagnant species are dropped, the remaining ones are
    /// allotted offspring in proportion to their adjusted
    /// fitness, and each species' quota is filled with its elite
    /// followed by mutated children of its top performers.
    ///
    /// # Errors
    /// Returns [`NeatError::CompleteExtinction`] if every species
    /// is stagnant, or any error raised while mating.
    pub fn reproduce<G: Genome>(
        &mut self,
        config: &PopulationConfig,
        genetic_config: &G::Config,
        species_set: &mut SpeciesSet<G>,
        genomes: &BTreeMap<GenomeId, G>,
        generation: usize,
        context: &mut Context,
    ) -> Result<BTreeMap<GenomeId, G>> {
        let mut surviving: Vec<SpeciesId> = Vec::new();
        for (species_id, stagnant) in self.stagnation.update(species_set, genomes, generation) {
            if stagnant {
                info!(species = species_id.0, generation, "removing stagnant species");
                species_set.remove(species_id);
            } else {
                surviving.push(species_id);
            }
        }
        if surviving.is_empty() {
            return Err(NeatError::CompleteExtinction { generation });
        }
        surviving.sort();

        let member_fitnesses: Vec<f64> = surviving
            .iter()
            .filter_map(|id| species_set.get(*id))
            .flat_map(|s| s.members().iter())
            .filter_map(|id| genomes.get(id))
            .map(|g| g.fitness())
            .collect();
        let min_fitness = member_fitnesses.iter().copied().fold(f64::INFINITY, f64::min);
        let max_fitness = member_fitnesses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let fitness_range = (max_fitness - min_fitness).max(config.fitness_min_divisor);

        let mut adjusted_fitnesses = Vec::with_capacity(surviving.len());
        let mut previous_sizes = Vec::with_capacity(surviving.len());
        for species_id in &surviving {
            if let Some(species) = species_set.get_mut(*species_id) {
                let fitnesses: Vec<f64> = species
                    .members
                    .iter()
                    .filter_map(|id| genomes.get(id))
                    .map(|g| g.fitness())
                    .collect();
                let mean = crate::Aggregation::Mean.apply(&fitnesses);
                species.adjusted_fitness = (mean - min_fitness) / fitness_range;
                adjusted_fitnesses.push(species.adjusted_fitness);
                previous_sizes.push(species.members.len());
            }
        }

        let min_species_size = config.min_species_size.max(config.elitism);
        let spawn_amounts = compute_spawn(
            &adjusted_fitnesses,
            &previous_sizes,
            config.size.get(),
            min_species_size,
        );
        debug!(generation, ?spawn_amounts, ?adjusted_fitnesses, "allotted offspring");

        let mut offspring = BTreeMap::new();
        let mut factory = OffspringFactory::new(genomes, config, genetic_config, context);
        for (species_id, spawn) in surviving.iter().zip(spawn_amounts) {
            if let Some(species) = species_set.get(*species_id) {
                factory.generate_offspring(species, spawn, &mut offspring, &mut self.ancestry)?;
            }
        }
        // Only the new generation and its parents' records are kept.
        self.ancestry
            .retain(|id, _| offspring.contains_key(id) || genomes.contains_key(id));
        Ok(offspring)
    }

    /// Returns the parents of a genome created by mating, or
    /// `None` for unknown or initial genomes.
    pub fn parents_of(&self, genome_id: GenomeId) -> Option<(GenomeId, GenomeId)> {
        self.ancestry.get(&genome_id).copied().flatten()
    }

    /// Returns the parent record of the genomes of the latest
    /// two generations.
    pub fn ancestors(&self) -> &Ancestry {
        &self.ancestry
    }
}

/// Allots offspring to species in proportion to their adjusted
/// fitness, moving each species only halfway from its previous
/// size toward its proportional target every generation.
///
/// The result always sums to `population_size`, and each entry is
/// at least `min_species_size` whenever the population is large
/// enough to give every species that many.
///
/// # Examples
/// ```
/// use neatflow::compute_spawn;
///
/// let spawn = compute_spawn(&[0.9, 0.1], &[50, 50], 100, 2);
/// assert_eq!(spawn.iter().sum::<usize>(), 100);
/// assert!(spawn[0] > 50 && spawn[1] < 50);
/// ```
pub fn compute_spawn(
    adjusted_fitnesses: &[f64],
    previous_sizes: &[usize],
    population_size: usize,
    min_species_size: usize,
) -> Vec<usize> {
    debug_assert_eq!(adjusted_fitnesses.len(), previous_sizes.len());
    if adjusted_fitnesses.is_empty() {
        return vec![];
    }
    let total: f64 = adjusted_fitnesses.iter().sum();
    let damped: Vec<f64> = adjusted_fitnesses
        .iter()
        .zip(previous_sizes)
        .map(|(adjusted, previous)| {
            let target = if total > 0.0 {
                (adjusted / total * population_size as f64).max(min_species_size as f64)
            } else {
                min_species_size as f64
            };
            let previous = *previous as f64;
            let delta = (target - previous) * 0.5;
            let step = delta.round();
            let spawn = if step != 0.0 {
                previous + step
            } else if delta > 0.0 {
                previous + 1.0
            } else if delta < 0.0 {
                previous - 1.0
            } else {
                previous
            };
            spawn.max(0.0)
        })
        .collect();
    normalize_spawn(&damped, population_size, min_species_size)
}

/// Scales spawn amounts so they sum to exactly `population_size`.
/// Every species keeps a floor of `min_species_size` (lowered when
/// the population is too small for it) and the rest is shared in
/// proportion to each species' amount above that floor.
fn normalize_spawn(spawn: &[f64], population_size: usize, min_species_size: usize) -> Vec<usize> {
    let floor = min_species_size.min(population_size / spawn.len());
    let free = population_size - floor * spawn.len();
    let mut excess: Vec<f64> = spawn.iter().map(|s| (s - floor as f64).max(0.0)).collect();
    let mut total: f64 = excess.iter().sum();
    if total <= 0.0 {
        excess.iter_mut().for_each(|e| *e = 1.0);
        total = excess.len() as f64;
    }
    let shares: Vec<f64> = excess.iter().map(|e| e / total * free as f64).collect();
    round_retain_sum(&shares, free)
        .into_iter()
        .map(|share| share + floor)
        .collect()
}

/// Rounds all values to positive whole numbers summing to `total`,
/// assuming the values already sum to it up to rounding error.
/// Rounding is done in the manner that minimizes
/// the average error to the original set of values.
fn round_retain_sum(values: &[f64], total: usize) -> Vec<usize> {
    let mut truncated: Vec<(usize, usize, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let u = f.floor().max(0.0);
            (i, u as usize, f - u)
        })
        .collect();
    let truncated_sum: usize = truncated.iter().map(|(_, u, _)| *u).sum();
    let remainder = total.saturating_sub(truncated_sum);
    // Sort in decreasing order of error
    truncated.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
    for (_, u, _) in truncated.iter_mut().take(remainder) {
        *u += 1;
    }
    truncated.sort_by_key(|(i, ..)| *i);
    truncated.into_iter().map(|(_, u, _)| u).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_after, points, PointConfig, PointGenome};
    use crate::Aggregation;
    use std::num::NonZeroUsize;

    const GENETIC: PointConfig = PointConfig {
        spread: 10.0,
        mutation_power: 0.01,
    };

    fn config(size: usize) -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(size).unwrap(),
            compatibility_threshold: 1.0,
            max_stagnation: NonZeroUsize::new(3).unwrap(),
            species_elitism: 1,
            species_fitness: Aggregation::Max,
            elitism: 1,
            survival_threshold: 0.5,
            min_species_size: 2,
            fitness_min_divisor: 1.0,
            ..PopulationConfig::default()
        }
    }

    #[test]
    fn leftover_slots_go_to_largest_fractions() {
        // 20 free slots shared by three species in a 26:33:21 ratio.
        let shares = [6.5, 8.25, 5.25];
        assert_eq!(round_retain_sum(&shares, 20), vec![7, 8, 5]);

        // Four species splitting 10 slots evenly leave two over.
        let shares = [2.5; 4];
        let spawn = round_retain_sum(&shares, 10);
        assert_eq!(spawn.iter().sum::<usize>(), 10);
        assert!(spawn.iter().all(|s| *s == 2 || *s == 3));
    }

    #[test]
    fn spawn_sums_to_population_size() {
        let cases: Vec<(Vec<f64>, Vec<usize>, usize, usize)> = vec![
            (vec![0.3], vec![10], 150, 2),
            (vec![0.0, 0.0, 0.0], vec![50, 50, 50], 150, 2),
            (vec![1.0, 0.0], vec![3, 147], 150, 2),
            (vec![0.2, 0.9, 0.4, 0.05], vec![1, 1, 1, 1], 37, 5),
            (vec![0.5; 7], vec![0; 7], 10, 3),
            (vec![0.01, 0.99], vec![149, 1], 150, 0),
        ];
        for (adjusted, previous, size, min) in cases {
            let spawn = compute_spawn(&adjusted, &previous, size, min);
            assert_eq!(spawn.len(), adjusted.len());
            assert_eq!(spawn.iter().sum::<usize>(), size, "{:?} {:?}", adjusted, previous);
            let floor = min.min(size / adjusted.len());
            assert!(spawn.iter().all(|s| *s >= floor), "{:?}", spawn);
        }
    }

    #[test]
    fn spawn_moves_halfway_toward_target() {
        // Targets are 75 and 25: halfway from 50/50 is 62.5/37.5.
        let spawn = compute_spawn(&[0.75, 0.25], &[50, 50], 100, 0);
        assert!(spawn == vec![62, 38] || spawn == vec![63, 37], "{:?}", spawn);
    }

    #[test]
    fn spawn_nudges_small_differences() {
        // Target 11 from 10: a half step rounds to zero but must still move.
        let spawn = compute_spawn(&[0.55, 0.45], &[10, 10], 20, 0);
        assert_eq!(spawn, vec![11, 9]);
    }

    #[test]
    fn empty_input_yields_empty_spawn() {
        assert!(compute_spawn(&[], &[], 10, 2).is_empty());
    }

    fn two_species_population() -> (SpeciesSet<PointGenome>, BTreeMap<GenomeId, PointGenome>) {
        let genomes = points(&[
            (1, 0.0, 1.0),
            (2, 0.1, 2.0),
            (3, 0.2, 3.0),
            (4, 5.0, 8.0),
            (5, 5.1, 9.0),
            (6, 5.2, 10.0),
        ]);
        let mut species_set = SpeciesSet::new();
        species_set.speciate(&genomes, 0, 1.0, &GENETIC);
        (species_set, genomes)
    }

    #[test]
    fn reproduce_refills_population_with_elites_and_children() {
        let (mut species_set, genomes) = two_species_population();
        let config = config(6);
        let mut context = context_after(6, 9);
        let mut reproduction = Reproduction::new(&config);

        let next = reproduction
            .reproduce(&config, &GENETIC, &mut species_set, &genomes, 0, &mut context)
            .unwrap();

        assert_eq!(next.len(), 6);
        // The best member of each species is carried over untouched.
        assert_eq!(next.get(&3), genomes.get(&3));
        assert_eq!(next.get(&6), genomes.get(&6));
        for (id, genome) in &next {
            if genomes.contains_key(id) {
                continue;
            }
            let (p1, p2) = reproduction.parents_of(*id).unwrap();
            // Parents come from the top half of a single species.
            assert!([2, 3, 5, 6].contains(&p1) && [2, 3, 5, 6].contains(&p2));
            assert_eq!(species_set.species_of(p1), species_set.species_of(p2));
            assert!(genome.position.is_finite());
        }
        let adjusted: Vec<f64> = species_set.species().map(|s| s.adjusted_fitness()).collect();
        assert_eq!(adjusted, vec![(2.0 - 1.0) / 9.0, (9.0 - 1.0) / 9.0]);
    }

    #[test]
    fn reproduce_reports_extinction() {
        let (mut species_set, genomes) = two_species_population();
        let config = PopulationConfig {
            max_stagnation: NonZeroUsize::new(1).unwrap(),
            species_elitism: 0,
            ..config(6)
        };
        let mut context = context_after(6, 1);
        let mut reproduction = Reproduction::new(&config);

        reproduction
            .reproduce(&config, &GENETIC, &mut species_set, &genomes, 0, &mut context)
            .unwrap();
        let result = reproduction.reproduce(&config, &GENETIC, &mut species_set, &genomes, 5, &mut context);

        assert_eq!(result, Err(NeatError::CompleteExtinction { generation: 5 }));
        assert!(species_set.is_empty());
    }

    #[test]
    fn initial_genomes_have_no_parents() {
        let config = config(4);
        let mut context = Context::seeded(2);
        let mut reproduction = Reproduction::new(&config);
        let genomes: BTreeMap<GenomeId, PointGenome> =
            reproduction.create_new(4, &GENETIC, &mut context).unwrap();

        assert_eq!(genomes.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(genomes.keys().all(|id| reproduction.parents_of(*id).is_none()));
        assert_eq!(reproduction.ancestors().len(), 4);
    }
}
