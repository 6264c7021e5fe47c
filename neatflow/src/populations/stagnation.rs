use super::{PopulationConfig, SpeciesId, SpeciesSet};
use crate::{Aggregation, Genome, GenomeId};

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Tracks per-species fitness over time and decides which
/// species have stopped improving.
#[derive(Clone, Debug)]
pub struct Stagnation {
    species_fitness: Aggregation,
    max_stagnation: usize,
    species_elitism: usize,
}

impl Stagnation {
    pub fn new(config: &PopulationConfig) -> Stagnation {
        Stagnation {
            species_fitness: config.species_fitness,
            max_stagnation: config.max_stagnation.get(),
            species_elitism: config.species_elitism,
        }
    }

    /// Records each species' fitness for `generation` and
    /// returns every species with its stagnation flag, sorted
    /// by ascending species fitness.
    ///
    /// A species is stagnant if it has not improved for
    /// [`max_stagnation`] generations, unless it ranks among the
    /// [`species_elitism`] best, or flagging it would leave fewer
    /// than [`species_elitism`] species alive.
    ///
    /// [`max_stagnation`]: PopulationConfig::max_stagnation
    /// [`species_elitism`]: PopulationConfig::species_elitism
    pub fn update<G: Genome>(
        &self,
        species_set: &mut SpeciesSet<G>,
        genomes: &BTreeMap<GenomeId, G>,
        generation: usize,
    ) -> Vec<(SpeciesId, bool)> {
        let mut ranked: Vec<(SpeciesId, f64, usize)> = species_set
            .species_mut()
            .map(|species| {
                let fitnesses: Vec<f64> = species
                    .members
                    .iter()
                    .filter_map(|id| genomes.get(id))
                    .map(|g| g.fitness())
                    .collect();
                let fitness = self.species_fitness.apply(&fitnesses);
                let previous_best = species
                    .fitness_history
                    .iter()
                    .copied()
                    .fold(None, |best: Option<f64>, f| Some(best.map_or(f, |b| b.max(f))));
                species.fitness_history.push(fitness);
                if previous_best.map_or(true, |best| fitness > best) {
                    species.last_improved = generation;
                }
                (species.id(), fitness, species.time_stagnated(generation))
            })
            .collect();

        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let count = ranked.len();
        let mut non_stagnant = count;
        ranked
            .into_iter()
            .enumerate()
            .map(|(rank, (species_id, _, stale_for))| {
                let protected = count - rank <= self.species_elitism;
                let stagnant = !protected
                    && non_stagnant > self.species_elitism
                    && stale_for >= self.max_stagnation;
                if stagnant {
                    non_stagnant -= 1;
                }
                (species_id, stagnant)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{points, PointConfig};
    use std::num::NonZeroUsize;

    const CONFIG: PointConfig = PointConfig {
        spread: 10.0,
        mutation_power: 0.0,
    };

    fn stagnation(max_stagnation: usize, species_elitism: usize) -> Stagnation {
        Stagnation::new(&PopulationConfig {
            max_stagnation: NonZeroUsize::new(max_stagnation).unwrap(),
            species_elitism,
            species_fitness: Aggregation::Mean,
            ..PopulationConfig::zero()
        })
    }

    /// Three species at positions 0, 10 and 20 with increasing fitness.
    fn three_species() -> (SpeciesSet<crate::testing::PointGenome>, BTreeMap<GenomeId, crate::testing::PointGenome>) {
        let genomes = points(&[(1, 0.0, 1.0), (2, 10.0, 2.0), (3, 20.0, 3.0)]);
        let mut species_set = SpeciesSet::new();
        species_set.speciate(&genomes, 0, 1.0, &CONFIG);
        (species_set, genomes)
    }

    #[test]
    fn first_record_counts_as_improvement() {
        let (mut species_set, genomes) = three_species();
        let flags = stagnation(5, 0).update(&mut species_set, &genomes, 3);

        assert!(flags.iter().all(|(_, stagnant)| !stagnant));
        assert!(species_set.species().all(|s| s.last_improved() == 3));
        assert!(species_set.species().all(|s| s.fitness_history().len() == 1));
    }

    #[test]
    fn stale_species_flagged_in_ascending_order() {
        let (mut species_set, genomes) = three_species();
        let stagnation = stagnation(2, 0);
        stagnation.update(&mut species_set, &genomes, 0);
        let flags = stagnation.update(&mut species_set, &genomes, 2);

        let order: Vec<u64> = flags.iter().map(|(id, _)| id.0).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(flags.iter().all(|(_, stagnant)| *stagnant));
    }

    #[test]
    fn top_species_never_stagnant() {
        let (mut species_set, genomes) = three_species();
        let stagnation = stagnation(1, 2);
        stagnation.update(&mut species_set, &genomes, 0);
        let flags = stagnation.update(&mut species_set, &genomes, 1_000_000);

        assert_eq!(
            flags,
            vec![(SpeciesId(1), true), (SpeciesId(2), false), (SpeciesId(3), false)]
        );
    }

    #[test]
    fn improvement_resets_staleness() {
        let (mut species_set, mut genomes) = three_species();
        let stagnation = stagnation(2, 0);
        stagnation.update(&mut species_set, &genomes, 0);

        genomes.get_mut(&1).unwrap().fitness = 50.0;
        let flags = stagnation.update(&mut species_set, &genomes, 2);

        assert_eq!(flags.last(), Some(&(SpeciesId(1), false)));
        assert_eq!(species_set.get(SpeciesId(1)).unwrap().last_improved(), 2);
        assert_eq!(species_set.get(SpeciesId(1)).unwrap().fitness_history(), &[1.0, 50.0]);
    }
}
