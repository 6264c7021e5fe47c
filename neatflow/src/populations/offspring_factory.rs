use super::{PopulationConfig, Species};
use crate::{Context, Genome, GenomeId, Result};

use ahash::RandomState;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Parent pair of every genome produced by mating;
/// `None` for genomes created from scratch. Records of genomes
/// older than the previous generation are dropped.
pub type Ancestry = HashMap<GenomeId, Option<(GenomeId, GenomeId)>, RandomState>;

/// Auxiliary type for offspring generation.
/// Handles the generation of a species' allotted offspring
/// according to the specified configs: the species' elite is
/// copied as-is and the remainder is mated from the top
/// performers.
pub(super) struct OffspringFactory<'a, G: Genome> {
    genomes: &'a BTreeMap<GenomeId, G>,
    population_config: &'a PopulationConfig,
    genetic_config: &'a G::Config,
    context: &'a mut Context,
}

impl<'a, G: Genome> OffspringFactory<'a, G> {
    pub(super) fn new(
        genomes: &'a BTreeMap<GenomeId, G>,
        population_config: &'a PopulationConfig,
        genetic_config: &'a G::Config,
        context: &'a mut Context,
    ) -> OffspringFactory<'a, G> {
        OffspringFactory {
            genomes,
            population_config,
            genetic_config,
            context,
        }
    }

    /// Generate the allotted offspring of `species` into
    /// `offspring`, recording each child's parents.
    pub(super) fn generate_offspring(
        &mut self,
        species: &Species<G>,
        allotted_offspring: usize,
        offspring: &mut BTreeMap<GenomeId, G>,
        ancestry: &mut Ancestry,
    ) -> Result<()> {
        let members = self.sorted_members(species);
        if members.is_empty() {
            return Ok(());
        }
        let elite = species
            .count_elite(self.population_config)
            .min(allotted_offspring);

        for genome in &members[..elite] {
            offspring.insert(genome.id(), (*genome).clone());
        }

        let survivors = species
            .count_survivors(self.population_config)
            .min(members.len());
        self.add_mated_offspring(
            allotted_offspring - elite,
            &members[..survivors],
            offspring,
            ancestry,
        )
    }

    /// Members of the species, best first.
    fn sorted_members(&self, species: &Species<G>) -> Vec<&'a G> {
        let genomes = self.genomes;
        let mut members: Vec<&'a G> = species
            .members()
            .iter()
            .filter_map(|id| genomes.get(id))
            .collect();
        members.sort_by(|g1, g2| {
            g2.fitness()
                .partial_cmp(&g1.fitness())
                .unwrap_or(Ordering::Equal)
        });
        members
    }

    /// Choose parents uniformly from the eligible pool and mate
    /// them, adding the mutated child to the offspring.
    fn add_mated_offspring(
        &mut self,
        count: usize,
        eligible_parents: &[&G],
        offspring: &mut BTreeMap<GenomeId, G>,
        ancestry: &mut Ancestry,
    ) -> Result<()> {
        if eligible_parents.is_empty() {
            return Ok(());
        }
        for _ in 0..count {
            let parent1 = eligible_parents[self.context.index(eligible_parents.len())];
            let parent2 = eligible_parents[self.context.index(eligible_parents.len())];
            let id = self.context.next_id();
            let mut child = G::mate(id, parent1, parent2, self.genetic_config, self.context)?;
            child.mutate(self.genetic_config, self.context);
            ancestry.insert(id, Some((parent1.id(), parent2.id())));
            offspring.insert(id, child);
        }
        Ok(())
    }
}
