use super::{GenomeDistanceCache, Species, SpeciesId};
use crate::{Genome, GenomeId};

use ahash::RandomState;
use tracing::debug;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Registry of the live species of a population.
///
/// Species are kept in ID order so that speciation, which
/// visits them in that order, is reproducible.
#[derive(Debug, Clone)]
pub struct SpeciesSet<G> {
    species: BTreeMap<SpeciesId, Species<G>>,
    genome_to_species: HashMap<GenomeId, SpeciesId, RandomState>,
    next_species_id: u64,
}

impl<G: Genome> SpeciesSet<G> {
    pub fn new() -> SpeciesSet<G> {
        SpeciesSet {
            species: BTreeMap::new(),
            genome_to_species: HashMap::default(),
            next_species_id: 1,
        }
    }

    /// Partitions `genomes` into species.
    ///
    /// First, every existing species claims the unspeciated
    /// genome nearest to its previous representative as its new
    /// representative; species left without a candidate die out.
    /// Then each remaining genome joins the species with the
    /// nearest representative if it lies below `threshold`,
    /// or founds a new species otherwise.
    ///
    /// # Examples
    /// ```
    /// use neatflow::{Context, Genome, SpeciesSet};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    /// use std::collections::BTreeMap;
    ///
    /// let config = GeneticConfig::default();
    /// let mut context = Context::seeded(5);
    /// let genome = NeuralGenome::new(context.next_id(), &config, &mut context).unwrap();
    /// let twin = genome.with_id(context.next_id());
    ///
    /// let genomes: BTreeMap<_, _> = [genome, twin]
    ///     .into_iter()
    ///     .map(|g| (g.id(), g))
    ///     .collect();
    ///
    /// let mut species_set = SpeciesSet::new();
    /// species_set.speciate(&genomes, 0, 0.5, &config);
    /// assert_eq!(species_set.len(), 1);
    /// ```
    pub fn speciate(
        &mut self,
        genomes: &BTreeMap<GenomeId, G>,
        generation: usize,
        threshold: f64,
        config: &G::Config,
    ) {
        let mut cache = GenomeDistanceCache::new(config);
        let mut unspeciated: BTreeSet<GenomeId> = genomes.keys().copied().collect();
        let mut representatives: BTreeMap<SpeciesId, GenomeId> = BTreeMap::new();
        let mut members: BTreeMap<SpeciesId, Vec<GenomeId>> = BTreeMap::new();

        for (&species_id, species) in &self.species {
            let nearest = unspeciated
                .iter()
                .map(|id| (cache.distance(&species.representative, &genomes[id]), *id))
                .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            if let Some((_, genome_id)) = nearest {
                unspeciated.remove(&genome_id);
                representatives.insert(species_id, genome_id);
                members.insert(species_id, vec![genome_id]);
            }
        }

        for genome_id in unspeciated {
            let genome = &genomes[&genome_id];
            let nearest = representatives
                .iter()
                .map(|(species_id, rep)| (cache.distance(&genomes[rep], genome), *species_id))
                .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            match nearest {
                Some((distance, species_id)) if distance < threshold => {
                    members.entry(species_id).or_default().push(genome_id);
                }
                _ => {
                    let species_id = self.next_id();
                    representatives.insert(species_id, genome_id);
                    members.insert(species_id, vec![genome_id]);
                }
            }
        }

        let previous_count = self.species.len();
        let mut species = BTreeMap::new();
        self.genome_to_species.clear();
        for (species_id, representative) in representatives {
            let members = members.remove(&species_id).unwrap_or_default();
            for member in &members {
                self.genome_to_species.insert(*member, species_id);
            }
            let representative = genomes[&representative].clone();
            let mut entry = match self.species.remove(&species_id) {
                Some(mut existing) => {
                    existing.representative = representative;
                    existing
                }
                None => Species::new(species_id, representative, generation),
            };
            entry.summarize(members.iter().map(|id| genomes[id].fitness()));
            entry.members = members;
            species.insert(species_id, entry);
        }
        let extinct = self.species.len();
        self.species = species;

        debug!(
            generation,
            species = self.species.len(),
            previous = previous_count,
            extinct,
            cached_distances = cache.len(),
            cache_hits = cache.hits(),
            "speciated population"
        );
    }

    /// Returns whether `genome` is compatible with the
    /// representative of the species `species_id`.
    /// Unknown species are never compatible.
    pub fn compatible_with_species(
        &self,
        species_id: SpeciesId,
        genome: &G,
        threshold: f64,
        config: &G::Config,
    ) -> bool {
        self.species
            .get(&species_id)
            .map_or(false, |s| s.is_compatible(genome, threshold, config))
    }

    /// Recomputes every species' best and mean fitness
    /// from the current member fitnesses.
    pub fn refresh_fitness(&mut self, genomes: &BTreeMap<GenomeId, G>) {
        for species in self.species.values_mut() {
            let fitnesses: Vec<f64> = species
                .members
                .iter()
                .filter_map(|id| genomes.get(id))
                .map(|g| g.fitness())
                .collect();
            species.summarize(fitnesses.into_iter());
        }
    }

    /// Returns the species the genome was assigned to
    /// during the latest speciation.
    pub fn species_of(&self, genome_id: GenomeId) -> Option<SpeciesId> {
        self.genome_to_species.get(&genome_id).copied()
    }

    pub fn get(&self, species_id: SpeciesId) -> Option<&Species<G>> {
        self.species.get(&species_id)
    }

    /// Returns an iterator over all live species, in ID order.
    pub fn species(&self) -> impl Iterator<Item = &Species<G>> {
        self.species.values()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub(super) fn species_mut(&mut self) -> impl Iterator<Item = &mut Species<G>> {
        self.species.values_mut()
    }

    pub(super) fn get_mut(&mut self, species_id: SpeciesId) -> Option<&mut Species<G>> {
        self.species.get_mut(&species_id)
    }

    /// Removes a species and forgets its members' assignment.
    pub(super) fn remove(&mut self, species_id: SpeciesId) -> Option<Species<G>> {
        let removed = self.species.remove(&species_id)?;
        for member in &removed.members {
            self.genome_to_species.remove(member);
        }
        Some(removed)
    }

    fn next_id(&mut self) -> SpeciesId {
        let id = SpeciesId(self.next_species_id);
        self.next_species_id += 1;
        id
    }
}

impl<G: Genome> Default for SpeciesSet<G> {
    fn default() -> Self {
        SpeciesSet::new()
    }
}
