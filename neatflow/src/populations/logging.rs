use super::{Population, SpeciesId};
use crate::{Aggregation, Genome};

use std::fmt;

/// Defines different possible reporting levels for logging.
#[derive(Clone, Copy, Debug)]
pub enum ReportingLevel {
    /// Clones the entire population.
    AllGenomes,
    /// Clones species and their champions.
    SpeciesChampions,
    /// Clones only the population champion.
    PopulationChampion,
    /// Clones no genomes.
    NoGenomes,
}

/// A snapshot of a population.
#[derive(Clone, Debug)]
pub struct Log<G> {
    pub generation_number: usize,
    pub generation_sample: GenerationMemberRecord<G>,
    pub species_count: usize,
    pub genome_stats: Vec<(String, Stats)>,
}

impl<G> fmt::Display for Log<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Log {{")?;
        writeln!(f, "\tgeneration_number: {:?}", self.generation_number)?;
        writeln!(f, "\tspecies_count: {:?}", self.species_count)?;
        for (name, stats) in &self.genome_stats {
            writeln!(f, "\t{}: {:?}", name, stats)?;
        }
        write!(f, "}}")
    }
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub maximum: f64,
    pub minimum: f64,
    pub mean: f64,
    pub median: f64,
}

impl Stats {
    /// Returns statistics about numbers in a sequence,
    /// or `None` if it is empty.
    ///
    /// # Examples
    /// ```
    /// use neatflow::logging::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied()).unwrap();
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    ///
    /// assert!(Stats::from(std::iter::empty()).is_none());
    /// ```
    pub fn from(data: impl Iterator<Item = f64>) -> Option<Stats> {
        let data: Vec<f64> = data.collect();
        if data.is_empty() {
            return None;
        }
        Some(Stats {
            maximum: Aggregation::Max.apply(&data),
            minimum: Aggregation::Min.apply(&data),
            mean: Aggregation::Mean.apply(&data),
            median: Aggregation::Median.apply(&data),
        })
    }
}

/// A reporting-level dependant store
/// of genomes from a population.
#[derive(Clone, Debug)]
pub enum GenerationMemberRecord<G> {
    /// Species IDs, genomes and stagnation level.
    Species(Vec<(SpeciesId, Vec<G>, usize)>),
    /// Only species IDs, species champions, and stagnation level.
    SpeciesChampions(Vec<(SpeciesId, G, usize)>),
    /// Only population champion.
    PopulationChampion(G),
    /// Empty.
    None,
}

/// An in-memory record of the evolution of a population
/// over time, one [`Log`] per call to [`log`].
///
/// [`log`]: EvolutionLogger::log
#[derive(Clone, Debug)]
pub struct EvolutionLogger<G> {
    reporting_level: ReportingLevel,
    logs: Vec<Log<G>>,
}

impl<G: Genome> EvolutionLogger<G> {
    /// Returns a logger with the appropiate reporting level.
    ///
    /// # Examples
    /// ```
    /// use neatflow::logging::{EvolutionLogger, ReportingLevel};
    /// use neatflow_nn::genomics::NeuralGenome;
    ///
    /// let logger = EvolutionLogger::<NeuralGenome>::new(ReportingLevel::NoGenomes);
    /// assert_eq!(logger.iter().count(), 0);
    /// ```
    pub fn new(reporting_level: ReportingLevel) -> EvolutionLogger<G> {
        EvolutionLogger {
            reporting_level,
            logs: vec![],
        }
    }

    /// Store a snapshot of a population.
    ///
    /// The `genome_stat_extractor` provides a way of
    /// obtaining arbitrary statistics on the population,
    /// where each statistic is named by `stat_names`.
    ///
    /// # Examples
    /// ```
    /// use neatflow::logging::{EvolutionLogger, ReportingLevel};
    /// use neatflow::{Context, Genome, Population, PopulationConfig};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    ///
    /// let mut logger = EvolutionLogger::new(ReportingLevel::PopulationChampion);
    /// let mut population = Population::<NeuralGenome>::new(
    ///     PopulationConfig::default(),
    ///     GeneticConfig::default(),
    ///     Context::seeded(0),
    /// )
    /// .unwrap();
    ///
    /// population
    ///     .evaluate_fitness(|g, _| Ok::<_, std::convert::Infallible>(g.connections().len() as f64))
    ///     .unwrap();
    /// logger.log(&population, &|g| [g.fitness(), g.nodes().count() as f64], ["fitness", "nodes"]);
    ///
    /// let log = logger.iter().next().unwrap();
    /// assert_eq!(log.genome_stats[1].0, "nodes");
    /// ```
    pub fn log<GSE, const N: usize>(
        &mut self,
        population: &Population<G>,
        genome_stat_extractor: &GSE,
        stat_names: [&str; N],
    ) where
        GSE: Fn(&G) -> [f64; N],
    {
        let stats: Vec<[f64; N]> = population.genomes().map(genome_stat_extractor).collect();
        let genome_stats = stat_names
            .iter()
            .map(|name| name.to_string())
            .zip(unzip_n_vecs(stats))
            .filter_map(|(name, data)| Stats::from(data.into_iter()).map(|stats| (name, stats)))
            .collect();

        let members = |species: &super::Species<G>| -> Vec<G> {
            species
                .members()
                .iter()
                .filter_map(|id| population.genome(*id))
                .cloned()
                .collect()
        };
        let generation = population.generation();
        let generation_sample = match self.reporting_level {
            ReportingLevel::AllGenomes => GenerationMemberRecord::Species(
                population
                    .species()
                    .map(|s| (s.id(), members(s), s.time_stagnated(generation)))
                    .collect(),
            ),
            ReportingLevel::SpeciesChampions => GenerationMemberRecord::SpeciesChampions(
                population
                    .species()
                    .filter_map(|s| {
                        let champion = members(s).into_iter().fold(None, |best: Option<G>, g| match best {
                            Some(b) if b.fitness() >= g.fitness() => Some(b),
                            _ => Some(g),
                        })?;
                        Some((s.id(), champion, s.time_stagnated(generation)))
                    })
                    .collect(),
            ),
            ReportingLevel::PopulationChampion => match population.champion() {
                Some(champion) => GenerationMemberRecord::PopulationChampion(champion.clone()),
                None => GenerationMemberRecord::None,
            },
            ReportingLevel::NoGenomes => GenerationMemberRecord::None,
        };

        self.logs.push(Log {
            generation_number: generation,
            generation_sample,
            species_count: population.species().count(),
            genome_stats,
        })
    }

    /// Iterate over all logged snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &Log<G>> {
        self.logs.iter()
    }
}

fn unzip_n_vecs<T: Clone, const N: usize>(rows: Vec<[T; N]>) -> Vec<Vec<T>> {
    let mut vecs = vec![Vec::with_capacity(rows.len()); N];
    for row in rows {
        for (column, item) in vecs.iter_mut().zip(row) {
            column.push(item);
        }
    }
    vecs
}
