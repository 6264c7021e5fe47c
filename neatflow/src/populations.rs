//! A Population is a collection of genomes.
//! These are grouped into species, which can
//! be evolved using a genome evaluation function
//! as the source of selective pressure.
mod config;
mod distance_cache;
pub mod logging;
mod offspring_factory;
mod reproduction;
mod species;
mod species_set;
mod stagnation;

use crate::{Context, Genome, GenomeId, NeatError, Result};
pub use config::PopulationConfig;
pub use distance_cache::GenomeDistanceCache;
pub use offspring_factory::Ancestry;
pub use reproduction::{compute_spawn, Reproduction};
pub use species::{Species, SpeciesId};
pub use species_set::SpeciesSet;
pub use stagnation::Stagnation;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{info, warn};

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

/// Why a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The fitness criterion reached the fitness threshold.
    Solved,
    /// Every species went stagnant and resets were disabled.
    Extinct,
    /// The requested number of generations was evaluated.
    GenerationLimit,
}

/// Lifecycle of a [`Population`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Evaluating,
    Terminated(Termination),
}

/// A population of genomes.
pub struct Population<G: Genome> {
    genomes: BTreeMap<GenomeId, G>,
    species_set: SpeciesSet<G>,
    reproduction: Reproduction,
    generation: usize,
    state: RunState,
    best_this_generation: Option<G>,
    best_ever: Option<G>,
    population_config: PopulationConfig,
    genetic_config: G::Config,
    context: Context,
}

impl<G: Genome> Population<G> {
    /// Creates a new population of random genomes using the
    /// passed configurations, and speciates it.
    ///
    /// The type of `genetic_config` depends on the implementation
    /// of [`Genome`], and is effectively opaque to the population.
    ///
    /// # Errors
    /// Returns a configuration error if `population_config` is
    /// invalid, or any error raised while creating genomes.
    ///
    /// # Examples
    /// ```
    /// use neatflow::{Context, Population, PopulationConfig};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    ///
    /// let population = Population::<NeuralGenome>::new(
    ///     PopulationConfig::default(),
    ///     GeneticConfig::default(),
    ///     Context::seeded(0),
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(population.genomes().count(), 150);
    /// assert_eq!(population.generation(), 0);
    /// ```
    pub fn new(
        population_config: PopulationConfig,
        genetic_config: G::Config,
        context: Context,
    ) -> Result<Population<G>> {
        Population::with_genomes(vec![], population_config, genetic_config, context)
    }

    /// Creates a new population containing `seed` genomes, filling
    /// the remaining space with random genomes.
    ///
    /// # Errors
    /// Returns a configuration error if `population_config` is
    /// invalid, if there are more seed genomes than the population
    /// size, or if two seed genomes share an ID.
    ///
    /// # Examples
    /// ```
    /// use neatflow::{Context, Genome, Population, PopulationConfig};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig::default();
    /// let mut context = Context::seeded(3);
    /// let seed = NeuralGenome::new(context.next_id(), &config, &mut context).unwrap();
    /// let seed_id = seed.id();
    ///
    /// let population = Population::with_genomes(
    ///     vec![seed],
    ///     PopulationConfig {
    ///         size: NonZeroUsize::new(10).unwrap(),
    ///         ..PopulationConfig::default()
    ///     },
    ///     config,
    ///     context,
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(population.genomes().count(), 10);
    /// assert!(population.genome(seed_id).is_some());
    /// ```
    pub fn with_genomes(
        seed: Vec<G>,
        population_config: PopulationConfig,
        genetic_config: G::Config,
        mut context: Context,
    ) -> Result<Population<G>> {
        population_config.validate()?;
        let size = population_config.size.get();
        if seed.len() > size {
            return Err(NeatError::configuration(format!(
                "{} seed genomes exceed the population size of {}",
                seed.len(),
                size
            )));
        }

        let mut reproduction = Reproduction::new(&population_config);
        let mut genomes = BTreeMap::new();
        for genome in seed {
            let id = genome.id();
            if genomes.insert(id, genome).is_some() {
                return Err(NeatError::configuration(format!(
                    "duplicate seed genome ID {}",
                    id
                )));
            }
        }
        genomes.append(&mut reproduction.create_new(
            size - genomes.len(),
            &genetic_config,
            &mut context,
        )?);
        if genomes.len() != size {
            return Err(NeatError::configuration(
                "seed genome IDs collide with the context's ID sequence",
            ));
        }

        let mut species_set = SpeciesSet::new();
        species_set.speciate(
            &genomes,
            0,
            population_config.compatibility_threshold,
            &genetic_config,
        );

        Ok(Population {
            genomes,
            species_set,
            reproduction,
            generation: 0,
            state: RunState::Evaluating,
            best_this_generation: None,
            best_ever: None,
            population_config,
            genetic_config,
            context,
        })
    }

    /// Evaluates the fitness of each genome in the
    /// population using the passed evaluator, which
    /// also receives the current generation.
    ///
    /// # Errors
    /// Returns [`NeatError::Evaluation`] for the first genome
    /// whose evaluation fails or yields a non-finite fitness.
    ///
    /// # Examples
    /// ```
    /// use neatflow::{Context, Genome, Population, PopulationConfig};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    /// use neatflow_nn::networks::FeedForwardNetwork;
    /// use std::convert::Infallible;
    ///
    /// let mut population = Population::<NeuralGenome>::new(
    ///     PopulationConfig::default(),
    ///     GeneticConfig::default(),
    ///     Context::seeded(1),
    /// )
    /// .unwrap();
    ///
    /// population
    ///     .evaluate_fitness(|genome, _generation| {
    ///         let network = FeedForwardNetwork::new(genome);
    ///         let output = network.activate(&[1.0, 0.0]).unwrap()[0];
    ///         // Outputs closer to 0 score higher.
    ///         Ok::<_, Infallible>(1.0 - output.abs().min(1.0))
    ///     })
    ///     .unwrap();
    ///
    /// assert!(population.champion().unwrap().fitness() <= 1.0);
    /// ```
    pub fn evaluate_fitness<F, E>(&mut self, mut evaluator: F) -> Result<()>
    where
        F: FnMut(&G, usize) -> std::result::Result<f64, E>,
        E: fmt::Display,
    {
        let generation = self.generation;
        for (id, genome) in self.genomes.iter_mut() {
            let fitness = evaluator(genome, generation).map_err(|e| NeatError::Evaluation {
                genome: *id,
                reason: e.to_string(),
            })?;
            genome.set_fitness(checked_fitness(*id, fitness)?);
        }
        self.finish_evaluation();
        Ok(())
    }

    /// Evaluates every genome concurrently, one tokio task per
    /// genome, each bounded by the configured
    /// [`evaluation_timeout`]. The evaluator receives an owned
    /// copy of the genome.
    ///
    /// # Errors
    /// Returns [`NeatError::Evaluation`] for the first genome
    /// (in ID order) whose evaluation fails, panics, times out
    /// or yields a non-finite fitness. Fitness values are only
    /// written if every evaluation succeeded.
    ///
    /// [`evaluation_timeout`]: PopulationConfig::evaluation_timeout
    pub async fn evaluate_concurrently<F, Fut, E>(&mut self, evaluator: F) -> Result<()>
    where
        G: Send + 'static,
        F: Fn(G, usize) -> Fut,
        Fut: Future<Output = std::result::Result<f64, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let deadline = self.population_config.evaluation_timeout;
        let generation = self.generation;
        let handles: Vec<_> = self
            .genomes
            .values()
            .map(|genome| {
                let task = evaluator(genome.clone(), generation);
                (
                    genome.id(),
                    tokio::spawn(async move { timeout(deadline, task).await }),
                )
            })
            .collect();

        let mut fitnesses = Vec::with_capacity(handles.len());
        let mut handles = handles.into_iter();
        while let Some((id, handle)) = handles.next() {
            let outcome = match handle.await {
                Ok(Ok(Ok(fitness))) => checked_fitness(id, fitness),
                Ok(Ok(Err(e))) => Err(NeatError::Evaluation {
                    genome: id,
                    reason: e.to_string(),
                }),
                Ok(Err(_)) => Err(NeatError::Evaluation {
                    genome: id,
                    reason: format!("timed out after {:?}", deadline),
                }),
                Err(e) => Err(NeatError::Evaluation {
                    genome: id,
                    reason: e.to_string(),
                }),
            };
            match outcome {
                Ok(fitness) => fitnesses.push((id, fitness)),
                Err(e) => {
                    handles.for_each(|(_, handle)| handle.abort());
                    return Err(e);
                }
            }
        }

        for (id, fitness) in fitnesses {
            if let Some(genome) = self.genomes.get_mut(&id) {
                genome.set_fitness(fitness);
            }
        }
        self.finish_evaluation();
        Ok(())
    }

    /// Advances the population one generation, after its
    /// fitness has been evaluated.
    ///
    /// If fitness termination is enabled and the fitness
    /// criterion reaches the threshold, the population is
    /// marked solved and left unchanged. Otherwise the next
    /// generation is reproduced and speciated. Terminated
    /// populations are left untouched; see [`reset`].
    ///
    /// # Errors
    /// Returns [`NeatError::CompleteExtinction`] if every
    /// species stagnated and [`reset_on_extinction`] is off,
    /// in which case the population is marked extinct.
    ///
    /// [`reset`]: Population::reset
    /// [`reset_on_extinction`]: PopulationConfig::reset_on_extinction
    pub fn evolve(&mut self) -> Result<RunState> {
        if let RunState::Terminated(_) = self.state {
            return Ok(self.state);
        }
        if self.is_solved() {
            info!(generation = self.generation, "fitness threshold reached");
            self.state = RunState::Terminated(Termination::Solved);
            return Ok(self.state);
        }

        let offspring = match self.reproduction.reproduce(
            &self.population_config,
            &self.genetic_config,
            &mut self.species_set,
            &self.genomes,
            self.generation,
            &mut self.context,
        ) {
            Ok(offspring) => offspring,
            Err(NeatError::CompleteExtinction { generation })
                if self.population_config.reset_on_extinction =>
            {
                warn!(generation, "complete extinction, resetting population");
                self.reproduction.create_new(
                    self.population_config.size.get(),
                    &self.genetic_config,
                    &mut self.context,
                )?
            }
            Err(e) => {
                if let NeatError::CompleteExtinction { generation } = e {
                    warn!(generation, "complete extinction");
                    self.state = RunState::Terminated(Termination::Extinct);
                }
                return Err(e);
            }
        };

        self.genomes = offspring;
        self.generation += 1;
        self.species_set.speciate(
            &self.genomes,
            self.generation,
            self.population_config.compatibility_threshold,
            &self.genetic_config,
        );
        Ok(self.state)
    }

    /// Repeatedly evaluates and evolves the population until
    /// it is solved, goes extinct, or `generation_limit`
    /// generations have been evaluated.
    ///
    /// # Errors
    /// Returns a configuration error if fitness termination
    /// is disabled and no limit is given, and propagates
    /// evaluation and extinction errors.
    ///
    /// # Examples
    /// ```
    /// use neatflow::{Context, Population, PopulationConfig, Termination};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    /// use std::convert::Infallible;
    ///
    /// let mut population = Population::<NeuralGenome>::new(
    ///     PopulationConfig {
    ///         fitness_threshold: 5.0,
    ///         ..PopulationConfig::default()
    ///     },
    ///     GeneticConfig::default(),
    ///     Context::seeded(2),
    /// )
    /// .unwrap();
    ///
    /// // A fitness that rises with time solves the run in generation 5.
    /// let termination = population
    ///     .run(|_, generation| Ok::<_, Infallible>(generation as f64), Some(10))
    ///     .unwrap();
    /// assert_eq!(termination, Termination::Solved);
    /// assert_eq!(population.generation(), 5);
    /// ```
    pub fn run<F, E>(&mut self, mut evaluator: F, generation_limit: Option<usize>) -> Result<Termination>
    where
        F: FnMut(&G, usize) -> std::result::Result<f64, E>,
        E: fmt::Display,
    {
        self.check_run_limits(generation_limit)?;
        let mut evaluated = 0;
        loop {
            if let RunState::Terminated(termination) = self.state {
                return Ok(termination);
            }
            if generation_limit.map_or(false, |limit| evaluated >= limit) {
                self.state = RunState::Terminated(Termination::GenerationLimit);
                continue;
            }
            self.evaluate_fitness(&mut evaluator)?;
            self.evolve()?;
            evaluated += 1;
        }
    }

    /// Asynchronous counterpart of [`run`], evaluating each
    /// generation with [`evaluate_concurrently`].
    ///
    /// [`run`]: Population::run
    /// [`evaluate_concurrently`]: Population::evaluate_concurrently
    pub async fn run_concurrent<F, Fut, E>(
        &mut self,
        evaluator: F,
        generation_limit: Option<usize>,
    ) -> Result<Termination>
    where
        G: Send + 'static,
        F: Fn(G, usize) -> Fut,
        Fut: Future<Output = std::result::Result<f64, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.check_run_limits(generation_limit)?;
        let mut evaluated = 0;
        loop {
            if let RunState::Terminated(termination) = self.state {
                return Ok(termination);
            }
            if generation_limit.map_or(false, |limit| evaluated >= limit) {
                self.state = RunState::Terminated(Termination::GenerationLimit);
                continue;
            }
            self.evaluate_concurrently(&evaluator).await?;
            self.evolve()?;
            evaluated += 1;
        }
    }

    /// Resets the population to an initial randomized state,
    /// keeping its configuration and ID sequence.
    pub fn reset(&mut self) -> Result<()> {
        let mut reproduction = Reproduction::new(&self.population_config);
        self.genomes = reproduction.create_new(
            self.population_config.size.get(),
            &self.genetic_config,
            &mut self.context,
        )?;
        self.reproduction = reproduction;
        self.species_set = SpeciesSet::new();
        self.species_set.speciate(
            &self.genomes,
            0,
            self.population_config.compatibility_threshold,
            &self.genetic_config,
        );
        self.generation = 0;
        self.state = RunState::Evaluating;
        self.best_this_generation = None;
        self.best_ever = None;
        Ok(())
    }

    /// Returns the best genome of the latest evaluation.
    pub fn champion(&self) -> Option<&G> {
        self.best_this_generation.as_ref()
    }

    /// Returns a snapshot of the best genome ever evaluated.
    pub fn best_ever(&self) -> Option<&G> {
        self.best_ever.as_ref()
    }

    /// Returns an iterator over all current genomes, in ID order.
    pub fn genomes(&self) -> impl Iterator<Item = &G> {
        self.genomes.values()
    }

    pub fn genome(&self, id: GenomeId) -> Option<&G> {
        self.genomes.get(&id)
    }

    /// Returns an iterator over all current species, in ID order.
    pub fn species(&self) -> impl Iterator<Item = &Species<G>> {
        self.species_set.species()
    }

    pub fn species_set(&self) -> &SpeciesSet<G> {
        &self.species_set
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Returns the parent pair of every genome in the current
    /// or previous generation.
    pub fn ancestors(&self) -> &Ancestry {
        self.reproduction.ancestors()
    }

    pub fn population_config(&self) -> &PopulationConfig {
        &self.population_config
    }

    pub fn genetic_config(&self) -> &G::Config {
        &self.genetic_config
    }

    fn check_run_limits(&self, generation_limit: Option<usize>) -> Result<()> {
        if self.population_config.no_fitness_termination && generation_limit.is_none() {
            return Err(NeatError::configuration(
                "a generation limit is required when fitness termination is disabled",
            ));
        }
        Ok(())
    }

    fn is_solved(&self) -> bool {
        if self.population_config.no_fitness_termination {
            return false;
        }
        let fitnesses: Vec<f64> = self.genomes.values().map(|g| g.fitness()).collect();
        self.population_config.fitness_criterion.apply(&fitnesses)
            >= self.population_config.fitness_threshold
    }

    /// Updates champions and species summaries after
    /// every genome received its fitness.
    fn finish_evaluation(&mut self) {
        let champion = self
            .genomes
            .values()
            .fold(None, |best: Option<&G>, g| match best {
                Some(b) if b.fitness() >= g.fitness() => Some(b),
                _ => Some(g),
            })
            .cloned();
        if let Some(champion) = &champion {
            if self
                .best_ever
                .as_ref()
                .map_or(true, |best| champion.fitness() > best.fitness())
            {
                self.best_ever = Some(champion.clone());
            }
        }
        self.best_this_generation = champion;
        self.species_set.refresh_fitness(&self.genomes);

        let total: f64 = self.genomes.values().map(|g| g.fitness()).sum();
        info!(
            generation = self.generation,
            species = self.species_set.len(),
            best = self.best_this_generation.as_ref().map_or(f64::NAN, |g| g.fitness()),
            mean = total / self.genomes.len() as f64,
            best_ever = self.best_ever.as_ref().map_or(f64::NAN, |g| g.fitness()),
            "evaluated generation"
        );
    }
}

impl<G> fmt::Debug for Population<G>
where
    G: Genome + fmt::Debug,
    G::Config: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Population")
            .field("generation", &self.generation)
            .field("state", &self.state)
            .field("genomes", &self.genomes.len())
            .field("species", &self.species_set.len())
            .field("population_config", &self.population_config)
            .field("genetic_config", &self.genetic_config)
            .finish()
    }
}

fn checked_fitness(genome: GenomeId, fitness: f64) -> Result<f64> {
    if fitness.is_finite() {
        Ok(fitness)
    } else {
        Err(NeatError::Evaluation {
            genome,
            reason: format!("non-finite fitness {}", fitness),
        })
    }
}
