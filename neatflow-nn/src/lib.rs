//! # neatflow-nn
//! A layered neural-network implementation of the `neatflow` crate's `Genome` trait.
//!
//! Provides a [`NeuralGenome`] type usable in `neatflow` `Population`s, as well as two
//! network implementations which can be generated from a [`NeuralGenome`]:
//! - [`FeedForwardNetwork`]: evaluates layer by layer on the calling thread,
//!   best suited for synchronous fitness functions.
//! - [`DataflowNetwork`]: evaluates as a graph of tokio tasks linked by
//!   single-use channels, under a deadline.
//!
//! A [`Conversation`] wraps a [`DataflowNetwork`] in an actor task, for
//! fitness evaluations that exchange several input vectors with a network.
//!
//! [`NeuralGenome`]: crate::genomics::NeuralGenome
//! [`FeedForwardNetwork`]: crate::networks::FeedForwardNetwork
//! [`DataflowNetwork`]: crate::networks::DataflowNetwork
//! [`Conversation`]: crate::conversation::Conversation
//!
//! # Example usage: Evolution of XOR function approximator
//! ```
//! use neatflow::{Context, Population, PopulationConfig, Termination};
//! use neatflow_nn::{
//!     genomics::{ActivationType, GeneticConfig, NeuralGenome},
//!     networks::FeedForwardNetwork,
//! };
//! use std::convert::Infallible;
//! use std::num::NonZeroUsize;
//!
//! fn evaluate_xor(genome: &NeuralGenome, _generation: usize) -> Result<f64, Infallible> {
//!     let network = FeedForwardNetwork::new(genome);
//!     let values = [
//!         ([0.0, 0.0], 0.0),
//!         ([0.0, 1.0], 1.0),
//!         ([1.0, 0.0], 1.0),
//!         ([1.0, 1.0], 0.0),
//!     ];
//!     let mut fitness = 4.0;
//!     for (input, output) in values {
//!         match network.activate(&input) {
//!             Ok(answer) => fitness -= (answer[0] - output).powi(2),
//!             Err(_) => return Ok(0.0),
//!         }
//!     }
//!     Ok(fitness)
//! }
//!
//! let genetic_config = GeneticConfig {
//!     layers: vec![2, 1],
//!     hidden_activations: vec![ActivationType::Sigmoid],
//!     output_activations: vec![ActivationType::Sigmoid],
//!     ..GeneticConfig::default()
//! };
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(50).unwrap(),
//!     fitness_threshold: 3.9,
//!     ..PopulationConfig::default()
//! };
//!
//! let mut population =
//!     Population::new(population_config, genetic_config, Context::seeded(42)).unwrap();
//! match population.run(evaluate_xor, Some(10)) {
//!     Ok(Termination::Solved) => {
//!         let champion = population.best_ever().unwrap();
//!         println!("Solution found!: {}", serde_json::to_string(champion).unwrap());
//!     }
//!     Ok(other) => println!("Stopped: {:?}", other),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

pub mod conversation;
pub mod genomics;
pub mod networks;
#[cfg(test)]
mod testing;

/// Identifier of a node or connection gene,
/// drawn from the same run-wide sequence as genome IDs.
pub type GeneId = u64;

#[cfg(test)]
mod tests {
    use crate::conversation::Conversation;
    use crate::genomics::{GeneticConfig, NeuralGenome};
    use crate::networks::FeedForwardNetwork;
    use neatflow::{Context, Genome, NeatError, Population, PopulationConfig, Termination};

    use std::num::NonZeroUsize;
    use std::time::Duration;

    const XOR: [([f64; 2], f64); 4] = [
        ([0.0, 0.0], 0.0),
        ([0.0, 1.0], 1.0),
        ([1.0, 0.0], 1.0),
        ([1.0, 1.0], 0.0),
    ];

    fn xor_fitness(genome: &NeuralGenome, _: usize) -> Result<f64, NeatError> {
        let network = FeedForwardNetwork::new(genome);
        let mut fitness = 4.0;
        for (input, expected) in XOR {
            fitness -= (network.activate(&input)?[0] - expected).powi(2);
        }
        Ok(fitness)
    }

    fn population(seed: u64) -> Population<NeuralGenome> {
        Population::new(
            PopulationConfig {
                size: NonZeroUsize::new(50).unwrap(),
                fitness_threshold: 3.9,
                ..PopulationConfig::default()
            },
            GeneticConfig::default(),
            Context::seeded(seed),
        )
        .unwrap()
    }

    #[test]
    fn best_ever_is_non_decreasing_on_xor() {
        let mut population = population(17);
        let mut best = f64::MIN;
        for _ in 0..15 {
            population.evaluate_fitness(xor_fitness).unwrap();
            let best_ever = population.best_ever().unwrap().fitness();
            assert!(best_ever >= best);
            best = best_ever;
            if population.evolve().unwrap() != neatflow::RunState::Evaluating {
                break;
            }
        }
    }

    #[test]
    fn default_configs_share_species() {
        let population = Population::<NeuralGenome>::new(
            PopulationConfig::default(),
            GeneticConfig::default(),
            Context::seeded(2),
        )
        .unwrap();
        assert!(population.species().count() < population.genomes().count());
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let run = |seed| {
            let mut population = population(seed);
            population.run(xor_fitness, Some(5)).unwrap();
            serde_json::to_string(population.best_ever().unwrap()).unwrap()
        };
        assert_eq!(run(3), run(3));
    }

    #[test]
    fn population_genomes_stay_activatable() {
        let mut population = population(5);
        population
            .run(xor_fitness, Some(8))
            .unwrap();
        for genome in population.genomes() {
            assert_eq!(genome.input_count(), 2);
            assert_eq!(FeedForwardNetwork::new(genome).activate(&[0.0, 1.0]).map(|o| o.len()), Ok(1));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_run_with_conversations() {
        let config = GeneticConfig::default();
        let mut population = population(23);
        let termination = population
            .run_concurrent(
                |genome: NeuralGenome, _| {
                    let config = config.clone();
                    async move {
                        let conversation =
                            Conversation::start(&genome, &config, Duration::from_secs(1));
                        let mut fitness = 4.0;
                        for (input, expected) in XOR {
                            let output = conversation.ask(input.to_vec()).await?;
                            fitness -= (output[0] - expected).powi(2);
                        }
                        conversation.finish(fitness).await
                    }
                },
                Some(3),
            )
            .await
            .unwrap();
        assert!(matches!(
            termination,
            Termination::GenerationLimit | Termination::Solved
        ));

        let champion = population.best_ever().unwrap();
        let sequential = xor_fitness(champion, 0).unwrap();
        assert!((champion.fitness() - sequential).abs() < 1e-9);
    }
}
