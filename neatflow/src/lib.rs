//! An implementation of NeuroEvolution of Augmenting Topologies,
//! following the 2002 paper: <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! The crate holds the genome-agnostic evolutionary core: species
//! that persist across generations through a representative,
//! stagnation tracking, damped fitness-proportionate offspring
//! allocation and the generational run loop. Genomes plug in via
//! the [`Genome`] trait. A layered neural-network genome, together
//! with a concurrent dataflow network, is supplied by the
//! `neatflow-nn` crate.
//!
//! Every random draw and every identifier comes from an injected
//! [`Context`], so seeded runs are reproducible.
//!
//! # Example usage: Evolution of XOR function approximator, using `neatflow-nn`
//! ```
//! use neatflow::{Context, Population, PopulationConfig, Termination};
//! use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
//! use neatflow_nn::networks::FeedForwardNetwork;
//! use std::convert::Infallible;
//! use std::num::NonZeroUsize;
//!
//! fn evaluate_xor(genome: &NeuralGenome, _generation: usize) -> Result<f64, Infallible> {
//!     let network = FeedForwardNetwork::new(genome);
//!     let cases = [
//!         ([0.0, 0.0], 0.0),
//!         ([0.0, 1.0], 1.0),
//!         ([1.0, 0.0], 1.0),
//!         ([1.0, 1.0], 0.0),
//!     ];
//!     let mut fitness = 4.0;
//!     for (input, expected) in cases {
//!         let output = network.activate(&input).map_or(f64::MAX, |o| o[0]);
//!         fitness -= (output - expected).powi(2).min(1.0);
//!     }
//!     Ok(fitness)
//! }
//!
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(50).unwrap(),
//!     fitness_threshold: 3.9,
//!     ..PopulationConfig::default()
//! };
//! let genetic_config = GeneticConfig {
//!     layers: vec![2, 1],
//!     ..GeneticConfig::default()
//! };
//!
//! let mut population =
//!     Population::<NeuralGenome>::new(population_config, genetic_config, Context::seeded(7))
//!         .unwrap();
//! match population.run(evaluate_xor, Some(10)) {
//!     Ok(Termination::Solved) => println!("solved in generation {}", population.generation()),
//!     Ok(termination) => println!("stopped: {:?}", termination),
//!     Err(e) => eprintln!("{}", e),
//! }
//! assert!(population.best_ever().is_some());
//! ```

mod aggregation;
mod context;
mod errors;
mod genome;
mod ids;
mod populations;
mod rng;
#[cfg(test)]
mod testing;

/// Identifier of a genome, drawn from the run-wide ID sequence.
pub type GenomeId = u64;

pub use aggregation::Aggregation;
pub use context::Context;
pub use errors::{NeatError, Result};
pub use genome::Genome;
pub use ids::{IdProvider, SequentialIds};
pub use populations::*;
pub use rng::{RandomProvider, RngProvider};
