use crate::{Aggregation, NeatError, Result};

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;
use std::time::Duration;

const ONE: NonZeroUsize = match NonZeroUsize::new(1) {
    Some(n) => n,
    None => unreachable!(),
};

/// Configuration data for population generation
/// and evolution.
///
/// # Note
/// All quantities expressing probabilities or fractions
/// should be in the range [0.0, 1.0]. [`validate`] rejects
/// values outside their meaningful ranges.
///
/// [`validate`]: PopulationConfig::validate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Size of the population.
    pub size: NonZeroUsize,
    /// Genetic distance below which a genome is
    /// compatible with a species representative.
    pub compatibility_threshold: f64,
    /// Number of generations without improvement after
    /// which a species is considered stagnant.
    pub max_stagnation: NonZeroUsize,
    /// Number of best-ranked species protected from
    /// stagnation removal.
    pub species_elitism: usize,
    /// How member fitnesses are summarized into a
    /// species fitness for stagnation tracking.
    pub species_fitness: Aggregation,
    /// Top n of each species copied unmutated into
    /// the next generation.
    pub elitism: usize,
    /// Top fraction of each species eligible for mating.
    pub survival_threshold: f64,
    /// Minimum offspring allotted to a surviving species.
    pub min_species_size: usize,
    /// Lower bound on the fitness range used to
    /// normalize species fitnesses.
    pub fitness_min_divisor: f64,
    /// How all fitnesses are summarized for the
    /// termination check.
    pub fitness_criterion: Aggregation,
    /// Evolution stops once the fitness criterion
    /// reaches this value.
    pub fitness_threshold: f64,
    /// Disables the fitness termination check.
    /// Runs then require a generation limit.
    pub no_fitness_termination: bool,
    /// Replace the population with a fresh random one
    /// instead of failing when every species goes extinct.
    pub reset_on_extinction: bool,
    /// Deadline for each genome's concurrent evaluation.
    pub evaluation_timeout: Duration,
}

impl PopulationConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, empty, false, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use neatflow::PopulationConfig;
    ///
    /// let cfg = PopulationConfig {
    ///     // Specify some values here...
    ///     compatibility_threshold: 3.0,
    ///     // Default the rest...
    ///     ..PopulationConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            size: ONE,
            compatibility_threshold: 0.0,
            max_stagnation: ONE,
            species_elitism: 0,
            species_fitness: Aggregation::Max,
            elitism: 0,
            survival_threshold: 0.0,
            min_species_size: 0,
            fitness_min_divisor: 0.0,
            fitness_criterion: Aggregation::Max,
            fitness_threshold: 0.0,
            no_fitness_termination: false,
            reset_on_extinction: false,
            evaluation_timeout: Duration::from_secs(0),
        }
    }

    /// Checks that every value lies in its meaningful range.
    ///
    /// # Examples
    /// ```
    /// use neatflow::PopulationConfig;
    ///
    /// assert!(PopulationConfig::default().validate().is_ok());
    /// assert!(PopulationConfig::zero().validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if !(self.compatibility_threshold > 0.0) {
            return Err(NeatError::configuration(
                "compatibility_threshold must be positive",
            ));
        }
        if !(self.survival_threshold > 0.0 && self.survival_threshold <= 1.0) {
            return Err(NeatError::configuration(
                "survival_threshold must lie in (0, 1]",
            ));
        }
        if !(self.fitness_min_divisor > 0.0) {
            return Err(NeatError::configuration(
                "fitness_min_divisor must be positive",
            ));
        }
        if self.evaluation_timeout.is_zero() {
            return Err(NeatError::configuration(
                "evaluation_timeout must be non-zero",
            ));
        }
        Ok(())
    }
}

impl Default for PopulationConfig {
    fn default() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(150).unwrap_or(ONE),
            compatibility_threshold: 3.0,
            max_stagnation: NonZeroUsize::new(20).unwrap_or(ONE),
            species_elitism: 2,
            species_fitness: Aggregation::Max,
            elitism: 2,
            survival_threshold: 0.2,
            min_species_size: 2,
            fitness_min_divisor: 1.0,
            fitness_criterion: Aggregation::Max,
            fitness_threshold: 1.0,
            no_fitness_termination: false,
            reset_on_extinction: false,
            evaluation_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_survivor_pool() {
        let config = PopulationConfig {
            survival_threshold: 0.0,
            ..PopulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(NeatError::Configuration(_))
        ));
    }

    #[test]
    fn serde_round_trip() {
        let config = PopulationConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PopulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
