use crate::genomics::ActivationType;
use neatflow::{Aggregation, NeatError, Result};

use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Configuration data for genome generation
/// and inter-genome operations.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. [`validate`]
/// rejects values outside their meaningful ranges;
/// genomes built from an unvalidated configuration
/// may panic during mutation.
///
/// [`validate`]: GeneticConfig::validate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Sizes of the initial layers. The first entry is
    /// the number of inputs, the last the number of outputs,
    /// and any entries in between are hidden layers.
    pub layers: Vec<usize>,
    /// Number of bias nodes appended to the input layer.
    pub bias_nodes: usize,

    /// Range of initial node biases.
    pub bias_init_min: f64,
    pub bias_init_max: f64,
    /// Range node biases are clamped to.
    pub bias_min: f64,
    pub bias_max: f64,
    /// Chance of a node's bias being mutated.
    pub bias_mutate_rate: f64,
    /// Chance of a mutated bias being replaced outright
    /// instead of perturbed.
    pub bias_replace_rate: f64,
    /// Magnitude of bound on bias perturbations.
    pub bias_mutate_power: f64,

    /// Range of initial connection weights.
    pub weight_init_min: f64,
    pub weight_init_max: f64,
    /// Range connection weights are clamped to.
    pub weight_min: f64,
    pub weight_max: f64,
    /// Chance of a connection's weight being mutated.
    pub weight_mutate_rate: f64,
    /// Chance of a mutated weight being replaced outright
    /// instead of perturbed.
    pub weight_replace_rate: f64,
    /// Magnitude of bound on weight perturbations.
    pub weight_mutate_power: f64,
    /// Chance of a connection's enabled flag being toggled.
    pub enabled_mutate_rate: f64,

    /// Possible activation types for hidden nodes.
    /// If an empty vector is given, hidden nodes will
    /// default to [`Sigmoid`].
    ///
    /// [`Sigmoid`]: crate::genomics::ActivationType
    pub hidden_activations: Vec<ActivationType>,
    /// Possible activation types for output nodes.
    /// If an empty vector is given, output nodes will
    /// default to [`Sigmoid`].
    ///
    /// [`Sigmoid`]: crate::genomics::ActivationType
    pub output_activations: Vec<ActivationType>,
    /// Chance of a node's activation type being replaced.
    pub activation_mutate_rate: f64,
    /// Possible aggregations for hidden and output nodes.
    /// Defaults to [`Sum`] if empty.
    ///
    /// [`Sum`]: neatflow::Aggregation
    pub aggregations: Vec<Aggregation>,
    /// Chance of a node's aggregation being replaced.
    pub aggregation_mutate_rate: f64,

    /// Chance of a node addition mutation.
    pub add_node_rate: f64,
    /// Chance of a connection addition mutation.
    pub add_connection_rate: f64,
    /// Chance of a node deletion mutation.
    pub delete_node_rate: f64,
    /// Chance of a connection deletion mutation.
    pub delete_connection_rate: f64,

    /// Weight of disjoint genes in genetic distance. Genomes that
    /// share no genes are at most four times this far apart.
    pub compatibility_disjoint_coefficient: f64,
    /// Weight of homologous connection differences in genetic distance.
    pub compatibility_weight_coefficient: f64,
    /// Weight of homologous node differences in genetic distance.
    pub compatibility_bias_coefficient: f64,

    /// Deadline for a single concurrent network activation.
    pub activation_timeout: Duration,
}

impl GeneticConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0 or empty.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments,
    /// and does not pass validation on its own.
    /// It is meant as a way to fill in unused values during
    /// configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use neatflow_nn::genomics::GeneticConfig;
    ///
    /// let cfg = GeneticConfig {
    ///     // Specify some values here...
    ///     layers: vec![3, 2],
    ///     activation_timeout: std::time::Duration::from_secs(1),
    ///     // Default the rest...
    ///     ..GeneticConfig::zero()
    /// };
    /// assert!(cfg.validate().is_ok());
    /// ```
    pub const fn zero() -> GeneticConfig {
        GeneticConfig {
            layers: vec![],
            bias_nodes: 0,
            bias_init_min: 0.0,
            bias_init_max: 0.0,
            bias_min: 0.0,
            bias_max: 0.0,
            bias_mutate_rate: 0.0,
            bias_replace_rate: 0.0,
            bias_mutate_power: 0.0,
            weight_init_min: 0.0,
            weight_init_max: 0.0,
            weight_min: 0.0,
            weight_max: 0.0,
            weight_mutate_rate: 0.0,
            weight_replace_rate: 0.0,
            weight_mutate_power: 0.0,
            enabled_mutate_rate: 0.0,
            hidden_activations: vec![],
            output_activations: vec![],
            activation_mutate_rate: 0.0,
            aggregations: vec![],
            aggregation_mutate_rate: 0.0,
            add_node_rate: 0.0,
            add_connection_rate: 0.0,
            delete_node_rate: 0.0,
            delete_connection_rate: 0.0,
            compatibility_disjoint_coefficient: 0.0,
            compatibility_weight_coefficient: 0.0,
            compatibility_bias_coefficient: 0.0,
            activation_timeout: Duration::from_secs(0),
        }
    }

    /// Checks that the configuration describes valid genomes.
    ///
    /// # Examples
    /// ```
    /// use neatflow_nn::genomics::GeneticConfig;
    ///
    /// assert!(GeneticConfig::default().validate().is_ok());
    /// assert!(GeneticConfig { layers: vec![4], ..GeneticConfig::default() }
    ///     .validate()
    ///     .is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.layers.len() < 2 {
            return Err(NeatError::configuration(
                "layers must list at least an input and an output layer",
            ));
        }
        if self.layers.contains(&0) {
            return Err(NeatError::configuration("layers must not be empty"));
        }
        let ranges = [
            ("bias_init", self.bias_init_min, self.bias_init_max),
            ("bias", self.bias_min, self.bias_max),
            ("weight_init", self.weight_init_min, self.weight_init_max),
            ("weight", self.weight_min, self.weight_max),
        ];
        for (name, min, max) in ranges {
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(NeatError::configuration(format!(
                    "{}_min must not exceed {}_max",
                    name, name
                )));
            }
        }
        let rates = [
            ("bias_mutate_rate", self.bias_mutate_rate),
            ("bias_replace_rate", self.bias_replace_rate),
            ("weight_mutate_rate", self.weight_mutate_rate),
            ("weight_replace_rate", self.weight_replace_rate),
            ("enabled_mutate_rate", self.enabled_mutate_rate),
            ("activation_mutate_rate", self.activation_mutate_rate),
            ("aggregation_mutate_rate", self.aggregation_mutate_rate),
            ("add_node_rate", self.add_node_rate),
            ("add_connection_rate", self.add_connection_rate),
            ("delete_node_rate", self.delete_node_rate),
            ("delete_connection_rate", self.delete_connection_rate),
        ];
        for (name, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(NeatError::configuration(format!(
                    "{} must lie in [0, 1]",
                    name
                )));
            }
        }
        if !(self.bias_mutate_power >= 0.0 && self.weight_mutate_power >= 0.0) {
            return Err(NeatError::configuration(
                "mutation powers must not be negative",
            ));
        }
        if self.activation_timeout.is_zero() {
            return Err(NeatError::configuration(
                "activation_timeout must be non-zero",
            ));
        }
        Ok(())
    }
}

impl Default for GeneticConfig {
    fn default() -> GeneticConfig {
        GeneticConfig {
            layers: vec![2, 1],
            bias_nodes: 1,
            bias_init_min: -1.0,
            bias_init_max: 1.0,
            bias_min: -5.0,
            bias_max: 5.0,
            bias_mutate_rate: 0.7,
            bias_replace_rate: 0.1,
            bias_mutate_power: 0.5,
            weight_init_min: -5.0,
            weight_init_max: 5.0,
            weight_min: -5.0,
            weight_max: 5.0,
            weight_mutate_rate: 0.8,
            weight_replace_rate: 0.1,
            weight_mutate_power: 0.5,
            enabled_mutate_rate: 0.01,
            hidden_activations: vec![ActivationType::Sigmoid],
            output_activations: vec![ActivationType::Sigmoid],
            activation_mutate_rate: 0.0,
            aggregations: vec![Aggregation::Sum],
            aggregation_mutate_rate: 0.0,
            add_node_rate: 0.2,
            add_connection_rate: 0.5,
            delete_node_rate: 0.05,
            delete_connection_rate: 0.1,
            compatibility_disjoint_coefficient: 0.5,
            compatibility_weight_coefficient: 1.0,
            compatibility_bias_coefficient: 1.0,
            activation_timeout: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_ranges() {
        let config = GeneticConfig {
            weight_min: 1.0,
            weight_max: -1.0,
            ..GeneticConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(NeatError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_rates() {
        let config = GeneticConfig {
            add_node_rate: 1.5,
            ..GeneticConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn functions_persist_by_name() {
        let config = GeneticConfig {
            hidden_activations: vec![ActivationType::Relu, ActivationType::Gauss],
            aggregations: vec![Aggregation::MaxAbs],
            ..GeneticConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("[\"relu\",\"gauss\"]"));
        assert!(json.contains("[\"maxabs\"]"));
        let back: GeneticConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
