use crate::genomics::{ActivationType, Gene, GeneticConfig};
use crate::GeneId;
use neatflow::{Aggregation, Context, NeatError, Result};

use serde::{Deserialize, Serialize};

use std::fmt;

/// A NodeKind indicates the function of
/// the node within its genome's layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Receives one external input value.
    Input,
    /// Receives the constant 1.0.
    Bias,
    Hidden,
    /// Produces one external output value.
    Output,
}

/// Nodes are the structural elements of genomes
/// between which connections are created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    id: GeneId,
    kind: NodeKind,
    bias: f64,
    activation: ActivationType,
    aggregation: Aggregation,
    #[serde(skip)]
    value: f64,
}

impl NodeGene {
    /// Generate a new node with the passed parameters.
    ///
    /// # Examples
    /// ```
    /// use neatflow::Aggregation;
    /// use neatflow_nn::genomics::{ActivationType, NodeGene, NodeKind};
    ///
    /// let node = NodeGene::new(5, NodeKind::Hidden, 0.5, ActivationType::Sigmoid, Aggregation::Sum);
    /// assert_eq!(node.value(), 0.0);
    /// ```
    pub fn new(
        id: GeneId,
        kind: NodeKind,
        bias: f64,
        activation: ActivationType,
        aggregation: Aggregation,
    ) -> NodeGene {
        NodeGene {
            id,
            kind,
            bias,
            activation,
            aggregation,
            value: 0.0,
        }
    }

    /// Returns a node of the given kind with a random
    /// initial bias and functions drawn from the
    /// configured options.
    pub(crate) fn random(
        id: GeneId,
        kind: NodeKind,
        config: &GeneticConfig,
        context: &mut Context,
    ) -> NodeGene {
        let bias = context.between(config.bias_init_min, config.bias_init_max);
        let (activation, aggregation) = match kind {
            NodeKind::Input | NodeKind::Bias => (ActivationType::Identity, Aggregation::Sum),
            NodeKind::Hidden | NodeKind::Output => (
                Self::pick_activation(kind, config, context).unwrap_or(ActivationType::Sigmoid),
                context
                    .choose(&config.aggregations)
                    .copied()
                    .unwrap_or(Aggregation::Sum),
            ),
        };
        NodeGene::new(id, kind, bias, activation, aggregation)
    }

    fn pick_activation(
        kind: NodeKind,
        config: &GeneticConfig,
        context: &mut Context,
    ) -> Option<ActivationType> {
        let options = match kind {
            NodeKind::Output => &config.output_activations,
            _ => &config.hidden_activations,
        };
        context.choose(options).copied()
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns the node's bias.
    ///
    /// # Examples
    /// ```
    /// use neatflow::Aggregation;
    /// use neatflow_nn::genomics::{ActivationType, NodeGene, NodeKind};
    ///
    /// let node = NodeGene::new(5, NodeKind::Output, -0.5, ActivationType::Identity, Aggregation::Sum);
    /// assert_eq!(node.bias(), -0.5);
    /// ```
    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn set_bias(&mut self, bias: f64) {
        self.bias = bias;
    }

    pub fn activation(&self) -> ActivationType {
        self.activation
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Returns the value computed for this node
    /// during the genome's last activation.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Computes the node's output from its inbound values:
    /// `activation(aggregation(inputs) + bias)`.
    ///
    /// # Examples
    /// ```
    /// use neatflow::Aggregation;
    /// use neatflow_nn::genomics::{ActivationType, NodeGene, NodeKind};
    ///
    /// let node = NodeGene::new(5, NodeKind::Hidden, 1.0, ActivationType::Identity, Aggregation::Max);
    /// assert_eq!(node.compute(&[0.5, 2.0]), 3.0);
    /// ```
    pub fn compute(&self, inputs: &[f64]) -> f64 {
        self.activation.apply(self.aggregation.apply(inputs) + self.bias)
    }

    /// Applies bias, activation and aggregation mutations.
    /// Input and bias nodes keep their functions.
    pub(super) fn mutate(&mut self, config: &GeneticConfig, context: &mut Context) {
        if context.chance(config.bias_mutate_rate) {
            self.bias = if context.chance(config.bias_replace_rate) {
                context.between(config.bias_min, config.bias_max)
            } else {
                let nudge = context.between(-config.bias_mutate_power, config.bias_mutate_power);
                (self.bias + nudge).clamp(config.bias_min, config.bias_max)
            };
        }
        if matches!(self.kind, NodeKind::Input | NodeKind::Bias) {
            return;
        }
        if context.chance(config.activation_mutate_rate) {
            if let Some(activation) = Self::pick_activation(self.kind, config, context) {
                self.activation = activation;
            }
        }
        if context.chance(config.aggregation_mutate_rate) {
            if let Some(aggregation) = context.choose(&config.aggregations) {
                self.aggregation = *aggregation;
            }
        }
    }
}

impl Gene for NodeGene {
    fn id(&self) -> GeneId {
        self.id
    }

    fn difference(&self, other: &Self) -> f64 {
        let mismatch = |same: bool| if same { 0.0 } else { 1.0 };
        (self.bias - other.bias).abs()
            + mismatch(self.activation == other.activation)
            + mismatch(self.aggregation == other.aggregation)
    }

    fn crossover(&self, other: &Self, context: &mut Context) -> Result<Self> {
        if self.id != other.id {
            return Err(NeatError::CrossoverMismatch {
                left: self.id,
                right: other.id,
            });
        }
        Ok(NodeGene {
            bias: if context.coin() { self.bias } else { other.bias },
            activation: if context.coin() { self.activation } else { other.activation },
            aggregation: if context.coin() { self.aggregation } else { other.aggregation },
            value: 0.0,
            ..self.clone()
        })
    }
}

impl fmt::Display for NodeGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node({}, {:?}, bias {:.3}, {}, {})",
            self.id, self.kind, self.bias, self.activation, self.aggregation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden(id: GeneId, bias: f64) -> NodeGene {
        NodeGene::new(id, NodeKind::Hidden, bias, ActivationType::Sigmoid, Aggregation::Sum)
    }

    #[test]
    fn difference_counts_function_mismatches() {
        let a = hidden(3, 0.5);
        let mut b = NodeGene::new(3, NodeKind::Hidden, 0.0, ActivationType::Tanh, Aggregation::Sum);
        assert_eq!(a.difference(&b), 1.5);
        b.aggregation = Aggregation::Product;
        assert_eq!(a.difference(&b), 2.5);
        assert_eq!(b.difference(&a), 2.5);
        assert_eq!(a.difference(&a), 0.0);
    }

    #[test]
    fn value_is_not_persisted() {
        let mut node = hidden(3, 0.5);
        node.set_value(0.9);
        let json = serde_json::to_string(&node).unwrap();
        assert!(!json.contains("value"));
        assert!(json.contains("\"kind\":\"hidden\""));
        let back: NodeGene = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value(), 0.0);
        assert_eq!(back.bias(), 0.5);
    }

    #[test]
    fn input_nodes_keep_their_functions() {
        let config = GeneticConfig {
            hidden_activations: vec![ActivationType::Relu],
            aggregations: vec![Aggregation::Max],
            activation_mutate_rate: 1.0,
            aggregation_mutate_rate: 1.0,
            ..GeneticConfig::zero()
        };
        let mut context = Context::seeded(0);
        let mut input = NodeGene::new(1, NodeKind::Input, 0.0, ActivationType::Identity, Aggregation::Sum);
        let mut node = hidden(2, 0.0);
        input.mutate(&config, &mut context);
        node.mutate(&config, &mut context);
        assert_eq!(input.activation(), ActivationType::Identity);
        assert_eq!(node.activation(), ActivationType::Relu);
        assert_eq!(node.aggregation(), Aggregation::Max);
    }

    #[test]
    fn replaced_bias_stays_in_range() {
        let config = GeneticConfig {
            bias_min: -0.5,
            bias_max: 0.5,
            bias_mutate_rate: 1.0,
            bias_replace_rate: 1.0,
            ..GeneticConfig::zero()
        };
        let mut context = Context::seeded(4);
        let mut node = hidden(2, 3.0);
        node.mutate(&config, &mut context);
        assert!((-0.5..=0.5).contains(&node.bias()));
    }
}
