//! Layered neural-network genomes and their genes.
mod activations;
mod config;
mod crossover;
mod genes;
mod mutation;
mod nodes;

pub use activations::ActivationType;
pub use config::GeneticConfig;
pub use genes::{ConnectionGene, Gene};
pub use nodes::{NodeGene, NodeKind};

use crate::networks::FeedForwardNetwork;
use crate::GeneId;
use neatflow::{Context, Genome, GenomeId, NeatError, Result};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// A genome is the encoding of a layered,
/// feed-forward neural network.
///
/// Nodes are grouped into layers ordered from inputs to
/// outputs: the first layer holds the input and bias nodes,
/// the last the output nodes, and every layer in between
/// hidden nodes only. Connections always lead from a lower
/// layer to a higher one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuralGenome {
    id: GenomeId,
    layers: Vec<Vec<NodeGene>>,
    connections: Vec<ConnectionGene>,
    fitness: f64,
}

impl NeuralGenome {
    /// Assembles a genome from explicit layers and connections.
    ///
    /// # Errors
    /// Returns [`NeatError::Configuration`] if the layers or
    /// connections break the genome's structural rules:
    /// misplaced node kinds, duplicate IDs, dangling connection
    /// endpoints or connections that do not lead to a higher layer.
    ///
    /// # Examples
    /// ```
    /// use neatflow::Aggregation;
    /// use neatflow_nn::genomics::{ActivationType, ConnectionGene, NeuralGenome, NodeGene, NodeKind};
    ///
    /// let node = |id, kind| NodeGene::new(id, kind, 0.0, ActivationType::Identity, Aggregation::Sum);
    /// let genome = NeuralGenome::from_layers(
    ///     1,
    ///     vec![vec![node(1, NodeKind::Input)], vec![node(2, NodeKind::Output)]],
    ///     vec![ConnectionGene::new(3, 1, 2, 0.5)],
    /// )
    /// .unwrap();
    /// assert_eq!(genome.layer_of(2), Some(1));
    ///
    /// let backwards = NeuralGenome::from_layers(
    ///     1,
    ///     vec![vec![node(1, NodeKind::Input)], vec![node(2, NodeKind::Output)]],
    ///     vec![ConnectionGene::new(3, 2, 1, 0.5)],
    /// );
    /// assert!(backwards.is_err());
    /// ```
    pub fn from_layers(
        id: GenomeId,
        layers: Vec<Vec<NodeGene>>,
        connections: Vec<ConnectionGene>,
    ) -> Result<NeuralGenome> {
        let genome = NeuralGenome {
            id,
            layers,
            connections,
            fitness: 0.0,
        };
        genome.check_structure()?;
        Ok(genome)
    }

    /// Returns a copy of the genome under a new ID,
    /// with its fitness reset.
    pub fn with_id(&self, id: GenomeId) -> NeuralGenome {
        NeuralGenome {
            id,
            fitness: 0.0,
            ..self.clone()
        }
    }

    /// Returns the genome's layers, from inputs to outputs.
    pub fn layers(&self) -> &[Vec<NodeGene>] {
        &self.layers
    }

    /// Iterate over all nodes, in layer order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeGene> {
        self.layers.iter().flatten()
    }

    pub fn connections(&self) -> &[ConnectionGene] {
        &self.connections
    }

    /// Returns the node with the specified ID, if any.
    pub fn node(&self, id: GeneId) -> Option<&NodeGene> {
        self.nodes().find(|n| n.id() == id)
    }

    /// Returns the index of the layer holding the
    /// specified node, if it exists.
    pub fn layer_of(&self, id: GeneId) -> Option<usize> {
        self.layers
            .iter()
            .position(|layer| layer.iter().any(|n| n.id() == id))
    }

    /// Number of input nodes, i.e. the expected
    /// length of an activation's input vector.
    pub fn input_count(&self) -> usize {
        self.nodes().filter(|n| n.kind() == NodeKind::Input).count()
    }

    pub fn output_count(&self) -> usize {
        self.layers.last().map_or(0, Vec::len)
    }

    /// Activates the network encoded by the genome, storing
    /// every node's computed value, and returns the outputs.
    ///
    /// # Errors
    /// Returns [`NeatError::ActivationInputMismatch`] if the number
    /// of inputs differs from [`input_count`].
    ///
    /// [`input_count`]: NeuralGenome::input_count
    ///
    /// # Examples
    /// ```
    /// use neatflow::{Context, Genome};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    ///
    /// let config = GeneticConfig { layers: vec![2, 3, 1], ..GeneticConfig::default() };
    /// let mut genome = NeuralGenome::new(1, &config, &mut Context::seeded(0)).unwrap();
    ///
    /// let outputs = genome.activate(&[0.5, -0.5]).unwrap();
    /// assert_eq!(outputs.len(), 1);
    /// assert_eq!(genome.layers()[2][0].value(), outputs[0]);
    /// assert!(genome.activate(&[0.5]).is_err());
    /// ```
    pub fn activate(&mut self, inputs: &[f64]) -> Result<Vec<f64>> {
        let values = FeedForwardNetwork::new(self).activate_all(inputs)?;
        for (node, value) in self.layers.iter_mut().flatten().zip(values) {
            node.set_value(value);
        }
        Ok(self
            .layers
            .last()
            .map(|layer| layer.iter().map(NodeGene::value).collect())
            .unwrap_or_default())
    }

    /// Maps every node ID to the index of its layer.
    fn layer_index(&self) -> HashMap<GeneId, usize, RandomState> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| layer.iter().map(move |n| (n.id(), i)))
            .collect()
    }

    fn check_structure(&self) -> Result<()> {
        let last = match self.layers.len() {
            0 | 1 => {
                return Err(NeatError::configuration(
                    "a genome needs an input and an output layer",
                ))
            }
            n => n - 1,
        };
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.is_empty() {
                return Err(NeatError::configuration(format!("layer {} is empty", index)));
            }
            let allowed = |kind: NodeKind| match index {
                0 => matches!(kind, NodeKind::Input | NodeKind::Bias),
                i if i == last => kind == NodeKind::Output,
                _ => kind == NodeKind::Hidden,
            };
            if let Some(node) = layer.iter().find(|n| !allowed(n.kind())) {
                return Err(NeatError::configuration(format!(
                    "{:?} node {} cannot be placed in layer {}",
                    node.kind(),
                    node.id(),
                    index
                )));
            }
        }
        if self.input_count() == 0 {
            return Err(NeatError::configuration("a genome needs at least one input"));
        }

        let layer_of = self.layer_index();
        if layer_of.len() != self.nodes().count() {
            return Err(NeatError::configuration("duplicate node IDs"));
        }
        let mut connection_ids = HashSet::with_capacity_and_hasher(
            self.connections.len(),
            RandomState::new(),
        );
        for connection in &self.connections {
            if !connection_ids.insert(connection.id()) {
                return Err(NeatError::configuration(format!(
                    "duplicate connection ID {}",
                    connection.id()
                )));
            }
            match (layer_of.get(&connection.from()), layer_of.get(&connection.to())) {
                (Some(from), Some(to)) if from < to => {}
                (Some(_), Some(_)) => {
                    return Err(NeatError::configuration(format!(
                        "connection {} does not lead to a higher layer",
                        connection.id()
                    )))
                }
                _ => {
                    return Err(NeatError::configuration(format!(
                        "connection {} references a missing node",
                        connection.id()
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Distance between two sets of genes: the weighted share of
/// disjoint genes plus the weighted sum of homologous differences.
fn gene_distance<'a, T: Gene + 'a>(
    own: impl Iterator<Item = &'a T>,
    other: impl Iterator<Item = &'a T>,
    disjoint_coefficient: f64,
    homologous_coefficient: f64,
) -> f64 {
    let own: BTreeMap<GeneId, &T> = own.map(|g| (g.id(), g)).collect();
    let other: BTreeMap<GeneId, &T> = other.map(|g| (g.id(), g)).collect();

    let mut disjoint = other.keys().filter(|id| !own.contains_key(id)).count();
    let mut homologous = 0.0;
    for (id, gene) in &own {
        match other.get(id) {
            Some(counterpart) => homologous += gene.difference(counterpart),
            None => disjoint += 1,
        }
    }

    let larger = own.len().max(other.len());
    let disjoint_term = if larger == 0 {
        0.0
    } else {
        disjoint as f64 / larger as f64 * disjoint_coefficient
    };
    disjoint_term + homologous * homologous_coefficient
}

impl Genome for NeuralGenome {
    type Config = GeneticConfig;

    /// Builds fully connected layers sized by `config.layers`,
    /// with bias nodes appended to the input layer.
    fn new(id: GenomeId, config: &GeneticConfig, context: &mut Context) -> Result<Self> {
        config.validate()?;
        let last = config.layers.len() - 1;
        let mut layers = Vec::with_capacity(config.layers.len());
        for (index, &size) in config.layers.iter().enumerate() {
            let kind = match index {
                0 => NodeKind::Input,
                i if i == last => NodeKind::Output,
                _ => NodeKind::Hidden,
            };
            let mut layer: Vec<NodeGene> = (0..size)
                .map(|_| NodeGene::random(context.next_id(), kind, config, context))
                .collect();
            if index == 0 {
                for _ in 0..config.bias_nodes {
                    layer.push(NodeGene::random(context.next_id(), NodeKind::Bias, config, context));
                }
            }
            layers.push(layer);
        }

        let mut connections = vec![];
        for pair in layers.windows(2) {
            for from in &pair[0] {
                for to in &pair[1] {
                    let weight = context.between(config.weight_init_min, config.weight_init_max);
                    connections.push(ConnectionGene::new(context.next_id(), from.id(), to.id(), weight));
                }
            }
        }

        Ok(NeuralGenome {
            id,
            layers,
            connections,
            fitness: 0.0,
        })
    }

    fn id(&self) -> GenomeId {
        self.id
    }

    fn genetic_distance(first: &Self, second: &Self, config: &GeneticConfig) -> f64 {
        gene_distance(
            first.nodes(),
            second.nodes(),
            config.compatibility_disjoint_coefficient,
            config.compatibility_bias_coefficient,
        ) + gene_distance(
            first.connections.iter(),
            second.connections.iter(),
            config.compatibility_disjoint_coefficient,
            config.compatibility_weight_coefficient,
        )
    }

    fn mate(
        id: GenomeId,
        parent1: &Self,
        parent2: &Self,
        _config: &GeneticConfig,
        context: &mut Context,
    ) -> Result<Self> {
        crossover::crossover(id, parent1, parent2, context)
    }

    /// Applies each structural mutation with its configured
    /// rate, then mutates every node and connection.
    fn mutate(&mut self, config: &GeneticConfig, context: &mut Context) {
        if context.chance(config.add_node_rate) {
            self.mutate_add_node(config, context);
        }
        if context.chance(config.add_connection_rate) {
            self.mutate_add_connection(config, context);
        }
        if context.chance(config.delete_node_rate) {
            self.mutate_delete_node(context);
        }
        if context.chance(config.delete_connection_rate) {
            self.mutate_delete_connection(context);
        }
        self.mutate_genes(config, context);
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    fn fitness(&self) -> f64 {
        self.fitness
    }
}

impl fmt::Display for NeuralGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Genome {} (fitness {}) {{", self.id, self.fitness)?;
        for (index, layer) in self.layers.iter().enumerate() {
            writeln!(f, "\tlayer {}:", index)?;
            for node in layer {
                writeln!(f, "\t\t{}", node)?;
            }
        }
        for connection in &self.connections {
            writeln!(f, "\t{}", connection)?;
        }
        write!(f, "}}")
    }
}
