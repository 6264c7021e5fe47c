use super::{ConnectionGene, Gene, GeneticConfig, NeuralGenome, NodeGene, NodeKind};
use crate::GeneId;
use neatflow::Context;

use ahash::RandomState;
use tracing::trace;

use std::collections::HashSet;

impl NeuralGenome {
    /// Mutates the bias and functions of every node
    /// and the weight and enabled flag of every connection.
    pub fn mutate_genes(&mut self, config: &GeneticConfig, context: &mut Context) {
        for node in self.layers.iter_mut().flatten() {
            node.mutate(config, context);
        }
        for connection in &mut self.connections {
            connection.mutate(config, context);
        }
    }

    /// Splits a random enabled connection with a new hidden node.
    ///
    /// The split connection is disabled and replaced by a connection
    /// into the new node with weight 1 and one out of it carrying the
    /// old weight. The node is placed in the layer after the split
    /// connection's input node; a new layer is inserted there first if
    /// the connection spanned adjacent layers. A node landing in the
    /// first hidden layer is also connected to every bias node.
    ///
    /// Connections leaving bias nodes are never split. If no connection
    /// can be split, a connection addition is attempted instead.
    ///
    /// Returns whether the genome changed.
    ///
    /// # Examples
    /// ```
    /// use neatflow::{Context, Genome};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    ///
    /// let config = GeneticConfig::default();
    /// let mut context = Context::seeded(1);
    /// let mut genome = NeuralGenome::new(1, &config, &mut context).unwrap();
    /// assert_eq!(genome.layers().len(), 2);
    ///
    /// assert!(genome.mutate_add_node(&config, &mut context));
    /// assert_eq!(genome.layers().len(), 3);
    /// assert_eq!(genome.connections().iter().filter(|c| !c.enabled()).count(), 1);
    /// ```
    pub fn mutate_add_node(&mut self, config: &GeneticConfig, context: &mut Context) -> bool {
        let bias_nodes = self.bias_node_ids();
        let candidates: Vec<usize> = self
            .connections
            .iter()
            .enumerate()
            .filter(|(_, c)| c.enabled() && !bias_nodes.contains(&c.from()))
            .map(|(i, _)| i)
            .collect();
        let split = match context.choose(&candidates) {
            Some(&index) => index,
            None => return self.mutate_add_connection(config, context),
        };

        let (from, to, weight) = {
            let connection = &self.connections[split];
            (connection.from(), connection.to(), connection.weight())
        };
        let (from_layer, to_layer) = match (self.layer_of(from), self.layer_of(to)) {
            (Some(f), Some(t)) => (f, t),
            _ => return false,
        };
        self.connections[split].set_enabled(false);

        let target = from_layer + 1;
        if to_layer - from_layer < 2 {
            self.layers.insert(target, vec![]);
        }
        let node = NodeGene::random(context.next_id(), NodeKind::Hidden, config, context);
        let node_id = node.id();
        self.layers[target].push(node);

        let entry_weight = 1.0_f64.clamp(config.weight_min, config.weight_max);
        self.connections
            .push(ConnectionGene::new(context.next_id(), from, node_id, entry_weight));
        self.connections
            .push(ConnectionGene::new(context.next_id(), node_id, to, weight));
        if target == 1 {
            for &bias in &bias_nodes {
                let weight = context.between(config.weight_init_min, config.weight_init_max);
                self.connections
                    .push(ConnectionGene::new(context.next_id(), bias, node_id, weight));
            }
        }
        trace!(genome = self.id, node = node_id, from, to, "split connection");
        true
    }

    /// Connects a random pair of nodes in distinct layers that are
    /// not yet connected, leading from the lower layer to the higher.
    /// Bias nodes never receive connections.
    ///
    /// Returns `false` if every such pair is already connected.
    ///
    /// # Examples
    /// ```
    /// use neatflow::{Context, Genome};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    ///
    /// let config = GeneticConfig::default();
    /// let mut context = Context::seeded(1);
    /// let mut genome = NeuralGenome::new(1, &config, &mut context).unwrap();
    ///
    /// // Freshly built layers are fully connected.
    /// assert!(!genome.mutate_add_connection(&config, &mut context));
    /// ```
    pub fn mutate_add_connection(&mut self, config: &GeneticConfig, context: &mut Context) -> bool {
        let existing: HashSet<(GeneId, GeneId), RandomState> = self
            .connections
            .iter()
            .map(|c| (c.from(), c.to()))
            .collect();
        let mut candidates = vec![];
        for (index, lower) in self.layers.iter().enumerate() {
            for upper in &self.layers[index + 1..] {
                for a in lower {
                    for b in upper.iter().filter(|b| b.kind() != NodeKind::Bias) {
                        if !existing.contains(&(a.id(), b.id())) {
                            candidates.push((a.id(), b.id()));
                        }
                    }
                }
            }
        }

        match context.choose(&candidates) {
            Some(&(from, to)) => {
                let weight = context.between(config.weight_init_min, config.weight_init_max);
                self.connections
                    .push(ConnectionGene::new(context.next_id(), from, to, weight));
                trace!(genome = self.id, from, to, "added connection");
                true
            }
            None => false,
        }
    }

    /// Removes a random hidden node together with its
    /// connections, and the node's layer if it is left empty.
    pub fn mutate_delete_node(&mut self, context: &mut Context) -> Option<NodeGene> {
        let hidden: Vec<GeneId> = self
            .nodes()
            .filter(|n| n.kind() == NodeKind::Hidden)
            .map(|n| n.id())
            .collect();
        let id = *context.choose(&hidden)?;

        let mut removed = None;
        for layer in &mut self.layers {
            if let Some(position) = layer.iter().position(|n| n.id() == id) {
                removed = Some(layer.remove(position));
            }
        }
        self.layers.retain(|layer| !layer.is_empty());
        self.connections.retain(|c| c.from() != id && c.to() != id);
        trace!(genome = self.id, node = id, "deleted node");
        removed
    }

    /// Removes a random connection.
    pub fn mutate_delete_connection(&mut self, context: &mut Context) -> Option<ConnectionGene> {
        if self.connections.is_empty() {
            return None;
        }
        let index = context.index(self.connections.len());
        let removed = self.connections.remove(index);
        trace!(genome = self.id, connection = removed.id(), "deleted connection");
        Some(removed)
    }

    fn bias_node_ids(&self) -> Vec<GeneId> {
        self.layers
            .first()
            .into_iter()
            .flatten()
            .filter(|n| n.kind() == NodeKind::Bias)
            .map(|n| n.id())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{activation_example, assert_valid, context_after};
    use neatflow::Genome;

    fn genome(layers: Vec<usize>, context: &mut Context) -> (NeuralGenome, GeneticConfig) {
        let config = GeneticConfig {
            layers,
            ..GeneticConfig::default()
        };
        (NeuralGenome::new(1, &config, context).unwrap(), config)
    }

    #[test]
    fn split_across_adjacent_layers_inserts_layer() {
        let mut context = Context::seeded(4);
        let (mut genome, config) = genome(vec![2, 1], &mut context);
        let before = genome.connections().len();
        assert!(genome.mutate_add_node(&config, &mut context));

        assert_eq!(genome.layers().len(), 3);
        let hidden = &genome.layers()[1][0];
        assert_eq!(hidden.kind(), NodeKind::Hidden);
        // Two replacing connections plus one from the bias node.
        assert_eq!(genome.connections().len(), before + 3);
        let into: Vec<&ConnectionGene> = genome
            .connections()
            .iter()
            .filter(|c| c.to() == hidden.id())
            .collect();
        assert_eq!(into.len(), 2);
        assert!(into.iter().any(|c| c.weight() == 1.0));
        assert_valid(&genome);
    }

    #[test]
    fn split_keeps_old_weight_downstream() {
        let mut context = context_after(100, 4);
        let mut genome = activation_example(0.0);
        let config = GeneticConfig::default();
        let weights: Vec<(GeneId, GeneId, f64)> = genome
            .connections()
            .iter()
            .map(|c| (c.from(), c.to(), c.weight()))
            .collect();
        assert!(genome.mutate_add_node(&config, &mut context));

        let disabled = genome.connections().iter().find(|c| !c.enabled()).unwrap();
        let (from, to, weight) = weights
            .iter()
            .copied()
            .find(|&(f, t, _)| f == disabled.from() && t == disabled.to())
            .unwrap();
        let node = genome.connections().last().unwrap().from();
        assert!(genome
            .connections()
            .iter()
            .any(|c| c.from() == from && c.to() == node && c.weight() == 1.0));
        assert!(genome
            .connections()
            .iter()
            .any(|c| c.from() == node && c.to() == to && c.weight() == weight));
        assert_valid(&genome);
    }

    #[test]
    fn split_within_spanning_connection_reuses_layer() {
        let mut context = Context::seeded(6);
        let (mut genome, config) = genome(vec![1, 1, 1], &mut context);
        let input = genome.layers()[0][0].id();
        let output = genome.layers()[2][0].id();
        genome.connections.clear();
        genome
            .connections
            .push(ConnectionGene::new(context.next_id(), input, output, 0.5));

        assert!(genome.mutate_add_node(&config, &mut context));
        assert_eq!(genome.layers().len(), 3);
        assert_eq!(genome.layers()[1].len(), 2);
        assert_valid(&genome);
    }

    #[test]
    fn split_without_connections_adds_one() {
        let mut context = Context::seeded(6);
        let (mut genome, config) = genome(vec![2, 2], &mut context);
        genome.connections.clear();
        assert!(genome.mutate_add_node(&config, &mut context));
        assert_eq!(genome.connections().len(), 1);
        assert_eq!(genome.layers().len(), 2);
    }

    #[test]
    fn added_connections_skip_existing_pairs() {
        let mut context = Context::seeded(7);
        let (mut genome, config) = genome(vec![2, 2, 1], &mut context);
        // Input layer (2 inputs and a bias) to the output layer.
        for _ in 0..3 {
            assert!(genome.mutate_add_connection(&config, &mut context));
        }
        assert!(!genome.mutate_add_connection(&config, &mut context));
        assert_valid(&genome);
    }

    #[test]
    fn deleting_last_hidden_node_removes_layer() {
        let mut context = Context::seeded(8);
        let (mut genome, _) = genome(vec![2, 1, 1], &mut context);
        let removed = genome.mutate_delete_node(&mut context).unwrap();
        assert_eq!(removed.kind(), NodeKind::Hidden);
        assert_eq!(genome.layers().len(), 2);
        assert!(genome
            .connections()
            .iter()
            .all(|c| c.from() != removed.id() && c.to() != removed.id()));
        assert!(genome.mutate_delete_node(&mut context).is_none());
        assert_valid(&genome);
    }

    #[test]
    fn deleting_connections_until_empty() {
        let mut context = Context::seeded(8);
        let (mut genome, _) = genome(vec![2, 1], &mut context);
        for _ in 0..3 {
            assert!(genome.mutate_delete_connection(&mut context).is_some());
        }
        assert!(genome.mutate_delete_connection(&mut context).is_none());
    }

    #[test]
    fn structural_mutations_keep_genome_valid() {
        let mut context = Context::seeded(11);
        let config = GeneticConfig {
            layers: vec![3, 2],
            add_node_rate: 0.5,
            add_connection_rate: 0.5,
            delete_node_rate: 0.2,
            delete_connection_rate: 0.2,
            enabled_mutate_rate: 0.1,
            ..GeneticConfig::default()
        };
        let mut genome = NeuralGenome::new(1, &config, &mut context).unwrap();
        for _ in 0..200 {
            genome.mutate(&config, &mut context);
            assert_valid(&genome);
            assert!(genome.activate(&[0.1, 0.2, 0.3]).is_ok());
        }
    }
}
