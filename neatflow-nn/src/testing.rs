//! Fixtures shared by the crate's unit tests.
use crate::genomics::{ActivationType, ConnectionGene, GeneticConfig, NeuralGenome, NodeGene, NodeKind};
use neatflow::{Aggregation, Context, Genome, RngProvider, SequentialIds};

use rand::rngs::StdRng;
use rand::SeedableRng;

use std::sync::Arc;

fn identity(id: u64, kind: NodeKind, bias: f64) -> NodeGene {
    NodeGene::new(id, kind, bias, ActivationType::Identity, Aggregation::Sum)
}

/// Two inputs (1, 2) feeding hidden node 3 with weights 0.8 and
/// 0.5, which feeds output node 4 with weight 1. Every function is
/// the identity, so inputs `[1, 2]` produce `1.8 + output_bias`.
pub(crate) fn activation_example(output_bias: f64) -> NeuralGenome {
    NeuralGenome::from_layers(
        1,
        vec![
            vec![identity(1, NodeKind::Input, 0.0), identity(2, NodeKind::Input, 0.0)],
            vec![identity(3, NodeKind::Hidden, 0.0)],
            vec![identity(4, NodeKind::Output, output_bias)],
        ],
        vec![
            ConnectionGene::new(5, 1, 3, 0.8),
            ConnectionGene::new(6, 2, 3, 0.5),
            ConnectionGene::new(7, 3, 4, 1.0),
        ],
    )
    .unwrap()
}

/// Fails the test if the genome breaks a structural rule.
pub(crate) fn assert_valid(genome: &NeuralGenome) {
    if let Err(e) = NeuralGenome::from_layers(
        genome.id(),
        genome.layers().to_vec(),
        genome.connections().to_vec(),
    ) {
        panic!("invalid genome: {}\n{}", e, genome);
    }
}

/// The configuration with every mutation rate set to zero.
pub(crate) fn frozen(config: GeneticConfig) -> GeneticConfig {
    GeneticConfig {
        bias_mutate_rate: 0.0,
        weight_mutate_rate: 0.0,
        enabled_mutate_rate: 0.0,
        activation_mutate_rate: 0.0,
        aggregation_mutate_rate: 0.0,
        add_node_rate: 0.0,
        add_connection_rate: 0.0,
        delete_node_rate: 0.0,
        delete_connection_rate: 0.0,
        ..config
    }
}

/// A seeded context whose IDs start after `last`, so genes
/// added by mutation never collide with hand-built ones.
pub(crate) fn context_after(last: u64, seed: u64) -> Context {
    Context::new(
        Arc::new(SequentialIds::starting_after(last)),
        Box::new(RngProvider::new(StdRng::seed_from_u64(seed))),
    )
}
