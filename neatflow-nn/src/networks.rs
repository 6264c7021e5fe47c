//! Executable networks built from [`NeuralGenome`]s.
//!
//! Both network forms compute every node as
//! `activation(aggregation(inbound values) + bias)`, where an
//! input node's only inbound value is its external input, a bias
//! node's is the constant `1.0`, and each enabled connection
//! contributes its source node's value times its weight.
//! Disabled connections contribute nothing.
//!
//! [`NeuralGenome`]: crate::genomics::NeuralGenome
mod dataflow;
mod feed_forward;

pub use dataflow::DataflowNetwork;
pub use feed_forward::FeedForwardNetwork;

use crate::genomics::{Gene, NeuralGenome, NodeGene, NodeKind};
use crate::GeneId;
use neatflow::{NeatError, Result};

use ahash::RandomState;
use tokio::time;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// A genome's nodes flattened in layer order,
/// with connections resolved to node indices.
#[derive(Clone, Debug)]
struct Topology {
    nodes: Vec<NodeGene>,
    /// Sorted by source node.
    links: Vec<Link>,
    inputs: Vec<usize>,
    biases: Vec<usize>,
    outputs: Vec<usize>,
}

#[derive(Clone, Copy, Debug)]
struct Link {
    from: usize,
    to: usize,
    weight: f64,
    enabled: bool,
}

impl Topology {
    fn new(genome: &NeuralGenome) -> Topology {
        let nodes: Vec<NodeGene> = genome.nodes().cloned().collect();
        let index: HashMap<GeneId, usize, RandomState> =
            nodes.iter().enumerate().map(|(i, n)| (n.id(), i)).collect();
        let mut links: Vec<Link> = genome
            .connections()
            .iter()
            .filter_map(|c| {
                Some(Link {
                    from: *index.get(&c.from())?,
                    to: *index.get(&c.to())?,
                    weight: c.weight(),
                    enabled: c.enabled(),
                })
            })
            .collect();
        links.sort_by_key(|link| link.from);

        let of_kind = |kind: NodeKind| -> Vec<usize> {
            nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.kind() == kind)
                .map(|(i, _)| i)
                .collect()
        };
        let inputs = of_kind(NodeKind::Input);
        let biases = of_kind(NodeKind::Bias);
        let outputs = of_kind(NodeKind::Output);
        Topology {
            nodes,
            links,
            inputs,
            biases,
            outputs,
        }
    }

    fn check_inputs(&self, inputs: &[f64]) -> Result<()> {
        if inputs.len() == self.inputs.len() {
            Ok(())
        } else {
            Err(NeatError::ActivationInputMismatch {
                expected: self.inputs.len(),
                actual: inputs.len(),
            })
        }
    }
}

/// Runs `activation` to completion, or fails with
/// [`NeatError::ActivationTimeout`] once `deadline` passes.
async fn within_deadline<T>(
    deadline: Duration,
    activation: impl Future<Output = Result<T>>,
) -> Result<T> {
    time::timeout(deadline, activation)
        .await
        .unwrap_or(Err(NeatError::ActivationTimeout(deadline)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::activation_example;

    #[test]
    fn topology_resolves_connections() {
        let topology = Topology::new(&activation_example(0.0));
        assert_eq!(topology.inputs, vec![0, 1]);
        assert!(topology.biases.is_empty());
        assert_eq!(topology.outputs, vec![3]);
        let ends: Vec<(usize, usize)> = topology.links.iter().map(|l| (l.from, l.to)).collect();
        assert_eq!(ends, vec![(0, 2), (1, 2), (2, 3)]);
    }

    #[tokio::test]
    async fn stalled_activation_times_out() {
        let deadline = Duration::from_millis(10);
        let result: Result<()> = within_deadline(deadline, std::future::pending()).await;
        assert_eq!(result, Err(NeatError::ActivationTimeout(deadline)));
    }
}
