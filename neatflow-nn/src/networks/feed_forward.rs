use super::Topology;
use crate::genomics::NeuralGenome;
use neatflow::Result;

/// A network that evaluates a genome's nodes one layer
/// after another on the calling thread.
///
/// Suited to synchronous fitness functions. Produces the
/// same values as a [`DataflowNetwork`] built from the
/// same genome.
///
/// [`DataflowNetwork`]: crate::networks::DataflowNetwork
#[derive(Clone, Debug)]
pub struct FeedForwardNetwork {
    topology: Topology,
    /// Enabled outbound links of each node, as `(target, weight)`.
    outbound: Vec<Vec<(usize, f64)>>,
}

impl FeedForwardNetwork {
    /// Builds a network from a genome.
    pub fn new(genome: &NeuralGenome) -> FeedForwardNetwork {
        let topology = Topology::new(genome);
        let mut outbound = vec![vec![]; topology.nodes.len()];
        for link in topology.links.iter().filter(|l| l.enabled) {
            outbound[link.from].push((link.to, link.weight));
        }
        FeedForwardNetwork { topology, outbound }
    }

    /// Number of values expected by [`activate`].
    ///
    /// [`activate`]: FeedForwardNetwork::activate
    pub fn input_count(&self) -> usize {
        self.topology.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.topology.outputs.len()
    }

    /// Feeds `inputs` through the network and returns
    /// the values of the output nodes.
    ///
    /// # Errors
    /// Returns [`NeatError::ActivationInputMismatch`] if `inputs`
    /// does not hold exactly one value per input node.
    ///
    /// [`NeatError::ActivationInputMismatch`]: neatflow::NeatError::ActivationInputMismatch
    ///
    /// # Examples
    /// ```
    /// use neatflow::{Context, Genome};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    /// use neatflow_nn::networks::FeedForwardNetwork;
    ///
    /// let config = GeneticConfig { layers: vec![3, 2], ..GeneticConfig::default() };
    /// let genome = NeuralGenome::new(1, &config, &mut Context::seeded(3)).unwrap();
    /// let network = FeedForwardNetwork::new(&genome);
    ///
    /// let outputs = network.activate(&[0.0, 0.5, 1.0]).unwrap();
    /// assert_eq!(outputs.len(), 2);
    /// // Sigmoid outputs.
    /// assert!(outputs.iter().all(|o| (0.0..=1.0).contains(o)));
    /// ```
    pub fn activate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        let values = self.activate_all(inputs)?;
        Ok(self.topology.outputs.iter().map(|&i| values[i]).collect())
    }

    /// Like [`activate`], but returns the value of every node,
    /// in the genome's layer order.
    ///
    /// [`activate`]: FeedForwardNetwork::activate
    pub fn activate_all(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        self.topology.check_inputs(inputs)?;
        let nodes = &self.topology.nodes;
        let mut received: Vec<Vec<f64>> = vec![vec![]; nodes.len()];
        for (&node, &value) in self.topology.inputs.iter().zip(inputs) {
            received[node].push(value);
        }
        for &node in &self.topology.biases {
            received[node].push(1.0);
        }

        let mut values = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            let value = node.compute(&received[index]);
            for &(target, weight) in &self.outbound[index] {
                received[target].push(value * weight);
            }
            values.push(value);
        }
        Ok(values)
    }
}
