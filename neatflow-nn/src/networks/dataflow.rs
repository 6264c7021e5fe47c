use super::{within_deadline, Topology};
use crate::genomics::{GeneticConfig, NeuralGenome};
use neatflow::{NeatError, Result};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use std::sync::Arc;
use std::time::Duration;

/// A network that activates as a graph of tokio tasks,
/// one per node and one per connection, linked by
/// single-use channels.
///
/// Every activation builds a fresh graph, so a network
/// can be shared and activated concurrently.
#[derive(Clone, Debug)]
pub struct DataflowNetwork {
    topology: Arc<Topology>,
    deadline: Duration,
}

/// Aborts every task it holds when dropped, so a timed-out
/// activation leaves nothing running.
struct TaskGraph(Vec<JoinHandle<()>>);

impl Drop for TaskGraph {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}

impl DataflowNetwork {
    /// Builds a network whose activations must finish within `deadline`.
    pub fn new(genome: &NeuralGenome, deadline: Duration) -> DataflowNetwork {
        DataflowNetwork {
            topology: Arc::new(Topology::new(genome)),
            deadline,
        }
    }

    /// Builds a network using the configured activation timeout.
    pub fn with_config(genome: &NeuralGenome, config: &GeneticConfig) -> DataflowNetwork {
        DataflowNetwork::new(genome, config.activation_timeout)
    }

    pub fn input_count(&self) -> usize {
        self.topology.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.topology.outputs.len()
    }

    /// Feeds `inputs` through the network and returns
    /// the values of the output nodes.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime.
    ///
    /// # Errors
    /// Returns [`NeatError::ActivationInputMismatch`] if `inputs`
    /// does not hold exactly one value per input node,
    /// [`NeatError::ActivationTimeout`] if the deadline passes, and
    /// [`NeatError::Network`] if an output node finishes without
    /// producing a value.
    ///
    /// # Examples
    /// ```
    /// use neatflow::{Context, Genome};
    /// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
    /// use neatflow_nn::networks::{DataflowNetwork, FeedForwardNetwork};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let config = GeneticConfig { layers: vec![2, 2, 1], ..GeneticConfig::default() };
    /// let genome = NeuralGenome::new(1, &config, &mut Context::seeded(3)).unwrap();
    ///
    /// let network = DataflowNetwork::with_config(&genome, &config);
    /// let outputs = network.activate(&[1.0, 0.0]).await.unwrap();
    /// assert_eq!(outputs, FeedForwardNetwork::new(&genome).activate(&[1.0, 0.0]).unwrap());
    /// # }
    /// ```
    pub async fn activate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        self.topology.check_inputs(inputs)?;
        within_deadline(self.deadline, self.run(inputs)).await.map_err(|e| {
            debug!(error = %e, "dataflow activation failed");
            e
        })
    }

    async fn run(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        let topology = &self.topology;
        let count = topology.nodes.len();
        let mut inbound: Vec<Vec<oneshot::Receiver<f64>>> = (0..count).map(|_| vec![]).collect();
        let mut outbound: Vec<Vec<oneshot::Sender<f64>>> = (0..count).map(|_| vec![]).collect();
        let mut graph = TaskGraph(Vec::with_capacity(count + topology.links.len()));

        for link in &topology.links {
            let (into_link, link_input) = oneshot::channel();
            let (link_output, out_of_link) = oneshot::channel::<f64>();
            outbound[link.from].push(into_link);
            inbound[link.to].push(out_of_link);
            let (weight, enabled) = (link.weight, link.enabled);
            graph.0.push(tokio::spawn(async move {
                if let Ok(value) = link_input.await {
                    // A disabled link closes without a value.
                    if enabled {
                        let _ = link_output.send(value * weight);
                    }
                }
            }));
        }

        for (&node, &value) in topology.inputs.iter().zip(inputs) {
            feed(&mut inbound[node], value);
        }
        for &node in &topology.biases {
            feed(&mut inbound[node], 1.0);
        }
        let mut drains = Vec::with_capacity(topology.outputs.len());
        for &node in &topology.outputs {
            let (sender, receiver) = oneshot::channel();
            outbound[node].push(sender);
            drains.push(receiver);
        }

        for (index, (receivers, senders)) in inbound.into_iter().zip(outbound).enumerate() {
            let node = topology.nodes[index].clone();
            graph.0.push(tokio::spawn(async move {
                let mut values = Vec::with_capacity(receivers.len());
                for receiver in receivers {
                    if let Ok(value) = receiver.await {
                        values.push(value);
                    }
                }
                let value = node.compute(&values);
                for sender in senders {
                    let _ = sender.send(value);
                }
            }));
        }

        let mut outputs = Vec::with_capacity(drains.len());
        for drain in drains {
            let value = drain.await.map_err(|_| {
                NeatError::Network("an output node finished without a value".to_string())
            })?;
            outputs.push(value);
        }
        Ok(outputs)
    }
}

fn feed(inbound: &mut Vec<oneshot::Receiver<f64>>, value: f64) {
    let (sender, receiver) = oneshot::channel();
    // The receiver is alive, so sending cannot fail.
    let _ = sender.send(value);
    inbound.push(receiver);
}
