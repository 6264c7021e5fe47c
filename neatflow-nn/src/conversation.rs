//! A request/response session between a fitness evaluator
//! and the network of one genome.
//!
//! The network runs inside an actor task. The evaluator sends input
//! vectors and receives the network's outputs (or errors) until it
//! closes the session, then reports exactly one fitness value, which
//! the actor must receive before its deadline.
use crate::genomics::{GeneticConfig, NeuralGenome};
use crate::networks::DataflowNetwork;
use neatflow::{Genome, GenomeId, NeatError, Result};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::debug;

use std::time::Duration;

/// Maximum number of queued, unanswered input vectors.
const INBOX_CAPACITY: usize = 16;

struct Exchange {
    inputs: Vec<f64>,
    reply: oneshot::Sender<Result<Vec<f64>>>,
}

/// An open session with a network actor.
///
/// # Examples
/// ```
/// use neatflow::{Context, Genome};
/// use neatflow_nn::conversation::Conversation;
/// use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> neatflow::Result<()> {
/// let config = GeneticConfig::default();
/// let genome = NeuralGenome::new(1, &config, &mut Context::seeded(0))?;
///
/// let conversation = Conversation::start(&genome, &config, Duration::from_secs(1));
/// let mut error = 0.0;
/// for (inputs, expected) in [([0.0, 1.0], 1.0), ([1.0, 1.0], 0.0)] {
///     let outputs = conversation.ask(inputs.to_vec()).await?;
///     error += (outputs[0] - expected).abs();
/// }
/// assert_eq!(conversation.finish(2.0 - error).await?, 2.0 - error);
/// # Ok(())
/// # }
/// ```
pub struct Conversation {
    requests: mpsc::Sender<Exchange>,
    pending: PendingFitness,
}

/// A session whose inputs are closed, awaiting its fitness value.
pub struct PendingFitness {
    genome: GenomeId,
    fitness: oneshot::Sender<f64>,
    actor: JoinHandle<Result<f64>>,
}

impl Conversation {
    /// Spawns an actor for `genome`'s network.
    ///
    /// Each activation is bounded by the configured activation
    /// timeout. Once the session is closed, the actor waits at
    /// most `fitness_deadline` for the fitness value.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime.
    pub fn start(
        genome: &NeuralGenome,
        config: &GeneticConfig,
        fitness_deadline: Duration,
    ) -> Conversation {
        let network = DataflowNetwork::with_config(genome, config);
        let (requests, inbox) = mpsc::channel(INBOX_CAPACITY);
        let (fitness, verdict) = oneshot::channel();
        let actor = tokio::spawn(converse(genome.id(), network, inbox, verdict, fitness_deadline));
        Conversation {
            requests,
            pending: PendingFitness {
                genome: genome.id(),
                fitness,
                actor,
            },
        }
    }

    /// Sends one input vector and waits for the network's outputs.
    ///
    /// # Errors
    /// Returns the activation's error, or [`NeatError::Network`] if
    /// the actor is no longer running.
    pub async fn ask(&self, inputs: Vec<f64>) -> Result<Vec<f64>> {
        let (reply, answer) = oneshot::channel();
        self.requests
            .send(Exchange { inputs, reply })
            .await
            .map_err(|_| actor_gone(self.pending.genome))?;
        answer.await.map_err(|_| actor_gone(self.pending.genome))?
    }

    /// Closes the session's inputs, leaving only
    /// the fitness value to be reported.
    pub fn close(self) -> PendingFitness {
        self.pending
    }

    /// Closes the session and reports its fitness value,
    /// returning the value the actor received.
    pub async fn finish(self, fitness: f64) -> Result<f64> {
        self.close().report(fitness).await
    }
}

impl PendingFitness {
    /// Reports the session's fitness value and waits for the actor to end.
    ///
    /// # Errors
    /// Returns [`NeatError::Evaluation`] if the actor's fitness
    /// deadline passed before the value arrived.
    pub async fn report(self, fitness: f64) -> Result<f64> {
        // A closed receiver means the actor already gave up;
        // its own result says why.
        let _ = self.fitness.send(fitness);
        self.actor
            .await
            .map_err(|e| NeatError::Network(format!("conversation actor failed: {}", e)))?
    }
}

fn actor_gone(genome: GenomeId) -> NeatError {
    NeatError::Network(format!("conversation with genome {} has ended", genome))
}

async fn converse(
    genome: GenomeId,
    network: DataflowNetwork,
    mut inbox: mpsc::Receiver<Exchange>,
    verdict: oneshot::Receiver<f64>,
    fitness_deadline: Duration,
) -> Result<f64> {
    let mut exchanges = 0usize;
    while let Some(Exchange { inputs, reply }) = inbox.recv().await {
        let _ = reply.send(network.activate(&inputs).await);
        exchanges += 1;
    }

    match time::timeout(fitness_deadline, verdict).await {
        Ok(Ok(fitness)) => {
            debug!(genome, exchanges, fitness, "conversation finished");
            Ok(fitness)
        }
        Ok(Err(_)) => Err(NeatError::Evaluation {
            genome,
            reason: "conversation ended without a fitness value".to_string(),
        }),
        Err(_) => Err(NeatError::Evaluation {
            genome,
            reason: format!("no fitness value within {:?}", fitness_deadline),
        }),
    }
}
