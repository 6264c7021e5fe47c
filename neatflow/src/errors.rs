use crate::GenomeId;

use std::time::Duration;

use thiserror::Error;

/// Specialized result type for NEAT operations.
pub type Result<T> = std::result::Result<T, NeatError>;

/// Every failure condition surfaced by the evolutionary core
/// and by genome implementations built on top of it.
///
/// None of these are retried internally. The only condition
/// with built-in recovery is [`CompleteExtinction`], and only
/// when [`reset_on_extinction`] is set.
///
/// [`CompleteExtinction`]: NeatError::CompleteExtinction
/// [`reset_on_extinction`]: crate::PopulationConfig::reset_on_extinction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NeatError {
    /// A configuration value is missing, out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Two genes with different IDs were combined as if homologous.
    #[error("cannot cross over non-homologous genes {left} and {right}")]
    CrossoverMismatch { left: u64, right: u64 },

    /// The input vector does not match the network's input nodes.
    #[error("network expects {expected} inputs, received {actual}")]
    ActivationInputMismatch { expected: usize, actual: usize },

    /// A network activation did not finish before its deadline.
    #[error("network activation did not complete within {0:?}")]
    ActivationTimeout(Duration),

    /// A network task failed or dropped a channel it owned.
    #[error("network activation failed: {0}")]
    Network(String),

    /// Reproduction removed every species.
    #[error("every species went extinct in generation {generation}")]
    CompleteExtinction { generation: usize },

    /// The external fitness evaluator reported a failure.
    #[error("evaluation of genome {genome} failed: {reason}")]
    Evaluation { genome: GenomeId, reason: String },
}

impl NeatError {
    /// Shorthand for [`NeatError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> NeatError {
        NeatError::Configuration(message.into())
    }
}
