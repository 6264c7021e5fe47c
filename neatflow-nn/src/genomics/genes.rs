use crate::genomics::GeneticConfig;
use crate::GeneId;
use neatflow::{Context, NeatError, Result};

use serde::{Deserialize, Serialize};

use std::fmt;

/// Behaviour shared by the node and connection genes
/// of a genome: identity, homologous difference and
/// field-wise crossover.
pub trait Gene: Clone {
    /// Returns the gene's stable ID.
    fn id(&self) -> GeneId;

    /// Distance between two homologous genes,
    /// before any coefficient is applied.
    /// Must be symmetric.
    fn difference(&self, other: &Self) -> f64;

    /// Returns a gene whose fields are each picked
    /// from either parent with equal probability.
    ///
    /// # Errors
    /// Returns [`NeatError::CrossoverMismatch`] if the
    /// genes are not homologous (have different IDs).
    fn crossover(&self, other: &Self, context: &mut Context) -> Result<Self>;
}

/// Connections are the weighted, directed links
/// between the nodes of a genome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    id: GeneId,
    from: GeneId,
    to: GeneId,
    weight: f64,
    enabled: bool,
}

impl ConnectionGene {
    /// Returns a new enabled connection between
    /// the specified nodes.
    ///
    /// # Examples
    /// ```
    /// use neatflow_nn::genomics::ConnectionGene;
    ///
    /// let connection = ConnectionGene::new(7, 1, 3, 0.5);
    /// assert!(connection.enabled());
    /// ```
    pub fn new(id: GeneId, from: GeneId, to: GeneId, weight: f64) -> ConnectionGene {
        ConnectionGene {
            id,
            from,
            to,
            weight,
            enabled: true,
        }
    }

    /// Returns the ID of the connection's input node.
    pub fn from(&self) -> GeneId {
        self.from
    }

    /// Returns the ID of the connection's output node.
    pub fn to(&self) -> GeneId {
        self.to
    }

    /// Returns the connection's weight.
    ///
    /// # Examples
    /// ```
    /// use neatflow_nn::genomics::ConnectionGene;
    ///
    /// let connection = ConnectionGene::new(7, 1, 3, -1.25);
    /// assert_eq!(connection.weight(), -1.25);
    /// ```
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Returns whether the connection takes part in activation.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the connection.
    ///
    /// # Examples
    /// ```
    /// use neatflow_nn::genomics::ConnectionGene;
    ///
    /// let mut connection = ConnectionGene::new(7, 1, 3, 0.5);
    /// connection.set_enabled(false);
    /// assert!(!connection.enabled());
    /// ```
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Applies weight and enabled-flag mutations.
    pub(super) fn mutate(&mut self, config: &GeneticConfig, context: &mut Context) {
        if context.chance(config.weight_mutate_rate) {
            self.weight = if context.chance(config.weight_replace_rate) {
                context.between(config.weight_min, config.weight_max)
            } else {
                let nudge =
                    context.between(-config.weight_mutate_power, config.weight_mutate_power);
                (self.weight + nudge).clamp(config.weight_min, config.weight_max)
            };
        }
        if context.chance(config.enabled_mutate_rate) {
            self.enabled = !self.enabled;
        }
    }
}

impl Gene for ConnectionGene {
    fn id(&self) -> GeneId {
        self.id
    }

    fn difference(&self, other: &Self) -> f64 {
        let toggled = if self.enabled == other.enabled { 0.0 } else { 1.0 };
        (self.weight - other.weight).abs() + toggled
    }

    fn crossover(&self, other: &Self, context: &mut Context) -> Result<Self> {
        if self.id != other.id {
            return Err(NeatError::CrossoverMismatch {
                left: self.id,
                right: other.id,
            });
        }
        Ok(ConnectionGene {
            weight: if context.coin() { self.weight } else { other.weight },
            enabled: if context.coin() { self.enabled } else { other.enabled },
            ..self.clone()
        })
    }
}

impl fmt::Display for ConnectionGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Connection({}, {} -> {}, {:.3}{})",
            self.id,
            self.from,
            self.to,
            self.weight,
            if self.enabled { "" } else { ", disabled" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mutating_config() -> GeneticConfig {
        GeneticConfig {
            weight_min: -2.0,
            weight_max: 2.0,
            weight_mutate_rate: 1.0,
            weight_mutate_power: 10.0,
            ..GeneticConfig::zero()
        }
    }

    #[test]
    fn difference_counts_enabled_flag() {
        let a = ConnectionGene::new(1, 0, 2, 1.0);
        let mut b = ConnectionGene::new(1, 0, 2, 0.25);
        assert_eq!(a.difference(&b), 0.75);
        b.set_enabled(false);
        assert_eq!(a.difference(&b), 1.75);
        assert_eq!(b.difference(&a), a.difference(&b));
    }

    #[test]
    fn crossover_picks_parent_fields() {
        let mut context = Context::seeded(3);
        let a = ConnectionGene::new(1, 0, 2, 1.0);
        let mut b = ConnectionGene::new(1, 0, 2, -1.0);
        b.set_enabled(false);
        for _ in 0..20 {
            let child = a.crossover(&b, &mut context).unwrap();
            assert!(child.weight() == 1.0 || child.weight() == -1.0);
            assert_eq!((child.id(), child.from(), child.to()), (1, 0, 2));
        }
    }

    #[test]
    fn crossover_of_different_genes_fails() {
        let mut context = Context::seeded(3);
        let a = ConnectionGene::new(1, 0, 2, 1.0);
        let b = ConnectionGene::new(4, 0, 2, 1.0);
        assert_eq!(
            a.crossover(&b, &mut context),
            Err(NeatError::CrossoverMismatch { left: 1, right: 4 })
        );
    }

    #[test]
    fn perturbation_is_clamped() {
        let mut context = Context::seeded(9);
        let config = mutating_config();
        let mut connection = ConnectionGene::new(1, 0, 2, 0.0);
        for _ in 0..50 {
            connection.mutate(&config, &mut context);
            assert!((-2.0..=2.0).contains(&connection.weight()));
        }
    }
}
