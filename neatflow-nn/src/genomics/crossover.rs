use super::{Gene, NeuralGenome};
use crate::GeneId;
use neatflow::{Context, Genome, GenomeId, Result};

use ahash::RandomState;

use std::collections::HashMap;

/// Combines two genomes into a child with the given ID.
///
/// The fitter parent (the first on ties) provides the
/// structure: its layers and connections, including genes
/// the other parent lacks. Genes both parents share have
/// each field picked from either parent with equal odds.
pub(super) fn crossover(
    id: GenomeId,
    parent1: &NeuralGenome,
    parent2: &NeuralGenome,
    context: &mut Context,
) -> Result<NeuralGenome> {
    let (primary, secondary) = if parent1.fitness() >= parent2.fitness() {
        (parent1, parent2)
    } else {
        (parent2, parent1)
    };

    let other_nodes: HashMap<GeneId, _, RandomState> =
        secondary.nodes().map(|n| (n.id(), n)).collect();
    let layers = primary
        .layers
        .iter()
        .map(|layer| {
            layer
                .iter()
                .map(|node| match other_nodes.get(&node.id()) {
                    Some(other) => node.crossover(other, context),
                    None => {
                        let mut node = node.clone();
                        node.set_value(0.0);
                        Ok(node)
                    }
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let other_connections: HashMap<GeneId, _, RandomState> =
        secondary.connections.iter().map(|c| (c.id(), c)).collect();
    let connections = primary
        .connections
        .iter()
        .map(|connection| match other_connections.get(&connection.id()) {
            Some(other) => connection.crossover(other, context),
            None => Ok(connection.clone()),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NeuralGenome {
        id,
        layers,
        connections,
        fitness: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::GeneticConfig;
    use crate::testing::assert_valid;

    use std::collections::BTreeSet;

    fn gene_ids(genome: &NeuralGenome) -> BTreeSet<GeneId> {
        genome
            .nodes()
            .map(|n| n.id())
            .chain(genome.connections().iter().map(|c| c.id()))
            .collect()
    }

    #[test]
    fn self_crossover_keeps_gene_ids() {
        let mut context = Context::seeded(2);
        let config = GeneticConfig {
            layers: vec![3, 4, 2],
            ..GeneticConfig::default()
        };
        let genome = NeuralGenome::new(1, &config, &mut context).unwrap();
        let child = crossover(10, &genome, &genome, &mut context).unwrap();
        assert_eq!(child.id(), 10);
        assert_eq!(child.fitness(), 0.0);
        assert_eq!(gene_ids(&child), gene_ids(&genome));
        assert_eq!(child.connections(), genome.connections());
    }

    #[test]
    fn fitter_parent_provides_structure() {
        let mut context = Context::seeded(2);
        let config = GeneticConfig::default();
        let mut plain = NeuralGenome::new(1, &config, &mut context).unwrap();
        let mut grown = plain.with_id(2);
        assert!(grown.mutate_add_node(&config, &mut context));

        grown.set_fitness(2.0);
        plain.set_fitness(1.0);
        let child = crossover(3, &plain, &grown, &mut context).unwrap();
        assert_eq!(gene_ids(&child), gene_ids(&grown));
        assert_valid(&child);

        grown.set_fitness(0.5);
        let child = crossover(4, &plain, &grown, &mut context).unwrap();
        assert_eq!(gene_ids(&child), gene_ids(&plain));
        assert_valid(&child);
    }

    #[test]
    fn ties_favour_first_parent() {
        let mut context = Context::seeded(2);
        let config = GeneticConfig::default();
        let plain = NeuralGenome::new(1, &config, &mut context).unwrap();
        let mut grown = plain.with_id(2);
        grown.mutate_add_connection(&config, &mut context);
        assert!(grown.mutate_add_node(&config, &mut context));

        let child = crossover(3, &grown, &plain, &mut context).unwrap();
        assert_eq!(gene_ids(&child), gene_ids(&grown));
        let child = crossover(4, &plain, &grown, &mut context).unwrap();
        assert_eq!(gene_ids(&child), gene_ids(&plain));
    }
}
