use neatflow::logging::{EvolutionLogger, ReportingLevel, Stats};
use neatflow::{Context, Genome, NeatError, Population, PopulationConfig, Termination};
use neatflow_nn::conversation::Conversation;
use neatflow_nn::genomics::{GeneticConfig, NeuralGenome};
use neatflow_nn::networks::FeedForwardNetwork;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use std::error::Error;
use std::num::NonZeroUsize;
use std::time::Duration;

const CASES: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

// Allowed error margin for neural net answers.
const ERROR_MARGIN: f64 = 0.3;

/// Everything a run of the demo can be configured with,
/// loadable from a RON file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
struct Experiment {
    population: PopulationConfig,
    genetic: GeneticConfig,
    generation_limit: usize,
    trials: u64,
    seed: u64,
    /// Deadline for a conversation's fitness report.
    fitness_deadline: Duration,
}

impl Default for Experiment {
    fn default() -> Experiment {
        Experiment {
            population: PopulationConfig {
                size: NonZeroUsize::new(150).unwrap_or(NonZeroUsize::MIN),
                fitness_threshold: 16.0,
                ..PopulationConfig::default()
            },
            genetic: GeneticConfig {
                layers: vec![2, 1],
                ..GeneticConfig::default()
            },
            generation_limit: 100,
            trials: 200,
            seed: 0,
            fitness_deadline: Duration::from_secs(1),
        }
    }
}

fn score(errors: impl Iterator<Item = f64>) -> f64 {
    let total: f64 = errors
        .map(|e| if e < ERROR_MARGIN { 0.0 } else { e })
        .sum();
    (4.0 - total).powi(2)
}

fn evaluate_xor(genome: &NeuralGenome, _generation: usize) -> Result<f64, NeatError> {
    let network = FeedForwardNetwork::new(genome);
    let mut errors = Vec::with_capacity(CASES.len());
    for (input, output) in CASES {
        errors.push((network.activate(&input)?[0] - output).abs());
    }
    Ok(score(errors.into_iter()))
}

async fn converse_xor(
    genome: NeuralGenome,
    config: GeneticConfig,
    deadline: Duration,
) -> Result<f64, NeatError> {
    let conversation = Conversation::start(&genome, &config, deadline);
    let mut errors = Vec::with_capacity(CASES.len());
    for (input, output) in CASES {
        errors.push((conversation.ask(input.to_vec()).await?[0] - output).abs());
    }
    conversation.finish(score(errors.into_iter())).await
}

fn new_population(experiment: &Experiment, seed: u64) -> Result<Population<NeuralGenome>, NeatError> {
    Population::new(
        experiment.population.clone(),
        experiment.genetic.clone(),
        Context::seeded(seed),
    )
}

/// Runs many independently seeded populations in parallel and
/// reports how quickly they solve XOR.
fn stress_test(experiment: &Experiment) -> Result<(), NeatError> {
    let generations = (0..experiment.trials)
        .into_par_iter()
        .map(|trial| {
            let mut population = new_population(experiment, experiment.seed + trial)?;
            match population.run(evaluate_xor, Some(experiment.generation_limit)) {
                Ok(Termination::Solved) => Ok(Some(population.generation())),
                Ok(_) => Ok(None),
                Err(NeatError::CompleteExtinction { generation }) => {
                    warn!(trial, generation, "population went extinct");
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .collect::<Result<Vec<Option<usize>>, NeatError>>()?;

    let failures = generations.iter().filter(|g| g.is_none()).count();
    println!(
        "Successful run generation count {:?}, {}% failure rate over {} trials",
        Stats::from(generations.iter().flatten().map(|&g| g as f64)),
        failures as f64 * 100.0 / experiment.trials.max(1) as f64,
        experiment.trials
    );
    Ok(())
}

/// Evolves a single population, evaluating every genome in
/// its own conversation with a dataflow network.
fn concurrent_run(experiment: &Experiment) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let mut population = new_population(experiment, experiment.seed)?;
    let config = experiment.genetic.clone();
    let deadline = experiment.fitness_deadline;
    let termination = runtime.block_on(population.run_concurrent(
        |genome, _| converse_xor(genome, config.clone(), deadline),
        Some(experiment.generation_limit),
    ))?;
    info!(?termination, generation = population.generation(), "concurrent run finished");
    if let Some(champion) = population.best_ever() {
        println!("{}", champion);
    }
    Ok(())
}

/// Evolves a single population while logging every generation,
/// then prints the champion in RON.
fn champion_run(experiment: &Experiment) -> Result<(), Box<dyn Error>> {
    let mut population = new_population(experiment, experiment.seed)?;
    let mut logger = EvolutionLogger::new(ReportingLevel::SpeciesChampions);
    for _ in 0..experiment.generation_limit {
        population.evaluate_fitness(evaluate_xor)?;
        logger.log(
            &population,
            &|g| [g.fitness(), g.nodes().count() as f64, g.connections().len() as f64],
            ["fitness", "nodes", "connections"],
        );
        if population.evolve()? != neatflow::RunState::Evaluating {
            break;
        }
    }
    if let Some(log) = logger.iter().last() {
        println!("{}", log);
    }
    if let Some(champion) = population.best_ever() {
        println!("{}", ron::ser::to_string_pretty(champion, Default::default())?);
    }
    Ok(())
}

fn load_experiment(path: Option<&str>) -> Result<Experiment, Box<dyn Error>> {
    let experiment: Experiment = match path {
        Some(path) => ron::from_str(&std::fs::read_to_string(path)?)?,
        None => Experiment::default(),
    };
    experiment.population.validate()?;
    experiment.genetic.validate()?;
    Ok(experiment)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = args.first().map(String::as_str).unwrap_or("trials");
    let experiment = load_experiment(args.get(1).map(String::as_str))?;

    match mode {
        "trials" => stress_test(&experiment)?,
        "concurrent" => concurrent_run(&experiment)?,
        "champion" => champion_run(&experiment)?,
        other => {
            eprintln!("usage: xor [trials|concurrent|champion] [config.ron]");
            return Err(format!("unknown mode {:?}", other).into());
        }
    }
    Ok(())
}
