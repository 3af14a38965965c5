//! `gann` command-line tool.
//!
//! Trains small classifiers on a synthetic Gaussian-blob problem, and inspects or
//! queries saved models.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gann::{
    evolve, train_with_backprop, Activation, BackpropParams, Crossover, Dataset, EarlyStopping,
    EvolutionConfig, Mutation, Network, Optimizer, Selection,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gann")]
#[command(about = "Train small classifiers by evolution or backpropagation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ProblemArgs {
    /// Number of classes (blobs)
    #[arg(long, default_value = "3")]
    classes: usize,

    /// Input dimension
    #[arg(long, default_value = "4")]
    dim: usize,

    /// Training samples per class
    #[arg(long, default_value = "100")]
    per_class: usize,

    /// Standard deviation of each blob
    #[arg(long, default_value = "0.5")]
    spread: f64,

    /// Hidden layer sizes
    #[arg(long, value_delimiter = ',', default_value = "16")]
    hidden: Vec<usize>,

    /// RNG seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Stop after this many rounds without validation improvement (0 disables)
    #[arg(long, default_value = "0")]
    patience: usize,

    /// Write the trained model here
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train with a genetic algorithm
    Evolve {
        #[command(flatten)]
        problem: ProblemArgs,

        #[arg(long, default_value = "50")]
        population: usize,

        #[arg(long, default_value = "100")]
        generations: usize,

        #[arg(long, value_enum, default_value = "tournament")]
        selection: SelectionArg,

        #[arg(long, value_enum, default_value = "uniform")]
        crossover: CrossoverArg,

        #[arg(long, value_enum, default_value = "gaussian")]
        mutation: MutationArg,

        /// Mutation rate (std-dev for gaussian mutation)
        #[arg(long, default_value = "0.1")]
        mutation_rate: f64,

        /// Per-parameter mutation probability
        #[arg(long, default_value = "0.25")]
        mutation_chance: f64,
    },

    /// Train with mini-batch backpropagation
    Backprop {
        #[command(flatten)]
        problem: ProblemArgs,

        #[arg(long, value_enum, default_value = "adam")]
        optimizer: OptimizerArg,

        #[arg(long, default_value = "50")]
        epochs: usize,

        #[arg(long, default_value = "0.01")]
        lr: f64,

        #[arg(long, default_value = "16")]
        batch_size: usize,
    },

    /// Print the shape of a saved model
    Inspect {
        model: PathBuf,
    },

    /// Classify one feature vector with a saved model
    Predict {
        model: PathBuf,

        /// Comma separated features
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        input: Vec<f64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SelectionArg {
    Elitism,
    Tournament,
    Roulette,
    Rank,
}

#[derive(Clone, Copy, ValueEnum)]
enum CrossoverArg {
    Uniform,
    SinglePoint,
    TwoPoint,
    Arithmetic,
}

#[derive(Clone, Copy, ValueEnum)]
enum MutationArg {
    Uniform,
    Gaussian,
    NonUniform,
    Adaptive,
}

#[derive(Clone, Copy, ValueEnum)]
enum OptimizerArg {
    Sgd,
    Rmsprop,
    Adam,
}

impl From<SelectionArg> for Selection {
    fn from(value: SelectionArg) -> Self {
        match value {
            SelectionArg::Elitism => Selection::Elitism,
            SelectionArg::Tournament => Selection::Tournament,
            SelectionArg::Roulette => Selection::RouletteWheel,
            SelectionArg::Rank => Selection::Rank,
        }
    }
}

impl From<CrossoverArg> for Crossover {
    fn from(value: CrossoverArg) -> Self {
        match value {
            CrossoverArg::Uniform => Crossover::Uniform,
            CrossoverArg::SinglePoint => Crossover::SinglePoint,
            CrossoverArg::TwoPoint => Crossover::TwoPoint,
            CrossoverArg::Arithmetic => Crossover::Arithmetic,
        }
    }
}

impl From<OptimizerArg> for Optimizer {
    fn from(value: OptimizerArg) -> Self {
        match value {
            OptimizerArg::Sgd => Optimizer::Sgd,
            OptimizerArg::Rmsprop => Optimizer::RMSPROP,
            OptimizerArg::Adam => Optimizer::ADAM,
        }
    }
}

fn mutation_for(arg: MutationArg, rate: f64) -> Mutation {
    match arg {
        MutationArg::Uniform => Mutation::Uniform,
        MutationArg::Gaussian => Mutation::Gaussian { std_dev: rate },
        MutationArg::NonUniform => Mutation::NonUniform,
        MutationArg::Adaptive => Mutation::Adaptive,
    }
}

/// One isotropic Gaussian blob per class around a random center in `[-3, 3]^dim`.
fn gaussian_blobs<R: Rng>(
    classes: usize,
    dim: usize,
    per_class: usize,
    spread: f64,
    rng: &mut R,
) -> Result<(Dataset, Dataset)> {
    if classes < 2 || dim == 0 || per_class < 2 {
        bail!("need at least 2 classes, 1 dimension and 2 samples per class");
    }
    let noise = Normal::new(0.0, spread).context("invalid blob spread")?;
    let centers: Vec<Vec<f64>> = (0..classes)
        .map(|_| (0..dim).map(|_| rng.gen_range(-3.0..3.0)).collect())
        .collect();

    // Every fifth sample goes to validation.
    let (mut train_x, mut train_y) = (Vec::new(), Vec::new());
    let (mut val_x, mut val_y) = (Vec::new(), Vec::new());
    for i in 0..per_class {
        for (class, center) in centers.iter().enumerate() {
            let (xs, ys) = if i % 5 == 4 {
                (&mut val_x, &mut val_y)
            } else {
                (&mut train_x, &mut train_y)
            };
            xs.extend(center.iter().map(|c| c + noise.sample(rng)));
            ys.extend((0..classes).map(|k| if k == class { 1.0 } else { 0.0 }));
        }
    }

    let train = Dataset::from_flat(train_x, train_y, dim, classes)?;
    let validation = Dataset::from_flat(val_x, val_y, dim, classes)?;
    Ok((train, validation))
}

fn architecture(problem: &ProblemArgs) -> Vec<usize> {
    let mut arch = Vec::with_capacity(problem.hidden.len() + 2);
    arch.push(problem.dim);
    arch.extend(&problem.hidden);
    arch.push(problem.classes);
    arch
}

fn early_stopping(problem: &ProblemArgs) -> Option<EarlyStopping> {
    (problem.patience > 0).then(|| EarlyStopping::new(problem.patience, 0.001))
}

fn finish(net: &Network, train: &Dataset, validation: &Dataset, out: Option<&Path>) -> Result<()> {
    info!(
        "train accuracy: {:.2}%, validation accuracy: {:.2}%",
        gann::evaluate(net, train)? * 100.0,
        gann::evaluate(net, validation)? * 100.0
    );
    if let Some(path) = out {
        net.save(path)
            .with_context(|| format!("saving model to {}", path.display()))?;
        info!("model written to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evolve {
            problem,
            population,
            generations,
            selection,
            crossover,
            mutation,
            mutation_rate,
            mutation_chance,
        } => {
            let mut rng = StdRng::seed_from_u64(problem.seed);
            let (train, validation) = gaussian_blobs(
                problem.classes,
                problem.dim,
                problem.per_class,
                problem.spread,
                &mut rng,
            )?;

            let cfg = EvolutionConfig {
                population_size: population,
                generations,
                mutation_rate,
                mutation_chance,
                selection: selection.into(),
                crossover: crossover.into(),
                mutation: mutation_for(mutation, mutation_rate),
                early_stopping: early_stopping(&problem),
                ..EvolutionConfig::new(&architecture(&problem))
            };
            let outcome = evolve(&cfg, &train, Some(&validation), &mut rng)?;
            info!(
                "evolution ran {} generations{}",
                outcome.report.generations_run,
                if outcome.report.stopped_early {
                    " (stopped early)"
                } else {
                    ""
                }
            );
            finish(&outcome.network, &train, &validation, problem.out.as_deref())
        }
        Commands::Backprop {
            problem,
            optimizer,
            epochs,
            lr,
            batch_size,
        } => {
            let mut rng = StdRng::seed_from_u64(problem.seed);
            let (train, validation) = gaussian_blobs(
                problem.classes,
                problem.dim,
                problem.per_class,
                problem.spread,
                &mut rng,
            )?;

            let mut params = BackpropParams::new(&architecture(&problem));
            params.hidden_activation = Activation::ReLU;
            params.output_activation = Activation::Sigmoid;
            params.fit.epochs = epochs;
            params.fit.learning_rate = lr;
            params.fit.batch_size = batch_size;
            params.fit.optimizer = optimizer.into();
            params.fit.early_stopping = early_stopping(&problem);
            params.fit.logging = true;

            let net = train_with_backprop(&params, &train, Some(&validation), &mut rng)?;
            finish(&net, &train, &validation, problem.out.as_deref())
        }
        Commands::Inspect { model } => {
            let net = Network::load(&model)
                .with_context(|| format!("loading {}", model.display()))?;
            println!("architecture: {:?}", net.architecture());
            println!("hidden activation: {:?}", net.hidden_activation());
            println!("output activation: {:?}", net.output_activation());
            println!("parameters: {}", net.num_params());
            Ok(())
        }
        Commands::Predict { model, input } => {
            let net = Network::load(&model)
                .with_context(|| format!("loading {}", model.display()))?;
            if input.len() != net.input_dim() {
                bail!(
                    "model expects {} features, got {}",
                    net.input_dim(),
                    input.len()
                );
            }
            println!("{}", gann::predict(&net, &input)?);
            Ok(())
        }
    }
}
