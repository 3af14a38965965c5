//! Evolutionary training loop.
//!
//! Per generation:
//! 1. evaluate every individual (accuracy on the first `fitness_samples` training rows),
//! 2. compute the population mean and standard deviation of fitness,
//! 3. optionally check early stopping with the fittest individual on the validation set,
//! 4. select a breeding pool,
//! 5. breed `population_size - elitism_count` children (two tournament-picked parents
//!    from the pool, crossover), then mutate each child,
//! 6. append clones of the `elitism_count` fittest individuals and replace the population.
//!
//! The result is the early-stopping snapshot if one was taken, otherwise the individual of
//! the final population with the highest accuracy on the whole training set.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::early_stopping::EarlyStoppingTracker;
use crate::metrics::{accuracy, accuracy_on_prefix};
use crate::selection::{sort_by_fitness_desc, tournament_pick};
use crate::{
    Activation, Crossover, Dataset, EarlyStopping, Error, Mutation, MutationContext, Network,
    NetworkFitness, Result, Selection,
};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Configuration for [`evolve`].
pub struct EvolutionConfig {
    pub architecture: Vec<usize>,
    pub hidden_activation: Activation,
    pub output_activation: Activation,
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    /// Per-parameter mutation probability in `[0, 1]`.
    pub mutation_chance: f64,
    /// Training rows used for per-generation fitness; `0` or more than the dataset
    /// size means all rows.
    pub fitness_samples: usize,
    pub selection: Selection,
    pub tournament_size: usize,
    pub elitism_count: usize,
    pub crossover: Crossover,
    pub mutation: Mutation,
    /// Requires a validation set to take effect.
    pub early_stopping: Option<EarlyStopping>,
    pub logging: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            architecture: Vec::new(),
            hidden_activation: Activation::ReLU,
            output_activation: Activation::Sigmoid,
            population_size: 50,
            generations: 100,
            mutation_rate: 0.1,
            mutation_chance: 0.25,
            fitness_samples: 1000,
            selection: Selection::Tournament,
            tournament_size: 5,
            elitism_count: 1,
            crossover: Crossover::Uniform,
            mutation: Mutation::Gaussian { std_dev: 0.1 },
            early_stopping: None,
            logging: true,
        }
    }
}

impl EvolutionConfig {
    /// Defaults for the given architecture.
    pub fn new(architecture: &[usize]) -> Self {
        Self {
            architecture: architecture.to_vec(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.architecture.len() < 2 {
            return Err(Error::InvalidArchitecture(format!(
                "need at least 2 layers (input and output), got {}",
                self.architecture.len()
            )));
        }
        if self.population_size < 2 {
            return Err(Error::InvalidParam(format!(
                "population_size must be >= 2, got {}",
                self.population_size
            )));
        }
        if self.generations == 0 {
            return Err(Error::InvalidParam("generations must be > 0".to_owned()));
        }
        if !(self.mutation_rate.is_finite() && self.mutation_rate >= 0.0) {
            return Err(Error::InvalidParam(format!(
                "mutation_rate must be finite and >= 0, got {}",
                self.mutation_rate
            )));
        }
        if !(self.mutation_chance.is_finite() && (0.0..=1.0).contains(&self.mutation_chance)) {
            return Err(Error::InvalidParam(format!(
                "mutation_chance must be in [0,1], got {}",
                self.mutation_chance
            )));
        }
        if self.tournament_size == 0 {
            return Err(Error::InvalidParam("tournament_size must be > 0".to_owned()));
        }
        self.mutation.validate()?;
        if let Some(es) = &self.early_stopping {
            es.validate()?;
        }
        Ok(())
    }
}

/// Pluggable genetic operators used by [`evolve_with`].
pub trait Operators {
    fn select<'a, R: Rng + ?Sized>(
        &self,
        population: &mut [NetworkFitness<'a>],
        cfg: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Vec<NetworkFitness<'a>>>;

    fn crossover<R: Rng + ?Sized>(
        &self,
        parent1: &Network,
        parent2: &Network,
        cfg: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Network>;

    fn mutate<R: Rng + ?Sized>(
        &self,
        network: &mut Network,
        ctx: &MutationContext,
        cfg: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<()>;
}

/// Dispatches to the strategies named in the config.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardOperators;

impl Operators for StandardOperators {
    fn select<'a, R: Rng + ?Sized>(
        &self,
        population: &mut [NetworkFitness<'a>],
        cfg: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Vec<NetworkFitness<'a>>> {
        cfg.selection.select(population, cfg.tournament_size, rng)
    }

    fn crossover<R: Rng + ?Sized>(
        &self,
        parent1: &Network,
        parent2: &Network,
        cfg: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Network> {
        cfg.crossover.apply(parent1, parent2, rng)
    }

    fn mutate<R: Rng + ?Sized>(
        &self,
        network: &mut Network,
        ctx: &MutationContext,
        cfg: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<()> {
        cfg.mutation.apply(network, ctx, rng)
    }
}

/// A fixed-size generation of networks, owned as a unit.
#[derive(Debug, Clone)]
pub struct Population {
    networks: Vec<Network>,
}

impl Population {
    /// `size` Xavier-initialized networks with the config's architecture and activations.
    pub fn random<R: Rng + ?Sized>(cfg: &EvolutionConfig, size: usize, rng: &mut R) -> Result<Self> {
        let mut networks = Vec::new();
        networks
            .try_reserve_exact(size)
            .map_err(|e| Error::AllocFailed(format!("population of {size}: {e}")))?;
        for _ in 0..size {
            networks.push(Network::new_with_rng(
                &cfg.architecture,
                cfg.hidden_activation,
                cfg.output_activation,
                rng,
            )?);
        }
        Ok(Self { networks })
    }

    pub fn from_networks(networks: Vec<Network>) -> Self {
        Self { networks }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    #[inline]
    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    pub fn into_networks(self) -> Vec<Network> {
        self.networks
    }

    /// Accuracy of every individual on the first `samples` rows (`0` = all).
    pub fn evaluate(&self, data: &Dataset, samples: usize) -> Result<Vec<f64>> {
        self.networks
            .iter()
            .map(|net| accuracy_on_prefix(net, data, samples))
            .collect()
    }

    /// Index of the first individual with the highest full-dataset accuracy.
    pub fn fittest(&self, data: &Dataset) -> Result<(usize, f64)> {
        if self.networks.is_empty() {
            return Err(Error::InvalidParam("population is empty".to_owned()));
        }
        let fitness = self.evaluate(data, 0)?;
        let mut best = (0, f64::NEG_INFINITY);
        for (i, &f) in fitness.iter().enumerate() {
            if f > best.1 {
                best = (i, f);
            }
        }
        Ok(best)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Summary of one generation's fitness values.
pub struct FitnessStats {
    pub mean: f64,
    /// Population (not sample) standard deviation.
    pub std_dev: f64,
    pub best: f64,
}

impl FitnessStats {
    pub fn from_fitness(fitness: &[f64]) -> Self {
        if fitness.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                best: 0.0,
            };
        }
        let n = fitness.len() as f64;
        let mean = fitness.iter().sum::<f64>() / n;
        let var = fitness.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / n;
        let best = fitness.iter().copied().fold(0.0, f64::max);
        Self {
            mean,
            std_dev: var.sqrt(),
            best,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// 1-based generation number.
    pub generation: usize,
    pub stats: FitnessStats,
    /// Validation accuracy of the fittest individual, when early stopping is active.
    pub validation_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionReport {
    pub generations_run: usize,
    pub stopped_early: bool,
    pub best_validation_accuracy: Option<f64>,
    /// Full-training-set accuracy of the returned network when it came from the final
    /// population rather than an early-stopping snapshot.
    pub final_train_accuracy: Option<f64>,
    pub history: Vec<GenerationReport>,
}

#[derive(Debug, Clone)]
pub struct EvolutionOutcome {
    pub network: Network,
    pub report: EvolutionReport,
}

fn check_datasets(cfg: &EvolutionConfig, train: &Dataset, validation: Option<&Dataset>) -> Result<()> {
    let input_dim = cfg.architecture[0];
    let output_dim = cfg.architecture[cfg.architecture.len() - 1];
    if train.input_dim() != input_dim {
        return Err(Error::InvalidDimensions(format!(
            "train input_dim {} does not match architecture input {input_dim}",
            train.input_dim()
        )));
    }
    if train.num_classes() != output_dim {
        return Err(Error::InvalidDimensions(format!(
            "train has {} classes, architecture outputs {output_dim}",
            train.num_classes()
        )));
    }
    if let Some(val) = validation {
        if val.input_dim() != train.input_dim() {
            return Err(Error::InvalidParam(format!(
                "validation input_dim {} does not match train input_dim {}",
                val.input_dim(),
                train.input_dim()
            )));
        }
    }
    Ok(())
}

/// Evolve a network with the strategies named in `cfg`.
pub fn evolve<R: Rng + ?Sized>(
    cfg: &EvolutionConfig,
    train: &Dataset,
    validation: Option<&Dataset>,
    rng: &mut R,
) -> Result<EvolutionOutcome> {
    evolve_with(cfg, &StandardOperators, train, validation, rng)
}

/// Evolve a network with caller-supplied operators.
pub fn evolve_with<O: Operators, R: Rng + ?Sized>(
    cfg: &EvolutionConfig,
    ops: &O,
    train: &Dataset,
    validation: Option<&Dataset>,
    rng: &mut R,
) -> Result<EvolutionOutcome> {
    cfg.validate()?;
    check_datasets(cfg, train, validation)?;

    let pop_size = cfg.population_size;
    let elite_count = cfg.elitism_count.min(pop_size);
    let mut population = Population::random(cfg, pop_size, rng)?;
    if cfg.logging {
        info!(
            "Created initial population of {} networks, evolving for {} generations",
            pop_size, cfg.generations
        );
    }

    let mut tracker = match (cfg.early_stopping, validation) {
        (Some(es), Some(_)) if es.is_enabled() => Some(EarlyStoppingTracker::new(es)),
        _ => None,
    };
    let mut history = Vec::with_capacity(cfg.generations);
    let mut stopped_early = false;

    for generation in 0..cfg.generations {
        let fitness = population.evaluate(train, cfg.fitness_samples)?;
        let stats = FitnessStats::from_fitness(&fitness);
        if cfg.logging {
            info!(
                "Generation {}/{} | best accuracy: {:.2}% | mean fitness: {:.4} | fitness std-dev: {:.4}",
                generation + 1,
                cfg.generations,
                stats.best * 100.0,
                stats.mean,
                stats.std_dev
            );
        }

        let mut ranked: Vec<NetworkFitness<'_>> = population
            .networks()
            .iter()
            .zip(&fitness)
            .map(|(net, &f)| NetworkFitness::new(net, f))
            .collect();

        let mut report = GenerationReport {
            generation: generation + 1,
            stats,
            validation_accuracy: None,
        };
        let mut stop = false;
        if let (Some(tracker), Some(val)) = (tracker.as_mut(), validation) {
            sort_by_fitness_desc(&mut ranked);
            let leader = ranked[0].network;
            let val_acc = accuracy(leader, val)?;
            if cfg.logging {
                info!("Validation accuracy: {:.2}%", val_acc * 100.0);
            }
            report.validation_accuracy = Some(val_acc);
            stop = tracker.observe(val_acc, leader);
            if stop && cfg.logging {
                info!(
                    "Early stopping triggered after {} generations without improvement",
                    tracker.rounds_without_improvement()
                );
            }
        }
        history.push(report);
        if stop {
            stopped_early = true;
            break;
        }

        let pool = ops.select(&mut ranked, cfg, rng)?;
        if pool.is_empty() {
            return Err(Error::InvalidParam("selection produced an empty pool".to_owned()));
        }

        let mut next = Vec::with_capacity(pop_size);
        for _ in 0..pop_size - elite_count {
            let a = tournament_pick(&pool, cfg.tournament_size, rng)?;
            let b = tournament_pick(&pool, cfg.tournament_size, rng)?;
            next.push(ops.crossover(pool[a].network, pool[b].network, cfg, rng)?);
        }

        let ctx = MutationContext {
            rate: cfg.mutation_rate,
            chance: cfg.mutation_chance,
            generation,
            max_generations: cfg.generations,
            fitness_std_dev: stats.std_dev,
        };
        for child in &mut next {
            ops.mutate(child, &ctx, cfg, rng)?;
        }

        if elite_count > 0 {
            sort_by_fitness_desc(&mut ranked);
            next.extend(ranked[..elite_count].iter().map(|nf| nf.network.clone()));
        }

        population = Population::from_networks(next);
    }

    let best_validation_accuracy = tracker.as_ref().map(EarlyStoppingTracker::best_score);
    let (network, final_train_accuracy) =
        match tracker.and_then(EarlyStoppingTracker::into_snapshot) {
            Some(snapshot) => {
                if cfg.logging {
                    info!(
                        "Evolution finished, returning early-stopping snapshot with validation accuracy {:.2}%",
                        best_validation_accuracy.unwrap_or(0.0) * 100.0
                    );
                }
                (snapshot, None)
            }
            None => {
                let (idx, acc) = population.fittest(train)?;
                if cfg.logging {
                    info!(
                        "Evolution finished, best network has train accuracy {:.2}%",
                        acc * 100.0
                    );
                }
                let mut networks = population.into_networks();
                (networks.swap_remove(idx), Some(acc))
            }
        };

    Ok(EvolutionOutcome {
        network,
        report: EvolutionReport {
            generations_run: history.len(),
            stopped_early,
            best_validation_accuracy,
            final_train_accuracy,
            history,
        },
    })
}

/// Evolve and return only the resulting network.
pub fn train_genetic<R: Rng + ?Sized>(
    cfg: &EvolutionConfig,
    train: &Dataset,
    validation: Option<&Dataset>,
    rng: &mut R,
) -> Result<Network> {
    evolve(cfg, train, validation, rng).map(|outcome| outcome.network)
}

/// [`train_genetic`] with a deterministic seed.
pub fn train_genetic_with_seed(
    cfg: &EvolutionConfig,
    train: &Dataset,
    validation: Option<&Dataset>,
    seed: u64,
) -> Result<Network> {
    let mut rng = StdRng::seed_from_u64(seed);
    train_genetic(cfg, train, validation, &mut rng)
}
