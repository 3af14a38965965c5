//! Small dense feed-forward classifiers trained by evolution or backpropagation.
//!
//! `gann` keeps a whole network in a handful of owned matrices and offers two ways to
//! fit it to a labelled [`Dataset`]:
//!
//! - a genetic algorithm ([`evolve`]) with pluggable [`Selection`], [`Crossover`] and
//!   [`Mutation`] operators, elitism and early stopping;
//! - mini-batch gradient descent ([`Network::fit`]) with SGD, RMSProp or Adam.
//!
//! Trained models can be stored in a compact binary format ([`Network::save`]) or, with
//! the `serde` feature, as versioned JSON.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`.
//! - [`Matrix`] is dense and row-major.
//! - `architecture[i]` is the width of layer boundary `i`; layer `i` owns a weight matrix
//!   of shape `(architecture[i], architecture[i + 1])` and a `(1, architecture[i + 1])`
//!   bias row. Inputs are rows and multiply from the left.
//! - Labels are one-hot rows; the true class is the first column equal to `1.0`.
//!
//! # Quick start
//!
//! ```rust
//! use gann::{Activation, Dataset, FitConfig, NetworkBuilder, Optimizer};
//!
//! # fn main() -> gann::Result<()> {
//! let xs = vec![
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![1.0, 0.0],
//!     vec![1.0, 1.0],
//! ];
//! let ys = vec![
//!     vec![1.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![0.0, 1.0],
//!     vec![1.0, 0.0],
//! ];
//! let train = Dataset::from_rows(&xs, &ys)?;
//!
//! let mut net = NetworkBuilder::new(2)?
//!     .layer(8)?
//!     .layer(2)?
//!     .hidden_activation(Activation::ReLU)
//!     .output_activation(Activation::Sigmoid)
//!     .build_with_seed(0)?;
//!
//! let cfg = FitConfig {
//!     epochs: 100,
//!     learning_rate: 0.05,
//!     batch_size: 1,
//!     optimizer: Optimizer::ADAM,
//!     ..FitConfig::default()
//! };
//! let report = net.fit(&train, None, &cfg)?;
//! assert_eq!(report.epochs_run, 100);
//! # Ok(())
//! # }
//! ```
//!
//! # Evolution
//!
//! ```rust
//! use gann::{Dataset, EvolutionConfig};
//!
//! # fn main() -> gann::Result<()> {
//! let xs = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
//! let ys = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
//! let data = Dataset::from_rows(&xs, &ys)?;
//!
//! let mut cfg = EvolutionConfig::new(&[2, 4, 2]);
//! cfg.population_size = 10;
//! cfg.generations = 5;
//! cfg.logging = false;
//!
//! let net = gann::train_genetic_with_seed(&cfg, &data, None, 7)?;
//! assert_eq!(net.architecture(), &[2, 4, 2]);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod backprop;
pub mod builder;
pub mod crossover;
pub mod data;
pub mod early_stopping;
pub mod error;
pub mod evolution;
pub mod layer;
pub(crate) mod matmul;
pub mod matrix;
pub mod metrics;
pub mod mutation;
pub mod network;
pub mod optim;
pub mod persist;
pub mod selection;
pub mod train;

#[cfg(feature = "serde")]
pub mod serde_model;

pub use activation::Activation;
pub use backprop::Gradients;
pub use builder::NetworkBuilder;
pub use crossover::Crossover;
pub use data::Dataset;
pub use early_stopping::{EarlyStopping, EarlyStoppingTracker};
pub use error::{Error, ErrorCode, Result};
pub use evolution::{
    evolve, evolve_with, train_genetic, train_genetic_with_seed, EvolutionConfig,
    EvolutionOutcome, EvolutionReport, FitnessStats, GenerationReport, Operators, Population,
    StandardOperators,
};
pub use layer::Layer;
pub use matrix::Matrix;
pub use mutation::{Mutation, MutationContext};
pub use network::{ForwardTrace, Network};
pub use optim::{Optimizer, OptimizerState};
pub use selection::{NetworkFitness, Selection};
pub use train::{train_with_backprop, BackpropParams, EpochReport, FitConfig, FitReport};

/// Predicted class (argmax of the output) for one input row.
///
/// Thin wrapper around [`Network::predict`].
pub fn predict(net: &Network, input: &[f64]) -> Result<usize> {
    net.predict(input)
}

/// Fraction of `data` classified correctly.
pub fn evaluate(net: &Network, data: &Dataset) -> Result<f64> {
    metrics::accuracy(net, data)
}
