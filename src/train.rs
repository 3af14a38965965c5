//! Backprop training loop.
//!
//! `Network::fit` iterates the training set in fixed-order mini-batches. Each batch
//! zeroes the gradient accumulators, runs forward/backward per sample, then applies the
//! configured optimizer once with the actual batch size (the last batch may be short).
//! The Adam step counter advances once per batch and is never reset between epochs.

use rand::Rng;
use tracing::{info, warn};

use crate::early_stopping::EarlyStoppingTracker;
use crate::metrics::accuracy;
use crate::{
    Activation, Dataset, EarlyStopping, Error, Gradients, Matrix, Network, Optimizer, Result,
};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Training configuration for [`Network::fit`].
pub struct FitConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub optimizer: Optimizer,
    /// Requires a validation set to take effect.
    pub early_stopping: Option<EarlyStopping>,
    /// Emit per-epoch progress at `info` level.
    pub logging: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            learning_rate: 0.01,
            batch_size: 32,
            optimizer: Optimizer::Sgd,
            early_stopping: None,
            logging: false,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidParam("epochs must be > 0".to_owned()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidParam(format!(
                "learning_rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidParam("batch_size must be > 0".to_owned()));
        }
        self.optimizer.validate()?;
        if let Some(es) = &self.early_stopping {
            es.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Per-epoch summary.
pub struct EpochReport {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Present when logging is enabled.
    pub train_accuracy: Option<f64>,
    /// Present when early stopping is active.
    pub validation_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub epochs_run: usize,
    pub stopped_early: bool,
    /// Best validation accuracy seen, when early stopping was active.
    pub best_validation_accuracy: Option<f64>,
    pub epochs: Vec<EpochReport>,
}

/// Everything needed to create and train a network with backprop.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackpropParams {
    pub architecture: Vec<usize>,
    pub hidden_activation: Activation,
    pub output_activation: Activation,
    pub fit: FitConfig,
}

impl BackpropParams {
    pub fn new(architecture: &[usize]) -> Self {
        Self {
            architecture: architecture.to_vec(),
            hidden_activation: Activation::ReLU,
            output_activation: Activation::Sigmoid,
            fit: FitConfig::default(),
        }
    }
}

fn sample_rows(data: &Dataset, idx: usize) -> Result<(Matrix, Matrix)> {
    Ok((data.images().get_row(idx)?, data.labels().get_row(idx)?))
}

impl Network {
    /// Train with mini-batch backprop.
    ///
    /// If `cfg.early_stopping` is enabled and `validation` is given, validation accuracy
    /// is checked after every epoch; on exit the best snapshot's parameters are copied
    /// back onto `self`.
    ///
    /// Optimizer state is allocated on first use and kept on the network.
    pub fn fit(
        &mut self,
        train: &Dataset,
        validation: Option<&Dataset>,
        cfg: &FitConfig,
    ) -> Result<FitReport> {
        cfg.validate()?;
        if train.input_dim() != self.input_dim() {
            return Err(Error::InvalidDimensions(format!(
                "train input_dim {} does not match network input_dim {}",
                train.input_dim(),
                self.input_dim()
            )));
        }
        if train.num_classes() != self.output_dim() {
            return Err(Error::InvalidDimensions(format!(
                "train has {} classes, network outputs {}",
                train.num_classes(),
                self.output_dim()
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
        if cfg.optimizer.needs_state() {
            self.init_optimizer_state()?;
        }

        let mut tracker = match (cfg.early_stopping, validation) {
            (Some(es), Some(_)) if es.is_enabled() => Some(EarlyStoppingTracker::new(es)),
            _ => None,
        };

        let mut grads = Gradients::zeros_like(self)?;
        let mut reports = Vec::with_capacity(cfg.epochs);
        let mut stopped_early = false;
        let mut t: u64 = 0;

        for epoch in 1..=cfg.epochs {
            for start in (0..train.len()).step_by(cfg.batch_size) {
                let end = (start + cfg.batch_size).min(train.len());
                t += 1;
                grads.zero();

                for idx in start..end {
                    let res = sample_rows(train, idx)
                        .and_then(|(x, y)| grads.accumulate_sample(self, &x, &y));
                    if let Err(err) = res {
                        warn!("skipping training sample {}: {}", idx, err);
                    }
                }

                cfg.optimizer
                    .step(self, &grads, cfg.learning_rate, end - start, t)?;
            }

            let mut report = EpochReport {
                epoch,
                train_accuracy: None,
                validation_accuracy: None,
            };

            if cfg.logging {
                let acc = accuracy(self, train)?;
                info!(
                    "Epoch {}/{}, train accuracy: {:.2}%",
                    epoch,
                    cfg.epochs,
                    acc * 100.0
                );
                report.train_accuracy = Some(acc);
            }

            let mut stop = false;
            if let (Some(tracker), Some(val)) = (tracker.as_mut(), validation) {
                let val_acc = accuracy(self, val)?;
                if cfg.logging {
                    info!("  validation accuracy: {:.2}%", val_acc * 100.0);
                }
                report.validation_accuracy = Some(val_acc);
                stop = tracker.observe(val_acc, self);
                if stop && cfg.logging {
                    info!(
                        "Early stopping triggered after {} epochs without improvement",
                        tracker.rounds_without_improvement()
                    );
                }
            }

            reports.push(report);
            if stop {
                stopped_early = true;
                break;
            }
        }

        let best_validation_accuracy = tracker.as_ref().map(|t| t.best_score());
        if let Some(best) = tracker.and_then(EarlyStoppingTracker::into_snapshot) {
            self.copy_params_from(&best)?;
        }

        Ok(FitReport {
            epochs_run: reports.len(),
            stopped_early,
            best_validation_accuracy,
            epochs: reports,
        })
    }
}

/// Create a network from `params`, Xavier-initialize it, allocate optimizer state and
/// train it with [`Network::fit`].
pub fn train_with_backprop<R: Rng + ?Sized>(
    params: &BackpropParams,
    train: &Dataset,
    validation: Option<&Dataset>,
    rng: &mut R,
) -> Result<Network> {
    params.fit.validate()?;
    let mut net = Network::new_with_rng(
        &params.architecture,
        params.hidden_activation,
        params.output_activation,
        rng,
    )?;
    net.init_optimizer_state()?;

    if params.fit.logging {
        info!(
            "Starting backprop training: lr {}, epochs {}, batch size {}",
            params.fit.learning_rate, params.fit.epochs, params.fit.batch_size
        );
    }
    let report = net.fit(train, validation, &params.fit)?;
    if params.fit.logging {
        info!(
            "Backprop training finished after {} epochs{}",
            report.epochs_run,
            if report.stopped_early {
                " (stopped early)"
            } else {
                ""
            }
        );
    }
    Ok(net)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::ErrorCode;

    fn xor() -> Dataset {
        Dataset::from_rows(
            &[
                vec![0.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
            ],
            &[
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn fit_validates_config() {
        let mut net =
            Network::new_with_seed(&[2, 4, 2], Activation::ReLU, Activation::Sigmoid, 0).unwrap();
        let data = xor();

        for cfg in [
            FitConfig {
                epochs: 0,
                ..FitConfig::default()
            },
            FitConfig {
                batch_size: 0,
                ..FitConfig::default()
            },
            FitConfig {
                learning_rate: f64::NAN,
                ..FitConfig::default()
            },
        ] {
            let err = net.fit(&data, None, &cfg).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidParam);
        }
    }

    #[test]
    fn fit_rejects_mismatched_validation_width() {
        let mut net =
            Network::new_with_seed(&[2, 4, 2], Activation::ReLU, Activation::Sigmoid, 0).unwrap();
        let val = Dataset::from_rows(&[vec![0.0, 0.0, 0.0]], &[vec![1.0, 0.0]]).unwrap();
        let err = net
            .fit(&xor(), Some(&val), &FitConfig::default())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParam);
    }

    #[test]
    fn fit_reports_every_epoch_and_allocates_state_lazily() {
        let mut net =
            Network::new_with_seed(&[2, 4, 2], Activation::ReLU, Activation::Sigmoid, 1).unwrap();
        assert!(net.optimizer_state().is_none());

        let cfg = FitConfig {
            epochs: 3,
            batch_size: 3,
            optimizer: Optimizer::ADAM,
            logging: true,
            ..FitConfig::default()
        };
        let report = net.fit(&xor(), None, &cfg).unwrap();

        assert_eq!(report.epochs_run, 3);
        assert!(!report.stopped_early);
        assert_eq!(report.best_validation_accuracy, None);
        assert!(report.epochs.iter().all(|e| e.train_accuracy.is_some()));
        assert!(net.optimizer_state().is_some());
    }

    #[test]
    fn sgd_training_reduces_error() {
        let data = xor();
        let mut net =
            Network::new_with_seed(&[2, 8, 2], Activation::ReLU, Activation::Sigmoid, 3).unwrap();
        let before = crate::metrics::mse(&net, &data).unwrap();

        let cfg = FitConfig {
            epochs: 200,
            learning_rate: 0.5,
            batch_size: 4,
            ..FitConfig::default()
        };
        net.fit(&data, None, &cfg).unwrap();

        let after = crate::metrics::mse(&net, &data).unwrap();
        assert!(after < before, "mse went from {before} to {after}");
    }

    #[test]
    fn train_with_backprop_is_deterministic_per_seed() {
        let data = xor();
        let mut params = BackpropParams::new(&[2, 4, 2]);
        params.fit.epochs = 5;
        params.fit.batch_size = 2;
        params.fit.optimizer = Optimizer::ADAM;

        let a = train_with_backprop(&params, &data, None, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = train_with_backprop(&params, &data, None, &mut StdRng::seed_from_u64(11)).unwrap();
        assert!(a.params().eq(b.params()));
        assert!(a.optimizer_state().is_some());
    }
}
