//! Optimizers.
//!
//! An `Optimizer` applies one update to a network's parameters from gradients that
//! were summed over a mini-batch. Every rule first divides the accumulated gradient by
//! the batch size.
//!
//! Design notes:
//! - Moment estimates live on the network (`Network::optimizer_state`) so a snapshot
//!   clone carries them along.
//! - RMSProp and Adam require that state; calling them without it is an error.
//! - The Adam step counter `t` is owned by the training loop and counts batches over
//!   the whole run.

use crate::{Error, Gradients, Layer, Matrix, Network, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Optimizer choice for training.
pub enum Optimizer {
    /// Plain gradient step.
    #[default]
    Sgd,
    /// RMS-normalized step.
    RmsProp { beta2: f64, eps: f64 },
    /// Adam (bias-corrected).
    Adam { beta1: f64, beta2: f64, eps: f64 },
}

impl Optimizer {
    /// Adam with the usual hyperparameters (0.9, 0.999, 1e-8).
    pub const ADAM: Optimizer = Optimizer::Adam {
        beta1: 0.9,
        beta2: 0.999,
        eps: 1e-8,
    };

    /// RMSProp with beta2 = 0.999 and eps = 1e-8.
    pub const RMSPROP: Optimizer = Optimizer::RmsProp {
        beta2: 0.999,
        eps: 1e-8,
    };

    /// Validate optimizer hyperparameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Optimizer::Sgd => Ok(()),
            Optimizer::RmsProp { beta2, eps } => {
                check_beta("rmsprop beta2", beta2)?;
                check_eps("rmsprop eps", eps)
            }
            Optimizer::Adam { beta1, beta2, eps } => {
                check_beta("adam beta1", beta1)?;
                check_beta("adam beta2", beta2)?;
                check_eps("adam eps", eps)
            }
        }
    }

    #[inline]
    pub fn needs_state(self) -> bool {
        !matches!(self, Optimizer::Sgd)
    }

    /// Apply one update to `net`.
    ///
    /// `grads` holds gradients summed over `batch_size` samples. `t` is the 1-based
    /// batch counter (used by Adam only).
    pub fn step(
        self,
        net: &mut Network,
        grads: &Gradients,
        lr: f64,
        batch_size: usize,
        t: u64,
    ) -> Result<()> {
        if !(lr.is_finite() && lr > 0.0) {
            return Err(Error::InvalidParam(format!(
                "learning rate must be finite and > 0, got {lr}"
            )));
        }
        if batch_size == 0 {
            return Err(Error::InvalidParam("batch_size must be > 0".to_owned()));
        }
        if grads.num_layers() != net.layers().len() {
            return Err(Error::InvalidDimensions(format!(
                "gradients cover {} layers, network has {}",
                grads.num_layers(),
                net.layers().len()
            )));
        }
        let inv_batch = 1.0 / batch_size as f64;

        let (layers, state) = net.layers_and_state_mut();
        match self {
            Optimizer::Sgd => {
                let lr_batch = lr * inv_batch;
                for (idx, layer) in layers.iter_mut().enumerate() {
                    sgd_update(layer.weights_mut(), grads.d_weights(idx), lr_batch);
                    sgd_update(layer.biases_mut(), grads.d_biases(idx), lr_batch);
                }
            }
            Optimizer::RmsProp { beta2, eps } => {
                let state = state.ok_or_else(|| {
                    Error::NullArgument("rmsprop requires initialized optimizer state".to_owned())
                })?;
                for (idx, layer) in layers.iter_mut().enumerate() {
                    let rms = RmsProp {
                        lr,
                        beta2,
                        eps,
                        inv_batch,
                    };
                    rms.update(
                        layer.weights_mut(),
                        &mut state.v_weights[idx],
                        grads.d_weights(idx),
                    );
                    rms.update(
                        layer.biases_mut(),
                        &mut state.v_biases[idx],
                        grads.d_biases(idx),
                    );
                }
            }
            Optimizer::Adam { beta1, beta2, eps } => {
                let state = state.ok_or_else(|| {
                    Error::NullArgument("adam requires initialized optimizer state".to_owned())
                })?;
                if t == 0 {
                    return Err(Error::InvalidParam(
                        "adam step counter must start at 1".to_owned(),
                    ));
                }
                let t = i32::try_from(t).unwrap_or(i32::MAX);
                let adam = Adam {
                    lr,
                    beta1,
                    beta2,
                    eps,
                    inv_batch,
                    corr1: 1.0 - beta1.powi(t),
                    corr2: 1.0 - beta2.powi(t),
                };
                for (idx, layer) in layers.iter_mut().enumerate() {
                    adam.update(
                        layer.weights_mut(),
                        &mut state.m_weights[idx],
                        &mut state.v_weights[idx],
                        grads.d_weights(idx),
                    );
                    adam.update(
                        layer.biases_mut(),
                        &mut state.m_biases[idx],
                        &mut state.v_biases[idx],
                        grads.d_biases(idx),
                    );
                }
            }
        }
        Ok(())
    }
}

fn check_beta(name: &str, beta: f64) -> Result<()> {
    if !(beta.is_finite() && (0.0..1.0).contains(&beta)) {
        return Err(Error::InvalidParam(format!(
            "{name} must be finite and in [0,1), got {beta}"
        )));
    }
    Ok(())
}

fn check_eps(name: &str, eps: f64) -> Result<()> {
    if !(eps.is_finite() && eps > 0.0) {
        return Err(Error::InvalidParam(format!(
            "{name} must be finite and > 0, got {eps}"
        )));
    }
    Ok(())
}

#[inline]
fn sgd_update(params: &mut Matrix, grad: &Matrix, lr_batch: f64) {
    for (p, &g) in params.as_mut_slice().iter_mut().zip(grad.as_slice()) {
        *p -= lr_batch * g;
    }
}

struct RmsProp {
    lr: f64,
    beta2: f64,
    eps: f64,
    inv_batch: f64,
}

impl RmsProp {
    #[inline]
    fn update(&self, params: &mut Matrix, v: &mut Matrix, grad: &Matrix) {
        let it = params
            .as_mut_slice()
            .iter_mut()
            .zip(v.as_mut_slice())
            .zip(grad.as_slice());
        for ((p, v), &g) in it {
            let g = g * self.inv_batch;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            *p -= (self.lr / (v.sqrt() + self.eps)) * g;
        }
    }
}

struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    inv_batch: f64,
    corr1: f64,
    corr2: f64,
}

impl Adam {
    #[inline]
    fn update(&self, params: &mut Matrix, m: &mut Matrix, v: &mut Matrix, grad: &Matrix) {
        let it = params
            .as_mut_slice()
            .iter_mut()
            .zip(m.as_mut_slice())
            .zip(v.as_mut_slice())
            .zip(grad.as_slice());
        for (((p, m), v), &g) in it {
            let g = g * self.inv_batch;
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            let m_hat = *m / self.corr1;
            let v_hat = *v / self.corr2;
            *p -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// First and second moment estimates, one matrix per layer for weights and biases.
pub struct OptimizerState {
    pub m_weights: Vec<Matrix>,
    pub v_weights: Vec<Matrix>,
    pub m_biases: Vec<Matrix>,
    pub v_biases: Vec<Matrix>,
}

impl OptimizerState {
    /// Zeroed moments shaped like `layers`.
    pub fn zeros_like(layers: &[Layer]) -> Result<Self> {
        let zeros = |f: fn(&Layer) -> &Matrix| -> Result<Vec<Matrix>> {
            layers
                .iter()
                .map(|l| {
                    let (r, c) = f(l).shape();
                    Matrix::zeros(r, c)
                })
                .collect()
        };
        Ok(Self {
            m_weights: zeros(Layer::weights)?,
            v_weights: zeros(Layer::weights)?,
            m_biases: zeros(Layer::biases)?,
            v_biases: zeros(Layer::biases)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Activation, ErrorCode};

    /// One 2x2 layer with every parameter set to `init`, plus a gradient of `g` on w00.
    fn setup(init: f64, g: f64) -> (Network, Gradients) {
        let mut net = Network::new(&[2, 2], Activation::ReLU, Activation::Sigmoid).unwrap();
        for p in net.params_mut() {
            *p = init;
        }
        let mut grads = Gradients::zeros_like(&net).unwrap();
        grads.d_weights_mut(0)[(0, 0)] = g;
        (net, grads)
    }

    fn w00(net: &Network) -> f64 {
        net.layer(0).unwrap().weights()[(0, 0)]
    }

    #[test]
    fn optimizer_validation_rejects_bad_hyperparams() {
        assert!(Optimizer::Sgd.validate().is_ok());
        assert!(Optimizer::ADAM.validate().is_ok());
        assert!(Optimizer::RMSPROP.validate().is_ok());

        assert!(Optimizer::Adam {
            beta1: 1.0,
            beta2: 0.999,
            eps: 1e-8
        }
        .validate()
        .is_err());
        assert!(Optimizer::Adam {
            beta1: 0.9,
            beta2: -0.1,
            eps: 1e-8
        }
        .validate()
        .is_err());
        assert!(Optimizer::RmsProp {
            beta2: 0.9,
            eps: 0.0
        }
        .validate()
        .is_err());
    }

    #[test]
    fn sgd_divides_learning_rate_by_batch_size() {
        let (mut net, mut grads) = setup(0.5, 0.4);
        grads.d_biases_mut(0)[(0, 1)] = -1.0;

        Optimizer::Sgd.step(&mut net, &grads, 0.1, 2, 1).unwrap();

        assert!((w00(&net) - (0.5 - 0.05 * 0.4)).abs() < 1e-12);
        let b1 = net.layer(0).unwrap().biases()[(0, 1)];
        assert!((b1 - (0.5 + 0.05)).abs() < 1e-12);
        // Zero-gradient entries are unchanged.
        assert_eq!(net.layer(0).unwrap().weights()[(1, 1)], 0.5);
    }

    #[test]
    fn rmsprop_first_step_matches_closed_form() {
        let (mut net, grads) = setup(0.3, 0.1);
        let init = w00(&net);
        net.init_optimizer_state().unwrap();

        let opt = Optimizer::RmsProp {
            beta2: 0.9,
            eps: 1e-8,
        };
        opt.step(&mut net, &grads, 0.01, 1, 1).unwrap();

        // v = (1 - 0.9) * 0.1^2 = 0.001
        let v: f64 = 0.1 * 0.01;
        let expected = init - (0.01 / (v.sqrt() + 1e-8)) * 0.1;
        assert!((w00(&net) - expected).abs() < 1e-6);

        let state = net.optimizer_state().unwrap();
        assert!((state.v_weights[0][(0, 0)] - v).abs() < 1e-12);
    }

    #[test]
    fn adam_first_step_is_roughly_lr_in_gradient_direction() {
        let (mut net, grads) = setup(1.0, 0.2);
        net.init_optimizer_state().unwrap();

        Optimizer::ADAM.step(&mut net, &grads, 0.01, 1, 1).unwrap();

        // t = 1: m_hat = g, v_hat = g^2, update = lr * g / (|g| + eps).
        let g: f64 = 0.2;
        let expected = 1.0 - 0.01 * g / (g.abs() + 1e-8);
        assert!((w00(&net) - expected).abs() < 1e-6);

        let state = net.optimizer_state().unwrap();
        assert!((state.m_weights[0][(0, 0)] - 0.1 * g).abs() < 1e-12);
        assert!((state.v_weights[0][(0, 0)] - 0.001 * g * g).abs() < 1e-12);
    }

    #[test]
    fn adam_second_step_uses_bias_correction_for_t() {
        let (mut net, grads) = setup(0.0, 1.0);
        net.init_optimizer_state().unwrap();

        let (b1, b2, eps, lr) = (0.9f64, 0.999f64, 1e-8, 0.1);
        let opt = Optimizer::Adam {
            beta1: b1,
            beta2: b2,
            eps,
        };
        opt.step(&mut net, &grads, lr, 1, 1).unwrap();
        opt.step(&mut net, &grads, lr, 1, 2).unwrap();

        let mut w = 0.0;
        let (mut m, mut v) = (0.0, 0.0);
        for t in 1..=2 {
            m = b1 * m + (1.0 - b1);
            v = b2 * v + (1.0 - b2);
            let m_hat = m / (1.0 - b1.powi(t));
            let v_hat = v / (1.0 - b2.powi(t));
            w -= lr * m_hat / (v_hat.sqrt() + eps);
        }
        assert!((w00(&net) - w).abs() < 1e-9);
    }

    #[test]
    fn stateful_optimizers_require_state() {
        let (mut net, grads) = setup(0.0, 1.0);
        let err = Optimizer::ADAM.step(&mut net, &grads, 0.1, 1, 1).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NullArgument);
        let err = Optimizer::RMSPROP
            .step(&mut net, &grads, 0.1, 1, 1)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NullArgument);

        // SGD works without state.
        assert!(Optimizer::Sgd.step(&mut net, &grads, 0.1, 1, 1).is_ok());
    }

    #[test]
    fn step_rejects_bad_arguments() {
        let (mut net, grads) = setup(0.0, 1.0);
        net.init_optimizer_state().unwrap();
        assert!(Optimizer::Sgd.step(&mut net, &grads, 0.0, 1, 1).is_err());
        assert!(Optimizer::Sgd.step(&mut net, &grads, 0.1, 0, 1).is_err());
        assert!(Optimizer::ADAM.step(&mut net, &grads, 0.1, 1, 0).is_err());
    }

    #[test]
    fn zeros_like_matches_layer_shapes() {
        let net = Network::new(&[3, 4, 2], Activation::ReLU, Activation::Sigmoid).unwrap();
        let state = OptimizerState::zeros_like(net.layers()).unwrap();
        assert_eq!(state.m_weights[0].shape(), (3, 4));
        assert_eq!(state.v_weights[1].shape(), (4, 2));
        assert_eq!(state.m_biases[1].shape(), (1, 2));
        assert_eq!(state.v_biases[0].shape(), (1, 4));
    }
}
