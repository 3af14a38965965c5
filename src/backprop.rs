//! Backward pass and gradient accumulation.
//!
//! The output-layer error signal is `prediction - target` with no output-activation
//! derivative applied. This is exact for a sigmoid output trained against cross-entropy
//! and an approximation for other pairings; optimizer tests are calibrated against it.
//! Hidden layers use the hidden activation's derivative evaluated at the stored `z`.

use crate::{Error, Matrix, Network, Result};

/// Per-layer gradient accumulators, same shapes as the network's weights and biases.
///
/// Contributions are summed (not averaged) across samples; the optimizer divides by
/// the batch size.
#[derive(Debug, Clone)]
pub struct Gradients {
    d_weights: Vec<Matrix>,
    d_biases: Vec<Matrix>,
}

impl Gradients {
    /// Zeroed accumulators shaped like `net`.
    pub fn zeros_like(net: &Network) -> Result<Self> {
        let mut d_weights = Vec::with_capacity(net.layers().len());
        let mut d_biases = Vec::with_capacity(net.layers().len());
        for layer in net.layers() {
            let (r, c) = layer.weights().shape();
            d_weights.push(Matrix::zeros(r, c)?);
            d_biases.push(Matrix::zeros(1, c)?);
        }
        Ok(Self {
            d_weights,
            d_biases,
        })
    }

    /// Reset every accumulator to zero.
    pub fn zero(&mut self) {
        for m in self.d_weights.iter_mut().chain(self.d_biases.iter_mut()) {
            m.fill(0.0);
        }
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.d_weights.len()
    }

    #[inline]
    pub fn d_weights(&self, layer: usize) -> &Matrix {
        &self.d_weights[layer]
    }

    #[inline]
    pub fn d_weights_mut(&mut self, layer: usize) -> &mut Matrix {
        &mut self.d_weights[layer]
    }

    #[inline]
    pub fn d_biases(&self, layer: usize) -> &Matrix {
        &self.d_biases[layer]
    }

    #[inline]
    pub fn d_biases_mut(&mut self, layer: usize) -> &mut Matrix {
        &mut self.d_biases[layer]
    }

    /// Run forward and backward for one sample and add its gradients.
    ///
    /// `input` is `1 x input_dim` and `target` is `1 x output_dim`. On error nothing
    /// is accumulated.
    pub fn accumulate_sample(
        &mut self,
        net: &Network,
        input: &Matrix,
        target: &Matrix,
    ) -> Result<()> {
        if self.d_weights.len() != net.layers().len() {
            return Err(Error::InvalidDimensions(format!(
                "gradients cover {} layers, network has {}",
                self.d_weights.len(),
                net.layers().len()
            )));
        }

        let sample = sample_gradients(net, input, target)?;

        for (acc, (dw, _)) in self.d_weights.iter_mut().zip(&sample) {
            for (a, &g) in acc.as_mut_slice().iter_mut().zip(dw.as_slice()) {
                *a += g;
            }
        }
        for (acc, (_, db)) in self.d_biases.iter_mut().zip(&sample) {
            for (a, &g) in acc.as_mut_slice().iter_mut().zip(db.as_slice()) {
                *a += g;
            }
        }
        Ok(())
    }
}

/// Gradients of one sample as `(d_weights, d_biases)` per layer, in layer order.
fn sample_gradients(net: &Network, input: &Matrix, target: &Matrix) -> Result<Vec<(Matrix, Matrix)>> {
    let trace = net.forward_trace(input)?;
    let layers = net.layers();
    let n = layers.len();

    let mut grads: Vec<Option<(Matrix, Matrix)>> = vec![None; n];
    let mut delta = trace.output().sub(target)?;

    for l in (0..n).rev() {
        let dw = trace.activations[l].transpose()?.dot(&delta)?;
        let db = delta.column_sums()?;

        if l > 0 {
            let back = delta.dot(&layers[l].weights().transpose()?)?;
            let mut dz = trace.pre_activations[l - 1].try_clone()?;
            net.hidden_activation().derivative_inplace(&mut dz);
            delta = back.hadamard(&dz)?;
        }

        grads[l] = Some((dw, db));
    }

    Ok(grads.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Activation, ErrorCode};

    fn tiny_net() -> Network {
        let mut net = Network::new(&[2, 2, 1], Activation::ReLU, Activation::Sigmoid).unwrap();
        {
            let l0 = net.layer_mut(0).unwrap();
            l0.weights_mut()
                .as_mut_slice()
                .copy_from_slice(&[0.5, -0.5, 0.25, 0.75]);
            l0.biases_mut().as_mut_slice().copy_from_slice(&[0.1, 0.0]);
        }
        {
            let l1 = net.layer_mut(1).unwrap();
            l1.weights_mut().as_mut_slice().copy_from_slice(&[1.0, -1.0]);
            l1.biases_mut().as_mut_slice().copy_from_slice(&[0.0]);
        }
        net
    }

    #[test]
    fn single_layer_gradient_is_outer_product_of_input_and_error() {
        let net = Network::new(&[2, 1], Activation::ReLU, Activation::Linear).unwrap();
        let mut grads = Gradients::zeros_like(&net).unwrap();

        let x = Matrix::from_slice(1, 2, &[2.0, 3.0]).unwrap();
        let t = Matrix::from_slice(1, 1, &[1.0]).unwrap();
        grads.accumulate_sample(&net, &x, &t).unwrap();

        // Zero network predicts 0, so delta = -1.
        assert_eq!(grads.d_weights(0).as_slice(), &[-2.0, -3.0]);
        assert_eq!(grads.d_biases(0).as_slice(), &[-1.0]);
    }

    #[test]
    fn hidden_layer_gradients_follow_chain_rule() {
        let net = tiny_net();
        let mut grads = Gradients::zeros_like(&net).unwrap();

        let x = Matrix::from_slice(1, 2, &[1.0, 2.0]).unwrap();
        let t = Matrix::from_slice(1, 1, &[1.0]).unwrap();
        grads.accumulate_sample(&net, &x, &t).unwrap();

        // z0 = [0.5 + 0.5 + 0.1, -0.5 + 1.5] = [1.1, 1.0]; relu keeps both.
        // z1 = 1.1 - 1.0 = 0.1; y = sigmoid(0.1).
        let y = 1.0 / (1.0 + (-0.1f64).exp());
        let d_out = y - 1.0;

        let dw1 = grads.d_weights(1).as_slice();
        assert!((dw1[0] - 1.1 * d_out).abs() < 1e-12);
        assert!((dw1[1] - 1.0 * d_out).abs() < 1e-12);
        assert!((grads.d_biases(1)[(0, 0)] - d_out).abs() < 1e-12);

        // delta0 = d_out * [1, -1] (relu' = 1 on both units).
        let dw0 = grads.d_weights(0).as_slice();
        let expected = [d_out, -d_out, 2.0 * d_out, -2.0 * d_out];
        for (got, want) in dw0.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "got {got} want {want}");
        }
        let db0 = grads.d_biases(0).as_slice();
        assert!((db0[0] - d_out).abs() < 1e-12);
        assert!((db0[1] + d_out).abs() < 1e-12);
    }

    #[test]
    fn accumulation_sums_and_zero_resets() {
        let net = tiny_net();
        let mut once = Gradients::zeros_like(&net).unwrap();
        let mut twice = Gradients::zeros_like(&net).unwrap();

        let x = Matrix::from_slice(1, 2, &[0.3, -0.7]).unwrap();
        let t = Matrix::from_slice(1, 1, &[0.0]).unwrap();
        once.accumulate_sample(&net, &x, &t).unwrap();
        twice.accumulate_sample(&net, &x, &t).unwrap();
        twice.accumulate_sample(&net, &x, &t).unwrap();

        for l in 0..2 {
            for (a, b) in once
                .d_weights(l)
                .as_slice()
                .iter()
                .zip(twice.d_weights(l).as_slice())
            {
                assert!((2.0 * a - b).abs() < 1e-12);
            }
        }

        twice.zero();
        assert!(twice.d_weights(0).as_slice().iter().all(|&v| v == 0.0));
        assert!(twice.d_biases(1).as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn bad_sample_leaves_accumulators_untouched() {
        let net = tiny_net();
        let mut grads = Gradients::zeros_like(&net).unwrap();

        let x = Matrix::from_slice(1, 2, &[1.0, 1.0]).unwrap();
        let wrong_target = Matrix::from_slice(1, 2, &[1.0, 0.0]).unwrap();
        let err = grads.accumulate_sample(&net, &x, &wrong_target).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDimensions);
        assert!(grads.d_weights(0).as_slice().iter().all(|&v| v == 0.0));
    }
}
