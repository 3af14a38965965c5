//! One dense layer boundary: a weight matrix and a bias row.

use rand::Rng;

use crate::{Error, Matrix, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Shape `(in_dim, out_dim)`; an input row multiplies from the left.
    weights: Matrix,
    /// Shape `(1, out_dim)`.
    biases: Matrix,
}

impl Layer {
    /// Zero-initialized layer.
    pub fn new(in_dim: usize, out_dim: usize) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidArchitecture(format!(
                "layer dimensions must be > 0, got {in_dim}x{out_dim}"
            )));
        }
        Ok(Self {
            weights: Matrix::zeros(in_dim, out_dim)?,
            biases: Matrix::zeros(1, out_dim)?,
        })
    }

    /// Build from a `(in_dim, out_dim)` weight matrix and a `(1, out_dim)` bias row.
    pub fn from_parts(weights: Matrix, biases: Matrix) -> Result<Self> {
        if biases.rows() != 1 || biases.cols() != weights.cols() {
            return Err(Error::InvalidDimensions(format!(
                "bias must be 1x{}, got {}x{}",
                weights.cols(),
                biases.rows(),
                biases.cols()
            )));
        }
        Ok(Self { weights, biases })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.weights.rows()
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.weights.cols()
    }

    #[inline]
    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    #[inline]
    pub fn weights_mut(&mut self) -> &mut Matrix {
        &mut self.weights
    }

    #[inline]
    pub fn biases(&self) -> &Matrix {
        &self.biases
    }

    #[inline]
    pub fn biases_mut(&mut self) -> &mut Matrix {
        &mut self.biases
    }

    #[inline]
    pub fn num_params(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Parameters in flattened order: weights row-major, then biases.
    pub fn params(&self) -> impl Iterator<Item = f64> + '_ {
        self.weights
            .as_slice()
            .iter()
            .chain(self.biases.as_slice())
            .copied()
    }

    pub fn params_mut(&mut self) -> impl Iterator<Item = &mut f64> + '_ {
        self.weights
            .as_mut_slice()
            .iter_mut()
            .chain(self.biases.as_mut_slice().iter_mut())
    }

    /// Xavier/Glorot uniform init: weights in `[-L, L]` with
    /// `L = sqrt(6 / (in_dim + out_dim))`; biases reset to zero.
    pub fn xavier_init<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let limit = (6.0 / (self.in_dim() + self.out_dim()) as f64).sqrt();
        for w in self.weights.as_mut_slice() {
            let u: f64 = rng.gen();
            *w = u * 2.0 * limit - limit;
        }
        self.biases.fill(0.0);
    }

    /// `z = inputs * W + b` for a batch of input rows.
    pub fn pre_activation(&self, inputs: &Matrix) -> Result<Matrix> {
        let mut z = inputs.dot(&self.weights)?;
        z.add_bias(&self.biases)?;
        Ok(z)
    }

    /// Overwrite parameters with those of a layer of the same shape.
    pub fn copy_params_from(&mut self, other: &Layer) -> Result<()> {
        self.weights.copy_from(&other.weights)?;
        self.biases.copy_from(&other.biases)
    }
}
