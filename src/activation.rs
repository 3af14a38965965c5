//! Activation functions.
//!
//! A dense layer computes a pre-activation value `z = x W + b` and then applies an
//! activation function element-wise: `y = activation(z)`.
//!
//! Derivatives are evaluated on the pre-activation `z`, so the backward pass keeps
//! both `z` and `y` for every layer (see `ForwardTrace`).

use crate::Matrix;

/// Slope of [`Activation::LeakyReLU`] for negative inputs.
pub const LEAKY_RELU_SLOPE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Element-wise activation function.
pub enum Activation {
    Sigmoid,
    ReLU,
    LeakyReLU,
    Linear,
}

impl Activation {
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid(x),
            Activation::ReLU => x.max(0.0),
            Activation::LeakyReLU => {
                if x > 0.0 {
                    x
                } else {
                    LEAKY_RELU_SLOPE * x
                }
            }
            Activation::Linear => x,
        }
    }

    /// Derivative with respect to the pre-activation input `z`.
    #[inline]
    pub fn derivative(self, z: f64) -> f64 {
        match self {
            Activation::Sigmoid => {
                let s = sigmoid(z);
                s * (1.0 - s)
            }
            Activation::ReLU => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyReLU => {
                if z > 0.0 {
                    1.0
                } else {
                    LEAKY_RELU_SLOPE
                }
            }
            Activation::Linear => 1.0,
        }
    }

    pub fn apply_inplace(self, m: &mut Matrix) {
        if self != Activation::Linear {
            m.map_inplace(|v| self.apply(v));
        }
    }

    /// Replace every pre-activation value with the derivative at that point.
    pub fn derivative_inplace(self, m: &mut Matrix) {
        m.map_inplace(|z| self.derivative(z));
    }

    /// Integer tag used by the binary model format.
    pub fn code(self) -> i32 {
        match self {
            Activation::Sigmoid => 0,
            Activation::ReLU => 1,
            Activation::LeakyReLU => 2,
            Activation::Linear => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Activation::Sigmoid),
            1 => Some(Activation::ReLU),
            2 => Some(Activation::LeakyReLU),
            3 => Some(Activation::Linear),
            _ => None,
        }
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}
