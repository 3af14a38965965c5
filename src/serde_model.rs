//! JSON model format (feature: `serde`).
//!
//! A versioned, self-describing alternative to the binary format in [`crate::persist`].
//! Internal types are not serialized directly so the file layout can stay fixed while
//! `Network`/`Layer` change. Loading validates the version, every shape and that all
//! parameters are finite. Optimizer state is not stored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Activation, Error, Layer, Matrix, Network, Result};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNetwork {
    pub format_version: u32,
    pub architecture: Vec<usize>,
    pub hidden_activation: SerializedActivation,
    pub output_activation: SerializedActivation,
    pub layers: Vec<SerializedLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLayer {
    /// Row-major `(in_dim, out_dim)`.
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializedActivation {
    Sigmoid,
    Relu,
    LeakyRelu,
    Linear,
}

impl From<Activation> for SerializedActivation {
    fn from(value: Activation) -> Self {
        match value {
            Activation::Sigmoid => SerializedActivation::Sigmoid,
            Activation::ReLU => SerializedActivation::Relu,
            Activation::LeakyReLU => SerializedActivation::LeakyRelu,
            Activation::Linear => SerializedActivation::Linear,
        }
    }
}

impl From<SerializedActivation> for Activation {
    fn from(value: SerializedActivation) -> Self {
        match value {
            SerializedActivation::Sigmoid => Activation::Sigmoid,
            SerializedActivation::Relu => Activation::ReLU,
            SerializedActivation::LeakyRelu => Activation::LeakyReLU,
            SerializedActivation::Linear => Activation::Linear,
        }
    }
}

impl SerializedNetwork {
    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::InvalidFileFormat(format!(
                "unsupported model format_version {}; expected {}",
                self.format_version, MODEL_FORMAT_VERSION
            )));
        }
        if self.architecture.len() < 2 {
            return Err(Error::InvalidFileFormat(format!(
                "architecture needs at least 2 layers, got {}",
                self.architecture.len()
            )));
        }
        if let Some(pos) = self.architecture.iter().position(|&n| n == 0) {
            return Err(Error::InvalidFileFormat(format!(
                "layer {pos} has zero neurons"
            )));
        }
        if self.layers.len() != self.architecture.len() - 1 {
            return Err(Error::InvalidFileFormat(format!(
                "{} layers do not match architecture {:?}",
                self.layers.len(),
                self.architecture
            )));
        }

        for (i, (layer, dims)) in self.layers.iter().zip(self.architecture.windows(2)).enumerate() {
            let (in_dim, out_dim) = (dims[0], dims[1]);
            let expected_w = in_dim
                .checked_mul(out_dim)
                .ok_or_else(|| Error::InvalidFileFormat("layer weight shape overflow".to_owned()))?;
            if layer.weights.len() != expected_w {
                return Err(Error::InvalidFileFormat(format!(
                    "layer {i}: weights length {} does not match {in_dim} * {out_dim}",
                    layer.weights.len()
                )));
            }
            if layer.biases.len() != out_dim {
                return Err(Error::InvalidFileFormat(format!(
                    "layer {i}: biases length {} does not match {out_dim}",
                    layer.biases.len()
                )));
            }
            if layer
                .weights
                .iter()
                .chain(&layer.biases)
                .any(|v| !v.is_finite())
            {
                return Err(Error::InvalidFileFormat(format!(
                    "layer {i}: parameters must be finite"
                )));
            }
        }
        Ok(())
    }
}

impl From<&Network> for SerializedNetwork {
    fn from(net: &Network) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            architecture: net.architecture().to_vec(),
            hidden_activation: net.hidden_activation().into(),
            output_activation: net.output_activation().into(),
            layers: net
                .layers()
                .iter()
                .map(|l| SerializedLayer {
                    weights: l.weights().as_slice().to_vec(),
                    biases: l.biases().as_slice().to_vec(),
                })
                .collect(),
        }
    }
}

impl TryFrom<SerializedNetwork> for Network {
    type Error = Error;

    fn try_from(value: SerializedNetwork) -> std::result::Result<Self, Self::Error> {
        value.validate()?;

        let mut layers = Vec::with_capacity(value.layers.len());
        for (layer, dims) in value.layers.into_iter().zip(value.architecture.windows(2)) {
            let weights = Matrix::from_vec(dims[0], dims[1], layer.weights)?;
            let biases = Matrix::from_vec(1, dims[1], layer.biases)?;
            layers.push(Layer::from_parts(weights, biases)?);
        }
        Network::from_layers(
            layers,
            value.hidden_activation.into(),
            value.output_activation.into(),
        )
    }
}

impl Network {
    /// Serialize the model to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&SerializedNetwork::from(self))
            .map_err(|e| Error::InvalidFileFormat(format!("failed to serialize model: {e}")))
    }

    /// Serialize the model to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(&SerializedNetwork::from(self))
            .map_err(|e| Error::InvalidFileFormat(format!("failed to serialize model: {e}")))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedNetwork = serde_json::from_str(s)
            .map_err(|e| Error::InvalidFileFormat(format!("failed to parse model json: {e}")))?;
        ser.try_into()
    }

    /// Save the model as pretty-printed JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        std::fs::write(path, s).map_err(Error::FileWrite)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p).map_err(|source| Error::FileOpen {
            path: p.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&s)
    }
}
