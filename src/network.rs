//! Core network type.
//!
//! A `Network` is a stack of dense layers. `architecture[i]` is the width of layer
//! boundary `i`, so an architecture of length `n` owns `n - 1` weight/bias pairs.
//! Hidden layers share one activation; the last layer uses the output activation.
//!
//! Optimizer moments live on the network (`optimizer_state`) and are allocated lazily
//! by [`Network::init_optimizer_state`]. Networks produced purely by evolution never
//! carry them.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Activation, Error, Layer, Matrix, OptimizerState, Result};

#[derive(Debug, Clone)]
pub struct Network {
    architecture: Vec<usize>,
    layers: Vec<Layer>,
    hidden_activation: Activation,
    output_activation: Activation,
    optimizer_state: Option<OptimizerState>,
}

/// Per-layer tensors recorded by [`Network::forward_trace`].
///
/// `activations[0]` is a copy of the input; `activations[i + 1]` is the output of
/// layer `i`, and `pre_activations[i]` is its value before the activation function.
#[derive(Debug, Clone)]
pub struct ForwardTrace {
    pub activations: Vec<Matrix>,
    pub pre_activations: Vec<Matrix>,
}

impl ForwardTrace {
    /// Final network output.
    pub fn output(&self) -> &Matrix {
        // `activations` always holds at least the input and one layer output.
        &self.activations[self.activations.len() - 1]
    }
}

fn validate_architecture(architecture: &[usize]) -> Result<()> {
    if architecture.len() < 2 {
        return Err(Error::InvalidArchitecture(format!(
            "need at least 2 layers (input and output), got {}",
            architecture.len()
        )));
    }
    if let Some(pos) = architecture.iter().position(|&n| n == 0) {
        return Err(Error::InvalidArchitecture(format!(
            "layer {pos} has zero neurons"
        )));
    }
    Ok(())
}

impl Network {
    /// Allocate a zero-initialized network.
    pub fn new(
        architecture: &[usize],
        hidden_activation: Activation,
        output_activation: Activation,
    ) -> Result<Self> {
        validate_architecture(architecture)?;

        let mut layers = Vec::new();
        layers
            .try_reserve_exact(architecture.len() - 1)
            .map_err(|e| Error::AllocFailed(format!("layer list: {e}")))?;
        for w in architecture.windows(2) {
            layers.push(Layer::new(w[0], w[1])?);
        }

        Ok(Self {
            architecture: architecture.to_vec(),
            layers,
            hidden_activation,
            output_activation,
            optimizer_state: None,
        })
    }

    /// Allocate and Xavier-initialize using a deterministic seed.
    pub fn new_with_seed(
        architecture: &[usize],
        hidden_activation: Activation,
        output_activation: Activation,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(architecture, hidden_activation, output_activation, &mut rng)
    }

    /// Allocate and Xavier-initialize using the provided RNG.
    pub fn new_with_rng<R: Rng + ?Sized>(
        architecture: &[usize],
        hidden_activation: Activation,
        output_activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        let mut net = Self::new(architecture, hidden_activation, output_activation)?;
        net.xavier_init(rng);
        Ok(net)
    }

    /// Assemble a network from existing layers. Adjacent layers must agree on width.
    pub fn from_layers(
        layers: Vec<Layer>,
        hidden_activation: Activation,
        output_activation: Activation,
    ) -> Result<Self> {
        let first = layers.first().ok_or_else(|| {
            Error::InvalidArchitecture("need at least 2 layers (input and output), got 1".into())
        })?;

        let mut architecture = Vec::with_capacity(layers.len() + 1);
        architecture.push(first.in_dim());
        for (i, layer) in layers.iter().enumerate() {
            if layer.in_dim() != architecture[i] {
                return Err(Error::InvalidDimensions(format!(
                    "layer {i} expects {} inputs but previous layer produces {}",
                    layer.in_dim(),
                    architecture[i]
                )));
            }
            architecture.push(layer.out_dim());
        }

        Ok(Self {
            architecture,
            layers,
            hidden_activation,
            output_activation,
            optimizer_state: None,
        })
    }

    /// Re-draw every weight with Xavier/Glorot uniform init and zero the biases.
    pub fn xavier_init<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for layer in &mut self.layers {
            layer.xavier_init(rng);
        }
    }

    #[inline]
    pub fn architecture(&self) -> &[usize] {
        &self.architecture
    }

    /// Number of layer boundaries (entries in `architecture`).
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.architecture.len()
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.architecture[0]
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.architecture[self.architecture.len() - 1]
    }

    #[inline]
    pub fn hidden_activation(&self) -> Activation {
        self.hidden_activation
    }

    #[inline]
    pub fn output_activation(&self) -> Activation {
        self.output_activation
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut Layer> {
        self.layers.get_mut(idx)
    }

    #[inline]
    pub fn optimizer_state(&self) -> Option<&OptimizerState> {
        self.optimizer_state.as_ref()
    }

    /// Total number of trainable scalars.
    pub fn num_params(&self) -> usize {
        self.layers.iter().map(Layer::num_params).sum()
    }

    /// All parameters in flattened order (per layer: weights row-major, then biases).
    pub fn params(&self) -> impl Iterator<Item = f64> + '_ {
        self.layers.iter().flat_map(|l| l.params())
    }

    pub fn params_mut(&mut self) -> impl Iterator<Item = &mut f64> + '_ {
        self.layers.iter_mut().flat_map(|l| l.params_mut())
    }

    /// Allocate zeroed optimizer moments if they are not present yet.
    pub fn init_optimizer_state(&mut self) -> Result<()> {
        if self.optimizer_state.is_none() {
            self.optimizer_state = Some(OptimizerState::zeros_like(&self.layers)?);
        }
        Ok(())
    }

    /// Drop optimizer moments (e.g. for a child produced by crossover).
    pub fn clear_optimizer_state(&mut self) {
        self.optimizer_state = None;
    }

    /// Split borrow used by optimizer steps.
    pub(crate) fn layers_and_state_mut(&mut self) -> (&mut [Layer], Option<&mut OptimizerState>) {
        (&mut self.layers, self.optimizer_state.as_mut())
    }

    /// Overwrite weights and biases with those of `other`. Optimizer state is untouched.
    pub fn copy_params_from(&mut self, other: &Network) -> Result<()> {
        if self.architecture != other.architecture {
            return Err(Error::InvalidDimensions(format!(
                "architecture {:?} does not match {:?}",
                other.architecture, self.architecture
            )));
        }
        for (dst, src) in self.layers.iter_mut().zip(&other.layers) {
            dst.copy_params_from(src)?;
        }
        Ok(())
    }

    #[inline]
    fn activation_for(&self, layer_idx: usize) -> Activation {
        if layer_idx + 1 == self.layers.len() {
            self.output_activation
        } else {
            self.hidden_activation
        }
    }

    fn check_input(&self, input: &Matrix) -> Result<()> {
        if input.cols() != self.input_dim() {
            return Err(Error::InvalidDimensions(format!(
                "input has {} columns, network expects {}",
                input.cols(),
                self.input_dim()
            )));
        }
        Ok(())
    }

    /// Forward pass for one or more input rows. Returns the output-layer activations.
    pub fn forward(&self, input: &Matrix) -> Result<Matrix> {
        self.check_input(input)?;

        let mut current = input.try_clone()?;
        for (idx, layer) in self.layers.iter().enumerate() {
            let mut z = layer.pre_activation(&current)?;
            self.activation_for(idx).apply_inplace(&mut z);
            current = z;
        }
        Ok(current)
    }

    /// Forward pass that keeps every layer's pre-activation and activation.
    pub fn forward_trace(&self, input: &Matrix) -> Result<ForwardTrace> {
        self.check_input(input)?;

        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        activations.push(input.try_clone()?);

        for (idx, layer) in self.layers.iter().enumerate() {
            let z = layer.pre_activation(&activations[idx])?;
            let mut a = z.try_clone()?;
            self.activation_for(idx).apply_inplace(&mut a);
            pre_activations.push(z);
            activations.push(a);
        }

        Ok(ForwardTrace {
            activations,
            pre_activations,
        })
    }

    /// Predicted class index (argmax of the output) for one flat input vector.
    pub fn predict(&self, input: &[f64]) -> Result<usize> {
        if input.len() != self.input_dim() {
            return Err(Error::InvalidDimensions(format!(
                "input len {} does not match network input_dim {}",
                input.len(),
                self.input_dim()
            )));
        }
        let x = Matrix::from_slice(1, input.len(), input)?;
        let y = self.forward(&x)?;
        Ok(crate::metrics::argmax(y.as_slice()))
    }
}
