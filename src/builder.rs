//! Network builder.
//!
//! `NetworkBuilder` makes the layer stack explicit and either produces a complete
//! `Network` or an error; nothing partially built escapes.
//!
//! Hidden layers share one activation (ReLU by default) and the last layer uses the
//! output activation (sigmoid by default).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Activation, Error, Network, Result};

#[derive(Debug, Clone)]
/// Builder for a `Network`.
///
/// Example:
///
/// ```rust
/// use gann::{Activation, NetworkBuilder};
///
/// # fn main() -> gann::Result<()> {
/// let net = NetworkBuilder::new(2)?
///     .layer(8)?
///     .layer(2)?
///     .hidden_activation(Activation::ReLU)
///     .output_activation(Activation::Sigmoid)
///     .build_with_seed(0)?;
/// assert_eq!(net.architecture(), &[2, 8, 2]);
/// # Ok(())
/// # }
/// ```
pub struct NetworkBuilder {
    architecture: Vec<usize>,
    hidden_activation: Activation,
    output_activation: Activation,
}

impl NetworkBuilder {
    /// Start building a network that accepts inputs of length `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidArchitecture(
                "input_dim must be > 0".to_owned(),
            ));
        }
        Ok(Self {
            architecture: vec![input_dim],
            hidden_activation: Activation::ReLU,
            output_activation: Activation::Sigmoid,
        })
    }

    /// Convenience constructor from a full architecture (input and output included).
    pub fn from_architecture(architecture: &[usize]) -> Result<Self> {
        if architecture.len() < 2 {
            return Err(Error::InvalidArchitecture(
                "architecture must include input and output sizes".to_owned(),
            ));
        }

        let mut b = Self::new(architecture[0])?;
        for &size in &architecture[1..] {
            b = b.layer(size)?;
        }
        Ok(b)
    }

    /// Append a dense layer with `size` neurons.
    pub fn layer(mut self, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidArchitecture(
                "layer size must be > 0".to_owned(),
            ));
        }
        self.architecture.push(size);
        Ok(self)
    }

    pub fn hidden_activation(mut self, activation: Activation) -> Self {
        self.hidden_activation = activation;
        self
    }

    pub fn output_activation(mut self, activation: Activation) -> Self {
        self.output_activation = activation;
        self
    }

    /// Build with all parameters set to zero.
    pub fn build_zeroed(self) -> Result<Network> {
        Network::new(
            &self.architecture,
            self.hidden_activation,
            self.output_activation,
        )
    }

    /// Build and Xavier-initialize using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build and Xavier-initialize using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network> {
        let mut net = self.build_zeroed()?;
        net.xavier_init(rng);
        Ok(net)
    }
}
