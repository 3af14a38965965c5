//! Binary model format.
//!
//! Layout (all little-endian):
//!
//! ```text
//! i32 num_layers
//! i32 hidden activation code
//! i32 output activation code
//! i32 architecture[num_layers]
//! per layer boundary:
//!     f64 weights, row-major (architecture[i] rows of architecture[i+1] values)
//!     f64 biases (architecture[i+1] values)
//! ```
//!
//! Activation codes: sigmoid = 0, relu = 1, leaky relu = 2, linear = 3.
//! Optimizer state is not stored.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::{Activation, Error, Network, Result};

fn write_i32<W: Write>(w: &mut W, v: i32) -> Result<()> {
    w.write_all(&v.to_le_bytes()).map_err(Error::FileWrite)
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(Error::FileRead)?;
    Ok(i32::from_le_bytes(buf))
}

fn write_f64s<W: Write>(w: &mut W, values: &[f64]) -> Result<()> {
    for v in values {
        w.write_all(&v.to_le_bytes()).map_err(Error::FileWrite)?;
    }
    Ok(())
}

fn read_f64s<R: Read>(r: &mut R, out: &mut [f64]) -> Result<()> {
    let mut buf = [0u8; 8];
    for v in out {
        r.read_exact(&mut buf).map_err(Error::FileRead)?;
        *v = f64::from_le_bytes(buf);
    }
    Ok(())
}

fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| Error::InvalidParam(format!("{what} {value} does not fit the model format")))
}

fn activation_from_code(code: i32) -> Result<Activation> {
    Activation::from_code(code)
        .ok_or_else(|| Error::InvalidFileFormat(format!("unknown activation code {code}")))
}

impl Network {
    /// Write the model in the binary format.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        write_i32(w, to_i32(self.num_layers(), "layer count")?)?;
        write_i32(w, self.hidden_activation().code())?;
        write_i32(w, self.output_activation().code())?;
        for &n in self.architecture() {
            write_i32(w, to_i32(n, "layer size")?)?;
        }
        for layer in self.layers() {
            write_f64s(w, layer.weights().as_slice())?;
            write_f64s(w, layer.biases().as_slice())?;
        }
        Ok(())
    }

    /// Read a model in the binary format. Nothing is returned unless every value was read.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Network> {
        let num_layers = read_i32(r)?;
        let hidden = read_i32(r)?;
        let output = read_i32(r)?;

        if num_layers < 2 {
            return Err(Error::InvalidFileFormat(format!(
                "layer count must be >= 2, got {num_layers}"
            )));
        }
        let hidden = activation_from_code(hidden)?;
        let output = activation_from_code(output)?;

        let num_layers = num_layers as usize;
        let mut architecture = Vec::new();
        architecture
            .try_reserve_exact(num_layers)
            .map_err(|e| Error::AllocFailed(format!("architecture of {num_layers}: {e}")))?;
        for i in 0..num_layers {
            let n = read_i32(r)?;
            if n <= 0 {
                return Err(Error::InvalidFileFormat(format!(
                    "layer {i} has non-positive size {n}"
                )));
            }
            architecture.push(n as usize);
        }

        let mut net = Network::new(&architecture, hidden, output)?;
        for layer in net.layers_mut() {
            read_f64s(r, layer.weights_mut().as_mut_slice())?;
            read_f64s(r, layer.biases_mut().as_mut_slice())?;
        }
        Ok(net)
    }

    /// Save to a file, replacing any existing content.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let p = path.as_ref();
        let file = File::create(p).map_err(|source| Error::FileOpen {
            path: p.to_path_buf(),
            source,
        })?;
        let mut w = BufWriter::new(file);
        self.write_to(&mut w)?;
        w.flush().map_err(Error::FileWrite)
    }

    /// Load from a file written by [`Network::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Network> {
        let p = path.as_ref();
        let file = File::open(p).map_err(|source| Error::FileOpen {
            path: p.to_path_buf(),
            source,
        })?;
        Network::read_from(&mut BufReader::new(file))
    }
}
