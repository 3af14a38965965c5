//! Metrics.
//!
//! Evaluation helpers; none of these participate in backprop. Accuracy is the fitness
//! used by the evolutionary loop and the progress signal of the backprop loop.

use crate::{Dataset, Error, Matrix, Network, Result};

/// Index of the largest value; ties go to the lowest index. Returns 0 for an empty slice.
#[inline]
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn check_dataset(net: &Network, data: &Dataset) -> Result<()> {
    if data.input_dim() != net.input_dim() {
        return Err(Error::InvalidDimensions(format!(
            "dataset input_dim {} does not match network input_dim {}",
            data.input_dim(),
            net.input_dim()
        )));
    }
    Ok(())
}

/// First `n` rows of the dataset's feature matrix (all rows if `n == len`).
fn leading_rows(data: &Dataset, n: usize) -> Result<Matrix> {
    let cols = data.input_dim();
    Matrix::from_slice(n, cols, &data.images().as_slice()[..n * cols])
}

/// Fraction of samples whose predicted class equals the label's true class.
pub fn accuracy(net: &Network, data: &Dataset) -> Result<f64> {
    accuracy_on_prefix(net, data, 0)
}

/// Accuracy over the first `n` samples; `n == 0` or `n > len` evaluates everything.
pub fn accuracy_on_prefix(net: &Network, data: &Dataset, n: usize) -> Result<f64> {
    check_dataset(net, data)?;
    if data.is_empty() {
        return Err(Error::InvalidParam("dataset is empty".to_owned()));
    }

    let n = if n == 0 || n > data.len() {
        data.len()
    } else {
        n
    };

    let outputs = net.forward(&leading_rows(data, n)?)?;
    let correct = (0..n)
        .filter(|&i| data.true_class(i) == Some(argmax(outputs.row(i))))
        .count();
    Ok(correct as f64 / n as f64)
}

/// Mean over samples of the per-sample mean squared error between output and label.
pub fn mse(net: &Network, data: &Dataset) -> Result<f64> {
    check_dataset(net, data)?;
    if data.num_classes() != net.output_dim() {
        return Err(Error::InvalidDimensions(format!(
            "dataset has {} classes, network outputs {}",
            data.num_classes(),
            net.output_dim()
        )));
    }
    if data.is_empty() {
        return Err(Error::InvalidParam("dataset is empty".to_owned()));
    }

    let outputs = net.forward(data.images())?;
    let diff = outputs.sub(data.labels())?;
    let sum_sq: f64 = diff.as_slice().iter().map(|d| d * d).sum();
    Ok(sum_sq / (data.len() * data.num_classes()) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Activation;

    fn identity_net() -> Network {
        // 2 inputs -> 2 outputs, W = I, b = 0, linear output.
        let mut net = Network::new(&[2, 2], Activation::ReLU, Activation::Linear).unwrap();
        net.layer_mut(0)
            .unwrap()
            .weights_mut()
            .as_mut_slice()
            .copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);
        net
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.9, 0.9]), 1);
        assert_eq!(argmax(&[3.0, -1.0]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn accuracy_counts_matching_classes() {
        let net = identity_net();
        let data = Dataset::from_rows(
            &[
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![0.0, 1.0],
            ],
            &[
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![0.0, 1.0],
                vec![0.0, 1.0],
            ],
        )
        .unwrap();

        assert!((accuracy(&net, &data).unwrap() - 0.75).abs() < 1e-12);
        assert!((accuracy_on_prefix(&net, &data, 2).unwrap() - 1.0).abs() < 1e-12);
        assert!((accuracy_on_prefix(&net, &data, 3).unwrap() - 2.0 / 3.0).abs() < 1e-12);
        // Out-of-range counts fall back to the whole set.
        assert!((accuracy_on_prefix(&net, &data, 99).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn labels_without_a_one_never_match() {
        let net = identity_net();
        let data = Dataset::from_rows(&[vec![1.0, 0.0]], &[vec![0.9, 0.0]]).unwrap();
        assert_eq!(accuracy(&net, &data).unwrap(), 0.0);
    }

    #[test]
    fn mse_of_identity_on_its_labels_is_zero() {
        let net = identity_net();
        let data = Dataset::from_rows(
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
            &[vec![1.0, 0.0], vec![0.0, 0.0]],
        )
        .unwrap();
        // Second sample is off by 1 in one of 4 entries.
        assert!((mse(&net, &data).unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn mismatched_input_width_is_an_error() {
        let net = identity_net();
        let data = Dataset::from_rows(&[vec![1.0]], &[vec![1.0, 0.0]]).unwrap();
        assert!(accuracy(&net, &data).is_err());
        assert_eq!(
            accuracy(&net, &data).unwrap_err().code(),
            crate::ErrorCode::InvalidDimensions
        );
    }
}
