//! Dataset boundary type.
//!
//! A `Dataset` pairs two matrices with the same row count: `images` (one normalized
//! feature vector per row) and `labels` (one one-hot target per row). Loading,
//! normalization and encoding happen outside this crate; training code only reads rows.

use crate::{Error, Matrix, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    images: Matrix,
    labels: Matrix,
}

impl Dataset {
    /// Pair feature and label matrices. Row counts must match.
    pub fn from_matrices(images: Matrix, labels: Matrix) -> Result<Self> {
        if images.rows() != labels.rows() {
            return Err(Error::InvalidDimensions(format!(
                "images has {} rows but labels has {}",
                images.rows(),
                labels.rows()
            )));
        }
        Ok(Self { images, labels })
    }

    /// Build a dataset from flat row-major buffers.
    ///
    /// `images` is `(len, input_dim)` and `labels` is `(len, num_classes)`.
    pub fn from_flat(
        images: Vec<f64>,
        labels: Vec<f64>,
        input_dim: usize,
        num_classes: usize,
    ) -> Result<Self> {
        if input_dim == 0 || num_classes == 0 {
            return Err(Error::InvalidParam(format!(
                "input_dim and num_classes must be > 0, got {input_dim} and {num_classes}"
            )));
        }
        if images.len() % input_dim != 0 {
            return Err(Error::InvalidDimensions(format!(
                "images length {} is not divisible by input_dim {input_dim}",
                images.len()
            )));
        }
        let len = images.len() / input_dim;
        let images = Matrix::from_vec(len, input_dim, images)?;
        let labels = Matrix::from_vec(len, num_classes, labels)?;
        Self::from_matrices(images, labels)
    }

    /// Build a dataset from per-sample rows (copies into contiguous storage).
    pub fn from_rows(images: &[Vec<f64>], labels: &[Vec<f64>]) -> Result<Self> {
        if images.len() != labels.len() {
            return Err(Error::InvalidDimensions(format!(
                "images/labels length mismatch: {} vs {}",
                images.len(),
                labels.len()
            )));
        }
        let input_dim = images.first().map_or(0, Vec::len);
        let num_classes = labels.first().map_or(0, Vec::len);

        let mut flat_images = Vec::with_capacity(images.len() * input_dim);
        for (i, row) in images.iter().enumerate() {
            if row.len() != input_dim {
                return Err(Error::InvalidDimensions(format!(
                    "image row {i} has len {}, expected {input_dim}",
                    row.len()
                )));
            }
            flat_images.extend_from_slice(row);
        }

        let mut flat_labels = Vec::with_capacity(labels.len() * num_classes);
        for (i, row) in labels.iter().enumerate() {
            if row.len() != num_classes {
                return Err(Error::InvalidDimensions(format!(
                    "label row {i} has len {}, expected {num_classes}",
                    row.len()
                )));
            }
            flat_labels.extend_from_slice(row);
        }

        Self::from_flat(flat_images, flat_labels, input_dim, num_classes)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.images.rows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.images.cols()
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.labels.cols()
    }

    #[inline]
    pub fn images(&self) -> &Matrix {
        &self.images
    }

    #[inline]
    pub fn labels(&self) -> &Matrix {
        &self.labels
    }

    /// Returns the `idx`-th feature row.
    ///
    /// Panics if `idx >= len`.
    #[inline]
    pub fn input(&self, idx: usize) -> &[f64] {
        self.images.row(idx)
    }

    /// Returns the `idx`-th label row.
    ///
    /// Panics if `idx >= len`.
    #[inline]
    pub fn label(&self, idx: usize) -> &[f64] {
        self.labels.row(idx)
    }

    /// Index of the first label entry equal to exactly `1.0`, if any.
    pub fn true_class(&self, idx: usize) -> Option<usize> {
        if idx >= self.len() {
            return None;
        }
        self.label(idx).iter().position(|&v| v == 1.0)
    }
}
