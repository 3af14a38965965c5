//! Dense row-major matrix.
//!
//! `Matrix` owns one contiguous `Vec<f64>` of length `rows * cols`. Every operation that
//! derives a new matrix allocates fresh storage; the only in-place operations are the ones
//! named as such (`add_bias`, `copy_from`, `map_inplace`, `fill`, index assignment).
//!
//! Shapes are validated: mismatched operands fail with [`Error::InvalidDimensions`]
//! instead of truncating or broadcasting. The single broadcasting operation is
//! [`Matrix::add_bias`], which adds a `1 x cols` row to every row.

use std::ops::{Index, IndexMut};

use crate::matmul::gemm_f64;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Allocate a zero-filled buffer, reporting allocation failure instead of aborting.
fn alloc_zeroed(rows: usize, cols: usize) -> Result<Vec<f64>> {
    let len = rows
        .checked_mul(cols)
        .ok_or_else(|| Error::AllocFailed(format!("matrix shape {rows}x{cols} overflows")))?;
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|e| Error::AllocFailed(format!("{rows}x{cols} matrix: {e}")))?;
    data.resize(len, 0.0);
    Ok(data)
}

impl Matrix {
    /// Zero-filled `rows x cols` matrix. Both dimensions must be > 0.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidParam(format!(
                "matrix dimensions must be > 0, got {rows}x{cols}"
            )));
        }
        let data = alloc_zeroed(rows, cols)?;
        Ok(Self { rows, cols, data })
    }

    /// Take ownership of a row-major buffer.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidParam(format!(
                "matrix dimensions must be > 0, got {rows}x{cols}"
            )));
        }
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(Error::InvalidDimensions(format!(
                "buffer length {} does not match {rows}x{cols}",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Copy a row-major slice into a new matrix.
    pub fn from_slice(rows: usize, cols: usize, values: &[f64]) -> Result<Self> {
        let mut m = Self::zeros(rows, cols)?;
        if values.len() != m.data.len() {
            return Err(Error::InvalidDimensions(format!(
                "slice length {} does not match {rows}x{cols}",
                values.len()
            )));
        }
        m.data.copy_from_slice(values);
        Ok(m)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false for a constructed matrix; provided for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Row view. Panics if `r >= rows`; use [`Matrix::get_row`] for a checked copy.
    #[inline]
    pub fn row(&self, r: usize) -> &[f64] {
        let start = r * self.cols;
        &self.data[start..start + self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        let start = r * self.cols;
        &mut self.data[start..start + self.cols]
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> Option<f64> {
        if r < self.rows && c < self.cols {
            Some(self.data[r * self.cols + c])
        } else {
            None
        }
    }

    /// Standard matrix product `self * other`.
    pub fn dot(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(Error::InvalidDimensions(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut out = Matrix::zeros(self.rows, other.cols)?;
        gemm_f64(
            self.rows,
            other.cols,
            self.cols,
            &self.data,
            &other.data,
            &mut out.data,
        );
        Ok(out)
    }

    /// Add a `1 x cols` bias row to every row, in place.
    pub fn add_bias(&mut self, bias: &Matrix) -> Result<()> {
        if bias.rows != 1 || bias.cols != self.cols {
            return Err(Error::InvalidDimensions(format!(
                "bias must be 1x{}, got {}x{}",
                self.cols, bias.rows, bias.cols
            )));
        }
        for row in self.data.chunks_exact_mut(self.cols) {
            for (v, &b) in row.iter_mut().zip(&bias.data) {
                *v += b;
            }
        }
        Ok(())
    }

    pub fn transpose(&self) -> Result<Matrix> {
        let mut out = Matrix::zeros(self.cols, self.rows)?;
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        Ok(out)
    }

    /// Element-wise (Hadamard) product.
    pub fn hadamard(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "multiply", |a, b| a * b)
    }

    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "subtract", |a, b| a - b)
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn scale(&self, factor: f64) -> Result<Matrix> {
        let mut out = self.try_clone()?;
        out.map_inplace(|v| v * factor);
        Ok(out)
    }

    /// Copy of row `r` as a new `1 x cols` matrix.
    pub fn get_row(&self, r: usize) -> Result<Matrix> {
        if r >= self.rows {
            return Err(Error::IndexOutOfBounds {
                index: r,
                len: self.rows,
            });
        }
        Matrix::from_slice(1, self.cols, self.row(r))
    }

    /// Overwrite the values of `self` with those of `src`; shapes must match exactly.
    pub fn copy_from(&mut self, src: &Matrix) -> Result<()> {
        if self.shape() != src.shape() {
            return Err(Error::InvalidDimensions(format!(
                "cannot copy {}x{} into {}x{}",
                src.rows, src.cols, self.rows, self.cols
            )));
        }
        self.data.copy_from_slice(&src.data);
        Ok(())
    }

    /// Deep copy that reports allocation failure.
    pub fn try_clone(&self) -> Result<Matrix> {
        let mut data = alloc_zeroed(self.rows, self.cols)?;
        data.copy_from_slice(&self.data);
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Sum over rows, producing a `1 x cols` matrix.
    pub fn column_sums(&self) -> Result<Matrix> {
        let mut out = Matrix::zeros(1, self.cols)?;
        for row in self.data.chunks_exact(self.cols) {
            for (o, &v) in out.data.iter_mut().zip(row) {
                *o += v;
            }
        }
        Ok(out)
    }

    #[inline]
    pub fn map_inplace<F: FnMut(f64) -> f64>(&mut self, mut f: F) {
        for v in &mut self.data {
            *v = f(*v);
        }
    }

    #[inline]
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    fn zip_with<F: Fn(f64, f64) -> f64>(&self, other: &Matrix, op: &str, f: F) -> Result<Matrix> {
        if self.shape() != other.shape() {
            return Err(Error::InvalidDimensions(format!(
                "cannot {op} {}x{} and {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut out = Matrix::zeros(self.rows, self.cols)?;
        for ((o, &a), &b) in out.data.iter_mut().zip(&self.data).zip(&other.data) {
            *o = f(a, b);
        }
        Ok(out)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &f64 {
        assert!(
            r < self.rows && c < self.cols,
            "index ({r}, {c}) out of bounds for {}x{} matrix",
            self.rows,
            self.cols
        );
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut f64 {
        assert!(
            r < self.rows && c < self.cols,
            "index ({r}, {c}) out of bounds for {}x{} matrix",
            self.rows,
            self.cols
        );
        &mut self.data[r * self.cols + c]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    #[test]
    fn zeros_rejects_empty_shapes() {
        assert_eq!(
            Matrix::zeros(0, 3).unwrap_err().code(),
            ErrorCode::InvalidParam
        );
        assert_eq!(
            Matrix::zeros(2, 0).unwrap_err().code(),
            ErrorCode::InvalidParam
        );

        let m = Matrix::zeros(2, 3).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert!(m.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn zeros_reports_overflowing_shapes_as_alloc_failure() {
        let err = Matrix::zeros(usize::MAX, 2).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AllocFailed);
    }

    #[test]
    fn dot_matches_hand_computed_values() {
        let a = Matrix::from_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let b = Matrix::from_slice(3, 2, &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
        let c = a.dot(&b).unwrap();

        assert_eq!(c.shape(), (2, 2));
        let expected = [58.0, 64.0, 139.0, 154.0];
        for (got, want) in c.as_slice().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "got {got} want {want}");
        }
    }

    #[test]
    fn dot_rejects_inner_dimension_mismatch() {
        let a = Matrix::zeros(2, 3).unwrap();
        let b = Matrix::zeros(2, 2).unwrap();
        assert_eq!(a.dot(&b).unwrap_err().code(), ErrorCode::InvalidDimensions);
    }

    #[test]
    fn add_bias_broadcasts_over_rows() {
        let mut m = Matrix::from_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let bias = Matrix::from_slice(1, 2, &[0.5, -1.0]).unwrap();
        m.add_bias(&bias).unwrap();
        assert_eq!(m.as_slice(), &[1.5, 1.0, 3.5, 3.0]);
    }

    #[test]
    fn add_bias_rejects_bad_shapes_without_touching_target() {
        let mut m = Matrix::from_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let wide = Matrix::zeros(1, 3).unwrap();
        let tall = Matrix::zeros(2, 2).unwrap();

        assert_eq!(
            m.add_bias(&wide).unwrap_err().code(),
            ErrorCode::InvalidDimensions
        );
        assert_eq!(
            m.add_bias(&tall).unwrap_err().code(),
            ErrorCode::InvalidDimensions
        );
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn transpose_swaps_axes() {
        let m = Matrix::from_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let t = m.transpose().unwrap();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(t[(2, 1)], 6.0);
    }

    #[test]
    fn elementwise_ops_check_shapes() {
        let a = Matrix::from_slice(1, 3, &[1.0, 2.0, 3.0]).unwrap();
        let b = Matrix::from_slice(1, 3, &[4.0, 5.0, 6.0]).unwrap();

        assert_eq!(a.hadamard(&b).unwrap().as_slice(), &[4.0, 10.0, 18.0]);
        assert_eq!(b.sub(&a).unwrap().as_slice(), &[3.0, 3.0, 3.0]);
        assert_eq!(a.add(&b).unwrap().as_slice(), &[5.0, 7.0, 9.0]);
        assert_eq!(a.scale(-2.0).unwrap().as_slice(), &[-2.0, -4.0, -6.0]);

        let c = Matrix::zeros(3, 1).unwrap();
        assert_eq!(a.sub(&c).unwrap_err().code(), ErrorCode::InvalidDimensions);
        assert_eq!(
            a.hadamard(&c).unwrap_err().code(),
            ErrorCode::InvalidDimensions
        );
    }

    #[test]
    fn get_row_is_a_fresh_copy() {
        let m = Matrix::from_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut r = m.get_row(1).unwrap();
        assert_eq!(r.shape(), (1, 2));
        r[(0, 0)] = 99.0;
        assert_eq!(m[(1, 0)], 3.0);

        let err = m.get_row(2).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IndexOutOfBounds);
    }

    #[test]
    fn copy_from_requires_identical_shape() {
        let src = Matrix::from_slice(1, 2, &[7.0, 8.0]).unwrap();
        let mut dst = Matrix::zeros(1, 2).unwrap();
        dst.copy_from(&src).unwrap();
        assert_eq!(dst, src);

        let mut wrong = Matrix::zeros(2, 1).unwrap();
        assert_eq!(
            wrong.copy_from(&src).unwrap_err().code(),
            ErrorCode::InvalidDimensions
        );
    }

    #[test]
    fn from_vec_validates_length() {
        assert!(Matrix::from_vec(2, 2, vec![0.0; 4]).is_ok());
        assert_eq!(
            Matrix::from_vec(2, 2, vec![0.0; 3]).unwrap_err().code(),
            ErrorCode::InvalidDimensions
        );
    }

    #[test]
    fn column_sums_reduce_rows() {
        let m = Matrix::from_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.column_sums().unwrap().as_slice(), &[9.0, 12.0]);
    }
}
