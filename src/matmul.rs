//! Small GEMM wrapper behind `Matrix::dot`.
//!
//! - default: a simple, safe i-k-j loop
//! - optional: `matrixmultiply::dgemm` via the `matrixmultiply` feature
//!
//! Computes `C = A * B` for row-major operands. `c` is overwritten.

#[inline]
pub(crate) fn gemm_f64(m: usize, n: usize, k: usize, a: &[f64], b: &[f64], c: &mut [f64]) {
    debug_assert!(m > 0 && n > 0 && k > 0);
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), k * n);
    debug_assert_eq!(c.len(), m * n);

    #[cfg(feature = "matrixmultiply")]
    {
        // SAFETY: slice lengths are checked above (and by every caller in `Matrix`),
        // strides describe dense row-major storage.
        unsafe {
            matrixmultiply::dgemm(
                m,
                k,
                n,
                1.0,
                a.as_ptr(),
                k as isize,
                1,
                b.as_ptr(),
                n as isize,
                1,
                0.0,
                c.as_mut_ptr(),
                n as isize,
                1,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    {
        c.fill(0.0);
        for i in 0..m {
            let out = &mut c[i * n..(i + 1) * n];
            for p in 0..k {
                let av = a[i * k + p];
                let row = &b[p * n..(p + 1) * n];
                for (o, &bv) in out.iter_mut().zip(row) {
                    *o += av * bv;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_product() {
        // [1 2] * [5 6] = [19 22]
        // [3 4]   [7 8]   [43 50]
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        let mut c = [f64::NAN; 4];
        gemm_f64(2, 2, 2, &a, &b, &mut c);
        assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);
    }
}
