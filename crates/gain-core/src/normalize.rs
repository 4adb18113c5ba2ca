//! Per-column min-max scaling.
//!
//! Statistics are taken over observed cells only, so hidden values never leak
//! into the scaling.

use crate::error::Result;
use crate::mask::ensure_same_shape;
use crate::types::Matrix;

const RANGE_EPSILON: f64 = 1e-6;

/// Column-wise min-max scaler fitted on the observed cells of a matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: Vec<f64>,
    range: Vec<f64>,
}

impl MinMaxScaler {
    /// Fits the scaler on `mat` restricted to cells where `mask == 1`.
    ///
    /// Columns without observed cells keep an identity-like scaling, and
    /// constant columns are shifted to zero without being stretched.
    pub fn fit(mat: &Matrix, mask: &Matrix) -> Result<Self> {
        ensure_same_shape("scaler fit", mat, mask)?;
        let mut min = Vec::with_capacity(mat.ncols());
        let mut range = Vec::with_capacity(mat.ncols());
        for j in 0..mat.ncols() {
            let observed = (0..mat.nrows())
                .filter(|&i| mask[(i, j)] != 0.0)
                .map(|i| mat[(i, j)]);
            let (lo, hi) = observed.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(x), hi.max(x))
            });
            if lo.is_finite() && hi.is_finite() {
                min.push(lo);
                range.push(if hi > lo { hi - lo } else { 1.0 });
            } else {
                min.push(0.0);
                range.push(1.0);
            }
        }
        Ok(Self { min, range })
    }

    /// Maps each column to roughly `[0, 1]`.
    pub fn transform(&self, mat: &Matrix) -> Matrix {
        Matrix::from_fn(mat.nrows(), mat.ncols(), |i, j| {
            (mat[(i, j)] - self.min[j]) / (self.range[j] + RANGE_EPSILON)
        })
    }

    /// Inverse of [`MinMaxScaler::transform`].
    pub fn inverse_transform(&self, mat: &Matrix) -> Matrix {
        Matrix::from_fn(mat.nrows(), mat.ncols(), |i, j| {
            mat[(i, j)] * (self.range[j] + RANGE_EPSILON) + self.min[j]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_ignores_hidden_cells() {
        let mat = Matrix::from_row_slice(3, 1, &[10.0, 20.0, 1000.0]);
        let mask = Matrix::from_row_slice(3, 1, &[1.0, 1.0, 0.0]);
        let scaler = MinMaxScaler::fit(&mat, &mask).unwrap();
        let scaled = scaler.transform(&mat);
        assert_relative_eq!(scaled[(0, 0)], 0.0, epsilon = 1e-9);
        assert_relative_eq!(scaled[(1, 0)], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_constant_column_is_not_stretched() {
        let mat = Matrix::from_row_slice(3, 1, &[5.0, 5.0, 9.0]);
        let mask = Matrix::from_row_slice(3, 1, &[1.0, 1.0, 0.0]);
        let scaler = MinMaxScaler::fit(&mat, &mask).unwrap();
        let scaled = scaler.transform(&mat);
        assert_relative_eq!(scaled[(0, 0)], 0.0);
        assert_relative_eq!(scaled[(2, 0)], 4.0, epsilon = 1e-5);

        let back = scaler.inverse_transform(&scaled);
        for (a, b) in back.iter().zip(mat.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_inverse_transform() {
        let mat = Matrix::from_row_slice(2, 2, &[1.0, -3.0, 5.0, 7.0]);
        let mask = Matrix::from_element(2, 2, 1.0);
        let scaler = MinMaxScaler::fit(&mat, &mask).unwrap();
        let back = scaler.inverse_transform(&scaler.transform(&mat));
        for (a, b) in back.iter().zip(mat.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }
}
