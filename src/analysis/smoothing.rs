//! Savitzky–Golay smoothing.
//!
//! Each output sample is the value, at that sample, of the least-squares
//! polynomial fitted to the surrounding window. The first and last half
//! windows are taken from the polynomial fitted to the first and last full
//! window respectively, so the output has the same length as the input and
//! no padding is invented.

use crate::error::{AnalysisError, Result};

/// Smooth `values` with an odd `window` and polynomial degree `poly_order`.
pub fn savgol_filter(values: &[f64], window: usize, poly_order: usize) -> Result<Vec<f64>> {
    if window % 2 == 0 || window == 0 {
        return Err(AnalysisError::invalid_parameter(format!(
            "smoothing window must be a positive odd number, got {window}"
        )));
    }
    if poly_order >= window {
        return Err(AnalysisError::invalid_parameter(format!(
            "polynomial order {poly_order} must be less than window {window}"
        )));
    }
    let n = values.len();
    if window > n {
        return Err(AnalysisError::invalid_parameter(format!(
            "smoothing window {window} is longer than the series ({n} samples)"
        )));
    }

    let half = window / 2;
    let center = fit_weights(window, poly_order, 0.0)?;
    let mut out = vec![0.0; n];

    for i in half..n - half {
        out[i] = dot(&center, &values[i - half..=i + half]);
    }

    let head = &values[..window];
    let tail = &values[n - window..];
    for k in 0..half {
        let w = fit_weights(window, poly_order, k as f64 - half as f64)?;
        out[k] = dot(&w, head);
        let w = fit_weights(window, poly_order, (half - k) as f64)?;
        out[n - 1 - k] = dot(&w, tail);
    }
    Ok(out)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Weights that evaluate the window's least-squares polynomial at offset
/// `at` from the window center.
///
/// With `A[i][j] = z_i^j` (z from -half to half) the fitted value at `at` is
/// `s^T (A^T A)^-1 A^T y` where `s = [1, at, at^2, ...]`, so the weights are
/// `A v` with `(A^T A) v = s`.
fn fit_weights(window: usize, poly_order: usize, at: f64) -> Result<Vec<f64>> {
    let half = (window / 2) as f64;
    let m = poly_order + 1;
    let z: Vec<f64> = (0..window).map(|i| i as f64 - half).collect();

    let mut ata = vec![vec![0.0; m]; m];
    for (r, row) in ata.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = z.iter().map(|zi| zi.powi((r + c) as i32)).sum();
        }
    }
    let s: Vec<f64> = (0..m).map(|j| at.powi(j as i32)).collect();
    let v = solve(ata, s)?;

    Ok(z
        .iter()
        .map(|zi| v.iter().enumerate().map(|(j, vj)| vj * zi.powi(j as i32)).sum())
        .collect())
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < f64::EPSILON {
            return Err(AnalysisError::invalid_parameter(
                "smoothing fit is singular for this window and order",
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64], tol: f64) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < tol)
    }

    #[test]
    fn classic_five_point_quadratic_weights() {
        // -3, 12, 17, 12, -3 over 35
        let w = fit_weights(5, 2, 0.0).unwrap();
        let expected: Vec<f64> = [-3.0, 12.0, 17.0, 12.0, -3.0]
            .iter()
            .map(|v| v / 35.0)
            .collect();
        assert!(close(&w, &expected, 1e-12));
    }

    #[test]
    fn cubic_is_reproduced_exactly() {
        let values: Vec<f64> = (0..40)
            .map(|i| {
                let x = i as f64 * 0.1;
                0.5 * x * x * x - x * x + 2.0
            })
            .collect();
        let smooth = savgol_filter(&values, 11, 3).unwrap();
        assert!(close(&smooth, &values, 1e-9));
    }

    #[test]
    fn constant_stays_constant_including_edges() {
        let values = vec![3.25; 30];
        let smooth = savgol_filter(&values, 7, 3).unwrap();
        assert!(close(&smooth, &values, 1e-12));
    }

    #[test]
    fn rejects_bad_parameters() {
        let values = vec![0.0; 10];
        assert!(savgol_filter(&values, 4, 3).is_err());
        assert!(savgol_filter(&values, 3, 3).is_err());
        assert!(savgol_filter(&values, 11, 3).is_err());
    }
}
