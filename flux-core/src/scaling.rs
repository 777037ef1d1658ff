//! Geometric-mean scaling for matrix conditioning.
//!
//! Alternating row/column passes drive every nonzero of the matrix toward
//! unit geometric mean: a pass measures, per column (or row), the largest
//! and smallest rescaled nonzero magnitude and sets the scale to the
//! geometric mean of the two. Iteration stops once a pass no longer
//! improves the worst column spread by the target ratio, or at the pass
//! cap — the latter without a stall is reported as non-convergence, and the
//! caller is expected to continue with the unscaled system.
//!
//! Scaling affects numerical stability only, never the polytope geometry.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Damping floor: a pass never trusts a minimum below `DAMP` times the
/// corresponding maximum, which keeps scales finite on wildly spread data.
const DAMP: f64 = 1e-4;

/// Scaling failure; recoverable by falling back to the unscaled system.
#[derive(Debug, Error)]
pub enum ScalingError {
    /// The pass cap was reached while the spread was still improving.
    #[error("geometric scaling did not converge within {passes} passes (spread {spread:.3e})")]
    NotConverged {
        /// Number of passes performed.
        passes: usize,
        /// Worst column spread at the last pass.
        spread: f64,
    },
}

/// Row and column scale factors produced by [`gmscale`].
#[derive(Debug, Clone)]
pub struct Scaling {
    /// Per-row scale factors.
    pub row_scale: DVector<f64>,
    /// Per-column scale factors.
    pub col_scale: DVector<f64>,
}

/// Compute geometric-mean row/column scales for `a`.
///
/// Zero rows and columns keep scale 1. `target_ratio` is the stall
/// threshold (a pass improving the spread by less than this factor ends the
/// iteration), `max_passes` the iteration cap.
pub fn gmscale(
    a: &DMatrix<f64>,
    target_ratio: f64,
    max_passes: usize,
) -> Result<Scaling, ScalingError> {
    let m = a.nrows();
    let n = a.ncols();

    let mut row_scale = DVector::repeat(m, 1.0);
    let mut col_scale = DVector::repeat(n, 1.0);
    let mut previous_spread = f64::INFINITY;
    let mut spread: f64 = 1.0;
    let mut converged = false;

    for pass in 0..=max_passes {
        // Column statistics under the current row scales.
        let mut cmax = vec![0.0_f64; n];
        let mut cmin = vec![f64::INFINITY; n];
        for j in 0..n {
            for i in 0..m {
                let v = a[(i, j)].abs();
                if v == 0.0 {
                    continue;
                }
                let t = v / row_scale[i];
                cmax[j] = cmax[j].max(t);
                cmin[j] = cmin[j].min(t);
            }
        }

        spread = 1.0;
        for j in 0..n {
            if cmax[j] > 0.0 {
                spread = spread.max(cmax[j] / cmin[j]);
            }
        }

        if pass > 0 {
            for j in 0..n {
                col_scale[j] = if cmax[j] == 0.0 {
                    1.0
                } else {
                    (cmax[j] * cmin[j].max(DAMP * cmax[j])).sqrt()
                };
            }
        }

        if pass >= 2 && spread >= previous_spread * target_ratio {
            converged = true;
            break;
        }
        if pass == max_passes {
            break;
        }
        previous_spread = spread;

        // Row pass under the fresh column scales.
        for i in 0..m {
            let mut rmax = 0.0_f64;
            let mut rmin = f64::INFINITY;
            for j in 0..n {
                let v = a[(i, j)].abs();
                if v == 0.0 {
                    continue;
                }
                let t = v / col_scale[j];
                rmax = rmax.max(t);
                rmin = rmin.min(t);
            }
            row_scale[i] = if rmax == 0.0 {
                1.0
            } else {
                (rmax * rmin.max(DAMP * rmax)).sqrt()
            };
        }
    }

    if !converged {
        return Err(ScalingError::NotConverged {
            passes: max_passes,
            spread,
        });
    }

    Ok(Scaling {
        row_scale,
        col_scale,
    })
}

/// Apply scale factors to an inequality system:
/// `A' = diag(1/rs) · A · diag(1/cs)`, `b' = diag(1/rs) · b`.
#[allow(non_snake_case)]
pub fn apply_scaling(
    A: &DMatrix<f64>,
    b: &DVector<f64>,
    scaling: &Scaling,
) -> (DMatrix<f64>, DVector<f64>) {
    let mut scaled_a = A.clone();
    for i in 0..scaled_a.nrows() {
        for j in 0..scaled_a.ncols() {
            scaled_a[(i, j)] /= scaling.row_scale[i] * scaling.col_scale[j];
        }
    }
    let mut scaled_b = b.clone();
    for i in 0..scaled_b.len() {
        scaled_b[i] /= scaling.row_scale[i];
    }
    (scaled_a, scaled_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn magnitude_spread(a: &DMatrix<f64>) -> f64 {
        let mut max = 0.0_f64;
        let mut min = f64::INFINITY;
        for &v in a.iter() {
            let v = v.abs();
            if v > 0.0 {
                max = max.max(v);
                min = min.min(v);
            }
        }
        max / min
    }

    #[test]
    fn balances_a_badly_spread_matrix() {
        // One row eight orders of magnitude above the rest.
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[1.0e8, 2.0e8, 5.0e7, 1.0, 2.0, 0.5, 3.0, 1.0, 4.0],
        );
        let before = magnitude_spread(&a);

        let scaling = gmscale(&a, 0.99, 10).unwrap();
        let b = DVector::zeros(3);
        let (scaled, _) = apply_scaling(&a, &b, &scaling);
        let after = magnitude_spread(&scaled);

        assert!(
            after * 10.0 <= before,
            "spread only went from {:.3e} to {:.3e}",
            before,
            after
        );
    }

    #[test]
    fn well_conditioned_input_keeps_unit_scales() {
        let a = DMatrix::<f64>::identity(4, 4);
        let scaling = gmscale(&a, 0.99, 10).unwrap();
        for &s in scaling.row_scale.iter().chain(scaling.col_scale.iter()) {
            assert!((s - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_rows_and_columns_get_unit_scales() {
        let mut a = DMatrix::zeros(3, 3);
        a[(0, 0)] = 2.0;
        a[(2, 2)] = 0.5;
        // Row 1 and column 1 are entirely zero.
        let scaling = gmscale(&a, 0.99, 10).unwrap();
        assert!((scaling.row_scale[1] - 1.0).abs() < 1e-12);
        assert!((scaling.col_scale[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pass_cap_without_stall_is_nonconvergence() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0e8, 1.0e8, 1.0, 1.0]);
        let err = gmscale(&a, 0.99, 1).unwrap_err();
        assert!(matches!(err, ScalingError::NotConverged { passes: 1, .. }));
    }

    #[test]
    fn scaled_rhs_follows_the_row_scales() {
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 4.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![8.0, 3.0]);
        let scaling = gmscale(&a, 0.99, 10).unwrap();
        let (scaled_a, scaled_b) = apply_scaling(&a, &b, &scaling);
        for i in 0..2 {
            // b is rescaled exactly like the rows of A.
            let ratio = scaled_b[i] / (b[i] / scaling.row_scale[i]);
            assert!((ratio - 1.0).abs() < 1e-12);
            assert!(scaled_a.row(i).iter().all(|v| v.is_finite()));
        }
    }
}
