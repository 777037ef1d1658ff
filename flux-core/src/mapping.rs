//! Mapping sampled points back to steady-state fluxes.
//!
//! Sample matrices hold one point per column. The map back to flux space is
//! `x = N y + N_shift`, optionally preceded by a second affine map when the
//! sampler worked in a further-transformed space (e.g. a rounding transform
//! applied on top of the reduced polytope). A secondary transform is either
//! fully present or fully absent — [`AffineMap`] owns both the matrix and
//! the shift, so a half-specified pair cannot be expressed.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// A complete affine transform `y ↦ T y + shift`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineMap {
    /// Linear part.
    pub matrix: DMatrix<f64>,
    /// Translation part; length must equal the matrix row count.
    pub shift: DVector<f64>,
}

impl AffineMap {
    /// Build a transform, checking internal conformance.
    pub fn new(matrix: DMatrix<f64>, shift: DVector<f64>) -> PipelineResult<Self> {
        if matrix.nrows() != shift.len() {
            return Err(PipelineError::ShapeMismatch {
                context: "affine map",
                expected: format!("shift of length {}", matrix.nrows()),
                actual: format!("length {}", shift.len()),
            });
        }
        Ok(Self { matrix, shift })
    }

    /// Apply the transform to every column of `points`.
    fn apply(&self, points: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = &self.matrix * points;
        for j in 0..out.ncols() {
            for i in 0..out.nrows() {
                out[(i, j)] += self.shift[i];
            }
        }
        out
    }
}

/// Map reduced-space samples to steady states.
///
/// Computes `N·(T·Y + T_shift) + N_shift` when a secondary transform is
/// given, `N·Y + N_shift` otherwise, broadcasting shifts over every sample
/// column. The input is never mutated; any dimension disagreement is fatal.
#[allow(non_snake_case)]
pub fn map_samples_to_steady_states(
    samples: &DMatrix<f64>,
    N: &DMatrix<f64>,
    N_shift: &DVector<f64>,
    secondary: Option<&AffineMap>,
) -> PipelineResult<DMatrix<f64>> {
    let outer = AffineMap::new(N.clone(), N_shift.clone())?;

    let expected_rows = match secondary {
        Some(t) => {
            if t.matrix.nrows() != N.ncols() {
                return Err(PipelineError::ShapeMismatch {
                    context: "secondary transform",
                    expected: format!("{} output rows", N.ncols()),
                    actual: format!("{} rows", t.matrix.nrows()),
                });
            }
            t.matrix.ncols()
        }
        None => N.ncols(),
    };
    if samples.nrows() != expected_rows {
        return Err(PipelineError::ShapeMismatch {
            context: "sample matrix",
            expected: format!("{} rows", expected_rows),
            actual: format!("{} rows", samples.nrows()),
        });
    }

    let steady_states = match secondary {
        Some(t) => outer.apply(&t.apply(samples)),
        None => outer.apply(samples),
    };
    Ok(steady_states)
}
