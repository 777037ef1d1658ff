//! Polytope representations and the coordinate-reduction pipeline.
//!
//! The low-dimensional polytope couples inequality facets with the equality
//! system; assembly eliminates the equalities through the nullspace
//! transform, drops numerically meaningless facets, conditions the system by
//! geometric scaling (re-filtering afterwards, since scaling can expose rows
//! that were above threshold only through poor conditioning), and folds the
//! column scales back into the basis so a single affine map suffices for all
//! downstream consumers.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use sprs::CsMat;

use crate::error::{PipelineError, PipelineResult};
use crate::nullspace;
use crate::scaling::{self, Scaling};
use crate::settings::PipelineSettings;

/// Flux-space polytope `{x : Ax ≤ b, Aeq x = beq}`.
#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct LowDimPolytope {
    /// Inequality facet normals, row-wise.
    pub A: DMatrix<f64>,
    /// Inequality right-hand side.
    pub b: DVector<f64>,
    /// Equality system (stoichiometry plus folded fixed fluxes).
    pub Aeq: CsMat<f64>,
    /// Equality right-hand side.
    pub beq: DVector<f64>,
}

/// Full-dimensional polytope `{y : Ay ≤ b}` in reduced coordinates, with the
/// affine map `x = N y + N_shift` back to flux space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct FullDimPolytope {
    /// Facet normals in reduced coordinates.
    pub A: DMatrix<f64>,
    /// Facet right-hand side.
    pub b: DVector<f64>,
    /// Reduction basis with the column scaling folded in.
    pub N: DMatrix<f64>,
    /// Affine shift back to flux space.
    pub N_shift: DVector<f64>,
}

impl FullDimPolytope {
    /// Dimension of the reduced space.
    pub fn dim(&self) -> usize {
        self.A.ncols()
    }
}

/// Drop inequality rows whose normal has Euclidean norm below `tol`.
///
/// Such rows cannot numerically constrain the reduced polytope and
/// destabilize both scaling and the ball LP. Row correspondence between the
/// matrix and the right-hand side is preserved.
#[allow(non_snake_case)]
pub fn drop_degenerate_facets(
    A: &DMatrix<f64>,
    b: &DVector<f64>,
    tol: f64,
) -> (DMatrix<f64>, DVector<f64>) {
    let kept: Vec<usize> = (0..A.nrows()).filter(|&i| A.row(i).norm() >= tol).collect();
    (A.select_rows(kept.iter()), b.select_rows(kept.iter()))
}

/// Assemble the full-dimensional polytope from the low-dimensional one.
///
/// Deterministic: the same input always produces the identical artifact.
pub fn build_full_dim_polytope(
    low: &LowDimPolytope,
    settings: &PipelineSettings,
) -> PipelineResult<FullDimPolytope> {
    if low.A.nrows() != low.b.len() {
        return Err(PipelineError::ShapeMismatch {
            context: "low-dimensional polytope",
            expected: format!("b of length {}", low.A.nrows()),
            actual: format!("length {}", low.b.len()),
        });
    }

    let ns = nullspace::compute(&low.Aeq, &low.beq, settings.nullspace)?;

    if low.A.ncols() != ns.N.nrows() || ns.N.nrows() != ns.N_shift.len() {
        return Err(PipelineError::DegenerateDimensionality(format!(
            "nullspace transform does not match the polytope: A has {} columns, N is {}×{}",
            low.A.ncols(),
            ns.N.nrows(),
            ns.dim()
        )));
    }
    if ns.dim() <= 1 {
        return Err(PipelineError::DegenerateDimensionality(format!(
            "the reduced space has dimension {}; at least 2 is required for sampling",
            ns.dim()
        )));
    }

    // Project the facets into the reduced space.
    let reduced_b = &low.b - &low.A * &ns.N_shift;
    let reduced_a = &low.A * &ns.N;

    let (filtered_a, filtered_b) =
        drop_degenerate_facets(&reduced_a, &reduced_b, settings.facet_tol);

    let (final_a, final_b, final_n) = if settings.enable_scaling {
        match scaling::gmscale(
            &filtered_a,
            settings.scaling_target_ratio,
            settings.scaling_max_passes,
        ) {
            Ok(sc) => {
                let (scaled_a, scaled_b) = scaling::apply_scaling(&filtered_a, &filtered_b, &sc);
                let rescaled_n = fold_column_scales(&ns.N, &sc);
                // Scaling can push near-degenerate rows under the threshold.
                let (refiltered_a, refiltered_b) =
                    drop_degenerate_facets(&scaled_a, &scaled_b, settings.facet_tol);
                (refiltered_a, refiltered_b, rescaled_n)
            }
            Err(err) => {
                eprintln!(
                    "warning: {}; continuing with the unscaled polytope",
                    err
                );
                (filtered_a, filtered_b, ns.N.clone())
            }
        }
    } else {
        (filtered_a, filtered_b, ns.N.clone())
    };

    if final_a.nrows() == 0 {
        return Err(PipelineError::DegenerateDimensionality(
            "every facet of the reduced polytope is numerically degenerate".into(),
        ));
    }
    if final_a.ncols() != final_n.ncols()
        || final_n.nrows() != ns.N_shift.len()
        || final_n.ncols() <= 1
    {
        return Err(PipelineError::DegenerateDimensionality(
            "the assembled polytope violates its shape invariants".into(),
        ));
    }

    if settings.verbose {
        println!(
            "polytope: reduced {} fluxes to {} dimensions, {} facets retained",
            ns.N.nrows(),
            final_n.ncols(),
            final_a.nrows()
        );
    }

    Ok(FullDimPolytope {
        A: final_a,
        b: final_b,
        N: final_n,
        N_shift: ns.N_shift,
    })
}

/// Fold the column scales into the basis: `N · diag(1/cs)`.
fn fold_column_scales(n: &DMatrix<f64>, sc: &Scaling) -> DMatrix<f64> {
    let mut folded = n.clone();
    for j in 0..folded.ncols() {
        let inv = 1.0 / sc.col_scale[j];
        for i in 0..folded.nrows() {
            folded[(i, j)] *= inv;
        }
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_lp::sparse::from_triplets;

    #[test]
    fn filter_drops_only_zero_norm_rows() {
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let b = DVector::from_vec(vec![1.0, 0.0, 1.0]);

        let (fa, fb) = drop_degenerate_facets(&a, &b, 1e-6);

        assert_eq!(fa.nrows(), 2);
        assert_eq!(fa, DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]));
        assert_eq!(fb, DVector::from_vec(vec![1.0, 1.0]));
    }

    #[test]
    fn filter_respects_the_threshold() {
        let a = DMatrix::from_row_slice(2, 2, &[1e-7, 0.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let (fa, fb) = drop_degenerate_facets(&a, &b, 1e-6);
        assert_eq!(fa.nrows(), 1);
        assert_eq!(fb[0], 2.0);
    }

    fn box_polytope(n: usize) -> LowDimPolytope {
        let mut a = DMatrix::zeros(2 * n, n);
        let mut b = DVector::zeros(2 * n);
        for i in 0..n {
            a[(i, i)] = 1.0;
            b[i] = 1.0;
            a[(n + i, i)] = -1.0;
        }
        LowDimPolytope {
            A: a,
            b,
            Aeq: from_triplets(0, n, Vec::new()),
            beq: DVector::zeros(0),
        }
    }

    #[test]
    fn assembly_of_a_box_is_the_box_itself() {
        let low = box_polytope(3);
        let full = build_full_dim_polytope(&low, &PipelineSettings::default()).unwrap();

        assert_eq!(full.dim(), 3);
        assert_eq!(full.A.nrows(), 6);
        // With a trivial equality system the basis is the identity.
        assert_eq!(full.N, DMatrix::identity(3, 3));
        assert!(full.N_shift.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn assembly_is_deterministic() {
        let low = box_polytope(4);
        let settings = PipelineSettings::default();
        let first = build_full_dim_polytope(&low, &settings).unwrap();
        let second = build_full_dim_polytope(&low, &settings).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn one_dimensional_reduction_is_rejected() {
        // x0 = x1 leaves a single free direction.
        let low = LowDimPolytope {
            A: DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, -1.0]),
            b: DVector::from_vec(vec![5.0, 5.0, 0.0, 0.0]),
            Aeq: from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, -1.0)]),
            beq: DVector::zeros(1),
        };
        let err = build_full_dim_polytope(&low, &PipelineSettings::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateDimensionality(_)));
    }

    #[test]
    fn facet_rows_stay_above_threshold_after_assembly() {
        let low = box_polytope(4);
        let settings = PipelineSettings::default();
        let full = build_full_dim_polytope(&low, &settings).unwrap();
        for i in 0..full.A.nrows() {
            assert!(full.A.row(i).norm() >= settings.facet_tol);
        }
    }
}
