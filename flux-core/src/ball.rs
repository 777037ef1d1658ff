//! Maximum inscribed ball (Chebyshev center) of the reduced polytope.
//!
//! One LP over the variables `(c, r)`:
//!
//! ```text
//! maximize   r
//! subject to A[i,:]·c + r·‖A[i,:]‖₂ ≤ b[i]   for every facet i
//! ```
//!
//! The optimum is simultaneously the feasibility certificate for the
//! reduced polytope and the interior seed point handed to the sampler: a
//! radius at or below tolerance means the polytope has no interior.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use flux_lp::{sparse, Direction, LpProblem, LpSolver, LpStatus};

use crate::error::{PipelineError, PipelineResult};

/// Center and radius of the largest ball inscribed in `{y : Ay ≤ b}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChebyshevBall {
    /// Ball center; an interior point of the polytope.
    pub center: DVector<f64>,
    /// Ball radius; strictly positive for a full-dimensional polytope.
    pub radius: f64,
}

/// Compute the maximum inscribed ball of `{y : Ay ≤ b}`.
#[allow(non_snake_case)]
pub fn max_inscribed_ball(
    A: &DMatrix<f64>,
    b: &DVector<f64>,
    radius_tol: f64,
    solver: &dyn LpSolver,
) -> PipelineResult<ChebyshevBall> {
    if A.nrows() != b.len() {
        return Err(PipelineError::ShapeMismatch {
            context: "ball LP input",
            expected: format!("b of length {}", A.nrows()),
            actual: format!("length {}", b.len()),
        });
    }

    let m = A.nrows();
    let k = A.ncols();

    // Variables are (c_0, ..., c_{k-1}, r); the extra column carries the
    // facet norms so each row reads A[i,:]·c + r·‖A[i,:]‖ ≤ b[i].
    let mut triplets = Vec::new();
    for i in 0..m {
        for j in 0..k {
            let v = A[(i, j)];
            if v != 0.0 {
                triplets.push((i, j, v));
            }
        }
        triplets.push((i, k, A.row(i).norm()));
    }

    let mut objective = vec![0.0; k + 1];
    objective[k] = 1.0;

    let problem = LpProblem {
        direction: Direction::Maximize,
        objective,
        A: sparse::from_triplets(m, k + 1, triplets),
        b: b.iter().copied().collect(),
        Aeq: sparse::from_triplets(0, k + 1, Vec::new()),
        beq: Vec::new(),
        bounds: vec![(f64::NEG_INFINITY, f64::INFINITY); k + 1],
    };

    let solution = solver.solve(&problem)?;
    match solution.status {
        LpStatus::Optimal => {}
        LpStatus::Unbounded => {
            return Err(PipelineError::DegenerateDimensionality(
                "the reduced polytope is unbounded; the inscribed ball radius diverges".into(),
            ));
        }
        LpStatus::Infeasible => {
            // With r free this LP always has feasible points; reaching here
            // means the backend went wrong, not the geometry.
            return Err(PipelineError::Solver(
                "ball LP reported infeasible".into(),
            ));
        }
        LpStatus::SolverError(msg) => return Err(PipelineError::Solver(msg)),
    }

    let x = solution
        .x
        .ok_or_else(|| PipelineError::Solver("optimal ball LP returned no point".into()))?;
    let radius = x[k];
    if radius <= radius_tol {
        return Err(PipelineError::NonFullDimensional { radius });
    }

    Ok(ChebyshevBall {
        center: DVector::from_iterator(k, x[..k].iter().copied()),
        radius,
    })
}
