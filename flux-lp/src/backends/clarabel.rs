//! Interior-point backend built on the `clarabel` crate.
//!
//! Clarabel solves `min q·x  s.t.  Ax + s = b, s ∈ K`; the pipeline form is
//! translated by stacking the equality block into a zero cone, and the
//! inequality block plus all finite variable bounds into a nonnegative cone.
//! Maximization negates the objective on the way in and the optimum on the
//! way out.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};

use crate::sparse;
use crate::{Direction, LpProblem, LpResult, LpSolution, LpSolver, LpStatus};

/// Interior-point backend; compiled in only with the `clarabel` feature.
pub struct ClarabelBackend;

impl LpSolver for ClarabelBackend {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve(&self, problem: &LpProblem) -> LpResult<LpSolution> {
        problem.validate()?;

        let n = problem.num_vars();
        let meq = problem.Aeq.rows();

        // Finite variable bounds become inequality rows of the nonnegative
        // cone block; infinite bounds contribute nothing.
        let mut bound_triplets = Vec::new();
        let mut bound_rhs = Vec::new();
        for (j, &(lo, hi)) in problem.bounds.iter().enumerate() {
            if hi.is_finite() {
                bound_triplets.push((bound_rhs.len(), j, 1.0));
                bound_rhs.push(hi);
            }
            if lo.is_finite() {
                bound_triplets.push((bound_rhs.len(), j, -1.0));
                bound_rhs.push(-lo);
            }
        }
        let bounds_block = sparse::from_triplets(bound_rhs.len(), n, bound_triplets);

        let stacked = sparse::vstack(&sparse::vstack(&problem.Aeq, &problem.A), &bounds_block);
        let mut rhs = Vec::with_capacity(stacked.rows());
        rhs.extend_from_slice(&problem.beq);
        rhs.extend_from_slice(&problem.b);
        rhs.extend_from_slice(&bound_rhs);

        let m_nonneg = stacked.rows() - meq;
        let (indptr, indices, data) = stacked.into_raw_storage();
        let a = CscMatrix::new(rhs.len(), n, indptr, indices, data);

        let q: Vec<f64> = match problem.direction {
            Direction::Minimize => problem.objective.clone(),
            Direction::Maximize => problem.objective.iter().map(|&c| -c).collect(),
        };
        let p = CscMatrix::zeros((n, n));

        let cones = [
            SupportedConeT::ZeroConeT(meq),
            SupportedConeT::NonnegativeConeT(m_nonneg),
        ];

        let settings = DefaultSettings {
            verbose: false,
            ..DefaultSettings::default()
        };

        let mut solver = DefaultSolver::new(&p, &q, &a, &rhs, &cones, settings);
        solver.solve();

        let status = match solver.solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => LpStatus::Optimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                LpStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                LpStatus::Unbounded
            }
            other => LpStatus::SolverError(format!("{:?}", other)),
        };

        if status != LpStatus::Optimal {
            return Ok(LpSolution::status_only(status));
        }

        let x = solver.solution.x.clone();
        let objective = match problem.direction {
            Direction::Minimize => solver.solution.obj_val,
            Direction::Maximize => -solver.solution.obj_val,
        };
        Ok(LpSolution::optimal(x, objective))
    }
}
