//! Uniform linear-programming contract for the flux sampling pipeline.
//!
//! The preprocessing pipeline never talks to an LP library directly. Every
//! solve goes through the [`LpSolver`] trait and the canonical problem form
//!
//! ```text
//! minimize / maximize   objective · x
//! subject to            A x   ≤ b
//!                       Aeq x = beq
//!                       lo ≤ x ≤ hi   (componentwise, ±∞ allowed)
//! ```
//!
//! Two backends implement the contract:
//!
//! - [`backends::MicrolpBackend`] — a pure-Rust simplex solver, always
//!   available; the default.
//! - `backends::ClarabelBackend` — an interior-point solver, compiled in
//!   only with the `clarabel` cargo feature.
//!
//! Backend selection is explicit configuration via [`BackendChoice`]. Whether
//! a backend is compiled into the current build is a queryable capability
//! ([`Backend::is_available`]), never an implicit probe: pinning an absent
//! backend is a hard [`LpError::BackendUnavailable`], while [`BackendChoice::Auto`]
//! degrades to the default backend.

#![warn(clippy::all)]

pub mod backends;
pub mod sparse;

use sprs::CsMat;
use thiserror::Error;

/// Errors raised by the LP layer itself.
///
/// Infeasibility and unboundedness are *results*, not errors; they are
/// reported through [`LpStatus`] so callers can react to them as
/// mathematical outcomes.
#[derive(Debug, Error)]
pub enum LpError {
    /// Problem dimensions are inconsistent.
    #[error("inconsistent LP dimensions: {0}")]
    Shape(String),

    /// The requested backend is not compiled into this build.
    #[error("LP backend {0:?} is not available in this build")]
    BackendUnavailable(Backend),
}

/// Result type for LP-layer operations.
pub type LpResult<T> = Result<T, LpError>;

/// Optimization direction of the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Minimize `objective · x`.
    Minimize,
    /// Maximize `objective · x`.
    Maximize,
}

/// A linear program in the canonical pipeline form.
#[derive(Debug, Clone)]
#[allow(non_snake_case)] // A, Aeq are standard mathematical notation
pub struct LpProblem {
    /// Objective direction.
    pub direction: Direction,

    /// Objective coefficients (length n).
    pub objective: Vec<f64>,

    /// Inequality constraint matrix, `A x ≤ b`.
    pub A: CsMat<f64>,

    /// Inequality right-hand side (length = rows of `A`).
    pub b: Vec<f64>,

    /// Equality constraint matrix, `Aeq x = beq`.
    pub Aeq: CsMat<f64>,

    /// Equality right-hand side (length = rows of `Aeq`).
    pub beq: Vec<f64>,

    /// Per-variable bounds `(lo, hi)`; use `f64::NEG_INFINITY` /
    /// `f64::INFINITY` for free variables.
    pub bounds: Vec<(f64, f64)>,
}

impl LpProblem {
    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }

    /// Check that all matrix and vector dimensions are conformant.
    pub fn validate(&self) -> LpResult<()> {
        let n = self.num_vars();

        if self.bounds.len() != n {
            return Err(LpError::Shape(format!(
                "bounds has length {}, expected {}",
                self.bounds.len(),
                n
            )));
        }
        if self.A.cols() != n {
            return Err(LpError::Shape(format!(
                "A has {} cols, expected {}",
                self.A.cols(),
                n
            )));
        }
        if self.A.rows() != self.b.len() {
            return Err(LpError::Shape(format!(
                "A has {} rows but b has length {}",
                self.A.rows(),
                self.b.len()
            )));
        }
        if self.Aeq.cols() != n {
            return Err(LpError::Shape(format!(
                "Aeq has {} cols, expected {}",
                self.Aeq.cols(),
                n
            )));
        }
        if self.Aeq.rows() != self.beq.len() {
            return Err(LpError::Shape(format!(
                "Aeq has {} rows but beq has length {}",
                self.Aeq.rows(),
                self.beq.len()
            )));
        }
        Ok(())
    }
}

/// Outcome classification of an LP solve.
#[derive(Debug, Clone, PartialEq)]
pub enum LpStatus {
    /// An optimal solution was found.
    Optimal,
    /// The constraint system admits no solution.
    Infeasible,
    /// The objective is unbounded over the feasible region.
    Unbounded,
    /// The backend failed for a reason other than the problem's geometry.
    SolverError(String),
}

/// Solution returned by a backend.
///
/// `x` and `objective` are populated only when `status` is
/// [`LpStatus::Optimal`].
#[derive(Debug, Clone)]
pub struct LpSolution {
    /// Outcome classification.
    pub status: LpStatus,
    /// Optimal point, if one was found.
    pub x: Option<Vec<f64>>,
    /// Objective value at `x`, in the requested direction.
    pub objective: Option<f64>,
}

impl LpSolution {
    pub(crate) fn optimal(x: Vec<f64>, objective: f64) -> Self {
        Self {
            status: LpStatus::Optimal,
            x: Some(x),
            objective: Some(objective),
        }
    }

    pub(crate) fn status_only(status: LpStatus) -> Self {
        Self {
            status,
            x: None,
            objective: None,
        }
    }
}

/// The uniform solver contract consumed by the pipeline.
pub trait LpSolver {
    /// Human-readable backend name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Solve the given problem.
    ///
    /// `Err` is reserved for malformed input or backend infrastructure
    /// faults; mathematical outcomes (including infeasibility) come back as
    /// an `Ok` solution with the corresponding [`LpStatus`].
    fn solve(&self, problem: &LpProblem) -> LpResult<LpSolution>;
}

/// The closed set of LP backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Pure-Rust simplex (`microlp`); always compiled in.
    Simplex,
    /// Interior-point method (`clarabel`); requires the `clarabel` feature.
    InteriorPoint,
}

impl Backend {
    /// Whether this backend is compiled into the current build.
    pub fn is_available(self) -> bool {
        match self {
            Backend::Simplex => true,
            Backend::InteriorPoint => cfg!(feature = "clarabel"),
        }
    }
}

/// Backend selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendChoice {
    /// Prefer the interior-point backend when compiled in, otherwise use the
    /// simplex backend.
    #[default]
    Auto,
    /// Use exactly this backend; fail if it is not available.
    Pinned(Backend),
}

/// Instantiate the solver for a selection policy.
///
/// `Auto` silently degrades to the simplex backend when the interior-point
/// backend is compiled out; a pinned backend that is unavailable is an error.
pub fn solver_for(choice: BackendChoice) -> LpResult<Box<dyn LpSolver>> {
    match choice {
        BackendChoice::Auto => {
            if Backend::InteriorPoint.is_available() {
                instantiate(Backend::InteriorPoint)
            } else {
                instantiate(Backend::Simplex)
            }
        }
        BackendChoice::Pinned(backend) => {
            if !backend.is_available() {
                return Err(LpError::BackendUnavailable(backend));
            }
            instantiate(backend)
        }
    }
}

fn instantiate(backend: Backend) -> LpResult<Box<dyn LpSolver>> {
    match backend {
        Backend::Simplex => Ok(Box::new(backends::MicrolpBackend)),
        #[cfg(feature = "clarabel")]
        Backend::InteriorPoint => Ok(Box::new(backends::ClarabelBackend)),
        #[cfg(not(feature = "clarabel"))]
        Backend::InteriorPoint => Err(LpError::BackendUnavailable(backend)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplex_is_always_available() {
        assert!(Backend::Simplex.is_available());
        let solver = solver_for(BackendChoice::Pinned(Backend::Simplex)).unwrap();
        assert_eq!(solver.name(), "microlp");
    }

    #[cfg(not(feature = "clarabel"))]
    #[test]
    fn pinned_missing_backend_is_an_error() {
        let err = solver_for(BackendChoice::Pinned(Backend::InteriorPoint)).err().unwrap();
        assert!(matches!(err, LpError::BackendUnavailable(Backend::InteriorPoint)));
    }

    #[cfg(not(feature = "clarabel"))]
    #[test]
    fn auto_degrades_to_simplex() {
        let solver = solver_for(BackendChoice::Auto).unwrap();
        assert_eq!(solver.name(), "microlp");
    }

    #[test]
    fn validate_rejects_mismatched_bounds() {
        let problem = LpProblem {
            direction: Direction::Minimize,
            objective: vec![1.0, 1.0],
            A: sparse::from_triplets(0, 2, Vec::new()),
            b: Vec::new(),
            Aeq: sparse::from_triplets(0, 2, Vec::new()),
            beq: Vec::new(),
            bounds: vec![(0.0, 1.0)],
        };
        assert!(matches!(problem.validate(), Err(LpError::Shape(_))));
    }

    #[test]
    fn validate_rejects_mismatched_rhs() {
        let problem = LpProblem {
            direction: Direction::Minimize,
            objective: vec![1.0],
            A: sparse::from_triplets(2, 1, vec![(0, 0, 1.0), (1, 0, -1.0)]),
            b: vec![1.0],
            Aeq: sparse::from_triplets(0, 1, Vec::new()),
            beq: Vec::new(),
            bounds: vec![(0.0, 1.0)],
        };
        assert!(matches!(problem.validate(), Err(LpError::Shape(_))));
    }
}
