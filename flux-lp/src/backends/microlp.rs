//! Simplex backend built on the `microlp` crate.

use microlp::{ComparisonOp, OptimizationDirection, Problem, Variable};

use crate::{Direction, LpProblem, LpResult, LpSolution, LpSolver, LpStatus};

/// Pure-Rust simplex backend; the default for every pipeline LP.
pub struct MicrolpBackend;

impl LpSolver for MicrolpBackend {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, problem: &LpProblem) -> LpResult<LpSolution> {
        problem.validate()?;

        let direction = match problem.direction {
            Direction::Minimize => OptimizationDirection::Minimize,
            Direction::Maximize => OptimizationDirection::Maximize,
        };

        let mut lp = Problem::new(direction);
        let vars: Vec<Variable> = problem
            .objective
            .iter()
            .zip(problem.bounds.iter())
            .map(|(&coeff, &(lo, hi))| lp.add_var(coeff, (lo, hi)))
            .collect();

        if let Some(status) = add_rows(&mut lp, &vars, problem, ComparisonOp::Eq) {
            return Ok(LpSolution::status_only(status));
        }
        if let Some(status) = add_rows(&mut lp, &vars, problem, ComparisonOp::Le) {
            return Ok(LpSolution::status_only(status));
        }

        match lp.solve() {
            Ok(solution) => {
                let x = vars.iter().map(|&v| solution[v]).collect();
                Ok(LpSolution::optimal(x, solution.objective()))
            }
            Err(microlp::Error::Infeasible) => {
                Ok(LpSolution::status_only(LpStatus::Infeasible))
            }
            Err(microlp::Error::Unbounded) => {
                Ok(LpSolution::status_only(LpStatus::Unbounded))
            }
            Err(other) => Ok(LpSolution::status_only(LpStatus::SolverError(
                other.to_string(),
            ))),
        }
    }
}

/// Add the equality or inequality block row by row.
///
/// Structurally empty rows never reach microlp: an empty row whose
/// right-hand side already rules out any solution short-circuits with the
/// infeasible status, all other empty rows are vacuous and skipped.
fn add_rows(
    lp: &mut Problem,
    vars: &[Variable],
    problem: &LpProblem,
    op: ComparisonOp,
) -> Option<LpStatus> {
    let (matrix, rhs) = match op {
        ComparisonOp::Eq => (&problem.Aeq, &problem.beq),
        _ => (&problem.A, &problem.b),
    };

    let mut rows: Vec<Vec<(Variable, f64)>> = vec![Vec::new(); matrix.rows()];
    for (&val, (row, col)) in matrix.iter() {
        if val != 0.0 {
            rows[row].push((vars[col], val));
        }
    }

    for (row, expr) in rows.into_iter().enumerate() {
        if expr.is_empty() {
            let violated = match op {
                ComparisonOp::Eq => rhs[row].abs() > 1e-12,
                _ => rhs[row] < -1e-12,
            };
            if violated {
                return Some(LpStatus::Infeasible);
            }
            continue;
        }
        lp.add_constraint(expr, op, rhs[row]);
    }
    None
}
