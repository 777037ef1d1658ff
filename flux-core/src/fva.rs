//! Flux bound computation.
//!
//! Flux variability analysis solves two LPs per reaction — minimize and
//! maximize its flux over `{x : Sx = 0, lb ≤ x ≤ ub}` — and assembles the
//! low-dimensional polytope from the results. A reaction whose feasible
//! range is narrower than the fixed-flux tolerance is folded into the
//! equality system, which is what makes the later rank-deficient reduction
//! meaningful.
//!
//! With `opt_percentage < 100` the feasible region is first restricted to
//! `objective·x ≥ opt_percentage/100 · optimum`, where the optimum comes
//! from a flux balance solve; the restriction becomes one more facet of the
//! assembled polytope.

use nalgebra::{DMatrix, DVector};
use sprs::CsMat;

use flux_lp::{sparse, Direction, LpProblem, LpSolution, LpSolver, LpStatus};

use crate::error::{PipelineError, PipelineResult};
use crate::model::FluxModel;
use crate::polytope::LowDimPolytope;
use crate::settings::PipelineSettings;

/// Result of a flux balance solve.
#[derive(Debug, Clone)]
pub struct FbaResult {
    /// Optimal objective value.
    pub optimum: f64,
    /// One optimal flux vector.
    pub fluxes: DVector<f64>,
}

/// Result of flux variability analysis.
#[derive(Debug, Clone)]
pub struct FvaResult {
    /// Minimum feasible flux per reaction.
    pub min_fluxes: DVector<f64>,
    /// Maximum feasible flux per reaction.
    pub max_fluxes: DVector<f64>,
    /// The assembled low-dimensional polytope, fixed fluxes folded in.
    pub polytope: LowDimPolytope,
}

/// Maximize the model objective over the steady-state flux region.
pub fn flux_balance(model: &FluxModel, solver: &dyn LpSolver) -> PipelineResult<FbaResult> {
    model.validate()?;
    let objective = model.objective.as_ref().ok_or_else(|| {
        PipelineError::InvalidConfiguration("flux balance requires a model objective".into())
    })?;

    let n = model.num_reactions();
    let problem = LpProblem {
        direction: Direction::Maximize,
        objective: objective.iter().copied().collect(),
        A: sparse::from_triplets(0, n, Vec::new()),
        b: Vec::new(),
        Aeq: model.stoichiometry.clone(),
        beq: vec![0.0; model.num_metabolites()],
        bounds: variable_bounds(model),
    };

    let (x, optimum) = expect_optimal(solver.solve(&problem)?, "flux balance")?;
    Ok(FbaResult {
        optimum,
        fluxes: DVector::from_vec(x),
    })
}

/// Compute per-reaction flux bounds and assemble the low-dimensional
/// polytope.
pub fn flux_variability(
    model: &FluxModel,
    settings: &PipelineSettings,
    solver: &dyn LpSolver,
) -> PipelineResult<FvaResult> {
    model.validate()?;
    settings.validate()?;

    let n = model.num_reactions();
    let m = model.num_metabolites();

    // Optional restriction to the near-optimal region.
    let restriction = if settings.opt_percentage < 100.0 {
        let objective = model.objective.as_ref().ok_or_else(|| {
            PipelineError::InvalidConfiguration(
                "opt_percentage below 100 requires a model objective".into(),
            )
        })?;
        let fba = flux_balance(model, solver)?;
        let threshold = settings.opt_percentage / 100.0 * fba.optimum;
        Some((objective.clone(), threshold))
    } else {
        None
    };

    // objective·x ≥ threshold enters the inequality block as -objective·x ≤ -threshold.
    let (ineq, ineq_rhs) = match &restriction {
        Some((objective, threshold)) => {
            let triplets = objective
                .iter()
                .enumerate()
                .filter(|(_, &c)| c != 0.0)
                .map(|(j, &c)| (0, j, -c))
                .collect::<Vec<_>>();
            (sparse::from_triplets(1, n, triplets), vec![-threshold])
        }
        None => (sparse::from_triplets(0, n, Vec::new()), Vec::new()),
    };

    let bounds = variable_bounds(model);
    let mut min_fluxes = DVector::zeros(n);
    let mut max_fluxes = DVector::zeros(n);

    for i in 0..n {
        let mut objective = vec![0.0; n];
        objective[i] = 1.0;

        for direction in [Direction::Minimize, Direction::Maximize] {
            let problem = LpProblem {
                direction,
                objective: objective.clone(),
                A: ineq.clone(),
                b: ineq_rhs.clone(),
                Aeq: model.stoichiometry.clone(),
                beq: vec![0.0; m],
                bounds: bounds.clone(),
            };
            let context = match direction {
                Direction::Minimize => format!("minimizing flux of reaction {}", model.reaction_name(i)),
                Direction::Maximize => format!("maximizing flux of reaction {}", model.reaction_name(i)),
            };
            let (_, value) = expect_optimal(solver.solve(&problem)?, &context)?;
            match direction {
                Direction::Minimize => min_fluxes[i] = value,
                Direction::Maximize => max_fluxes[i] = value,
            }
        }
    }

    let polytope = assemble_low_dim_polytope(model, settings, &restriction, &min_fluxes, &max_fluxes);

    if settings.verbose {
        let fixed = (0..n)
            .filter(|&i| (max_fluxes[i] - min_fluxes[i]).abs() < settings.fixed_flux_tol)
            .count();
        println!(
            "fva: bounds for {} reactions computed, {} fixed fluxes folded into equalities",
            n, fixed
        );
    }

    Ok(FvaResult {
        min_fluxes,
        max_fluxes,
        polytope,
    })
}

/// Build `(A, b, Aeq, beq)` from the bound results.
///
/// `A` stacks ±identity bound rows (plus the near-optimality facet when a
/// restriction is active); reactions with a flux range below the fixed-flux
/// tolerance move into the equality system instead.
fn assemble_low_dim_polytope(
    model: &FluxModel,
    settings: &PipelineSettings,
    restriction: &Option<(DVector<f64>, f64)>,
    min_fluxes: &DVector<f64>,
    max_fluxes: &DVector<f64>,
) -> LowDimPolytope {
    let n = model.num_reactions();
    let m = model.num_metabolites();

    let extra = usize::from(restriction.is_some());
    let mut a = DMatrix::zeros(2 * n + extra, n);
    let mut b = DVector::zeros(2 * n + extra);
    for i in 0..n {
        a[(i, i)] = 1.0;
        b[i] = model.ub[i];
        a[(n + i, i)] = -1.0;
        b[n + i] = -model.lb[i];
    }
    if let Some((objective, threshold)) = restriction {
        for j in 0..n {
            a[(2 * n, j)] = -objective[j];
        }
        b[2 * n] = -threshold;
    }

    let mut fixed_triplets = Vec::new();
    let mut fixed_values = Vec::new();
    for i in 0..n {
        if (max_fluxes[i] - min_fluxes[i]).abs() < settings.fixed_flux_tol {
            fixed_triplets.push((fixed_values.len(), i, 1.0));
            fixed_values.push(min_fluxes[i].min(max_fluxes[i]));
        }
    }

    let fixed_rows: CsMat<f64> = sparse::from_triplets(fixed_values.len(), n, fixed_triplets);
    let aeq = sparse::vstack(&model.stoichiometry, &fixed_rows);
    let mut beq = DVector::zeros(m + fixed_values.len());
    for (idx, &v) in fixed_values.iter().enumerate() {
        beq[m + idx] = v;
    }

    LowDimPolytope {
        A: a,
        b,
        Aeq: aeq,
        beq,
    }
}

fn variable_bounds(model: &FluxModel) -> Vec<(f64, f64)> {
    model
        .lb
        .iter()
        .zip(model.ub.iter())
        .map(|(&lo, &hi)| (lo, hi))
        .collect()
}

/// Unpack an LP solution, translating non-optimal statuses into pipeline
/// failures.
fn expect_optimal(solution: LpSolution, context: &str) -> PipelineResult<(Vec<f64>, f64)> {
    match solution.status {
        LpStatus::Optimal => {
            let x = solution
                .x
                .ok_or_else(|| PipelineError::Solver(format!("{}: no point returned", context)))?;
            let objective = solution.objective.ok_or_else(|| {
                PipelineError::Solver(format!("{}: no objective returned", context))
            })?;
            Ok((x, objective))
        }
        LpStatus::Infeasible => Err(PipelineError::InfeasibleNetwork(format!(
            "{} is infeasible",
            context
        ))),
        LpStatus::Unbounded => Err(PipelineError::DegenerateDimensionality(format!(
            "{} is unbounded; the flux region is not a bounded polytope",
            context
        ))),
        LpStatus::SolverError(msg) => {
            Err(PipelineError::Solver(format!("{}: {}", context, msg)))
        }
    }
}
