//! End-to-end orchestration: bounds → reduction → conditioning → ball gate.
//!
//! [`preprocess`] runs the strictly sequential pipeline and returns a
//! self-contained artifact; everything in it is an immutable value object,
//! so it can be serialized and reloaded to resume sampling without redoing
//! any of the preprocessing. The random walk itself lives behind the
//! [`SampleEngine`] seam — the pipeline hands it the reduced polytope, an
//! interior point, and opaque parameters, and maps the finished samples back
//! to steady states.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use flux_lp::solver_for;

use crate::ball::{self, ChebyshevBall};
use crate::error::{PipelineError, PipelineResult};
use crate::fva;
use crate::mapping;
use crate::model::FluxModel;
use crate::polytope::{self, FullDimPolytope};
use crate::settings::PipelineSettings;

/// Parameters passed through to the external sampling engine, uninterpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Target effective sample size.
    pub effective_sample_size: usize,
    /// Ask the engine to run its convergence diagnostic.
    pub convergence_check: bool,
    /// Allow the engine to parallelize its walks.
    pub parallel: bool,
    /// Worker thread count for a parallel engine.
    pub num_threads: usize,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            effective_sample_size: 1000,
            convergence_check: false,
            parallel: false,
            num_threads: 1,
        }
    }
}

/// The external geometry engine that performs the actual random walk.
///
/// The engine receives immutable data and returns a matrix with one sample
/// per column, in the reduced coordinates of the polytope it was given.
pub trait SampleEngine {
    /// Sample the polytope `{y : Ay ≤ b}` starting from `interior_point`.
    fn sample(
        &self,
        a: &DMatrix<f64>,
        b: &DVector<f64>,
        interior_point: &DVector<f64>,
        params: &SamplingParams,
    ) -> Result<DMatrix<f64>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Everything the sampler and the post-processing need, in one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessedPolytope {
    /// The full-dimensional polytope and its affine map to flux space.
    pub polytope: FullDimPolytope,
    /// Maximum inscribed ball; `ball.center` seeds the sampler.
    pub ball: ChebyshevBall,
    /// Minimum feasible flux per reaction, from the bounds solver.
    pub min_fluxes: DVector<f64>,
    /// Maximum feasible flux per reaction, from the bounds solver.
    pub max_fluxes: DVector<f64>,
}

/// Run the full preprocessing pipeline on a model.
///
/// Stages run strictly in sequence — flux bounds, nullspace reduction,
/// facet filtering, geometric scaling, the filter again, and the inscribed
/// ball LP as the final feasibility gate.
pub fn preprocess(
    model: &FluxModel,
    settings: &PipelineSettings,
) -> PipelineResult<PreprocessedPolytope> {
    settings.validate()?;
    model.validate()?;

    let solver = solver_for(settings.backend)?;
    if settings.verbose {
        println!("pipeline: using LP backend '{}'", solver.name());
    }

    let fva_result = fva::flux_variability(model, settings, solver.as_ref())?;
    let full = polytope::build_full_dim_polytope(&fva_result.polytope, settings)?;
    let ball = ball::max_inscribed_ball(&full.A, &full.b, settings.ball_radius_tol, solver.as_ref())?;

    if settings.verbose {
        println!(
            "pipeline: polytope is full-dimensional (inscribed ball radius {:.6e})",
            ball.radius
        );
    }

    Ok(PreprocessedPolytope {
        polytope: full,
        ball,
        min_fluxes: fva_result.min_fluxes,
        max_fluxes: fva_result.max_fluxes,
    })
}

impl PreprocessedPolytope {
    /// Sample the reduced polytope through `engine` and map the result back
    /// to steady-state fluxes.
    pub fn generate_steady_states<E: SampleEngine>(
        &self,
        engine: &E,
        params: &SamplingParams,
    ) -> PipelineResult<DMatrix<f64>> {
        let samples = engine
            .sample(&self.polytope.A, &self.polytope.b, &self.ball.center, params)
            .map_err(|e| PipelineError::Engine(e.to_string()))?;

        if samples.nrows() != self.polytope.dim() {
            return Err(PipelineError::ShapeMismatch {
                context: "engine samples",
                expected: format!("{} rows", self.polytope.dim()),
                actual: format!("{} rows", samples.nrows()),
            });
        }

        mapping::map_samples_to_steady_states(
            &samples,
            &self.polytope.N,
            &self.polytope.N_shift,
            None,
        )
    }
}
