//! End-to-end tests for the preprocessing pipeline.

use nalgebra::{DMatrix, DVector};

use flux_core::{
    preprocess, FluxModel, PipelineError, PipelineSettings, SampleEngine, SamplingParams,
};
use flux_lp::sparse::{from_triplets, spmv};

/// Deterministic stand-in for the external geometry engine: emits the seed
/// point plus one point per axis, stepped halfway to the nearest facet, so
/// every sample is strictly interior to the polytope it was given.
struct BallGridEngine;

impl SampleEngine for BallGridEngine {
    fn sample(
        &self,
        a: &DMatrix<f64>,
        b: &DVector<f64>,
        interior_point: &DVector<f64>,
        _params: &SamplingParams,
    ) -> Result<DMatrix<f64>, Box<dyn std::error::Error + Send + Sync>> {
        let dim = a.ncols();
        let mut samples = DMatrix::zeros(dim, dim + 1);
        for col in 0..=dim {
            for row in 0..dim {
                samples[(row, col)] = interior_point[row];
            }
        }
        for axis in 0..dim {
            let mut t_max = f64::INFINITY;
            for i in 0..a.nrows() {
                let dir = a[(i, axis)];
                if dir > 0.0 {
                    let slack = b[i] - a.row(i).transpose().dot(interior_point);
                    t_max = t_max.min(slack / dir);
                }
            }
            let step = if t_max.is_finite() { 0.5 * t_max } else { 0.1 };
            samples[(axis, axis + 1)] += step;
        }
        Ok(samples)
    }
}

/// Engine that reports a failure.
struct FailingEngine;

impl SampleEngine for FailingEngine {
    fn sample(
        &self,
        _a: &DMatrix<f64>,
        _b: &DVector<f64>,
        _interior_point: &DVector<f64>,
        _params: &SamplingParams,
    ) -> Result<DMatrix<f64>, Box<dyn std::error::Error + Send + Sync>> {
        Err("walk diverged".into())
    }
}

/// Engine that returns samples of the wrong dimension.
struct WrongShapeEngine;

impl SampleEngine for WrongShapeEngine {
    fn sample(
        &self,
        a: &DMatrix<f64>,
        _b: &DVector<f64>,
        _interior_point: &DVector<f64>,
        _params: &SamplingParams,
    ) -> Result<DMatrix<f64>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(DMatrix::zeros(a.ncols() + 1, 3))
    }
}

fn box_model(n: usize) -> FluxModel {
    FluxModel::new(
        from_triplets(0, n, Vec::new()),
        DVector::from_element(n, 0.0),
        DVector::from_element(n, 1.0),
    )
    .unwrap()
}

fn branching_model() -> FluxModel {
    // M0: r0 -> r1 + r2;  M1: r1 -> r3. Rank 2 over 4 reactions.
    let s = from_triplets(
        2,
        4,
        vec![
            (0, 0, 1.0),
            (0, 1, -1.0),
            (0, 2, -1.0),
            (1, 1, 1.0),
            (1, 3, -1.0),
        ],
    );
    FluxModel::new(
        s,
        DVector::from_element(4, 0.0),
        DVector::from_element(4, 10.0),
    )
    .unwrap()
}

#[test]
fn two_reaction_chain_is_degenerate() {
    // x0 = x1 leaves one free direction; sampling needs at least two.
    let s = from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, -1.0)]);
    let model = FluxModel::new(
        s,
        DVector::from_element(2, 0.0),
        DVector::from_element(2, 5.0),
    )
    .unwrap();

    let err = preprocess(&model, &PipelineSettings::default()).unwrap_err();
    assert!(
        matches!(err, PipelineError::DegenerateDimensionality(_)),
        "got {:?}",
        err
    );
}

#[test]
fn unit_box_preprocesses_to_its_own_geometry() {
    let artifact = preprocess(&box_model(5), &PipelineSettings::default()).unwrap();

    for i in 0..5 {
        assert!(artifact.min_fluxes[i].abs() < 1e-9);
        assert!((artifact.max_fluxes[i] - 1.0).abs() < 1e-9);
    }
    assert_eq!(artifact.polytope.dim(), 5);
    assert_eq!(artifact.polytope.A.nrows(), 10);

    assert!((artifact.ball.radius - 0.5).abs() < 1e-6);
    for i in 0..5 {
        assert!((artifact.ball.center[i] - 0.5).abs() < 1e-6);
    }
}

#[test]
fn preprocessing_is_idempotent() {
    let model = branching_model();
    let settings = PipelineSettings::default();

    let first = preprocess(&model, &settings).unwrap();
    let second = preprocess(&model, &settings).unwrap();

    assert_eq!(first, second);
}

#[test]
fn sampled_points_map_to_steady_states() {
    let model = branching_model();
    let artifact = preprocess(&model, &PipelineSettings::default()).unwrap();

    let states = artifact
        .generate_steady_states(&BallGridEngine, &SamplingParams::default())
        .unwrap();

    assert_eq!(states.nrows(), 4);
    assert_eq!(states.ncols(), artifact.polytope.dim() + 1);

    for col in 0..states.ncols() {
        let x: Vec<f64> = states.column(col).iter().copied().collect();

        // Mass balance holds on every mapped point.
        let mut residual = vec![0.0; model.num_metabolites()];
        spmv(&model.stoichiometry, &x, &mut residual);
        for r in &residual {
            assert!(r.abs() < 1e-8, "steady-state residual {} in column {}", r, col);
        }

        // Flux bounds hold within tolerance.
        for (i, &v) in x.iter().enumerate() {
            assert!(
                v >= model.lb[i] - 1e-6 && v <= model.ub[i] + 1e-6,
                "flux {} = {} escapes its bounds in column {}",
                i,
                v,
                col
            );
        }
    }
}

#[test]
fn engine_failure_surfaces_as_an_engine_error() {
    let artifact = preprocess(&box_model(3), &PipelineSettings::default()).unwrap();
    let err = artifact
        .generate_steady_states(&FailingEngine, &SamplingParams::default())
        .unwrap_err();
    assert!(matches!(err, PipelineError::Engine(_)));
}

#[test]
fn misshapen_samples_are_rejected() {
    let artifact = preprocess(&box_model(3), &PipelineSettings::default()).unwrap();
    let err = artifact
        .generate_steady_states(&WrongShapeEngine, &SamplingParams::default())
        .unwrap_err();
    assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
}

#[test]
fn artifact_survives_serialization() {
    let artifact = preprocess(&branching_model(), &PipelineSettings::default()).unwrap();

    let blob = serde_json::to_string(&artifact).unwrap();
    let reloaded: flux_core::PreprocessedPolytope = serde_json::from_str(&blob).unwrap();

    assert_eq!(artifact, reloaded);

    // Resuming from the reloaded artifact produces identical steady states.
    let params = SamplingParams::default();
    let a = artifact
        .generate_steady_states(&BallGridEngine, &params)
        .unwrap();
    let b = reloaded
        .generate_steady_states(&BallGridEngine, &params)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn disabling_scaling_still_yields_a_valid_polytope() {
    let settings = PipelineSettings {
        enable_scaling: false,
        ..PipelineSettings::default()
    };
    let artifact = preprocess(&branching_model(), &settings).unwrap();
    assert!(artifact.ball.radius > 0.0);
}
