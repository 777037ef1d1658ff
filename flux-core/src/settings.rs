//! Pipeline configuration.

use flux_lp::BackendChoice;

use crate::error::{PipelineError, PipelineResult};
use crate::nullspace::NullspaceStrategy;

/// Tunable parameters of the preprocessing pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// LP backend selection policy.
    pub backend: BackendChoice,

    /// Nullspace computation strategy.
    pub nullspace: NullspaceStrategy,

    /// Restrict flux bounds to the region where the model objective attains
    /// at least this percentage of its optimum. `100.0` disables the
    /// restriction; values below require the model to carry an objective.
    pub opt_percentage: f64,

    /// A reaction whose flux range is narrower than this is treated as fixed
    /// and folded into the equality system.
    pub fixed_flux_tol: f64,

    /// Inequality rows with Euclidean norm below this are dropped as
    /// numerically meaningless facets.
    pub facet_tol: f64,

    /// Geometric scaling stalls (and stops) once the per-pass improvement
    /// ratio exceeds this value.
    pub scaling_target_ratio: f64,

    /// Iteration cap for geometric scaling; hitting it before stalling is
    /// reported as non-convergence.
    pub scaling_max_passes: usize,

    /// Apply geometric scaling during assembly. Scaling only affects
    /// conditioning, never correctness, so it can be disabled outright.
    pub enable_scaling: bool,

    /// An inscribed-ball radius at or below this tolerance means the
    /// polytope has no usable interior.
    pub ball_radius_tol: f64,

    /// Print progress diagnostics to stdout.
    pub verbose: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        // FLUX_VERBOSE=1 turns on progress diagnostics without touching code.
        let verbose = std::env::var("FLUX_VERBOSE")
            .map(|s| s == "1")
            .unwrap_or(false);

        Self {
            backend: BackendChoice::default(),
            nullspace: NullspaceStrategy::default(),
            opt_percentage: 100.0,
            // The fixed-flux and facet thresholds look related but are
            // independent knobs; do not tie them together.
            fixed_flux_tol: 1e-7,
            facet_tol: 1e-6,
            scaling_target_ratio: 0.99,
            scaling_max_passes: 10,
            enable_scaling: true,
            ball_radius_tol: 1e-9,
            verbose,
        }
    }
}

impl PipelineSettings {
    /// Check that every parameter is inside its documented domain.
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.opt_percentage > 0.0 && self.opt_percentage <= 100.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "opt_percentage must lie in (0, 100], got {}",
                self.opt_percentage
            )));
        }
        if !(self.fixed_flux_tol > 0.0) || !(self.facet_tol > 0.0) {
            return Err(PipelineError::InvalidConfiguration(
                "tolerances must be strictly positive".into(),
            ));
        }
        if !(self.scaling_target_ratio > 0.0 && self.scaling_target_ratio < 1.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "scaling_target_ratio must lie in (0, 1), got {}",
                self.scaling_target_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PipelineSettings::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_opt_percentage() {
        let mut settings = PipelineSettings::default();
        settings.opt_percentage = 0.0;
        assert!(settings.validate().is_err());
        settings.opt_percentage = 120.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_degenerate_target_ratio() {
        let mut settings = PipelineSettings::default();
        settings.scaling_target_ratio = 1.0;
        assert!(settings.validate().is_err());
    }
}
