//! Error types for the preprocessing pipeline.

use flux_lp::LpError;
use thiserror::Error;

/// Errors raised by the polytope preprocessing pipeline.
///
/// Every variant aborts the pipeline; the one recoverable condition
/// (geometric scaling failing to converge) never surfaces here — it is
/// absorbed by the assembler, which falls back to the unscaled system.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No flux vector satisfies the stoichiometric and bound constraints.
    #[error("infeasible network: {0}")]
    InfeasibleNetwork(String),

    /// The equality system left fewer than two free directions, or the
    /// assembled polytope violated its shape invariants.
    #[error("degenerate dimensionality: {0}")]
    DegenerateDimensionality(String),

    /// The reduction was structurally consistent but the reduced polytope
    /// has no interior.
    #[error("the reduced polytope is not full-dimensional (inscribed ball radius {radius:.3e})")]
    NonFullDimensional {
        /// Radius reported by the ball LP.
        radius: f64,
    },

    /// Two objects expected to be conformant disagree on their dimensions.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Operation that detected the mismatch.
        context: &'static str,
        /// Expected dimension description.
        expected: String,
        /// Observed dimension description.
        actual: String,
    },

    /// A model or settings value is out of its documented domain.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The LP backend failed for a reason unrelated to the problem geometry.
    #[error("LP solver failure: {0}")]
    Solver(String),

    /// The external sampling engine reported a failure.
    #[error("sampling engine failed: {0}")]
    Engine(String),

    /// Error from the LP layer (backend selection or malformed LP input).
    #[error(transparent)]
    Lp(#[from] LpError),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
