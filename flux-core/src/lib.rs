//! Polytope preprocessing for metabolic flux sampling.
//!
//! A metabolic network's steady-state flux region
//! `{x : Sx = 0, lb ≤ x ≤ ub}` is a low-dimensional, often degenerate
//! polytope — unusable as-is for geometric random sampling. This crate
//! turns it into a well-conditioned, full-dimensional inequality polytope
//! together with the affine maps needed to translate sampled points back to
//! physically meaningful steady states:
//!
//! 1. **Flux bounds** — per-reaction min/max LPs tighten the bounds and
//!    detect fixed fluxes, which fold into the equality system.
//! 2. **Nullspace reduction** — the equality constraints vanish through an
//!    orthonormal kernel basis and a minimum-norm particular solution.
//! 3. **Facet filtering** — near-zero facet normals are dropped.
//! 4. **Geometric scaling** — iterative row/column conditioning, folded
//!    back into the reduction basis; the filter runs again afterwards.
//! 5. **Inscribed ball** — the Chebyshev center LP certifies that the
//!    reduced polytope has an interior and seeds the sampler.
//!
//! The random walk itself and the LP solver internals stay behind seams:
//! the [`pipeline::SampleEngine`] trait and the `flux-lp` backend contract.
//!
//! # Example
//!
//! ```ignore
//! use flux_core::{preprocess, FluxModel, PipelineSettings};
//!
//! let model = FluxModel::new(stoichiometry, lb, ub)?;
//! let artifact = preprocess(&model, &PipelineSettings::default())?;
//! let states = artifact.generate_steady_states(&engine, &params)?;
//! ```

#![warn(clippy::all)]

pub mod ball;
pub mod error;
pub mod fva;
pub mod mapping;
pub mod model;
pub mod nullspace;
pub mod pipeline;
pub mod polytope;
pub mod scaling;
pub mod settings;

pub use ball::ChebyshevBall;
pub use error::{PipelineError, PipelineResult};
pub use fva::{FbaResult, FvaResult};
pub use mapping::{map_samples_to_steady_states, AffineMap};
pub use model::FluxModel;
pub use nullspace::{Nullspace, NullspaceStrategy};
pub use pipeline::{preprocess, PreprocessedPolytope, SampleEngine, SamplingParams};
pub use polytope::{FullDimPolytope, LowDimPolytope};
pub use settings::PipelineSettings;
