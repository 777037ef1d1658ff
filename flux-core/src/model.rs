//! Metabolic network input to the pipeline.

use nalgebra::DVector;
use sprs::CsMat;

use crate::error::{PipelineError, PipelineResult};

/// A metabolic network in the form the pipeline consumes: a stoichiometric
/// matrix, per-reaction flux bounds, and optional metadata.
///
/// Name lists are pass-through metadata; they are carried for the caller's
/// benefit (error messages, reporting) and never enter any computation.
#[derive(Debug, Clone)]
pub struct FluxModel {
    /// Stoichiometric matrix `S` (metabolites × reactions).
    pub stoichiometry: CsMat<f64>,

    /// Lower flux bound per reaction.
    pub lb: DVector<f64>,

    /// Upper flux bound per reaction.
    pub ub: DVector<f64>,

    /// Reaction identifiers; empty or one per reaction.
    pub reactions: Vec<String>,

    /// Metabolite identifiers; empty or one per metabolite.
    pub metabolites: Vec<String>,

    /// Optional objective coefficients (e.g. a biomass reaction indicator),
    /// one per reaction.
    pub objective: Option<DVector<f64>>,
}

impl FluxModel {
    /// Build a model from the stoichiometric system, without metadata.
    pub fn new(
        stoichiometry: CsMat<f64>,
        lb: DVector<f64>,
        ub: DVector<f64>,
    ) -> PipelineResult<Self> {
        let model = Self {
            stoichiometry,
            lb,
            ub,
            reactions: Vec::new(),
            metabolites: Vec::new(),
            objective: None,
        };
        model.validate()?;
        Ok(model)
    }

    /// Attach reaction and metabolite names.
    pub fn with_names(
        mut self,
        reactions: Vec<String>,
        metabolites: Vec<String>,
    ) -> PipelineResult<Self> {
        self.reactions = reactions;
        self.metabolites = metabolites;
        self.validate()?;
        Ok(self)
    }

    /// Attach an objective vector.
    pub fn with_objective(mut self, objective: DVector<f64>) -> PipelineResult<Self> {
        self.objective = Some(objective);
        self.validate()?;
        Ok(self)
    }

    /// Number of reactions (columns of `S`).
    pub fn num_reactions(&self) -> usize {
        self.stoichiometry.cols()
    }

    /// Number of metabolites (rows of `S`).
    pub fn num_metabolites(&self) -> usize {
        self.stoichiometry.rows()
    }

    /// Name of reaction `i`, falling back to its index.
    pub fn reaction_name(&self, i: usize) -> String {
        self.reactions
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("#{}", i))
    }

    /// Check bound ordering and dimension conformance.
    pub fn validate(&self) -> PipelineResult<()> {
        let n = self.num_reactions();
        if n == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "the model has no reactions".into(),
            ));
        }
        if self.lb.len() != n || self.ub.len() != n {
            return Err(PipelineError::ShapeMismatch {
                context: "model bounds",
                expected: format!("lb and ub of length {}", n),
                actual: format!("lb: {}, ub: {}", self.lb.len(), self.ub.len()),
            });
        }
        for i in 0..n {
            if self.lb[i] > self.ub[i] {
                return Err(PipelineError::InvalidConfiguration(format!(
                    "reaction {} has lb {} > ub {}",
                    self.reaction_name(i),
                    self.lb[i],
                    self.ub[i]
                )));
            }
        }
        if !self.reactions.is_empty() && self.reactions.len() != n {
            return Err(PipelineError::ShapeMismatch {
                context: "reaction names",
                expected: format!("{} entries", n),
                actual: format!("{} entries", self.reactions.len()),
            });
        }
        if !self.metabolites.is_empty() && self.metabolites.len() != self.num_metabolites() {
            return Err(PipelineError::ShapeMismatch {
                context: "metabolite names",
                expected: format!("{} entries", self.num_metabolites()),
                actual: format!("{} entries", self.metabolites.len()),
            });
        }
        if let Some(ref objective) = self.objective {
            if objective.len() != n {
                return Err(PipelineError::ShapeMismatch {
                    context: "model objective",
                    expected: format!("length {}", n),
                    actual: format!("length {}", objective.len()),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_lp::sparse::from_triplets;

    fn chain_model() -> FluxModel {
        // Two reactions through one metabolite: r0 produces, r1 consumes.
        let s = from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, -1.0)]);
        FluxModel::new(s, DVector::from_element(2, 0.0), DVector::from_element(2, 5.0)).unwrap()
    }

    #[test]
    fn accepts_a_well_formed_model() {
        let model = chain_model();
        assert_eq!(model.num_reactions(), 2);
        assert_eq!(model.num_metabolites(), 1);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let s = from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, -1.0)]);
        let err = FluxModel::new(
            s,
            DVector::from_vec(vec![0.0, 3.0]),
            DVector::from_vec(vec![5.0, 1.0]),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_wrong_name_count() {
        let err = chain_model()
            .with_names(vec!["r0".into()], Vec::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }

    #[test]
    fn rejects_wrong_objective_length() {
        let err = chain_model()
            .with_objective(DVector::from_vec(vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }
}
