//! Equality-system elimination via nullspace bases.
//!
//! Given `Aeq x = beq`, produce an orthonormal basis `N` of `ker(Aeq)` and a
//! minimum-norm particular solution `N_shift`, so that every feasible point
//! is `N y + N_shift` for a free `y` and the equality constraints disappear
//! from the polytope entirely.
//!
//! Two strategies:
//!
//! - [`NullspaceStrategy::Dense`] densifies the whole system and runs the
//!   SVD kernel extraction directly.
//! - [`NullspaceStrategy::Sparse`] exploits structure first: reactions that
//!   touch no equality row become unit basis vectors outright, structurally
//!   zero rows are pruned (after checking their right-hand side), and only
//!   the remaining compressed block reaches the factorization.
//!
//! Both satisfy `Aeq·N ≈ 0` and `Aeq·N_shift ≈ beq` within numerical
//! tolerance; a system with no free directions is a dimensionality failure.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use sprs::CsMat;

use flux_lp::sparse::spmv;

use crate::error::{PipelineError, PipelineResult};

/// Residual tolerance for the `Aeq·N_shift ≈ beq` consistency check.
const CONSISTENCY_TOL: f64 = 1e-6;

/// Strategy used to compute the nullspace transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullspaceStrategy {
    /// Densify and factor the full system.
    Dense,
    /// Prune structural zeros and free columns before factoring.
    #[default]
    Sparse,
}

/// The affine transform eliminating the equality constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)] // N, N_shift are the conventional names
pub struct Nullspace {
    /// Orthonormal kernel basis (n × k).
    pub N: DMatrix<f64>,

    /// Minimum-norm particular solution of `Aeq x = beq` (length n).
    pub N_shift: DVector<f64>,
}

impl Nullspace {
    /// Dimension of the reduced space.
    pub fn dim(&self) -> usize {
        self.N.ncols()
    }
}

/// Compute the nullspace transform for `Aeq x = beq`.
#[allow(non_snake_case)]
pub fn compute(
    Aeq: &CsMat<f64>,
    beq: &DVector<f64>,
    strategy: NullspaceStrategy,
) -> PipelineResult<Nullspace> {
    if Aeq.rows() != beq.len() {
        return Err(PipelineError::ShapeMismatch {
            context: "nullspace input",
            expected: format!("beq of length {}", Aeq.rows()),
            actual: format!("length {}", beq.len()),
        });
    }

    let result = match strategy {
        NullspaceStrategy::Dense => nullspace_dense(Aeq, beq),
        NullspaceStrategy::Sparse => nullspace_sparse(Aeq, beq),
    }?;

    if result.N.ncols() == 0 {
        return Err(PipelineError::DegenerateDimensionality(
            "the equality system has full column rank; no free directions remain".into(),
        ));
    }

    // The particular solution must actually solve the system; a residual
    // here means the equalities are mutually inconsistent.
    let mut product = vec![0.0; Aeq.rows()];
    spmv(Aeq, result.N_shift.as_slice(), &mut product);
    let residual = product
        .iter()
        .zip(beq.iter())
        .map(|(p, b)| (p - b).abs())
        .fold(0.0_f64, f64::max);
    let scale = 1.0 + beq.iter().fold(0.0_f64, |acc, b| acc.max(b.abs()));
    if residual > CONSISTENCY_TOL * scale {
        return Err(PipelineError::InfeasibleNetwork(format!(
            "the equality system is inconsistent (residual {:.3e})",
            residual
        )));
    }

    Ok(result)
}

fn nullspace_dense(aeq: &CsMat<f64>, beq: &DVector<f64>) -> PipelineResult<Nullspace> {
    let dense = to_dense(aeq);
    let (kernel, shift) = svd_kernel(&dense, beq)?;
    Ok(Nullspace {
        N: kernel,
        N_shift: shift,
    })
}

fn nullspace_sparse(aeq: &CsMat<f64>, beq: &DVector<f64>) -> PipelineResult<Nullspace> {
    let m = aeq.rows();
    let n = aeq.cols();

    let mut row_nnz = vec![0usize; m];
    let mut col_nnz = vec![0usize; n];
    for (&val, (row, col)) in aeq.iter() {
        if val != 0.0 {
            row_nnz[row] += 1;
            col_nnz[col] += 1;
        }
    }

    // A structurally zero row constrains nothing, but a nonzero right-hand
    // side on one is an outright contradiction.
    for (i, &nnz) in row_nnz.iter().enumerate() {
        if nnz == 0 && beq[i].abs() > CONSISTENCY_TOL {
            return Err(PipelineError::InfeasibleNetwork(format!(
                "equality row {} is empty but has right-hand side {}",
                i, beq[i]
            )));
        }
    }

    let kept_rows: Vec<usize> = (0..m).filter(|&i| row_nnz[i] > 0).collect();
    let kept_cols: Vec<usize> = (0..n).filter(|&j| col_nnz[j] > 0).collect();
    let free_cols: Vec<usize> = (0..n).filter(|&j| col_nnz[j] == 0).collect();

    // Columns untouched by any equality are free directions as-is.
    if kept_cols.is_empty() {
        let mut basis = DMatrix::zeros(n, free_cols.len());
        for (k, &j) in free_cols.iter().enumerate() {
            basis[(j, k)] = 1.0;
        }
        return Ok(Nullspace {
            N: basis,
            N_shift: DVector::zeros(n),
        });
    }

    let mut row_map = vec![usize::MAX; m];
    for (new, &old) in kept_rows.iter().enumerate() {
        row_map[old] = new;
    }
    let mut col_map = vec![usize::MAX; n];
    for (new, &old) in kept_cols.iter().enumerate() {
        col_map[old] = new;
    }

    let mut compressed = DMatrix::zeros(kept_rows.len(), kept_cols.len());
    for (&val, (row, col)) in aeq.iter() {
        if val != 0.0 {
            compressed[(row_map[row], col_map[col])] = val;
        }
    }
    let rhs = DVector::from_iterator(kept_rows.len(), kept_rows.iter().map(|&i| beq[i]));

    let (kernel_c, shift_c) = svd_kernel(&compressed, &rhs)?;

    // Scatter the compressed results back into full reaction space; the
    // free-column unit vectors and the factored block have disjoint support,
    // so the combined basis stays orthonormal.
    let k = free_cols.len() + kernel_c.ncols();
    let mut basis = DMatrix::zeros(n, k);
    for (idx, &j) in free_cols.iter().enumerate() {
        basis[(j, idx)] = 1.0;
    }
    for c in 0..kernel_c.ncols() {
        for (r, &j) in kept_cols.iter().enumerate() {
            basis[(j, free_cols.len() + c)] = kernel_c[(r, c)];
        }
    }

    let mut shift = DVector::zeros(n);
    for (r, &j) in kept_cols.iter().enumerate() {
        shift[j] = shift_c[r];
    }

    Ok(Nullspace {
        N: basis,
        N_shift: shift,
    })
}

/// SVD kernel extraction and minimum-norm solve.
///
/// An underdetermined system is padded with zero rows to square so the thin
/// SVD carries the complete right-singular basis; the padding changes
/// neither the kernel nor the singular values.
fn svd_kernel(
    a: &DMatrix<f64>,
    rhs: &DVector<f64>,
) -> PipelineResult<(DMatrix<f64>, DVector<f64>)> {
    let m = a.nrows();
    let n = a.ncols();

    let (work, padded_rhs) = if m < n {
        let mut w = DMatrix::zeros(n, n);
        w.view_mut((0, 0), (m, n)).copy_from(a);
        let mut r = DVector::zeros(n);
        r.rows_mut(0, m).copy_from(rhs);
        (w, r)
    } else {
        (a.clone(), rhs.clone())
    };

    let svd = work.svd(true, true);
    let u = svd.u.as_ref().ok_or_else(|| {
        PipelineError::DegenerateDimensionality("SVD failed to produce singular vectors".into())
    })?;
    let v_t = svd.v_t.as_ref().ok_or_else(|| {
        PipelineError::DegenerateDimensionality("SVD failed to produce singular vectors".into())
    })?;

    let sigma = &svd.singular_values;
    let sigma_max = sigma.iter().fold(0.0_f64, |acc, &s| acc.max(s));
    let tol = n.max(m) as f64 * f64::EPSILON * sigma_max.max(1.0);

    // Singular values come back sorted in decreasing order.
    let rank = sigma.iter().take_while(|&&s| s > tol).count();
    let kernel = v_t.rows(rank, n - rank).transpose();

    let mut shift = DVector::zeros(n);
    for i in 0..rank {
        let coeff = u.column(i).dot(&padded_rhs) / sigma[i];
        shift.axpy(coeff, &v_t.row(i).transpose(), 1.0);
    }

    Ok((kernel, shift))
}

fn to_dense(mat: &CsMat<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(mat.rows(), mat.cols());
    for (&val, (row, col)) in mat.iter() {
        dense[(row, col)] = val;
    }
    dense
}
