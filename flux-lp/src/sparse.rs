//! Sparse matrix assembly helpers.
//!
//! Constraint systems are carried in CSC (Compressed Sparse Column) format;
//! these helpers cover the assembly patterns the pipeline needs: triplet
//! construction, vertical stacking, and matrix-vector products.

use sprs::{CsMat, TriMat};

/// Build a CSC matrix from `(row, col, value)` triplets.
pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> CsMat<f64>
where
    I: IntoIterator<Item = (usize, usize, f64)>,
{
    let mut tri = TriMat::new((nrows, ncols));
    for (i, j, v) in triplets {
        tri.add_triplet(i, j, v);
    }
    tri.to_csc()
}

/// Stack two sparse matrices vertically: `[A; B]`.
pub fn vstack(a: &CsMat<f64>, b: &CsMat<f64>) -> CsMat<f64> {
    assert_eq!(a.cols(), b.cols(), "matrices must have the same number of columns");

    let mut tri = TriMat::new((a.rows() + b.rows(), a.cols()));
    for (&val, (row, col)) in a.iter() {
        tri.add_triplet(row, col, val);
    }
    for (&val, (row, col)) in b.iter() {
        tri.add_triplet(row + a.rows(), col, val);
    }
    tri.to_csc()
}

/// Sparse matrix-vector product: `y = A * x`.
pub fn spmv(a: &CsMat<f64>, x: &[f64], y: &mut [f64]) {
    assert_eq!(a.cols(), x.len());
    assert_eq!(a.rows(), y.len());

    y.fill(0.0);
    for (&val, (row, col)) in a.iter() {
        y[row] += val * x[col];
    }
}
