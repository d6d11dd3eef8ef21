//! Dyson equation solver in imaginary time
//!
//! Solves G = G0 + G0 * Sigma * G on the DLR imaginary-time grid, where *
//! is the imaginary-time convolution. The equation is assembled in DLR
//! value space as (I - M(G0) M(Sigma)) G = G0 with M the value-space
//! convolution matrix; matrix-valued Green's functions expand the r x r
//! blocks into an (r n) x (r n) system over the orbital index.

use ndarray::{Array2, ArrayD, IxDyn};

use crate::error::{DlrError, Result};
use crate::imtime::ImTimeOps;
use crate::linalg::{eye, gemm, getrf, getrs, Scalar};
use crate::traits::Statistic;

/// Solve the Dyson equation from values of G0 and Sigma on the DLR
/// imaginary-time grid; returns the values of G on the same grid
pub fn solve_dyson_it<T: Scalar>(
    beta: f64,
    itops: &ImTimeOps,
    statistic: Statistic,
    g0: &ArrayD<T>,
    sigma: &ArrayD<T>,
) -> Result<ArrayD<T>> {
    if g0.shape() != sigma.shape() {
        return Err(DlrError::DimensionMismatch(format!(
            "G0 shape {:?} and Sigma shape {:?} differ",
            g0.shape(),
            sigma.shape()
        )));
    }
    let r = itops.rank();
    let n = match g0.ndim() {
        1 => 1,
        3 => {
            if g0.shape()[1] != g0.shape()[2] {
                return Err(DlrError::DimensionMismatch(
                    "matrix-valued Green's functions must have square trailing shape"
                        .into(),
                ));
            }
            g0.shape()[1]
        }
        d => {
            return Err(DlrError::DimensionMismatch(format!(
                "Dyson solver expects rank-1 or rank-3 value arrays, got rank {}",
                d
            )))
        }
    };

    let g0c = itops.vals2coefs(beta, g0)?;
    let sigc = itops.vals2coefs(beta, sigma)?;
    let mg0 = itops.convmat(beta, statistic, &g0c)?;
    let msig = itops.convmat(beta, statistic, &sigc)?;

    let dim = r * n;
    let prod = gemm(&mg0, &msig);
    let mut a = eye::<T>(dim);
    for i in 0..dim {
        for j in 0..dim {
            a[[i, j]] = a[[i, j]] - prod[[i, j]];
        }
    }
    let f = getrf(a).map_err(|_| {
        DlrError::DegenerateNodes("singular Dyson system matrix".into())
    })?;

    // Right-hand side: G0 values with the (node, row-orbital) pair flattened
    let mut b: Array2<T> = Array2::zeros((dim, n));
    if n == 1 {
        for i in 0..r {
            b[[i, 0]] = g0[[i]];
        }
    } else {
        for i in 0..r {
            for p in 0..n {
                for q in 0..n {
                    b[[i * n + p, q]] = g0[[i, p, q]];
                }
            }
        }
    }
    getrs(&f, &mut b);

    let mut out = ArrayD::zeros(IxDyn(g0.shape()));
    if n == 1 {
        for i in 0..r {
            out[[i]] = b[[i, 0]];
        }
    } else {
        for i in 0..r {
            for p in 0..n {
                for q in 0..n {
                    out[[i, p, q]] = b[[i * n + p, q]];
                }
            }
        }
    }
    Ok(out)
}
