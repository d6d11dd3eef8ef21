//! DLR basis construction: selection of the real-frequency nodes

use log::warn;
use ndarray::Array1;

use crate::error::{DlrError, Result};
use crate::fine::{build_it_fine, build_k_it_weighted, build_rf_fine, FineParams};
use crate::pivrgs::{pivrgs, pivrgs_sym};

/// Construct the DLR real-frequency nodes for a cutoff and tolerance
///
/// Discretizes the analytic continuation kernel on the fine composite
/// grids, with rows scaled by the square-root quadrature weights so that
/// the Gram-Schmidt dot products approximate the L2 inner product in
/// imaginary time, and runs the pivoted Gram-Schmidt over the frequency
/// columns. The selected columns, sorted ascending, are the DLR
/// frequencies.
pub fn build_dlr_rf(lambda: f64, eps: f64) -> Result<Array1<f64>> {
    build_dlr_rf_symmetrized(lambda, eps, false)
}

/// DLR real-frequency nodes, optionally with the om <-> -om symmetric
/// selection
pub fn build_dlr_rf_symmetrized(
    lambda: f64,
    eps: f64,
    symmetrize: bool,
) -> Result<Array1<f64>> {
    if !(eps > 0.0 && eps < 1.0) {
        return Err(DlrError::InvalidParameter(format!(
            "eps must lie in (0, 1), got {}",
            eps
        )));
    }
    if eps <= 1e-14 {
        warn!(
            "DLR frequency selection may fail for eps = {} near or below \
             machine precision; consider increasing eps",
            eps
        );
    }
    if lambda >= 1e5 {
        warn!("DLR construction at lambda = {} may take a while", lambda);
    }

    let fine = FineParams::new(lambda)?;
    let (t, w) = build_it_fine(&fine);
    let om = build_rf_fine(&fine);

    let kmat = build_k_it_weighted(&t, &w, &om);
    let at = kmat.t().to_owned();

    let (_q, norms, mut piv) = if symmetrize {
        pivrgs_sym(&at, eps)
    } else {
        pivrgs(&at, eps)
    };
    let r = norms.len();
    if r == 0 {
        return Err(DlrError::DegenerateNodes(
            "frequency selection returned an empty node set".into(),
        ));
    }
    piv.sort_unstable();

    Ok(Array1::from_shape_fn(r, |i| om[piv[i]]))
}
