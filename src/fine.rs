//! Fine composite grid discretization of the analytic continuation kernel
//!
//! The kernel K(t, om) is resolved to double precision by composite
//! polynomial grids: dyadically refined Chebyshev panels in real frequency
//! and dyadically refined Gauss-Legendre panels in imaginary time. The
//! dyadic refinement toward the origin absorbs the square-root-like
//! behavior of K at (t, om) = (0, 0) and (1, 0) into order-p panels.

use ndarray::{s, Array1, Array2};
use num_complex::Complex64;

use crate::error::{DlrError, Result};
use crate::gauss::{legendre, BaryCheb, BaryLagrange};
use crate::kernel::{k_if, k_it};
use crate::traits::Statistic;

/// Parameters of the fine composite grid discretization
///
/// Panel counts and the imaginary-frequency truncation are derived from the
/// cutoff lambda; the defaults are chosen empirically to resolve the kernel
/// to double machine precision at panel order p = 24.
#[derive(Debug, Clone)]
pub struct FineParams {
    /// DLR cutoff parameter
    pub lambda: f64,
    /// Order of the composite polynomial grids
    pub p: usize,
    /// Imaginary-frequency truncation
    pub nmax: i64,
    /// Number of fine real-frequency panels on (0, lambda)
    pub npom: usize,
    /// Number of fine imaginary-time panels on (0, 1/2)
    pub npt: usize,
    /// Total number of fine real-frequency grid points
    pub nom: usize,
    /// Total number of fine imaginary-time grid points
    pub nt: usize,
}

impl FineParams {
    /// Fine grid parameters at the default panel order p = 24
    pub fn new(lambda: f64) -> Result<Self> {
        Self::with_order(lambda, 24)
    }

    pub fn with_order(lambda: f64, p: usize) -> Result<Self> {
        if lambda <= 0.0 {
            return Err(DlrError::InvalidParameter(
                "lambda must be positive".into(),
            ));
        }
        if p == 0 {
            return Err(DlrError::InvalidParameter("p must be positive".into()));
        }

        let nmax = (lambda.ceil() as i64).max(20);
        let log2_lambda = lambda.log2().ceil();
        let npom = (log2_lambda.max(1.0)) as usize;
        let npt = ((log2_lambda - 2.0).max(1.0)) as usize;

        Ok(Self {
            lambda,
            p,
            nmax,
            npom,
            npt,
            nom: 2 * p * npom,
            nt: 2 * p * npt,
        })
    }
}

/// Fine composite Chebyshev grid in real frequency
///
/// Dyadic panels refined toward 0 on (0, lambda), mirrored to (-lambda, 0);
/// grid points ascending.
pub fn build_rf_fine(fine: &FineParams) -> Array1<f64> {
    let p = fine.p;
    let npom = fine.npom;

    let bc = BaryCheb::new(p);
    // Chebyshev nodes mapped to [0, 1]
    let xc: Array1<f64> = bc.nodes().mapv(|x| (x + 1.0) / 2.0);

    let mut om = Array1::zeros(fine.nom);

    // Panels on (0, lambda)
    let mut a = 0.0;
    for i in 0..npom {
        let b = fine.lambda / 2.0f64.powi((npom - i - 1) as i32);
        for k in 0..p {
            om[(npom + i) * p + k] = a + (b - a) * xc[k];
        }
        a = b;
    }

    // Mirror to (-lambda, 0)
    for i in 0..npom * p {
        om[i] = -om[2 * npom * p - 1 - i];
    }

    om
}

/// Fine composite Gauss-Legendre grid in imaginary time, in relative format
///
/// Returns the grid points and the square roots of the panel-scaled
/// quadrature weights, so that Euclidean dot products on the weighted
/// kernel matrix approximate the L2 inner product in imaginary time.
pub fn build_it_fine(fine: &FineParams) -> (Array1<f64>, Array1<f64>) {
    let p = fine.p;
    let npt = fine.npt;

    let gl = legendre(p);
    // Gauss-Legendre nodes mapped to [0, 1]
    let xgl: Array1<f64> = gl.x.mapv(|x| (x + 1.0) / 2.0);

    let mut t = Array1::zeros(fine.nt);
    let mut w = Array1::zeros(fine.nt);

    // Panels on (0, 1/2)
    let mut a = 0.0;
    for i in 0..npt {
        let b = 1.0 / 2.0f64.powi((npt - i) as i32);
        for k in 0..p {
            t[i * p + k] = a + (b - a) * xgl[k];
            w[i * p + k] = (((b - a) / 2.0) * gl.w[k]).sqrt();
        }
        a = b;
    }

    // Panels on (1/2, 1) in relative format
    for j in 0..npt * p {
        t[npt * p + j] = -t[npt * p - 1 - j];
        w[npt * p + j] = w[npt * p - 1 - j];
    }

    (t, w)
}

/// Imaginary-time discretization of the kernel on the given grids
pub fn build_k_it_matrix(t: &Array1<f64>, om: &Array1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((t.len(), om.len()), |(i, j)| k_it(t[i], om[j]))
}

/// Imaginary-time kernel discretization with rows scaled by the quadrature
/// weight vector
pub fn build_k_it_weighted(
    t: &Array1<f64>,
    w: &Array1<f64>,
    om: &Array1<f64>,
) -> Array2<f64> {
    Array2::from_shape_fn((t.len(), om.len()), |(i, j)| w[i] * k_it(t[i], om[j]))
}

/// Imaginary-frequency discretization of the kernel up to the truncation
///
/// Fermionic rows run over n in [-nmax, nmax), bosonic rows over
/// [-nmax, nmax]; row i corresponds to Matsubara index i - nmax.
pub fn build_k_if_matrix(
    nmax: i64,
    om: &Array1<f64>,
    statistic: Statistic,
) -> Array2<Complex64> {
    let nrows = match statistic {
        Statistic::Fermion => 2 * nmax,
        Statistic::Boson => 2 * nmax + 1,
    } as usize;

    Array2::from_shape_fn((nrows, om.len()), |(i, j)| {
        k_if(i as i64 - nmax, om[j], statistic)
    })
}

/// Estimate the pointwise error of the fine kernel discretization
///
/// Interpolates the stored kernel matrix panel-wise onto grids with twice
/// the points per panel and compares against the exact kernel. Returns the
/// maximum relative error in the imaginary-time and real-frequency
/// directions.
pub fn fine_grid_error(
    fine: &FineParams,
    t: &Array1<f64>,
    om: &Array1<f64>,
    kmat: &Array2<f64>,
) -> Result<(f64, f64)> {
    let p = fine.p;
    let npt = fine.npt;
    let npom = fine.npom;
    let nt = fine.nt;
    let nom = fine.nom;

    if kmat.nrows() != nt || kmat.ncols() != nom {
        return Err(DlrError::DimensionMismatch(format!(
            "kernel matrix is {}x{}, expected {}x{}",
            kmat.nrows(),
            kmat.ncols(),
            nt,
            nom
        )));
    }

    // Test grids with double the points per panel; panel edges agree since
    // the panel counts depend only on lambda
    let fine2 = FineParams::with_order(fine.lambda, 2 * p)?;
    let (ttst, _) = build_it_fine(&fine2);
    let omtst = build_rf_fine(&fine2);
    let p2 = fine2.p;

    let bl = BaryLagrange::from_nodes(legendre(p).x.view());
    let bc = BaryCheb::new(p);
    let xl = legendre(p2).x;
    let xc = BaryCheb::new(p2).nodes().clone();

    // Imaginary-time discretization error, fixed frequency per column.
    // The first half of the grid suffices by the mirror symmetry.
    let mut errt = 0.0f64;
    for j in 0..nom {
        let mut errtmp = 0.0f64;
        for i in 0..npt {
            let panel = kmat.slice(s![i * p..(i + 1) * p, j]);
            for k in 0..p2 {
                let ktru = k_it(ttst[i * p2 + k], om[j]);
                let ktst = bl.interp(xl[k], panel);
                errtmp = errtmp.max((ktru - ktst).abs());
            }
        }
        let colmax = kmat
            .slice(s![.., j])
            .iter()
            .fold(0.0f64, |m, &v| m.max(v.abs()));
        errt = errt.max(errtmp / colmax);
    }

    // Real-frequency discretization error, fixed time per row
    let mut errom = 0.0f64;
    for i in 0..nt / 2 {
        let mut errtmp = 0.0f64;
        for j in 0..2 * npom {
            let panel = kmat.slice(s![i, j * p..(j + 1) * p]);
            for k in 0..p2 {
                let ktru = k_it(t[i], omtst[j * p2 + k]);
                let ktst = bc.interp(xc[k], panel);
                errtmp = errtmp.max((ktru - ktst).abs());
            }
        }
        let rowmax = kmat
            .slice(s![i, ..])
            .iter()
            .fold(0.0f64, |m, &v| m.max(v.abs()));
        errom = errom.max(errtmp / rowmax);
    }

    Ok((errt, errom))
}
