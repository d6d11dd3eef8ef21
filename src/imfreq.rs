//! DLR imaginary-frequency operations
//!
//! `ImFreqOps` owns the DLR Matsubara nodes for a given set of DLR
//! frequencies and the transformations between coefficients and values on
//! that grid. Imaginary-frequency values carry one factor of beta, per the
//! standard Matsubara convention; the beta factor is divided out on input
//! in `vals2coefs` and multiplied back on output in `coefs2vals`.
//!
//! In the symmetrized bosonic case the node set has r + 1 members and the
//! coefficient system is over-determined; it is solved in the least-squares
//! sense and no LU factorization is stored. The stored transformation
//! matrix has its columns scaled by tanh(om_j / 2), a basis change that
//! keeps the n = 0 value finite as om -> 0; the scaling is divided back out
//! so that coefficients are always expansion coefficients of the plain
//! kernel basis.

use ndarray::{Array1, Array2, ArrayD, ArrayView1, IxDyn};
use num_complex::Complex64;

use crate::error::{DlrError, Result};
use crate::fine::{build_k_if_matrix, FineParams};
use crate::kernel::k_if;
use crate::linalg::{getrf, getrs, gemm, lstsq, LuFactors};
use crate::pivrgs::{pivrgs, pivrgs_sym_rank};
use crate::traits::Statistic;

/// DLR imaginary-frequency transform operator
pub struct ImFreqOps {
    lambda: f64,
    statistic: Statistic,
    r: usize,
    /// Number of Matsubara nodes: r, or r + 1 for the symmetrized bosonic
    /// case
    niom: usize,
    symmetrized: bool,
    dlr_rf: Array1<f64>,
    /// DLR Matsubara node indices
    dlr_if: Vec<i64>,
    /// Coefficients -> values at the DLR Matsubara nodes
    cf2if: Array2<Complex64>,
    /// LU factors for the values -> coefficients direction; absent when the
    /// system is over-determined
    if2cf: Option<LuFactors<Complex64>>,
}

impl ImFreqOps {
    /// Build the imaginary-frequency operator for the given DLR frequencies
    pub fn new(lambda: f64, dlr_rf: ArrayView1<f64>, statistic: Statistic) -> Result<Self> {
        Self::build(lambda, dlr_rf, statistic, false)
    }

    /// Build with the n <-> -n symmetric node selection; expects
    /// frequencies from the symmetrized basis construction
    pub fn new_symmetrized(
        lambda: f64,
        dlr_rf: ArrayView1<f64>,
        statistic: Statistic,
    ) -> Result<Self> {
        Self::build(lambda, dlr_rf, statistic, true)
    }

    fn build(
        lambda: f64,
        dlr_rf: ArrayView1<f64>,
        statistic: Statistic,
        symmetrize: bool,
    ) -> Result<Self> {
        let r = dlr_rf.len();
        if r == 0 {
            return Err(DlrError::InvalidParameter(
                "empty DLR frequency set".into(),
            ));
        }
        let rf = dlr_rf.to_owned();

        let nmax = FineParams::new(lambda)?.nmax;
        let kmat = build_k_if_matrix(nmax, &rf, statistic);

        // The symmetrized bosonic node set keeps n <-> -n symmetry with the
        // n = 0 node included, which takes one extra row
        let niom = if symmetrize && statistic.is_boson() {
            r + 1
        } else {
            r
        };

        let (_q, _norms, mut piv) = if symmetrize {
            pivrgs_sym_rank(&kmat, niom)
        } else {
            pivrgs(&kmat, 1e-100)
        };
        if piv.len() != niom {
            return Err(DlrError::DegenerateNodes(format!(
                "imaginary-frequency node selection returned {} of {} nodes",
                piv.len(),
                niom
            )));
        }
        piv.sort_unstable();

        let dlr_if: Vec<i64> = piv.iter().map(|&p| p as i64 - nmax).collect();
        let mut cf2if = Array2::from_shape_fn((niom, r), |(i, j)| kmat[[piv[i], j]]);

        let overdetermined = symmetrize && statistic.is_boson();
        if overdetermined {
            for j in 0..r {
                let th = (rf[j] / 2.0).tanh();
                for i in 0..niom {
                    cf2if[[i, j]] = cf2if[[i, j]] * th;
                }
            }
        }

        let if2cf = if overdetermined {
            None
        } else {
            Some(getrf(cf2if.clone())?)
        };

        Ok(Self {
            lambda,
            statistic,
            r,
            niom,
            symmetrized: symmetrize,
            dlr_rf: rf,
            dlr_if,
            cf2if,
            if2cf,
        })
    }

    /// Reassemble an operator from its persisted parts
    pub fn from_parts(
        lambda: f64,
        statistic: Statistic,
        dlr_rf: Array1<f64>,
        dlr_if: Vec<i64>,
        cf2if: Array2<Complex64>,
        if2cf: Option<(Array2<Complex64>, Vec<usize>)>,
    ) -> Result<Self> {
        let r = dlr_rf.len();
        let niom = dlr_if.len();
        if r == 0 || niom < r || cf2if.dim() != (niom, r) {
            return Err(DlrError::FormatMismatch(
                "inconsistent imaginary-frequency operator fields".into(),
            ));
        }
        let if2cf = match if2cf {
            Some((lu, piv)) => {
                if lu.dim() != (r, r) || piv.len() != r || niom != r {
                    return Err(DlrError::FormatMismatch(
                        "inconsistent LU fields".into(),
                    ));
                }
                Some(LuFactors { lu, piv })
            }
            None => {
                if niom != r + 1 {
                    return Err(DlrError::FormatMismatch(
                        "missing LU factors for a square node set".into(),
                    ));
                }
                None
            }
        };
        Ok(Self {
            lambda,
            statistic,
            r,
            niom,
            symmetrized: niom != r,
            dlr_rf,
            dlr_if,
            cf2if,
            if2cf,
        })
    }

    /// Transform values on the DLR Matsubara grid to DLR coefficients
    ///
    /// The beta factor carried by imaginary-frequency values is divided out
    /// on input. In the over-determined symmetrized-bosonic case the solve
    /// is least-squares and the output leading dimension is r rather than
    /// the node count r + 1.
    pub fn vals2coefs(&self, beta: f64, g: &ArrayD<Complex64>) -> Result<ArrayD<Complex64>> {
        check_beta(beta)?;
        if g.ndim() == 0 || g.shape()[0] != self.niom {
            return Err(DlrError::DimensionMismatch(format!(
                "leading dimension {:?} does not match node count {}",
                g.shape().first(),
                self.niom
            )));
        }
        let nrhs = g.len() / self.niom;

        let b = Array2::from_shape_vec(
            (self.niom, nrhs),
            g.iter().map(|&v| v / beta).collect(),
        )
        .expect("multi-RHS reshape");

        let c = match &self.if2cf {
            Some(f) => {
                let mut x = b;
                getrs(f, &mut x);
                x
            }
            None => {
                // Least-squares in the tanh-scaled basis, then back to plain
                // kernel coefficients
                let mut x = lstsq(&self.cf2if, &b)?;
                for j in 0..self.r {
                    let th = (self.dlr_rf[j] / 2.0).tanh();
                    for col in 0..nrhs {
                        x[[j, col]] = x[[j, col]] * th;
                    }
                }
                x
            }
        };

        let mut shape = g.shape().to_vec();
        shape[0] = self.r;
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), c.into_raw_vec())
            .expect("restore array shape"))
    }

    /// Transform DLR coefficients to values on the DLR Matsubara grid
    ///
    /// The output carries one factor of beta; its leading dimension is the
    /// node count (r + 1 in the symmetrized bosonic case).
    pub fn coefs2vals(&self, beta: f64, c: &ArrayD<Complex64>) -> Result<ArrayD<Complex64>> {
        check_beta(beta)?;
        self.check_leading_r(c)?;
        let nrhs = c.len() / self.r;

        let mut c2 = Array2::from_shape_vec((self.r, nrhs), c.iter().cloned().collect())
            .expect("multi-RHS reshape");
        if self.if2cf.is_none() {
            for j in 0..self.r {
                let th = (self.dlr_rf[j] / 2.0).tanh();
                for col in 0..nrhs {
                    c2[[j, col]] = c2[[j, col]] / th;
                }
            }
        }

        let mut vals = gemm(&self.cf2if, &c2);
        for v in vals.iter_mut() {
            *v = *v * beta;
        }

        let mut shape = c.shape().to_vec();
        shape[0] = self.niom;
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), vals.into_raw_vec())
            .expect("restore array shape"))
    }

    /// Evaluate the DLR expansion at an arbitrary Matsubara index; the
    /// leading axis is contracted out
    pub fn coefs2eval(
        &self,
        beta: f64,
        c: &ArrayD<Complex64>,
        n: i64,
    ) -> Result<ArrayD<Complex64>> {
        check_beta(beta)?;
        self.check_leading_r(c)?;
        let nrhs = c.len() / self.r;

        let c2 = Array2::from_shape_vec((self.r, nrhs), c.iter().cloned().collect())
            .expect("multi-RHS reshape");
        let kvec = self.build_evalvec(beta, n);

        let mut out = vec![Complex64::new(0.0, 0.0); nrhs];
        for l in 0..self.r {
            let kl = kvec[l];
            for (j, o) in out.iter_mut().enumerate() {
                *o += kl * c2[[l, j]];
            }
        }
        Ok(ArrayD::from_shape_vec(IxDyn(&c.shape()[1..]), out)
            .expect("trailing-shape array"))
    }

    /// Evaluate a scalar-valued DLR expansion at a Matsubara index
    pub fn coefs2eval_scalar(
        &self,
        beta: f64,
        c: ArrayView1<Complex64>,
        n: i64,
    ) -> Result<Complex64> {
        check_beta(beta)?;
        if c.len() != self.r {
            return Err(DlrError::DimensionMismatch(format!(
                "coefficient vector has length {}, expected DLR rank {}",
                c.len(),
                self.r
            )));
        }
        let kvec = self.build_evalvec(beta, n);
        let mut acc = Complex64::new(0.0, 0.0);
        for l in 0..self.r {
            acc += kvec[l] * c[l];
        }
        Ok(acc)
    }

    /// Kernel column vector beta * K(i nu_n, om_l) at a Matsubara index
    pub fn build_evalvec(&self, beta: f64, n: i64) -> Array1<Complex64> {
        Array1::from_shape_fn(self.r, |l| {
            k_if(n, self.dlr_rf[l], self.statistic) * beta
        })
    }

    /// DLR Matsubara node indices
    pub fn get_ifnodes(&self) -> &[i64] {
        &self.dlr_if
    }

    /// DLR real-frequency nodes
    pub fn get_rfnodes(&self) -> &Array1<f64> {
        &self.dlr_rf
    }

    /// Coefficients -> values transformation matrix
    pub fn get_cf2if(&self) -> &Array2<Complex64> {
        &self.cf2if
    }

    /// Packed LU factors of the values -> coefficients transformation, if
    /// the node set is square
    pub fn get_if2cf_lu(&self) -> Option<&Array2<Complex64>> {
        self.if2cf.as_ref().map(|f| &f.lu)
    }

    /// LU pivots of the values -> coefficients transformation, if present
    pub fn get_if2cf_piv(&self) -> Option<&[usize]> {
        self.if2cf.as_ref().map(|f| f.piv.as_slice())
    }

    /// DLR rank
    pub fn rank(&self) -> usize {
        self.r
    }

    /// Number of Matsubara nodes
    pub fn nnodes(&self) -> usize {
        self.niom
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    pub fn is_symmetrized(&self) -> bool {
        self.symmetrized
    }

    fn check_leading_r(&self, c: &ArrayD<Complex64>) -> Result<()> {
        if c.ndim() == 0 || c.shape()[0] != self.r {
            return Err(DlrError::DimensionMismatch(format!(
                "leading dimension {:?} does not match DLR rank {}",
                c.shape().first(),
                self.r
            )));
        }
        Ok(())
    }
}

fn check_beta(beta: f64) -> Result<()> {
    if beta <= 0.0 {
        return Err(DlrError::InvalidParameter(format!(
            "beta must be positive, got {}",
            beta
        )));
    }
    Ok(())
}
