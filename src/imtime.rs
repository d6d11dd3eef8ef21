//! DLR imaginary-time operations
//!
//! `ImTimeOps` owns the DLR imaginary-time grid for a given set of DLR
//! frequencies, the coefficient-to-value transformation matrix with its LU
//! factors, and the induced operations: transforms, pointwise evaluation,
//! reflection, inner products, and imaginary-time convolution.
//!
//! The first dimension of all Green's function and coefficient arrays must
//! be the DLR rank r; trailing dimensions are carried through untouched.

use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView1, IxDyn};
use once_cell::sync::OnceCell;

use crate::error::{DlrError, Result};
use crate::fine::{build_it_fine, build_k_it_matrix, FineParams};
use crate::kernel::{k_it, k_it_abs, rel2abs};
use crate::linalg::{getrf, getrs_re, gemm, gemm_re, lu_inverse, LuFactors, Scalar};
use crate::pivrgs::{pivrgs, pivrgs_sym};
use crate::traits::Statistic;

/// DLR imaginary-time transform operator
///
/// Immutable after construction; all operations are pure and the lazily
/// built reflection, inner-product, and convolution tables are write-once.
pub struct ImTimeOps {
    lambda: f64,
    r: usize,
    dlr_rf: Array1<f64>,
    /// DLR imaginary-time nodes in relative format
    dlr_it: Array1<f64>,
    /// Coefficients -> values at the DLR imaginary-time nodes
    cf2it: Array2<f64>,
    /// LU factors of cf2it, for the values -> coefficients direction
    it2cf: LuFactors<f64>,
    /// Values -> reflected values, built on first use
    refl: OnceCell<Array2<f64>>,
    /// Kernel Gram matrix for inner products, built on first use
    ipmat: OnceCell<Array2<f64>>,
    /// Convolution tensors per statistic, built on first use
    convtens_fermion: OnceCell<Array3<f64>>,
    convtens_boson: OnceCell<Array3<f64>>,
}

impl ImTimeOps {
    /// Build the imaginary-time operator for the given DLR frequencies
    pub fn new(lambda: f64, dlr_rf: ArrayView1<f64>) -> Result<Self> {
        Self::build(lambda, dlr_rf, false)
    }

    /// Build with the mirror-symmetric node selection; expects frequencies
    /// from the symmetrized basis construction
    pub fn new_symmetrized(lambda: f64, dlr_rf: ArrayView1<f64>) -> Result<Self> {
        Self::build(lambda, dlr_rf, true)
    }

    fn build(lambda: f64, dlr_rf: ArrayView1<f64>, symmetrize: bool) -> Result<Self> {
        let r = dlr_rf.len();
        if r == 0 {
            return Err(DlrError::InvalidParameter(
                "empty DLR frequency set".into(),
            ));
        }

        let fine = FineParams::new(lambda)?;
        let (t, _w) = build_it_fine(&fine);
        let rf = dlr_rf.to_owned();

        // Kernel on the fine imaginary-time grid at the DLR frequencies.
        // The rank is already fixed by the frequency set, so the pivoted
        // Gram-Schmidt runs with a tolerance far below machine precision
        // and only guards against pathological input.
        let kmat = build_k_it_matrix(&t, &rf);
        let (_q, _norms, mut piv) = if symmetrize {
            pivrgs_sym(&kmat, 1e-100)
        } else {
            pivrgs(&kmat, 1e-100)
        };
        if piv.len() != r {
            return Err(DlrError::DegenerateNodes(format!(
                "imaginary-time node selection returned {} of {} nodes",
                piv.len(),
                r
            )));
        }
        piv.sort_unstable();

        let dlr_it = Array1::from_shape_fn(r, |i| t[piv[i]]);
        let cf2it = Array2::from_shape_fn((r, r), |(i, j)| kmat[[piv[i], j]]);
        let it2cf = getrf(cf2it.clone())?;

        Ok(Self {
            lambda,
            r,
            dlr_rf: rf,
            dlr_it,
            cf2it,
            it2cf,
            refl: OnceCell::new(),
            ipmat: OnceCell::new(),
            convtens_fermion: OnceCell::new(),
            convtens_boson: OnceCell::new(),
        })
    }

    /// Reassemble an operator from its persisted parts
    pub fn from_parts(
        lambda: f64,
        dlr_rf: Array1<f64>,
        dlr_it: Array1<f64>,
        cf2it: Array2<f64>,
        it2cf_lu: Array2<f64>,
        it2cf_piv: Vec<usize>,
    ) -> Result<Self> {
        let r = dlr_rf.len();
        if r == 0
            || dlr_it.len() != r
            || cf2it.dim() != (r, r)
            || it2cf_lu.dim() != (r, r)
            || it2cf_piv.len() != r
        {
            return Err(DlrError::FormatMismatch(
                "inconsistent imaginary-time operator fields".into(),
            ));
        }
        Ok(Self {
            lambda,
            r,
            dlr_rf,
            dlr_it,
            cf2it,
            it2cf: LuFactors {
                lu: it2cf_lu,
                piv: it2cf_piv,
            },
            refl: OnceCell::new(),
            ipmat: OnceCell::new(),
            convtens_fermion: OnceCell::new(),
            convtens_boson: OnceCell::new(),
        })
    }

    /// Transform values on the DLR imaginary-time grid to DLR coefficients
    ///
    /// Imaginary-time values carry no beta factor, so beta only gets
    /// validated here.
    pub fn vals2coefs<T: Scalar>(&self, beta: f64, g: &ArrayD<T>) -> Result<ArrayD<T>> {
        check_beta(beta)?;
        let nrhs = self.check_leading(g)?;

        let mut b = to_matrix(g, self.r, nrhs);
        getrs_re(&self.it2cf, &mut b);
        Ok(from_matrix(b, g.shape()))
    }

    /// Transform DLR coefficients to values on the DLR imaginary-time grid
    pub fn coefs2vals<T: Scalar>(&self, beta: f64, c: &ArrayD<T>) -> Result<ArrayD<T>> {
        check_beta(beta)?;
        let nrhs = self.check_leading(c)?;

        let c2 = to_matrix(c, self.r, nrhs);
        let vals = gemm_re(&self.cf2it, &c2);
        Ok(from_matrix(vals, c.shape()))
    }

    /// Evaluate the DLR expansion at an imaginary-time point in relative
    /// format; the leading axis is contracted out
    pub fn coefs2eval<T: Scalar>(&self, beta: f64, c: &ArrayD<T>, t: f64) -> Result<ArrayD<T>> {
        check_beta(beta)?;
        let nrhs = self.check_leading(c)?;

        let c2 = to_matrix(c, self.r, nrhs);
        let kvec = self.build_evalvec(t);

        let mut out = vec![T::zero(); nrhs];
        for l in 0..self.r {
            let kl = kvec[l];
            for (j, o) in out.iter_mut().enumerate() {
                *o = *o + c2[[l, j]].mul_re(kl);
            }
        }
        Ok(ArrayD::from_shape_vec(IxDyn(&c.shape()[1..]), out)
            .expect("trailing-shape array"))
    }

    /// Evaluate a scalar-valued DLR expansion at an imaginary-time point
    pub fn coefs2eval_scalar<T: Scalar>(
        &self,
        beta: f64,
        c: ArrayView1<T>,
        t: f64,
    ) -> Result<T> {
        check_beta(beta)?;
        if c.len() != self.r {
            return Err(DlrError::DimensionMismatch(format!(
                "coefficient vector has length {}, expected DLR rank {}",
                c.len(),
                self.r
            )));
        }
        let kvec = self.build_evalvec(t);
        let mut acc = T::zero();
        for l in 0..self.r {
            acc = acc + c[l].mul_re(kvec[l]);
        }
        Ok(acc)
    }

    /// Kernel column vector K(t, om_l) at an imaginary-time point in
    /// relative format
    pub fn build_evalvec(&self, t: f64) -> Array1<f64> {
        if t >= 0.0 {
            Array1::from_shape_fn(self.r, |l| k_it_abs(t, self.dlr_rf[l]))
        } else {
            Array1::from_shape_fn(self.r, |l| k_it_abs(-t, -self.dlr_rf[l]))
        }
    }

    /// Values of G(beta - tau) on the DLR imaginary-time grid
    ///
    /// In relative format the reflection is the involution t -> -t on the
    /// node set; it is applied as a fixed r x r matrix acting on DLR
    /// coefficients, assembled on first use.
    pub fn reflect<T: Scalar>(&self, beta: f64, g: &ArrayD<T>) -> Result<ArrayD<T>> {
        check_beta(beta)?;
        let nrhs = self.check_leading(g)?;

        let refl = self.refl.get_or_init(|| {
            let kref = Array2::from_shape_fn((self.r, self.r), |(i, j)| {
                k_it(-self.dlr_it[i], self.dlr_rf[j])
            });
            gemm(&kref, &lu_inverse(&self.it2cf))
        });

        let g2 = to_matrix(g, self.r, nrhs);
        let out = gemm_re(refl, &g2);
        Ok(from_matrix(out, g.shape()))
    }

    /// Inner product int_0^1 conj(f(t)) g(t) dt of two DLR expansions given
    /// by their coefficient vectors (dimensionless time)
    pub fn innerprod<T: Scalar>(&self, fc: ArrayView1<T>, gc: ArrayView1<T>) -> Result<T> {
        if fc.len() != self.r || gc.len() != self.r {
            return Err(DlrError::DimensionMismatch(format!(
                "coefficient vectors have lengths {} and {}, expected {}",
                fc.len(),
                gc.len(),
                self.r
            )));
        }

        let ip = self.ipmat.get_or_init(|| {
            Array2::from_shape_fn((self.r, self.r), |(j, k)| {
                ip_entry(self.dlr_rf[j], self.dlr_rf[k])
            })
        });

        let mut acc = T::zero();
        for j in 0..self.r {
            let fj = fc[j].conj();
            for k in 0..self.r {
                acc = acc + (fj * gc[k]).mul_re(ip[[j, k]]);
            }
        }
        Ok(acc)
    }

    /// Convolution tensor T with h_i = beta * sum_jk T[i,j,k] f_j g_k
    ///
    /// Entries are the exact convolution integrals of kernel pairs,
    /// evaluated at the DLR imaginary-time nodes; the diagonal j = k is the
    /// confluent limit of the divided-difference form. Built once per
    /// statistic and cached.
    pub fn convtens(&self, statistic: Statistic) -> &Array3<f64> {
        let cell = match statistic {
            Statistic::Fermion => &self.convtens_fermion,
            Statistic::Boson => &self.convtens_boson,
        };
        cell.get_or_init(|| self.build_convtens(statistic))
    }

    fn build_convtens(&self, statistic: Statistic) -> Array3<f64> {
        let r = self.r;
        let rf = &self.dlr_rf;
        let mut tens = Array3::zeros((r, r, r));

        for i in 0..r {
            let t_rel = self.dlr_it[i];
            let t_abs = rel2abs(t_rel);
            for j in 0..r {
                let oj = rf[j];
                let kij = k_it(t_rel, oj);
                let k1j = k_it_abs(1.0, oj);
                for k in 0..r {
                    let ok = rf[k];
                    tens[[i, j, k]] = if j == k {
                        match statistic {
                            Statistic::Fermion => kij * (t_abs - k1j),
                            Statistic::Boson => {
                                let th = (oj / 2.0).tanh();
                                let sech2 = 1.0 - th * th;
                                kij * (th * (t_abs - k1j) + 0.5 * sech2)
                            }
                        }
                    } else {
                        let kik = k_it(t_rel, ok);
                        match statistic {
                            Statistic::Fermion => (kik - kij) / (oj - ok),
                            Statistic::Boson => {
                                ((oj / 2.0).tanh() * kik - (ok / 2.0).tanh() * kij)
                                    / (oj - ok)
                            }
                        }
                    };
                }
            }
        }
        tens
    }

    /// Value-space convolution matrix M(f): values of f * g on the DLR
    /// grid are M(f) applied to the values of g
    ///
    /// `fc` holds DLR coefficients of f, either a vector (scalar-valued) or
    /// an [r, n, n] array (matrix-valued); the result is r x r or the
    /// block-expanded (r n) x (r n).
    pub fn convmat<T: Scalar>(
        &self,
        beta: f64,
        statistic: Statistic,
        fc: &ArrayD<T>,
    ) -> Result<Array2<T>> {
        check_beta(beta)?;
        self.check_leading(fc)?;
        let r = self.r;
        let tens = self.convtens(statistic);
        let v2c = lu_inverse(&self.it2cf);

        // Scalar block: beta * (sum_j T[.,j,.] f_j) * (values -> coefficients)
        let scalar_block = |f: &dyn Fn(usize) -> T| -> Array2<T> {
            let mut a: Array2<T> = Array2::zeros((r, r));
            for i in 0..r {
                for j in 0..r {
                    let fj = f(j);
                    if fj != T::zero() {
                        for k in 0..r {
                            a[[i, k]] = a[[i, k]] + fj.mul_re(tens[[i, j, k]]);
                        }
                    }
                }
            }
            let mut m: Array2<T> = Array2::zeros((r, r));
            for i in 0..r {
                for l in 0..r {
                    let ail = a[[i, l]];
                    if ail != T::zero() {
                        for k in 0..r {
                            m[[i, k]] = m[[i, k]] + ail.mul_re(v2c[[l, k]] * beta);
                        }
                    }
                }
            }
            m
        };

        match fc.ndim() {
            1 => Ok(scalar_block(&|j| fc[[j]])),
            3 => {
                let n = fc.shape()[1];
                if fc.shape()[2] != n {
                    return Err(DlrError::DimensionMismatch(
                        "matrix-valued coefficients must have square trailing shape"
                            .into(),
                    ));
                }
                let mut big: Array2<T> = Array2::zeros((r * n, r * n));
                for a in 0..n {
                    for b in 0..n {
                        let block = scalar_block(&|j| fc[[j, a, b]]);
                        for i in 0..r {
                            for k in 0..r {
                                big[[i * n + a, k * n + b]] = block[[i, k]];
                            }
                        }
                    }
                }
                Ok(big)
            }
            _ => Err(DlrError::DimensionMismatch(format!(
                "convolution expects rank-1 or rank-3 coefficients, got rank {}",
                fc.ndim()
            ))),
        }
    }

    /// Imaginary-time convolution h = f * g from DLR coefficients
    ///
    /// Returns the values of h on the DLR imaginary-time grid; matrix-valued
    /// inputs are contracted over the shared orbital index.
    pub fn convolve<T: Scalar>(
        &self,
        beta: f64,
        statistic: Statistic,
        fc: &ArrayD<T>,
        gc: &ArrayD<T>,
    ) -> Result<ArrayD<T>> {
        check_beta(beta)?;
        self.check_leading(fc)?;
        self.check_leading(gc)?;
        if fc.shape() != gc.shape() {
            return Err(DlrError::DimensionMismatch(format!(
                "operand shapes {:?} and {:?} differ",
                fc.shape(),
                gc.shape()
            )));
        }
        let r = self.r;
        let tens = self.convtens(statistic);

        match fc.ndim() {
            1 => {
                let mut h = vec![T::zero(); r];
                for i in 0..r {
                    let mut acc = T::zero();
                    for j in 0..r {
                        let fj = fc[[j]];
                        if fj != T::zero() {
                            for k in 0..r {
                                acc = acc + (fj * gc[[k]]).mul_re(tens[[i, j, k]]);
                            }
                        }
                    }
                    h[i] = acc.mul_re(beta);
                }
                Ok(ArrayD::from_shape_vec(IxDyn(&[r]), h).expect("value array"))
            }
            3 => {
                let n = fc.shape()[1];
                if fc.shape()[2] != n {
                    return Err(DlrError::DimensionMismatch(
                        "matrix-valued coefficients must have square trailing shape"
                            .into(),
                    ));
                }
                let mut h = ArrayD::zeros(IxDyn(&[r, n, n]));
                for i in 0..r {
                    for a in 0..n {
                        for c in 0..n {
                            let mut acc = T::zero();
                            for b in 0..n {
                                for j in 0..r {
                                    let fj = fc[[j, a, b]];
                                    if fj != T::zero() {
                                        for k in 0..r {
                                            acc = acc
                                                + (fj * gc[[k, b, c]])
                                                    .mul_re(tens[[i, j, k]]);
                                        }
                                    }
                                }
                            }
                            h[[i, a, c]] = acc.mul_re(beta);
                        }
                    }
                }
                Ok(h)
            }
            _ => Err(DlrError::DimensionMismatch(format!(
                "convolution expects rank-1 or rank-3 coefficients, got rank {}",
                fc.ndim()
            ))),
        }
    }

    /// DLR imaginary-time nodes in relative format
    pub fn get_itnodes(&self) -> &Array1<f64> {
        &self.dlr_it
    }

    /// DLR real-frequency nodes
    pub fn get_rfnodes(&self) -> &Array1<f64> {
        &self.dlr_rf
    }

    /// Coefficients -> values transformation matrix
    pub fn get_cf2it(&self) -> &Array2<f64> {
        &self.cf2it
    }

    /// Packed LU factors of the values -> coefficients transformation
    pub fn get_it2cf_lu(&self) -> &Array2<f64> {
        &self.it2cf.lu
    }

    /// LU pivots of the values -> coefficients transformation
    pub fn get_it2cf_piv(&self) -> &[usize] {
        &self.it2cf.piv
    }

    /// DLR rank
    pub fn rank(&self) -> usize {
        self.r
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    fn check_leading<T: Scalar>(&self, g: &ArrayD<T>) -> Result<usize> {
        if g.ndim() == 0 || g.shape()[0] != self.r {
            return Err(DlrError::DimensionMismatch(format!(
                "leading dimension {:?} does not match DLR rank {}",
                g.shape().first(),
                self.r
            )));
        }
        Ok(g.len() / self.r)
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

/// Logical reshape of the leading-r array onto an r x nrhs matrix
fn to_matrix<T: Scalar>(g: &ArrayD<T>, r: usize, nrhs: usize) -> Array2<T> {
    Array2::from_shape_vec((r, nrhs), g.iter().cloned().collect())
        .expect("multi-RHS reshape")
}

fn from_matrix<T: Scalar>(m: Array2<T>, shape: &[usize]) -> ArrayD<T> {
    ArrayD::from_shape_vec(IxDyn(shape), m.into_raw_vec()).expect("restore array shape")
}

/// Kernel Gram matrix entry int_0^1 K(t, oj) K(t, ok) dt in the stable
/// endpoint-product form
fn ip_entry(oj: f64, ok: f64) -> f64 {
    let s = oj + ok;
    let k0 = k_it_abs(0.0, oj) * k_it_abs(0.0, ok);
    if s.abs() < 1e-6 {
        k0 * (1.0 - s / 2.0 + s * s / 6.0 - s * s * s / 24.0)
    } else {
        (k0 - k_it_abs(1.0, oj) * k_it_abs(1.0, ok)) / s
    }
}
