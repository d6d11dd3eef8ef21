//! Dense linear algebra kernels
//!
//! The DLR core needs four named operations: `gemm`, `getrf`, `getrs`, and
//! `dot`. They are implemented here over a closed scalar set (f64 and
//! Complex64) on `ndarray` storage, with LU factors kept in packed LAPACK
//! form so they can be persisted alongside the transform matrices. The
//! over-determined least-squares direction binds to nalgebra's SVD.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex64;
use num_traits::{One, Zero};
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::error::{DlrError, Result};

/// Scalar types admitted by the dense kernels
pub trait Scalar:
    Copy
    + PartialEq
    + std::fmt::Debug
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    fn from_re(x: f64) -> Self;
    fn conj(self) -> Self;
    fn abs(self) -> f64;
    fn abs_sq(self) -> f64;
    /// Multiply by a real scalar
    fn mul_re(self, x: f64) -> Self;
}

impl Scalar for f64 {
    fn from_re(x: f64) -> Self {
        x
    }
    fn conj(self) -> Self {
        self
    }
    fn abs(self) -> f64 {
        f64::abs(self)
    }
    fn abs_sq(self) -> f64 {
        self * self
    }
    fn mul_re(self, x: f64) -> Self {
        self * x
    }
}

impl Scalar for Complex64 {
    fn from_re(x: f64) -> Self {
        Complex64::new(x, 0.0)
    }
    fn conj(self) -> Self {
        Complex64::conj(&self)
    }
    fn abs(self) -> f64 {
        self.norm()
    }
    fn abs_sq(self) -> f64 {
        self.norm_sqr()
    }
    fn mul_re(self, x: f64) -> Self {
        self * x
    }
}

/// Matrix product C = A * B
pub fn gemm<T: Scalar>(a: &Array2<T>, b: &Array2<T>) -> Array2<T> {
    let (m, ka) = a.dim();
    let (kb, n) = b.dim();
    assert_eq!(ka, kb, "gemm: inner dimensions {} != {}", ka, kb);

    let mut c = Array2::zeros((m, n));
    for i in 0..m {
        for k in 0..ka {
            let aik = a[[i, k]];
            if aik != T::zero() {
                for j in 0..n {
                    c[[i, j]] = c[[i, j]] + aik * b[[k, j]];
                }
            }
        }
    }
    c
}

/// Matrix product of a real matrix with a generic right factor
pub fn gemm_re<T: Scalar>(a: &Array2<f64>, b: &Array2<T>) -> Array2<T> {
    let (m, ka) = a.dim();
    let (kb, n) = b.dim();
    assert_eq!(ka, kb, "gemm: inner dimensions {} != {}", ka, kb);

    let mut c = Array2::zeros((m, n));
    for i in 0..m {
        for k in 0..ka {
            let aik = a[[i, k]];
            if aik != 0.0 {
                for j in 0..n {
                    c[[i, j]] = c[[i, j]] + b[[k, j]].mul_re(aik);
                }
            }
        }
    }
    c
}

/// Inner product sum_i conj(a_i) b_i
pub fn dot<T: Scalar>(a: ArrayView1<T>, b: ArrayView1<T>) -> T {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = T::zero();
    for i in 0..a.len() {
        acc = acc + a[i].conj() * b[i];
    }
    acc
}

/// Euclidean norm of a vector
pub fn nrm2<T: Scalar>(a: ArrayView1<T>) -> f64 {
    a.iter().map(|&x| x.abs_sq()).sum::<f64>().sqrt()
}

/// Packed LU factorization with partial pivoting
///
/// `lu` holds the unit lower and upper factors in one matrix; `piv[k]` is
/// the row interchanged with row k at step k (LAPACK convention, 0-based).
#[derive(Debug, Clone)]
pub struct LuFactors<T: Scalar> {
    pub lu: Array2<T>,
    pub piv: Vec<usize>,
}

/// Factor a square matrix as P*A = L*U with partial pivoting
pub fn getrf<T: Scalar>(mut a: Array2<T>) -> Result<LuFactors<T>> {
    let (m, n) = a.dim();
    if m != n {
        return Err(DlrError::DimensionMismatch(format!(
            "getrf requires a square matrix, got {}x{}",
            m, n
        )));
    }

    let mut piv = vec![0usize; n];
    for k in 0..n {
        let mut p = k;
        let mut pmax = a[[k, k]].abs();
        for i in k + 1..n {
            let v = a[[i, k]].abs();
            if v > pmax {
                pmax = v;
                p = i;
            }
        }
        if pmax == 0.0 {
            return Err(DlrError::DegenerateNodes(format!(
                "singular factor at column {}",
                k
            )));
        }
        piv[k] = p;
        if p != k {
            for j in 0..n {
                a.swap([k, j], [p, j]);
            }
        }

        let pivval = a[[k, k]];
        for i in k + 1..n {
            let l = a[[i, k]] / pivval;
            a[[i, k]] = l;
            if l != T::zero() {
                for j in k + 1..n {
                    let akj = a[[k, j]];
                    a[[i, j]] = a[[i, j]] - l * akj;
                }
            }
        }
    }

    Ok(LuFactors { lu: a, piv })
}

/// Solve A * X = B in place using the packed factors of A
pub fn getrs<T: Scalar>(f: &LuFactors<T>, b: &mut Array2<T>) {
    let n = f.lu.nrows();
    let nrhs = b.ncols();
    assert_eq!(b.nrows(), n, "getrs: rhs has {} rows, expected {}", b.nrows(), n);

    for k in 0..n {
        let p = f.piv[k];
        if p != k {
            for j in 0..nrhs {
                b.swap([k, j], [p, j]);
            }
        }
    }

    // Forward substitution with the unit lower factor
    for k in 0..n {
        for i in k + 1..n {
            let l = f.lu[[i, k]];
            if l != T::zero() {
                for j in 0..nrhs {
                    let bkj = b[[k, j]];
                    b[[i, j]] = b[[i, j]] - l * bkj;
                }
            }
        }
    }

    // Back substitution with the upper factor
    for k in (0..n).rev() {
        let d = f.lu[[k, k]];
        for j in 0..nrhs {
            b[[k, j]] = b[[k, j]] / d;
        }
        for i in 0..k {
            let u = f.lu[[i, k]];
            if u != T::zero() {
                for j in 0..nrhs {
                    let bkj = b[[k, j]];
                    b[[i, j]] = b[[i, j]] - u * bkj;
                }
            }
        }
    }
}

/// Solve A * X = B in place for real factors and a generic right-hand side
pub fn getrs_re<T: Scalar>(f: &LuFactors<f64>, b: &mut Array2<T>) {
    let n = f.lu.nrows();
    let nrhs = b.ncols();
    assert_eq!(b.nrows(), n, "getrs: rhs has {} rows, expected {}", b.nrows(), n);

    for k in 0..n {
        let p = f.piv[k];
        if p != k {
            for j in 0..nrhs {
                b.swap([k, j], [p, j]);
            }
        }
    }

    for k in 0..n {
        for i in k + 1..n {
            let l = f.lu[[i, k]];
            if l != 0.0 {
                for j in 0..nrhs {
                    let bkj = b[[k, j]];
                    b[[i, j]] = b[[i, j]] - bkj.mul_re(l);
                }
            }
        }
    }

    for k in (0..n).rev() {
        let d = f.lu[[k, k]];
        for j in 0..nrhs {
            b[[k, j]] = b[[k, j]].mul_re(1.0 / d);
        }
        for i in 0..k {
            let u = f.lu[[i, k]];
            if u != 0.0 {
                for j in 0..nrhs {
                    let bkj = b[[k, j]];
                    b[[i, j]] = b[[i, j]] - bkj.mul_re(u);
                }
            }
        }
    }
}

/// Least-squares solve of the over-determined system A * X = B
///
/// Goes through an SVD pseudo-inverse; used for the symmetrized-bosonic
/// imaginary-frequency transform where the system has one more equation
/// than unknowns.
pub fn lstsq(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let (m, n) = a.dim();
    let (mb, nrhs) = b.dim();
    if m != mb {
        return Err(DlrError::DimensionMismatch(format!(
            "lstsq: lhs has {} rows, rhs has {}",
            m, mb
        )));
    }

    let a_na = DMatrix::from_fn(m, n, |i, j| a[[i, j]]);
    let b_na = DMatrix::from_fn(m, nrhs, |i, j| b[[i, j]]);

    let svd = a_na.svd(true, true);
    let x = svd
        .solve(&b_na, 0.0)
        .map_err(|e| DlrError::DegenerateNodes(format!("least-squares solve failed: {}", e)))?;

    Ok(Array2::from_shape_fn((n, nrhs), |(i, j)| x[(i, j)]))
}

/// Explicit inverse through the packed LU factors
pub fn lu_inverse<T: Scalar>(f: &LuFactors<T>) -> Array2<T> {
    let n = f.lu.nrows();
    let mut inv = Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            T::one()
        } else {
            T::zero()
        }
    });
    getrs(f, &mut inv);
    inv
}

/// Identity matrix
pub fn eye<T: Scalar>(n: usize) -> Array2<T> {
    Array2::from_shape_fn((n, n), |(i, j)| if i == j { T::one() } else { T::zero() })
}
