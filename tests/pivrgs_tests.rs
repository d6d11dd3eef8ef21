//! Pivoted Gram-Schmidt behavior through the public API

mod common;

use common::SimpleRng;
use dlr_rust::{pivrgs, pivrgs_rank};
use ndarray::Array2;
use num_complex::Complex64;

fn random_real(rng: &mut SimpleRng, m: usize, n: usize) -> Array2<f64> {
    Array2::from_shape_fn((m, n), |_| rng.next_sym())
}

fn random_complex(rng: &mut SimpleRng, m: usize, n: usize) -> Array2<Complex64> {
    Array2::from_shape_fn((m, n), |_| Complex64::new(rng.next_sym(), rng.next_sym()))
}

#[test]
fn real_low_rank_matrix_is_compressed() {
    let m = 50;
    let n = 40;
    let eps = 1e-6;
    let mut rng = SimpleRng::new(1);

    // Random matrix with singular values 2^-k from two orthonormal factors
    let (u, _, _) = pivrgs(&random_real(&mut rng, m, m), 1e-100);
    let (mut v, _, _) = pivrgs(&random_real(&mut rng, n, n), 1e-100);
    for i in 0..n {
        let s = 2.0f64.powi(-(i as i32));
        for j in 0..n {
            v[[i, j]] *= s;
        }
    }
    let mut a: Array2<f64> = Array2::zeros((m, n));
    for i in 0..m {
        for k in 0..n {
            let uik = u[[i, k]];
            for j in 0..n {
                a[[i, j]] += uik * v[[k, j]];
            }
        }
    }

    let (q, norms, piv) = pivrgs(&a, eps);
    let r = norms.len();
    let expect = (1.0 / eps).log2().ceil() as i64;
    assert!((r as i64 - expect).abs() <= 3, "rank {} vs expected {}", r, expect);

    // Row-orthonormality of Q to near machine precision
    let mut frob = 0.0f64;
    for i in 0..r {
        for j in 0..r {
            let mut d: f64 = 0.0;
            for k in 0..n {
                d += q[[i, k]] * q[[j, k]];
            }
            let want = if i == j { 1.0 } else { 0.0 };
            frob += (d - want).powi(2);
        }
    }
    assert!(frob.sqrt() <= 1e-14, "orthonormality defect {}", frob.sqrt());

    // Rerunning on the matrix of pivot rows returns the pivots in order
    let mut athin = Array2::zeros((r, n));
    for (k, &p) in piv.iter().enumerate() {
        for j in 0..n {
            athin[[k, j]] = a[[p, j]];
        }
    }
    let (qthin, _, pivthin) = pivrgs(&athin, eps);
    assert_eq!(pivthin, (0..r).collect::<Vec<_>>());
    let mut dq = 0.0f64;
    for (x, y) in q.iter().zip(qthin.iter()) {
        dq += (x - y).powi(2);
    }
    assert!(dq.sqrt() <= 1e-14, "Q reproduction defect {}", dq.sqrt());
}

#[test]
fn complex_orthonormalization_and_span() {
    let m = 40;
    let n = 32;
    let eps = 1e-7;
    let mut rng = SimpleRng::new(9);

    let (u, _, _) = pivrgs(&random_complex(&mut rng, m, m), 1e-100);
    let (mut v, _, _) = pivrgs(&random_complex(&mut rng, n, n), 1e-100);
    for i in 0..n {
        let s = 2.0f64.powi(-(i as i32));
        for j in 0..n {
            v[[i, j]] *= s;
        }
    }
    let mut a = Array2::from_elem((m, n), Complex64::new(0.0, 0.0));
    for i in 0..m {
        for k in 0..n {
            let uik = u[[i, k]];
            for j in 0..n {
                a[[i, j]] += uik * v[[k, j]];
            }
        }
    }

    let (q, norms, _) = pivrgs(&a, eps);
    let r = norms.len();

    // Q Q* = I
    let mut frob = 0.0f64;
    for i in 0..r {
        for j in 0..r {
            let mut d = Complex64::new(0.0, 0.0);
            for k in 0..n {
                d += q[[i, k]].conj() * q[[j, k]];
            }
            let want = if i == j { 1.0 } else { 0.0 };
            frob += (d - Complex64::new(want, 0.0)).norm_sqr();
        }
    }
    assert!(frob.sqrt() <= 1e-14);

    // Projection of A onto row(Q) reproduces A to the tolerance
    let mut err = 0.0f64;
    for i in 0..m {
        for j in 0..n {
            // (A q*) q row i, col j
            let mut proj = Complex64::new(0.0, 0.0);
            for s in 0..r {
                let mut coef = Complex64::new(0.0, 0.0);
                for k in 0..n {
                    coef += a[[i, k]] * q[[s, k]].conj();
                }
                proj += coef * q[[s, j]];
            }
            err += (a[[i, j]] - proj).norm_sqr();
        }
    }
    assert!(err.sqrt() <= 10.0 * eps, "projection error {}", err.sqrt());
}

#[test]
fn rank_stopping_returns_exactly_the_target() {
    let mut rng = SimpleRng::new(33);
    let a = random_real(&mut rng, 20, 20);
    let (q, norms, piv) = pivrgs_rank(&a, 7);
    assert_eq!(q.nrows(), 7);
    assert_eq!(norms.len(), 7);
    assert_eq!(piv.len(), 7);
}
