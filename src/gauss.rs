//! Gauss-Legendre quadrature and barycentric interpolation
//!
//! Quadrature nodes are the roots of the Legendre polynomial, located by
//! Newton's method on the three-term recurrence. The iteration runs in
//! double-double arithmetic so that the f64 nodes and weights returned are
//! correctly rounded.

use ndarray::{Array1, ArrayView1};
use std::f64::consts::PI;
use twofloat::TwoFloat;

/// Quadrature rule on [-1, 1]: nodes `x` (ascending) and weights `w`
#[derive(Debug, Clone)]
pub struct Rule {
    pub x: Array1<f64>,
    pub w: Array1<f64>,
}

/// Legendre polynomial P_n(x) and its derivative by the recurrence relation
fn legendre_polynomial_and_derivative(n: usize, x: TwoFloat) -> (TwoFloat, TwoFloat) {
    if n == 0 {
        return (TwoFloat::from(1.0), TwoFloat::from(0.0));
    }
    if n == 1 {
        return (x, TwoFloat::from(1.0));
    }

    let mut p0 = TwoFloat::from(1.0);
    let mut p1 = x;
    let mut dp0 = TwoFloat::from(0.0);
    let mut dp1 = TwoFloat::from(1.0);

    for k in 2..=n {
        let k_f = TwoFloat::from(k as f64);
        let k1_f = TwoFloat::from((k - 1) as f64);
        let a = TwoFloat::from(2.0) * k1_f + TwoFloat::from(1.0);

        let p2 = (a * x * p1 - k1_f * p0) / k_f;
        let dp2 = (a * (p1 + x * dp1) - k1_f * dp0) / k_f;

        p0 = p1;
        p1 = p2;
        dp0 = dp1;
        dp1 = dp2;
    }

    (p1, dp1)
}

/// Create a Gauss-Legendre quadrature rule with n points on [-1, 1]
pub fn legendre(n: usize) -> Rule {
    if n == 0 {
        return Rule {
            x: Array1::zeros(0),
            w: Array1::zeros(0),
        };
    }
    if n == 1 {
        return Rule {
            x: Array1::from(vec![0.0]),
            w: Array1::from(vec![2.0]),
        };
    }

    let mut x = vec![0.0; n];
    let mut w = vec![0.0; n];

    // Roots come in +/- pairs; solve for the non-negative half
    let m = (n + 1) / 2;
    for i in 0..m {
        // Chebyshev-node initial guess
        let mut z = TwoFloat::from(
            ((i as f64 + 0.75) * PI / (n as f64 + 0.5)).cos(),
        );

        for _ in 0..16 {
            let (p0, p1) = legendre_polynomial_and_derivative(n, z);
            let step = p0 / p1;
            z = z - step;
            if f64::from(step.abs()) < 1e-30 {
                break;
            }
        }

        let (_, p1) = legendre_polynomial_and_derivative(n, z);
        let weight = TwoFloat::from(2.0)
            / ((TwoFloat::from(1.0) - z * z) * p1 * p1);

        x[i] = -f64::from(z);
        w[i] = f64::from(weight);
        x[n - 1 - i] = f64::from(z);
        w[n - 1 - i] = f64::from(weight);
    }

    Rule {
        x: Array1::from(x),
        w: Array1::from(w),
    }
}

/// Barycentric interpolation on Chebyshev nodes of the first kind
///
/// Nodes x_i = cos((2i+1) pi / 2n), stored ascending, with the closed-form
/// barycentric weights w_i = (-1)^i sin((2i+1) pi / 2n).
#[derive(Debug, Clone)]
pub struct BaryCheb {
    x: Array1<f64>,
    w: Array1<f64>,
}

impl BaryCheb {
    pub fn new(n: usize) -> Self {
        let mut x = vec![0.0; n];
        let mut w = vec![0.0; n];
        for i in 0..n {
            let c = (2 * i + 1) as f64 * PI / (2 * n) as f64;
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            x[n - 1 - i] = c.cos();
            w[n - 1 - i] = sign * c.sin();
        }
        Self {
            x: Array1::from(x),
            w: Array1::from(w),
        }
    }

    /// Interpolation nodes on [-1, 1], ascending
    pub fn nodes(&self) -> &Array1<f64> {
        &self.x
    }

    /// Evaluate the interpolant of values `f` (given at the nodes) at `x`
    pub fn interp(&self, x: f64, f: ArrayView1<f64>) -> f64 {
        barycentric_interp(x, &self.x, &self.w, f)
    }
}

/// Barycentric interpolation on arbitrary distinct nodes
///
/// Weights are computed by the direct product formula and rescaled by their
/// largest magnitude; adequate for the moderate orders used here. Used with
/// Gauss-Legendre nodes for the imaginary-time direction.
#[derive(Debug, Clone)]
pub struct BaryLagrange {
    x: Array1<f64>,
    w: Array1<f64>,
}

impl BaryLagrange {
    pub fn from_nodes(nodes: ArrayView1<f64>) -> Self {
        let n = nodes.len();
        let mut w = vec![0.0; n];
        for j in 0..n {
            let mut prod = 1.0;
            for k in 0..n {
                if k != j {
                    prod *= nodes[j] - nodes[k];
                }
            }
            w[j] = 1.0 / prod;
        }
        let wmax = w.iter().fold(0.0f64, |m, &v| m.max(v.abs()));
        if wmax > 0.0 {
            for wj in w.iter_mut() {
                *wj /= wmax;
            }
        }
        Self {
            x: nodes.to_owned(),
            w: Array1::from(w),
        }
    }

    /// Interpolation nodes, ascending
    pub fn nodes(&self) -> &Array1<f64> {
        &self.x
    }

    /// Evaluate the interpolant of values `f` (given at the nodes) at `x`
    pub fn interp(&self, x: f64, f: ArrayView1<f64>) -> f64 {
        barycentric_interp(x, &self.x, &self.w, f)
    }
}

fn barycentric_interp(
    x: f64,
    nodes: &Array1<f64>,
    weights: &Array1<f64>,
    f: ArrayView1<f64>,
) -> f64 {
    debug_assert_eq!(nodes.len(), f.len());

    let mut num = 0.0;
    let mut den = 0.0;
    for j in 0..nodes.len() {
        let dx = x - nodes[j];
        if dx == 0.0 {
            return f[j];
        }
        let c = weights[j] / dx;
        num += c * f[j];
        den += c;
    }
    num / den
}
