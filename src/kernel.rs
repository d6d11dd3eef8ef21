//! Analytic continuation kernel primitives
//!
//! The imaginary-time kernel is evaluated in two branches so that neither
//! numerator nor denominator can overflow for any finite frequency:
//!
//!     K(t, om) = exp(-t*om) / (1 + exp(-om))        t >= 0, om >= 0
//!     K(t, om) = exp((1-t)*om) / (1 + exp(om))      t >= 0, om < 0
//!     K(t, om) = K(-t, -om)                         t < 0
//!
//! Imaginary time is carried in relative format: t in [-1, 1], where
//! negative values encode 1 + t with full precision near the beta endpoint.
//! The imaginary-frequency kernel is K(n, om) = -1 / ((2n + zeta) pi i - om).

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::traits::Statistic;

/// Imaginary-time kernel K(t, om) for t in relative format
pub fn k_it(t: f64, om: f64) -> f64 {
    if t >= 0.0 {
        k_it_abs(t, om)
    } else {
        k_it_abs(-t, -om)
    }
}

/// Imaginary-time kernel for absolute t in [0, 1]
pub fn k_it_abs(t: f64, om: f64) -> f64 {
    if om >= 0.0 {
        (-t * om).exp() / (1.0 + (-om).exp())
    } else {
        ((1.0 - t) * om).exp() / (1.0 + om.exp())
    }
}

/// Imaginary-frequency kernel K(i nu_n, om) at Matsubara index n
pub fn k_if(n: i64, om: f64, statistic: Statistic) -> Complex64 {
    let nu = (2 * n + statistic.zeta()) as f64 * PI;
    -1.0 / Complex64::new(-om, nu)
}

/// Convert imaginary time from relative format to absolute value in [0, 1]
///
/// Loses relative accuracy near t = 1; intended for quantities in which the
/// distance to the endpoint is not amplified.
pub fn rel2abs(t: f64) -> f64 {
    if t < 0.0 {
        t + 1.0
    } else {
        t
    }
}

/// n equispaced points on [0, 1) in relative format
pub fn eqptsrel(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64 / n as f64;
            if t > 0.5 {
                t - 1.0
            } else {
                t
            }
        })
        .collect()
}
