//! Common test utilities

#![allow(dead_code)]

use dlr_rust::{k_it, ImTimeOps};
use ndarray::{ArrayD, IxDyn};

/// Simple deterministic pseudo-random number generator (LCG)
///
/// Linear Congruential Generator for reproducible random numbers in tests.
/// Uses the common parameters a = 1664525, c = 1013904223.
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next f64 in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        ((self.state >> 16) as f64) / ((1u64 << 48) as f64)
    }

    /// Next f64 in [-1, 1)
    pub fn next_sym(&mut self) -> f64 {
        2.0 * self.next_f64() - 1.0
    }
}

/// Random pole model: npole weights summing to one and pole locations in
/// [-1, 1], per orbital entry
pub struct PoleModel {
    pub weights: Vec<f64>,
    pub poles: Vec<f64>,
}

impl PoleModel {
    pub fn random(rng: &mut SimpleRng, npole: usize) -> Self {
        let mut weights: Vec<f64> = (0..npole).map(|_| rng.next_f64()).collect();
        let total: f64 = weights.iter().sum();
        for w in weights.iter_mut() {
            *w /= total;
        }
        let poles = (0..npole).map(|_| rng.next_sym()).collect();
        Self { weights, poles }
    }

    /// G(t) = sum_l w_l K(t, beta * om_l), t in relative format
    pub fn eval(&self, beta: f64, t: f64) -> f64 {
        self.weights
            .iter()
            .zip(self.poles.iter())
            .map(|(&w, &om)| w * k_it(t, beta * om))
            .sum()
    }
}

/// Sample a scalar pole model on the DLR imaginary-time grid
pub fn sample_on_grid(ops: &ImTimeOps, beta: f64, model: &PoleModel) -> ArrayD<f64> {
    let vals: Vec<f64> = ops
        .get_itnodes()
        .iter()
        .map(|&t| model.eval(beta, t))
        .collect();
    ArrayD::from_shape_vec(IxDyn(&[vals.len()]), vals).unwrap()
}
