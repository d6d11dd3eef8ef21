//! # dlr-rust: Discrete Lehmann Representation of imaginary-time Green's functions
//!
//! Constructs the Discrete Lehmann Representation (DLR): a compact basis of
//! exponentials whose nodes are selected adaptively so that Green's
//! functions with spectral support in a bounded real-frequency window are
//! representable to a prescribed accuracy by a short expansion. Given a
//! cutoff lambda and a tolerance eps, the crate builds the rank-r basis and
//! the transformations between DLR coefficients, values on the DLR
//! imaginary-time grid, and values on the DLR Matsubara grid, together with
//! pointwise evaluation, reflection, inner products, imaginary-time
//! convolution, and a Dyson equation solver.

pub mod basis;
pub mod dyson;
pub mod error;
pub mod fine;
pub mod gauss;
pub mod imfreq;
pub mod imtime;
pub mod kernel;
pub mod linalg;
pub mod pivrgs;
pub mod serialize;
pub mod traits;

// Re-export commonly used types and operations
pub use basis::{build_dlr_rf, build_dlr_rf_symmetrized};
pub use dyson::solve_dyson_it;
pub use error::{DlrError, Result};
pub use fine::FineParams;
pub use imfreq::ImFreqOps;
pub use imtime::ImTimeOps;
pub use kernel::{eqptsrel, k_if, k_it, k_it_abs, rel2abs};
pub use pivrgs::{pivrgs, pivrgs_rank, pivrgs_sym, pivrgs_sym_rank};
pub use serialize::{ImFreqOpsRepr, ImTimeOpsRepr};
pub use traits::Statistic;

// Re-export external dependencies for convenience
pub use ndarray::{Array1, Array2, ArrayD};
pub use num_complex::Complex64;
