//! Pivoted reorthogonalized Gram-Schmidt
//!
//! Extracts a numerically determined row skeleton of a dense matrix: at
//! each step the remaining row of largest Euclidean norm becomes the next
//! pivot, is orthonormalized against the accepted basis, and the remaining
//! rows are orthogonalized against it. All orthogonalizations run two
//! passes of classical Gram-Schmidt; a single pass loses orthogonality at
//! the tolerances used here.
//!
//! The symmetric variant treats rows as mirror pairs (i, m-1-i) which are
//! selected jointly, so that the chosen skeleton is closed under the
//! reflection; a matrix with an odd row count has a self-symmetric centre
//! row that may be selected alone.

use ndarray::{Array1, Array2};

use crate::linalg::{dot, nrm2, Scalar};

#[derive(Debug, Clone, Copy)]
enum Stop {
    /// Stop when the pivot norm falls below tol * (first pivot norm)
    Tol(f64),
    /// Stop when the selected count reaches the target
    Rank(usize),
}

/// Pivoted reorthogonalized Gram-Schmidt with relative tolerance stopping
///
/// Returns `(q, norms, piv)`: `q` has orthonormal rows spanning the
/// selected rows of `a` to within the tolerance, `piv` holds the selected
/// row indices in the order chosen, and `norms[k]` is the residual norm of
/// the k-th pivot at selection time (non-increasing). Ties in the pivot
/// norm are broken toward the lowest index.
pub fn pivrgs<T: Scalar>(a: &Array2<T>, eps: f64) -> (Array2<T>, Vec<f64>, Vec<usize>) {
    pivrgs_impl(a, Stop::Tol(eps))
}

/// Pivoted reorthogonalized Gram-Schmidt with a target rank
pub fn pivrgs_rank<T: Scalar>(a: &Array2<T>, rank: usize) -> (Array2<T>, Vec<f64>, Vec<usize>) {
    pivrgs_impl(a, Stop::Rank(rank))
}

/// Pair-symmetric variant with relative tolerance stopping
pub fn pivrgs_sym<T: Scalar>(a: &Array2<T>, eps: f64) -> (Array2<T>, Vec<f64>, Vec<usize>) {
    pivrgs_sym_impl(a, Stop::Tol(eps))
}

/// Pair-symmetric variant with a target rank
pub fn pivrgs_sym_rank<T: Scalar>(
    a: &Array2<T>,
    rank: usize,
) -> (Array2<T>, Vec<f64>, Vec<usize>) {
    pivrgs_sym_impl(a, Stop::Rank(rank))
}

struct State<T: Scalar> {
    work: Array2<T>,
    selected: Vec<bool>,
    qs: Vec<Array1<T>>,
    piv: Vec<usize>,
    norms: Vec<f64>,
}

impl<T: Scalar> State<T> {
    fn new(a: &Array2<T>) -> Self {
        Self {
            work: a.to_owned(),
            selected: vec![false; a.nrows()],
            qs: Vec::new(),
            piv: Vec::new(),
            norms: Vec::new(),
        }
    }

    /// Remaining row of largest norm; lowest index wins on ties
    fn best_remaining(&self) -> Option<(usize, f64)> {
        let mut best = None;
        let mut best_norm = -1.0;
        for i in 0..self.work.nrows() {
            if !self.selected[i] {
                let nrm = nrm2(self.work.row(i));
                if nrm > best_norm {
                    best_norm = nrm;
                    best = Some(i);
                }
            }
        }
        best.map(|i| (i, best_norm))
    }

    /// Accept row `i` as the next pivot and orthogonalize the rest against
    /// the new direction. Returns false if the residual vanished.
    fn accept(&mut self, i: usize, norm_at_selection: f64) -> bool {
        let n = self.work.ncols();

        let mut v = self.work.row(i).to_owned();
        for _ in 0..2 {
            for q in &self.qs {
                let c = dot(q.view(), v.view());
                for j in 0..n {
                    v[j] = v[j] - c * q[j];
                }
            }
        }
        let vnorm = nrm2(v.view());
        if vnorm == 0.0 {
            return false;
        }
        for j in 0..n {
            v[j] = v[j].mul_re(1.0 / vnorm);
        }

        self.selected[i] = true;
        self.piv.push(i);
        self.norms.push(norm_at_selection);

        for row in 0..self.work.nrows() {
            if !self.selected[row] {
                for _ in 0..2 {
                    let c = dot(v.view(), self.work.row(row));
                    for j in 0..n {
                        let vj = v[j];
                        self.work[[row, j]] = self.work[[row, j]] - c * vj;
                    }
                }
            }
        }
        self.qs.push(v);
        true
    }

    fn into_result(self) -> (Array2<T>, Vec<f64>, Vec<usize>) {
        let n = self.work.ncols();
        let r = self.qs.len();
        let mut q = Array2::zeros((r, n));
        for (k, qk) in self.qs.iter().enumerate() {
            for j in 0..n {
                q[[k, j]] = qk[j];
            }
        }
        (q, self.norms, self.piv)
    }
}

fn pivrgs_impl<T: Scalar>(a: &Array2<T>, stop: Stop) -> (Array2<T>, Vec<f64>, Vec<usize>) {
    let (m, n) = a.dim();
    let maxcount = match stop {
        Stop::Tol(_) => m.min(n),
        Stop::Rank(r) => r.min(m),
    };

    let mut st = State::new(a);
    let mut first_norm: Option<f64> = None;

    while st.piv.len() < maxcount {
        let (best, best_norm) = match st.best_remaining() {
            Some(b) => b,
            None => break,
        };
        if let Stop::Tol(eps) = stop {
            match first_norm {
                None => {
                    if best_norm == 0.0 {
                        break;
                    }
                }
                Some(f) => {
                    if best_norm < eps * f {
                        break;
                    }
                }
            }
        }
        first_norm.get_or_insert(best_norm);

        if !st.accept(best, best_norm) {
            break;
        }
    }

    st.into_result()
}

fn pivrgs_sym_impl<T: Scalar>(a: &Array2<T>, stop: Stop) -> (Array2<T>, Vec<f64>, Vec<usize>) {
    let (m, n) = a.dim();
    let center = if m % 2 == 1 { Some(m / 2) } else { None };
    let maxcount = match stop {
        Stop::Tol(_) => m.min(n),
        Stop::Rank(r) => r.min(m),
    };

    let mut st = State::new(a);
    let mut first_norm: Option<f64> = None;

    while st.piv.len() < maxcount {
        let (mut best, mut best_norm) = match st.best_remaining() {
            Some(b) => b,
            None => break,
        };
        if let Stop::Tol(eps) = stop {
            match first_norm {
                None => {
                    if best_norm == 0.0 {
                        break;
                    }
                }
                Some(f) => {
                    if best_norm < eps * f {
                        break;
                    }
                }
            }
        }
        first_norm.get_or_insert(best_norm);

        let mut is_pair = Some(best) != center;
        if is_pair && st.piv.len() + 2 > maxcount {
            // One slot left: only a self-symmetric pivot fits
            match center {
                Some(c) if !st.selected[c] => {
                    best = c;
                    best_norm = nrm2(st.work.row(c));
                    is_pair = false;
                }
                _ => break,
            }
        }

        if !st.accept(best, best_norm) {
            break;
        }
        if is_pair {
            let partner = m - 1 - best;
            let partner_norm = nrm2(st.work.row(partner));
            if !st.accept(partner, partner_norm) {
                break;
            }
        }
    }

    st.into_result()
}
