//! End-to-end interpolation scenarios at production-size parameters

mod common;

use common::{sample_on_grid, PoleModel, SimpleRng};
use dlr_rust::{
    build_dlr_rf, build_dlr_rf_symmetrized, eqptsrel, k_if, ImFreqOps, ImTimeOps,
    Statistic,
};
use ndarray::{ArrayD, ArrayView1, IxDyn};
use num_complex::Complex64;

const LAMBDA: f64 = 1000.0;
const EPS: f64 = 1e-10;

#[test]
fn dlr_frequency_set_is_sane() {
    let rf = build_dlr_rf(LAMBDA, EPS).unwrap();
    let r = rf.len();
    assert!(
        (30..=80).contains(&r),
        "rank {} outside the expected window",
        r
    );
    assert!(rf[0] >= -LAMBDA && rf[r - 1] <= LAMBDA);
    assert!(rf[0] < 0.0 && rf[r - 1] > 0.0);
    for i in 1..r {
        assert!(rf[i] > rf[i - 1], "frequencies not strictly ascending");
    }
}

#[test]
fn imaginary_time_interpolation_of_random_pole_sum() {
    let beta = 1000.0;
    let rf = build_dlr_rf(LAMBDA, EPS).unwrap();
    let ops = ImTimeOps::new(LAMBDA, rf.view()).unwrap();

    let mut rng = SimpleRng::new(20201);
    let model = PoleModel::random(&mut rng, 5);

    let g = sample_on_grid(&ops, beta, &model);
    let c = ops.vals2coefs(beta, &g).unwrap();
    let cv = c.clone();
    let cs = ArrayView1::from(cv.as_slice().unwrap());

    let mut err = 0.0f64;
    for &t in &eqptsrel(10000) {
        let truth = model.eval(beta, t);
        let approx = ops.coefs2eval_scalar(beta, cs, t).unwrap();
        err = err.max((approx - truth).abs());
    }
    assert!(err <= 1e-9, "L-infinity interpolation error {}", err);
}

#[test]
fn imaginary_frequency_interpolation_bosonic() {
    let beta = 1000.0;
    let rf = build_dlr_rf(LAMBDA, EPS).unwrap();
    let ops = ImFreqOps::new(LAMBDA, rf.view(), Statistic::Boson).unwrap();

    let mut rng = SimpleRng::new(555);
    let model = PoleModel::random(&mut rng, 5);

    // Values on the DLR Matsubara grid of a Green's function lying in the
    // span of the imaginary-frequency kernel basis
    let truth = |n: i64| -> Complex64 {
        model
            .weights
            .iter()
            .zip(model.poles.iter())
            .map(|(&w, &om)| k_if(n, beta * om, Statistic::Boson) * (w * beta))
            .sum()
    };

    let vals: Vec<Complex64> = ops.get_ifnodes().iter().map(|&n| truth(n)).collect();
    let g = ArrayD::from_shape_vec(IxDyn(&[vals.len()]), vals).unwrap();
    let c = ops.vals2coefs(beta, &g).unwrap();
    let cs = ArrayView1::from(c.as_slice().unwrap());

    let mut err2 = 0.0f64;
    for n in -10000..=10000i64 {
        let approx = ops.coefs2eval_scalar(beta, cs, n).unwrap();
        err2 += (approx - truth(n)).norm_sqr();
    }
    let l2 = err2.sqrt() / beta;
    assert!(l2 <= 1e-9, "normalized L2 error {}", l2);
}

#[test]
fn symmetrized_matches_unsymmetrized_accuracy() {
    let beta = 1000.0;
    let norb = 2;
    let ntst = 2000;

    let rf = build_dlr_rf(LAMBDA, EPS).unwrap();
    let rf_sym = build_dlr_rf_symmetrized(LAMBDA, EPS, true).unwrap();
    let r = rf.len();
    let r_sym = rf_sym.len();
    assert!(
        (r as i64 - r_sym as i64).abs() <= 2,
        "ranks {} and {} too far apart",
        r,
        r_sym
    );

    let ops = ImTimeOps::new(LAMBDA, rf.view()).unwrap();
    let ops_sym = ImTimeOps::new_symmetrized(LAMBDA, rf_sym.view()).unwrap();

    // One random 5-pole model per orbital entry
    let mut rng = SimpleRng::new(77);
    let models: Vec<PoleModel> = (0..norb * norb)
        .map(|_| PoleModel::random(&mut rng, 5))
        .collect();

    let sample = |ops: &ImTimeOps| -> ArrayD<f64> {
        let rr = ops.rank();
        let mut g = ArrayD::zeros(IxDyn(&[rr, norb, norb]));
        for (i, &t) in ops.get_itnodes().iter().enumerate() {
            for a in 0..norb {
                for b in 0..norb {
                    g[[i, a, b]] = models[a * norb + b].eval(beta, t);
                }
            }
        }
        g
    };

    let c = ops.vals2coefs(beta, &sample(&ops)).unwrap();
    let c_sym = ops_sym.vals2coefs(beta, &sample(&ops_sym)).unwrap();

    let mut err = 0.0f64;
    let mut err_sym = 0.0f64;
    for &t in &eqptsrel(ntst) {
        let v = ops.coefs2eval(beta, &c, t).unwrap();
        let v_sym = ops_sym.coefs2eval(beta, &c_sym, t).unwrap();
        for a in 0..norb {
            for b in 0..norb {
                let truth = models[a * norb + b].eval(beta, t);
                err = err.max((v[[a, b]] - truth).abs());
                err_sym = err_sym.max((v_sym[[a, b]] - truth).abs());
            }
        }
    }
    assert!(err <= 1e-8, "unsymmetrized L-infinity error {}", err);
    assert!(err_sym <= 1e-8, "symmetrized L-infinity error {}", err_sym);
}

#[test]
fn symmetric_ranks_agree_across_domains() {
    // The imaginary-time and imaginary-frequency operators built from one
    // frequency set share the DLR rank
    let rf = build_dlr_rf(LAMBDA, EPS).unwrap();
    let itops = ImTimeOps::new(LAMBDA, rf.view()).unwrap();
    let ifops_f = ImFreqOps::new(LAMBDA, rf.view(), Statistic::Fermion).unwrap();
    let ifops_b = ImFreqOps::new(LAMBDA, rf.view(), Statistic::Boson).unwrap();
    assert_eq!(itops.rank(), rf.len());
    assert_eq!(ifops_f.rank(), rf.len());
    assert_eq!(ifops_b.rank(), rf.len());
    assert_eq!(ifops_f.nnodes(), rf.len());
}
