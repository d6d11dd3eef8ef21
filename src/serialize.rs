//! Persisted operator layout
//!
//! Transform operators serialize through plain representation structs with
//! a self-describing format tag, so any serde backend reproduces the same
//! field names: `lambda`, `rf`, `it`, `cf2it`, `it2cf_lu`, `it2cf_piv` for
//! the imaginary-time operator and `lambda`, `statistic`, `rf`, `if`,
//! `cf2if`, `if2cf_lu`, `if2cf_piv` for the imaginary-frequency operator.
//! Matrices are stored row-major; complex entries as (re, im) pairs; LU
//! fields are absent for the over-determined symmetrized-bosonic node set.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{DlrError, Result};
use crate::imfreq::ImFreqOps;
use crate::imtime::ImTimeOps;
use crate::traits::Statistic;

pub const IMTIME_FORMAT: &str = "dlr::imtime_ops";
pub const IMFREQ_FORMAT: &str = "dlr::imfreq_ops";

/// Row-major dense real matrix payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRepr {
    pub nrows: usize,
    pub ncols: usize,
    pub data: Vec<f64>,
}

impl MatrixRepr {
    fn from_array(a: &Array2<f64>) -> Self {
        Self {
            nrows: a.nrows(),
            ncols: a.ncols(),
            data: a.iter().cloned().collect(),
        }
    }

    fn into_array(self) -> Result<Array2<f64>> {
        if self.data.len() != self.nrows * self.ncols {
            return Err(DlrError::FormatMismatch(format!(
                "matrix payload holds {} entries for a {}x{} shape",
                self.data.len(),
                self.nrows,
                self.ncols
            )));
        }
        Array2::from_shape_vec((self.nrows, self.ncols), self.data)
            .map_err(|e| DlrError::FormatMismatch(e.to_string()))
    }
}

/// Row-major dense complex matrix payload, entries as (re, im) pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexMatrixRepr {
    pub nrows: usize,
    pub ncols: usize,
    pub data: Vec<(f64, f64)>,
}

impl ComplexMatrixRepr {
    fn from_array(a: &Array2<Complex64>) -> Self {
        Self {
            nrows: a.nrows(),
            ncols: a.ncols(),
            data: a.iter().map(|z| (z.re, z.im)).collect(),
        }
    }

    fn into_array(self) -> Result<Array2<Complex64>> {
        if self.data.len() != self.nrows * self.ncols {
            return Err(DlrError::FormatMismatch(format!(
                "matrix payload holds {} entries for a {}x{} shape",
                self.data.len(),
                self.nrows,
                self.ncols
            )));
        }
        let data: Vec<Complex64> = self
            .data
            .into_iter()
            .map(|(re, im)| Complex64::new(re, im))
            .collect();
        Array2::from_shape_vec((self.nrows, self.ncols), data)
            .map_err(|e| DlrError::FormatMismatch(e.to_string()))
    }
}

/// Serialized layout of an imaginary-time operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImTimeOpsRepr {
    pub format: String,
    pub lambda: f64,
    pub rf: Vec<f64>,
    pub it: Vec<f64>,
    pub cf2it: MatrixRepr,
    pub it2cf_lu: MatrixRepr,
    pub it2cf_piv: Vec<usize>,
}

impl ImTimeOpsRepr {
    pub fn from_ops(ops: &ImTimeOps) -> Self {
        Self {
            format: IMTIME_FORMAT.to_string(),
            lambda: ops.lambda(),
            rf: ops.get_rfnodes().to_vec(),
            it: ops.get_itnodes().to_vec(),
            cf2it: MatrixRepr::from_array(ops.get_cf2it()),
            it2cf_lu: MatrixRepr::from_array(ops.get_it2cf_lu()),
            it2cf_piv: ops.get_it2cf_piv().to_vec(),
        }
    }

    pub fn into_ops(self) -> Result<ImTimeOps> {
        if self.format != IMTIME_FORMAT {
            return Err(DlrError::FormatMismatch(format!(
                "expected tag {:?}, found {:?}",
                IMTIME_FORMAT, self.format
            )));
        }
        ImTimeOps::from_parts(
            self.lambda,
            Array1::from(self.rf),
            Array1::from(self.it),
            self.cf2it.into_array()?,
            self.it2cf_lu.into_array()?,
            self.it2cf_piv,
        )
    }
}

/// Serialized layout of an imaginary-frequency operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImFreqOpsRepr {
    pub format: String,
    pub lambda: f64,
    pub statistic: i64,
    pub rf: Vec<f64>,
    #[serde(rename = "if")]
    pub if_nodes: Vec<i64>,
    pub cf2if: ComplexMatrixRepr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if2cf_lu: Option<ComplexMatrixRepr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if2cf_piv: Option<Vec<usize>>,
}

impl ImFreqOpsRepr {
    pub fn from_ops(ops: &ImFreqOps) -> Self {
        Self {
            format: IMFREQ_FORMAT.to_string(),
            lambda: ops.lambda(),
            statistic: ops.statistic().zeta(),
            rf: ops.get_rfnodes().to_vec(),
            if_nodes: ops.get_ifnodes().to_vec(),
            cf2if: ComplexMatrixRepr::from_array(ops.get_cf2if()),
            if2cf_lu: ops.get_if2cf_lu().map(ComplexMatrixRepr::from_array),
            if2cf_piv: ops.get_if2cf_piv().map(|p| p.to_vec()),
        }
    }

    pub fn into_ops(self) -> Result<ImFreqOps> {
        if self.format != IMFREQ_FORMAT {
            return Err(DlrError::FormatMismatch(format!(
                "expected tag {:?}, found {:?}",
                IMFREQ_FORMAT, self.format
            )));
        }
        let statistic = Statistic::from_zeta(self.statistic)?;
        let if2cf = match (self.if2cf_lu, self.if2cf_piv) {
            (Some(lu), Some(piv)) => Some((lu.into_array()?, piv)),
            (None, None) => None,
            _ => {
                return Err(DlrError::FormatMismatch(
                    "LU factors and pivots must be present together".into(),
                ))
            }
        };
        ImFreqOps::from_parts(
            self.lambda,
            statistic,
            Array1::from(self.rf),
            self.if_nodes,
            self.cf2if.into_array()?,
            if2cf,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::build_dlr_rf;

    #[test]
    fn test_imtime_repr_round_trip_bitwise() {
        let lambda = 50.0;
        let rf = build_dlr_rf(lambda, 1e-8).unwrap();
        let ops = ImTimeOps::new(lambda, rf.view()).unwrap();

        let repr = ImTimeOpsRepr::from_ops(&ops);
        assert_eq!(repr.format, "dlr::imtime_ops");
        let ops2 = repr.clone().into_ops().unwrap();

        assert_eq!(ops.lambda().to_bits(), ops2.lambda().to_bits());
        assert_eq!(ops.rank(), ops2.rank());
        for (a, b) in ops.get_rfnodes().iter().zip(ops2.get_rfnodes()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        for (a, b) in ops.get_itnodes().iter().zip(ops2.get_itnodes()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        for (a, b) in ops.get_cf2it().iter().zip(ops2.get_cf2it()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        for (a, b) in ops.get_it2cf_lu().iter().zip(ops2.get_it2cf_lu()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert_eq!(ops.get_it2cf_piv(), ops2.get_it2cf_piv());
    }

    #[test]
    fn test_imfreq_repr_round_trip() {
        let lambda = 50.0;
        let rf = build_dlr_rf(lambda, 1e-8).unwrap();
        let ops = ImFreqOps::new(lambda, rf.view(), Statistic::Fermion).unwrap();

        let repr = ImFreqOpsRepr::from_ops(&ops);
        assert_eq!(repr.format, "dlr::imfreq_ops");
        assert_eq!(repr.statistic, 1);
        let ops2 = repr.into_ops().unwrap();

        assert_eq!(ops.get_ifnodes(), ops2.get_ifnodes());
        for (a, b) in ops.get_cf2if().iter().zip(ops2.get_cf2if()) {
            assert_eq!(a.re.to_bits(), b.re.to_bits());
            assert_eq!(a.im.to_bits(), b.im.to_bits());
        }
        assert!(ops2.get_if2cf_lu().is_some());
    }

    #[test]
    fn test_bad_format_tag_rejected() {
        let lambda = 50.0;
        let rf = build_dlr_rf(lambda, 1e-8).unwrap();
        let ops = ImTimeOps::new(lambda, rf.view()).unwrap();

        let mut repr = ImTimeOpsRepr::from_ops(&ops);
        repr.format = "dlr::somethingelse".to_string();
        assert!(matches!(
            repr.into_ops(),
            Err(DlrError::FormatMismatch(_))
        ));
    }

    #[test]
    fn test_inconsistent_payload_rejected() {
        let lambda = 50.0;
        let rf = build_dlr_rf(lambda, 1e-8).unwrap();
        let ops = ImTimeOps::new(lambda, rf.view()).unwrap();

        let mut repr = ImTimeOpsRepr::from_ops(&ops);
        repr.cf2it.data.pop();
        assert!(repr.into_ops().is_err());
    }
}
