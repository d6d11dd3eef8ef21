//! Particle statistics

use crate::error::{DlrError, Result};

/// Particle statistic selector
///
/// The numeric value is the zeta parameter entering the Matsubara frequency
/// index 2n + zeta: 1 for fermions, 0 for bosons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Boson = 0,
    Fermion = 1,
}

impl Statistic {
    /// Zeta parameter in the Matsubara index 2n + zeta
    pub fn zeta(self) -> i64 {
        self as i64
    }

    /// Recover a statistic from its zeta encoding
    pub fn from_zeta(zeta: i64) -> Result<Self> {
        match zeta {
            0 => Ok(Statistic::Boson),
            1 => Ok(Statistic::Fermion),
            _ => Err(DlrError::InvalidParameter(format!(
                "unknown statistic: zeta={}",
                zeta
            ))),
        }
    }

    /// Check if this statistic is fermionic
    pub fn is_fermion(self) -> bool {
        matches!(self, Statistic::Fermion)
    }

    /// Check if this statistic is bosonic
    pub fn is_boson(self) -> bool {
        matches!(self, Statistic::Boson)
    }

    /// Get the string representation of the statistic
    pub fn as_str(self) -> &'static str {
        match self {
            Statistic::Fermion => "fermion",
            Statistic::Boson => "boson",
        }
    }
}
