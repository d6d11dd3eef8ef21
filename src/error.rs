//! Error types for DLR construction and transforms

use thiserror::Error;

/// Errors reported by DLR construction and transform operations
#[derive(Debug, Error)]
pub enum DlrError {
    /// Caller passed an invalid parameter (lambda, eps, p, beta out of range)
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Leading dimension of a value or coefficient array does not match the
    /// DLR rank
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A value-to-coefficient factorization came out singular. The node
    /// selection produced a degenerate set; this indicates a bug in the
    /// library, not a caller error.
    #[error("degenerate DLR node set: {0}")]
    DegenerateNodes(String),

    /// A serialized operator carried an unrecognized format tag or an
    /// inconsistent field layout
    #[error("serialized format mismatch: {0}")]
    FormatMismatch(String),
}

pub type Result<T> = std::result::Result<T, DlrError>;
