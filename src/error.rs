use thiserror::Error;

/// Failure classes for the aggregation layer.
///
/// Every aggregation operation is pure; these are the only ways one can fail.
/// A failed metric is reported and skipped by the caller, it never aborts the
/// other reports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// The dataset violates a fixed enumeration (category label outside
    /// {0,1,2}, duplicate province name, malformed k key).
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    /// The requested operation has no well-defined answer for these inputs
    /// (vertical trendline, zero-mean decline denominator).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An extremal reduction was asked to run over zero records.
    #[error("empty input: {0}")]
    EmptyInput(String),
}
