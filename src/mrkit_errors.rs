use thiserror::Error;

/// Unified error type for the mrkit crate.
///
/// Every fallible operation returns `Result<T, MrkitError>`. All variants are
/// deterministic pure-data errors raised eagerly at validation time; none of
/// them is transient, so there is no retry path anywhere in the crate. The
/// payload strings name the violated invariant together with the offending
/// shapes or values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MrkitError {
    /// The coordinate arrays are not mutually broadcastable, or their joint
    /// broadcast rank is below the required minimum.
    #[error("Shape error: {0}")]
    ShapeError(String),

    /// A single array has an unusable shape: a stacked tensor whose stack
    /// axis is not of length 3, a zero-length axis, an out-of-range axis
    /// index, or index arrays of the wrong rank.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// A scalar configuration value is outside its valid domain, such as a
    /// non-finite tolerance, a non-positive beta or an inverted bound pair.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
