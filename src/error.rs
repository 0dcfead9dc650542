use std::fmt;

/// Errors produced by the conversions, calibrations, and fits in this crate.
///
/// Every operation here is deterministic math, so none of these are transient: they all indicate
/// either bad input or an API used out of order, and are surfaced immediately.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Too few point correspondences to determine the four Helmert parameters.
    InsufficientData { need: usize, have: usize },
    /// The normal-equation matrix of a least-squares fit is not invertible.
    ///
    /// This happens for degenerate input such as all correspondences sharing a single source
    /// point.
    SingularSystem,
    /// A vector was built from a slice of the wrong length.
    DimensionMismatch { expected: usize, actual: usize },
    /// A world/geodetic conversion was attempted on a frame that has not been calibrated yet.
    UninitializedFrame,
    /// A latitude outside of [-90°, 90°] was provided, in degrees.
    LatitudeOutOfRange(f64),
    /// A calibration could not produce a finite, non-zero basis vector.
    ///
    /// Typically caused by coincident world points or axes without a horizontal component.
    DegenerateBasis,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InsufficientData { need, have } => {
                write!(f, "need at least {need} correspondences, got {have}")
            }
            Error::SingularSystem => write!(f, "normal equations are singular"),
            Error::DimensionMismatch { expected, actual } => {
                write!(f, "expected {expected} components, got {actual}")
            }
            Error::UninitializedFrame => write!(f, "local frame has not been calibrated"),
            Error::LatitudeOutOfRange(latitude) => {
                write!(f, "latitude {latitude}° is outside of [-90°, 90°]")
            }
            Error::DegenerateBasis => write!(f, "calibration produced a degenerate basis"),
        }
    }
}

impl std::error::Error for Error {}

/// Shorthand for results whose error type is [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::Error;
    use rstest::rstest;

    #[rstest]
    #[case(
        Error::InsufficientData { need: 2, have: 1 },
        "need at least 2 correspondences, got 1"
    )]
    #[case(Error::SingularSystem, "normal equations are singular")]
    #[case(
        Error::DimensionMismatch { expected: 3, actual: 4 },
        "expected 3 components, got 4"
    )]
    #[case(Error::UninitializedFrame, "local frame has not been calibrated")]
    #[case(
        Error::LatitudeOutOfRange(91.5),
        "latitude 91.5° is outside of [-90°, 90°]"
    )]
    fn error_display(#[case] error: Error, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }
}
