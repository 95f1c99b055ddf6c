use crate::graph::RegionId;
use thiserror::Error;

/// Errors returned by the segmentation entry points.
///
/// Everything except [`Error::Invariant`] is caused by the caller's input and is reported before
/// any region is built. [`Error::Invariant`] means the engine itself broke one of its structural
/// guarantees.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("threshold must be a non-negative number, got {0}")]
    InvalidThreshold(f32),
    #[error("image dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension { width: usize, height: usize },
    #[error("image must have at least one band")]
    NoBands,
    #[error("pixel buffer holds {actual} values, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("cannot encode an empty pixel set")]
    EmptyPixelSet,
    #[error("internal invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl Error {
    /// `true` when the error is an engine defect rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("region {0} is not present in the graph")]
    MissingRegion(RegionId),
    #[error("region {region} has no edge to its neighbor {neighbor}")]
    MissingEdge { region: RegionId, neighbor: RegionId },
    #[error("contour traced from pixel {start} did not close within {limit} moves")]
    UnclosedContour { start: usize, limit: usize },
    #[error("criterion produced {actual} attribute values for {expected} pixels")]
    AttributeCount { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::{Error, InvariantViolation};

    #[test]
    fn internal_errors_are_told_apart() {
        assert!(!Error::InvalidThreshold(-1.0).is_internal());
        assert!(!Error::ZeroDimension {
            width: 0,
            height: 3
        }
        .is_internal());
        let err: Error = InvariantViolation::MissingRegion(7).into();
        assert!(err.is_internal());
        assert_eq!(
            err.to_string(),
            "internal invariant violated: region 7 is not present in the graph"
        );
    }
}
