//! Error types for rectpack.

use crate::entry::EntryId;
use thiserror::Error;

/// Result type alias for rectpack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing or running a packing search.
///
/// Failing to place all entries in a given box is not an error: packers
/// return `None` for that and the search moves on to another box.
#[derive(Debug, Error)]
pub enum Error {
    /// The instance cannot be packed at all (empty, zero-sized entries, ...).
    #[error("Invalid instance: {0}")]
    InvalidInstance(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A packing produced by a packer violates a packing property.
    #[error("Packing verification failed: {0}")]
    Verification(#[from] PackingViolation),

    /// Computation cancelled before any feasible packing was found.
    #[error("Computation cancelled")]
    Cancelled,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The first packing property violated by a placed instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackingViolation {
    /// Two placed entries share a cell.
    #[error("entries {0} and {1} overlap")]
    Overlap(EntryId, EntryId),

    /// An entry sticks out of the box.
    #[error("entry {0} lies outside the {1}x{2} box")]
    OutOfBounds(EntryId, u32, u32),

    /// An entry has no position.
    #[error("entry {0} is not placed")]
    Unplaced(EntryId),

    /// An entry is rotated although the instance forbids rotation.
    #[error("entry {0} is rotated but rotation is not allowed")]
    IllegalRotation(EntryId),

    /// The same id occurs twice.
    #[error("entry id {0} occurs more than once")]
    DuplicateId(EntryId),

    /// The packed instance does not hold the expected number of entries.
    #[error("expected {expected} entries, found {found}")]
    CountMismatch {
        /// Number of entries the caller expected.
        expected: usize,
        /// Number of entries actually present.
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInstance("no entries".to_string());
        assert_eq!(err.to_string(), "Invalid instance: no entries");

        let err: Error = PackingViolation::Overlap(1, 2).into();
        assert_eq!(
            err.to_string(),
            "Packing verification failed: entries 1 and 2 overlap"
        );
    }

    #[test]
    fn test_count_mismatch_display() {
        let violation = PackingViolation::CountMismatch {
            expected: 4,
            found: 3,
        };
        assert_eq!(violation.to_string(), "expected 4 entries, found 3");
    }
}
