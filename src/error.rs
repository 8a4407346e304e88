//! Error types for tree operations.

use thiserror::Error;

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable failures surfaced by tree operations. Structural contract
/// violations (reparenting an attached node, a measure hook that fails
/// to set dimensions, out-of-range child indices) panic instead: see the
/// `# Panics` sections on the operations that enforce them.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    /// A node handle referred to a slot that has been freed or reused.
    #[error("dangling node handle: {0}")]
    Dangling(String),
    /// A focus operation could not be carried out.
    #[error("focus: {0}")]
    Focus(String),
    /// A layout or measurement operation failed.
    #[error("layout: {0}")]
    Layout(String),
    /// An internal invariant did not hold.
    #[error("internal: {0}")]
    Internal(String),
    /// Invalid input to an operation.
    #[error("invalid: {0}")]
    Invalid(String),
}
