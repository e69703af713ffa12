//! Error types for building bounding volumes and hierarchies.

use thiserror::Error;

/// Errors that can occur while computing bounding volumes or building a [`Bvh`].
///
/// Missing an intersection is never an error, and neither is building from zero primitives.
///
/// [`Bvh`]: crate::bvh::Bvh
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BvhError {
    /// The input cannot produce a well-defined result, e.g. an empty or collinear point set.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for fallible operations of this crate.
pub type Result<T> = std::result::Result<T, BvhError>;
