//! Error types shared across the vetra crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeserializeError>;

/// Why a persisted filter record failed to deserialize.
///
/// Callers are expected to treat any of these as "the common state is
/// invalid" and construct a zero-input node instead of propagating.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeserializeError {
    #[error("negative input count")]
    NegativeCount,

    #[error("input count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: i32, actual: i32 },

    #[error("crop rectangle is not finite")]
    NonFiniteRect,

    #[error("buffer underrun while reading record")]
    BufferUnderrun,

    #[error("embedded child record is invalid")]
    InvalidChild,
}
