use std::io;
use thiserror::Error;

/// Errors raised while decoding MDX, building a model, or writing MDL/MDX.
#[derive(Debug, Error)]
pub enum MdlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("configuration error: {0}")]
    Config(#[from] confy::ConfyError),

    /// The buffer ended before a read of `needed` bytes could complete.
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("invalid magic: expected '{expected}', got '{actual}'")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported model version {0} (expected 800, 900 or 1000)")]
    UnsupportedVersion(u32),

    /// An ordinal reference (node, texture, geoset, global sequence) is out of range.
    #[error("malformed reference: {what} index {index} out of range (len {len})")]
    MalformedReference {
        what: &'static str,
        index: i64,
        len: usize,
    },

    /// A broken internal contract: count mismatch, duplicate keyframe, dangling name.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("no triangulated geometry found")]
    NoGeometry,
}

impl MdlError {
    pub(crate) fn reference(what: &'static str, index: impl Into<i64>, len: usize) -> Self {
        MdlError::MalformedReference {
            what,
            index: index.into(),
            len,
        }
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        MdlError::InvariantViolation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MdlError>;
