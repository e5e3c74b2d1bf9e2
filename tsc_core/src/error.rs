use thiserror::Error;

/// Error taxonomy for the container/codec pipeline.
///
/// Every fallible operation in `tsc_core`/`tsc_codecs` returns one of these
/// variants so callers (chiefly `tsc_cli`) can distinguish a version
/// mismatch from a CRC failure from plain truncated I/O.
#[derive(Debug, Error)]
pub enum TscError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed header: {detail}")]
    MalformedHeader { detail: String },

    #[error("malformed block ({sub_block} sub-block): {detail}")]
    MalformedBlock {
        sub_block: &'static str,
        detail: String,
    },

    #[error("malformed stream: {detail}")]
    MalformedStream { detail: String },

    #[error("truncated input: {detail}")]
    Truncated { detail: String },

    #[error("internal invariant violated: {detail}")]
    Invariant { detail: String },
}

impl TscError {
    pub fn malformed_header(detail: impl Into<String>) -> Self {
        TscError::MalformedHeader { detail: detail.into() }
    }

    pub fn malformed_block(sub_block: &'static str, detail: impl Into<String>) -> Self {
        TscError::MalformedBlock { sub_block, detail: detail.into() }
    }

    pub fn malformed_stream(detail: impl Into<String>) -> Self {
        TscError::MalformedStream { detail: detail.into() }
    }

    pub fn truncated(detail: impl Into<String>) -> Self {
        TscError::Truncated { detail: detail.into() }
    }

    pub fn invariant(detail: impl Into<String>) -> Self {
        TscError::Invariant { detail: detail.into() }
    }
}

pub type Result<T> = std::result::Result<T, TscError>;
