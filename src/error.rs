// src/error.rs

use std::io;

pub type Result<T> = std::result::Result<T, JjError>;

#[derive(Debug, thiserror::Error)]
pub enum JjError {
    /// The command exited non-zero for a reason other than a missing repository
    #[error("jj command failed: {0}")]
    CommandFailed(String),

    #[error("not a jj repository")]
    NotARepository,

    /// Reserved for input the lenient parsers refuse to skip
    #[error("parse error: {0}")]
    ParseError(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to render graph: {0}")]
    Render(String),
}
