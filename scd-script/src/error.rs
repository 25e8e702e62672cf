use thiserror::Error;

use crate::assembler::Diagnostic;

#[derive(Debug, Error)]
pub enum ScdError {
    #[error("unsupported script version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown script kind: {0}")]
    UnknownScriptKind(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error("assembly failed with {} error(s)", .0.iter().filter(|d| d.is_error()).count())]
    Assembly(Vec<Diagnostic>),
}

pub type Result<T> = std::result::Result<T, ScdError>;
