use thiserror::Error;

// Unified error type for ldusolve

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LduError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("unknown {kind} '{name}', valid entries are: {}", valid.join(", "))]
    UnknownAlgorithm {
        kind: &'static str,
        name: String,
        valid: Vec<String>,
    },
    #[error("communication failure: {0}")]
    CommunicationFailure(String),
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LduError>;

impl LduError {
    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        LduError::ShapeMismatch(msg.into())
    }

    pub(crate) fn comm(msg: impl Into<String>) -> Self {
        LduError::CommunicationFailure(msg.into())
    }
}
