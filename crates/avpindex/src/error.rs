use crate::path::AvpId;
use crate::value::ValueKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AvpIndexError {
    #[error("AVP {id} holds a {found} value, requested {expected}")]
    TypeMismatch {
        id: AvpId,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("AVP tree under {id} exceeds the maximum nesting depth ({depth} > {max_depth})")]
    MalformedTree {
        id: AvpId,
        depth: usize,
        max_depth: usize,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] confique::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AvpIndexError>;
