//! Decode/encode error types.

use thiserror::Error;

use crate::path::CodingPath;
use crate::value::ValueKind;

/// Terminal decode failure. The first error at any nesting depth unwinds the
/// whole traversal; no partial object is ever returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
        path: CodingPath,
    },
    #[error("key `{key}` not found at {path}")]
    KeyNotFound { key: String, path: CodingPath },
    #[error("null value for non-optional field at {path}")]
    ValueNotFound { path: CodingPath },
    #[error("number not representable in target type at {path}")]
    NumberOverflow { path: CodingPath },
    #[error("unkeyed container exhausted at {path}")]
    EndOfContainer { path: CodingPath },
    #[error("invalid strategy input at {path}: {detail}")]
    InvalidStrategyInput { path: CodingPath, detail: String },
    #[error("nesting depth limit exceeded at {path}")]
    DepthLimitExceeded { path: CodingPath },
}

impl DecodeError {
    /// The coding path accumulated up to the failure point.
    pub fn path(&self) -> &CodingPath {
        match self {
            DecodeError::TypeMismatch { path, .. }
            | DecodeError::KeyNotFound { path, .. }
            | DecodeError::ValueNotFound { path }
            | DecodeError::NumberOverflow { path }
            | DecodeError::EndOfContainer { path }
            | DecodeError::InvalidStrategyInput { path, .. }
            | DecodeError::DepthLimitExceeded { path } => path,
        }
    }
}

/// Terminal encode failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    #[error("container mismatch at {path}: expected {expected}, found {found}")]
    ContainerMismatch {
        expected: ValueKind,
        found: ValueKind,
        path: CodingPath,
    },
    #[error("invalid value at {path}: {detail}")]
    InvalidValue { path: CodingPath, detail: String },
    #[error("nesting depth limit exceeded at {path}")]
    DepthLimitExceeded { path: CodingPath },
}

impl EncodeError {
    pub fn path(&self) -> &CodingPath {
        match self {
            EncodeError::ContainerMismatch { path, .. }
            | EncodeError::InvalidValue { path, .. }
            | EncodeError::DepthLimitExceeded { path } => path,
        }
    }
}
