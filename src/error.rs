use thiserror::Error;

use crate::expr::ValueType;

/// Coarse classification of [`RigError`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DegenerateChain,
    InsufficientResolution,
    CyclicConnection,
    AttributeTypeMismatch,
    MissingReference,
    DuplicateConnection,
    ReadOnlyPlug,
    InvalidInput,
}

/// Errors raised while building a rig.
///
/// Every variant is a build-time failure: the call that produced it is
/// abandoned and whatever it had already created should be discarded.
/// Evaluation never returns one of these.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RigError {
    #[error("chain `{chain}` has a degenerate rest length ({length})")]
    DegenerateChain { chain: String, length: f32 },

    #[error("`{context}` needs at least {minimum} samples, got {requested}")]
    InsufficientResolution {
        context: String,
        requested: usize,
        minimum: usize,
    },

    #[error("connecting {from} into {to} would create a cycle")]
    CyclicConnection { from: String, to: String },

    #[error("type mismatch on {context}: expected {expected:?}, found {found:?}")]
    AttributeTypeMismatch {
        context: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("missing reference: {0}")]
    MissingReference(String),

    #[error("{0} already has an incoming connection")]
    DuplicateConnection(String),

    #[error("{0} is computed and cannot be driven or set")]
    ReadOnlyPlug(String),

    #[error("invalid input for {context}: {reason}")]
    InvalidInput { context: String, reason: String },
}

impl RigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RigError::DegenerateChain { .. } => ErrorKind::DegenerateChain,
            RigError::InsufficientResolution { .. } => ErrorKind::InsufficientResolution,
            RigError::CyclicConnection { .. } => ErrorKind::CyclicConnection,
            RigError::AttributeTypeMismatch { .. } => ErrorKind::AttributeTypeMismatch,
            RigError::MissingReference(_) => ErrorKind::MissingReference,
            RigError::DuplicateConnection(_) => ErrorKind::DuplicateConnection,
            RigError::ReadOnlyPlug(_) => ErrorKind::ReadOnlyPlug,
            RigError::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn invalid(context: impl Into<String>, reason: impl Into<String>) -> Self {
        RigError::InvalidInput {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(context: impl Into<String>, expected: ValueType, found: ValueType) -> Self {
        RigError::AttributeTypeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}

pub type RigResult<T> = Result<T, RigError>;
