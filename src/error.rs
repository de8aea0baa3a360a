use thiserror::Error;
use crate::{ResourcePath, UserId};

/// Raised by [`Jupiter::receive`](crate::Jupiter::receive) when an incoming timestamp doesn't fit
/// the causal position we expect from the sender. The engine's state is untouched when this is
/// returned. Apart from duplicates, any of these means the document needs a consistency check.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum TransformationError {
    /// We've already received this operation (or one with the same count).
    #[error("duplicate operation: expected remote op #{expected}, got #{received}")]
    DuplicateOperation { expected: usize, received: usize },

    /// The sender claims to have generated operations we never received.
    #[error("operation from the future: expected remote op #{expected}, got #{received}")]
    OperationFromFuture { expected: usize, received: usize },

    /// The sender acknowledges more of our operations than we ever generated.
    #[error("remote acknowledges {acked} ops but only {generated} were generated")]
    AcknowledgedUnknown { acked: usize, generated: usize },

    /// The sender acknowledges fewer of our operations than an earlier message already did.
    #[error("acknowledgement went backwards: {acked} < {oldest_unacked}")]
    AcknowledgementRegressed { acked: usize, oldest_unacked: usize },
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ServerError {
    #[error("user {0} is not part of this session")]
    UnknownUser(UserId),

    #[error("could not transform operation from {user} on {path}: {source}")]
    Transformation {
        user: UserId,
        path: ResourcePath,
        #[source]
        source: TransformationError,
    },
}

impl TransformationError {
    /// A redelivery of something we already processed. Dropping it is all that's needed.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, TransformationError::DuplicateOperation { .. })
    }
}

impl ServerError {
    pub fn transformation_error(&self) -> Option<TransformationError> {
        match self {
            ServerError::Transformation { source, .. } => Some(*source),
            ServerError::UnknownUser(_) => None,
        }
    }
}
