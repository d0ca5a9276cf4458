use parley_shared::error::IdentifierError;
use parley_store::StoreError;
use thiserror::Error;

/// Outcome of a failed operation, returned to the presentation layer.
///
/// `Validation`, `Auth` and `Limit` carry a user-facing message; the caller
/// shows it and lets the user retry.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Malformed or conflicting input.
    #[error("{0}")]
    Validation(String),

    /// Identifier / secret mismatch.
    #[error("{0}")]
    Auth(String),

    /// A per-account ceiling was reached.
    #[error("{0}")]
    Limit(String),

    #[error("No account is logged in")]
    NotLoggedIn,

    /// The sender's ledger was written but the recipient's was not.
    #[error("Message {message_id} stored locally but not delivered: {source}")]
    PartialDelivery {
        message_id: u64,
        #[source]
        source: StoreError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Reading a file for a file message failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    Limit,
    Session,
    Storage,
    Io,
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Limit(_) => ErrorKind::Limit,
            Self::NotLoggedIn => ErrorKind::Session,
            Self::PartialDelivery { .. } | Self::Storage(_) => ErrorKind::Storage,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<IdentifierError> for ServiceError {
    fn from(_: IdentifierError) -> Self {
        Self::Validation("Invalid UID. Must be 8 digits.".to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
