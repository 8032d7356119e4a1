//! Error types for the ledger

use crate::types::{Principal, Slot, TokenId, Value};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Token was never minted or has been burned
    #[error("Invalid token ID: {0}")]
    InvalidTokenId(TokenId),

    /// Null principal used as recipient, owner or operator
    #[error("Invalid recipient: null principal")]
    InvalidRecipient,

    /// Approval-setting call by a non-owner
    #[error("Caller {caller} is not owner of token {token_id}")]
    NotOwner {
        /// Token
        token_id: TokenId,
        /// Rejected caller
        caller: Principal,
    },

    /// Transfer attempted without sufficient authorization
    #[error("Caller {caller} is not owner nor approved for token {token_id}")]
    NotOwnerNorApproved {
        /// Token
        token_id: TokenId,
        /// Rejected caller
        caller: Principal,
    },

    /// Spend exceeds the token's current value
    #[error("Insufficient value in token {token_id}: available {available}, requested {requested}")]
    InsufficientValue {
        /// Source token
        token_id: TokenId,
        /// Current value
        available: Value,
        /// Requested amount
        requested: Value,
    },

    /// Allowance-only spender asked for more than the recorded allowance
    #[error("Insufficient allowance on {token_id}: allowance {allowance}, requested {requested}")]
    InsufficientAllowance {
        /// Token
        token_id: TokenId,
        /// Remaining allowance
        allowance: Value,
        /// Requested amount
        requested: Value,
    },

    /// Value transfer between tokens of different slots
    #[error("Slot mismatch: {from} != {to}")]
    SlotMismatch {
        /// Source slot
        from: Slot,
        /// Destination slot
        to: Slot,
    },

    /// Value arithmetic would overflow
    #[error("Value overflow")]
    ValueOverflow,

    /// Value transfer from a token into itself
    #[error("Self transfer not allowed: {0}")]
    SelfTransfer(TokenId),

    /// No token identities left to allocate
    #[error("Token ID space exhausted")]
    IdSpaceExhausted,

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Snapshot failed checksum or version check
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this is a caller-input or authorization rejection.
    ///
    /// Rejections are never transient: re-issuing the same call fails the same way.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidTokenId(_)
                | Error::InvalidRecipient
                | Error::NotOwner { .. }
                | Error::NotOwnerNorApproved { .. }
                | Error::InsufficientValue { .. }
                | Error::InsufficientAllowance { .. }
                | Error::SlotMismatch { .. }
                | Error::ValueOverflow
                | Error::SelfTransfer(_)
                | Error::IdSpaceExhausted
        )
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        assert!(Error::InvalidTokenId(TokenId::new(7)).is_rejection());
        assert!(Error::InvalidRecipient.is_rejection());
        assert!(!Error::Concurrency("closed".into()).is_rejection());
        assert!(!Error::Config("bad".into()).is_rejection());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::NotOwnerNorApproved {
            token_id: TokenId::new(1),
            caller: Principal::new("bob"),
        };
        assert_eq!(
            err.to_string(),
            "Caller bob is not owner nor approved for token #1"
        );
    }
}
