//! Core types for the semi-fungible token ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode snapshots)
//! - Exact integer arithmetic (no silent wrap on value)
//! - Cheap identity comparison (ids and slots are `Copy`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Numeric value carried by a token.
///
/// All arithmetic on values goes through `checked_*`; overflow surfaces as
/// [`crate::Error::ValueOverflow`].
pub type Value = u128;

/// Token identity (positive ordinal, assigned once, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(u64);

impl TokenId {
    /// First identity handed out by a fresh ledger
    pub const FIRST: TokenId = TokenId(1);

    /// Create from raw ordinal
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw ordinal
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Next ordinal, or `None` once the id space is exhausted
    pub fn next(&self) -> Option<TokenId> {
        self.0.checked_add(1).map(TokenId)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for TokenId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Opaque category identifier. Value only moves between tokens of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot(u64);

impl Slot {
    /// Create slot
    pub const fn new(slot: u64) -> Self {
        Self(slot)
    }

    /// Raw slot number
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot:{}", self.0)
    }
}

impl From<u64> for Slot {
    fn from(slot: u64) -> Self {
        Self(slot)
    }
}

/// Principal (account address) as authenticated by the host environment.
///
/// The empty string is the null principal: never a valid owner or recipient.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Create principal
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The null principal
    pub fn null() -> Self {
        Self(String::new())
    }

    /// Whether this is the null principal
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `None` for the null principal
    pub fn into_option(self) -> Option<Principal> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "<null>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A ledger entry: unique identity, one owner, immutable slot, mutable value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Identity
    pub id: TokenId,

    /// Current owner (never null)
    pub owner: Principal,

    /// Category, fixed at mint
    pub slot: Slot,

    /// Current value
    pub value: Value,
}

/// Notification of a committed state change.
///
/// Events mirror committed state only; they carry no authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Token identity changed hands (`from: None` on mint, `to: None` on burn)
    Transfer {
        /// Previous owner
        from: Option<Principal>,
        /// New owner
        to: Option<Principal>,
        /// Token moved
        token_id: TokenId,
    },

    /// Value moved between tokens (`from_token: None` on mint, `to_token: None` on burn)
    TransferValue {
        /// Source token
        from_token: Option<TokenId>,
        /// Destination token
        to_token: Option<TokenId>,
        /// Amount moved
        value: Value,
    },

    /// Slot assigned at mint or removed at burn
    SlotChanged {
        /// Token
        token_id: TokenId,
        /// Slot before
        old_slot: Option<Slot>,
        /// Slot after
        new_slot: Option<Slot>,
    },

    /// Single-token approval set or cleared
    Approval {
        /// Owner at the time
        owner: Principal,
        /// Approved principal, `None` when cleared
        approved: Option<Principal>,
        /// Token
        token_id: TokenId,
    },

    /// Operator flag changed
    ApprovalForAll {
        /// Granting owner
        owner: Principal,
        /// Operator
        operator: Principal,
        /// New flag
        approved: bool,
    },

    /// Value allowance set or consumed (carries the resulting allowance)
    ApprovalValue {
        /// Token
        token_id: TokenId,
        /// Spender
        operator: Principal,
        /// Allowance after the change
        value: Value,
    },
}

impl LedgerEvent {
    /// Short name for logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::Transfer { .. } => "transfer",
            LedgerEvent::TransferValue { .. } => "transfer_value",
            LedgerEvent::SlotChanged { .. } => "slot_changed",
            LedgerEvent::Approval { .. } => "approval",
            LedgerEvent::ApprovalForAll { .. } => "approval_for_all",
            LedgerEvent::ApprovalValue { .. } => "approval_value",
        }
    }
}

/// Event as published to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Gap-free commit sequence (starts at 1)
    pub sequence: u64,

    /// Unique event ID (UUIDv7 for time-ordering)
    pub event_id: Uuid,

    /// Commit timestamp
    pub recorded_at: DateTime<Utc>,

    /// The event
    pub event: LedgerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_principal() {
        assert!(Principal::null().is_null());
        assert!(!Principal::new("alice").is_null());
        assert_eq!(Principal::null().into_option(), None);
        assert_eq!(Principal::null().to_string(), "<null>");
    }

    #[test]
    fn test_token_id_next() {
        assert_eq!(TokenId::FIRST.next(), Some(TokenId::new(2)));
        assert_eq!(TokenId::new(u64::MAX).next(), None);
    }

    #[test]
    fn test_event_kind() {
        let event = LedgerEvent::TransferValue {
            from_token: Some(TokenId::new(1)),
            to_token: Some(TokenId::new(2)),
            value: 10,
        };
        assert_eq!(event.kind(), "transfer_value");
    }
}
