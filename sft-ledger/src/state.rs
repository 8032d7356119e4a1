//! Ledger state: the unit every mutation is applied to atomically
//!
//! `LedgerState` owns the [`TokenLedger`] and the [`ApprovalRegistry`].
//! Mutating operations live next to the component they drive
//! (`mint.rs`, `transfer.rs`, `approvals.rs`) and all follow one rule:
//! check every precondition first, then write. A returned error therefore
//! means nothing was changed.

use crate::{
    approvals::ApprovalRegistry,
    authorization::{spend_authority, transfer_authority},
    error::Result,
    token_ledger::TokenLedger,
    types::{LedgerEvent, Principal, Slot, Token, TokenId, Value},
};
use serde::{Deserialize, Serialize};

/// Result of a committed mutation plus the events it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    /// Operation return value
    pub value: T,

    /// Notifications, in commit order
    pub events: Vec<LedgerEvent>,
}

impl<T> Outcome<T> {
    /// Create outcome
    pub fn new(value: T, events: Vec<LedgerEvent>) -> Self {
        Self { value, events }
    }
}

/// Complete ledger state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub(crate) tokens: TokenLedger,
    pub(crate) approvals: ApprovalRegistry,
}

impl LedgerState {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Token table (read-only)
    pub fn tokens(&self) -> &TokenLedger {
        &self.tokens
    }

    /// Approval layers (read-only)
    pub fn approvals(&self) -> &ApprovalRegistry {
        &self.approvals
    }

    /// Full token record
    pub fn token(&self, token_id: TokenId) -> Result<Token> {
        self.tokens.get(token_id).cloned()
    }

    /// Slot of a token
    pub fn slot_of(&self, token_id: TokenId) -> Result<Slot> {
        self.tokens.slot_of(token_id)
    }

    /// Owner of a token
    pub fn owner_of(&self, token_id: TokenId) -> Result<Principal> {
        self.tokens.owner_of(token_id).cloned()
    }

    /// Value of a token
    pub fn value_of(&self, token_id: TokenId) -> Result<Value> {
        self.tokens.value_of(token_id)
    }

    /// Number of tokens owned by `principal`
    pub fn owned_count(&self, principal: &Principal) -> u64 {
        self.tokens.owned_count(principal)
    }

    /// Ids owned by `principal`, ascending
    pub fn tokens_of(&self, principal: &Principal) -> Vec<TokenId> {
        self.tokens.tokens_of(principal)
    }

    /// Number of live tokens
    pub fn total_supply(&self) -> usize {
        self.tokens.total_supply()
    }

    /// Single approved principal of a live token
    pub fn get_approved(&self, token_id: TokenId) -> Result<Option<Principal>> {
        self.tokens.get(token_id)?;
        Ok(self.approvals.approved(token_id).cloned())
    }

    /// Remaining value allowance of `spender` on a live token
    pub fn allowance_of(&self, token_id: TokenId, spender: &Principal) -> Result<Value> {
        self.tokens.get(token_id)?;
        Ok(self.approvals.allowance(token_id, spender))
    }

    /// Whether `operator` may act on all of `owner`'s tokens
    pub fn is_operator(&self, owner: &Principal, operator: &Principal) -> bool {
        self.approvals.is_operator(owner, operator)
    }

    /// Whether `caller` could spend `amount` of `token_id` right now
    pub fn can_spend_value(
        &self,
        caller: &Principal,
        token_id: TokenId,
        amount: Value,
    ) -> Result<bool> {
        let token = self.tokens.get(token_id)?;
        Ok(spend_authority(token, &self.approvals, caller, amount).is_some())
    }

    /// Whether `caller` could move ownership of `token_id` right now
    pub fn can_transfer_ownership(&self, caller: &Principal, token_id: TokenId) -> Result<bool> {
        let token = self.tokens.get(token_id)?;
        Ok(transfer_authority(token, &self.approvals, caller).is_some())
    }

    /// Sum of values of all live tokens in `slot` (`None` on overflow)
    pub fn slot_value(&self, slot: Slot) -> Option<Value> {
        self.tokens
            .iter()
            .filter(|token| token.slot == slot)
            .try_fold(0 as Value, |sum, token| sum.checked_add(token.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn p(name: &str) -> Principal {
        Principal::new(name)
    }

    #[test]
    fn test_queries_on_unknown_token() {
        let state = LedgerState::new();
        let id = TokenId::new(1);
        assert!(matches!(state.get_approved(id), Err(Error::InvalidTokenId(_))));
        assert!(matches!(state.allowance_of(id, &p("bob")), Err(Error::InvalidTokenId(_))));
        assert!(matches!(state.can_spend_value(&p("bob"), id, 1), Err(Error::InvalidTokenId(_))));
        assert_eq!(state.owned_count(&p("bob")), 0);
        assert_eq!(state.total_supply(), 0);
    }

    #[test]
    fn test_can_predicates() {
        let mut state = LedgerState::new();
        let id = state.mint(p("alice"), Slot::new(1), 100).unwrap().value;
        state.approve_value(&p("alice"), id, p("bob"), 50).unwrap();

        assert!(state.can_spend_value(&p("bob"), id, 50).unwrap());
        assert!(!state.can_spend_value(&p("bob"), id, 51).unwrap());
        assert!(!state.can_transfer_ownership(&p("bob"), id).unwrap());
        assert!(state.can_transfer_ownership(&p("alice"), id).unwrap());
    }

    #[test]
    fn test_slot_value() {
        let mut state = LedgerState::new();
        state.mint(p("alice"), Slot::new(1), 100).unwrap();
        state.mint(p("bob"), Slot::new(1), 50).unwrap();
        state.mint(p("bob"), Slot::new(2), 7).unwrap();

        assert_eq!(state.slot_value(Slot::new(1)), Some(150));
        assert_eq!(state.slot_value(Slot::new(2)), Some(7));
        assert_eq!(state.slot_value(Slot::new(3)), Some(0));
    }
}
